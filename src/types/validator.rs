//! Value restrictions attached to attributes.

use super::TypeError;
use crate::value::Value;
use regex::Regex;
use std::cmp::Ordering;

/// A validator produced by one of the [`super::TypeDefinition`] factories.
#[derive(Debug, Clone)]
pub enum Restriction {
    /// Inclusive bounds
    Range { min: Option<Value>, max: Option<Value> },
    /// Inclusive bounds on the character count
    Length { min: Option<usize>, max: Option<usize> },
    Pattern(Regex),
    Enumeration(Vec<Value>),
}

impl PartialEq for Restriction {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Restriction::Range { min: a, max: b }, Restriction::Range { min: c, max: d }) => a == c && b == d,
            (Restriction::Length { min: a, max: b }, Restriction::Length { min: c, max: d }) => a == c && b == d,
            (Restriction::Pattern(a), Restriction::Pattern(b)) => a.as_str() == b.as_str(),
            (Restriction::Enumeration(a), Restriction::Enumeration(b)) => a == b,
            _ => false,
        }
    }
}

impl Restriction {
    pub fn kind(&self) -> &'static str {
        match self {
            Restriction::Range { .. } => "range",
            Restriction::Length { .. } => "length",
            Restriction::Pattern(_) => "pattern",
            Restriction::Enumeration(_) => "enumeration",
        }
    }

    /// Checks a canonical, non-null value.
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match self {
            Restriction::Range { min, max } => {
                if let Some(min) = min {
                    if value.compare(min) == Some(Ordering::Less) {
                        return Err(self.violation(value, format!("must be >= {min}")));
                    }
                }
                if let Some(max) = max {
                    if value.compare(max) == Some(Ordering::Greater) {
                        return Err(self.violation(value, format!("must be <= {max}")));
                    }
                }
                Ok(())
            }
            Restriction::Length { min, max } => {
                let len = match value {
                    Value::String(s) => s.chars().count(),
                    other => other.to_string().chars().count(),
                };
                if min.is_some_and(|m| len < m) || max.is_some_and(|m| len > m) {
                    return Err(self.violation(
                        value,
                        format!("length {len} outside {}..={}", fmt_bound(*min), fmt_bound(*max)),
                    ));
                }
                Ok(())
            }
            Restriction::Pattern(re) => {
                if re.is_match(&value.to_string()) {
                    Ok(())
                } else {
                    Err(self.violation(value, format!("does not match /{}/", re.as_str())))
                }
            }
            Restriction::Enumeration(allowed) => {
                if allowed.contains(value) {
                    Ok(())
                } else {
                    let list = allowed.iter().map(Value::to_string).collect::<Vec<_>>().join(", ");
                    Err(self.violation(value, format!("must be one of [{list}]")))
                }
            }
        }
    }

    fn violation(&self, value: &Value, reason: String) -> TypeError {
        TypeError::Violation {
            restriction: self.kind(),
            value: value.to_string(),
            reason,
        }
    }
}

fn fmt_bound(bound: Option<usize>) -> String {
    bound.map(|b| b.to_string()).unwrap_or_default()
}

/// Builds a length restriction, rejecting inverted bounds.
pub(crate) fn length(min: Option<usize>, max: Option<usize>) -> Result<Restriction, TypeError> {
    if let (Some(lo), Some(hi)) = (min, max) {
        if lo > hi {
            return Err(TypeError::InvalidRestriction {
                restriction: "length",
                reason: format!("minLength {lo} is greater than maxLength {hi}"),
            });
        }
    }
    Ok(Restriction::Length { min, max })
}

/// Compiles a pattern restriction. The pattern is anchored to the whole value.
pub(crate) fn pattern(pattern: &str) -> Result<Restriction, TypeError> {
    Regex::new(&format!("^(?:{pattern})$"))
        .map(Restriction::Pattern)
        .map_err(|e| TypeError::InvalidRestriction {
            restriction: "pattern",
            reason: e.to_string(),
        })
}
