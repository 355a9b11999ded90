//! Filter operators.
//!
//! A filter value is either a bare literal (`eq`) or `[op]value`, e.g.
//! `[gte]10`, `[in]a,b,c`, `[is]notnull`.

use crate::schema::SchemaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Nin,
    Between,
    Is,
    Like,
    Exists,
}

impl Operator {
    pub fn from_name(name: &str) -> Option<Self> {
        let op = match name {
            "eq" => Operator::Eq,
            "ne" => Operator::Ne,
            "gt" => Operator::Gt,
            "gte" => Operator::Gte,
            "lt" => Operator::Lt,
            "lte" => Operator::Lte,
            "in" => Operator::In,
            "nin" => Operator::Nin,
            "between" => Operator::Between,
            "is" => Operator::Is,
            "like" => Operator::Like,
            "exists" => Operator::Exists,
            _ => return None,
        };
        Some(op)
    }

    pub fn name(self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::In => "in",
            Operator::Nin => "nin",
            Operator::Between => "between",
            Operator::Is => "is",
            Operator::Like => "like",
            Operator::Exists => "exists",
        }
    }

    /// SQL comparison for the binary operators.
    pub(crate) fn comparison(self) -> Option<&'static str> {
        match self {
            Operator::Eq => Some("="),
            Operator::Ne => Some("<>"),
            Operator::Gt => Some(">"),
            Operator::Gte => Some(">="),
            Operator::Lt => Some("<"),
            Operator::Lte => Some("<="),
            _ => None,
        }
    }
}

/// Splits a raw filter value into its operator and operand.
///
/// # Errors
///
/// Returns [`SchemaError::UnknownOperator`] when the bracketed name is not an operator.
pub fn split(column: &str, raw: &str) -> Result<(Operator, String), SchemaError> {
    let Some(rest) = raw.strip_prefix('[') else {
        return Ok((Operator::Eq, raw.to_string()));
    };
    let Some((name, operand)) = rest.split_once(']') else {
        return Ok((Operator::Eq, raw.to_string()));
    };
    let op = Operator::from_name(name).ok_or_else(|| SchemaError::UnknownOperator {
        column: column.to_string(),
        operator: name.to_string(),
    })?;
    Ok((op, operand.to_string()))
}

/// Operand of `[is]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IsTest {
    Null,
    NotNull,
    True,
    False,
}

impl IsTest {
    pub(crate) fn parse(token: &str) -> Option<Self> {
        match token {
            "null" => Some(IsTest::Null),
            "notnull" => Some(IsTest::NotNull),
            "true" => Some(IsTest::True),
            "false" => Some(IsTest::False),
            _ => None,
        }
    }

    pub(crate) fn sql(self) -> &'static str {
        match self {
            IsTest::Null => "IS NULL",
            IsTest::NotNull => "IS NOT NULL",
            IsTest::True => "IS TRUE",
            IsTest::False => "IS FALSE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split() {
        assert_eq!(split("a", "10").unwrap(), (Operator::Eq, "10".to_string()));
        assert_eq!(split("a", "[gte]10").unwrap(), (Operator::Gte, "10".to_string()));
        assert_eq!(split("a", "[in]x,y").unwrap(), (Operator::In, "x,y".to_string()));
        assert_eq!(split("a", "[unclosed").unwrap(), (Operator::Eq, "[unclosed".to_string()));
        assert!(matches!(
            split("a", "[near]1"),
            Err(SchemaError::UnknownOperator { .. })
        ));
    }

    #[test]
    fn test_names_round_trip() {
        for name in ["eq", "ne", "gt", "gte", "lt", "lte", "in", "nin", "between", "is", "like", "exists"] {
            assert_eq!(Operator::from_name(name).unwrap().name(), name);
        }
    }

    #[test]
    fn test_is_tokens() {
        assert_eq!(IsTest::parse("notnull").unwrap().sql(), "IS NOT NULL");
        assert!(IsTest::parse("NULL").is_none());
    }
}
