//! Scalar attribute types.
//!
//! Each attribute in a schema definition names one of a fixed set of scalar types.
//! A type handler knows how to parse filter text, canonicalize loosely-typed input
//! (`to_internal`), render the canonical value for the wire (`to_external`), and
//! build the restrictions a definition may attach to an attribute.
//!
//! Handlers are stateless. They are collected in an explicit [`TypeRegistry`]
//! that is built once at startup and handed to the schema compiler.

use crate::value::Value;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

mod network;
mod numeric;
mod temporal;
mod text;
pub mod validator;

pub use network::{IpAddressType, PhysicalAddressType};
pub use numeric::{BooleanType, DecimalType, IntegerType, ObjectIdType};
pub use temporal::DateTimeType;
pub use text::{PasswordType, StringType};
pub use validator::Restriction;

/// Errors raised while converting or validating a single value.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypeError {
    #[error("invalid {type_name} value '{value}': {reason}")]
    InvalidValue {
        type_name: &'static str,
        value: String,
        reason: String,
    },
    #[error("type {type_name} does not support {restriction} restrictions")]
    UnsupportedRestriction {
        type_name: &'static str,
        restriction: &'static str,
    },
    #[error("invalid {restriction} restriction: {reason}")]
    InvalidRestriction {
        restriction: &'static str,
        reason: String,
    },
    #[error("value '{value}' violates {restriction} restriction: {reason}")]
    Violation {
        restriction: &'static str,
        value: String,
        reason: String,
    },
}

impl TypeError {
    pub(crate) fn invalid(type_name: &'static str, value: impl fmt::Display, reason: impl Into<String>) -> Self {
        TypeError::InvalidValue {
            type_name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Physical column type used when generating DDL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    BigInt,
    Decimal,
    Text,
    TimestampTz,
    Inet,
    MacAddr,
    Boolean,
}

/// Broad classification used by the statement builder to pick list rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFamily {
    /// Rendered as quoted literals (`string`, `ipAddress`, `physicalAddress`)
    Textual,
    /// Rendered as bare literals (`integer`, `decimal`, `objectId`)
    Numeric,
    Temporal,
    Boolean,
    /// Hashed or otherwise not listable
    Opaque,
}

/// A scalar type handler.
pub trait TypeDefinition: Send + Sync + fmt::Debug {
    /// Registry name, e.g. `"integer"` or `"ipAddress"`.
    fn name(&self) -> &'static str;

    fn family(&self) -> TypeFamily;

    fn sql_type(&self) -> SqlType;

    /// Parses filter text into a canonical value.
    fn parse(&self, text: &str) -> Result<Value, TypeError>;

    /// Canonicalizes a loosely typed value (wire payload or scanned cell).
    ///
    /// `Value::Null` passes through unchanged.
    fn to_internal(&self, value: &Value) -> Result<Value, TypeError>;

    /// Renders a canonical value for the wire.
    fn to_external(&self, value: &Value) -> JsonValue;

    /// The value restrictions are checked against; hashing types check the raw input.
    fn validation_subject<'v>(&self, _raw: &'v Value, internal: &'v Value) -> &'v Value {
        internal
    }

    fn range(&self, _min: Option<&JsonValue>, _max: Option<&JsonValue>) -> Result<Restriction, TypeError> {
        Err(TypeError::UnsupportedRestriction {
            type_name: self.name(),
            restriction: "range",
        })
    }

    fn length(&self, _min: Option<usize>, _max: Option<usize>) -> Result<Restriction, TypeError> {
        Err(TypeError::UnsupportedRestriction {
            type_name: self.name(),
            restriction: "length",
        })
    }

    fn pattern(&self, _pattern: &str) -> Result<Restriction, TypeError> {
        Err(TypeError::UnsupportedRestriction {
            type_name: self.name(),
            restriction: "pattern",
        })
    }

    fn enumeration(&self, values: &[JsonValue]) -> Result<Restriction, TypeError> {
        let allowed = values
            .iter()
            .map(|v| self.to_internal(&Value::from(v)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Restriction::Enumeration(allowed))
    }
}

/// Converts the bounds of a range restriction through `ty`.
pub(crate) fn range_bounds(
    ty: &dyn TypeDefinition,
    min: Option<&JsonValue>,
    max: Option<&JsonValue>,
) -> Result<Restriction, TypeError> {
    let convert = |bound: Option<&JsonValue>| -> Result<Option<Value>, TypeError> {
        bound.map(|b| ty.to_internal(&Value::from(b))).transpose()
    };
    let (min, max) = (convert(min)?, convert(max)?);
    if let (Some(lo), Some(hi)) = (&min, &max) {
        if lo.compare(hi) == Some(std::cmp::Ordering::Greater) {
            return Err(TypeError::InvalidRestriction {
                restriction: "range",
                reason: format!("minimum {lo} is greater than maximum {hi}"),
            });
        }
    }
    Ok(Restriction::Range { min, max })
}

/// Explicit registry of scalar type handlers, keyed by type name.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: BTreeMap<&'static str, Arc<dyn TypeDefinition>>,
}

impl TypeRegistry {
    /// An empty registry; see [`TypeRegistry::standard`] for the built-in set.
    pub fn empty() -> Self {
        Self {
            types: BTreeMap::new(),
        }
    }

    /// Registry holding the nine built-in types.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(IntegerType));
        registry.register(Arc::new(DecimalType));
        registry.register(Arc::new(StringType));
        registry.register(Arc::new(DateTimeType));
        registry.register(Arc::new(IpAddressType));
        registry.register(Arc::new(PhysicalAddressType));
        registry.register(Arc::new(BooleanType));
        registry.register(Arc::new(PasswordType));
        registry.register(Arc::new(ObjectIdType));
        registry
    }

    /// Adds (or replaces) a handler. Only meaningful before the schema is compiled.
    pub fn register(&mut self, ty: Arc<dyn TypeDefinition>) {
        self.types.insert(ty.name(), ty);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn TypeDefinition>> {
        self.types.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.types.keys().copied()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
