//! Compiled attribute definitions.

use super::definition::Collection;
use super::SchemaError;
use crate::types::{Restriction, TypeDefinition, TypeError};
use crate::value::Value;
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;

/// Name of the implicit primary key column.
pub const ID: &str = "id";
/// STI discriminator column.
pub const TYPE: &str = "type";
pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";
/// Polymorphic association columns.
pub const PARENT_TYPE: &str = "parent_type";
pub const PARENT_ID: &str = "parent_id";

/// A typed column of a table, with inherited settings already merged in.
#[derive(Clone)]
pub struct AttributeDefinition {
    pub(crate) name: String,
    pub(crate) type_def: Arc<dyn TypeDefinition>,
    pub(crate) collection: Collection,
    pub(crate) is_required: bool,
    pub(crate) is_read_only: bool,
    pub(crate) is_unique: bool,
    pub(crate) restrictions: Vec<Restriction>,
    pub(crate) default_value: Option<Value>,
    pub(crate) is_serial: bool,
    pub(crate) is_primary_key: bool,
}

impl fmt::Debug for AttributeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeDefinition")
            .field("name", &self.name)
            .field("type", &self.type_def.name())
            .field("collection", &self.collection)
            .field("is_required", &self.is_required)
            .field("restrictions", &self.restrictions.len())
            .finish_non_exhaustive()
    }
}

impl AttributeDefinition {
    /// The implicit serial primary key every root table receives.
    pub(crate) fn primary_key(type_def: Arc<dyn TypeDefinition>) -> Self {
        Self {
            name: ID.to_string(),
            type_def,
            collection: Collection::Scalar,
            is_required: false,
            is_read_only: true,
            is_unique: true,
            restrictions: Vec::new(),
            default_value: None,
            is_serial: true,
            is_primary_key: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_def(&self) -> &dyn TypeDefinition {
        self.type_def.as_ref()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_def.name()
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn is_collection(&self) -> bool {
        self.collection != Collection::Scalar
    }

    pub fn is_required(&self) -> bool {
        self.is_required
    }

    pub fn is_read_only(&self) -> bool {
        self.is_read_only
    }

    pub fn is_unique(&self) -> bool {
        self.is_unique
    }

    pub fn restrictions(&self) -> &[Restriction] {
        &self.restrictions
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default_value.as_ref()
    }

    pub fn is_serial(&self) -> bool {
        self.is_serial
    }

    pub fn is_primary_key(&self) -> bool {
        self.is_primary_key
    }

    /// Canonicalizes caller input and checks every restriction.
    ///
    /// Collections accept a list (or its JSON text) and check each element.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidAttribute`] on conversion failures or
    /// restriction violations.
    pub fn convert(&self, raw: &Value) -> Result<Value, SchemaError> {
        if raw.is_null() {
            return Ok(Value::Null);
        }
        if !self.is_collection() {
            let internal = self.scalar(raw)?;
            self.check(raw, &internal)?;
            return Ok(internal);
        }
        let items = self.elements(raw)?;
        let mut converted: Vec<Value> = Vec::with_capacity(items.len());
        for item in &items {
            let internal = self.scalar(item)?;
            self.check(item, &internal)?;
            if self.collection == Collection::Set && converted.contains(&internal) {
                continue;
            }
            converted.push(internal);
        }
        Ok(Value::List(converted))
    }

    /// Canonicalizes a scanned cell; restrictions are not re-checked.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidAttribute`] if the cell cannot be converted.
    pub fn scan(&self, cell: Value) -> Result<Value, SchemaError> {
        if cell.is_null() {
            return Ok(Value::Null);
        }
        if !self.is_collection() {
            return self.scalar(&cell);
        }
        self.elements(&cell)?
            .iter()
            .map(|item| self.scalar(item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List)
    }

    /// Parses filter text for this column. Collections parse their element type.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidAttribute`] if the text does not parse.
    pub fn parse(&self, text: &str) -> Result<Value, SchemaError> {
        self.type_def.parse(text).map_err(|e| self.invalid(e))
    }

    pub fn to_external(&self, value: &Value) -> JsonValue {
        match value {
            Value::List(items) => JsonValue::Array(items.iter().map(|v| self.type_def.to_external(v)).collect()),
            other => self.type_def.to_external(other),
        }
    }

    fn scalar(&self, raw: &Value) -> Result<Value, SchemaError> {
        self.type_def.to_internal(raw).map_err(|e| self.invalid(e))
    }

    fn check(&self, raw: &Value, internal: &Value) -> Result<(), SchemaError> {
        if internal.is_null() {
            return Ok(());
        }
        let subject = self.type_def.validation_subject(raw, internal);
        self.restrictions
            .iter()
            .try_for_each(|r| r.validate(subject))
            .map_err(|e| self.invalid(e))
    }

    fn elements(&self, raw: &Value) -> Result<Vec<Value>, SchemaError> {
        match raw {
            Value::List(items) => Ok(items.clone()),
            Value::String(text) => match serde_json::from_str::<JsonValue>(text) {
                Ok(JsonValue::Array(items)) => Ok(items.into_iter().map(Value::from).collect()),
                _ => Err(self.invalid(TypeError::invalid(self.type_name(), text, "expected a JSON array"))),
            },
            other => Err(self.invalid(TypeError::invalid(
                self.type_name(),
                other,
                format!("expected a list, got {}", other.kind()),
            ))),
        }
    }

    fn invalid(&self, source: TypeError) -> SchemaError {
        SchemaError::InvalidAttribute {
            attribute: self.name.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IntegerType, PasswordType, StringType};

    fn attribute(type_def: Arc<dyn TypeDefinition>, collection: Collection) -> AttributeDefinition {
        AttributeDefinition {
            name: "field".to_string(),
            type_def,
            collection,
            is_required: false,
            is_read_only: false,
            is_unique: false,
            restrictions: Vec::new(),
            default_value: None,
            is_serial: false,
            is_primary_key: false,
        }
    }

    #[test]
    fn test_convert_checks_restrictions() {
        let mut attr = attribute(Arc::new(IntegerType), Collection::Scalar);
        attr.restrictions.push(Restriction::Range {
            min: Some(Value::Int(1)),
            max: None,
        });
        assert_eq!(attr.convert(&Value::from("3")).unwrap(), Value::Int(3));
        let err = attr.convert(&Value::Int(0)).unwrap_err();
        assert!(err.to_string().contains("field"));
    }

    #[test]
    fn test_set_deduplicates_in_order() {
        let attr = attribute(Arc::new(StringType), Collection::Set);
        let raw = Value::List(vec![Value::from("b"), Value::from("a"), Value::from("b")]);
        assert_eq!(
            attr.convert(&raw).unwrap(),
            Value::List(vec![Value::from("b"), Value::from("a")])
        );
    }

    #[test]
    fn test_array_scans_json_text() {
        let attr = attribute(Arc::new(IntegerType), Collection::Array);
        assert_eq!(
            attr.scan(Value::from("[1,2,2]")).unwrap(),
            Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(2)])
        );
        assert!(attr.scan(Value::from("{}")).is_err());
    }

    #[test]
    fn test_password_restriction_sees_plaintext() {
        let mut attr = attribute(Arc::new(PasswordType), Collection::Scalar);
        attr.restrictions.push(crate::types::validator::length(Some(6), None).unwrap());
        assert!(attr.convert(&Value::from("short")).is_err());
        assert!(attr.convert(&Value::from("long enough")).is_ok());
    }
}
