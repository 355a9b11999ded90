//! `integer`, `decimal`, `objectId` and `boolean`.

use super::{range_bounds, Restriction, SqlType, TypeDefinition, TypeError, TypeFamily};
use crate::value::Value;
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use std::str::FromStr;

fn parse_i64(type_name: &'static str, text: &str) -> Result<i64, TypeError> {
    text.trim()
        .parse::<i64>()
        .map_err(|e| TypeError::invalid(type_name, text, e.to_string()))
}

fn parse_decimal(type_name: &'static str, text: &str) -> Result<Decimal, TypeError> {
    let trimmed = text.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|e| TypeError::invalid(type_name, text, e.to_string()))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerType;

impl TypeDefinition for IntegerType {
    fn name(&self) -> &'static str {
        "integer"
    }

    fn family(&self) -> TypeFamily {
        TypeFamily::Numeric
    }

    fn sql_type(&self) -> SqlType {
        SqlType::BigInt
    }

    fn parse(&self, text: &str) -> Result<Value, TypeError> {
        parse_i64(self.name(), text).map(Value::Int)
    }

    fn to_internal(&self, value: &Value) -> Result<Value, TypeError> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Int(i) => Ok(Value::Int(*i)),
            Value::Decimal(_) => value
                .as_i64()
                .map(Value::Int)
                .ok_or_else(|| TypeError::invalid(self.name(), value, "not a whole number")),
            Value::String(s) => self.parse(s),
            other => Err(TypeError::invalid(self.name(), other, format!("cannot convert {}", other.kind()))),
        }
    }

    fn to_external(&self, value: &Value) -> JsonValue {
        match value {
            Value::Int(i) => JsonValue::from(*i),
            Value::Null => JsonValue::Null,
            other => JsonValue::String(other.to_string()),
        }
    }

    fn range(&self, min: Option<&JsonValue>, max: Option<&JsonValue>) -> Result<Restriction, TypeError> {
        range_bounds(self, min, max)
    }
}

/// Canonical form is `Value::Decimal`; rendered as a string on the wire to keep precision.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecimalType;

impl TypeDefinition for DecimalType {
    fn name(&self) -> &'static str {
        "decimal"
    }

    fn family(&self) -> TypeFamily {
        TypeFamily::Numeric
    }

    fn sql_type(&self) -> SqlType {
        SqlType::Decimal
    }

    fn parse(&self, text: &str) -> Result<Value, TypeError> {
        parse_decimal(self.name(), text).map(Value::Decimal)
    }

    fn to_internal(&self, value: &Value) -> Result<Value, TypeError> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Int(i) => Ok(Value::Decimal(Decimal::from(*i))),
            Value::Decimal(d) => Ok(Value::Decimal(*d)),
            Value::String(s) => self.parse(s),
            other => Err(TypeError::invalid(self.name(), other, format!("cannot convert {}", other.kind()))),
        }
    }

    fn to_external(&self, value: &Value) -> JsonValue {
        match value {
            Value::Null => JsonValue::Null,
            other => JsonValue::String(other.to_string()),
        }
    }

    fn range(&self, min: Option<&JsonValue>, max: Option<&JsonValue>) -> Result<Restriction, TypeError> {
        range_bounds(self, min, max)
    }
}

/// Reference to another row's `id`; always positive.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectIdType;

impl ObjectIdType {
    fn check(&self, id: i64) -> Result<Value, TypeError> {
        if id > 0 {
            Ok(Value::Int(id))
        } else {
            Err(TypeError::invalid(self.name(), id, "object ids are positive"))
        }
    }
}

impl TypeDefinition for ObjectIdType {
    fn name(&self) -> &'static str {
        "objectId"
    }

    fn family(&self) -> TypeFamily {
        TypeFamily::Numeric
    }

    fn sql_type(&self) -> SqlType {
        SqlType::BigInt
    }

    fn parse(&self, text: &str) -> Result<Value, TypeError> {
        self.check(parse_i64(self.name(), text)?)
    }

    fn to_internal(&self, value: &Value) -> Result<Value, TypeError> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::String(s) => self.parse(s),
            other => match other.as_i64() {
                Some(id) => self.check(id),
                None => Err(TypeError::invalid(self.name(), other, format!("cannot convert {}", other.kind()))),
            },
        }
    }

    fn to_external(&self, value: &Value) -> JsonValue {
        IntegerType.to_external(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanType;

impl TypeDefinition for BooleanType {
    fn name(&self) -> &'static str {
        "boolean"
    }

    fn family(&self) -> TypeFamily {
        TypeFamily::Boolean
    }

    fn sql_type(&self) -> SqlType {
        SqlType::Boolean
    }

    fn parse(&self, text: &str) -> Result<Value, TypeError> {
        match text.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
            "false" | "f" | "no" | "off" | "0" => Ok(Value::Bool(false)),
            _ => Err(TypeError::invalid(self.name(), text, "expected true or false")),
        }
    }

    fn to_internal(&self, value: &Value) -> Result<Value, TypeError> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::Int(0) => Ok(Value::Bool(false)),
            Value::Int(1) => Ok(Value::Bool(true)),
            Value::String(s) => self.parse(s),
            other => Err(TypeError::invalid(self.name(), other, format!("cannot convert {}", other.kind()))),
        }
    }

    fn to_external(&self, value: &Value) -> JsonValue {
        match value {
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Null => JsonValue::Null,
            other => JsonValue::String(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_parse() {
        assert_eq!(IntegerType.parse(" 10 ").unwrap(), Value::Int(10));
        assert!(IntegerType.parse("10.5").is_err());
        assert!(IntegerType.parse("ten").is_err());
    }

    #[test]
    fn test_integer_from_whole_decimal() {
        let d = Value::Decimal(Decimal::from_str("4.0").unwrap());
        assert_eq!(IntegerType.to_internal(&d).unwrap(), Value::Int(4));
        let frac = Value::Decimal(Decimal::from_str("4.2").unwrap());
        assert!(IntegerType.to_internal(&frac).is_err());
    }

    #[test]
    fn test_integer_range_restriction() {
        let r = IntegerType.range(Some(&json!(0)), Some(&json!(100))).unwrap();
        assert!(r.validate(&Value::Int(50)).is_ok());
        assert!(r.validate(&Value::Int(101)).is_err());
    }

    #[test]
    fn test_decimal_accepts_scientific() {
        assert_eq!(
            DecimalType.parse("1.5e2").unwrap(),
            Value::Decimal(Decimal::from_str("150").unwrap())
        );
        assert_eq!(
            DecimalType.to_internal(&Value::Int(3)).unwrap(),
            Value::Decimal(Decimal::from(3))
        );
    }

    #[test]
    fn test_object_id_must_be_positive() {
        assert!(ObjectIdType.parse("0").is_err());
        assert!(ObjectIdType.to_internal(&Value::Int(-1)).is_err());
        assert_eq!(ObjectIdType.parse("12").unwrap(), Value::Int(12));
    }

    #[test]
    fn test_boolean_tokens() {
        assert_eq!(BooleanType.parse("YES").unwrap(), Value::Bool(true));
        assert_eq!(BooleanType.to_internal(&Value::Int(0)).unwrap(), Value::Bool(false));
        assert!(BooleanType.to_internal(&Value::Int(2)).is_err());
        assert!(BooleanType.parse("maybe").is_err());
    }

    #[test]
    fn test_enumeration_converts_members() {
        let r = IntegerType.enumeration(&[json!("1"), json!(2)]).unwrap();
        assert_eq!(r, Restriction::Enumeration(vec![Value::Int(1), Value::Int(2)]));
        assert!(IntegerType.enumeration(&[json!("x")]).is_err());
    }
}
