//! `string` and `password`.

use super::{validator, Restriction, SqlType, TypeDefinition, TypeError, TypeFamily};
use crate::value::Value;
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, Default)]
pub struct StringType;

impl TypeDefinition for StringType {
    fn name(&self) -> &'static str {
        "string"
    }

    fn family(&self) -> TypeFamily {
        TypeFamily::Textual
    }

    fn sql_type(&self) -> SqlType {
        SqlType::Text
    }

    fn parse(&self, text: &str) -> Result<Value, TypeError> {
        Ok(Value::String(text.to_string()))
    }

    fn to_internal(&self, value: &Value) -> Result<Value, TypeError> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::String(s) => Ok(Value::String(s.clone())),
            Value::List(_) => Err(TypeError::invalid(self.name(), value, "cannot convert list")),
            other => Ok(Value::String(other.to_string())),
        }
    }

    fn to_external(&self, value: &Value) -> JsonValue {
        match value {
            Value::Null => JsonValue::Null,
            other => JsonValue::String(other.to_string()),
        }
    }

    fn length(&self, min: Option<usize>, max: Option<usize>) -> Result<Restriction, TypeError> {
        validator::length(min, max)
    }

    fn pattern(&self, pattern: &str) -> Result<Restriction, TypeError> {
        validator::pattern(pattern)
    }
}

const HASH_PREFIX: &str = "sha256$";

/// Stored as an unsalted SHA-256 digest. Restrictions apply to the plaintext.
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordType;

impl PasswordType {
    pub fn digest(plain: &str) -> String {
        let hash = Sha256::digest(plain.as_bytes());
        let hex: String = hash.iter().map(|b| format!("{b:02x}")).collect();
        format!("{HASH_PREFIX}{hex}")
    }

    fn is_digest(text: &str) -> bool {
        text.strip_prefix(HASH_PREFIX)
            .is_some_and(|hex| hex.len() == 64 && hex.bytes().all(|b| b.is_ascii_hexdigit()))
    }
}

impl TypeDefinition for PasswordType {
    fn name(&self) -> &'static str {
        "password"
    }

    fn family(&self) -> TypeFamily {
        TypeFamily::Opaque
    }

    fn sql_type(&self) -> SqlType {
        SqlType::Text
    }

    /// Filters compare digests, so the filter text is hashed too.
    fn parse(&self, text: &str) -> Result<Value, TypeError> {
        self.to_internal(&Value::String(text.to_string()))
    }

    fn to_internal(&self, value: &Value) -> Result<Value, TypeError> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::String(s) if Self::is_digest(s) => Ok(Value::String(s.clone())),
            Value::String(s) if s.is_empty() => Err(TypeError::invalid(self.name(), "", "password is empty")),
            Value::String(s) => Ok(Value::String(Self::digest(s))),
            other => Err(TypeError::invalid(self.name(), other.kind(), "password must be a string")),
        }
    }

    fn to_external(&self, value: &Value) -> JsonValue {
        StringType.to_external(value)
    }

    fn validation_subject<'v>(&self, raw: &'v Value, _internal: &'v Value) -> &'v Value {
        raw
    }

    fn length(&self, min: Option<usize>, max: Option<usize>) -> Result<Restriction, TypeError> {
        validator::length(min, max)
    }

    fn pattern(&self, pattern: &str) -> Result<Restriction, TypeError> {
        validator::pattern(pattern)
    }

    fn enumeration(&self, _values: &[JsonValue]) -> Result<Restriction, TypeError> {
        Err(TypeError::UnsupportedRestriction {
            type_name: self.name(),
            restriction: "enumeration",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_coerces_scalars() {
        assert_eq!(StringType.to_internal(&Value::Int(5)).unwrap(), Value::from("5"));
        assert_eq!(StringType.to_internal(&Value::Bool(true)).unwrap(), Value::from("true"));
        assert!(StringType.to_internal(&Value::List(vec![])).is_err());
    }

    #[test]
    fn test_password_hashes_once() {
        let hashed = PasswordType.to_internal(&Value::from("secret")).unwrap();
        let text = hashed.as_str().unwrap();
        assert!(text.starts_with("sha256$"));
        assert_eq!(text.len(), "sha256$".len() + 64);
        assert_eq!(PasswordType.to_internal(&hashed).unwrap(), hashed);
        assert_eq!(PasswordType.parse("secret").unwrap(), hashed);
    }

    #[test]
    fn test_password_rejects_empty() {
        assert!(PasswordType.to_internal(&Value::from("")).is_err());
    }

    #[test]
    fn test_password_validates_plaintext() {
        let raw = Value::from("abc");
        let internal = PasswordType.to_internal(&raw).unwrap();
        let subject = PasswordType.validation_subject(&raw, &internal);
        let r = PasswordType.length(Some(8), None).unwrap();
        assert!(r.validate(subject).is_err());
    }
}
