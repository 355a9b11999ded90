//! `ipAddress` and `physicalAddress`.

use super::{validator, Restriction, SqlType, TypeDefinition, TypeError, TypeFamily};
use crate::value::{format_mac, Value};
use serde_json::Value as JsonValue;
use std::net::IpAddr;

#[derive(Debug, Clone, Copy, Default)]
pub struct IpAddressType;

impl TypeDefinition for IpAddressType {
    fn name(&self) -> &'static str {
        "ipAddress"
    }

    fn family(&self) -> TypeFamily {
        TypeFamily::Textual
    }

    fn sql_type(&self) -> SqlType {
        SqlType::Inet
    }

    fn parse(&self, text: &str) -> Result<Value, TypeError> {
        text.trim()
            .parse::<IpAddr>()
            .map(Value::IpAddr)
            .map_err(|e| TypeError::invalid(self.name(), text, e.to_string()))
    }

    fn to_internal(&self, value: &Value) -> Result<Value, TypeError> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::IpAddr(ip) => Ok(Value::IpAddr(*ip)),
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

    fn pattern(&self, pattern: &str) -> Result<Restriction, TypeError> {
        validator::pattern(pattern)
    }
}

/// EUI-48 address, accepted with `:` or `-` separators.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhysicalAddressType;

impl PhysicalAddressType {
    fn parse_bytes(&self, text: &str) -> Result<[u8; 6], TypeError> {
        let trimmed = text.trim();
        let parts: Vec<&str> = trimmed.split([':', '-']).collect();
        if parts.len() != 6 {
            return Err(TypeError::invalid(self.name(), text, "expected six hex octets"));
        }
        let mut bytes = [0u8; 6];
        for (slot, part) in bytes.iter_mut().zip(&parts) {
            if part.len() != 2 {
                return Err(TypeError::invalid(self.name(), text, "octets are two hex digits"));
            }
            *slot = u8::from_str_radix(part, 16)
                .map_err(|e| TypeError::invalid(self.name(), text, e.to_string()))?;
        }
        Ok(bytes)
    }
}

impl TypeDefinition for PhysicalAddressType {
    fn name(&self) -> &'static str {
        "physicalAddress"
    }

    fn family(&self) -> TypeFamily {
        TypeFamily::Textual
    }

    fn sql_type(&self) -> SqlType {
        SqlType::MacAddr
    }

    fn parse(&self, text: &str) -> Result<Value, TypeError> {
        self.parse_bytes(text).map(Value::MacAddr)
    }

    fn to_internal(&self, value: &Value) -> Result<Value, TypeError> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::MacAddr(bytes) => Ok(Value::MacAddr(*bytes)),
            Value::String(s) => self.parse(s),
            other => Err(TypeError::invalid(self.name(), other, format!("cannot convert {}", other.kind()))),
        }
    }

    fn to_external(&self, value: &Value) -> JsonValue {
        match value {
            Value::Null => JsonValue::Null,
            Value::MacAddr(bytes) => JsonValue::String(format_mac(bytes)),
            other => JsonValue::String(other.to_string()),
        }
    }
}
