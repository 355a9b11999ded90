//! PostgreSQL wire binding for [`Value`].
//!
//! `Value` accepts every PostgreSQL type and converts at bind/scan time based on
//! the type the server reports for the parameter or column. This lets one
//! canonical `Int` bind to `int2`, `int4` or `int8` columns alike.

use super::Value;
use bytes::{BufMut, BytesMut};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use postgres_types::{to_sql_checked, FromSql, IsNull, ToSql, Type};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::error::Error;
use std::net::IpAddr;

type BoxError = Box<dyn Error + Sync + Send>;

fn is_text(ty: &Type) -> bool {
    matches!(*ty, Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN)
}

/// Binds `value` only when its Rust type accepts the column type.
fn bind<T: ToSql>(value: &T, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    if !<T as ToSql>::accepts(ty) {
        return Err(format!("cannot bind {} to a column of type {ty}", std::any::type_name::<T>()).into());
    }
    value.to_sql(ty, out)
}

fn bind_text(text: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::JSONB => {
            out.put_u8(1);
            out.extend_from_slice(text.as_bytes());
            Ok(IsNull::No)
        }
        Type::JSON => {
            out.extend_from_slice(text.as_bytes());
            Ok(IsNull::No)
        }
        _ => bind(&text, ty, out),
    }
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => bind(b, ty, out),
            Value::Int(i) => match *ty {
                Type::INT2 => bind(&i16::try_from(*i)?, ty, out),
                Type::INT4 => bind(&i32::try_from(*i)?, ty, out),
                Type::NUMERIC => bind(&Decimal::from(*i), ty, out),
                Type::FLOAT4 => bind(&(*i as f32), ty, out),
                Type::FLOAT8 => bind(&(*i as f64), ty, out),
                ref t if is_text(t) => bind_text(&i.to_string(), ty, out),
                _ => bind(i, ty, out),
            },
            Value::Decimal(d) => match *ty {
                Type::FLOAT4 | Type::FLOAT8 => {
                    let f = d.to_f64().ok_or("decimal out of range for float")?;
                    if *ty == Type::FLOAT4 {
                        bind(&(f as f32), ty, out)
                    } else {
                        bind(&f, ty, out)
                    }
                }
                Type::INT2 | Type::INT4 | Type::INT8 if d.fract().is_zero() => {
                    let i = d.to_i64().ok_or("decimal out of range for integer")?;
                    Value::Int(i).to_sql(ty, out)
                }
                ref t if is_text(t) => bind_text(&d.to_string(), ty, out),
                _ => bind(d, ty, out),
            },
            Value::String(s) => bind_text(s, ty, out),
            Value::DateTime(dt) => match *ty {
                Type::TIMESTAMP => bind(&dt.naive_utc(), ty, out),
                Type::DATE => bind(&dt.date_naive(), ty, out),
                ref t if is_text(t) => bind_text(&self.to_string(), ty, out),
                _ => bind(dt, ty, out),
            },
            Value::IpAddr(ip) => match *ty {
                ref t if is_text(t) => bind_text(&ip.to_string(), ty, out),
                _ => bind(ip, ty, out),
            },
            Value::MacAddr(bytes) => match *ty {
                Type::MACADDR => {
                    out.extend_from_slice(bytes);
                    Ok(IsNull::No)
                }
                _ => bind_text(&self.to_string(), ty, out),
            },
            Value::List(_) => {
                let json = serde_json::to_string(self)?;
                bind_text(&json, ty, out)
            }
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

impl<'a> FromSql<'a> for Value {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        let value = match *ty {
            Type::BOOL => Value::Bool(bool::from_sql(ty, raw)?),
            Type::INT2 => Value::Int(i16::from_sql(ty, raw)?.into()),
            Type::INT4 => Value::Int(i32::from_sql(ty, raw)?.into()),
            Type::INT8 => Value::Int(i64::from_sql(ty, raw)?),
            Type::OID => Value::Int(u32::from_sql(ty, raw)?.into()),
            Type::NUMERIC => Value::Decimal(Decimal::from_sql(ty, raw)?),
            Type::FLOAT4 => Value::Decimal(Decimal::try_from(f32::from_sql(ty, raw)?)?),
            Type::FLOAT8 => Value::Decimal(Decimal::try_from(f64::from_sql(ty, raw)?)?),
            Type::TIMESTAMPTZ => Value::DateTime(DateTime::<Utc>::from_sql(ty, raw)?),
            Type::TIMESTAMP => Value::DateTime(NaiveDateTime::from_sql(ty, raw)?.and_utc()),
            Type::DATE => {
                let date = NaiveDate::from_sql(ty, raw)?;
                let midnight = date.and_hms_opt(0, 0, 0).ok_or("invalid date")?;
                Value::DateTime(midnight.and_utc())
            }
            Type::INET => Value::IpAddr(IpAddr::from_sql(ty, raw)?),
            Type::MACADDR => {
                let bytes: [u8; 6] = raw
                    .try_into()
                    .map_err(|_| format!("macaddr must be 6 bytes, got {}", raw.len()))?;
                Value::MacAddr(bytes)
            }
            Type::JSONB => {
                let (version, body) = raw.split_first().ok_or("empty jsonb value")?;
                if *version != 1 {
                    return Err(format!("unsupported jsonb version {version}").into());
                }
                Value::String(std::str::from_utf8(body)?.to_string())
            }
            _ => Value::String(std::str::from_utf8(raw)?.to_string()),
        };
        Ok(value)
    }

    fn from_sql_null(_ty: &Type) -> Result<Self, BoxError> {
        Ok(Value::Null)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}
