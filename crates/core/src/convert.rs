//! The conversion contract: dynamic values into exact scalar types.
//!
//! Every implementation follows the same ladder: an exact variant match
//! succeeds directly; a generic JSON number coerces when the target can
//! represent it exactly; anything else is a `TypeMismatch` naming the
//! target. String-derived types additionally validate their payload and
//! report `InvalidValue` on a bad parse -- the shape was right, the
//! content was not.

use serde_json::Value;
use url::Url;

use crate::error::DecodeError;
use crate::key::Key;
use crate::value;

/// Conversion from a dynamic value into a concrete target type.
///
/// Implemented independently per target type and dispatched through
/// generics -- no inheritance chain, no blanket magic. The originating key
/// is threaded in purely so failures can name it.
pub trait FromValue: Sized {
    fn from_value(raw: &Value, key: &Key) -> Result<Self, DecodeError>;
}

impl FromValue for String {
    fn from_value(raw: &Value, key: &Key) -> Result<Self, DecodeError> {
        match raw {
            Value::String(text) => Ok(text.clone()),
            other => Err(key.mismatch("String", other)),
        }
    }
}

impl FromValue for i64 {
    fn from_value(raw: &Value, key: &Key) -> Result<Self, DecodeError> {
        match raw {
            Value::Number(number) => {
                value::number_as_i64(number).ok_or_else(|| key.mismatch("Int", raw))
            }
            other => Err(key.mismatch("Int", other)),
        }
    }
}

impl FromValue for i32 {
    fn from_value(raw: &Value, key: &Key) -> Result<Self, DecodeError> {
        match raw {
            Value::Number(number) => value::number_as_i64(number)
                .and_then(|wide| i32::try_from(wide).ok())
                .ok_or_else(|| key.mismatch("Int32", raw)),
            other => Err(key.mismatch("Int32", other)),
        }
    }
}

impl FromValue for u64 {
    fn from_value(raw: &Value, key: &Key) -> Result<Self, DecodeError> {
        match raw {
            Value::Number(number) => {
                value::number_as_u64(number).ok_or_else(|| key.mismatch("UInt", raw))
            }
            other => Err(key.mismatch("UInt", other)),
        }
    }
}

impl FromValue for u32 {
    fn from_value(raw: &Value, key: &Key) -> Result<Self, DecodeError> {
        match raw {
            Value::Number(number) => value::number_as_u64(number)
                .and_then(|wide| u32::try_from(wide).ok())
                .ok_or_else(|| key.mismatch("UInt32", raw)),
            other => Err(key.mismatch("UInt32", other)),
        }
    }
}

impl FromValue for bool {
    fn from_value(raw: &Value, key: &Key) -> Result<Self, DecodeError> {
        match raw {
            Value::Bool(flag) => Ok(*flag),
            Value::Number(number) => Ok(value::number_as_bool(number)),
            other => Err(key.mismatch("Bool", other)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(raw: &Value, key: &Key) -> Result<Self, DecodeError> {
        match raw {
            Value::Number(number) => number
                .as_f64()
                .ok_or_else(|| key.mismatch("Double", raw)),
            other => Err(key.mismatch("Double", other)),
        }
    }
}

impl FromValue for Url {
    fn from_value(raw: &Value, key: &Key) -> Result<Self, DecodeError> {
        match raw {
            Value::String(text) => Url::parse(text).map_err(|_| DecodeError::InvalidValue {
                key: key.clone(),
                actual: raw.clone(),
            }),
            other => Err(key.mismatch("String", other)),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(raw: &Value, key: &Key) -> Result<Self, DecodeError> {
        match raw {
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    T::from_value(item, key).map_err(|_| DecodeError::InvalidValue {
                        key: key.clone(),
                        actual: item.clone(),
                    })
                })
                .collect(),
            other => Err(key.mismatch("Array", other)),
        }
    }
}
