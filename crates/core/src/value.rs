//! Helpers over the dynamic `serde_json::Value` document model.
//!
//! The crate does not define its own JSON sum type: `serde_json::Value` is
//! the dynamic document representation throughout. This module adds the
//! small amount of shared vocabulary the rest of the crate needs on top of
//! it: type names for diagnostics and exact numeric views that refuse
//! lossy conversions.

use serde_json::{Map, Number, Value};

use crate::error::DecodeError;

/// Human-readable type name of a dynamic value, for diagnostics.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "Null",
        Value::Bool(_) => "Bool",
        Value::Number(_) => "Number",
        Value::String(_) => "String",
        Value::Array(_) => "Array",
        Value::Object(_) => "Object",
    }
}

/// Views `value` as an object, failing `ExpectedContainer` otherwise.
pub(crate) fn as_object(value: &Value) -> Result<&Map<String, Value>, DecodeError> {
    value.as_object().ok_or_else(|| DecodeError::ExpectedContainer {
        actual: value.clone(),
    })
}

/// Exact `i64` view of a JSON number.
///
/// Integral floats convert when in range; anything with a fractional part,
/// or outside `i64`, does not.
pub(crate) fn number_as_i64(number: &Number) -> Option<i64> {
    if let Some(int) = number.as_i64() {
        return Some(int);
    }
    let float = number.as_f64()?;
    if float.fract() == 0.0 && float >= i64::MIN as f64 && float <= i64::MAX as f64 {
        Some(float as i64)
    } else {
        None
    }
}

/// Exact `u64` view of a JSON number. Negative values never convert.
pub(crate) fn number_as_u64(number: &Number) -> Option<u64> {
    if let Some(unsigned) = number.as_u64() {
        return Some(unsigned);
    }
    let float = number.as_f64()?;
    if float.fract() == 0.0 && float >= 0.0 && float <= u64::MAX as f64 {
        Some(float as u64)
    } else {
        None
    }
}

/// Bool view of a JSON number: zero is false, anything else is true.
pub(crate) fn number_as_bool(number: &Number) -> bool {
    number.as_f64().is_some_and(|float| float != 0.0)
}
