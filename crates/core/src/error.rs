//! Decode error taxonomy.

use serde::Serialize;
use serde_json::Value;

use crate::key::Key;

/// All errors produced by keyed lookup, scalar conversion, and recursive
/// decoding.
///
/// Each variant carries the key and the offending value it needs to render
/// a complete diagnostic on its own. The surrounding traversal context (the
/// chain of keys above the failure) is supplied separately by the decoder's
/// path stack, via the observer channel.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
pub enum DecodeError {
    /// The key is absent from the container.
    #[error("missing key: {key}")]
    Missing { key: Key },

    /// The key is present but holds an explicit null.
    #[error("null value for key: {key}")]
    Null { key: Key },

    /// The looked-up value has the wrong type for its target.
    #[error("type mismatch for key '{key}': expected {expected}, got {actual}")]
    TypeMismatch {
        key: Key,
        expected: &'static str,
        actual: Value,
    },

    /// The looked-up value has the right type but an unusable payload
    /// (an unparseable URL string, an out-of-range timestamp, a bad
    /// element inside a homogeneous array).
    #[error("invalid value for key '{key}': {actual}")]
    InvalidValue { key: Key, actual: Value },

    /// A keyed lookup was attempted on a value that is not an object, or a
    /// batch entry point was handed a root that is not an array.
    #[error("expected a container, got {actual}")]
    ExpectedContainer { actual: Value },
}
