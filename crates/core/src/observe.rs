//! The decode failure observation channel.
//!
//! Every failure that flows through
//! [`decode_one`](crate::decoder::Decoder::decode_one) is reported here
//! before the decoder either propagates it (strict paths) or drops the
//! element (lenient paths). Observation is a pure side-channel: it never alters
//! control flow, and nothing in the crate relies on an observer running.

use serde_json::{json, Value};

use crate::error::DecodeError;
use crate::key::Key;
use crate::value;

/// Snapshot of one decode failure, handed to the observer installed on a
/// decoder.
#[derive(Debug)]
pub struct DecodeFailure<'a> {
    /// Keys traversed from the root to the failing decode, outermost first.
    pub path: &'a [Key],
    /// `std::any::type_name` of the target type that failed to decode.
    pub target: &'a str,
    /// The dynamic value the target was decoded from.
    pub value: &'a Value,
    /// The failure itself.
    pub error: &'a DecodeError,
}

impl DecodeFailure<'_> {
    /// Renders the traversal path, e.g. `items[3].owner`.
    pub fn path_display(&self) -> String {
        let mut rendered = String::new();
        for key in self.path {
            if !rendered.is_empty() && !matches!(key, Key::Offset(_)) {
                rendered.push('.');
            }
            rendered.push_str(&key.display_name());
        }
        rendered
    }

    /// Renders the whole failure as a JSON object for telemetry sinks.
    pub fn to_json_value(&self) -> Value {
        json!({
            "path": self.path_display(),
            "target": self.target,
            "value_type": value::type_name(self.value),
            "error": self.error,
        })
    }
}

/// An observer that drops all failures.
pub fn ignore() -> impl FnMut(DecodeFailure<'_>) {
    |_failure| {}
}

/// An observer that emits one `tracing` warning per failure.
pub fn traced() -> impl FnMut(DecodeFailure<'_>) {
    |failure| {
        tracing::warn!(
            path = %failure.path_display(),
            target = failure.target,
            error = %failure.error,
            "decode failure"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_rendering_dots_names_and_glues_offsets() {
        let path = [Key::named("items"), Key::offset(3), Key::named("owner")];
        let error = DecodeError::Missing { key: Key::named("owner") };
        let failure = DecodeFailure {
            path: &path,
            target: "Owner",
            value: &json!({}),
            error: &error,
        };
        assert_eq!(failure.path_display(), "items[3].owner");
    }

    #[test]
    fn json_rendering_carries_the_structured_error() {
        let path = [Key::named("count")];
        let error = DecodeError::Null { key: Key::named("count") };
        let failure = DecodeFailure {
            path: &path,
            target: "i64",
            value: &Value::Null,
            error: &error,
        };
        let rendered = failure.to_json_value();
        assert_eq!(rendered["path"], "count");
        assert_eq!(rendered["value_type"], "Null");
        assert_eq!(rendered["error"]["Null"]["key"]["Named"], "count");
    }
}
