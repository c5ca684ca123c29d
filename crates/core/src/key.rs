//! Key algebra: lookup descriptors and keyed field access.
//!
//! A [`Key`] is a pure descriptor -- it owns no document data and can be
//! reused across any number of decode calls. Domain types typically keep
//! their field keys as small constructors next to their `Decode` impl.
//!
//! Accessors that need no decode context live here as methods on `Key`;
//! accessors that push traversal context live on
//! [`Decoder`](crate::decoder::Decoder).

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::convert::FromValue;
use crate::error::DecodeError;
use crate::value;

/// A lookup descriptor into an object-shaped dynamic value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Key {
    /// A plain object member name.
    Named(String),
    /// An ordered chain of keys, resolved by descending one object level
    /// per part. Displays as the concatenation of its parts.
    Compound(Vec<Key>),
    /// A position within an array, recorded for traversal context during
    /// batch operations. Displays as `[i]`.
    Offset(usize),
}

impl Key {
    pub fn named(name: impl Into<String>) -> Self {
        Key::Named(name.into())
    }

    pub fn compound(keys: impl Into<Vec<Key>>) -> Self {
        Key::Compound(keys.into())
    }

    pub fn offset(offset: usize) -> Self {
        Key::Offset(offset)
    }

    /// Builds a key sequence for path descent from anything key-like.
    pub fn path<K: Into<Key>>(keys: impl IntoIterator<Item = K>) -> Vec<Key> {
        keys.into_iter().map(Into::into).collect()
    }

    /// The name shown in diagnostics, and the member name a non-compound
    /// key looks up.
    pub fn display_name(&self) -> String {
        self.to_string()
    }

    // ── Raw lookup ──────────────────────────────────────────────────

    /// Looks up this key in `doc`.
    ///
    /// `doc` must be an object, else `ExpectedContainer`. An absent member
    /// is `Missing`, an explicit null is `Null`, anything else is returned
    /// raw. A compound key descends one object level per part and fails
    /// with whichever error the failing part produced.
    pub fn any_value<'v>(&self, doc: &'v Value) -> Result<&'v Value, DecodeError> {
        match self {
            Key::Compound(keys) => {
                let mut current = doc;
                for key in keys {
                    current = key.any_value(current)?;
                }
                Ok(current)
            }
            other => match other.member(doc)? {
                None => Err(DecodeError::Missing { key: self.clone() }),
                Some(Value::Null) => Err(DecodeError::Null { key: self.clone() }),
                Some(stored) => Ok(stored),
            },
        }
    }

    /// Like [`Key::any_value`], but absence and null both yield `None`
    /// without error -- at any depth, for compound keys. A non-object along
    /// the way still fails `ExpectedContainer`.
    pub fn optional_any_value<'v>(&self, doc: &'v Value) -> Result<Option<&'v Value>, DecodeError> {
        match self {
            Key::Compound(keys) => {
                let mut current = doc;
                for key in keys {
                    match key.optional_any_value(current)? {
                        None => return Ok(None),
                        Some(next) => current = next,
                    }
                }
                Ok(Some(current))
            }
            other => match other.member(doc)? {
                None | Some(Value::Null) => Ok(None),
                Some(stored) => Ok(Some(stored)),
            },
        }
    }

    /// Object member lookup by this key's display name.
    fn member<'v>(&self, doc: &'v Value) -> Result<Option<&'v Value>, DecodeError> {
        let object = value::as_object(doc)?;
        Ok(match self {
            Key::Named(name) => object.get(name.as_str()),
            other => object.get(&other.display_name()),
        })
    }

    // ── Typed field access ──────────────────────────────────────────

    /// Looks up and converts a required field.
    pub fn value<T: FromValue>(&self, doc: &Value) -> Result<T, DecodeError> {
        let raw = self.any_value(doc)?;
        T::from_value(raw, self)
    }

    /// Looks up and converts an optional field. Only absence and null are
    /// absorbed; a present value that fails conversion still errors.
    pub fn optional_value<T: FromValue>(&self, doc: &Value) -> Result<Option<T>, DecodeError> {
        match self.optional_any_value(doc)? {
            None => Ok(None),
            Some(raw) => T::from_value(raw, self).map(Some),
        }
    }

    /// A required nested-object field.
    pub fn object<'v>(&self, doc: &'v Value) -> Result<&'v Map<String, Value>, DecodeError> {
        let raw = self.any_value(doc)?;
        raw.as_object()
            .ok_or_else(|| self.mismatch("Object", raw))
    }

    /// An optional nested-object field.
    pub fn optional_object<'v>(
        &self,
        doc: &'v Value,
    ) -> Result<Option<&'v Map<String, Value>>, DecodeError> {
        match self.optional_any_value(doc)? {
            None => Ok(None),
            Some(raw) => raw
                .as_object()
                .map(Some)
                .ok_or_else(|| self.mismatch("Object", raw)),
        }
    }

    /// A required array field, returned raw for batch operations.
    pub fn array<'v>(&self, doc: &'v Value) -> Result<&'v Vec<Value>, DecodeError> {
        let raw = self.any_value(doc)?;
        raw.as_array().ok_or_else(|| self.mismatch("Array", raw))
    }

    /// An optional array field.
    pub fn optional_array<'v>(&self, doc: &'v Value) -> Result<Option<&'v Vec<Value>>, DecodeError> {
        match self.optional_any_value(doc)? {
            None => Ok(None),
            Some(raw) => raw
                .as_array()
                .map(Some)
                .ok_or_else(|| self.mismatch("Array", raw)),
        }
    }

    /// A required numeric field holding Unix epoch seconds.
    pub fn timestamp(&self, doc: &Value) -> Result<time::OffsetDateTime, DecodeError> {
        let raw = self.any_value(doc)?;
        let seconds = f64::from_value(raw, self)?;
        self.epoch_datetime(raw, seconds)
    }

    /// An optional numeric field holding Unix epoch seconds.
    pub fn optional_timestamp(
        &self,
        doc: &Value,
    ) -> Result<Option<time::OffsetDateTime>, DecodeError> {
        match self.optional_any_value(doc)? {
            None => Ok(None),
            Some(raw) => {
                let seconds = f64::from_value(raw, self)?;
                self.epoch_datetime(raw, seconds).map(Some)
            }
        }
    }

    /// Reads a required string field and reinterprets it as a fresh named
    /// key, enabling data-driven re-lookup.
    pub fn key_field(&self, doc: &Value) -> Result<Key, DecodeError> {
        let name: String = self.value(doc)?;
        Ok(Key::Named(name))
    }

    /// Optional form of [`Key::key_field`].
    pub fn optional_key_field(&self, doc: &Value) -> Result<Option<Key>, DecodeError> {
        Ok(self.optional_value::<String>(doc)?.map(Key::Named))
    }

    fn epoch_datetime(
        &self,
        raw: &Value,
        seconds: f64,
    ) -> Result<time::OffsetDateTime, DecodeError> {
        let nanos = (seconds * 1e9) as i128;
        time::OffsetDateTime::from_unix_timestamp_nanos(nanos).map_err(|_| {
            DecodeError::InvalidValue {
                key: self.clone(),
                actual: raw.clone(),
            }
        })
    }

    pub(crate) fn mismatch(&self, expected: &'static str, actual: &Value) -> DecodeError {
        DecodeError::TypeMismatch {
            key: self.clone(),
            expected,
            actual: actual.clone(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Named(name) => f.write_str(name),
            Key::Compound(keys) => {
                for key in keys {
                    write!(f, "{key}")?;
                }
                Ok(())
            }
            Key::Offset(offset) => write!(f, "[{offset}]"),
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Named(name.to_owned())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Named(name)
    }
}
