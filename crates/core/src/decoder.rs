//! The decode context: path stack, observer dispatch, batch policies.
//!
//! A [`Decoder`] is created once per top-level decode invocation and
//! discarded when it returns. It owns the path stack outright and mutates
//! it only through scoped push/pop, so the stack depth on return from any
//! public operation equals the depth on entry -- success or failure.
//! `&mut self` receivers make concurrent use of one context
//! unrepresentable; concurrent decodes each build their own.

use serde_json::Value;

use crate::error::DecodeError;
use crate::key::Key;
use crate::observe::DecodeFailure;
use crate::value;

/// The capability a domain type implements to build itself from a dynamic
/// value plus a decode context.
///
/// Implemented once per domain type, by hand, using that type's own set of
/// [`Key`] values. No derive, no reflection -- the field list stays visible
/// at the use site.
pub trait Decode: Sized {
    fn decode(raw: &Value, dec: &mut Decoder<'_, '_>) -> Result<Self, DecodeError>;
}

/// The decode context for one top-level decode call tree.
pub struct Decoder<'v, 'o> {
    root: &'v Value,
    path: Vec<Key>,
    observer: Box<dyn FnMut(DecodeFailure<'_>) + 'o>,
}

impl<'v, 'o> Decoder<'v, 'o> {
    /// Creates a context over one root document.
    pub fn new(root: &'v Value, observer: impl FnMut(DecodeFailure<'_>) + 'o) -> Self {
        Decoder {
            root,
            path: Vec::new(),
            observer: Box::new(observer),
        }
    }

    /// The root document this decode started from. Available to `Decode`
    /// impls that re-query the document, typically paired with
    /// [`Key::key_field`].
    pub fn root(&self) -> &'v Value {
        self.root
    }

    /// The keys traversed so far, outermost first.
    pub fn path(&self) -> &[Key] {
        &self.path
    }

    // ── Scope discipline ────────────────────────────────────────────

    /// Runs `work` with `key` pushed onto the path, popping it again on
    /// every exit path.
    pub fn pushed<R>(&mut self, key: Key, work: impl FnOnce(&mut Self) -> R) -> R {
        self.path.push(key);
        let outcome = work(self);
        self.path.pop();
        outcome
    }

    fn observe(&mut self, target: &'static str, raw: &Value, error: &DecodeError) {
        let Decoder { path, observer, .. } = self;
        (observer)(DecodeFailure {
            path: path.as_slice(),
            target,
            value: raw,
            error,
        });
    }

    // ── Recursive decode ────────────────────────────────────────────

    /// Decodes one value into `T`, reporting any failure to the observer
    /// before propagating it unchanged. Observation never swallows the
    /// error here; lenient callers drop it afterwards.
    pub fn decode_one<T: Decode>(&mut self, raw: &Value) -> Result<T, DecodeError> {
        match T::decode(raw, self) {
            Ok(decoded) => Ok(decoded),
            Err(error) => {
                self.observe(std::any::type_name::<T>(), raw, &error);
                Err(error)
            }
        }
    }

    /// Strict batch decode: each element under its offset scope, first
    /// failure aborts the whole call. Elements after the failing one are
    /// never attempted.
    pub fn decode_all<T: Decode>(&mut self, items: &[Value]) -> Result<Vec<T>, DecodeError> {
        self.map(items, |dec, item| dec.decode_one(item))
    }

    /// Lenient batch decode: elements that fail are dropped after the
    /// standard observer notification; survivors keep their original
    /// relative order. Never fails as a whole.
    pub fn decode_lenient<T: Decode>(&mut self, items: &[Value]) -> Vec<T> {
        self.lenient_map(items, |dec, item| dec.decode_one(item))
    }

    // ── Generic batch transforms ────────────────────────────────────

    /// Applies a fallible transform to each item under an offset scope,
    /// aborting on the first failure.
    pub fn map<T, U>(
        &mut self,
        items: &[T],
        mut transform: impl FnMut(&mut Self, &T) -> Result<U, DecodeError>,
    ) -> Result<Vec<U>, DecodeError> {
        items
            .iter()
            .enumerate()
            .map(|(offset, item)| self.pushed(Key::Offset(offset), |dec| transform(dec, item)))
            .collect()
    }

    /// Error-discarding variant of [`Decoder::map`].
    pub fn lenient_map<T, U>(
        &mut self,
        items: &[T],
        mut transform: impl FnMut(&mut Self, &T) -> Result<U, DecodeError>,
    ) -> Vec<U> {
        items
            .iter()
            .enumerate()
            .filter_map(|(offset, item)| {
                self.pushed(Key::Offset(offset), |dec| transform(dec, item))
                    .ok()
            })
            .collect()
    }

    /// Per-item transforms producing many outputs, concatenated in order;
    /// first failure aborts.
    pub fn flat_map<T, U>(
        &mut self,
        items: &[T],
        mut transform: impl FnMut(&mut Self, &T) -> Result<Vec<U>, DecodeError>,
    ) -> Result<Vec<U>, DecodeError> {
        let mut out = Vec::new();
        for (offset, item) in items.iter().enumerate() {
            let mut chunk = self.pushed(Key::Offset(offset), |dec| transform(dec, item))?;
            out.append(&mut chunk);
        }
        Ok(out)
    }

    /// Error-discarding variant of [`Decoder::flat_map`].
    pub fn lenient_flat_map<T, U>(
        &mut self,
        items: &[T],
        mut transform: impl FnMut(&mut Self, &T) -> Result<Vec<U>, DecodeError>,
    ) -> Vec<U> {
        let mut out = Vec::new();
        for (offset, item) in items.iter().enumerate() {
            if let Ok(mut chunk) = self.pushed(Key::Offset(offset), |dec| transform(dec, item)) {
                out.append(&mut chunk);
            }
        }
        out
    }

    /// Per-item transforms that may skip items; first failure aborts.
    pub fn filter_map<T, U>(
        &mut self,
        items: &[T],
        mut transform: impl FnMut(&mut Self, &T) -> Result<Option<U>, DecodeError>,
    ) -> Result<Vec<U>, DecodeError> {
        let mut out = Vec::new();
        for (offset, item) in items.iter().enumerate() {
            if let Some(mapped) = self.pushed(Key::Offset(offset), |dec| transform(dec, item))? {
                out.push(mapped);
            }
        }
        Ok(out)
    }

    /// Error-discarding variant of [`Decoder::filter_map`].
    pub fn lenient_filter_map<T, U>(
        &mut self,
        items: &[T],
        mut transform: impl FnMut(&mut Self, &T) -> Result<Option<U>, DecodeError>,
    ) -> Vec<U> {
        let mut out = Vec::new();
        for (offset, item) in items.iter().enumerate() {
            if let Ok(Some(mapped)) = self.pushed(Key::Offset(offset), |dec| transform(dec, item))
            {
                out.push(mapped);
            }
        }
        out
    }

    // ── Path descent ────────────────────────────────────────────────

    /// Descends a key path, pushing each traversed key, and hands the
    /// object at the end of the path to `work` at full depth. All pushes
    /// performed during the descent are undone on every exit path.
    pub fn descend<U>(
        &mut self,
        doc: &Value,
        path: &[Key],
        work: impl FnOnce(&mut Self, &Value) -> Result<U, DecodeError>,
    ) -> Result<U, DecodeError> {
        let depth = self.path.len();
        let outcome = self.descend_inner(doc, path, work);
        self.path.truncate(depth);
        outcome
    }

    fn descend_inner<U>(
        &mut self,
        doc: &Value,
        path: &[Key],
        work: impl FnOnce(&mut Self, &Value) -> Result<U, DecodeError>,
    ) -> Result<U, DecodeError> {
        let mut current = doc;
        for key in path {
            let next = key.any_value(current)?;
            self.path.push(key.clone());
            current = next;
        }
        value::as_object(current)?;
        work(self, current)
    }

    /// Optional descent: absence or null at any step yields `Ok(None)`
    /// without error. Non-object steps and transform failures still
    /// propagate.
    pub fn descend_opt<U>(
        &mut self,
        doc: &Value,
        path: &[Key],
        work: impl FnOnce(&mut Self, &Value) -> Result<U, DecodeError>,
    ) -> Result<Option<U>, DecodeError> {
        let depth = self.path.len();
        let outcome = self.descend_opt_inner(doc, path, work);
        self.path.truncate(depth);
        outcome
    }

    fn descend_opt_inner<U>(
        &mut self,
        doc: &Value,
        path: &[Key],
        work: impl FnOnce(&mut Self, &Value) -> Result<U, DecodeError>,
    ) -> Result<Option<U>, DecodeError> {
        let mut current = doc;
        for key in path {
            match key.optional_any_value(current)? {
                None => return Ok(None),
                Some(next) => {
                    self.path.push(key.clone());
                    current = next;
                }
            }
        }
        value::as_object(current)?;
        work(self, current).map(Some)
    }

    // ── Keyed access under scope ────────────────────────────────────

    /// Looks up a required field and runs `work` on it under the key's
    /// scope.
    pub fn with_value<U>(
        &mut self,
        doc: &Value,
        key: &Key,
        work: impl FnOnce(&mut Self, &Value) -> Result<U, DecodeError>,
    ) -> Result<U, DecodeError> {
        let raw = key.any_value(doc)?;
        self.pushed(key.clone(), |dec| work(dec, raw))
    }

    /// Optional form of [`Decoder::with_value`]; only absence and null
    /// yield `None`.
    pub fn with_optional_value<U>(
        &mut self,
        doc: &Value,
        key: &Key,
        work: impl FnOnce(&mut Self, &Value) -> Result<U, DecodeError>,
    ) -> Result<Option<U>, DecodeError> {
        match key.optional_any_value(doc)? {
            None => Ok(None),
            Some(raw) => self.pushed(key.clone(), |dec| work(dec, raw)).map(Some),
        }
    }

    /// Recursively decodes a required field into `T`.
    pub fn decoded<T: Decode>(&mut self, doc: &Value, key: &Key) -> Result<T, DecodeError> {
        self.with_value(doc, key, |dec, raw| dec.decode_one(raw))
    }

    /// Recursively decodes an optional field into `T`.
    pub fn optional_decoded<T: Decode>(
        &mut self,
        doc: &Value,
        key: &Key,
    ) -> Result<Option<T>, DecodeError> {
        self.with_optional_value(doc, key, |dec, raw| dec.decode_one(raw))
    }

    /// Strict decode of a required array field's elements.
    pub fn decoded_all<T: Decode>(
        &mut self,
        doc: &Value,
        key: &Key,
    ) -> Result<Vec<T>, DecodeError> {
        let items = key.array(doc)?;
        self.pushed(key.clone(), |dec| dec.decode_all(items))
    }

    /// Strict decode of an optional array field's elements.
    pub fn optional_decoded_all<T: Decode>(
        &mut self,
        doc: &Value,
        key: &Key,
    ) -> Result<Option<Vec<T>>, DecodeError> {
        match key.optional_array(doc)? {
            None => Ok(None),
            Some(items) => self.pushed(key.clone(), |dec| dec.decode_all(items)).map(Some),
        }
    }

    /// Lenient decode of a required array field's elements. The field
    /// lookup itself can still fail; element failures are dropped.
    pub fn decoded_lenient<T: Decode>(
        &mut self,
        doc: &Value,
        key: &Key,
    ) -> Result<Vec<T>, DecodeError> {
        let items = key.array(doc)?;
        Ok(self.pushed(key.clone(), |dec| dec.decode_lenient(items)))
    }

    /// Lenient decode of an optional array field's elements.
    pub fn optional_decoded_lenient<T: Decode>(
        &mut self,
        doc: &Value,
        key: &Key,
    ) -> Result<Option<Vec<T>>, DecodeError> {
        match key.optional_array(doc)? {
            None => Ok(None),
            Some(items) => Ok(Some(self.pushed(key.clone(), |dec| dec.decode_lenient(items)))),
        }
    }

    /// Applies [`Decoder::map`] to a required array field.
    pub fn map_at<U>(
        &mut self,
        doc: &Value,
        key: &Key,
        transform: impl FnMut(&mut Self, &Value) -> Result<U, DecodeError>,
    ) -> Result<Vec<U>, DecodeError> {
        let items = key.array(doc)?;
        self.pushed(key.clone(), |dec| dec.map(items, transform))
    }

    /// Applies [`Decoder::lenient_map`] to a required array field.
    pub fn lenient_map_at<U>(
        &mut self,
        doc: &Value,
        key: &Key,
        transform: impl FnMut(&mut Self, &Value) -> Result<U, DecodeError>,
    ) -> Result<Vec<U>, DecodeError> {
        let items = key.array(doc)?;
        Ok(self.pushed(key.clone(), |dec| dec.lenient_map(items, transform)))
    }

    /// Applies [`Decoder::flat_map`] to a required array field.
    pub fn flat_map_at<U>(
        &mut self,
        doc: &Value,
        key: &Key,
        transform: impl FnMut(&mut Self, &Value) -> Result<Vec<U>, DecodeError>,
    ) -> Result<Vec<U>, DecodeError> {
        let items = key.array(doc)?;
        self.pushed(key.clone(), |dec| dec.flat_map(items, transform))
    }

    /// Applies [`Decoder::lenient_flat_map`] to a required array field.
    pub fn lenient_flat_map_at<U>(
        &mut self,
        doc: &Value,
        key: &Key,
        transform: impl FnMut(&mut Self, &Value) -> Result<Vec<U>, DecodeError>,
    ) -> Result<Vec<U>, DecodeError> {
        let items = key.array(doc)?;
        Ok(self.pushed(key.clone(), |dec| dec.lenient_flat_map(items, transform)))
    }

    /// Applies [`Decoder::filter_map`] to a required array field.
    pub fn filter_map_at<U>(
        &mut self,
        doc: &Value,
        key: &Key,
        transform: impl FnMut(&mut Self, &Value) -> Result<Option<U>, DecodeError>,
    ) -> Result<Vec<U>, DecodeError> {
        let items = key.array(doc)?;
        self.pushed(key.clone(), |dec| dec.filter_map(items, transform))
    }

    /// Applies [`Decoder::lenient_filter_map`] to a required array field.
    pub fn lenient_filter_map_at<U>(
        &mut self,
        doc: &Value,
        key: &Key,
        transform: impl FnMut(&mut Self, &Value) -> Result<Option<U>, DecodeError>,
    ) -> Result<Vec<U>, DecodeError> {
        let items = key.array(doc)?;
        Ok(self.pushed(key.clone(), |dec| dec.lenient_filter_map(items, transform)))
    }
}

// ── Top-level entry points ──────────────────────────────────────────

/// Decodes a root document into `T` with a fresh context.
pub fn decode_root<T: Decode>(
    root: &Value,
    observer: impl FnMut(DecodeFailure<'_>),
) -> Result<T, DecodeError> {
    let mut dec = Decoder::new(root, observer);
    dec.decode_one(root)
}

/// Strict decode of an array-shaped root into a vector of `T`.
pub fn decode_root_all<T: Decode>(
    root: &Value,
    observer: impl FnMut(DecodeFailure<'_>),
) -> Result<Vec<T>, DecodeError> {
    let items = root_items(root)?;
    let mut dec = Decoder::new(root, observer);
    dec.decode_all(items)
}

/// Lenient decode of an array-shaped root. Element failures are dropped;
/// only a non-array root errors.
pub fn decode_root_lenient<T: Decode>(
    root: &Value,
    observer: impl FnMut(DecodeFailure<'_>),
) -> Result<Vec<T>, DecodeError> {
    let items = root_items(root)?;
    let mut dec = Decoder::new(root, observer);
    Ok(dec.decode_lenient(items))
}

fn root_items(root: &Value) -> Result<&Vec<Value>, DecodeError> {
    root.as_array().ok_or_else(|| DecodeError::ExpectedContainer {
        actual: root.clone(),
    })
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use serde_json::json;

    use super::*;

    fn quiet<'v>(root: &'v Value) -> Decoder<'v, 'static> {
        Decoder::new(root, |_failure| {})
    }

    #[test]
    fn pushed_restores_depth_on_success_and_error() {
        let doc = json!({});
        let mut dec = quiet(&doc);

        let ok: Result<(), DecodeError> = dec.pushed(Key::named("a"), |inner| {
            assert_eq!(inner.path(), [Key::named("a")]);
            Ok(())
        });
        assert!(ok.is_ok());
        assert!(dec.path().is_empty());

        let err: Result<(), DecodeError> = dec.pushed(Key::named("b"), |_inner| {
            Err(DecodeError::Missing { key: Key::named("x") })
        });
        assert!(err.is_err());
        assert!(dec.path().is_empty());
    }

    #[test]
    fn map_aborts_at_first_failure_without_visiting_the_rest() {
        let doc = json!({});
        let mut dec = quiet(&doc);
        let items = vec![json!(1), json!(2), json!("boom"), json!(4), json!(5)];
        let visited = Cell::new(0usize);

        let outcome = dec.map(&items, |dec, item| {
            visited.set(visited.get() + 1);
            assert_eq!(dec.path().len(), 1);
            Key::named("n").value::<i64>(&json!({ "n": item.clone() }))
        });

        assert!(outcome.is_err());
        assert_eq!(visited.get(), 3);
        assert!(dec.path().is_empty());
    }

    #[test]
    fn lenient_map_drops_failures_and_keeps_order() {
        let doc = json!({});
        let mut dec = quiet(&doc);
        let items = vec![json!(10), json!("x"), json!(30), json!("y"), json!(50)];

        let survivors = dec.lenient_map(&items, |_dec, item| {
            Key::named("n").value::<i64>(&json!({ "n": item.clone() }))
        });

        assert_eq!(survivors, vec![10, 30, 50]);
        assert!(dec.path().is_empty());
    }

    #[test]
    fn flat_and_filter_map_policies() {
        let doc = json!({});
        let mut dec = quiet(&doc);
        let items = vec![json!([1, 2]), json!([3]), json!("bad")];

        let flattened = dec.lenient_flat_map(&items, |_dec, item| {
            Key::named("a").value::<Vec<i64>>(&json!({ "a": item.clone() }))
        });
        assert_eq!(flattened, vec![1, 2, 3]);

        let strict = dec.flat_map(&items, |_dec, item| {
            Key::named("a").value::<Vec<i64>>(&json!({ "a": item.clone() }))
        });
        assert!(strict.is_err());

        let evens = dec
            .filter_map(&[json!(1), json!(2), json!(3), json!(4)], |_dec, item| {
                let n = item.as_i64().expect("test items are numbers");
                Ok((n % 2 == 0).then_some(n))
            })
            .expect("no failures");
        assert_eq!(evens, vec![2, 4]);
        assert!(dec.path().is_empty());
    }

    #[test]
    fn descent_pushes_each_step_and_unwinds() {
        let doc = json!({ "a": { "b": { "leaf": 1 } } });
        let mut dec = quiet(&doc);
        let path = Key::path(["a", "b"]);

        let leaf = dec
            .descend(&doc, &path, |dec, inner| {
                assert_eq!(dec.path(), path.as_slice());
                Key::named("leaf").value::<i64>(inner)
            })
            .expect("descends");
        assert_eq!(leaf, 1);
        assert!(dec.path().is_empty());

        // A failing step unwinds whatever was already pushed.
        let missing = dec.descend(&doc, &Key::path(["a", "nope"]), |_dec, _inner| Ok(()));
        assert_eq!(
            missing,
            Err(DecodeError::Missing { key: Key::named("nope") })
        );
        assert!(dec.path().is_empty());
    }

    #[test]
    fn optional_descent_returns_none_without_error() {
        let doc = json!({ "a": { "b": null } });
        let mut dec = quiet(&doc);

        let absent = dec
            .descend_opt(&doc, &Key::path(["a", "b"]), |_dec, _inner| Ok(1))
            .expect("absorbed");
        assert_eq!(absent, None);
        assert!(dec.path().is_empty());

        // A present non-object step is not absorbed.
        let doc = json!({ "a": { "b": 5 } });
        let wrong_shape = dec.descend_opt(&doc, &Key::path(["a", "b"]), |_dec, _inner| Ok(1));
        assert_eq!(
            wrong_shape,
            Err(DecodeError::ExpectedContainer { actual: json!(5) })
        );
        assert!(dec.path().is_empty());
    }

    #[test]
    fn with_value_scopes_the_transform() {
        let doc = json!({ "inner": { "n": 9 } });
        let mut dec = quiet(&doc);
        let inner = Key::named("inner");

        let n = dec
            .with_value(&doc, &inner, |dec, raw| {
                assert_eq!(dec.path(), [inner.clone()]);
                Key::named("n").value::<i64>(raw)
            })
            .expect("present");
        assert_eq!(n, 9);
        assert!(dec.path().is_empty());

        let skipped = dec
            .with_optional_value(&doc, &Key::named("outer"), |_dec, _raw| Ok(0))
            .expect("absorbed");
        assert_eq!(skipped, None);
    }

    struct Point {
        x: i64,
    }

    impl Decode for Point {
        fn decode(raw: &Value, _dec: &mut Decoder<'_, '_>) -> Result<Self, DecodeError> {
            Ok(Point {
                x: Key::named("x").value(raw)?,
            })
        }
    }

    #[test]
    fn non_array_root_is_expected_container() {
        let root = json!({ "not": "an array" });
        let strict = decode_root_all::<Point>(&root, |_failure| {});
        assert!(matches!(
            strict,
            Err(DecodeError::ExpectedContainer { .. })
        ));
    }

    #[test]
    fn root_entry_points_decode_arrays_under_both_policies() {
        let root = json!([{ "x": 1 }, { "x": "two" }, { "x": 3 }]);

        let strict = decode_root_all::<Point>(&root, |_failure| {});
        assert!(strict.is_err());

        let mut offsets = Vec::new();
        let survivors =
            decode_root_lenient::<Point>(&root, |failure| offsets.push(failure.path.to_vec()))
                .expect("array root");
        assert_eq!(survivors.iter().map(|p| p.x).collect::<Vec<_>>(), [1, 3]);
        assert_eq!(offsets, [vec![Key::offset(1)]]);
    }
}
