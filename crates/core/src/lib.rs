//! plumb-core: typed key-path access and decoding over dynamic JSON values.
//!
//! The crate is a one-directional decode layer: callers hand it an
//! already-parsed `serde_json::Value` document and pull statically-typed
//! values back out of it. Three pieces cooperate:
//!
//! - [`Key`] -- lookup descriptors (named members, compound nested paths,
//!   array offsets) with typed field accessors.
//! - [`FromValue`] -- the conversion contract turning loosely-typed scalars
//!   into exact target types.
//! - [`Decoder`] -- the per-call context that tracks the traversal path,
//!   dispatches recursive [`Decode`] impls, and applies strict or lenient
//!   policy to collection decoding.
//!
//! Failures are structured [`DecodeError`] values naming the key and the
//! offending value; the traversal context above a failure travels through
//! the observer side-channel (see [`observe`]) instead of being baked into
//! the error. Parsing text into the initial document, and serializing
//! anything back out, are both out of scope.

pub mod convert;
pub mod decoder;
pub mod error;
pub mod key;
pub mod observe;
pub mod value;

pub use convert::FromValue;
pub use decoder::{decode_root, decode_root_all, decode_root_lenient, Decode, Decoder};
pub use error::DecodeError;
pub use key::Key;
pub use observe::DecodeFailure;
