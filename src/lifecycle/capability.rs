//! Per-content capabilities
//!
//! A content kind plugs into the generic engine by supplying a payload type
//! and a small set of capabilities, instead of subclassing a lifecycle base:
//!
//! - `ItemPayload` - the payload itself, exposing the name used for uniqueness
//! - `NameUniquenessChecker` - "is this name already taken in my scope?"
//! - `UidGenerator` - fresh uids for new items
//! - `PayloadCodec` - serialization of the otherwise opaque payload

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::{LifecycleError, LifecycleResult};

/// Domain payload carried by a lifecycle item.
///
/// The engine never inspects payload fields; it only asks for the name that
/// must be unique within the owning library.
pub trait ItemPayload: Clone + fmt::Debug + PartialEq + Send + Sync + 'static {
    /// The semantic name checked for uniqueness.
    fn name(&self) -> &str;

    /// Content kinds that may be edited even when their library is locked.
    fn editable_in_locked_library() -> bool {
        false
    }
}

/// Answers whether a candidate name already exists in the caller's scope.
pub trait NameUniquenessChecker {
    fn name_exists(&self, candidate: &str) -> LifecycleResult<bool>;
}

impl<F> NameUniquenessChecker for F
where
    F: Fn(&str) -> bool,
{
    fn name_exists(&self, candidate: &str) -> LifecycleResult<bool> {
        Ok(self(candidate))
    }
}

/// Supplies uids for newly created items.
pub trait UidGenerator {
    fn generate_uid(&self) -> String;
}

/// Caller-defined serialization of a payload.
pub trait PayloadCodec<P>: Send + Sync {
    fn encode(&self, payload: &P) -> LifecycleResult<Vec<u8>>;
    fn decode(&self, bytes: &[u8]) -> LifecycleResult<P>;
}

/// JSON codec for any serde payload.
pub struct JsonCodec<P> {
    _payload: PhantomData<fn() -> P>,
}

impl<P> JsonCodec<P> {
    pub fn new() -> Self {
        Self {
            _payload: PhantomData,
        }
    }
}

impl<P> Default for JsonCodec<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> PayloadCodec<P> for JsonCodec<P>
where
    P: Serialize + DeserializeOwned,
{
    fn encode(&self, payload: &P) -> LifecycleResult<Vec<u8>> {
        serde_json::to_vec(payload).map_err(|e| LifecycleError::Codec(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> LifecycleResult<P> {
        serde_json::from_slice(bytes).map_err(|e| LifecycleError::Codec(e.to_string()))
    }
}
