//! Document storage types and traits

use serde_json::Value;
use std::future::Future;

use crate::error::PersistError;
use crate::identifier::Identifier;

/// Trait for document storage backends
///
/// Each identifier maps to at most one JSON document. Backends are shared
/// by every database of a registry and must be safe to call from any task.
pub trait DocumentStore: Send + Sync + 'static {
    /// Load the last saved document for `id`.
    ///
    /// Synchronous and best effort: anything unreadable counts as absent,
    /// and absence is not an error (the caller falls back to its default).
    fn load(&self, id: &Identifier) -> Option<Value>;

    /// Durably store an already encoded document for `id`.
    ///
    /// Callers serialize once with [`encode_document`] and hand over the
    /// bytes, so no borrow of the live document is held across the write.
    fn save(
        &self,
        id: &Identifier,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), PersistError>> + Send;
}

/// Serialize a document the way every backend stores it
///
/// # Errors
///
/// `PersistError::Encode` if the value cannot be serialized.
pub fn encode_document(doc: &Value) -> Result<Vec<u8>, PersistError> {
    Ok(serde_json::to_vec_pretty(doc)?)
}

/// Parse stored bytes; `None` for anything that is not valid JSON
#[must_use]
pub fn decode_document(bytes: &[u8]) -> Option<Value> {
    serde_json::from_slice(bytes).ok()
}
