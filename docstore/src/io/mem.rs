//! In-memory implementation of `DocumentStore`

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;

use super::types::{decode_document, DocumentStore};
use crate::error::PersistError;
use crate::identifier::Identifier;

/// In-memory implementation of `DocumentStore`
///
/// Keeps the encoded bytes per identifier, so a registry built on top of a
/// `MemStore` behaves like one built on files, minus durability. Useful for
/// testing and for ephemeral databases.
#[derive(Debug, Default)]
pub struct MemStore {
    documents: Mutex<HashMap<Identifier, Vec<u8>>>,
}

impl MemStore {
    /// Create a new empty `MemStore`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw bytes last saved for `id`
    #[must_use]
    pub fn raw(&self, id: &Identifier) -> Option<Vec<u8>> {
        self.documents.lock().get(id).cloned()
    }

    /// Put raw bytes in place, bypassing encoding
    pub fn insert_raw(&self, id: &Identifier, bytes: Vec<u8>) {
        self.documents.lock().insert(id.clone(), bytes);
    }

    /// Identifiers with a stored document, sorted
    #[must_use]
    pub fn identifiers(&self) -> Vec<Identifier> {
        let mut ids: Vec<Identifier> = self.documents.lock().keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl DocumentStore for MemStore {
    fn load(&self, id: &Identifier) -> Option<Value> {
        let documents = self.documents.lock();
        documents.get(id).and_then(|bytes| decode_document(bytes))
    }

    async fn save(&self, id: &Identifier, payload: Vec<u8>) -> Result<(), PersistError> {
        self.documents.lock().insert(id.clone(), payload);
        Ok(())
    }
}
