//! Per-identifier database state
//!
//! One `DatabaseState` exists per identifier for the lifetime of its
//! registry. It bundles the in-memory document with two independent FIFO
//! queues:
//!
//! - the access queue decides which handle may touch the document,
//! - the flush queue orders durable writes.
//!
//! The slot holds the document as last released. A handle checks it out
//! when its turn is granted and publishes its working copy back on release;
//! the slot's mutex is only ever held for a pointer swap or a clone.

use parking_lot::Mutex;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::async_queue::AsyncQueue;
use crate::error::PersistError;
use crate::identifier::Identifier;
use crate::io::DocumentStore;

pub struct DatabaseState<S: DocumentStore> {
    identifier: Identifier,
    document: Mutex<Option<Arc<Value>>>,
    access: AsyncQueue,
    flush: AsyncQueue,
    store: Arc<S>,
}

impl<S: DocumentStore> fmt::Debug for DatabaseState<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseState")
            .field("identifier", &self.identifier)
            .field("has_document", &self.has_document())
            .field("access", &self.access)
            .field("flush", &self.flush)
            .finish_non_exhaustive()
    }
}

impl<S: DocumentStore> DatabaseState<S> {
    /// Create the state for `identifier`, loading its last saved document
    pub(crate) fn load(identifier: Identifier, store: Arc<S>) -> Self {
        let document = store.load(&identifier);
        debug!(id = %identifier, loaded = document.is_some(), "database state created");
        Self {
            access: AsyncQueue::new(&format!("access {identifier}")),
            flush: AsyncQueue::new(&format!("flush {identifier}")),
            identifier,
            document: Mutex::new(document.map(Arc::new)),
            store,
        }
    }

    #[must_use]
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// Queue granting exclusive access to the document
    #[must_use]
    pub fn access_queue(&self) -> &AsyncQueue {
        &self.access
    }

    /// Queue ordering durable writes
    #[must_use]
    pub fn flush_queue(&self) -> &AsyncQueue {
        &self.flush
    }

    #[must_use]
    pub fn has_document(&self) -> bool {
        self.document.lock().is_some()
    }

    /// Deep copy of the released document, `None` while absent
    #[must_use]
    pub fn snapshot(&self) -> Option<Value> {
        self.checkout().map(|doc| Value::clone(&doc))
    }

    /// Shared reference to the released document
    pub(crate) fn checkout(&self) -> Option<Arc<Value>> {
        self.document.lock().clone()
    }

    /// Make a holder's working copy the released document
    ///
    /// A holder that never materialized a document leaves the slot as is.
    pub(crate) fn publish(&self, document: Option<Arc<Value>>) {
        if let Some(document) = document {
            *self.document.lock() = Some(document);
        }
    }

    /// Write `payload` through the flush queue
    ///
    /// Resolves once every earlier write on this identifier has finished and
    /// this one is durable.
    pub(crate) async fn flush(&self, payload: Vec<u8>) -> Result<(), PersistError> {
        self.flush
            .enqueue(move || self.store.save(&self.identifier, payload))
            .await
    }
}
