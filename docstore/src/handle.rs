//! Database handles
//!
//! A `Handle` is one caller's session on one identifier:
//!
//! ```text
//! Created ──open()──▶ Opening ──turn granted──▶ Locked ──close()──▶ Closed
//!                                                 │  ▲
//!                                                 └──┘ save()
//! ```
//!
//! While Locked the handle is the only one allowed to read or mutate the
//! identifier's in-memory document. It works on its own copy-on-write
//! reference to the document as last released, and publishes that copy
//! back before the next holder gets the turn. Changes therefore become
//! visible to later handles, and to viewers, exactly when this one releases.
//!
//! Data access, `save` and `close` fail with `NotLocked` outside the Locked
//! state. A handle dropped while Locked releases its turn without saving.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::async_queue::QueueTurn;
use crate::error::{DocstoreError, PersistError, Result};
use crate::identifier::Identifier;
use crate::idgen::SessionId;
use crate::io::{encode_document, DocumentStore, FileStore};
use crate::state::DatabaseState;
use crate::view::ReadOnlyView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Created,
    Opening,
    Locked,
    Closed,
}

enum Lock {
    Created,
    Opening,
    Locked(QueueTurn),
    Closed,
}

pub struct Handle<S: DocumentStore = FileStore> {
    database: Arc<DatabaseState<S>>,
    session: SessionId,
    default: Value,
    lock: Lock,
    // Working copy; only meaningful while Locked
    document: Option<Arc<Value>>,
}

impl<S: DocumentStore> fmt::Debug for Handle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("identifier", self.database.identifier())
            .field("session", &self.session)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl<S: DocumentStore> Handle<S> {
    /// Create a session on `database`
    ///
    /// `default` is copied; later changes to the caller's value do not
    /// reach the handle.
    pub(crate) fn new(database: Arc<DatabaseState<S>>, session: SessionId, default: &Value) -> Self {
        Self {
            database,
            session,
            default: default.clone(),
            lock: Lock::Created,
            document: None,
        }
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session
    }

    #[must_use]
    pub fn identifier(&self) -> &Identifier {
        self.database.identifier()
    }

    #[must_use]
    pub fn default_value(&self) -> &Value {
        &self.default
    }

    #[must_use]
    pub fn state(&self) -> HandleState {
        match self.lock {
            Lock::Created => HandleState::Created,
            Lock::Opening => HandleState::Opening,
            Lock::Locked(_) => HandleState::Locked,
            Lock::Closed => HandleState::Closed,
        }
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        matches!(self.lock, Lock::Locked(_))
    }

    fn not_locked(&self) -> DocstoreError {
        if matches!(self.lock, Lock::Closed) {
            DocstoreError::HandleClosed {
                identifier: self.identifier().clone(),
                session: self.session,
            }
        } else {
            DocstoreError::NotLocked {
                identifier: self.identifier().clone(),
                session: self.session,
            }
        }
    }

    fn ensure_locked(&self) -> Result<()> {
        if self.is_locked() {
            Ok(())
        } else {
            Err(self.not_locked())
        }
    }

    /// Wait for exclusive access to the document
    ///
    /// The handle joins the access queue when `open` is called, so handles
    /// opened one after another are served in that order. Opening a Locked
    /// handle is a no-op; opening a Closed one fails with `HandleClosed`.
    pub fn open(&mut self) -> impl Future<Output = Result<()>> + '_ {
        let pending = if self.is_locked() {
            Ok(None)
        } else if matches!(self.lock, Lock::Closed) {
            Err(self.not_locked())
        } else {
            self.lock = Lock::Opening;
            Ok(Some(self.database.access_queue().acquire()))
        };

        async move {
            let acquire = match pending {
                Ok(Some(acquire)) => acquire,
                Ok(None) => return Ok(()),
                Err(e) => return Err(e),
            };
            debug!(
                session = %self.session,
                id = %self.identifier(),
                job = acquire.job_id(),
                "waiting for lock"
            );
            let turn = acquire.await;
            self.document = self.database.checkout();
            self.lock = Lock::Locked(turn);
            debug!(session = %self.session, id = %self.identifier(), "locked");
            Ok(())
        }
    }

    /// The document, for reading and mutating in place
    ///
    /// If no document exists yet, the handle's default becomes the document
    /// (in memory only until `save`). The first mutable access after
    /// `open` copies the released document if anyone else still shares it.
    pub fn data(&mut self) -> Result<&mut Value> {
        self.ensure_locked()?;
        let document = self.document.get_or_insert_with(|| {
            debug!(session = %self.session, id = %self.database.identifier(), "materializing default");
            Arc::new(self.default.clone())
        });
        Ok(Arc::make_mut(document))
    }

    /// Replace the document
    pub fn set_data(&mut self, value: Value) -> Result<()> {
        self.ensure_locked()?;
        self.document = Some(Arc::new(value));
        Ok(())
    }

    /// Independent deep copy of the document
    pub fn copy(&mut self) -> Result<Value> {
        Ok(self.data()?.clone())
    }

    /// Deep copy of the document decoded into `T`
    pub fn copy_as<T: DeserializeOwned>(&mut self) -> Result<T> {
        Ok(serde_json::from_value(self.copy()?)?)
    }

    /// Replace the document with the serialized form of `value`
    pub fn set_from<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.set_data(value)
    }

    /// Snapshot of the document (or the default while absent)
    ///
    /// Works in every state and never materializes the default. A Locked
    /// handle sees its own working copy, any other handle the document as
    /// last released.
    #[must_use]
    pub fn read_only_view(&self) -> ReadOnlyView {
        let document = if self.is_locked() {
            self.document.clone()
        } else {
            self.database.checkout()
        };
        ReadOnlyView::new(document.map_or_else(|| self.default.clone(), |doc| Value::clone(&doc)))
    }

    /// Durably write the current document
    ///
    /// Waits for earlier writes on this identifier to finish. The lock is
    /// kept either way; a write failure is returned as `Persistence`.
    pub async fn save(&mut self) -> Result<()> {
        // Materializes, so a never-touched database is written with its default
        let payload = encode_document(self.data()?).map_err(|e| self.persistence(e))?;
        self.database
            .flush(payload)
            .await
            .map_err(|e| self.persistence(e))?;
        debug!(session = %self.session, id = %self.identifier(), "saved");
        Ok(())
    }

    /// Release the lock; the next waiting handle becomes Locked
    pub fn close(&mut self) -> Result<()> {
        self.ensure_locked()?;
        self.release();
        debug!(session = %self.session, id = %self.identifier(), "released");
        Ok(())
    }

    /// Publish the working copy, then hand the turn on
    fn release(&mut self) {
        if let Lock::Locked(turn) = std::mem::replace(&mut self.lock, Lock::Closed) {
            self.database.publish(self.document.take());
            turn.release();
        }
    }

    fn persistence(&self, source: PersistError) -> DocstoreError {
        DocstoreError::Persistence {
            identifier: self.identifier().clone(),
            source,
        }
    }

    /// `save` then `close`; the lock is released even if saving fails
    pub async fn save_and_close(&mut self) -> Result<()> {
        self.ensure_locked()?;
        let saved = self.save().await;
        let closed = self.close();
        if let Err(e) = &saved {
            warn!(
                session = %self.session,
                id = %self.identifier(),
                error = %e,
                "closing after failed save"
            );
        }
        saved.and(closed)
    }
}

impl<S: DocumentStore> Drop for Handle<S> {
    fn drop(&mut self) {
        if self.is_locked() {
            warn!(
                session = %self.session,
                id = %self.identifier(),
                "dropped while locked, releasing without saving"
            );
            self.release();
        }
    }
}
