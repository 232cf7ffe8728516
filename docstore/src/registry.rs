//! Registry - entry point mapping identifiers to database state
//!
//! The registry creates one `DatabaseState` per identifier on first
//! reference, loading the last saved document at that moment, and hands out
//! `Handle`s on it. States live as long as the registry.
//!
//! Most programs use one registry per storage root. `Registry::global()`
//! provides a process-wide instance; configure it with
//! `Registry::install_global` before anything touches it.

use futures::future::BoxFuture;
use futures::FutureExt;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::error::{DocstoreError, Result};
use crate::handle::Handle;
use crate::identifier::Identifier;
use crate::idgen::IdGen;
use crate::io::{DocumentStore, FileStore};
use crate::state::DatabaseState;

static GLOBAL: OnceCell<Registry> = OnceCell::new();

fn storage_aliases<'a>(
    known: impl Iterator<Item = &'a Identifier>,
    id: &Identifier,
) -> Vec<Identifier> {
    known
        .filter(|other| *other != id && other.segments()[1..] == id.segments()[1..])
        .cloned()
        .collect()
}

pub struct Registry<S: DocumentStore = FileStore> {
    store: Arc<S>,
    databases: Mutex<HashMap<Identifier, Arc<DatabaseState<S>>>>,
    idgen: IdGen,
}

impl Registry<FileStore> {
    /// Registry storing documents as files below `config.root`
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        debug!(root = %config.root.display(), "file registry created");
        Self::with_store(FileStore::new(config.root))
    }

    /// Configure the process-wide registry
    ///
    /// # Errors
    ///
    /// `AlreadyConfigured` if the global registry was installed before or
    /// was already created with the default configuration by
    /// [`Registry::global`].
    pub fn install_global(config: StoreConfig) -> Result<&'static Self> {
        let mut installed = false;
        let registry = GLOBAL.get_or_init(|| {
            installed = true;
            Self::new(config)
        });
        if installed {
            Ok(registry)
        } else {
            Err(DocstoreError::AlreadyConfigured)
        }
    }

    /// The process-wide registry
    ///
    /// Created on first use from [`StoreConfig::from_env`] unless
    /// [`Registry::install_global`] ran first.
    pub fn global() -> &'static Self {
        GLOBAL.get_or_init(|| Self::new(StoreConfig::from_env()))
    }
}

impl<S: DocumentStore> Registry<S> {
    /// Registry on top of any storage backend
    #[must_use]
    pub fn with_store(store: S) -> Self {
        Self {
            store: Arc::new(store),
            databases: Mutex::new(HashMap::new()),
            idgen: IdGen::new(),
        }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// State for `id`, created (and loaded) on first reference
    pub fn get_or_create(&self, id: &Identifier) -> Arc<DatabaseState<S>> {
        let mut databases = self.databases.lock();
        if let Some(state) = databases.get(id) {
            return Arc::clone(state);
        }
        let aliases = storage_aliases(databases.keys(), id);
        if !aliases.is_empty() {
            warn!(
                id = %id,
                shared_with = ?aliases,
                "identifier shares its storage directory; writes are not ordered across them"
            );
        }
        let state = Arc::new(DatabaseState::load(id.clone(), Arc::clone(&self.store)));
        databases.insert(id.clone(), Arc::clone(&state));
        state
    }

    /// Other registered identifiers stored in the same directory as `id`
    #[must_use]
    pub fn storage_aliases(&self, id: &Identifier) -> Vec<Identifier> {
        let mut aliases = storage_aliases(self.databases.lock().keys(), id);
        aliases.sort();
        aliases
    }

    /// State for an identifier that was created before
    ///
    /// # Errors
    ///
    /// `UnregisteredIdentifier` if `id` was never referenced.
    pub fn get(&self, id: &Identifier) -> Result<Arc<DatabaseState<S>>> {
        self.databases
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| DocstoreError::UnregisteredIdentifier(id.clone()))
    }

    #[must_use]
    pub fn contains(&self, id: &Identifier) -> bool {
        self.databases.lock().contains_key(id)
    }

    /// Identifiers created so far, sorted
    #[must_use]
    pub fn identifiers(&self) -> Vec<Identifier> {
        let mut ids: Vec<Identifier> = self.databases.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// New session on `id` with its own copy of `default`
    pub fn handle(&self, id: &Identifier, default: &Value) -> Handle<S> {
        Handle::new(self.get_or_create(id), self.idgen.next_session(), default)
    }

    /// New session on an identifier that must already exist
    ///
    /// # Errors
    ///
    /// `UnregisteredIdentifier` if `id` was never referenced.
    pub fn existing_handle(&self, id: &Identifier, default: &Value) -> Result<Handle<S>> {
        Ok(Handle::new(self.get(id)?, self.idgen.next_session(), default))
    }

    /// New session on `id`, already Locked
    pub async fn open(&self, id: &Identifier, default: &Value) -> Result<Handle<S>> {
        let mut handle = self.handle(id, default);
        handle.open().await?;
        Ok(handle)
    }

    /// Run `f` with exclusive access to `id`
    ///
    /// After `f` finishes, the document is saved and the lock released if
    /// the handle is still Locked. This happens whether `f` returns `Ok`,
    /// returns `Err` or panics. An error from `f` takes precedence over a
    /// failed save; a panic is resumed after cleanup.
    ///
    /// ```no_run
    /// # use docstore::{Identifier, Registry, StoreConfig, DocstoreError};
    /// # use futures::FutureExt;
    /// # use serde_json::json;
    /// # async fn demo() -> Result<(), DocstoreError> {
    /// let registry = Registry::new(StoreConfig::default());
    /// let id: Identifier = "app.visits".parse()?;
    /// let total = registry
    ///     .with_database(&id, &json!(0), |db| {
    ///         async move {
    ///             let count = db.data()?;
    ///             *count = json!(count.as_i64().unwrap_or(0) + 1);
    ///             Ok::<_, DocstoreError>(count.clone())
    ///         }
    ///         .boxed()
    ///     })
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn with_database<T, E, F>(&self, id: &Identifier, default: &Value, f: F) -> Result<T, E>
    where
        F: for<'h> FnOnce(&'h mut Handle<S>) -> BoxFuture<'h, Result<T, E>>,
        E: From<DocstoreError>,
    {
        let mut handle = self.open(id, default).await?;
        let outcome = AssertUnwindSafe(f(&mut handle)).catch_unwind().await;

        let flushed = if handle.is_locked() {
            handle.save_and_close().await
        } else {
            Ok(())
        };

        match outcome {
            Ok(Ok(value)) => {
                flushed?;
                Ok(value)
            }
            Ok(Err(e)) => {
                if let Err(flush_err) = flushed {
                    warn!(id = %id, error = %flush_err, "save after failed scope also failed");
                }
                Err(e)
            }
            Err(panic) => {
                if let Err(flush_err) = flushed {
                    warn!(id = %id, error = %flush_err, "save after panicked scope failed");
                }
                std::panic::resume_unwind(panic)
            }
        }
    }
}
