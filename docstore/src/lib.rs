//! File-backed JSON document store with per-identifier exclusive sessions
//!
//! ```text
//! Registry ── Identifier ──▶ DatabaseState ─┬─ document (in memory)
//!                                           ├─ access queue (one holder)
//!                                           └─ flush queue  (ordered writes)
//!                                                   │
//!                                                   ▼
//!                                             DocumentStore
//! ```
//!
//! A caller creates a `Handle` for an identifier, `open`s it to become the
//! only holder, works on `data()`, `save`s and `close`s. `Registry::with_database`
//! wraps that sequence and guarantees the release on every exit path.

pub mod async_queue;
pub mod config;
pub mod error;
pub mod handle;
pub mod identifier;
pub mod idgen;
pub mod io;
pub mod registry;
pub mod state;
pub mod view;

pub use async_queue::{Acquire, AsyncQueue, QueueTurn};
pub use config::StoreConfig;
pub use error::{DocstoreError, PersistError, Result};
pub use handle::{Handle, HandleState};
pub use identifier::Identifier;
pub use idgen::{IdGen, JobId, SessionId};
pub use io::{DocumentStore, FileStore, MemStore};
pub use registry::Registry;
pub use state::DatabaseState;
pub use view::{ReadOnlyView, ViewRef};
