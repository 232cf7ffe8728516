//! I/O module for docstore
//!
//! Contains the storage abstraction and its backends.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  Handle / DatabaseState             │
//! │  - in-memory document               │
//! │  - FlushQueue serializes saves      │
//! └─────────────────────────────────────┘
//!          ▲
//!          │ encode once, save bytes
//!          ▼
//! ┌─────────────────────────────────────┐
//! │  DocumentStore (storage layer)      │
//! │  - load: best effort, sync          │
//! │  - save: async, reports failure     │
//! └─────────────────────────────────────┘
//!          ▲               ▲
//!          │               │
//!      FileStore       MemStore
//! ```

pub mod fs;
pub mod mem;
pub mod types;

pub use fs::{FileStore, PRIMARY_FILE, SWAP_FILE};
pub use mem::MemStore;
pub use types::{decode_document, encode_document, DocumentStore};
