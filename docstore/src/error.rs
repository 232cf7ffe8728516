//! Error types
//!
//! Two layers:
//! - `PersistError` is produced by storage backends and never escapes as a
//!   panic; a failed write is reported to the caller of `Handle::save`.
//! - `DocstoreError` covers misuse of the API (bad identifiers, data access
//!   without holding the lock) plus wrapped persistence failures.

use std::path::PathBuf;

use crate::identifier::Identifier;
use crate::idgen::SessionId;

/// Failure while writing a document to its backing store
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode document: {0}")]
    Encode(#[from] serde_json::Error),
}

impl PersistError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors returned by the registry and by handles
#[derive(Debug, thiserror::Error)]
pub enum DocstoreError {
    #[error("invalid identifier '{input}': {reason}")]
    InvalidIdentifier { input: String, reason: String },

    #[error("identifier '{0}' was never registered")]
    UnregisteredIdentifier(Identifier),

    #[error("{session} does not hold the lock on '{identifier}'")]
    NotLocked {
        identifier: Identifier,
        session: SessionId,
    },

    #[error("{session} on '{identifier}' is closed")]
    HandleClosed {
        identifier: Identifier,
        session: SessionId,
    },

    #[error("failed to persist '{identifier}': {source}")]
    Persistence {
        identifier: Identifier,
        #[source]
        source: PersistError,
    },

    #[error("document does not match the requested type: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("the global registry is already initialized")]
    AlreadyConfigured,
}

pub type Result<T, E = DocstoreError> = std::result::Result<T, E>;
