//! Filesystem implementation of `DocumentStore`
//!
//! Each identifier owns one directory below the root:
//!
//! ```text
//! <root>/<segment 2>/.../<segment N>/data.json       primary
//! <root>/<segment 2>/.../<segment N>/data.swp.json   swap
//! ```
//!
//! A save writes the swap file first and the primary second, both with the
//! same bytes and each synced before moving on. A crash between the two
//! writes leaves the primary at its previous value and the swap at the new
//! one; a crash during a single write can still tear that one file, which
//! is why loading falls back from a corrupt primary to the swap.

use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::types::{decode_document, DocumentStore};
use crate::error::PersistError;
use crate::identifier::Identifier;

pub const PRIMARY_FILE: &str = "data.json";
pub const SWAP_FILE: &str = "data.swp.json";

/// Directory-per-identifier JSON storage with a swap file
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn document_dir(&self, id: &Identifier) -> PathBuf {
        self.root.join(id.relative_dir())
    }

    #[must_use]
    pub fn primary_path(&self, id: &Identifier) -> PathBuf {
        self.document_dir(id).join(PRIMARY_FILE)
    }

    #[must_use]
    pub fn swap_path(&self, id: &Identifier) -> PathBuf {
        self.document_dir(id).join(SWAP_FILE)
    }
}

fn read_document(path: &Path) -> Option<Value> {
    let bytes = std::fs::read(path).ok()?;
    decode_document(&bytes)
}

async fn write_synced(path: &Path, payload: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(payload).await?;
    file.sync_all().await
}

impl DocumentStore for FileStore {
    fn load(&self, id: &Identifier) -> Option<Value> {
        let primary = self.primary_path(id);
        if let Some(doc) = read_document(&primary) {
            return Some(doc);
        }

        let swap = self.swap_path(id);
        let recovered = read_document(&swap);
        if recovered.is_some() {
            warn!(
                id = %id,
                primary = %primary.display(),
                "primary missing or unreadable, recovered from swap"
            );
        } else {
            debug!(id = %id, "no stored document");
        }
        recovered
    }

    async fn save(&self, id: &Identifier, payload: Vec<u8>) -> Result<(), PersistError> {
        let dir = self.document_dir(id);
        let swap = dir.join(SWAP_FILE);
        let primary = dir.join(PRIMARY_FILE);

        match write_synced(&swap, &payload).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(id = %id, dir = %dir.display(), "creating document directory");
                tokio::fs::create_dir_all(&dir)
                    .await
                    .map_err(|e| PersistError::io(&dir, e))?;
                write_synced(&swap, &payload)
                    .await
                    .map_err(|e| PersistError::io(&swap, e))?;
            }
            Err(e) => return Err(PersistError::io(&swap, e)),
        }

        write_synced(&primary, &payload)
            .await
            .map_err(|e| PersistError::io(&primary, e))?;

        debug!(id = %id, bytes = payload.len(), "document written");
        Ok(())
    }
}
