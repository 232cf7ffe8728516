//! Store configuration

use std::path::{Path, PathBuf};

/// Environment variable overriding the storage root
pub const ROOT_ENV_VAR: &str = "DOCSTORE_ROOT";

/// Storage root used when nothing else is configured
pub const DEFAULT_ROOT: &str = "./data";

/// Configuration of a `Registry`
///
/// Read once, when the registry is built. Databases already loaded are
/// never moved to a different root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub root: PathBuf,
}

impl StoreConfig {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Default configuration, with the root taken from `DOCSTORE_ROOT` if set
    #[must_use]
    pub fn from_env() -> Self {
        match std::env::var_os(ROOT_ENV_VAR) {
            Some(root) if !root.is_empty() => Self::new(root),
            _ => Self::default(),
        }
    }

    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT)
    }
}
