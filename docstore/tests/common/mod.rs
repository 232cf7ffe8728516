#![allow(dead_code)]

use docstore::{Identifier, MemStore, Registry, StoreConfig};
use tempfile::TempDir;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

pub fn id(s: &str) -> Identifier {
    Identifier::parse(s).unwrap()
}

/// File-backed registry in a fresh temporary root
///
/// Keep the `TempDir` alive for as long as the registry is used.
pub fn file_registry() -> (TempDir, Registry) {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let registry = Registry::new(StoreConfig::new(tmp.path()));
    (tmp, registry)
}

/// A second registry on the same root, as after a process restart
pub fn reopen(tmp: &TempDir) -> Registry {
    Registry::new(StoreConfig::new(tmp.path()))
}

pub fn mem_registry() -> Registry<MemStore> {
    init_tracing();
    Registry::with_store(MemStore::new())
}
