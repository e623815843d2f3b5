//! Reusable fixtures for relation integration tests.
//!
//! Each helper builds a fresh, isolated store so tests never share state.

#![allow(dead_code)]

use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use accord_core::relation::{EntityId, Relations};
use accord_core::store::{MemoryStore, SqliteStore};

/// Atomic counter for unique test directory names.
static HELPER_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Creates a unique temporary directory path for test isolation.
///
/// Each call produces a distinct path by combining the prefix, process ID,
/// and an atomic counter. The directory itself is not created.
pub fn unique_temp_dir(prefix: &str) -> PathBuf {
    let id = HELPER_COUNTER.fetch_add(1, Ordering::SeqCst);
    env::temp_dir().join(format!(
        "accord_test_{}_{}_{}",
        prefix,
        std::process::id(),
        id
    ))
}

/// Removes a temporary test directory. Ignores errors silently.
pub fn cleanup_dir(dir: &PathBuf) {
    let _ = std::fs::remove_dir_all(dir);
}

/// Shorthand for an identifier.
pub fn id(s: &str) -> EntityId {
    EntityId::from(s)
}

/// Relations over a fresh in-memory `SQLite` database.
pub fn sqlite_relations() -> (Arc<SqliteStore>, Relations<SqliteStore>) {
    let store = Arc::new(SqliteStore::in_memory().expect("should open in-memory database"));
    (Arc::clone(&store), Relations::new(store))
}

/// Relations over a fresh process-local store.
pub fn memory_relations() -> (Arc<MemoryStore>, Relations<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (Arc::clone(&store), Relations::new(store))
}
