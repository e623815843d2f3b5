//! In-process document store.
//!
//! Keeps every collection in memory behind one lock. Useful for isolated
//! service instances in tests and for hosts that do not need persistence.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use super::collection::{Collections, DocumentStore};
use super::document::{DocId, RawDocument};
use super::error::{Result, StoreError};
use super::filter::Filter;

#[derive(Debug, Clone)]
struct Entry {
    raw: RawDocument,
    guard_key: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    next_id: i64,
    collections: BTreeMap<String, Vec<Entry>>,
    guards: HashSet<(String, String)>,
}

/// In-memory document store.
///
/// [`DocumentStore::atomically`] snapshots the whole state and restores it
/// if the work fails.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|e| StoreError::Lock(format!("Failed to acquire memory store lock: {e}")))
    }
}

impl Collections for MemoryStore {
    fn create_one(
        &self,
        collection: &str,
        body: &Value,
        guard_key: Option<&str>,
    ) -> Result<RawDocument> {
        let mut state = self.lock()?;
        Session::new(&mut state).create_one(collection, body, guard_key)
    }

    fn read_one(&self, collection: &str, filter: &Filter) -> Result<Option<RawDocument>> {
        let mut state = self.lock()?;
        Session::new(&mut state).read_one(collection, filter)
    }

    fn read_many(&self, collection: &str, filter: &Filter) -> Result<Vec<RawDocument>> {
        let mut state = self.lock()?;
        Session::new(&mut state).read_many(collection, filter)
    }

    fn pop_one(&self, collection: &str, filter: &Filter) -> Result<Option<RawDocument>> {
        let mut state = self.lock()?;
        Session::new(&mut state).pop_one(collection, filter)
    }
}

impl DocumentStore for MemoryStore {
    fn atomically<T, E, F>(&self, work: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&dyn Collections) -> std::result::Result<T, E>,
        E: From<StoreError>,
    {
        let mut state = self.lock()?;
        let snapshot = state.clone();

        let outcome = work(&Session::new(&mut state));

        if outcome.is_err() {
            *state = snapshot;
        }
        outcome
    }
}

/// Collection operations against exclusively borrowed state.
struct Session<'s> {
    state: RefCell<&'s mut MemoryState>,
}

impl<'s> Session<'s> {
    fn new(state: &'s mut MemoryState) -> Self {
        Self {
            state: RefCell::new(state),
        }
    }
}

impl Collections for Session<'_> {
    fn create_one(
        &self,
        collection: &str,
        body: &Value,
        guard_key: Option<&str>,
    ) -> Result<RawDocument> {
        let mut state = self.state.borrow_mut();

        if let Some(key) = guard_key {
            if !state.guards.insert((collection.to_string(), key.to_string())) {
                return Err(StoreError::Duplicate {
                    collection: collection.to_string(),
                    key: key.to_string(),
                });
            }
        }

        state.next_id += 1;
        let raw = RawDocument {
            id: DocId(state.next_id),
            created_at: chrono::Utc::now().timestamp(),
            body: body.clone(),
        };
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(Entry {
                raw: raw.clone(),
                guard_key: guard_key.map(str::to_string),
            });

        Ok(raw)
    }

    fn read_one(&self, collection: &str, filter: &Filter) -> Result<Option<RawDocument>> {
        let state = self.state.borrow();
        Ok(state.collections.get(collection).and_then(|entries| {
            entries
                .iter()
                .find(|e| filter.matches(&e.raw.body))
                .map(|e| e.raw.clone())
        }))
    }

    fn read_many(&self, collection: &str, filter: &Filter) -> Result<Vec<RawDocument>> {
        let state = self.state.borrow();
        Ok(state
            .collections
            .get(collection)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| filter.matches(&e.raw.body))
                    .map(|e| e.raw.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn pop_one(&self, collection: &str, filter: &Filter) -> Result<Option<RawDocument>> {
        let mut state = self.state.borrow_mut();

        let Some(entries) = state.collections.get_mut(collection) else {
            return Ok(None);
        };
        let Some(position) = entries.iter().position(|e| filter.matches(&e.raw.body)) else {
            return Ok(None);
        };
        let entry = entries.remove(position);

        if let Some(key) = entry.guard_key {
            state.guards.remove(&(collection.to_string(), key));
        }

        Ok(Some(entry.raw))
    }
}
