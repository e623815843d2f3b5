//! Collection contract implemented by every store backend.

use std::marker::PhantomData;

use serde_json::Value;

use super::document::{Document, RawDocument, Stored};
use super::error::{Result, StoreError};
use super::filter::Filter;

/// Primitive operations on named collections of JSON documents.
///
/// This is the whole persistence surface the relation services need: no
/// joins, no updates. Documents are appended with [`create_one`] and retired
/// with [`pop_one`].
///
/// [`create_one`]: Collections::create_one
/// [`pop_one`]: Collections::pop_one
pub trait Collections {
    /// Inserts a document and returns it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Duplicate`] if `guard_key` is already held by a
    /// live document in `collection`, or an error if the write fails.
    fn create_one(
        &self,
        collection: &str,
        body: &Value,
        guard_key: Option<&str>,
    ) -> Result<RawDocument>;

    /// Returns the oldest document matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn read_one(&self, collection: &str, filter: &Filter) -> Result<Option<RawDocument>>;

    /// Returns every document matching `filter`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn read_many(&self, collection: &str, filter: &Filter) -> Result<Vec<RawDocument>>;

    /// Atomically removes and returns the oldest document matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    fn pop_one(&self, collection: &str, filter: &Filter) -> Result<Option<RawDocument>>;
}

/// A shareable store whose collections support grouped atomic writes.
pub trait DocumentStore: Collections + Send + Sync {
    /// Runs `work` against a view of the store in which all writes commit
    /// together or not at all.
    ///
    /// If `work` returns `Err`, every write it made is rolled back and the
    /// error is returned unchanged. Concurrent callers are serialized for
    /// the duration of `work`.
    ///
    /// # Errors
    ///
    /// Returns the error from `work`, or a store error if the transaction
    /// cannot be started or committed.
    fn atomically<T, E, F>(&self, work: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&dyn Collections) -> std::result::Result<T, E>,
        E: From<StoreError>;
}

/// Typed view of one collection.
///
/// Encodes and decodes documents of type `D` through `serde_json` and
/// targets `D::COLLECTION`.
pub struct Collection<'s, D> {
    store: &'s dyn Collections,
    _doc: PhantomData<fn() -> D>,
}

impl<'s, D: Document> Collection<'s, D> {
    /// Wraps `store` for documents of type `D`.
    #[must_use]
    pub fn new(store: &'s dyn Collections) -> Self {
        Self {
            store,
            _doc: PhantomData,
        }
    }

    /// Inserts `doc` under its guard key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Duplicate`] on a guard-key collision, or an
    /// error if encoding or the write fails.
    pub fn create_one(&self, doc: &D) -> Result<Stored<D>> {
        let body = serde_json::to_value(doc)?;
        let guard_key = doc.guard_key();
        self.store
            .create_one(D::COLLECTION, &body, guard_key.as_deref())?
            .decode()
    }

    /// Returns the oldest matching document.
    ///
    /// # Errors
    ///
    /// Returns an error if the read or decoding fails.
    pub fn read_one(&self, filter: &Filter) -> Result<Option<Stored<D>>> {
        self.store
            .read_one(D::COLLECTION, filter)?
            .map(RawDocument::decode)
            .transpose()
    }

    /// Returns every matching document, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the read or decoding fails.
    pub fn read_many(&self, filter: &Filter) -> Result<Vec<Stored<D>>> {
        self.store
            .read_many(D::COLLECTION, filter)?
            .into_iter()
            .map(RawDocument::decode)
            .collect()
    }

    /// Removes and returns the oldest matching document.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete or decoding fails.
    pub fn pop_one(&self, filter: &Filter) -> Result<Option<Stored<D>>> {
        self.store
            .pop_one(D::COLLECTION, filter)?
            .map(RawDocument::decode)
            .transpose()
    }
}
