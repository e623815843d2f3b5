//! Document types shared by every store implementation.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{Result, StoreError};

/// Store-assigned document identifier.
///
/// Identifiers increase monotonically within a store, so they double as the
/// creation-order tie-break between documents created in the same second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(pub i64);

impl std::fmt::Display for DocId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A record type persisted in a named collection.
pub trait Document: Serialize + DeserializeOwned {
    /// Name of the collection holding documents of this type.
    const COLLECTION: &'static str;

    /// Uniqueness key for this document, if it takes part in one.
    ///
    /// The store refuses a second live document with the same key in the
    /// same collection. Removing the document frees the key.
    fn guard_key(&self) -> Option<String> {
        None
    }
}

/// A document as held by the store, before decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    /// Store-assigned identifier.
    pub id: DocId,
    /// Creation time (Unix timestamp).
    pub created_at: i64,
    /// JSON body.
    pub body: Value,
}

impl RawDocument {
    /// Decodes the body into `D`.
    ///
    /// # Errors
    ///
    /// Returns an error if the body does not match `D`.
    pub fn decode<D: Document>(self) -> Result<Stored<D>> {
        let doc = serde_json::from_value(self.body).map_err(|e| {
            StoreError::InvalidData(format!("Invalid {} document {}: {e}", D::COLLECTION, self.id))
        })?;
        Ok(Stored {
            id: self.id,
            created_at: self.created_at,
            doc,
        })
    }
}

/// A decoded document with its store metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stored<D> {
    /// Store-assigned identifier.
    pub id: DocId,
    /// Creation time (Unix timestamp).
    pub created_at: i64,
    /// The document itself.
    pub doc: D,
}

impl<D> Stored<D> {
    /// Discards store metadata.
    #[must_use]
    pub fn into_inner(self) -> D {
        self.doc
    }
}

impl<D> std::ops::Deref for Stored<D> {
    type Target = D;

    fn deref(&self) -> &D {
        &self.doc
    }
}
