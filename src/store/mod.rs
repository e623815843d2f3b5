//! Document storage for relation records.
//!
//! The relation services only need a handful of primitives from their
//! persistence layer: append a document, read one or many by filter, and
//! atomically pop a document. This module defines that contract and two
//! implementations.
//!
//! # Architecture
//!
//! ```text
//! Collection<D> (typed, serde_json)
//!     └── dyn Collections (JSON documents per named collection)
//!             ├── SqliteStore (rusqlite, one `documents` table)
//!             └── MemoryStore (in-process)
//! ```
//!
//! Uniqueness is declared per document through [`Document::guard_key`] and
//! enforced by the store at write time. A collision surfaces as
//! [`StoreError::Duplicate`], which callers treat as the authoritative
//! conflict signal.

mod collection;
mod document;
mod error;
mod filter;
mod memory;
mod sqlite;

pub use collection::{Collection, Collections, DocumentStore};
pub use document::{DocId, Document, RawDocument, Stored};
pub use error::{Result, StoreError};
pub use filter::Filter;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
