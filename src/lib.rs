//! Accord Core Library
//!
//! Invitation-based membership and favorites between users, persisted in a
//! document store.
//!
//! - [`relation`]: the invitation ledger, memberships and favorites
//! - [`store`]: the document storage they run on (`SQLite` or in-memory)

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![deny(unsafe_code)]

pub mod relation;
pub mod store;

pub use relation::{RelationError, Relations, RelationsConfig};
