//! Invitations, memberships and favorites between users.
//!
//! Two users become members only by one inviting the other and the other
//! accepting. Favorites are an independent, one-directional mark that any
//! entity can place on another.
//!
//! # Architecture
//!
//! ```text
//! Relations (high-level API)
//!     ├── InvitationLedger (send / accept / reject / cancel)
//!     │       └── MembershipIndex (derived memberships)
//!     └── FavoriteIndex (directed edges)
//! ```
//!
//! All components share one [`DocumentStore`]. State transitions that touch
//! more than one record run inside a single store transaction.
//!
//! # Errors
//!
//! Every operation returns [`RelationError`], whose two domain roots,
//! [`NotFoundError`] and [`NotAllowedError`], let callers branch on the
//! class of failure without matching individual variants.
//!
//! [`DocumentStore`]: crate::store::DocumentStore

mod error;
mod favorite;
mod ledger;
mod manager;
mod membership;
pub mod types;

pub use error::{NotAllowedError, NotFoundError, RelationError, Result};
pub use favorite::FavoriteIndex;
pub use ledger::InvitationLedger;
pub use manager::Relations;
pub use membership::MembershipIndex;
pub use types::{
    EntityId, Favorite, Invitation, InvitationStatus, Membership, RelationsConfig, UserId,
};
