//! Error types for relation operations.
//!
//! Domain failures fall under two roots that callers branch on:
//! [`NotFoundError`] when an operation references a record that does not
//! exist in the required state, and [`NotAllowedError`] when it would break
//! a uniqueness or self-reference rule. Storage failures are kept apart in
//! [`RelationError::Store`].

use thiserror::Error;

use super::types::EntityId;
use crate::store::StoreError;

/// The referenced record does not exist in the required state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotFoundError {
    /// No pending invitation from `from` to `to`.
    #[error("Invitation from {from} to {to} does not exist")]
    Invitation {
        /// Sender of the missing invitation.
        from: EntityId,
        /// Recipient of the missing invitation.
        to: EntityId,
    },

    /// No membership between the two users in the given scope.
    #[error("{user1} and {user2} are not members{}", scope(.object.as_ref()))]
    Membership {
        /// First user of the pair.
        user1: EntityId,
        /// Second user of the pair.
        user2: EntityId,
        /// Object scope that was searched.
        object: Option<EntityId>,
    },

    /// No favorite edge from `sender` to `receiver`.
    #[error("Favorite sent by {sender} to {receiver} does not exist")]
    Favorite {
        /// Entity that would have marked the favorite.
        sender: EntityId,
        /// Target of the missing favorite.
        receiver: EntityId,
    },
}

/// The operation would violate a uniqueness or self-reference rule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotAllowedError {
    /// A pending invitation already exists between the pair, in either direction.
    #[error("Invitation between {from} and {to} already exists")]
    InvitationConflict {
        /// Sender of the rejected invitation.
        from: EntityId,
        /// Recipient of the rejected invitation.
        to: EntityId,
    },

    /// The users are already members, or are the same user.
    #[error("{user1} and {user2} are already members{}", scope(.object.as_ref()))]
    AlreadyRelated {
        /// First user of the pair.
        user1: EntityId,
        /// Second user of the pair.
        user2: EntityId,
        /// Object scope of the existing membership.
        object: Option<EntityId>,
    },

    /// The favorite edge exists already, or the sender targets itself.
    #[error("{sender} has already favorited {receiver}")]
    AlreadyFavorited {
        /// Entity marking the favorite.
        sender: EntityId,
        /// Target of the favorite.
        receiver: EntityId,
    },
}

/// Error type for relation operations.
#[derive(Error, Debug)]
pub enum RelationError {
    /// Referenced record missing.
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    /// Operation refused by an invariant.
    #[error(transparent)]
    NotAllowed(#[from] NotAllowedError),

    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl RelationError {
    /// Returns whether this error belongs to the not-found root.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns whether this error belongs to the not-allowed root.
    #[must_use]
    pub const fn is_not_allowed(&self) -> bool {
        matches!(self, Self::NotAllowed(_))
    }
}

/// Result type alias for relation operations.
pub type Result<T> = std::result::Result<T, RelationError>;

fn scope(object: Option<&EntityId>) -> String {
    object.map_or_else(String::new, |object| format!(" of {object}"))
}
