//! Core types for relation management.
//!
//! This module defines the records kept by the relation services
//! (invitations, memberships, favorites), the identifiers they are keyed
//! by, and the configuration used to open a persistent [`Relations`]
//! instance.
//!
//! [`Relations`]: super::Relations

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::store::{Document, Filter};

/// Default database file name inside the data directory.
pub const DEFAULT_DATABASE_FILE: &str = "relations.db";

/// Default time a write waits for a database locked by another process.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opaque identifier of a user or any other target entity.
///
/// Identifiers are compared by value only; the crate never interprets them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

/// Identifier of a user.
pub type UserId = EntityId;

impl EntityId {
    /// Creates an identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Returns the two identifiers in canonical (sorted) order.
fn sorted<'a>(a: &'a EntityId, b: &'a EntityId) -> (&'a EntityId, &'a EntityId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Matches documents whose `first`/`second` fields hold `a` and `b` in
/// either order.
pub(crate) fn unordered_pair(
    first: &'static str,
    second: &'static str,
    a: &EntityId,
    b: &EntityId,
) -> Filter {
    Filter::any([
        Filter::all([Filter::eq(first, a.as_str()), Filter::eq(second, b.as_str())]),
        Filter::all([Filter::eq(first, b.as_str()), Filter::eq(second, a.as_str())]),
    ])
}

/// Lifecycle status of an invitation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    /// Sent, awaiting a response.
    Pending,
    /// Accepted by the recipient; a membership was created.
    Accepted,
    /// Rejected by the recipient.
    Rejected,
}

impl InvitationStatus {
    /// Converts to string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    /// Returns whether the status closes the invitation.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected)
    }
}

/// One entry of the invitation ledger.
///
/// Records are directional (`from` sent to `to`) even though the
/// relationship they guard is symmetric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    /// Sender.
    pub from: UserId,
    /// Recipient.
    pub to: UserId,
    /// Resource the invitation concerns, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<EntityId>,
    /// Lifecycle status.
    pub status: InvitationStatus,
}

impl Invitation {
    /// Creates a pending invitation.
    #[must_use]
    pub const fn pending(from: UserId, to: UserId, object: Option<EntityId>) -> Self {
        Self {
            from,
            to,
            object,
            status: InvitationStatus::Pending,
        }
    }

    /// Returns the terminal record that replaces this one.
    #[must_use]
    pub fn resolved(&self, status: InvitationStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }

    /// Filter for the pending record sent by `from` to `to`.
    pub(crate) fn pending_filter(from: &EntityId, to: &EntityId) -> Filter {
        Filter::all([
            Filter::eq("from", from.as_str()),
            Filter::eq("to", to.as_str()),
            Filter::eq("status", InvitationStatus::Pending.as_str()),
        ])
    }

    /// Filter for a pending record between `a` and `b` in either direction.
    pub(crate) fn pending_between_filter(a: &EntityId, b: &EntityId) -> Filter {
        Filter::all([
            unordered_pair("from", "to", a, b),
            Filter::eq("status", InvitationStatus::Pending.as_str()),
        ])
    }

    /// Filter for every record sent or received by `user`.
    pub(crate) fn involving_filter(user: &EntityId) -> Filter {
        Filter::any([
            Filter::eq("from", user.as_str()),
            Filter::eq("to", user.as_str()),
        ])
    }
}

impl Document for Invitation {
    const COLLECTION: &'static str = "invitations";

    /// Only pending records are guarded: one per unordered pair.
    fn guard_key(&self) -> Option<String> {
        (self.status == InvitationStatus::Pending).then(|| {
            let (lo, hi) = sorted(&self.from, &self.to);
            json!(["pending", lo, hi]).to_string()
        })
    }
}

/// A confirmed, symmetric link between two users.
///
/// Slot order carries no meaning; use [`Membership::other_party`] to find
/// the counterpart of a given user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    /// One member.
    pub user1: UserId,
    /// The other member.
    pub user2: UserId,
    /// Context the membership is scoped to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<EntityId>,
}

impl Membership {
    /// Returns the member that is not `user`, or `None` if `user` is not
    /// part of this membership.
    #[must_use]
    pub fn other_party(&self, user: &EntityId) -> Option<&UserId> {
        if &self.user1 == user {
            Some(&self.user2)
        } else if &self.user2 == user {
            Some(&self.user1)
        } else {
            None
        }
    }

    /// Filter for the membership between `a` and `b` in the given scope.
    pub(crate) fn pair_filter(a: &EntityId, b: &EntityId, object: Option<&EntityId>) -> Filter {
        Filter::all([
            unordered_pair("user1", "user2", a, b),
            Filter::eq_opt("object", object.map(EntityId::as_str)),
        ])
    }

    /// Filter for every membership involving `user`.
    pub(crate) fn involving_filter(user: &EntityId) -> Filter {
        Filter::any([
            Filter::eq("user1", user.as_str()),
            Filter::eq("user2", user.as_str()),
        ])
    }
}

impl Document for Membership {
    const COLLECTION: &'static str = "members";

    fn guard_key(&self) -> Option<String> {
        let (lo, hi) = sorted(&self.user1, &self.user2);
        Some(json!(["membership", lo, hi, self.object]).to_string())
    }
}

/// A one-directional mark from `sender` to `receiver`.
///
/// The receiver is usually a content item rather than a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    /// Entity marking the favorite.
    pub sender: EntityId,
    /// Target entity.
    pub receiver: EntityId,
}

impl Favorite {
    /// Returns the entity on the other end from `entity`, or `None` if
    /// `entity` is on neither end.
    #[must_use]
    pub fn counterpart(&self, entity: &EntityId) -> Option<&EntityId> {
        if &self.sender == entity {
            Some(&self.receiver)
        } else if &self.receiver == entity {
            Some(&self.sender)
        } else {
            None
        }
    }

    /// Filter for the edge from `sender` to `receiver`.
    pub(crate) fn edge_filter(sender: &EntityId, receiver: &EntityId) -> Filter {
        Filter::all([
            Filter::eq("sender", sender.as_str()),
            Filter::eq("receiver", receiver.as_str()),
        ])
    }

    /// Filter for every edge pointing at `receiver`.
    pub(crate) fn received_filter(receiver: &EntityId) -> Filter {
        Filter::eq("receiver", receiver.as_str())
    }
}

impl Document for Favorite {
    const COLLECTION: &'static str = "favorites";

    fn guard_key(&self) -> Option<String> {
        Some(json!(["favorite", self.sender, self.receiver]).to_string())
    }
}

/// Configuration for opening a persistent [`Relations`] instance.
///
/// [`Relations`]: super::Relations
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RelationsConfig {
    /// Directory holding the database. Created if missing.
    pub data_dir: PathBuf,
    /// Database file name inside `data_dir`.
    pub database_file: String,
    /// How long a write waits for a database locked by another process.
    pub busy_timeout: Duration,
}

impl Default for RelationsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            database_file: DEFAULT_DATABASE_FILE.to_string(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }
}

impl RelationsConfig {
    /// Creates a configuration rooted at `data_dir`.
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Sets the database file name.
    #[must_use]
    pub fn with_database_file(mut self, file: impl Into<String>) -> Self {
        self.database_file = file.into();
        self
    }

    /// Sets the busy timeout.
    #[must_use]
    pub const fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Full path of the database file.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }
}
