//! High-level relation API.
//!
//! [`Relations`] wires one shared store into the invitation ledger, the
//! membership index it feeds, and the favorite index, and exposes every
//! operation through a single handle.

use std::sync::Arc;

use tracing::info;

use super::error::Result;
use super::favorite::FavoriteIndex;
use super::ledger::InvitationLedger;
use super::membership::MembershipIndex;
use super::types::{EntityId, Favorite, Invitation, Membership, RelationsConfig, UserId};
use crate::store::{DocumentStore, SqliteStore, StoreError, Stored};

/// Unified handle over invitations, memberships and favorites.
///
/// # Example
///
/// ```no_run
/// use accord_core::relation::{EntityId, RelationError, Relations, RelationsConfig};
///
/// fn main() -> Result<(), RelationError> {
///     let relations = Relations::open(&RelationsConfig::new("/data/accord"))?;
///     let (alice, bob) = (EntityId::from("alice"), EntityId::from("bob"));
///     relations.send_invitation(&alice, &bob, None)?;
///     relations.accept_invitation(&alice, &bob)?;
///     assert_eq!(relations.list_members(&alice)?, vec![bob]);
///     Ok(())
/// }
/// ```
pub struct Relations<S> {
    invitations: InvitationLedger<S>,
    favorites: FavoriteIndex<S>,
}

impl<S> Clone for Relations<S> {
    fn clone(&self) -> Self {
        Self {
            invitations: self.invitations.clone(),
            favorites: self.favorites.clone(),
        }
    }
}

impl Relations<SqliteStore> {
    /// Opens a persistent instance described by `config`.
    ///
    /// Creates the data directory and database if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the database
    /// cannot be opened.
    pub fn open(config: &RelationsConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir).map_err(StoreError::from)?;

        let path = config.database_path();
        let store = SqliteStore::open(&path)?;
        store.set_busy_timeout(config.busy_timeout)?;

        info!(path = %path.display(), "relations database opened");
        Ok(Self::new(Arc::new(store)))
    }
}

impl<S: DocumentStore> Relations<S> {
    /// Creates an instance over an existing store.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            favorites: FavoriteIndex::new(Arc::clone(&store)),
            invitations: InvitationLedger::new(store),
        }
    }

    /// The invitation ledger.
    #[must_use]
    pub const fn invitations(&self) -> &InvitationLedger<S> {
        &self.invitations
    }

    /// The membership index.
    #[must_use]
    pub const fn memberships(&self) -> &MembershipIndex<S> {
        self.invitations.members()
    }

    /// The favorite index.
    #[must_use]
    pub const fn favorites(&self) -> &FavoriteIndex<S> {
        &self.favorites
    }

    // ==================== Invitations ====================

    /// See [`InvitationLedger::send_invitation`].
    ///
    /// # Errors
    ///
    /// Fails when the pair is already related or an invitation is pending.
    pub fn send_invitation(
        &self,
        from: &UserId,
        to: &UserId,
        object: Option<&EntityId>,
    ) -> Result<Stored<Invitation>> {
        self.invitations.send_invitation(from, to, object)
    }

    /// See [`InvitationLedger::accept_invitation`].
    ///
    /// # Errors
    ///
    /// Fails when no pending invitation from `from` to `to` exists.
    pub fn accept_invitation(&self, from: &UserId, to: &UserId) -> Result<Stored<Membership>> {
        self.invitations.accept_invitation(from, to)
    }

    /// See [`InvitationLedger::reject_invitation`].
    ///
    /// # Errors
    ///
    /// Fails when no pending invitation from `from` to `to` exists.
    pub fn reject_invitation(&self, from: &UserId, to: &UserId) -> Result<Stored<Invitation>> {
        self.invitations.reject_invitation(from, to)
    }

    /// See [`InvitationLedger::cancel_invitation`].
    ///
    /// # Errors
    ///
    /// Fails when no pending invitation from `from` to `to` exists.
    pub fn cancel_invitation(&self, from: &UserId, to: &UserId) -> Result<Stored<Invitation>> {
        self.invitations.cancel_invitation(from, to)
    }

    /// See [`InvitationLedger::list_invitations`].
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails.
    pub fn list_invitations(&self, user: &UserId) -> Result<Vec<Stored<Invitation>>> {
        self.invitations.list_invitations(user)
    }

    // ==================== Memberships ====================

    /// See [`MembershipIndex::remove_membership`].
    ///
    /// # Errors
    ///
    /// Fails when no such membership exists.
    pub fn remove_membership(
        &self,
        a: &UserId,
        b: &UserId,
        object: Option<&EntityId>,
    ) -> Result<()> {
        self.invitations.remove_membership(a, b, object)
    }

    /// See [`MembershipIndex::list_members`].
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails.
    pub fn list_members(&self, user: &UserId) -> Result<Vec<UserId>> {
        self.invitations.list_members(user)
    }

    // ==================== Favorites ====================

    /// See [`FavoriteIndex::add_favorite`].
    ///
    /// # Errors
    ///
    /// Fails on a self favorite or an existing edge.
    pub fn add_favorite(&self, sender: &EntityId, receiver: &EntityId) -> Result<Stored<Favorite>> {
        self.favorites.add_favorite(sender, receiver)
    }

    /// See [`FavoriteIndex::remove_favorite`].
    ///
    /// # Errors
    ///
    /// Fails when the edge does not exist.
    pub fn remove_favorite(&self, sender: &EntityId, receiver: &EntityId) -> Result<()> {
        self.favorites.remove_favorite(sender, receiver)
    }

    /// See [`FavoriteIndex::get_favorites`].
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails.
    pub fn get_favorites(&self, entity: &EntityId) -> Result<Vec<EntityId>> {
        self.favorites.get_favorites(entity)
    }
}
