//! Confirmed memberships between users.
//!
//! Memberships are derived state: the only way to create one is to accept an
//! invitation through the [`InvitationLedger`]. This index answers queries
//! over them and handles explicit removal.
//!
//! [`InvitationLedger`]: super::InvitationLedger

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::error::{NotAllowedError, NotFoundError, RelationError, Result};
use super::types::{EntityId, Membership, UserId};
use crate::store::{Collection, Collections, DocumentStore, Stored};

/// Queryable set of confirmed bidirectional links.
pub struct MembershipIndex<S> {
    store: Arc<S>,
}

impl<S> Clone for MembershipIndex<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: DocumentStore> MembershipIndex<S> {
    /// Creates an index over `store`.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Deletes the membership between `a` and `b` in the given scope.
    ///
    /// `object = None` addresses the unscoped membership only.
    ///
    /// # Errors
    ///
    /// Returns [`NotFoundError::Membership`] if no such membership exists, or
    /// a storage error.
    #[instrument(skip(self), fields(a = %a, b = %b))]
    pub fn remove_membership(
        &self,
        a: &UserId,
        b: &UserId,
        object: Option<&EntityId>,
    ) -> Result<()> {
        let removed = Collection::<Membership>::new(&*self.store)
            .pop_one(&Membership::pair_filter(a, b, object))?;

        if removed.is_none() {
            warn!("membership not found");
            return Err(NotFoundError::Membership {
                user1: a.clone(),
                user2: b.clone(),
                object: object.cloned(),
            }
            .into());
        }

        info!("membership removed");
        Ok(())
    }

    /// Returns the other party of every membership involving `user`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails.
    #[instrument(skip(self), fields(user = %user))]
    pub fn list_members(&self, user: &UserId) -> Result<Vec<UserId>> {
        let members = counterparts(&self.memberships(user)?, user);
        debug!("found {} members", members.len());
        Ok(members)
    }

    /// Returns the other party of every membership involving `user` within
    /// the given scope.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails.
    pub fn list_members_in(
        &self,
        user: &UserId,
        object: Option<&EntityId>,
    ) -> Result<Vec<UserId>> {
        let scoped: Vec<_> = self
            .memberships(user)?
            .into_iter()
            .filter(|m| m.object.as_ref() == object)
            .collect();
        Ok(counterparts(&scoped, user))
    }

    /// Returns every membership record involving `user`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails.
    pub fn memberships(&self, user: &UserId) -> Result<Vec<Stored<Membership>>> {
        Ok(Collection::<Membership>::new(&*self.store)
            .read_many(&Membership::involving_filter(user))?)
    }

    /// Returns whether `a` and `b` are members in the given scope.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails.
    pub fn are_members(
        &self,
        a: &UserId,
        b: &UserId,
        object: Option<&EntityId>,
    ) -> Result<bool> {
        Ok(find(&*self.store, a, b, object)?.is_some())
    }
}

/// Resolves the counterpart of `user` in each membership by identity.
fn counterparts(memberships: &[Stored<Membership>], user: &UserId) -> Vec<UserId> {
    memberships
        .iter()
        .filter_map(|m| m.other_party(user).cloned())
        .collect()
}

/// Looks up the membership between `a` and `b` in the given scope.
pub(super) fn find(
    store: &dyn Collections,
    a: &UserId,
    b: &UserId,
    object: Option<&EntityId>,
) -> Result<Option<Stored<Membership>>> {
    Ok(Collection::<Membership>::new(store).read_one(&Membership::pair_filter(a, b, object))?)
}

/// Creates the membership produced by an accepted invitation.
///
/// Must run inside the same store transaction that retired the invitation.
pub(super) fn materialize(
    store: &dyn Collections,
    from: &UserId,
    to: &UserId,
    object: Option<&EntityId>,
) -> Result<Stored<Membership>> {
    let membership = Membership {
        user1: from.clone(),
        user2: to.clone(),
        object: object.cloned(),
    };

    Collection::new(store)
        .create_one(&membership)
        .map_err(|e| {
            if e.is_duplicate() {
                RelationError::from(NotAllowedError::AlreadyRelated {
                    user1: from.clone(),
                    user2: to.clone(),
                    object: object.cloned(),
                })
            } else {
                RelationError::from(e)
            }
        })
}
