//! The invitation ledger.
//!
//! Every invitation ever sent is kept as a record. A pending record is
//! retired (popped) when it is resolved, and accepting or rejecting appends
//! a fresh terminal record, so history survives while at most one pending
//! record exists per unordered pair.
//!
//! # State machine
//!
//! ```text
//! send ──► pending ──accept──► accepted (+ membership)
//!             │    ──reject──► rejected
//!             └────cancel────► (retired, no record)
//! ```
//!
//! Each transition runs inside one store transaction. The pending guard key
//! in the store is the final word on conflicts: a collision at write time is
//! reported as [`NotAllowedError::InvitationConflict`] even if an earlier
//! read saw no pending record.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::error::{NotAllowedError, NotFoundError, RelationError, Result};
use super::membership::{self, MembershipIndex};
use super::types::{EntityId, Invitation, InvitationStatus, Membership, UserId};
use crate::store::{Collection, Collections, DocumentStore, Filter, Stored};

/// Append-and-retire log of invitations, owning the transition rules.
pub struct InvitationLedger<S> {
    store: Arc<S>,
    members: MembershipIndex<S>,
}

impl<S> Clone for InvitationLedger<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            members: self.members.clone(),
        }
    }
}

impl<S: DocumentStore> InvitationLedger<S> {
    /// Creates a ledger over `store`.
    ///
    /// Memberships created by accepted invitations land in the same store
    /// and are reachable through [`InvitationLedger::members`].
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        let members = MembershipIndex::new(Arc::clone(&store));
        Self { store, members }
    }

    /// The membership index fed by this ledger.
    #[must_use]
    pub const fn members(&self) -> &MembershipIndex<S> {
        &self.members
    }

    // ==================== Transitions ====================

    /// Records a pending invitation from `from` to `to`.
    ///
    /// # Arguments
    ///
    /// * `from` - Sender
    /// * `to` - Recipient
    /// * `object` - Resource the invitation concerns; also scopes the
    ///   membership check
    ///
    /// # Errors
    ///
    /// - [`NotAllowedError::AlreadyRelated`] if `from == to` or a membership
    ///   already exists for the pair in this scope
    /// - [`NotAllowedError::InvitationConflict`] if a pending invitation
    ///   exists between the two in either direction
    #[instrument(skip(self), fields(from = %from, to = %to))]
    pub fn send_invitation(
        &self,
        from: &UserId,
        to: &UserId,
        object: Option<&EntityId>,
    ) -> Result<Stored<Invitation>> {
        let already_related = || NotAllowedError::AlreadyRelated {
            user1: from.clone(),
            user2: to.clone(),
            object: object.cloned(),
        };
        let conflict = || NotAllowedError::InvitationConflict {
            from: from.clone(),
            to: to.clone(),
        };

        if from == to {
            warn!("refusing self invitation");
            return Err(already_related().into());
        }

        let invitation = self.store.atomically(|tx| -> Result<Stored<Invitation>> {
            if membership::find(tx, from, to, object)?.is_some() {
                warn!("users are already members");
                return Err(already_related().into());
            }

            let invitations = Collection::<Invitation>::new(tx);
            if invitations
                .read_one(&Invitation::pending_between_filter(from, to))?
                .is_some()
            {
                warn!("pending invitation already exists");
                return Err(conflict().into());
            }

            invitations
                .create_one(&Invitation::pending(from.clone(), to.clone(), object.cloned()))
                .map_err(|e| {
                    if e.is_duplicate() {
                        warn!("pending invitation created concurrently");
                        RelationError::from(conflict())
                    } else {
                        RelationError::from(e)
                    }
                })
        })?;

        info!(id = %invitation.id, "invitation sent");
        Ok(invitation)
    }

    /// Accepts the pending invitation from `from` to `to`.
    ///
    /// Retires the pending record, appends an `accepted` record and creates
    /// the membership, all in one transaction. Accepting an invitation that
    /// was already resolved fails.
    ///
    /// # Errors
    ///
    /// - [`NotFoundError::Invitation`] if no pending invitation from `from`
    ///   to `to` exists
    /// - [`NotAllowedError::AlreadyRelated`] if the membership appeared
    ///   concurrently; nothing is written in that case
    #[instrument(skip(self), fields(from = %from, to = %to))]
    pub fn accept_invitation(&self, from: &UserId, to: &UserId) -> Result<Stored<Membership>> {
        let membership = self.store.atomically(|tx| -> Result<Stored<Membership>> {
            let pending = retire_pending(tx, from, to)?;
            append_terminal(tx, &pending, InvitationStatus::Accepted)?;
            membership::materialize(tx, from, to, pending.object.as_ref())
        })?;

        info!(id = %membership.id, "invitation accepted");
        Ok(membership)
    }

    /// Rejects the pending invitation from `from` to `to`.
    ///
    /// Returns the appended `rejected` record.
    ///
    /// # Errors
    ///
    /// Returns [`NotFoundError::Invitation`] if no pending invitation from
    /// `from` to `to` exists.
    #[instrument(skip(self), fields(from = %from, to = %to))]
    pub fn reject_invitation(&self, from: &UserId, to: &UserId) -> Result<Stored<Invitation>> {
        let rejected = self.store.atomically(|tx| -> Result<Stored<Invitation>> {
            let pending = retire_pending(tx, from, to)?;
            append_terminal(tx, &pending, InvitationStatus::Rejected)
        })?;

        info!(id = %rejected.id, "invitation rejected");
        Ok(rejected)
    }

    /// Withdraws the pending invitation from `from` to `to` without
    /// recording a response.
    ///
    /// Returns the retired record.
    ///
    /// # Errors
    ///
    /// Returns [`NotFoundError::Invitation`] if no pending invitation from
    /// `from` to `to` exists.
    #[instrument(skip(self), fields(from = %from, to = %to))]
    pub fn cancel_invitation(&self, from: &UserId, to: &UserId) -> Result<Stored<Invitation>> {
        let retired = retire_pending(&*self.store, from, to)?;
        info!(id = %retired.id, "invitation cancelled");
        Ok(retired)
    }

    // ==================== Queries ====================

    /// Returns every record sent or received by `user`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails.
    #[instrument(skip(self), fields(user = %user))]
    pub fn list_invitations(&self, user: &UserId) -> Result<Vec<Stored<Invitation>>> {
        let invitations = self
            .invitations()
            .read_many(&Invitation::involving_filter(user))?;
        debug!("found {} invitations", invitations.len());
        Ok(invitations)
    }

    /// Returns the pending invitation between `a` and `b`, in either
    /// direction.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails.
    pub fn pending_between(&self, a: &UserId, b: &UserId) -> Result<Option<Stored<Invitation>>> {
        Ok(self
            .invitations()
            .read_one(&Invitation::pending_between_filter(a, b))?)
    }

    /// Returns pending invitations addressed to `user`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails.
    pub fn incoming_pending(&self, user: &UserId) -> Result<Vec<Stored<Invitation>>> {
        self.pending_where("to", user)
    }

    /// Returns pending invitations sent by `user`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails.
    pub fn outgoing_pending(&self, user: &UserId) -> Result<Vec<Stored<Invitation>>> {
        self.pending_where("from", user)
    }

    // ==================== Memberships ====================

    /// Deletes the membership between `a` and `b` in the given scope.
    ///
    /// See [`MembershipIndex::remove_membership`].
    ///
    /// # Errors
    ///
    /// Returns [`NotFoundError::Membership`] if no such membership exists.
    pub fn remove_membership(
        &self,
        a: &UserId,
        b: &UserId,
        object: Option<&EntityId>,
    ) -> Result<()> {
        self.members.remove_membership(a, b, object)
    }

    /// Returns the other party of every membership involving `user`.
    ///
    /// See [`MembershipIndex::list_members`].
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails.
    pub fn list_members(&self, user: &UserId) -> Result<Vec<UserId>> {
        self.members.list_members(user)
    }

    fn invitations(&self) -> Collection<'_, Invitation> {
        Collection::new(&*self.store)
    }

    fn pending_where(
        &self,
        field: &'static str,
        user: &UserId,
    ) -> Result<Vec<Stored<Invitation>>> {
        Ok(self.invitations().read_many(&Filter::all([
            Filter::eq(field, user.as_str()),
            Filter::eq("status", InvitationStatus::Pending.as_str()),
        ]))?)
    }
}

/// Pops the pending record from `from` to `to`.
fn retire_pending(
    store: &dyn Collections,
    from: &UserId,
    to: &UserId,
) -> Result<Stored<Invitation>> {
    Collection::<Invitation>::new(store)
        .pop_one(&Invitation::pending_filter(from, to))?
        .ok_or_else(|| {
            warn!("pending invitation not found");
            NotFoundError::Invitation {
                from: from.clone(),
                to: to.clone(),
            }
            .into()
        })
}

/// Appends the terminal record replacing `pending`.
fn append_terminal(
    store: &dyn Collections,
    pending: &Invitation,
    status: InvitationStatus,
) -> Result<Stored<Invitation>> {
    debug_assert!(status.is_terminal());
    Ok(Collection::new(store).create_one(&pending.resolved(status))?)
}
