//! Integration tests for the relation module.
//!
//! These tests verify the behavior of the public API against both store
//! backends:
//! - Invitation lifecycle (send, accept, reject, cancel)
//! - Membership listing and removal
//! - Favorite edges
//! - Transaction rollback on a failed accept
//! - Persistence of an on-disk database

mod helpers;

use std::sync::Arc;

use accord_core::relation::{
    InvitationStatus, Membership, NotAllowedError, NotFoundError, RelationError, Relations,
    RelationsConfig,
};
use accord_core::store::{Collection, DocumentStore, MemoryStore, SqliteStore};

use helpers::{cleanup_dir, id, memory_relations, sqlite_relations, unique_temp_dir};

/// Runs a generic scenario once per backend.
macro_rules! on_both_backends {
    ($name:ident) => {
        mod $name {
            use super::*;

            #[test]
            fn sqlite() {
                let (store, relations) = sqlite_relations();
                super::$name(&store, &relations);
            }

            #[test]
            fn memory() {
                let (store, relations) = memory_relations();
                super::$name(&store, &relations);
            }
        }
    };
}

fn is_conflict(err: &RelationError) -> bool {
    matches!(
        err,
        RelationError::NotAllowed(NotAllowedError::InvitationConflict { .. })
    )
}

fn is_already_related(err: &RelationError) -> bool {
    matches!(
        err,
        RelationError::NotAllowed(NotAllowedError::AlreadyRelated { .. })
    )
}

// ============================================================================
// Invitation Lifecycle
// ============================================================================

fn second_send_conflicts_until_resolved<S: DocumentStore>(_: &Arc<S>, r: &Relations<S>) {
    r.send_invitation(&id("a"), &id("b"), None).unwrap();

    assert!(is_conflict(
        &r.send_invitation(&id("a"), &id("b"), None).unwrap_err()
    ));
    assert!(is_conflict(
        &r.send_invitation(&id("b"), &id("a"), None).unwrap_err()
    ));

    r.cancel_invitation(&id("a"), &id("b")).unwrap();
    r.send_invitation(&id("b"), &id("a"), None).unwrap();
}
on_both_backends!(second_send_conflicts_until_resolved);

fn self_send_always_fails<S: DocumentStore>(_: &Arc<S>, r: &Relations<S>) {
    let err = r.send_invitation(&id("a"), &id("a"), None).unwrap_err();
    assert!(is_already_related(&err));

    let err = r
        .send_invitation(&id("a"), &id("a"), Some(&id("club")))
        .unwrap_err();
    assert!(is_already_related(&err));
    assert!(r.list_invitations(&id("a")).unwrap().is_empty());
}
on_both_backends!(self_send_always_fails);

fn accept_links_both_parties<S: DocumentStore>(_: &Arc<S>, r: &Relations<S>) {
    r.send_invitation(&id("a"), &id("b"), None).unwrap();
    r.accept_invitation(&id("a"), &id("b")).unwrap();

    assert_eq!(r.list_members(&id("a")).unwrap(), vec![id("b")]);
    assert_eq!(r.list_members(&id("b")).unwrap(), vec![id("a")]);

    let history = r.list_invitations(&id("b")).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, InvitationStatus::Accepted);
    assert_eq!(history[0].from, id("a"));
}
on_both_backends!(accept_links_both_parties);

fn send_after_accept_is_already_related<S: DocumentStore>(_: &Arc<S>, r: &Relations<S>) {
    r.send_invitation(&id("a"), &id("b"), None).unwrap();
    r.accept_invitation(&id("a"), &id("b")).unwrap();

    assert!(is_already_related(
        &r.send_invitation(&id("a"), &id("b"), None).unwrap_err()
    ));
    assert!(is_already_related(
        &r.send_invitation(&id("b"), &id("a"), None).unwrap_err()
    ));
}
on_both_backends!(send_after_accept_is_already_related);

fn accept_twice_fails_second_time<S: DocumentStore>(_: &Arc<S>, r: &Relations<S>) {
    r.send_invitation(&id("a"), &id("b"), None).unwrap();
    r.accept_invitation(&id("a"), &id("b")).unwrap();

    let err = r.accept_invitation(&id("a"), &id("b")).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invitation from a to b does not exist"
    );
    assert!(matches!(
        err,
        RelationError::NotFound(NotFoundError::Invitation { .. })
    ));
    assert_eq!(r.list_members(&id("a")).unwrap().len(), 1);
}
on_both_backends!(accept_twice_fails_second_time);

fn reject_leaves_only_rejected_record<S: DocumentStore>(_: &Arc<S>, r: &Relations<S>) {
    r.send_invitation(&id("a"), &id("b"), None).unwrap();
    r.reject_invitation(&id("a"), &id("b")).unwrap();

    assert!(r.list_members(&id("a")).unwrap().is_empty());
    assert!(r.list_members(&id("b")).unwrap().is_empty());
    assert!(r
        .invitations()
        .pending_between(&id("a"), &id("b"))
        .unwrap()
        .is_none());

    let statuses: Vec<_> = r
        .list_invitations(&id("a"))
        .unwrap()
        .iter()
        .map(|i| i.status)
        .collect();
    assert_eq!(statuses, vec![InvitationStatus::Rejected]);

    assert!(r.reject_invitation(&id("a"), &id("b")).unwrap_err().is_not_found());
}
on_both_backends!(reject_leaves_only_rejected_record);

fn wrong_direction_cannot_resolve<S: DocumentStore>(_: &Arc<S>, r: &Relations<S>) {
    r.send_invitation(&id("a"), &id("b"), None).unwrap();

    assert!(r.accept_invitation(&id("b"), &id("a")).unwrap_err().is_not_found());
    assert!(r.reject_invitation(&id("b"), &id("a")).unwrap_err().is_not_found());
    assert!(r.cancel_invitation(&id("b"), &id("a")).unwrap_err().is_not_found());
    assert!(r
        .invitations()
        .pending_between(&id("a"), &id("b"))
        .unwrap()
        .is_some());
}
on_both_backends!(wrong_direction_cannot_resolve);

fn history_is_oldest_first<S: DocumentStore>(_: &Arc<S>, r: &Relations<S>) {
    r.send_invitation(&id("a"), &id("b"), None).unwrap();
    r.reject_invitation(&id("a"), &id("b")).unwrap();
    r.send_invitation(&id("c"), &id("a"), None).unwrap();
    r.send_invitation(&id("b"), &id("a"), None).unwrap();
    r.accept_invitation(&id("b"), &id("a")).unwrap();

    let history: Vec<_> = r
        .list_invitations(&id("a"))
        .unwrap()
        .into_iter()
        .map(|i| (i.from.clone(), i.status))
        .collect();
    assert_eq!(
        history,
        vec![
            (id("a"), InvitationStatus::Rejected),
            (id("c"), InvitationStatus::Pending),
            (id("b"), InvitationStatus::Accepted),
        ]
    );
}
on_both_backends!(history_is_oldest_first);

fn object_scope_flows_into_membership<S: DocumentStore>(_: &Arc<S>, r: &Relations<S>) {
    r.send_invitation(&id("a"), &id("b"), Some(&id("club")))
        .unwrap();
    let membership = r.accept_invitation(&id("a"), &id("b")).unwrap();
    assert_eq!(membership.object, Some(id("club")));

    // unscoped membership is still missing
    assert!(r
        .remove_membership(&id("a"), &id("b"), None)
        .unwrap_err()
        .is_not_found());
    r.send_invitation(&id("b"), &id("a"), None).unwrap();

    r.remove_membership(&id("b"), &id("a"), Some(&id("club")))
        .unwrap();
}
on_both_backends!(object_scope_flows_into_membership);

// ============================================================================
// Memberships
// ============================================================================

fn remove_missing_membership_fails<S: DocumentStore>(_: &Arc<S>, r: &Relations<S>) {
    let err = r.remove_membership(&id("a"), &id("b"), None).unwrap_err();
    assert!(matches!(
        err,
        RelationError::NotFound(NotFoundError::Membership { .. })
    ));
}
on_both_backends!(remove_missing_membership_fails);

fn remove_then_resend<S: DocumentStore>(_: &Arc<S>, r: &Relations<S>) {
    r.send_invitation(&id("a"), &id("b"), None).unwrap();
    r.accept_invitation(&id("a"), &id("b")).unwrap();

    r.remove_membership(&id("b"), &id("a"), None).unwrap();
    assert!(r.list_members(&id("a")).unwrap().is_empty());
    assert!(r.list_members(&id("b")).unwrap().is_empty());

    r.send_invitation(&id("a"), &id("b"), None).unwrap();
}
on_both_backends!(remove_then_resend);

fn list_members_spans_many_pairs<S: DocumentStore>(_: &Arc<S>, r: &Relations<S>) {
    for other in ["b", "c", "d"] {
        r.send_invitation(&id("a"), &id(other), None).unwrap();
    }
    r.accept_invitation(&id("a"), &id("b")).unwrap();
    r.accept_invitation(&id("a"), &id("d")).unwrap();
    r.reject_invitation(&id("a"), &id("c")).unwrap();

    assert_eq!(r.list_members(&id("a")).unwrap(), vec![id("b"), id("d")]);
    assert!(r.list_members(&id("c")).unwrap().is_empty());
}
on_both_backends!(list_members_spans_many_pairs);

// ============================================================================
// Favorites
// ============================================================================

fn favorite_round_trip<S: DocumentStore>(_: &Arc<S>, r: &Relations<S>) {
    r.add_favorite(&id("u"), &id("post")).unwrap();
    assert!(r.get_favorites(&id("post")).unwrap().contains(&id("u")));

    let err = r.add_favorite(&id("u"), &id("post")).unwrap_err();
    assert!(matches!(
        err,
        RelationError::NotAllowed(NotAllowedError::AlreadyFavorited { .. })
    ));

    r.remove_favorite(&id("u"), &id("post")).unwrap();
    assert!(!r.get_favorites(&id("post")).unwrap().contains(&id("u")));
    assert!(r
        .remove_favorite(&id("u"), &id("post"))
        .unwrap_err()
        .is_not_found());
}
on_both_backends!(favorite_round_trip);

fn get_favorites_lists_who_marked_entity<S: DocumentStore>(_: &Arc<S>, r: &Relations<S>) {
    r.add_favorite(&id("u"), &id("post")).unwrap();
    r.add_favorite(&id("fan"), &id("u")).unwrap();
    r.add_favorite(&id("v"), &id("post")).unwrap();

    assert_eq!(r.get_favorites(&id("u")).unwrap(), vec![id("fan")]);
    assert_eq!(r.get_favorites(&id("post")).unwrap(), vec![id("u"), id("v")]);

    r.remove_favorite(&id("u"), &id("post")).unwrap();
    assert_eq!(r.get_favorites(&id("post")).unwrap(), vec![id("v")]);
    assert_eq!(r.get_favorites(&id("u")).unwrap(), vec![id("fan")]);
}
on_both_backends!(get_favorites_lists_who_marked_entity);

fn self_favorite_is_refused<S: DocumentStore>(_: &Arc<S>, r: &Relations<S>) {
    assert!(r.add_favorite(&id("u"), &id("u")).unwrap_err().is_not_allowed());
}
on_both_backends!(self_favorite_is_refused);

// ============================================================================
// Transactions
// ============================================================================

fn failed_accept_rolls_back<S: DocumentStore>(store: &Arc<S>, r: &Relations<S>) {
    r.send_invitation(&id("a"), &id("b"), None).unwrap();

    // A membership written behind the ledger's back makes the accept fail
    // at its final step.
    Collection::<Membership>::new(&**store)
        .create_one(&Membership {
            user1: id("b"),
            user2: id("a"),
            object: None,
        })
        .unwrap();

    let err = r.accept_invitation(&id("a"), &id("b")).unwrap_err();
    assert!(is_already_related(&err));

    let pending = r
        .invitations()
        .pending_between(&id("a"), &id("b"))
        .unwrap()
        .expect("pending record survives rollback");
    assert_eq!(pending.status, InvitationStatus::Pending);
    assert_eq!(r.list_invitations(&id("a")).unwrap().len(), 1);
    assert_eq!(r.list_members(&id("a")).unwrap(), vec![id("b")]);
}
on_both_backends!(failed_accept_rolls_back);

// ============================================================================
// On-disk Persistence
// ============================================================================

mod persistence_tests {
    use super::*;

    #[test]
    fn open_creates_nested_directory() {
        let base = unique_temp_dir("open_nested");
        let config = RelationsConfig::new(base.join("level1").join("level2"));
        assert!(!config.data_dir.exists());

        let _relations = Relations::open(&config).expect("should open relations");

        assert!(config.data_dir.is_dir());
        assert!(config.database_path().exists());

        cleanup_dir(&base);
    }

    #[test]
    fn state_survives_reopen() {
        let dir = unique_temp_dir("reopen");
        let config = RelationsConfig::new(&dir).with_database_file("state.db");

        {
            let relations = Relations::open(&config).unwrap();
            relations.send_invitation(&id("a"), &id("b"), None).unwrap();
            relations.send_invitation(&id("c"), &id("a"), None).unwrap();
            relations.accept_invitation(&id("c"), &id("a")).unwrap();
            relations.add_favorite(&id("b"), &id("post")).unwrap();
        }

        let relations = Relations::open(&config).unwrap();
        assert!(is_conflict(
            &relations
                .send_invitation(&id("b"), &id("a"), None)
                .unwrap_err()
        ));
        assert_eq!(relations.list_members(&id("a")).unwrap(), vec![id("c")]);
        assert_eq!(relations.get_favorites(&id("post")).unwrap(), vec![id("b")]);

        cleanup_dir(&dir);
    }

    #[test]
    fn two_handles_on_same_file_share_state() {
        let dir = unique_temp_dir("two_handles");
        let config = RelationsConfig::new(&dir);

        let first = Relations::open(&config).unwrap();
        let second = Relations::open(&config).unwrap();

        first.send_invitation(&id("a"), &id("b"), None).unwrap();
        assert!(is_conflict(
            &second.send_invitation(&id("b"), &id("a"), None).unwrap_err()
        ));
        second.accept_invitation(&id("a"), &id("b")).unwrap();
        assert_eq!(first.list_members(&id("b")).unwrap(), vec![id("a")]);

        cleanup_dir(&dir);
    }

    #[test]
    fn stores_are_interchangeable() {
        let sqlite = Relations::new(Arc::new(SqliteStore::in_memory().unwrap()));
        let memory = Relations::new(Arc::new(MemoryStore::new()));

        sqlite.send_invitation(&id("x"), &id("y"), None).unwrap();
        memory.send_invitation(&id("x"), &id("y"), None).unwrap();

        assert_eq!(
            sqlite.list_invitations(&id("y")).unwrap().len(),
            memory.list_invitations(&id("y")).unwrap().len()
        );
    }
}
