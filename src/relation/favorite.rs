//! Directed favorite marks.
//!
//! A favorite is a single edge from a sender to a receiver, independent of
//! invitations and memberships. At most one edge exists per ordered pair.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::error::{NotAllowedError, NotFoundError, RelationError, Result};
use super::types::{EntityId, Favorite};
use crate::store::{Collection, DocumentStore, Filter, Stored};

/// Set of directed favorite edges.
pub struct FavoriteIndex<S> {
    store: Arc<S>,
}

impl<S> Clone for FavoriteIndex<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: DocumentStore> FavoriteIndex<S> {
    /// Creates an index over `store`.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Marks `receiver` as a favorite of `sender`.
    ///
    /// # Errors
    ///
    /// Returns [`NotAllowedError::AlreadyFavorited`] if `sender == receiver`
    /// or the edge already exists.
    #[instrument(skip(self), fields(sender = %sender, receiver = %receiver))]
    pub fn add_favorite(&self, sender: &EntityId, receiver: &EntityId) -> Result<Stored<Favorite>> {
        let already = || NotAllowedError::AlreadyFavorited {
            sender: sender.clone(),
            receiver: receiver.clone(),
        };

        if sender == receiver {
            warn!("refusing self favorite");
            return Err(already().into());
        }

        let favorite = Favorite {
            sender: sender.clone(),
            receiver: receiver.clone(),
        };
        let stored = self
            .favorites()
            .create_one(&favorite)
            .map_err(|e| {
                if e.is_duplicate() {
                    warn!("favorite already exists");
                    RelationError::from(already())
                } else {
                    RelationError::from(e)
                }
            })?;

        info!(id = %stored.id, "favorite added");
        Ok(stored)
    }

    /// Removes the edge from `sender` to `receiver`.
    ///
    /// # Errors
    ///
    /// Returns [`NotFoundError::Favorite`] if the edge does not exist.
    #[instrument(skip(self), fields(sender = %sender, receiver = %receiver))]
    pub fn remove_favorite(&self, sender: &EntityId, receiver: &EntityId) -> Result<()> {
        let removed = self
            .favorites()
            .pop_one(&Favorite::edge_filter(sender, receiver))?;

        if removed.is_none() {
            warn!("favorite not found");
            return Err(NotFoundError::Favorite {
                sender: sender.clone(),
                receiver: receiver.clone(),
            }
            .into());
        }

        info!("favorite removed");
        Ok(())
    }

    /// Returns the senders that marked `entity`, oldest first.
    ///
    /// This is the receiver-side view; [`FavoriteIndex::favorites_of`] gives
    /// what a sender marked.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails.
    #[instrument(skip(self), fields(entity = %entity))]
    pub fn get_favorites(&self, entity: &EntityId) -> Result<Vec<EntityId>> {
        let edges = self
            .favorites()
            .read_many(&Favorite::received_filter(entity))?;
        let others: Vec<_> = edges
            .iter()
            .filter_map(|edge| edge.counterpart(entity).cloned())
            .collect();
        debug!("found {} favorites", others.len());
        Ok(others)
    }

    /// Returns the receivers `sender` has marked, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails.
    pub fn favorites_of(&self, sender: &EntityId) -> Result<Vec<EntityId>> {
        Ok(self
            .favorites()
            .read_many(&Filter::eq("sender", sender.as_str()))?
            .into_iter()
            .map(|edge| edge.into_inner().receiver)
            .collect())
    }

    /// Returns whether the edge from `sender` to `receiver` exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails.
    pub fn is_favorited(&self, sender: &EntityId, receiver: &EntityId) -> Result<bool> {
        Ok(self
            .favorites()
            .read_one(&Favorite::edge_filter(sender, receiver))?
            .is_some())
    }

    fn favorites(&self) -> Collection<'_, Favorite> {
        Collection::new(&*self.store)
    }
}
