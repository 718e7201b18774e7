//! Store-level authorization.
//!
//! Decisions are computed from the actor's role, store ownership and
//! grants on every call. Nothing is cached between requests.

use std::collections::BTreeSet;

use tracing::instrument;

use stocksavvy_core::{Role, StoreId};

use super::ServiceError;
use crate::db::{RepositoryError, ResourceStore};
use crate::models::{Store, StoreScope, User};

/// Answers "may this actor touch this store?".
pub struct AccessResolver<'a> {
    store: &'a dyn ResourceStore,
}

impl<'a> AccessResolver<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn ResourceStore) -> Self {
        Self { store }
    }

    /// Admins reach every store, owners the stores they own or were granted,
    /// workers only granted stores.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if a lookup fails.
    #[instrument(skip(self, actor), fields(user_id = %actor.id))]
    pub async fn can_access_store(
        &self,
        actor: &User,
        store_id: StoreId,
    ) -> Result<bool, RepositoryError> {
        match actor.role {
            Role::Admin => Ok(true),
            Role::Owner => {
                let owns = self
                    .store
                    .get_store(store_id)
                    .await?
                    .is_some_and(|s| s.owner_id == actor.id);
                if owns {
                    return Ok(true);
                }
                self.has_grant(actor, store_id).await
            }
            Role::Worker => self.has_grant(actor, store_id).await,
        }
    }

    /// The stores the actor may see.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if a lookup fails.
    pub async fn visible_store_ids(&self, actor: &User) -> Result<StoreScope, RepositoryError> {
        let mut ids = BTreeSet::new();
        match actor.role {
            Role::Admin => return Ok(StoreScope::All),
            Role::Owner => {
                ids.extend(
                    self.store
                        .stores_owned_by(actor.id)
                        .await?
                        .into_iter()
                        .map(|s| s.id),
                );
            }
            Role::Worker => {}
        }
        ids.extend(
            self.store
                .grants_for_user(actor.id)
                .await?
                .into_iter()
                .map(|g| g.store_id),
        );
        Ok(StoreScope::Stores(ids))
    }

    /// Whether the actor may create stores, invite workers and delete products.
    #[must_use]
    pub const fn can_mutate(actor: &User) -> bool {
        actor.role.can_mutate()
    }

    /// Load a store and check access to it.
    ///
    /// # Errors
    ///
    /// `NotFound` if the store does not exist, `Forbidden` if the actor
    /// cannot reach it.
    pub async fn require_store(
        &self,
        actor: &User,
        store_id: StoreId,
    ) -> Result<Store, ServiceError> {
        let store = self
            .store
            .get_store(store_id)
            .await?
            .ok_or(ServiceError::NotFound("store"))?;
        if !self.can_access_store(actor, store_id).await? {
            return Err(ServiceError::Forbidden("no access to this store"));
        }
        Ok(store)
    }

    async fn has_grant(&self, actor: &User, store_id: StoreId) -> Result<bool, RepositoryError> {
        Ok(self.store.find_grant(actor.id, store_id).await?.is_some())
    }
}
