//! In-memory [`ResourceStore`] for local development and tests.
//!
//! All tables sit behind one `RwLock`, so every write (including its
//! uniqueness check) is atomic. Rows are kept in insertion order, which is
//! also creation order.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::instrument;

use stocksavvy_core::{Email, GrantRole, ProductId, Role, StoreId, UserId};

use super::{RepositoryError, ResourceStore};
use crate::models::{
    NewProduct, NewStore, NewUser, Product, ProductFilter, ProductPatch, ProfileUpdate, Store,
    StoreAccessGrant, StoreScope, User,
};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    stores: Vec<Store>,
    grants: Vec<StoreAccessGrant>,
    products: Vec<Product>,
}

impl Tables {
    fn user_mut(&mut self, id: UserId) -> Result<&mut User, RepositoryError> {
        self.users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(RepositoryError::NotFound)
    }
}

/// Process-local store. Data is lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_identity(
        &self,
        external_identity_id: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.external_identity_id == external_identity_id)
            .cloned())
    }

    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| &u.email == email).cloned())
    }

    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .iter()
            .any(|u| u.external_identity_id == user.external_identity_id)
        {
            return Err(RepositoryError::Conflict("user identity already exists".to_owned()));
        }
        if user.is_placeholder()
            && tables
                .users
                .iter()
                .any(|u| u.is_placeholder() && u.email == user.email)
        {
            return Err(RepositoryError::Conflict(
                "an invite for this email already exists".to_owned(),
            ));
        }

        let row = User {
            id: UserId::new(),
            external_identity_id: user.external_identity_id,
            email: user.email,
            display_name: user.display_name,
            role: user.role,
            avatar_url: user.avatar_url,
            created_at: Utc::now(),
        };
        tables.users.push(row.clone());
        Ok(row)
    }

    async fn attach_identity(
        &self,
        id: UserId,
        expected_identity: &str,
        external_identity_id: &str,
    ) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .iter()
            .any(|u| u.external_identity_id == external_identity_id)
        {
            return Err(RepositoryError::Conflict("user identity already exists".to_owned()));
        }
        let user = tables.user_mut(id)?;
        if user.external_identity_id != expected_identity {
            return Err(RepositoryError::NotFound);
        }
        external_identity_id.clone_into(&mut user.external_identity_id);
        Ok(user.clone())
    }

    async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
    ) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;
        let user = tables.user_mut(id)?;
        if let Some(name) = &update.display_name {
            user.display_name = Some(name.clone());
        }
        if let Some(avatar) = &update.avatar_url {
            user.avatar_url = Some(avatar.clone());
        }
        Ok(user.clone())
    }

    async fn set_role(&self, id: UserId, role: Role) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;
        let user = tables.user_mut(id)?;
        user.role = role;
        Ok(user.clone())
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        Ok(self.tables.read().await.users.clone())
    }

    async fn count_users_with_role(&self, role: Role) -> Result<u64, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().filter(|u| u.role == role).count() as u64)
    }

    async fn create_store(&self, store: NewStore) -> Result<Store, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.users.iter().any(|u| u.id == store.owner_id) {
            return Err(RepositoryError::NotFound);
        }
        let row = Store {
            id: StoreId::new(),
            name: store.name,
            owner_id: store.owner_id,
            created_at: Utc::now(),
        };
        tables.stores.push(row.clone());
        Ok(row)
    }

    async fn get_store(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.stores.iter().find(|s| s.id == id).cloned())
    }

    async fn list_stores(&self, scope: &StoreScope) -> Result<Vec<Store>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .stores
            .iter()
            .filter(|s| scope.contains(s.id))
            .cloned()
            .collect())
    }

    async fn stores_owned_by(&self, owner_id: UserId) -> Result<Vec<Store>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .stores
            .iter()
            .filter(|s| s.owner_id == owner_id)
            .cloned()
            .collect())
    }

    #[instrument(skip(self))]
    async fn create_grant(
        &self,
        user_id: UserId,
        store_id: StoreId,
        role: GrantRole,
    ) -> Result<StoreAccessGrant, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.users.iter().any(|u| u.id == user_id)
            || !tables.stores.iter().any(|s| s.id == store_id)
        {
            return Err(RepositoryError::NotFound);
        }
        if tables
            .grants
            .iter()
            .any(|g| g.user_id == user_id && g.store_id == store_id)
        {
            return Err(RepositoryError::Conflict("store access grant already exists".to_owned()));
        }

        let grant = StoreAccessGrant {
            user_id,
            store_id,
            role,
            created_at: Utc::now(),
        };
        tables.grants.push(grant.clone());
        Ok(grant)
    }

    async fn find_grant(
        &self,
        user_id: UserId,
        store_id: StoreId,
    ) -> Result<Option<StoreAccessGrant>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .grants
            .iter()
            .find(|g| g.user_id == user_id && g.store_id == store_id)
            .cloned())
    }

    async fn grants_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<StoreAccessGrant>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .grants
            .iter()
            .filter(|g| g.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.stores.iter().any(|s| s.id == product.store_id) {
            return Err(RepositoryError::NotFound);
        }
        let now = Utc::now();
        let row = Product {
            id: ProductId::new(),
            store_id: product.store_id,
            name: product.name,
            description: product.description,
            barcode: product.barcode,
            sku: product.sku,
            category: product.category,
            price: product.price,
            quantity: product.quantity,
            created_by: product.created_by,
            created_at: now,
            updated_at: now,
        };
        tables.products.push(row.clone());
        Ok(row)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.products.iter().find(|p| p.id == id).cloned())
    }

    async fn list_products(
        &self,
        scope: &StoreScope,
        filter: &ProductFilter,
    ) -> Result<Vec<Product>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .products
            .iter()
            .filter(|p| scope.contains(p.store_id) && filter.matches(p))
            .cloned()
            .collect())
    }

    async fn update_product(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Product, RepositoryError> {
        let mut tables = self.tables.write().await;
        let product = tables
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(RepositoryError::NotFound)?;
        product.apply(patch, Utc::now());
        Ok(product.clone())
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        let before = tables.products.len();
        tables.products.retain(|p| p.id != id);
        if tables.products.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use stocksavvy_core::Price;

    use super::*;

    fn new_user(subject: &str, email: &str) -> NewUser {
        NewUser {
            external_identity_id: subject.to_owned(),
            email: Email::parse(email).unwrap(),
            display_name: None,
            role: Role::Owner,
            avatar_url: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_identity_is_conflict() {
        let store = MemoryStore::new();
        store.create_user(new_user("uid-1", "a@x.io")).await.unwrap();
        let err = store
            .create_user(new_user("uid-1", "b@x.io"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_one_placeholder_per_email() {
        let store = MemoryStore::new();
        let email = Email::parse("invitee@x.io").unwrap();
        store
            .create_user(NewUser::placeholder(email.clone()))
            .await
            .unwrap();
        let err = store
            .create_user(NewUser::placeholder(email.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        // A signed-in account may share the address with a pending invite.
        store
            .create_user(new_user("uid-real", "invitee@x.io"))
            .await
            .unwrap();
        assert_eq!(store.list_users().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_racing_grants_exactly_one_wins() {
        let store = Arc::new(MemoryStore::new());
        let owner = store.create_user(new_user("uid-o", "o@x.io")).await.unwrap();
        let worker = store.create_user(new_user("uid-w", "w@x.io")).await.unwrap();
        let shop = store
            .create_store(NewStore {
                name: "Acme".into(),
                owner_id: owner.id,
            })
            .await
            .unwrap();

        let a = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.create_grant(worker.id, shop.id, GrantRole::Worker).await }
        });
        let b = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.create_grant(worker.id, shop.id, GrantRole::Worker).await }
        });
        let results = [a.await.unwrap(), b.await.unwrap()];

        let ok = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(RepositoryError::Conflict(_))))
            .count();
        assert_eq!((ok, conflicts), (1, 1));
        assert_eq!(store.grants_for_user(worker.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_attach_identity_requires_expected_value() {
        let store = MemoryStore::new();
        let placeholder = store
            .create_user(NewUser::placeholder(Email::parse("w@x.io").unwrap()))
            .await
            .unwrap();
        let stale = store
            .attach_identity(placeholder.id, "something-else", "uid-real")
            .await
            .unwrap_err();
        assert!(matches!(stale, RepositoryError::NotFound));

        let claimed = store
            .attach_identity(placeholder.id, &placeholder.external_identity_id, "uid-real")
            .await
            .unwrap();
        assert_eq!(claimed.id, placeholder.id);
        assert_eq!(claimed.external_identity_id, "uid-real");
    }

    #[tokio::test]
    async fn test_delete_missing_product_is_not_found() {
        let store = MemoryStore::new();
        let err = store.delete_product(ProductId::new()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_list_products_respects_scope() {
        let store = MemoryStore::new();
        let owner = store.create_user(new_user("uid-o", "o@x.io")).await.unwrap();
        let mut shops = Vec::new();
        for name in ["A", "B"] {
            shops.push(
                store
                    .create_store(NewStore {
                        name: name.into(),
                        owner_id: owner.id,
                    })
                    .await
                    .unwrap(),
            );
        }
        for shop in &shops {
            store
                .create_product(NewProduct {
                    store_id: shop.id,
                    name: format!("item-{}", shop.name),
                    description: None,
                    barcode: None,
                    sku: None,
                    category: None,
                    price: Price::ZERO,
                    quantity: 1,
                    created_by: Some(owner.id),
                })
                .await
                .unwrap();
        }

        let only_a: StoreScope = [shops[0].id].into_iter().collect();
        let listed = store
            .list_products(&only_a, &ProductFilter::default())
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "item-A");

        let empty = StoreScope::Stores(std::collections::BTreeSet::new());
        assert!(
            store
                .list_products(&empty, &ProductFilter::default())
                .await
                .unwrap()
                .is_empty()
        );
    }
}
