//! Stores, products and worker invitations.
//!
//! Every operation takes the authenticated actor explicitly and asks the
//! [`AccessResolver`] before touching a store.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use stocksavvy_core::{Email, GrantRole, Price, ProductId, StoreId};

use super::{AccessResolver, ServiceError};
use crate::db::{RepositoryError, ResourceStore};
use crate::models::{
    InventorySummary, NewProduct, NewStore, NewUser, Product, ProductFilter, ProductPatch, Store,
    StoreAccessGrant, User,
};

/// Fields of a product to create, before validation.
#[derive(Debug, Clone, Default)]
pub struct ProductDraft {
    pub name: String,
    pub description: Option<String>,
    pub barcode: Option<String>,
    pub sku: Option<String>,
    pub category: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
}

/// Requested product changes, before validation. `None` leaves a field as is;
/// a blank description, barcode, SKU or category clears it.
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub barcode: Option<String>,
    pub sku: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<i32>,
}

/// Result of inviting a worker to a store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub user: User,
    pub grant: StoreAccessGrant,
    /// True when the invitee had never signed in and a placeholder was created.
    pub placeholder_created: bool,
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn required_name(raw: &str, what: &str) -> Result<String, ServiceError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput(format!("{what} name is required")));
    }
    Ok(name.to_owned())
}

fn valid_price(amount: Decimal) -> Result<Price, ServiceError> {
    Price::new(amount).map_err(|e| ServiceError::InvalidInput(e.to_string()))
}

fn valid_quantity(quantity: i32) -> Result<i32, ServiceError> {
    if quantity < 0 {
        return Err(ServiceError::InvalidInput(format!(
            "quantity cannot be negative (got {quantity})"
        )));
    }
    Ok(quantity)
}

impl ProductChanges {
    fn validate(self) -> Result<ProductPatch, ServiceError> {
        Ok(ProductPatch {
            name: self
                .name
                .as_deref()
                .map(|n| required_name(n, "product"))
                .transpose()?,
            description: self.description.map(|v| clean(Some(v))),
            barcode: self.barcode.map(|v| clean(Some(v))),
            sku: self.sku.map(|v| clean(Some(v))),
            category: self.category.map(|v| clean(Some(v))),
            price: self.price.map(valid_price).transpose()?,
            quantity: self.quantity.map(valid_quantity).transpose()?,
        })
    }
}

/// Store and product operations on behalf of an actor.
pub struct InventoryService<'a> {
    store: &'a dyn ResourceStore,
    access: AccessResolver<'a>,
}

impl<'a> InventoryService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn ResourceStore) -> Self {
        Self {
            store,
            access: AccessResolver::new(store),
        }
    }

    // =========================================================================
    // Stores
    // =========================================================================

    /// Stores visible to the actor, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store fails.
    pub async fn list_stores(&self, actor: &User) -> Result<Vec<Store>, ServiceError> {
        let scope = self.access.visible_store_ids(actor).await?;
        if scope.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.store.list_stores(&scope).await?)
    }

    /// Create a store owned by the actor. Owners and admins only.
    ///
    /// # Errors
    ///
    /// `Forbidden` for workers, `InvalidInput` for a blank name.
    #[instrument(skip(self, actor), fields(user_id = %actor.id))]
    pub async fn create_store(&self, actor: &User, name: &str) -> Result<Store, ServiceError> {
        if !AccessResolver::can_mutate(actor) {
            return Err(ServiceError::Forbidden("only owners and admins can create stores"));
        }
        let name = required_name(name, "store")?;
        let store = self
            .store
            .create_store(NewStore {
                name,
                owner_id: actor.id,
            })
            .await?;
        tracing::info!(store_id = %store.id, "store created");
        Ok(store)
    }

    /// A single store the actor can reach.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown store, `Forbidden` without access.
    pub async fn get_store(&self, actor: &User, id: StoreId) -> Result<Store, ServiceError> {
        self.access.require_store(actor, id).await
    }

    /// The store used when a product is created without an explicit store.
    ///
    /// Oldest owned store first. Owners and admins without one get a store
    /// named after them; workers have no default.
    async fn default_store(&self, actor: &User) -> Result<Store, ServiceError> {
        if let Some(store) = self.store.stores_owned_by(actor.id).await?.into_iter().next() {
            return Ok(store);
        }
        if !AccessResolver::can_mutate(actor) {
            return Err(ServiceError::Forbidden("no default store available"));
        }
        let store = self
            .store
            .create_store(NewStore {
                name: format!("{}'s Store", actor.name()),
                owner_id: actor.id,
            })
            .await?;
        tracing::info!(store_id = %store.id, user_id = %actor.id, "created default store");
        Ok(store)
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Products in the actor's scope, optionally narrowed to one store.
    ///
    /// Never fails on an empty scope; an invisible store yields `[]`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store fails.
    pub async fn list_products(
        &self,
        actor: &User,
        store_id: Option<StoreId>,
        filter: &ProductFilter,
    ) -> Result<Vec<Product>, ServiceError> {
        let mut scope = self.access.visible_store_ids(actor).await?;
        if let Some(store_id) = store_id {
            scope = scope.restrict_to(store_id);
        }
        if scope.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.store.list_products(&scope, filter).await?)
    }

    /// Create a product. `store_id = None` resolves the actor's default store.
    ///
    /// # Errors
    ///
    /// `InvalidInput` on validation failure, `NotFound` for an unknown store,
    /// `Forbidden` without access to it.
    #[instrument(skip(self, actor, draft), fields(user_id = %actor.id))]
    pub async fn create_product(
        &self,
        actor: &User,
        store_id: Option<StoreId>,
        draft: ProductDraft,
    ) -> Result<Product, ServiceError> {
        let name = required_name(&draft.name, "product")?;
        let price = valid_price(draft.price)?;
        let quantity = valid_quantity(draft.quantity)?;

        let store = match store_id {
            Some(id) => self.access.require_store(actor, id).await?,
            None => self.default_store(actor).await?,
        };

        let product = self
            .store
            .create_product(NewProduct {
                store_id: store.id,
                name,
                description: clean(draft.description),
                barcode: clean(draft.barcode),
                sku: clean(draft.sku),
                category: clean(draft.category),
                price,
                quantity,
                created_by: Some(actor.id),
            })
            .await?;
        tracing::info!(product_id = %product.id, store_id = %store.id, "product created");
        Ok(product)
    }

    /// A single product in a store the actor can reach.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown product, `Forbidden` without store access.
    pub async fn get_product(&self, actor: &User, id: ProductId) -> Result<Product, ServiceError> {
        let product = self
            .store
            .get_product(id)
            .await?
            .ok_or(ServiceError::NotFound("product"))?;
        if !self.access.can_access_store(actor, product.store_id).await? {
            return Err(ServiceError::Forbidden("no access to this product's store"));
        }
        Ok(product)
    }

    /// Partial update. Refreshes `updated_at`.
    ///
    /// # Errors
    ///
    /// `InvalidInput`, `NotFound` or `Forbidden` as for [`Self::get_product`].
    #[instrument(skip(self, actor, changes), fields(user_id = %actor.id))]
    pub async fn update_product(
        &self,
        actor: &User,
        id: ProductId,
        changes: ProductChanges,
    ) -> Result<Product, ServiceError> {
        let patch = changes.validate()?;
        self.get_product(actor, id).await?;
        self.store.update_product(id, &patch).await.map_err(|e| match e {
            RepositoryError::NotFound => ServiceError::NotFound("product"),
            other => other.into(),
        })
    }

    /// Delete a product. Requires store access and an owner or admin role.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown product, `Forbidden` otherwise.
    #[instrument(skip(self, actor), fields(user_id = %actor.id))]
    pub async fn delete_product(&self, actor: &User, id: ProductId) -> Result<(), ServiceError> {
        self.get_product(actor, id).await?;
        if !AccessResolver::can_mutate(actor) {
            return Err(ServiceError::Forbidden("only owners and admins can delete products"));
        }
        self.store.delete_product(id).await.map_err(|e| match e {
            RepositoryError::NotFound => ServiceError::NotFound("product"),
            other => other.into(),
        })?;
        tracing::info!(product_id = %id, "product deleted");
        Ok(())
    }

    /// First visible product carrying this barcode.
    ///
    /// # Errors
    ///
    /// `NotFound` when no visible product matches.
    pub async fn find_by_barcode(
        &self,
        actor: &User,
        barcode: &str,
    ) -> Result<Product, ServiceError> {
        self.list_products(actor, None, &ProductFilter::by_barcode(barcode))
            .await?
            .into_iter()
            .next()
            .ok_or(ServiceError::NotFound("product"))
    }

    /// Dashboard totals over every visible product.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store fails.
    pub async fn summary(&self, actor: &User) -> Result<InventorySummary, ServiceError> {
        let products = self
            .list_products(actor, None, &ProductFilter::default())
            .await?;
        Ok(InventorySummary::from_products(&products))
    }

    // =========================================================================
    // Invitations
    // =========================================================================

    /// Grant a user worker access to a store, creating a placeholder user
    /// for emails that have never signed in.
    ///
    /// # Errors
    ///
    /// `Forbidden` for workers or without access to the store, `NotFound`
    /// for an unknown store, `Conflict` if the grant already exists.
    #[instrument(skip(self, actor, email), fields(user_id = %actor.id))]
    pub async fn invite_worker(
        &self,
        actor: &User,
        email: &Email,
        store_id: StoreId,
    ) -> Result<Invitation, ServiceError> {
        if !AccessResolver::can_mutate(actor) {
            return Err(ServiceError::Forbidden("only owners and admins can invite workers"));
        }
        self.access.require_store(actor, store_id).await?;

        let (user, placeholder_created) = match self.store.find_user_by_email(email).await? {
            Some(user) => (user, false),
            None => match self.store.create_user(NewUser::placeholder(email.clone())).await {
                Ok(user) => {
                    tracing::info!(user_id = %user.id, "created placeholder user for invite");
                    (user, true)
                }
                // A concurrent invite for the same address won the insert.
                Err(RepositoryError::Conflict(_)) => {
                    let user = self
                        .store
                        .find_user_by_email(email)
                        .await?
                        .ok_or(RepositoryError::NotFound)?;
                    (user, false)
                }
                Err(e) => return Err(e.into()),
            },
        };

        let grant = self
            .store
            .create_grant(user.id, store_id, GrantRole::Worker)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => {
                    ServiceError::Conflict("user already has access to this store".to_owned())
                }
                other => other.into(),
            })?;
        tracing::info!(invitee_id = %user.id, %store_id, "worker invited");

        Ok(Invitation {
            user,
            grant,
            placeholder_created,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use stocksavvy_core::{Role, StockStatus};

    use super::*;
    use crate::db::MemoryStore;

    async fn user(store: &MemoryStore, subject: &str, role: Role) -> User {
        store
            .create_user(NewUser {
                external_identity_id: subject.to_owned(),
                email: Email::parse(&format!("{subject}@shop.io")).unwrap(),
                display_name: Some(subject.to_owned()),
                role,
                avatar_url: None,
            })
            .await
            .unwrap()
    }

    fn draft(name: &str, quantity: i32) -> ProductDraft {
        ProductDraft {
            name: name.to_owned(),
            barcode: Some(format!("bc-{name}")),
            price: Decimal::from_str("2.50").unwrap(),
            quantity,
            ..ProductDraft::default()
        }
    }

    #[tokio::test]
    async fn test_default_store_is_oldest_owned() {
        let store = MemoryStore::new();
        let owner = user(&store, "olive", Role::Owner).await;
        let inventory = InventoryService::new(&store);
        let acme = inventory.create_store(&owner, "Acme").await.unwrap();
        inventory.create_store(&owner, "Second").await.unwrap();

        let product = inventory
            .create_product(&owner, None, draft("Widget", 3))
            .await
            .unwrap();
        assert_eq!(product.store_id, acme.id);
        assert_eq!(product.created_by, Some(owner.id));
    }

    #[tokio::test]
    async fn test_default_store_auto_created_for_owner() {
        let store = MemoryStore::new();
        let owner = user(&store, "olive", Role::Owner).await;
        let inventory = InventoryService::new(&store);

        let product = inventory
            .create_product(&owner, None, draft("Widget", 3))
            .await
            .unwrap();
        let created = store.get_store(product.store_id).await.unwrap().unwrap();
        assert_eq!(created.name, "olive's Store");
        assert_eq!(created.owner_id, owner.id);
    }

    #[tokio::test]
    async fn test_worker_has_no_default_store() {
        let store = MemoryStore::new();
        let worker = user(&store, "wes", Role::Worker).await;
        let inventory = InventoryService::new(&store);
        assert!(matches!(
            inventory.create_product(&worker, None, draft("Widget", 1)).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            inventory.create_store(&worker, "Nope").await,
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_validation() {
        let store = MemoryStore::new();
        let owner = user(&store, "olive", Role::Owner).await;
        let inventory = InventoryService::new(&store);

        assert!(matches!(
            inventory.create_product(&owner, None, draft("  ", 1)).await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            inventory.create_product(&owner, None, draft("Widget", -1)).await,
            Err(ServiceError::InvalidInput(_))
        ));
        let mut negative = draft("Widget", 1);
        negative.price = Decimal::from_str("-1").unwrap();
        assert!(matches!(
            inventory.create_product(&owner, None, negative).await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            inventory.create_store(&owner, " ").await,
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_price_outside_column_range_rejected() {
        let store = MemoryStore::new();
        let owner = user(&store, "olive", Role::Owner).await;
        let inventory = InventoryService::new(&store);

        let mut huge = draft("Widget", 5);
        huge.price = Decimal::from_scientific("7e28").unwrap();
        assert!(matches!(
            inventory.create_product(&owner, None, huge).await,
            Err(ServiceError::InvalidInput(_))
        ));
        let mut sub_cent = draft("Widget", 5);
        sub_cent.price = Decimal::from_str("1.005").unwrap();
        assert!(matches!(
            inventory.create_product(&owner, None, sub_cent).await,
            Err(ServiceError::InvalidInput(_))
        ));

        let product = inventory
            .create_product(&owner, None, draft("Widget", 5))
            .await
            .unwrap();
        let raise = ProductChanges {
            price: Some(Decimal::from_str("10000000000").unwrap()),
            ..ProductChanges::default()
        };
        assert!(matches!(
            inventory.update_product(&owner, product.id, raise).await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(inventory.summary(&owner).await.is_ok());
    }

    #[tokio::test]
    async fn test_blank_update_clears_optional_fields() {
        let store = MemoryStore::new();
        let owner = user(&store, "olive", Role::Owner).await;
        let inventory = InventoryService::new(&store);
        let mut with_category = draft("Widget", 5);
        with_category.category = Some("Tools".into());
        with_category.sku = Some("W-1".into());
        let product = inventory
            .create_product(&owner, None, with_category)
            .await
            .unwrap();

        let updated = inventory
            .update_product(
                &owner,
                product.id,
                ProductChanges {
                    category: Some("   ".into()),
                    ..ProductChanges::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.category, None);
        assert_eq!(updated.sku.as_deref(), Some("W-1"));
        assert_eq!(updated.barcode.as_deref(), Some("bc-Widget"));
    }

    #[tokio::test]
    async fn test_worker_cannot_touch_other_store() {
        let store = MemoryStore::new();
        let owner = user(&store, "olive", Role::Owner).await;
        let worker = user(&store, "wes", Role::Worker).await;
        let inventory = InventoryService::new(&store);
        let a = inventory.create_store(&owner, "A").await.unwrap();
        let b = inventory.create_store(&owner, "B").await.unwrap();
        inventory
            .invite_worker(&owner, &worker.email, a.id)
            .await
            .unwrap();
        let in_b = inventory
            .create_product(&owner, Some(b.id), draft("Bolt", 5))
            .await
            .unwrap();

        let changes = ProductChanges {
            quantity: Some(1),
            ..ProductChanges::default()
        };
        assert!(matches!(
            inventory.update_product(&worker, in_b.id, changes).await,
            Err(ServiceError::Forbidden(_))
        ));

        let visible = inventory
            .list_products(&worker, None, &ProductFilter::default())
            .await
            .unwrap();
        assert!(visible.is_empty());
    }

    #[tokio::test]
    async fn test_worker_updates_but_cannot_delete() {
        let store = MemoryStore::new();
        let owner = user(&store, "olive", Role::Owner).await;
        let worker = user(&store, "wes", Role::Worker).await;
        let inventory = InventoryService::new(&store);
        let shop = inventory.create_store(&owner, "Shop").await.unwrap();
        inventory
            .invite_worker(&owner, &worker.email, shop.id)
            .await
            .unwrap();
        let product = inventory
            .create_product(&worker, Some(shop.id), draft("Nut", 20))
            .await
            .unwrap();

        let updated = inventory
            .update_product(
                &worker,
                product.id,
                ProductChanges {
                    quantity: Some(0),
                    ..ProductChanges::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status(), StockStatus::OutOfStock);
        assert!(updated.updated_at >= product.updated_at);

        assert!(matches!(
            inventory.delete_product(&worker, product.id).await,
            Err(ServiceError::Forbidden(_))
        ));
        inventory.delete_product(&owner, product.id).await.unwrap();
        assert!(matches!(
            inventory.get_product(&owner, product.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_invite_creates_placeholder_then_conflicts() {
        let store = MemoryStore::new();
        let owner = user(&store, "olive", Role::Owner).await;
        let inventory = InventoryService::new(&store);
        let shop = inventory.create_store(&owner, "Shop").await.unwrap();
        let email = Email::parse("newhire@shop.io").unwrap();

        let invite = inventory.invite_worker(&owner, &email, shop.id).await.unwrap();
        assert!(invite.placeholder_created);
        assert!(invite.user.is_placeholder());
        assert_eq!(invite.grant.role, GrantRole::Worker);

        assert!(matches!(
            inventory.invite_worker(&owner, &email, shop.id).await,
            Err(ServiceError::Conflict(_))
        ));
        assert_eq!(store.list_users().await.unwrap().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_invites_share_one_placeholder() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let owner = user(&store, "olive", Role::Owner).await;
        let (a, b) = {
            let inventory = InventoryService::new(store.as_ref());
            (
                inventory.create_store(&owner, "A").await.unwrap(),
                inventory.create_store(&owner, "B").await.unwrap(),
            )
        };
        let email = Email::parse("newhire@shop.io").unwrap();

        let tasks = [a.id, b.id].map(|store_id| {
            let store = store.clone();
            let owner = owner.clone();
            let email = email.clone();
            tokio::spawn(async move {
                InventoryService::new(store.as_ref())
                    .invite_worker(&owner, &email, store_id)
                    .await
            })
        });
        let mut invited = Vec::new();
        for task in tasks {
            invited.push(task.await.unwrap().unwrap());
        }

        assert_eq!(invited[0].user.id, invited[1].user.id);
        let placeholders = store
            .list_users()
            .await
            .unwrap()
            .into_iter()
            .filter(User::is_placeholder)
            .count();
        assert_eq!(placeholders, 1);
    }

    #[tokio::test]
    async fn test_owner_cannot_invite_to_foreign_store() {
        let store = MemoryStore::new();
        let owner = user(&store, "olive", Role::Owner).await;
        let rival = user(&store, "rita", Role::Owner).await;
        let inventory = InventoryService::new(&store);
        let shop = inventory.create_store(&rival, "Rival").await.unwrap();
        let email = Email::parse("x@shop.io").unwrap();

        assert!(matches!(
            inventory.invite_worker(&owner, &email, shop.id).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            inventory.invite_worker(&owner, &email, StoreId::new()).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_barcode_lookup_and_summary() {
        let store = MemoryStore::new();
        let owner = user(&store, "olive", Role::Owner).await;
        let inventory = InventoryService::new(&store);
        for (name, qty) in [("a", 0), ("b", 3), ("c", 50)] {
            inventory
                .create_product(&owner, None, draft(name, qty))
                .await
                .unwrap();
        }

        let found = inventory.find_by_barcode(&owner, "bc-b").await.unwrap();
        assert_eq!(found.name, "b");
        assert!(matches!(
            inventory.find_by_barcode(&owner, "missing").await,
            Err(ServiceError::NotFound(_))
        ));

        let summary = inventory.summary(&owner).await.unwrap();
        assert_eq!(summary.total_products, 3);
        assert_eq!(summary.out_of_stock, 1);
        assert_eq!(summary.low_stock, 1);
        assert_eq!(summary.in_stock, 1);
    }

    #[tokio::test]
    async fn test_list_narrowed_to_invisible_store_is_empty() {
        let store = MemoryStore::new();
        let owner = user(&store, "olive", Role::Owner).await;
        let other = user(&store, "otto", Role::Owner).await;
        let inventory = InventoryService::new(&store);
        let shop = inventory.create_store(&owner, "Shop").await.unwrap();
        inventory
            .create_product(&owner, Some(shop.id), draft("a", 1))
            .await
            .unwrap();

        let listed = inventory
            .list_products(&other, Some(shop.id), &ProductFilter::default())
            .await
            .unwrap();
        assert!(listed.is_empty());
        assert_eq!(
            inventory
                .list_products(&owner, Some(shop.id), &ProductFilter::default())
                .await
                .unwrap()
                .len(),
            1
        );
    }
}
