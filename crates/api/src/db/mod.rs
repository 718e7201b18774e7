//! Persistence for users, stores, grants and products.
//!
//! # Backends
//!
//! Every backend implements [`ResourceStore`]; one is selected at process
//! start (`STOCKSAVVY_STORE`) and shared behind an `Arc<dyn ResourceStore>`.
//!
//! - [`MemoryStore`] - in-process tables, used for local development and tests
//! - [`PgStore`] - `PostgreSQL` via sqlx
//!
//! # Tables (`PostgreSQL`)
//!
//! - `users` - unique on `external_identity_id`
//! - `stores` - owned by a user
//! - `store_access` - grants, unique on `(user_id, store_id)`
//! - `products` - belong to one store
//!
//! # Migrations
//!
//! Migrations live in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p stocksavvy-cli -- migrate
//! ```
//!
//! Uniqueness is enforced by the backend, not by locking in the caller:
//! a duplicate insert surfaces as [`RepositoryError::Conflict`].

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use stocksavvy_core::{Email, GrantRole, ProductId, Role, StoreId, UserId};

use crate::models::{
    NewProduct, NewStore, NewUser, Product, ProductFilter, ProductPatch, ProfileUpdate, Store,
    StoreAccessGrant, StoreScope, User,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Uniqueness violation (duplicate identity, duplicate grant).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique-violation into `Conflict`, everything else into `Database`.
pub(crate) fn map_unique_violation(err: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(err)
}

/// Storage interface shared by every backend.
///
/// Implementations must be thread-safe. Every write is a single atomic
/// operation; there are no multi-call transactions at this layer.
#[async_trait]
pub trait ResourceStore: Send + Sync + 'static {
    // Users

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn find_user_by_identity(
        &self,
        external_identity_id: &str,
    ) -> Result<Option<User>, RepositoryError>;

    /// First user (by creation time) with this email.
    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// Insert a user. `Conflict` if the external identity is taken, or if
    /// the row is a placeholder and one already exists for its email.
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError>;

    /// Swap a placeholder identity for a real one.
    ///
    /// Only succeeds while the row still carries `expected_identity`, so two
    /// racing logins cannot both claim it; the loser gets `NotFound`.
    async fn attach_identity(
        &self,
        id: UserId,
        expected_identity: &str,
        external_identity_id: &str,
    ) -> Result<User, RepositoryError>;

    async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
    ) -> Result<User, RepositoryError>;

    async fn set_role(&self, id: UserId, role: Role) -> Result<User, RepositoryError>;

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError>;

    async fn count_users_with_role(&self, role: Role) -> Result<u64, RepositoryError>;

    // Stores

    async fn create_store(&self, store: NewStore) -> Result<Store, RepositoryError>;

    async fn get_store(&self, id: StoreId) -> Result<Option<Store>, RepositoryError>;

    /// Stores in scope, oldest first.
    async fn list_stores(&self, scope: &StoreScope) -> Result<Vec<Store>, RepositoryError>;

    /// Stores owned by a user, oldest first.
    async fn stores_owned_by(&self, owner_id: UserId) -> Result<Vec<Store>, RepositoryError>;

    // Grants

    /// Insert a grant. `Conflict` if `(user_id, store_id)` already exists.
    async fn create_grant(
        &self,
        user_id: UserId,
        store_id: StoreId,
        role: GrantRole,
    ) -> Result<StoreAccessGrant, RepositoryError>;

    async fn find_grant(
        &self,
        user_id: UserId,
        store_id: StoreId,
    ) -> Result<Option<StoreAccessGrant>, RepositoryError>;

    async fn grants_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<StoreAccessGrant>, RepositoryError>;

    // Products

    async fn create_product(&self, product: NewProduct) -> Result<Product, RepositoryError>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Products in scope matching the filter, oldest first.
    async fn list_products(
        &self,
        scope: &StoreScope,
        filter: &ProductFilter,
    ) -> Result<Vec<Product>, RepositoryError>;

    /// Apply a patch and refresh `updated_at`. `NotFound` if the product is gone.
    async fn update_product(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Product, RepositoryError>;

    async fn delete_product(&self, id: ProductId) -> Result<(), RepositoryError>;

    // Health

    /// Cheap round-trip used by the readiness probe.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
