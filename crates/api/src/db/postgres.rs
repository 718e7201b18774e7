//! `PostgreSQL` [`ResourceStore`].
//!
//! Queries are built at runtime (`query_as` / `QueryBuilder`) so the crate
//! compiles without a live database. Roles are stored as text and checked
//! by the schema; rows are validated again on the way out.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use stocksavvy_core::{Email, GrantRole, Price, ProductId, Role, StoreId, UserId};

use super::{RepositoryError, ResourceStore, map_unique_violation};
use crate::models::{
    NewProduct, NewStore, NewUser, Product, ProductFilter, ProductPatch, ProfileUpdate, Store,
    StoreAccessGrant, StoreScope, User,
};

// =============================================================================
// Internal Row Types
// =============================================================================

const USER_COLUMNS: &str =
    "id, external_identity_id, email, display_name, role, avatar_url, created_at";
const STORE_COLUMNS: &str = "id, name, owner_id, created_at";
const GRANT_COLUMNS: &str = "user_id, store_id, role, created_at";
const PRODUCT_COLUMNS: &str = "id, store_id, name, description, barcode, sku, category, \
                               price, quantity, created_by, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    external_identity_id: String,
    email: String,
    display_name: Option<String>,
    role: String,
    avatar_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let role: Role = row
            .role
            .parse()
            .map_err(|e| RepositoryError::DataCorruption(format!("{e}")))?;

        Ok(Self {
            id: UserId::from_uuid(row.id),
            external_identity_id: row.external_identity_id,
            email,
            display_name: row.display_name,
            role,
            avatar_url: row.avatar_url,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StoreRow {
    id: Uuid,
    name: String,
    owner_id: Uuid,
    created_at: DateTime<Utc>,
}

impl From<StoreRow> for Store {
    fn from(row: StoreRow) -> Self {
        Self {
            id: StoreId::from_uuid(row.id),
            name: row.name,
            owner_id: UserId::from_uuid(row.owner_id),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct GrantRow {
    user_id: Uuid,
    store_id: Uuid,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<GrantRow> for StoreAccessGrant {
    type Error = RepositoryError;

    fn try_from(row: GrantRow) -> Result<Self, Self::Error> {
        let role: GrantRole = row
            .role
            .parse()
            .map_err(|e| RepositoryError::DataCorruption(format!("{e}")))?;

        Ok(Self {
            user_id: UserId::from_uuid(row.user_id),
            store_id: StoreId::from_uuid(row.store_id),
            role,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    store_id: Uuid,
    name: String,
    description: Option<String>,
    barcode: Option<String>,
    sku: Option<String>,
    category: Option<String>,
    price: Decimal,
    quantity: i32,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let price = Price::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price in database: {e}"))
        })?;

        Ok(Self {
            id: ProductId::from_uuid(row.id),
            store_id: StoreId::from_uuid(row.store_id),
            name: row.name,
            description: row.description,
            barcode: row.barcode,
            sku: row.sku,
            category: row.category,
            price,
            quantity: row.quantity,
            created_by: row.created_by.map(UserId::from_uuid),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Like [`map_unique_violation`], but a missing parent row is `NotFound`.
fn map_write_error(err: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_foreign_key_violation()
    {
        return RepositoryError::NotFound;
    }
    map_unique_violation(err, what)
}

/// Escape `LIKE` metacharacters so user search text matches literally.
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Append `AND store_id = ANY(..)` for a restricted scope.
fn push_scope(qb: &mut QueryBuilder<'_, Postgres>, column: &str, scope: &StoreScope) {
    if let StoreScope::Stores(ids) = scope {
        let ids: Vec<Uuid> = ids.iter().map(StoreId::as_uuid).collect();
        qb.push(" AND ").push(column).push(" = ANY(").push_bind(ids).push(")");
    }
}

// =============================================================================
// Store
// =============================================================================

/// Postgres-backed store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_user(&self, sql: &str, bind: &str) -> Result<Option<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>(sql)
            .bind(bind)
            .fetch_optional(&self.pool)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }
}

#[async_trait]
impl ResourceStore for PgStore {
    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn find_user_by_identity(
        &self,
        external_identity_id: &str,
    ) -> Result<Option<User>, RepositoryError> {
        self.fetch_user(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE external_identity_id = $1"),
            external_identity_id,
        )
        .await
    }

    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        self.fetch_user(
            &format!(
                "SELECT {USER_COLUMNS} FROM users WHERE email = $1 \
                 ORDER BY created_at, id LIMIT 1"
            ),
            email.as_str(),
        )
        .await
    }

    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (id, external_identity_id, email, display_name, role, avatar_url) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&user.external_identity_id)
        .bind(user.email.as_str())
        .bind(&user.display_name)
        .bind(user.role.as_str())
        .bind(&user.avatar_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "user"))?;

        row.try_into()
    }

    async fn attach_identity(
        &self,
        id: UserId,
        expected_identity: &str,
        external_identity_id: &str,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET external_identity_id = $3 \
             WHERE id = $1 AND external_identity_id = $2 RETURNING {USER_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(expected_identity)
        .bind(external_identity_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "user identity"))?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET display_name = COALESCE($2, display_name), \
             avatar_url = COALESCE($3, avatar_url) \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(&update.display_name)
        .bind(&update.avatar_url)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    async fn set_role(&self, id: UserId, role: Role) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET role = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn count_users_with_role(&self, role: Role) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = $1")
            .bind(role.as_str())
            .fetch_one(&self.pool)
            .await?;

        u64::try_from(count)
            .map_err(|_| RepositoryError::DataCorruption(format!("negative row count {count}")))
    }

    async fn create_store(&self, store: NewStore) -> Result<Store, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(&format!(
            "INSERT INTO stores (id, name, owner_id) VALUES ($1, $2, $3) RETURNING {STORE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&store.name)
        .bind(store.owner_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "store"))?;

        Ok(row.into())
    }

    async fn get_store(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(&format!(
            "SELECT {STORE_COLUMNS} FROM stores WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list_stores(&self, scope: &StoreScope) -> Result<Vec<Store>, RepositoryError> {
        if scope.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {STORE_COLUMNS} FROM stores WHERE TRUE"
        ));
        push_scope(&mut qb, "id", scope);
        qb.push(" ORDER BY created_at, id");

        let rows = qb.build_query_as::<StoreRow>().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn stores_owned_by(&self, owner_id: UserId) -> Result<Vec<Store>, RepositoryError> {
        let rows = sqlx::query_as::<_, StoreRow>(&format!(
            "SELECT {STORE_COLUMNS} FROM stores WHERE owner_id = $1 ORDER BY created_at, id"
        ))
        .bind(owner_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create_grant(
        &self,
        user_id: UserId,
        store_id: StoreId,
        role: GrantRole,
    ) -> Result<StoreAccessGrant, RepositoryError> {
        let row = sqlx::query_as::<_, GrantRow>(&format!(
            "INSERT INTO store_access (user_id, store_id, role) VALUES ($1, $2, $3) \
             RETURNING {GRANT_COLUMNS}"
        ))
        .bind(user_id.as_uuid())
        .bind(store_id.as_uuid())
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "store access grant"))?;

        row.try_into()
    }

    async fn find_grant(
        &self,
        user_id: UserId,
        store_id: StoreId,
    ) -> Result<Option<StoreAccessGrant>, RepositoryError> {
        sqlx::query_as::<_, GrantRow>(&format!(
            "SELECT {GRANT_COLUMNS} FROM store_access WHERE user_id = $1 AND store_id = $2"
        ))
        .bind(user_id.as_uuid())
        .bind(store_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .map(TryInto::try_into)
        .transpose()
    }

    async fn grants_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<StoreAccessGrant>, RepositoryError> {
        let rows = sqlx::query_as::<_, GrantRow>(&format!(
            "SELECT {GRANT_COLUMNS} FROM store_access WHERE user_id = $1 ORDER BY created_at"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "INSERT INTO products \
             (id, store_id, name, description, barcode, sku, category, price, quantity, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(product.store_id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.barcode)
        .bind(&product.sku)
        .bind(&product.category)
        .bind(product.price.amount())
        .bind(product.quantity)
        .bind(product.created_by.map(|id| id.as_uuid()))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "product"))?;

        row.try_into()
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .map(TryInto::try_into)
        .transpose()
    }

    async fn list_products(
        &self,
        scope: &StoreScope,
        filter: &ProductFilter,
    ) -> Result<Vec<Product>, RepositoryError> {
        if scope.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE TRUE"
        ));
        push_scope(&mut qb, "store_id", scope);
        if let Some(barcode) = &filter.barcode {
            qb.push(" AND barcode = ").push_bind(barcode.clone());
        }
        if let Some(category) = &filter.category {
            qb.push(" AND lower(category) = lower(")
                .push_bind(category.clone())
                .push(")");
        }
        if let Some(search) = &filter.search {
            let pattern = like_pattern(search);
            qb.push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR sku ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR barcode ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        qb.push(" ORDER BY created_at, id");

        let rows = qb
            .build_query_as::<ProductRow>()
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn update_product(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products SET \
             name = COALESCE($2, name), \
             description = CASE WHEN $3 THEN $4 ELSE description END, \
             barcode = CASE WHEN $5 THEN $6 ELSE barcode END, \
             sku = CASE WHEN $7 THEN $8 ELSE sku END, \
             category = CASE WHEN $9 THEN $10 ELSE category END, \
             price = COALESCE($11, price), \
             quantity = COALESCE($12, quantity), \
             updated_at = now() \
             WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(&patch.name)
        .bind(patch.description.is_some())
        .bind(patch.description.clone().flatten())
        .bind(patch.barcode.is_some())
        .bind(patch.barcode.clone().flatten())
        .bind(patch.sku.is_some())
        .bind(patch.sku.clone().flatten())
        .bind(patch.category.is_some())
        .bind(patch.category.clone().flatten())
        .bind(patch.price.map(|p| p.amount()))
        .bind(patch.quantity)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
