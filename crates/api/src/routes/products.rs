//! Product handlers: CRUD, barcode lookup and the dashboard summary.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;

use stocksavvy_core::{ProductId, StockStatus, StoreId, is_default_store_ref};

use super::extract::{ApiJson, ApiQuery};
use crate::{
    error::AppError,
    middleware::CurrentUser,
    models::{InventorySummary, Product, ProductFilter},
    services::{ProductChanges, ProductDraft},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(list_products).post(create_product))
        .route("/api/products/summary", get(summary))
        .route("/api/products/barcode/{code}", get(find_by_barcode))
        .route(
            "/api/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
}

/// A product as returned to clients, with its derived stock status.
#[derive(Debug, Serialize)]
pub struct ProductResponse {
    #[serde(flatten)]
    pub product: Product,
    pub status: StockStatus,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        let status = product.status();
        Self { product, status }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    #[serde(default, alias = "storeId")]
    pub store_id: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
    #[serde(default, alias = "storeId")]
    pub store_id: Option<String>,
}

/// Omitted fields are left alone; `""` clears description, barcode, SKU or category.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub quantity: Option<i32>,
}

/// Resolve a client store reference.
///
/// Absent, blank and `"default"` all mean "no particular store".
fn store_ref(raw: Option<&str>) -> Result<Option<StoreId>, AppError> {
    if is_default_store_ref(raw) {
        return Ok(None);
    }
    let id = raw.unwrap_or_default().trim();
    id.parse()
        .map(Some)
        .map_err(|_| AppError::InvalidInput(format!("invalid store_id: {id}")))
}

fn parse_product_id(raw: &str) -> Result<ProductId, AppError> {
    raw.parse()
        .map_err(|_| AppError::NotFound("product not found".to_string()))
}

/// Products in every store the caller can see, optionally narrowed.
async fn list_products(
    CurrentUser(actor): CurrentUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> Result<Json<Vec<ProductResponse>>, AppError> {
    let store_id = store_ref(query.store_id.as_deref())?;
    let filter = ProductFilter {
        barcode: query.barcode,
        category: query.category,
        search: query.search,
    };
    let products = state
        .inventory()
        .list_products(&actor, store_id, &filter)
        .await?;
    Ok(Json(products.into_iter().map(Into::into).collect()))
}

async fn create_product(
    CurrentUser(actor): CurrentUser,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), AppError> {
    let store_id = store_ref(body.store_id.as_deref())?;
    let draft = ProductDraft {
        name: body.name,
        description: body.description,
        barcode: body.barcode,
        sku: body.sku,
        category: body.category,
        price: body.price,
        quantity: body.quantity,
    };
    let product = state
        .inventory()
        .create_product(&actor, store_id, draft)
        .await?;
    Ok((StatusCode::CREATED, Json(product.into())))
}

async fn get_product(
    CurrentUser(actor): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, AppError> {
    let id = parse_product_id(&id)?;
    let product = state.inventory().get_product(&actor, id).await?;
    Ok(Json(product.into()))
}

async fn update_product(
    CurrentUser(actor): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, AppError> {
    let id = parse_product_id(&id)?;
    let changes = ProductChanges {
        name: body.name,
        description: body.description,
        barcode: body.barcode,
        sku: body.sku,
        category: body.category,
        price: body.price,
        quantity: body.quantity,
    };
    let product = state
        .inventory()
        .update_product(&actor, id, changes)
        .await?;
    Ok(Json(product.into()))
}

/// Delete a product. Owners and admins only.
async fn delete_product(
    CurrentUser(actor): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let id = parse_product_id(&id)?;
    state.inventory().delete_product(&actor, id).await?;
    Ok(Json(json!({ "message": "Product deleted successfully" })))
}

/// First visible product carrying `code`.
async fn find_by_barcode(
    CurrentUser(actor): CurrentUser,
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ProductResponse>, AppError> {
    let product = state.inventory().find_by_barcode(&actor, &code).await?;
    Ok(Json(product.into()))
}

async fn summary(
    CurrentUser(actor): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<InventorySummary>, AppError> {
    Ok(Json(state.inventory().summary(&actor).await?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_store_ref() {
        assert_eq!(store_ref(None).unwrap(), None);
        assert_eq!(store_ref(Some("  ")).unwrap(), None);
        assert_eq!(store_ref(Some("default")).unwrap(), None);

        let id = StoreId::new();
        assert_eq!(store_ref(Some(&id.to_string())).unwrap(), Some(id));
        assert!(matches!(
            store_ref(Some("acme")),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_create_request_accepts_camel_case_and_string_price() {
        let body: CreateProductRequest = serde_json::from_str(
            r#"{"name": "Mug", "price": "4.50", "quantity": 3, "storeId": "default"}"#,
        )
        .unwrap();
        assert_eq!(body.price, Decimal::new(450, 2));
        assert_eq!(body.store_id.as_deref(), Some("default"));
    }
}
