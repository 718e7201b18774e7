//! Store handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;

use stocksavvy_core::StoreId;

use super::extract::ApiJson;
use crate::{error::AppError, middleware::CurrentUser, models::Store, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/stores", get(list_stores).post(create_store))
        .route("/api/stores/{id}", get(get_store))
}

#[derive(Debug, Deserialize)]
pub struct CreateStoreRequest {
    #[serde(default)]
    pub name: String,
}

/// Stores visible to the caller.
async fn list_stores(
    CurrentUser(actor): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Store>>, AppError> {
    Ok(Json(state.inventory().list_stores(&actor).await?))
}

/// Create a store owned by the caller.
async fn create_store(
    CurrentUser(actor): CurrentUser,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateStoreRequest>,
) -> Result<(StatusCode, Json<Store>), AppError> {
    let store = state.inventory().create_store(&actor, &body.name).await?;
    Ok((StatusCode::CREATED, Json(store)))
}

async fn get_store(
    CurrentUser(actor): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Store>, AppError> {
    let id: StoreId = id
        .parse()
        .map_err(|_| AppError::NotFound("store not found".to_string()))?;
    Ok(Json(state.inventory().get_store(&actor, id).await?))
}
