//! User profile and administration handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use serde::Deserialize;

use stocksavvy_core::{Role, RoleParseError, UserId};

use super::extract::ApiJson;
use crate::{
    error::AppError,
    middleware::CurrentUser,
    models::{ProfileUpdate, User},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users))
        .route("/api/users/me", get(me).put(update_me))
        .route("/api/users/{id}", get(get_user))
        .route("/api/users/{id}/role", put(set_role))
}

/// Profile edit body. Accepts the camelCase names older clients send.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default, alias = "displayName")]
    pub display_name: Option<String>,
    #[serde(default, alias = "avatarUrl", alias = "photoURL")]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: String,
}

fn parse_user_id(raw: &str) -> Result<UserId, AppError> {
    raw.parse()
        .map_err(|_| AppError::NotFound("user not found".to_string()))
}

/// The authenticated user.
async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

/// Update the authenticated user's display name or avatar.
async fn update_me(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<UpdateProfileRequest>,
) -> Result<Json<User>, AppError> {
    let update = ProfileUpdate {
        display_name: body.display_name,
        avatar_url: body.avatar_url,
    };
    let user = state.directory().update_profile(&user, update).await?;
    Ok(Json(user))
}

/// Every user. Admin only.
async fn list_users(
    CurrentUser(actor): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(state.directory().list_users(&actor).await?))
}

/// A single user. Admin or self.
async fn get_user(
    CurrentUser(actor): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>, AppError> {
    let id = parse_user_id(&id)?;
    Ok(Json(state.directory().get_user(&actor, id).await?))
}

/// Change a user's role. Admin only.
async fn set_role(
    CurrentUser(actor): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<SetRoleRequest>,
) -> Result<Json<User>, AppError> {
    let id = parse_user_id(&id)?;
    let role: Role = body
        .role
        .parse()
        .map_err(|e: RoleParseError| AppError::InvalidInput(e.to_string()))?;
    Ok(Json(state.directory().set_role(&actor, id, role).await?))
}
