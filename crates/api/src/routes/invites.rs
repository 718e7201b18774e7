//! Worker invitations.

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use serde::Deserialize;

use stocksavvy_core::{Email, StoreId};

use super::extract::ApiJson;
use crate::{
    error::AppError, middleware::CurrentUser, services::Invitation, state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/api/invite-worker", post(invite_worker))
}

#[derive(Debug, Deserialize)]
pub struct InviteWorkerRequest {
    pub email: String,
    #[serde(alias = "storeId")]
    pub store_id: String,
}

/// Grant a worker access to one of the caller's stores.
///
/// Unknown emails get a placeholder user that is claimed on first login.
/// Re-inviting the same user to the same store is a 409.
async fn invite_worker(
    CurrentUser(actor): CurrentUser,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<InviteWorkerRequest>,
) -> Result<(StatusCode, Json<Invitation>), AppError> {
    let email = Email::parse(&body.email)
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;
    let store_id: StoreId = body
        .store_id
        .parse()
        .map_err(|_| AppError::InvalidInput("invalid store_id".to_string()))?;

    let invitation = state
        .inventory()
        .invite_worker(&actor, &email, store_id)
        .await?;
    Ok((StatusCode::CREATED, Json(invitation)))
}
