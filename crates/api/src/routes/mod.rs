//! HTTP route handlers for the inventory API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness probe
//! GET  /health/ready                - Readiness probe (pings the store)
//!
//! # Users
//! GET  /api/users/me                - Current user (provisioned on first call)
//! PUT  /api/users/me                - Update display name / avatar
//! GET  /api/users                   - List users (admin)
//! GET  /api/users/{id}              - User detail (admin or self)
//! PUT  /api/users/{id}/role         - Change role (admin)
//!
//! # Stores
//! GET  /api/stores                  - Visible stores
//! POST /api/stores                  - Create store (owner, admin)
//! GET  /api/stores/{id}             - Store detail
//!
//! # Products
//! GET  /api/products                - List (?store_id, barcode, category, search)
//! POST /api/products                - Create (store_id optional, "default" allowed)
//! GET  /api/products/summary        - Dashboard totals
//! GET  /api/products/barcode/{code} - Barcode lookup
//! GET  /api/products/{id}           - Product detail
//! PUT  /api/products/{id}           - Partial update
//! DELETE /api/products/{id}         - Delete (owner, admin)
//!
//! # Invitations
//! POST /api/invite-worker           - Grant a worker access to a store
//! ```
//!
//! Everything under `/api` requires `Authorization: Bearer <token>`.
//! Errors are always `{"error": "..."}`.

use axum::{Router, http::Uri};

use crate::{error::AppError, middleware::CurrentUser, state::AppState};

mod extract;
pub mod health;
pub mod invites;
pub mod products;
pub mod stores;
pub mod users;

pub use extract::{ApiJson, ApiQuery};

/// Build the application router (without global layers).
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(users::router())
        .merge(stores::router())
        .merge(products::router())
        .merge(invites::router())
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
}

async fn not_found() -> AppError {
    AppError::NotFound("not found".to_string())
}

/// Unsupported method on a known path.
///
/// Protected paths still report a missing or bad token first so the route
/// table is not discoverable without credentials.
async fn method_not_allowed(uri: Uri, user: Result<CurrentUser, AppError>) -> AppError {
    if uri.path().starts_with("/api/")
        && let Err(e) = user
    {
        return e;
    }
    AppError::MethodNotAllowed
}
