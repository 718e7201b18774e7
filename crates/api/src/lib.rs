//! StockSavvy API library.
//!
//! Multi-tenant inventory service: users sign in through an external
//! identity provider, own or work in stores, and manage the products in
//! those stores. The binary in `main.rs` wires configuration, storage and
//! the identity verifier into [`build_router`]; tests build the same router
//! over [`db::MemoryStore`] and [`identity::StaticTokenVerifier`].
//!
//! # Access model
//!
//! - `admin` sees and changes everything
//! - `owner` manages the stores they own plus any they were granted
//! - `worker` reads and edits products in granted stores, never deletes

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use config::{ApiConfig, IdentityBackend};
use identity::{FirebaseVerifier, IdentityVerifier, StaticTokenVerifier};
use state::AppState;

/// Build the HTTP application with CORS and request tracing applied.
///
/// Sentry layers are added by the binary so tests stay free of a client.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(state.config());

    routes::routes()
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        user_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record("latency_ms", latency.as_millis() as u64);
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

fn cors_layer(config: &ApiConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    let allow_origin = if config.cors_origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Construct the identity verifier selected by configuration.
///
/// # Errors
///
/// Returns a URL error if the Firebase base URL cannot be joined with the
/// lookup path.
pub fn build_verifier(
    backend: &IdentityBackend,
) -> Result<Arc<dyn IdentityVerifier>, url::ParseError> {
    let verifier: Arc<dyn IdentityVerifier> = match backend {
        IdentityBackend::Firebase(firebase) => Arc::new(FirebaseVerifier::new(
            reqwest::Client::new(),
            &firebase.base_url,
            firebase.api_key.clone(),
        )?),
        IdentityBackend::Static(tokens) => {
            tracing::warn!(tokens = tokens.len(), "using static token table for identity");
            Arc::new(StaticTokenVerifier::new(tokens.clone()))
        }
    };
    Ok(verifier)
}
