//! Shared harness for HTTP tests: the real router over an in-memory store
//! and a fixed token table.

#![allow(dead_code, clippy::unwrap_used)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use serde_json::Value;
use tower::ServiceExt;

use stocksavvy_api::{
    build_router,
    config::ApiConfig,
    db::MemoryStore,
    identity::{IdentityClaim, StaticTokenVerifier},
    state::AppState,
};
use stocksavvy_core::Email;

pub const ADMIN: &str = "admin-token";
pub const OWNER: &str = "owner-token";
pub const OTHER_OWNER: &str = "other-owner-token";
pub const WORKER: &str = "worker-token";
pub const NEWCOMER: &str = "newcomer-token";

pub const ADMIN_EMAIL: &str = "boss@stocksavvy.test";
pub const NEWCOMER_EMAIL: &str = "newcomer@shop.test";

fn claim(subject: &str, email: &str, name: Option<&str>) -> IdentityClaim {
    IdentityClaim {
        subject_id: subject.to_owned(),
        email: Email::parse(email).unwrap(),
        display_name: name.map(str::to_owned),
        avatar_url: None,
        email_verified: true,
    }
}

pub struct TestApp {
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let config = ApiConfig::from_lookup(|key| match key {
            "STOCKSAVVY_IDENTITY" => Some("static".to_owned()),
            "STOCKSAVVY_STATIC_TOKENS" => Some("{}".to_owned()),
            "STOCKSAVVY_BOOTSTRAP_ADMIN_EMAIL" => Some(ADMIN_EMAIL.to_owned()),
            _ => None,
        })
        .unwrap();

        let verifier = StaticTokenVerifier::default()
            .with_token(ADMIN, claim("uid-admin", ADMIN_EMAIL, Some("Boss")))
            .with_token(OWNER, claim("uid-owner", "olive@shop.test", Some("Olive")))
            .with_token(OTHER_OWNER, claim("uid-other", "oscar@shop.test", None))
            .with_token(WORKER, claim("uid-worker", "wendy@shop.test", Some("Wendy")))
            .with_token(NEWCOMER, claim("uid-newcomer", NEWCOMER_EMAIL, Some("Nell")));

        let state = AppState::new(config, Arc::new(MemoryStore::new()), Arc::new(verifier));
        Self {
            router: build_router(state),
        }
    }

    /// Send a request with an optional JSON body and parse the JSON reply.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let body = body.map(|v| v.to_string());
        self.send_raw(method, uri, token, body.as_deref()).await
    }

    pub async fn send_raw(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_owned()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, Some(token), None).await
    }

    /// Sign in as `token` and return the user's id.
    pub async fn login(&self, token: &str) -> String {
        let (status, me) = self.get("/api/users/me", token).await;
        assert_eq!(status, StatusCode::OK, "login failed: {me}");
        me["id"].as_str().unwrap().to_owned()
    }

    /// Sign in the bootstrap admin, then have them give `token` a role.
    pub async fn login_as(&self, token: &str, role: &str) -> String {
        self.login(ADMIN).await;
        let id = self.login(token).await;
        let (status, body) = self
            .put(
                &format!("/api/users/{id}/role"),
                ADMIN,
                serde_json::json!({ "role": role }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "set role failed: {body}");
        id
    }

    pub async fn create_store(&self, token: &str, name: &str) -> String {
        let (status, store) = self
            .post("/api/stores", token, serde_json::json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create store failed: {store}");
        store["id"].as_str().unwrap().to_owned()
    }

    pub async fn create_product(&self, token: &str, body: Value) -> Value {
        let (status, product) = self.post("/api/products", token, body).await;
        assert_eq!(status, StatusCode::CREATED, "create product failed: {product}");
        product
    }
}
