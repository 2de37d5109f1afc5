//! Common test utilities for integration tests
//!
//! The router runs over the in-memory store, so every workflow endpoint is
//! testable without PostgreSQL. The pool is lazy and points at a closed
//! port; handlers that read through it fail fast instead of hanging.

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use gardenhub_api::app::{build_router, AppState};
use gardenhub_api::config::{ApiConfig, Config, DatabaseConfig, JwtConfig, PushConfig};
use gardenhub_shared::auth::jwt::issue_token_pair;
use gardenhub_shared::db::pool::{self, create_lazy_pool};
use gardenhub_shared::notify::{NoopPushGateway, DEFAULT_PUSH_ENDPOINT};
use gardenhub_shared::services::Services;
use gardenhub_shared::store::memory::MemoryStore;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret-key-at-least-32-bytes-long";
const UNREACHABLE_DATABASE: &str = "postgresql://gardenhub@127.0.0.1:1/gardenhub";

/// Test context: router plus direct access to the store behind it
pub struct TestContext {
    pub app: Router,
    pub store: Arc<MemoryStore>,
}

pub fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            production: false,
        },
        database: DatabaseConfig {
            url: UNREACHABLE_DATABASE.to_string(),
            max_connections: 1,
        },
        jwt: JwtConfig {
            secret: JWT_SECRET.to_string(),
        },
        push: PushConfig {
            endpoint: DEFAULT_PUSH_ENDPOINT.to_string(),
            server_key: None,
        },
    }
}

impl TestContext {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let services = Services::build(store.clone(), Arc::new(NoopPushGateway));

        let pool_config = pool::DatabaseConfig {
            min_connections: 0,
            connect_timeout_seconds: 1,
            ..pool::DatabaseConfig::with_url(UNREACHABLE_DATABASE, 1)
        };
        let db = create_lazy_pool(&pool_config).expect("lazy pool");

        let app = build_router(AppState::new(db, test_config(), services));
        Self { app, store }
    }

    /// Sends a request and returns status plus parsed JSON body (Null when empty)
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    /// Registers through the API and returns (user id, access token)
    pub async fn register(&self, email: &str) -> (Uuid, String) {
        let (status, body) = self
            .request(
                Method::POST,
                "/v1/auth/register",
                None,
                Some(serde_json::json!({
                    "email": email,
                    "password": "tomato123",
                    "display_name": email.split('@').next().unwrap(),
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");

        let user_id = body["user"]["id"].as_str().unwrap().parse().unwrap();
        let token = body["access_token"].as_str().unwrap().to_string();
        (user_id, token)
    }
}

/// Access token for an arbitrary user id
pub fn token_for(user_id: Uuid) -> String {
    issue_token_pair(user_id, JWT_SECRET).unwrap().access_token
}
