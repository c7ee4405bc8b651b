//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use gatherly_api::AppState;
use gatherly_core::config::{AppConfig, StoreProvider};
use gatherly_database::{AccountStore, MemoryAccountStore};
use gatherly_entity::account::Account;

/// Signing secret used by every test app.
pub const SECRET: &str = "integration-test-secret";

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Shared state, for issuing credentials
    pub state: AppState,
    /// Backing account store for seeding and inspection
    pub accounts: MemoryAccountStore,
}

/// Configuration used by test apps.
pub fn test_config(secret: Option<&str>) -> AppConfig {
    let mut config = AppConfig::default();
    config.database.provider = StoreProvider::Memory;
    config.auth.credential_secret = secret.map(str::to_string);
    config
}

impl TestApp {
    /// Create a new test application over an empty in-memory store
    pub async fn new() -> Self {
        let accounts = MemoryAccountStore::new();
        Self::with_store(test_config(Some(SECRET)), accounts.clone(), Arc::new(accounts)).await
    }

    /// Create a test application whose router talks to `store`
    pub async fn with_store(
        config: AppConfig,
        accounts: MemoryAccountStore,
        store: Arc<dyn AccountStore>,
    ) -> Self {
        let state = AppState::new(config, store);
        let router = gatherly_api::build_app(state.clone());
        Self {
            router,
            state,
            accounts,
        }
    }

    /// Create an active account and return its ID
    pub fn create_account(&self, email: &str) -> Uuid {
        let name = email.split('@').next().unwrap_or(email);
        self.accounts.insert(Account::new(email, name))
    }

    /// Issue a credential the way the login endpoint would
    pub fn token_for(&self, account_id: Uuid) -> String {
        self.state
            .codec
            .issue(account_id)
            .expect("Failed to issue credential")
            .token
    }

    /// Make a JSON request to the test app
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");

        if let Some(token) = token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }

        let req = req
            .body(Body::from(body_str))
            .expect("Failed to build request");

        self.send(req).await
    }

    /// Send a prepared request to the test app
    pub async fn send(&self, req: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }
}

/// Polls `check` until it holds or two seconds pass.
///
/// Presence and last-active writes land on detached tasks.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}

impl TestResponse {
    /// The `error` code of an error body.
    pub fn error_code(&self) -> &str {
        self.body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// The `data` field of a success body.
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }
}
