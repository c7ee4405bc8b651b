//! Integration tests for the presence endpoints.

mod helpers;

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use gatherly_core::error::AppError;
use gatherly_core::result::AppResult;
use gatherly_database::{AccountStore, MemoryAccountStore};
use gatherly_entity::account::Account;
use gatherly_entity::presence::PresenceStatus;

use helpers::{SECRET, TestApp, eventually, test_config};

async fn status_becomes(app: &TestApp, id: Uuid, expected: PresenceStatus) -> bool {
    let accounts = app.accounts.clone();
    eventually(|| {
        let accounts = accounts.clone();
        async move { accounts.get(id).map(|a| a.presence_status) == Some(expected) }
    })
    .await
}

#[tokio::test]
async fn test_put_presence_updates_account() {
    let app = TestApp::new().await;
    let id = app.create_account("put@example.com");
    let token = app.token_for(id);

    let response = app
        .request(
            "PUT",
            "/api/presence",
            Some(json!({ "accountId": id, "status": "ONLINE" })),
            Some(&token),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["status"], "ONLINE");
    assert!(status_becomes(&app, id, PresenceStatus::Online).await);
    assert!(app.accounts.get(id).unwrap().presence_updated_at.is_some());
}

#[tokio::test]
async fn test_beacon_style_post_is_accepted() {
    let app = TestApp::new().await;
    let id = app.create_account("beacon@example.com");
    let token = app.token_for(id);

    let req = Request::builder()
        .method("POST")
        .uri("/api/presence")
        .header("Content-Type", "text/plain;charset=UTF-8")
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::from(format!(
            r#"{{"accountId":"{id}","status":"OFFLINE"}}"#
        )))
        .unwrap();
    let response = app.send(req).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(status_becomes(&app, id, PresenceStatus::Offline).await);
}

#[tokio::test]
async fn test_last_write_wins() {
    let app = TestApp::new().await;
    let id = app.create_account("lww@example.com");
    let token = app.token_for(id);

    for status in ["ONLINE", "AWAY"] {
        let response = app
            .request(
                "PUT",
                "/api/presence",
                Some(json!({ "accountId": id, "status": status })),
                Some(&token),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK);
        assert!(
            status_becomes(&app, id, status.parse().unwrap()).await,
            "status never became {status}"
        );
    }
}

#[tokio::test]
async fn test_presence_requires_credential() {
    let app = TestApp::new().await;
    let id = app.create_account("anon@example.com");

    let response = app
        .request(
            "PUT",
            "/api/presence",
            Some(json!({ "accountId": id, "status": "ONLINE" })),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cannot_write_another_accounts_presence() {
    let app = TestApp::new().await;
    let me = app.create_account("me@example.com");
    let other = app.create_account("other@example.com");

    let response = app
        .request(
            "PUT",
            "/api/presence",
            Some(json!({ "accountId": other, "status": "OFFLINE" })),
            Some(&app.token_for(me)),
        )
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(
        app.accounts.get(other).unwrap().presence_status,
        PresenceStatus::Offline
    );
}

#[tokio::test]
async fn test_unknown_status_is_rejected() {
    let app = TestApp::new().await;
    let id = app.create_account("busy@example.com");

    let response = app
        .request(
            "PUT",
            "/api/presence",
            Some(json!({ "accountId": id, "status": "BUSY" })),
            Some(&app.token_for(id)),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_get_presence_of_unknown_account() {
    let app = TestApp::new().await;

    let response = app
        .request("GET", &format!("/api/presence/{}", Uuid::new_v4()), None, None)
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_presence_reflects_writes() {
    let app = TestApp::new().await;
    let id = app.create_account("seen@example.com");
    let token = app.token_for(id);

    app.request(
        "PUT",
        "/api/presence",
        Some(json!({ "accountId": id, "status": "AWAY" })),
        Some(&token),
    )
    .await;
    assert!(status_becomes(&app, id, PresenceStatus::Away).await);

    let response = app
        .request("GET", &format!("/api/presence/{id}"), None, None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["status"], "AWAY");
    assert!(response.data()["updatedAt"].is_string());
}

/// Delays AWAY writes so a later request can finish first.
#[derive(Debug, Clone)]
struct SlowAwayStore(MemoryAccountStore);

#[async_trait]
impl AccountStore for SlowAwayStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Account>> {
        self.0.find_by_id(id).await
    }

    async fn touch_last_active(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        self.0.touch_last_active(id, at).await
    }

    async fn set_presence(
        &self,
        id: Uuid,
        status: PresenceStatus,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        if status == PresenceStatus::Away {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
        self.0.set_presence(id, status, at).await
    }
}

#[tokio::test]
async fn test_slow_earlier_write_does_not_override_later_one() {
    let accounts = MemoryAccountStore::new();
    let app = TestApp::with_store(
        test_config(Some(SECRET)),
        accounts.clone(),
        Arc::new(SlowAwayStore(accounts)),
    )
    .await;
    let id = app.create_account("slow@example.com");
    let token = app.token_for(id);

    for status in ["AWAY", "OFFLINE"] {
        let response = app
            .request(
                "PUT",
                "/api/presence",
                Some(json!({ "accountId": id, "status": status })),
                Some(&token),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK);
    }

    tokio::time::sleep(std::time::Duration::from_millis(300)).await;
    let account = app.accounts.get(id).unwrap();
    assert_eq!(account.presence_status, PresenceStatus::Offline);
    assert!(account.presence_updated_at.is_some());
}

/// Reads succeed; every write fails.
#[derive(Debug, Clone)]
struct ReadOnlyStore(MemoryAccountStore);

#[async_trait]
impl AccountStore for ReadOnlyStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Account>> {
        self.0.find_by_id(id).await
    }

    async fn touch_last_active(&self, _id: Uuid, _at: DateTime<Utc>) -> AppResult<()> {
        Err(AppError::database("read-only replica"))
    }

    async fn set_presence(
        &self,
        _id: Uuid,
        _status: PresenceStatus,
        _at: DateTime<Utc>,
    ) -> AppResult<bool> {
        Err(AppError::database("read-only replica"))
    }
}

#[tokio::test]
async fn test_failed_side_effects_do_not_fail_requests() {
    let accounts = MemoryAccountStore::new();
    let app = TestApp::with_store(
        test_config(Some(SECRET)),
        accounts.clone(),
        Arc::new(ReadOnlyStore(accounts)),
    )
    .await;
    let id = app.create_account("ro@example.com");
    let token = app.token_for(id);

    let verify = app
        .request("GET", "/api/auth/verify", None, Some(&token))
        .await;
    assert_eq!(verify.status, StatusCode::OK);

    let update = app
        .request(
            "PUT",
            "/api/presence",
            Some(json!({ "accountId": id, "status": "ONLINE" })),
            Some(&token),
        )
        .await;
    assert_eq!(update.status, StatusCode::OK);
    assert_eq!(
        app.accounts.get(id).unwrap().presence_status,
        PresenceStatus::Offline
    );
}
