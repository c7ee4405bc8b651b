//! Integration tests for the session middleware and verification endpoint.

mod helpers;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};

use gatherly_auth::CredentialCodec;
use gatherly_core::config::AuthConfig;
use gatherly_database::MemoryAccountStore;

use helpers::{TestApp, eventually, test_config};

#[tokio::test]
async fn test_verify_without_credential() {
    let app = TestApp::new().await;

    let response = app.request("GET", "/api/auth/verify", None, None).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.error_code(), "NO_CREDENTIAL");
}

#[tokio::test]
async fn test_verify_returns_identity() {
    let app = TestApp::new().await;
    let id = app.create_account("ada@example.com");
    let token = app.token_for(id);

    let response = app
        .request("GET", "/api/auth/verify", None, Some(&token))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["id"], id.to_string());
    assert_eq!(response.data()["email"], "ada@example.com");
    assert_eq!(response.data()["banned"], false);
    assert_eq!(response.data()["status"], "OFFLINE");
}

#[tokio::test]
async fn test_successful_request_stamps_last_active() {
    let app = TestApp::new().await;
    let id = app.create_account("stamp@example.com");
    let token = app.token_for(id);
    assert!(app.accounts.get(id).unwrap().last_active_at.is_none());

    app.request("GET", "/api/auth/verify", None, Some(&token))
        .await;

    let accounts = app.accounts.clone();
    assert!(eventually(|| {
        let accounts = accounts.clone();
        async move { accounts.get(id).unwrap().last_active_at.is_some() }
    })
    .await);
}

#[tokio::test]
async fn test_malformed_authorization_header() {
    let app = TestApp::new().await;

    let req = Request::builder()
        .uri("/api/auth/verify")
        .header("Authorization", "Token not-a-bearer")
        .body(Body::empty())
        .unwrap();
    let response = app.send(req).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.error_code(), "INVALID_CREDENTIAL");
}

#[tokio::test]
async fn test_tampered_credential() {
    let app = TestApp::new().await;
    let id = app.create_account("tamper@example.com");
    let mut token = app.token_for(id).into_bytes();
    let dot = token.iter().position(|b| *b == b'.').unwrap();
    token[dot + 3] = if token[dot + 3] == b'A' { b'B' } else { b'A' };
    let token = String::from_utf8(token).unwrap();

    let response = app
        .request("GET", "/api/auth/verify", None, Some(&token))
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.error_code(), "INVALID_CREDENTIAL");
}

#[tokio::test]
async fn test_expired_credential() {
    let app = TestApp::new().await;
    let id = app.create_account("old@example.com");
    let token = app
        .state
        .codec
        .issue_at(id, Utc::now() - Duration::days(8))
        .unwrap()
        .token;

    let response = app
        .request("GET", "/api/auth/verify", None, Some(&token))
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.error_code(), "INVALID_CREDENTIAL");
}

#[tokio::test]
async fn test_credential_for_deleted_account() {
    let app = TestApp::new().await;
    let id = app.create_account("gone@example.com");
    let token = app.token_for(id);
    app.accounts.remove(id);

    let response = app
        .request("GET", "/api/auth/verify", None, Some(&token))
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.error_code(), "ACCOUNT_NOT_FOUND");
}

#[tokio::test]
async fn test_ban_after_issue_is_enforced() {
    let app = TestApp::new().await;
    let id = app.create_account("banned@example.com");
    let token = app.token_for(id);

    let before = app
        .request("GET", "/api/auth/verify", None, Some(&token))
        .await;
    assert_eq!(before.status, StatusCode::OK);

    app.accounts.set_banned(id, true);
    let after = app
        .request("GET", "/api/auth/verify", None, Some(&token))
        .await;

    assert_eq!(after.status, StatusCode::FORBIDDEN);
    assert_eq!(after.error_code(), "ACCOUNT_INACTIVE_OR_BANNED");
}

#[tokio::test]
async fn test_inactive_account_is_rejected() {
    let app = TestApp::new().await;
    let id = app.create_account("inactive@example.com");
    app.accounts.set_active(id, false);
    let token = app.token_for(id);

    let response = app
        .request("GET", "/api/auth/verify", None, Some(&token))
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error_code(), "ACCOUNT_INACTIVE_OR_BANNED");
}

#[tokio::test]
async fn test_suspended_is_distinct_from_banned() {
    let app = TestApp::new().await;
    let suspended = app.create_account("suspended@example.com");
    let both = app.create_account("both@example.com");
    app.accounts.set_suspended(suspended, true);
    app.accounts.set_suspended(both, true);
    app.accounts.set_banned(both, true);

    let response = app
        .request("GET", "/api/auth/verify", None, Some(&app.token_for(suspended)))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error_code(), "ACCOUNT_SUSPENDED");
    assert_eq!(response.body["message"], "Account is suspended");

    let response = app
        .request("GET", "/api/auth/verify", None, Some(&app.token_for(both)))
        .await;
    assert_eq!(response.error_code(), "ACCOUNT_INACTIVE_OR_BANNED");
}

#[tokio::test]
async fn test_missing_signing_secret_is_server_error() {
    let accounts = MemoryAccountStore::new();
    let app = TestApp::with_store(test_config(None), accounts.clone(), Arc::new(accounts)).await;
    let id = app.create_account("nosecret@example.com");
    let issuer = CredentialCodec::new(&AuthConfig {
        credential_secret: Some("somebody-else".into()),
        credential_ttl_days: 7,
    });
    let token = issuer.issue(id).unwrap().token;

    let response = app
        .request("GET", "/api/auth/verify", None, Some(&token))
        .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.error_code(), "CONFIGURATION_ERROR");
}

#[tokio::test]
async fn test_optional_auth_never_rejects() {
    let app = TestApp::new().await;
    let owner = app.create_account("owner@example.com");
    let path = format!("/api/presence/{owner}");

    let anonymous = app.request("GET", &path, None, None).await;
    assert_eq!(anonymous.status, StatusCode::OK);
    assert_eq!(anonymous.data()["isSelf"], false);

    let garbage = app
        .request("GET", &path, None, Some("not.a.credential"))
        .await;
    assert_eq!(garbage.status, StatusCode::OK);
    assert_eq!(garbage.data()["isSelf"], false);

    let own = app
        .request("GET", &path, None, Some(&app.token_for(owner)))
        .await;
    assert_eq!(own.status, StatusCode::OK);
    assert_eq!(own.data()["isSelf"], true);

    app.accounts.set_banned(owner, true);
    let banned = app
        .request("GET", &path, None, Some(&app.token_for(owner)))
        .await;
    assert_eq!(banned.status, StatusCode::OK);
    assert_eq!(banned.data()["isSelf"], false);
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new().await;

    let response = app.request("GET", "/api/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["status"], "ok");
}
