//! Session middleware: mandatory and optional authentication.
//!
//! Both variants read the bearer credential, verify it, and resolve the
//! account through the [`SessionGate`](gatherly_auth::SessionGate). On
//! success the identity is attached to the request and `lastActiveAt` is
//! stamped in the background. Mandatory auth rejects on any failure;
//! optional auth lets the request through anonymously instead.

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, HeaderMapExt};
use tracing::{debug, warn};

use gatherly_auth::{AuthError, SessionPhase};
use gatherly_entity::account::Identity;

use crate::error::ApiError;
use crate::extractors::{AuthUser, MaybeAuthUser};
use crate::state::AppState;

/// Reads the bearer token from the `Authorization` header.
///
/// A missing header is `Ok(None)`. A header that is present but not a
/// well-formed `Bearer <token>` value is an invalid credential.
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<String>, AuthError> {
    match headers.typed_try_get::<Authorization<Bearer>>() {
        Ok(Some(Authorization(bearer))) => Ok(Some(bearer.token().to_string())),
        Ok(None) => Ok(None),
        Err(_) => Err(AuthError::InvalidCredential(
            "Malformed Authorization header".to_string(),
        )),
    }
}

async fn resolve(state: &AppState, headers: &HeaderMap) -> Result<Identity, AuthError> {
    let token = bearer_token(headers)?;
    let identity = state.sessions.authenticate(token.as_deref()).await?;
    state.activity.stamp_last_active(identity.id);
    Ok(identity)
}

/// Rejects the request unless it carries a valid credential for a usable account.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = resolve(&state, request.headers()).await.map_err(|e| {
        warn!(
            path = %request.uri().path(),
            code = e.code(),
            "Request rejected by session middleware"
        );
        ApiError::from(e)
    })?;

    debug!(account_id = %identity.id, "Request authenticated");
    request.extensions_mut().insert(AuthUser(identity));
    SessionPhase::Resolved.enter(SessionPhase::Handling);
    Ok(next.run(request).await)
}

/// Attaches the identity when the credential resolves; never rejects.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let identity = match resolve(&state, request.headers()).await {
        Ok(identity) => {
            SessionPhase::Resolved.enter(SessionPhase::Handling);
            Some(identity)
        }
        Err(AuthError::NoCredential) => None,
        Err(e) => {
            debug!(code = e.code(), "Continuing anonymously");
            None
        }
    };

    request.extensions_mut().insert(MaybeAuthUser(identity));
    next.run(request).await
}
