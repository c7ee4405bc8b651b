//! Credential verification handler.

use axum::Json;

use gatherly_entity::account::Identity;

use crate::dto::ApiResponse;
use crate::extractors::AuthUser;

/// GET /api/auth/verify
///
/// Returns the identity resolved by the session middleware. Clients call
/// this before starting presence tracking.
pub async fn verify(auth: AuthUser) -> Json<ApiResponse<Identity>> {
    Json(ApiResponse::ok(auth.0))
}
