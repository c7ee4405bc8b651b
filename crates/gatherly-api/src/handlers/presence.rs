//! Presence write and lookup handlers.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use tracing::debug;
use uuid::Uuid;

use gatherly_core::error::AppError;
use gatherly_entity::presence::{PresenceUpdate, PresenceView};

use crate::dto::ApiResponse;
use crate::dto::request::parse_json_body;
use crate::error::ApiError;
use crate::extractors::{AuthUser, MaybeAuthUser};
use crate::state::AppState;

/// PUT|POST /api/presence
///
/// Accepts the update and writes it in the background. The write is stamped
/// on arrival, so the store keeps the most recently received update even if
/// an earlier write finishes later.
pub async fn update_presence(
    State(state): State<AppState>,
    auth: AuthUser,
    body: Bytes,
) -> Result<Json<ApiResponse<PresenceUpdate>>, ApiError> {
    let update: PresenceUpdate = parse_json_body(&body)?;

    if update.account_id != auth.id {
        return Err(AppError::authorization("Cannot update presence of another account").into());
    }

    debug!(account_id = %update.account_id, status = %update.status, "Presence update accepted");
    state.activity.record_presence(update.account_id, update.status);

    Ok(Json(ApiResponse::ok(update)))
}

/// GET /api/presence/{account_id}
pub async fn get_presence(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
    viewer: MaybeAuthUser,
) -> Result<Json<ApiResponse<PresenceView>>, ApiError> {
    let account = state
        .store
        .find_by_id(account_id)
        .await?
        .ok_or_else(|| AppError::not_found("Account not found"))?;

    Ok(Json(ApiResponse::ok(PresenceView {
        account_id: account.id,
        status: account.presence_status,
        updated_at: account.presence_updated_at,
        last_active_at: account.last_active_at,
        is_self: viewer.is(account_id),
    })))
}
