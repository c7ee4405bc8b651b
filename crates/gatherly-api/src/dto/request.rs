//! Request body parsing.

use serde::de::DeserializeOwned;

use gatherly_core::error::AppError;

/// Parses a JSON body regardless of its declared content type.
///
/// Unload-time beacons arrive as `text/plain` blobs, so the `Json`
/// extractor's content-type check cannot be used for them.
pub fn parse_json_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    if body.is_empty() {
        return Err(AppError::validation("Request body is empty"));
    }
    serde_json::from_slice(body).map_err(|e| AppError::validation(format!("Invalid body: {e}")))
}
