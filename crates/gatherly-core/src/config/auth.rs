//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// Credential signing configuration.
///
/// An unset or empty `credential_secret` leaves the codec unconfigured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret key for credential signing (HMAC-SHA256).
    #[serde(default)]
    pub credential_secret: Option<String>,
    /// Credential lifetime in days.
    #[serde(default = "default_credential_ttl")]
    pub credential_ttl_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            credential_secret: None,
            credential_ttl_days: default_credential_ttl(),
        }
    }
}

impl AuthConfig {
    /// Returns the signing secret if one is configured and non-empty.
    pub fn secret(&self) -> Option<&str> {
        self.credential_secret
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

fn default_credential_ttl() -> i64 {
    7
}
