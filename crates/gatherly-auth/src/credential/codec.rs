//! Credential issue and verification (HMAC-SHA256 signed JWT).

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use gatherly_core::config::AuthConfig;

use super::claims::Claims;
use crate::error::AuthError;

/// A freshly issued credential, handed to login/registration responses.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Credential {
    /// The signed token presented as `Authorization: Bearer <token>`.
    pub token: String,
    /// Account the credential is bound to.
    pub account_id: Uuid,
    /// Issue time.
    pub issued_at: DateTime<Utc>,
    /// Expiry; the credential is rejected at and after this instant.
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Issues and verifies signed, expiring credentials.
///
/// Pure: no data store is consulted. Without a configured secret every
/// call fails with [`AuthError::Configuration`].
#[derive(Clone)]
pub struct CredentialCodec {
    keys: Option<SigningKeys>,
    ttl: Duration,
    validation: Validation,
}

impl fmt::Debug for CredentialCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialCodec")
            .field("configured", &self.keys.is_some())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl CredentialCodec {
    /// Creates a codec from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let keys = config.secret().map(|secret| SigningKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        });

        // Expiry is checked against an explicit `now` in `verify_at`.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            keys,
            ttl: Duration::days(config.credential_ttl_days),
            validation,
        }
    }

    /// Whether a signing secret is available.
    pub fn is_configured(&self) -> bool {
        self.keys.is_some()
    }

    /// Fails if no signing secret is configured. Call once at startup.
    pub fn ensure_configured(&self) -> Result<(), AuthError> {
        self.keys().map(|_| ())
    }

    /// Credential lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a credential for `account_id`, valid for the configured lifetime.
    pub fn issue(&self, account_id: Uuid) -> Result<Credential, AuthError> {
        self.issue_at(account_id, Utc::now())
    }

    /// Issues a credential as if the current time were `now`.
    pub fn issue_at(&self, account_id: Uuid, now: DateTime<Utc>) -> Result<Credential, AuthError> {
        let keys = self.keys()?;
        let expires = now + self.ttl;

        let claims = Claims {
            sub: account_id,
            iat: now.timestamp(),
            exp: expires.timestamp(),
            jti: Uuid::new_v4(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(|e| AuthError::Configuration(format!("Failed to sign credential: {e}")))?;

        Ok(Credential {
            token,
            account_id,
            issued_at: claims.issued_at().unwrap_or(now),
            expires_at: claims.expires_at().unwrap_or(expires),
        })
    }

    /// Verifies a credential and returns the account it is bound to.
    pub fn verify(&self, token: &str) -> Result<Uuid, AuthError> {
        self.verify_at(token, Utc::now())
    }

    /// Verifies a credential as if the current time were `now`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Uuid, AuthError> {
        self.decode_at(token, now).map(|claims| claims.account_id())
    }

    /// Verifies signature and expiry and returns the full claims.
    pub fn decode_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        let keys = self.keys()?;

        let data = decode::<Claims>(token, &keys.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                JwtErrorKind::InvalidSignature => {
                    AuthError::InvalidCredential("Invalid credential signature".into())
                }
                JwtErrorKind::InvalidToken
                | JwtErrorKind::Base64(_)
                | JwtErrorKind::Json(_)
                | JwtErrorKind::Utf8(_) => AuthError::InvalidCredential("Malformed credential".into()),
                _ => AuthError::InvalidCredential(format!("Credential validation failed: {e}")),
            }
        })?;

        if data.claims.is_expired_at(now) {
            return Err(AuthError::InvalidCredential("Credential has expired".into()));
        }

        Ok(data.claims)
    }

    fn keys(&self) -> Result<&SigningKeys, AuthError> {
        self.keys
            .as_ref()
            .ok_or_else(|| AuthError::Configuration("credential_secret is not set".into()))
    }
}
