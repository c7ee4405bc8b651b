//! Identity extractors populated by the session middleware.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use gatherly_auth::AuthError;
use gatherly_entity::account::Identity;

use crate::error::ApiError;

/// Identity of an authenticated caller. Requires `require_auth` on the route.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

impl AuthUser {
    /// Returns the inner identity.
    pub fn identity(&self) -> &Identity {
        &self.0
    }
}

impl std::ops::Deref for AuthUser {
    type Target = Identity;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ApiError::from(AuthError::NoCredential))
    }
}

/// Identity of the caller if one was resolved by `optional_auth`.
#[derive(Debug, Clone, Default)]
pub struct MaybeAuthUser(pub Option<Identity>);

impl MaybeAuthUser {
    /// Whether the caller is the given account.
    pub fn is(&self, account_id: uuid::Uuid) -> bool {
        self.0.as_ref().is_some_and(|i| i.id == account_id)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for MaybeAuthUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<MaybeAuthUser>() {
            return Ok(user.clone());
        }
        Ok(Self(parts.extensions.get::<AuthUser>().map(|u| u.0.clone())))
    }
}
