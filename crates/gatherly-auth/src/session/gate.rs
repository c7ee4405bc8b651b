//! Combines credential verification and the account gate for one request.

use std::sync::Arc;

use gatherly_entity::account::Identity;

use super::phase::SessionPhase;
use crate::credential::CredentialCodec;
use crate::error::AuthError;
use crate::gate::AccountGate;

/// Resolves the identity behind a bearer credential.
///
/// The signature check and the status read stay two separate steps so
/// either can be exercised on its own.
#[derive(Debug, Clone)]
pub struct SessionGate {
    codec: Arc<CredentialCodec>,
    accounts: AccountGate,
}

impl SessionGate {
    /// Creates a session gate.
    pub fn new(codec: Arc<CredentialCodec>, accounts: AccountGate) -> Self {
        Self { codec, accounts }
    }

    /// The codec this gate verifies with.
    pub fn codec(&self) -> &CredentialCodec {
        &self.codec
    }

    /// Authenticates a request from its bearer token, if any.
    pub async fn authenticate(&self, token: Option<&str>) -> Result<Identity, AuthError> {
        self.authenticate_traced(token).await.0
    }

    /// Like [`authenticate`](Self::authenticate), also returning every phase visited.
    pub async fn authenticate_traced(
        &self,
        token: Option<&str>,
    ) -> (Result<Identity, AuthError>, Vec<SessionPhase>) {
        let mut trace = vec![SessionPhase::NoToken];
        let result = self.run(token, &mut trace).await;
        if let Err(e) = &result {
            advance(&mut trace, SessionPhase::Rejected(e.code()));
        }
        (result, trace)
    }

    async fn run(
        &self,
        token: Option<&str>,
        trace: &mut Vec<SessionPhase>,
    ) -> Result<Identity, AuthError> {
        let token = token
            .filter(|t| !t.trim().is_empty())
            .ok_or(AuthError::NoCredential)?;

        advance(trace, SessionPhase::Verifying);
        let account_id = self.codec.verify(token)?;
        advance(trace, SessionPhase::Verified);

        advance(trace, SessionPhase::Resolving);
        let identity = self.accounts.resolve(account_id).await?;
        advance(trace, SessionPhase::Resolved);

        Ok(identity)
    }
}

fn advance(trace: &mut Vec<SessionPhase>, next: SessionPhase) {
    let next = match trace.last() {
        Some(current) => current.enter(next),
        None => next,
    };
    trace.push(next);
}
