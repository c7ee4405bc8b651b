//! Credential commands: login, logout, verify.

use clap::Args;

use gatherly_core::config::AppConfig;
use gatherly_core::error::AppError;
use gatherly_presence::{CredentialSlot, HttpTransport, PresenceTransport, SharedStorage, TabId};

use crate::output::{self, OutputFormat};

/// Arguments for `login`
#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Credential returned by the login or registration endpoint
    #[arg(short, long)]
    pub token: String,
}

fn slot(config: &AppConfig, storage: &SharedStorage) -> CredentialSlot {
    CredentialSlot::new(
        storage.clone(),
        config.presence.credential_key.clone(),
        TabId::new(),
    )
}

/// Stores the credential in the profile
pub fn login(args: &LoginArgs, config: &AppConfig, storage: &SharedStorage) -> Result<(), AppError> {
    if args.token.trim().is_empty() {
        return Err(AppError::validation("Credential must not be empty"));
    }
    slot(config, storage).store(&args.token)?;
    output::print_success("Credential stored");
    Ok(())
}

/// Discards the stored credential
pub fn logout(config: &AppConfig, storage: &SharedStorage) -> Result<(), AppError> {
    let slot = slot(config, storage);
    if slot.get().is_none() {
        output::print_warning("No credential stored");
        return Ok(());
    }
    slot.discard()?;
    output::print_success("Logged out");
    Ok(())
}

/// Calls the verification endpoint and prints the identity
///
/// A 401 discards the stored credential.
pub async fn verify(
    config: &AppConfig,
    storage: &SharedStorage,
    format: OutputFormat,
) -> Result<(), AppError> {
    let slot = slot(config, storage);
    let transport = HttpTransport::new(config.presence.server_url.clone(), slot.clone())?;

    match transport.verify().await {
        Ok(identity) => {
            output::print_item(&identity, format);
            Ok(())
        }
        Err(e) if e.is_authentication() && slot.get().is_some() => {
            slot.discard()?;
            output::print_warning("Credential rejected and discarded; log in again");
            Err(e)
        }
        Err(e) => Err(e),
    }
}
