//! Configuration management CLI commands.

use clap::{Args, Subcommand};

use gatherly_core::error::AppError;

use crate::output::{self, OutputFormat};

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,
    /// Validate configuration
    Validate,
}

/// Execute config commands
pub fn execute(args: &ConfigArgs, env: &str, format: OutputFormat) -> Result<(), AppError> {
    let mut config = super::load_config(env)?;

    match &args.command {
        ConfigCommand::Show => {
            if config.auth.credential_secret.is_some() {
                config.auth.credential_secret = Some("********".to_string());
            }
            config.database.url = config.database.masked_url();
            output::print_item(&config, format);
        }
        ConfigCommand::Validate => {
            output::print_success(&format!("Configuration for '{env}' loaded"));
            println!("  Server:    {}", config.server.bind_address());
            println!("  Store:     {:?}", config.database.provider);
            println!("  API URL:   {}", config.presence.server_url);
            println!("  Heartbeat: {}s", config.presence.heartbeat_interval_seconds);
            if config.auth.secret().is_none() {
                output::print_warning("auth.credential_secret is not set; the server will refuse to start");
            }
        }
    }

    Ok(())
}
