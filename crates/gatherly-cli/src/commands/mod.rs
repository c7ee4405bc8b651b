//! CLI command definitions and dispatch.

pub mod config;
pub mod presence;
pub mod session;

use std::path::Path;

use clap::{Parser, Subcommand};

use gatherly_core::config::AppConfig;
use gatherly_core::error::AppError;
use gatherly_presence::SharedStorage;

use crate::output::OutputFormat;

/// Gatherly — sessions and presence from the terminal
#[derive(Debug, Parser)]
#[command(name = "gatherly", version, about, long_about = None)]
pub struct Cli {
    /// Configuration environment (overlays config/<env>.toml)
    #[arg(short, long, default_value = "development")]
    pub env: String,

    /// Profile storage file (overrides presence.profile_path)
    #[arg(short, long)]
    pub profile: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Store a credential issued by login or registration
    Login(session::LoginArgs),
    /// Discard the stored credential
    Logout,
    /// Show the identity behind the stored credential
    Verify,
    /// Report presence for a tab driven by stdin
    Presence(presence::PresenceArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Config(args) => config::execute(args, &self.env, self.format),
            command => {
                let config = load_config(&self.env)?;
                let profile = self
                    .profile
                    .clone()
                    .unwrap_or_else(|| config.presence.profile_path.clone());
                let storage = SharedStorage::open(&profile)?;
                match command {
                    Commands::Login(args) => session::login(args, &config, &storage),
                    Commands::Logout => session::logout(&config, &storage),
                    Commands::Verify => session::verify(&config, &storage, self.format).await,
                    Commands::Presence(args) => {
                        presence::execute(args, &config, &storage, Path::new(&profile)).await
                    }
                    Commands::Config(_) => Ok(()),
                }
            }
        }
    }
}

/// Helper: load configuration for an environment
pub fn load_config(env: &str) -> Result<AppConfig, AppError> {
    AppConfig::load(env)
}
