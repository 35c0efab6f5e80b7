//! CLI command definitions and dispatch.

pub mod migrate;
pub mod plugin;
pub mod user;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use abdullahhub_core::config::AppConfig;
use abdullahhub_core::error::AppError;
use abdullahhub_mail::Mailer;
use abdullahhub_plugin::{PluginLoader, PluginRegistry};

use crate::output::OutputFormat;

/// AbdullahHub administration
#[derive(Debug, Parser)]
#[command(name = "abdullahhub-cli", version, about, long_about = None)]
pub struct Cli {
    /// Path to a configuration file. Defaults to `config/` plus `ABDULLAHHUB_ENV`.
    #[arg(short, long)]
    pub config: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// User management
    User(user::UserArgs),
    /// Plugin catalog and directory management
    Plugin(plugin::PluginArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        let config = load_config(self.config.as_deref())?;
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, &config).await,
            Commands::User(args) => user::execute(args, &config, self.format).await,
            Commands::Plugin(args) => plugin::execute(args, &config, self.format).await,
        }
    }
}

/// Load configuration from an explicit file or the `config/` directory.
pub fn load_config(path: Option<&str>) -> Result<AppConfig, AppError> {
    match path {
        Some(path) => AppConfig::load_file(path),
        None => {
            let env =
                std::env::var("ABDULLAHHUB_ENV").unwrap_or_else(|_| "development".to_string());
            AppConfig::load(&env)
        }
    }
}

/// Helper: create database pool from config
pub async fn create_db_pool(config: &AppConfig) -> Result<sqlx::PgPool, AppError> {
    let pool = abdullahhub_database::DatabasePool::connect(&config.database).await?;
    Ok(pool.into_pool())
}

/// Loader over the configured plugin directory with the bundled builtins.
pub fn plugin_loader(config: &AppConfig) -> PluginLoader {
    PluginLoader::new(
        &config.plugins.directory,
        Arc::new(PluginRegistry::new()),
        config.plugins.max_output_bytes,
    )
    .with_builtin(
        plugin_removebg::SLUG,
        plugin_removebg::factory(config.integrations.removebg.clone()),
    )
}

/// Mailer honouring the email feature flag.
pub fn mailer(config: &AppConfig) -> Result<Mailer, AppError> {
    if !config.features.email_notifications {
        return Ok(Mailer::disabled());
    }
    Ok(Mailer::from_config(&config.mail)?)
}
