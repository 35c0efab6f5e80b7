//! Plugin catalog and directory commands.

use std::path::Path;
use std::sync::Arc;

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use abdullahhub_core::config::AppConfig;
use abdullahhub_core::error::AppError;
use abdullahhub_database::repositories::{PluginRepository, UserRepository};
use abdullahhub_entity::plugin::Plugin;
use abdullahhub_plugin::{AnalyzerLimits, LoadedPluginInfo, PluginAnalyzer};
use abdullahhub_service::CatalogService;

use crate::output::{self, OutputFormat};

/// Arguments for plugin commands
#[derive(Debug, Args)]
pub struct PluginArgs {
    /// Plugin subcommand
    #[command(subcommand)]
    pub command: PluginCommand,
}

/// Plugin subcommands
#[derive(Debug, Subcommand)]
pub enum PluginCommand {
    /// List catalog records
    List {
        /// Only plugins awaiting review
        #[arg(long)]
        pending: bool,
    },
    /// Scan the plugin directory and list what loads
    Loaded,
    /// Analyze a package without installing it
    Analyze {
        /// Package file (.json, .py, .js, .zip, .tar.gz)
        file: String,
    },
    /// Register loaded plugins that have no catalog record
    Sync,
}

#[derive(Debug, Serialize, Tabled)]
struct PluginRow {
    id: String,
    slug: String,
    name: String,
    version: String,
    category: String,
    runtime: String,
    approved: String,
    active: String,
    downloads: i64,
    rating: String,
}

impl From<&Plugin> for PluginRow {
    fn from(p: &Plugin) -> Self {
        Self {
            id: p.id.to_string(),
            slug: p.slug.clone(),
            name: p.name.clone(),
            version: p.version.clone(),
            category: p.category.clone(),
            runtime: p.runtime.to_string(),
            approved: output::yes_no(p.is_approved),
            active: output::yes_no(p.is_active),
            downloads: p.download_count,
            rating: format!("{:.1} ({})", p.rating, p.review_count),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
struct LoadedRow {
    slug: String,
    name: String,
    version: String,
    category: String,
    runtime: String,
}

impl From<&LoadedPluginInfo> for LoadedRow {
    fn from(info: &LoadedPluginInfo) -> Self {
        Self {
            slug: info.id.clone(),
            name: info.name.clone(),
            version: info.version.clone(),
            category: info.category.clone(),
            runtime: info.runtime.clone(),
        }
    }
}

/// Execute plugin commands
pub async fn execute(
    args: &PluginArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        PluginCommand::List { pending } => {
            let pool = super::create_db_pool(config).await?;
            let plugins = PluginRepository::new(pool.clone()).list_all(*pending).await?;
            let rows: Vec<PluginRow> = plugins.iter().map(PluginRow::from).collect();
            output::print_list(&rows, format);
            pool.close().await;
        }
        PluginCommand::Loaded => {
            let loader = super::plugin_loader(config);
            let count = loader.load_all().await?;
            let rows: Vec<LoadedRow> = loader.list().await.iter().map(LoadedRow::from).collect();
            output::print_list(&rows, format);
            if format == OutputFormat::Table {
                println!("{count} plugin(s) loaded from {}", loader.directory().display());
            }
        }
        PluginCommand::Analyze { file } => {
            let bytes = tokio::fs::read(file).await?;
            let filename = Path::new(file)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| file.clone());
            let analyzer = PluginAnalyzer::new(AnalyzerLimits::from_config(&config.plugins))?;
            let report = analyzer.analyze(&filename, &bytes)?;

            output::print_item(
                &report,
                &[
                    ("Slug", report.slug.clone()),
                    ("Name", report.manifest.name.clone()),
                    ("Version", report.manifest.version.clone()),
                    ("Size", format!("{} bytes", report.file_size)),
                    ("SHA-256", report.file_hash.clone()),
                    ("Modules", report.modules.join(", ")),
                    ("API keys detected", report.api_keys_detected.join(", ")),
                    ("Files", report.file_paths().join(", ")),
                ],
                format,
            );
            if format == OutputFormat::Table {
                for warning in &report.warnings {
                    output::print_warning(warning);
                }
            }
        }
        PluginCommand::Sync => {
            let pool = super::create_db_pool(config).await?;
            let loader = super::plugin_loader(config);
            loader.load_all().await?;
            let catalog = CatalogService::new(
                Arc::new(PluginRepository::new(pool.clone())),
                Arc::new(UserRepository::new(pool.clone())),
                loader,
                Arc::new(PluginAnalyzer::new(AnalyzerLimits::from_config(
                    &config.plugins,
                ))?),
                super::mailer(config)?,
                config.features.auto_approve_plugins,
            );
            let created = catalog.sync().await?;
            if created.is_empty() {
                output::print_success("Catalog already up to date");
            } else {
                output::print_success(&format!(
                    "Registered {} plugin(s): {}",
                    created.len(),
                    created.join(", ")
                ));
            }
            pool.close().await;
        }
    }

    Ok(())
}
