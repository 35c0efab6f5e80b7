//! AbdullahHub Server, a plugin marketplace.
//!
//! Main entry point that wires all crates together and starts the server.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use abdullahhub_core::config::AppConfig;
use abdullahhub_core::error::AppError;
use abdullahhub_mail::Mailer;
use abdullahhub_plugin::{PluginLoader, PluginRegistry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Load configuration from `ABDULLAHHUB_CONFIG`, or from `config/` for
/// the environment named by `ABDULLAHHUB_ENV`.
fn load_configuration() -> Result<AppConfig, AppError> {
    match std::env::var("ABDULLAHHUB_CONFIG") {
        Ok(path) => AppConfig::load_file(&path),
        Err(_) => {
            let env =
                std::env::var("ABDULLAHHUB_ENV").unwrap_or_else(|_| "development".to_string());
            AppConfig::load(&env)
        }
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let mut layers: Vec<BoxedLayer> = Vec::new();
    layers.push(match config.logging.format.as_str() {
        "json" => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .boxed(),
        _ => fmt::layer().pretty().with_target(true).boxed(),
    });

    let mut file_error = None;
    if !config.logging.file.is_empty() {
        match open_log_file(&config.logging.file) {
            Ok(file) => layers.push(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .boxed(),
            ),
            Err(e) => file_error = Some(e),
        }
    }

    tracing_subscriber::registry().with(layers).with(filter).init();

    if let Some(e) = file_error {
        tracing::warn!(path = %config.logging.file, error = %e, "Log file unavailable; logging to stdout only");
    }
}

fn open_log_file(path: &str) -> std::io::Result<std::fs::File> {
    if let Some(parent) = Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting AbdullahHub v{}", env!("CARGO_PKG_VERSION"));

    if config.features.payments {
        return Err(AppError::configuration(
            "features.payments is not supported by this build",
        ));
    }
    if config.auth.uses_placeholder_secret() {
        tracing::warn!("SECRET_KEY is the development placeholder; set it before deploying");
    }

    // ── Step 1: Create data directories ──────────────────────────
    create_data_directories(&config).await?;

    // ── Step 2: Database connection + migrations ─────────────────
    let db = abdullahhub_database::DatabasePool::connect(&config.database).await?;
    abdullahhub_database::migration::run_migrations(db.pool()).await?;

    // ── Step 3: Mail ─────────────────────────────────────────────
    let mailer = if config.features.email_notifications {
        Mailer::from_config(&config.mail)?
    } else {
        tracing::info!("Email notifications disabled");
        Mailer::disabled()
    };

    // ── Step 4: Plugin runtime ───────────────────────────────────
    let loader = PluginLoader::new(
        &config.plugins.directory,
        Arc::new(PluginRegistry::new()),
        config.plugins.max_output_bytes,
    )
    .with_builtin(
        plugin_removebg::SLUG,
        plugin_removebg::factory(config.integrations.removebg.clone()),
    );

    if config.plugins.auto_load {
        let count = loader.load_all().await?;
        tracing::info!(count, directory = %config.plugins.directory, "Plugins loaded");
    } else {
        tracing::info!("Plugin auto-load disabled; plugins load on first install");
    }

    // ── Step 5: Services and catalog sync ────────────────────────
    let state = abdullahhub_api::build_state(config, db.pool().clone(), loader, mailer)?;

    match state.catalog_service.sync().await {
        Ok(created) if !created.is_empty() => {
            tracing::info!(plugins = ?created, "Registered plugins found on disk");
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "Catalog sync failed"),
    }

    // ── Step 6: HTTP server ──────────────────────────────────────
    abdullahhub_api::run_server(state, shutdown_signal()).await?;

    db.close().await;
    tracing::info!("AbdullahHub server shut down gracefully");
    Ok(())
}

/// Create required data directories
async fn create_data_directories(config: &AppConfig) -> Result<(), AppError> {
    let mut dirs = vec![
        config.plugins.directory.clone(),
        config.plugins.temp_directory.clone(),
    ];
    if let Some(parent) = Path::new(&config.plugins.execution_log).parent() {
        dirs.push(parent.to_string_lossy().to_string());
    }

    for dir in dirs.iter().filter(|d| !d.is_empty()) {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| AppError::internal(format!("Failed to create dir '{dir}': {e}")))?;
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
