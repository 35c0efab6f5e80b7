//! Application builder: wires repositories, services, and the router.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use sqlx::PgPool;
use tokio::sync::oneshot;

use abdullahhub_auth::crypto::ApiKeyHasher;
use abdullahhub_auth::{CredentialCipher, JwtDecoder};
use abdullahhub_core::config::AppConfig;
use abdullahhub_core::error::{AppError, ErrorKind};
use abdullahhub_database::repositories::{
    ApiKeyRepository, InstallationRepository, PluginRepository, UserRepository,
};
use abdullahhub_mail::Mailer;
use abdullahhub_plugin::{AnalyzerLimits, ExecutionLog, PluginAnalyzer, PluginExecutor, PluginLoader};
use abdullahhub_service::{
    AdminService, ApiKeyService, CatalogService, DashboardService, ExecutionService,
    InstallationService, MarketplaceService,
};

use crate::middleware::rate_limit::RateLimits;
use crate::router::build_router;
use crate::state::AppState;

/// How often idle rate limit buckets are dropped.
const RATE_LIMIT_PRUNE_INTERVAL: Duration = Duration::from_secs(600);

/// Construct every repository and service over `db_pool`.
///
/// The loader is passed in so the caller decides which builtin plugins
/// exist.
pub fn build_state(
    config: AppConfig,
    db_pool: PgPool,
    plugin_loader: PluginLoader,
    mailer: Mailer,
) -> Result<AppState, AppError> {
    // ── Repositories ─────────────────────────────────────────────
    let user_repo = Arc::new(UserRepository::new(db_pool.clone()));
    let plugin_repo = Arc::new(PluginRepository::new(db_pool.clone()));
    let installation_repo = Arc::new(InstallationRepository::new(db_pool.clone()));
    let api_key_repo = Arc::new(ApiKeyRepository::new(db_pool.clone()));

    // ── Auth & crypto ────────────────────────────────────────────
    let jwt_decoder = Arc::new(JwtDecoder::new(&config.auth));
    let cipher = Arc::new(CredentialCipher::from_secret(&config.auth.secret_key)?);
    let key_hasher = Arc::new(ApiKeyHasher::new(config.auth.effective_hash_secret())?);

    // ── Plugin runtime ───────────────────────────────────────────
    let execution_log = Arc::new(ExecutionLog::new(&config.plugins.execution_log));
    let executor = PluginExecutor::new(
        Arc::clone(plugin_loader.registry()),
        &config.plugins.temp_directory,
        Duration::from_secs(config.plugins.execution_timeout_seconds),
        execution_log,
    );
    let analyzer = Arc::new(PluginAnalyzer::new(AnalyzerLimits::from_config(
        &config.plugins,
    ))?);

    // ── Services ─────────────────────────────────────────────────
    let marketplace_service = Arc::new(MarketplaceService::new(
        Arc::clone(&plugin_repo),
        Arc::clone(&installation_repo),
    ));
    let installation_service = Arc::new(InstallationService::new(
        Arc::clone(&plugin_repo),
        Arc::clone(&installation_repo),
        Arc::clone(&user_repo),
        plugin_loader.clone(),
        mailer.clone(),
    ));
    let execution_service = Arc::new(ExecutionService::new(
        Arc::clone(&plugin_repo),
        Arc::clone(&installation_repo),
        Arc::clone(&api_key_repo),
        plugin_loader.clone(),
        executor,
        Arc::clone(&cipher),
        Arc::clone(&key_hasher),
    ));
    let catalog_service = Arc::new(CatalogService::new(
        Arc::clone(&plugin_repo),
        Arc::clone(&user_repo),
        plugin_loader.clone(),
        analyzer,
        mailer,
        config.features.auto_approve_plugins,
    ));
    let api_key_service = Arc::new(ApiKeyService::new(
        Arc::clone(&api_key_repo),
        Arc::clone(&plugin_repo),
        cipher,
        key_hasher,
    ));
    let dashboard_service = Arc::new(DashboardService::new(
        Arc::clone(&user_repo),
        Arc::clone(&plugin_repo),
        Arc::clone(&installation_repo),
        api_key_repo,
    ));
    let admin_service = Arc::new(AdminService::new(
        Arc::clone(&user_repo),
        plugin_repo,
        installation_repo,
        plugin_loader.clone(),
        &config.logging.file,
        config.logging.tail_lines,
    ));

    let rate_limits = RateLimits::from_config(&config.rate_limit);

    Ok(AppState {
        config: Arc::new(config),
        db_pool,
        plugin_loader,
        rate_limits,
        jwt_decoder,
        user_repo,
        marketplace_service,
        installation_service,
        execution_service,
        catalog_service,
        api_key_service,
        dashboard_service,
        admin_service,
    })
}

/// Builds the complete Axum application.
pub fn build_app(state: AppState) -> Router {
    build_router(state)
}

/// Serve `state` until `shutdown` resolves, then give in-flight requests
/// `server.shutdown_grace_seconds` to finish.
pub async fn run_server<F>(state: AppState, shutdown: F) -> Result<(), AppError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let grace = Duration::from_secs(state.config.server.shutdown_grace_seconds);

    let limits = state.rate_limits.clone();
    let pruner = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(RATE_LIMIT_PRUNE_INTERVAL);
        loop {
            ticker.tick().await;
            limits.prune();
        }
    });

    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        AppError::with_source(ErrorKind::Configuration, format!("Failed to bind {addr}"), e)
    })?;

    tracing::info!(addr = %addr, "AbdullahHub server listening");

    let (signalled_tx, signalled_rx) = oneshot::channel::<()>();
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown.await;
        tracing::info!("Shutdown signal received, draining connections");
        let _ = signalled_tx.send(());
    })
    .into_future();

    let deadline = async move {
        match signalled_rx.await {
            Ok(()) => tokio::time::sleep(grace).await,
            Err(_) => std::future::pending::<()>().await,
        }
    };

    let result = tokio::select! {
        served = server => served
            .map_err(|e| AppError::with_source(ErrorKind::Internal, "Server error", e)),
        () = deadline => {
            tracing::warn!(grace_seconds = grace.as_secs(), "Grace period elapsed, closing open connections");
            Ok(())
        }
    };

    pruner.abort();
    result
}
