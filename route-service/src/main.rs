use route_service::{
    build_router,
    config::GatewayConfig,
    services::{
        metrics::init_metrics, CacheInvalidationNotifier, Database, NoopNotifier, RedisNotifier,
    },
    utils::password::Password,
    AppState,
};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use service_core::observability::init_tracing;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = GatewayConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );
    init_metrics();

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        audit_mode = ?config.audit_mode,
        "Starting route service"
    );

    let db = Database::new(
        config.database.url.expose_secret(),
        config.database.max_connections,
        config.database.min_connections,
    )
    .await?;
    db.run_migrations().await?;

    let notifier: Arc<dyn CacheInvalidationNotifier> = match &config.redis {
        Some(redis) => Arc::new(RedisNotifier::new(redis).await?),
        None => {
            tracing::warn!("REDIS_URL not set, cache invalidation notifications are disabled");
            Arc::new(NoopNotifier)
        }
    };

    let state = AppState::new(config.clone(), Arc::new(db), notifier)?;

    if let Some(admin) = &config.bootstrap_admin {
        state
            .users
            .ensure_bootstrap_admin(
                &admin.username,
                Password::new(admin.password.expose_secret().clone()),
            )
            .await
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Bootstrap admin failed: {}", e)))?;
    }

    let app = build_router(state);

    let addr = config.common.bind_addr();
    let service_span = tracing::info_span!(
        "service",
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
    );
    let _guard = service_span.enter();

    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
