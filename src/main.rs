use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::signal;

use vendcrm_activity_relay::config::Settings;
use vendcrm_activity_relay::postgres::PostgresPool;
use vendcrm_activity_relay::server::{create_app, AppState};
use vendcrm_activity_relay::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new().context("Failed to load configuration")?;

    // Initialize tracing (keep the guard alive until exit)
    let _telemetry = init_telemetry(&settings.telemetry, &settings.otel)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Configuration loaded");

    // Connect to PostgreSQL when it backs the store
    let postgres_pool = if settings.store.backend.eq_ignore_ascii_case("postgres") {
        let pool = PostgresPool::new(&settings.database)
            .await
            .context("Failed to connect to PostgreSQL")?;
        if settings.database.apply_schema {
            pool.apply_schema()
                .await
                .context("Failed to apply activities schema")?;
        }
        Some(pool)
    } else {
        None
    };

    // Create application state
    let state = AppState::new(settings.clone(), postgres_pool.as_ref());
    tracing::info!(store = state.store.backend_name(), "Application state initialized");

    // Start the polling monitor
    state.relay.start().await;

    // Create Axum app
    let relay = state.relay.clone();
    let connections = state.connections.clone();
    let app = create_app(state);

    // Start server
    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_signal().await;
        // Stop polling first, then close every feed socket. Upgrades that finish
        // after this point are refused by the closed registry.
        tracing::info!("Stopping activity relay...");
        relay.stop().await;
        connections.close();
    })
    .await?;

    if let Some(pool) = postgres_pool {
        pool.close().await;
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
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
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
