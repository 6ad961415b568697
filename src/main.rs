use anyhow::{Context, Result};
use sensorthings::api::{create_router, AppState};
use sensorthings::config::{apply_env_overrides, load_config, AppConfig};
use sensorthings::service::ResourceService;
use sensorthings::store;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sensorthings=info,tower_http=info".into()),
        )
        .init();

    info!("SensorThings service starting...");

    let mut config = match std::env::var("SENSORTHINGS_CONFIG") {
        Ok(path) => {
            info!(path = %path, "Loading configuration file");
            load_config(&path)?
        }
        Err(_) => AppConfig::default(),
    };
    apply_env_overrides(&mut config);

    info!(
        bind = %config.server.bind,
        path_prefix = %config.server.path_prefix,
        backend = ?config.storage.backend,
        "Configuration loaded"
    );

    let entity_store = store::open(&config.storage).context("Failed to open entity store")?;
    let state = AppState {
        service: ResourceService::new(entity_store),
    };
    let router = create_router(state, &config.server);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    info!(bind = %config.server.bind, "HTTP API listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("SensorThings service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for ctrl_c signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
