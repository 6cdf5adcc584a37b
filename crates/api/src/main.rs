//! HTTP server for the book companion assistant.
//!
//! Exposes text and streaming chat backed by the assistant run
//! orchestrator, plus speech-to-text, text-to-speech and audio download.

mod config;
mod error;
mod provision;
mod routes;
mod state;

use std::sync::Arc;

use book_tools::LocalCatalog;
use chat_core::{BookContentStore, CatalogSearch};
use openai_client::OpenAiClient;
use orchestrator::{Orchestrator, OrchestratorConfig, Services};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::ApiConfig;
use crate::provision::Provisioned;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ApiConfig::from_env()?;
    let client = Arc::new(OpenAiClient::from_env()?);
    let mut orchestrator_config = OrchestratorConfig::from_env();

    let mut provisioned = if config.provision_assistants {
        Provisioned::ensure(&client, &mut orchestrator_config, config.catalog_path.as_deref()).await?
    } else {
        Provisioned::default()
    };

    let result = serve(&config, orchestrator_config, client.clone()).await;

    if !provisioned.is_empty() {
        info!("Removing provisioned assistants");
        provisioned.teardown(&client).await;
    }
    result
}

async fn serve(
    config: &ApiConfig,
    orchestrator_config: OrchestratorConfig,
    client: Arc<OpenAiClient>,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = load_catalog(config).await?;
    let services = Services {
        conversation: client.clone(),
        moderation: client.clone(),
        generator: client.clone(),
        synthesizer: client.clone(),
    };

    let orchestrator = Arc::new(Orchestrator::with_book_tools(
        orchestrator_config,
        services,
        catalog.clone().map(|c| c as Arc<dyn CatalogSearch>),
        catalog.map(|c| c as Arc<dyn BookContentStore>),
        config.tool_policy(),
    )?);
    let cleanup = orchestrator.spawn_background_tasks();

    let state = AppState::new(orchestrator.clone(), client);
    let app = routes::router()
        .with_state(state)
        .layer(routes::cors(config.cors_origins.as_deref()));

    info!(addr = %config.addr, "Book companion API listening");
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    orchestrator.shutdown().await;
    let _ = cleanup.await;
    info!("Server stopped");
    Ok(())
}

/// Catalog and content store, when either a catalog file or a content
/// directory is configured.
async fn load_catalog(config: &ApiConfig) -> Result<Option<Arc<LocalCatalog>>, Box<dyn std::error::Error>> {
    let catalog = match (&config.catalog_path, &config.book_content_dir) {
        (None, None) => {
            warn!("Neither CATALOG_PATH nor BOOK_CONTENT_DIR set; book search and content are unavailable");
            return Ok(None);
        }
        (Some(path), _) => LocalCatalog::load(path).await?,
        (None, Some(_)) => LocalCatalog::default(),
    };

    let catalog = match &config.book_content_dir {
        Some(dir) => catalog.with_content_dir(dir),
        None => catalog,
    };
    Ok(Some(Arc::new(catalog)))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
