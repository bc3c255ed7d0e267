//! critterchat HTTP server binary.
//!
//! Starts the persona chat relay: loads config, warms up the Ollama model
//! in the background, starts the session reaper and serves the axum router.
//!
//! # Environment Variables
//!
//! - `CRITTERCHAT_CONFIG` - Optional YAML config file
//! - `HOST` / `PORT` - Bind address (default: 0.0.0.0:8000)
//! - `OLLAMA_URL` / `OLLAMA_MODEL` - Generation engine
//! - `RUST_LOG` - Tracing filter (default: "info,critterchat=debug")
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin server
//! ```

use std::sync::Arc;

use anyhow::Context;
use critterchat::chat::Dispatcher;
use critterchat::llms::{GeneratorSlot, OllamaGenerator, TextGenerator};
use critterchat::memory::{Reaper, SessionStore};
use critterchat::server::{app_router, AppState};
use critterchat::utilities::{ChatConfig, ThreadRandom};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,critterchat=debug".into()),
        )
        .init();

    let config = Arc::new(ChatConfig::load().context("Failed to load configuration")?);
    let bind_addr = config.server.bind_addr();

    let slot = GeneratorSlot::new();
    let store = SessionStore::new();

    // Load the model off the startup path; /chat answers 503 until it lands.
    let generator = OllamaGenerator::new(config.engine.clone())?;
    let warm_slot = slot.clone();
    tokio::spawn(async move {
        tracing::info!(model = %generator.model(), "Loading generation model...");
        match generator.warm_up().await {
            Ok(()) => {
                warm_slot.install(Arc::new(generator));
                tracing::info!("Models loaded");
            }
            Err(e) => tracing::error!("Failed to load model: {}", e),
        }
    });

    let reaper = Reaper::new(store.clone(), config.reaper.clone()).spawn();

    let dispatcher = Dispatcher::new(slot, store, Arc::new(ThreadRandom::new()), Arc::clone(&config));
    let app = app_router(AppState::new(dispatcher));

    tracing::info!("critterchat server starting on {}", bind_addr);
    tracing::info!("Endpoints:");
    tracing::info!("  POST   /chat          - cat | goldfish | sloth");
    tracing::info!("  GET    /health        - liveness and readiness");
    tracing::info!("  GET    /sessions      - live session count");
    tracing::info!("  DELETE /sessions/:id  - forget a session");

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server failed")?;

    reaper.shutdown().await;
    tracing::info!("critterchat server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
