use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod browser;
mod capture;
mod config;
mod domain;
mod errors;
mod escape;
mod handlers;
mod models;
mod routes;
mod synthesizer;
mod template;
#[cfg(test)]
mod testing;

use crate::browser::ChromeLauncher;
use crate::capture::CaptureOrchestrator;
use crate::config::Config;
use crate::models::ThemeCatalog;
use crate::synthesizer::DocumentSynthesizer;
use crate::template::FileTemplateSource;

/// AppState holds shared resources for the web server.
/// Nothing in it is mutable; each request builds its own document or browser.
pub struct AppState {
    default_scheme: String,
    synthesizer: DocumentSynthesizer,
    capturer: Arc<CaptureOrchestrator>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (logging)
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "holiday_card=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = Config::load().context("Failed to load configuration")?;

    // --- Application State ---
    let synthesizer = DocumentSynthesizer::new(
        ThemeCatalog::default(),
        Arc::new(FileTemplateSource::new(config.template_path.clone())),
    );
    let launcher = ChromeLauncher::new(
        config.chrome_path.clone(),
        config.chrome_sandbox,
        config.browser_idle_timeout(),
    );
    let capturer = CaptureOrchestrator::new(Arc::new(launcher), config.capture.clone());
    tracing::info!(selector = %capturer.settings().selector, "Capture orchestrator ready");

    let state = Arc::new(AppState {
        default_scheme: config.default_scheme.clone(),
        synthesizer,
        capturer: Arc::new(capturer),
    });

    let app = routes::create_router(state);

    // --- Server Startup ---
    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;
    tracing::info!("Server listening on http://{}", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
