pub mod adapters;
pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod feed;
pub mod geo;
pub mod ports;
pub mod push;
pub mod registry;
pub mod session;
pub mod state;
pub mod subscription;
pub mod types;
pub mod watcher;

pub use push::vapid::{VapidCredentials, generate_vapid_credentials};

use adapters::WebPushSender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("failed to init web-push: {0}")]
    Push(#[from] web_push::WebPushError),
    #[error("invalid auth configuration: {0}")]
    Auth(#[from] auth::AuthError),
    #[error("server i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub async fn serve(config: config::AppConfig) -> Result<(), ServeError> {
    let sender = WebPushSender::new(config.vapid.clone())?;
    let bind = config.bind;
    let state = state::AppState::new(config, sender)?;
    match &state.config.registry_path {
        Some(path) => tracing::info!(path = %path.display(), "endpoint registry on disk"),
        None => tracing::warn!("endpoint registry in memory; registrations are lost on restart"),
    }

    let deliveries = state.deliveries.clone();

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(%bind, "listening");
    axum::serve(listener, app::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    let drained = deliveries.drain().await;
    tracing::info!(count = drained.len(), "pending mayday fan-outs finished");
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
