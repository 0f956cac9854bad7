use super::{build_router, AppState};
use crate::config::ServerConfig;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

/// HTTP server for the web chat client
pub struct HttpServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl HttpServer {
    pub fn new(config: ServerConfig, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    /// Serve until Ctrl-C
    pub async fn run(&self) -> Result<()> {
        let app = build_router(self.state.clone());
        let addr = self.config.bind_addr();

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        info!(model = self.state.assistant.model(), "HTTP server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                info!("HTTP server shutting down");
            })
            .await?;

        Ok(())
    }
}
