//! Web layer
//!
//! A small axum server in front of a [`Predictor`](crate::inference::Predictor):
//! an HTML form at `/`, form submission at `/predict`, and a JSON API under `/api`.

mod api;
mod error;
mod handlers;
pub mod pages;
mod state;

pub use api::create_router;
pub use error::{HtmlError, ServerError};
pub use state::AppState;

use crate::data::FeatureSchema;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    /// Schema used to render the form while no model is loaded
    pub schema: FeatureSchema,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("RISK_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("RISK_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            model_path: std::env::var("RISK_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("models/risk_model.bin")),
            schema: FeatureSchema::default(),
        }
    }
}

impl ServerConfig {
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = path.into();
        self
    }

    pub fn with_schema(mut self, schema: FeatureSchema) -> Self {
        self.schema = schema;
        self
    }
}

/// Start the server with the given configuration
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();
    let state = Arc::new(AppState::new(config.clone()));

    // load eagerly so a missing artifact shows up in the startup log
    match state.predictor.pipeline() {
        Ok(_) => info!(model = %config.model_path.display(), "Model ready"),
        Err(e) => warn!(
            model = %config.model_path.display(),
            error = %e,
            "Model not loaded; predictions will fail until it is available"
        ),
    }

    let app = create_router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        address = %addr,
        started_at = %start_time.to_rfc3339(),
        pid = std::process::id(),
        "Server listening"
    );
    info!(url = %format!("http://{}", addr), "Web form available");

    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install ctrl+c handler");
            std::future::pending::<()>().await;
        }
        let uptime = chrono::Utc::now().signed_duration_since(start_time);
        info!(uptime_secs = uptime.num_seconds(), "Shutdown signal received, stopping server");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}
