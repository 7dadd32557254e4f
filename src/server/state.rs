//! Application state management

use super::ServerConfig;
use crate::data::FeatureSchema;
use crate::inference::Predictor;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Debug)]
pub struct AppState {
    pub config: ServerConfig,
    pub predictor: Arc<Predictor>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let predictor = Arc::new(Predictor::new(config.model_path.clone()));
        Self::with_predictor(config, predictor)
    }

    /// State over an existing predictor, e.g. one built from an in-memory pipeline
    pub fn with_predictor(config: ServerConfig, predictor: Arc<Predictor>) -> Self {
        Self { config, predictor, started_at: Utc::now() }
    }

    /// Schema of the loaded model, or the configured one if no model loads
    pub fn schema(&self) -> (FeatureSchema, bool) {
        match self.predictor.schema() {
            Ok(schema) => (schema, true),
            Err(_) => (self.config.schema.clone(), false),
        }
    }
}
