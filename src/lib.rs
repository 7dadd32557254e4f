//! Lifestyle Risk - multi-disease risk prediction from patient vitals
//!
//! This crate trains one random forest per disease on tabular patient data
//! and serves predictions from the persisted pipeline:
//! - CSV loading with schema validation and null cleaning
//! - Standard scaling and one-hot encoding of features
//! - Bagged, class-weighted random forests wrapped per target
//! - Stratified evaluation with F1 and accuracy reports
//! - A shared, lazily loaded predictor behind a CLI and a web form
//!
//! # Modules
//!
//! ## Core
//! - [`data`] - Feature schema, CSV loader, datasets and records
//! - [`preprocessing`] - Scaling and encoding
//! - [`training`] - Forests, stratified split, metrics, trainer
//! - [`inference`] - Input validation and prediction
//! - [`export`] - Model artifact serialization
//!
//! ## Services
//! - [`server`] - HTML form and JSON API
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Core modules
pub mod data;
pub mod preprocessing;
pub mod training;
pub mod inference;
pub mod export;

// Services
pub mod server;
pub mod cli;

pub use error::{RiskError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{RiskError, Result};

    // Data
    pub use crate::data::{DataLoader, Dataset, FeatureSchema, FieldValue, PatientRecord};

    // Preprocessing
    pub use crate::preprocessing::{FeaturePreprocessor, OneHotEncoder, StandardScaler};

    // Training
    pub use crate::training::{
        build_pipeline, ClassWeight, ForestConfig, MaxFeatures, MetricsReport, RiskPipeline,
        Trainer, TrainingConfig,
    };

    // Inference
    pub use crate::inference::{DiseasePrediction, PredictionResult, Predictor, PredictorState};

    // Export
    pub use crate::export::{load_pipeline, save_pipeline};
}
