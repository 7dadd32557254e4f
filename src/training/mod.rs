//! Model training
//!
//! - [`DecisionTree`] and [`RandomForest`] - weighted CART trees and their bagged ensemble
//! - [`MultiOutputClassifier`] - one forest per disease
//! - [`RiskPipeline`] / [`build_pipeline`] - preprocessing plus classifiers, fitted together
//! - [`stratified_split`] - seeded train/test partition preserving class ratios
//! - [`OutputMetrics`] / [`MetricsReport`] - held-out evaluation
//! - [`Trainer`] - the end-to-end run that writes the artifact and metrics

mod config;
pub mod decision_tree;
pub mod metrics;
mod multi_output;
mod pipeline;
pub mod random_forest;
pub mod split;
mod trainer;

pub use config::{default_metrics_path, ClassWeight, ForestConfig, MaxFeatures, TrainingConfig};
pub use decision_tree::{DecisionTree, TreeNode};
pub use metrics::{ClassReport, MetricsReport, OutputMetrics};
pub use multi_output::MultiOutputClassifier;
pub use pipeline::{build_pipeline, OutputProbabilities, PipelineMetadata, RiskPipeline};
pub use random_forest::{argmax, RandomForest};
pub use split::{stratified_split, SplitIndices};
pub use trainer::{Trainer, TrainingSummary};
