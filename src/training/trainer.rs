//! End-to-end training run: split, fit, evaluate, persist

use super::config::TrainingConfig;
use super::metrics::{MetricsReport, OutputMetrics};
use super::pipeline::{build_pipeline, RiskPipeline};
use super::split::stratified_split;
use crate::data::{DataLoader, Dataset, RandomOverSampler};
use crate::error::{RiskError, Result};
use crate::export::save_pipeline;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Outcome of a training run
#[derive(Debug, Clone, Serialize)]
pub struct TrainingSummary {
    pub n_rows: usize,
    pub n_train: usize,
    pub n_test: usize,
    /// Training rows after oversampling
    pub n_fit: usize,
    pub stratified_on: String,
    pub metrics: MetricsReport,
    pub duration: Duration,
    pub model_path: PathBuf,
    pub metrics_path: PathBuf,
}

/// Trains and persists a [`RiskPipeline`]
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Load a CSV (or data directory) with `loader`, then [`Trainer::train`]
    pub fn train_from_path(
        &self,
        loader: &DataLoader,
        path: impl AsRef<Path>,
    ) -> Result<(RiskPipeline, TrainingSummary)> {
        let data = loader.load(path)?;
        self.train(&data)
    }

    /// Fit on a stratified training partition, evaluate on the rest, and
    /// write the artifact and metrics report
    pub fn train(&self, data: &Dataset) -> Result<(RiskPipeline, TrainingSummary)> {
        self.config.validate()?;
        let start = Instant::now();
        let schema = data.schema();

        let stratify_on = match &self.config.stratify_on {
            Some(name) => name.clone(),
            None => schema
                .targets
                .first()
                .map(|t| t.name.clone())
                .ok_or_else(|| RiskError::SchemaError("schema has no targets".to_string()))?,
        };
        let labels = data.target(&stratify_on).ok_or_else(|| {
            RiskError::SchemaError(format!("unknown stratification target '{}'", stratify_on))
        })?;

        let split = stratified_split(&labels.to_vec(), self.config.test_size, self.config.seed)?;
        let train = data.select(&split.train);
        let test = data.select(&split.test);
        info!(
            train = train.len(),
            test = test.len(),
            stratified_on = %stratify_on,
            "Split dataset"
        );

        let fit_data = if self.config.oversample {
            RandomOverSampler::new(stratify_on.clone())
                .with_seed(self.config.seed)
                .resample(&train)?
        } else {
            train.clone()
        };

        let mut pipeline = build_pipeline(schema.clone(), self.config.forest.clone())?;
        pipeline.fit(&fit_data)?;

        let mut report = MetricsReport::new();
        let predictions = pipeline.predict_dataset(&test)?;
        for ((name, y_pred), y_true) in predictions.into_iter().zip(test.targets()) {
            let metrics = OutputMetrics::compute(y_true, &y_pred)?;
            info!(
                output = %name,
                f1 = metrics.f1,
                accuracy = metrics.accuracy,
                "Evaluated output"
            );
            let seen = pipeline.classifier().estimator(&name).map_or(0, |f| f.classes().len());
            if metrics.per_class.len() > seen {
                warn!(output = %name, "Test partition contains classes unseen in training");
            }
            report.insert(name, metrics);
        }

        let model_path = self.config.model_path.clone();
        let metrics_path = self.config.resolved_metrics_path();
        save_pipeline(&pipeline, &model_path)?;
        report.save(&metrics_path)?;
        info!(path = %metrics_path.display(), "Wrote metrics report");

        let summary = TrainingSummary {
            n_rows: data.len(),
            n_train: train.len(),
            n_test: test.len(),
            n_fit: fit_data.len(),
            stratified_on: stratify_on,
            metrics: report,
            duration: start.elapsed(),
            model_path,
            metrics_path,
        };
        Ok((pipeline, summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FeatureSchema;
    use crate::training::ForestConfig;
    use ndarray::{Array1, Array2};

    fn synthetic(n: usize) -> Dataset {
        let mut schema = FeatureSchema::brfss();
        schema.categorical.truncate(1);
        let numeric = Array2::from_shape_fn((n, 4), |(i, j)| match j {
            0 => 16.0 + (i % 25) as f64,
            3 => (1 + i % 5) as f64,
            _ => ((i + j) % 2) as f64,
        });
        let categorical = Array2::from_shape_fn((n, 1), |(i, _)| (i % 2).to_string());
        let diabetes = Array1::from_shape_fn(n, |i| (i % 3) as i64);
        let obesity = numeric.column(0).mapv(crate::data::bmi_category);
        Dataset::new(schema, numeric, categorical, vec![diabetes, obesity]).unwrap()
    }

    fn config(dir: &Path) -> TrainingConfig {
        TrainingConfig::default()
            .with_model_path(dir.join("model.bin"))
            .with_forest(ForestConfig::default().with_n_estimators(8))
    }

    #[test]
    fn test_train_writes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let trainer = Trainer::new(config(dir.path()));
        let (pipeline, summary) = trainer.train(&synthetic(120)).unwrap();

        assert!(pipeline.is_fitted());
        assert_eq!(summary.n_test, 24);
        assert_eq!(summary.n_train + summary.n_test, 120);
        assert!(summary.model_path.exists());
        assert_eq!(summary.metrics_path, dir.path().join("model.metrics.json"));
        assert!(summary.metrics.get("Diabetes").is_some());
        assert!(summary.metrics.get("Obesity").is_some());
    }

    #[test]
    fn test_oversampling_only_touches_training_rows() {
        let dir = tempfile::tempdir().unwrap();
        let trainer = Trainer::new(config(dir.path()).with_stratify_on("Obesity").with_oversample(true));
        let (_, summary) = trainer.train(&synthetic(100)).unwrap();
        assert!(summary.n_fit > summary.n_train);
        assert_eq!(summary.metrics.get("Obesity").unwrap().support, summary.n_test);
    }

    #[test]
    fn test_unknown_stratify_target() {
        let dir = tempfile::tempdir().unwrap();
        let trainer = Trainer::new(config(dir.path()).with_stratify_on("Gout"));
        assert!(matches!(trainer.train(&synthetic(30)), Err(RiskError::SchemaError(_))));
    }

    #[test]
    fn test_singleton_class_is_insufficient() {
        let dir = tempfile::tempdir().unwrap();
        let data = synthetic(30);
        let mut diabetes = data.targets()[0].clone();
        diabetes.fill(0);
        diabetes[7] = 2;
        let data = Dataset::new(
            data.schema().clone(),
            data.numeric().clone(),
            data.categorical().clone(),
            vec![diabetes, data.targets()[1].clone()],
        )
        .unwrap();
        let err = Trainer::new(config(dir.path())).train(&data).unwrap_err();
        assert!(matches!(err, RiskError::InsufficientDataError(_)));
    }
}
