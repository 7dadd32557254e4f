//! Lazily-loaded predictor over a persisted pipeline
//!
//! The artifact is read on first use and shared behind an `Arc` for the
//! rest of the process. A failed load leaves the predictor unloaded so a
//! later call retries.

use crate::data::{FeatureSchema, PatientRecord};
use crate::error::{RiskError, Result};
use crate::export::load_pipeline;
use crate::training::{argmax, RiskPipeline};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Instant;
use tracing::{debug, info};

/// Whether the pipeline has been loaded yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictorState {
    Unloaded,
    Loaded,
}

/// Prediction for one disease
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseasePrediction {
    pub disease: String,
    pub class: i64,
    pub label: String,
    /// Badge colour of the predicted level, if the schema defines one
    pub color: Option<String>,
    /// Probability of the predicted class
    pub probability: f64,
    /// Probability of every class seen in training
    pub probabilities: BTreeMap<i64, f64>,
}

/// Per-disease predictions for one record, in schema target order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub predictions: Vec<DiseasePrediction>,
}

impl PredictionResult {
    pub fn get(&self, disease: &str) -> Option<&DiseasePrediction> {
        self.predictions.iter().find(|p| p.disease == disease)
    }
}

/// Validated single-row feature blocks ready for the pipeline
#[derive(Debug, Clone)]
pub struct ValidatedRecord {
    pub numeric: Array2<f64>,
    pub categorical: Array2<String>,
}

/// Check a record against the schema without filling in anything.
///
/// Every problem is reported in one [`RiskError::InputValidationError`].
/// Fields the schema does not name are ignored.
pub fn validate_record(schema: &FeatureSchema, record: &PatientRecord) -> Result<ValidatedRecord> {
    let mut problems = Vec::new();
    let mut numeric = Array2::<f64>::zeros((1, schema.numeric.len()));
    let mut categorical = Array2::<String>::default((1, schema.categorical.len()));

    for (j, feature) in schema.numeric.iter().enumerate() {
        match record.get(&feature.name) {
            None => problems.push(format!("missing field '{}'", feature.name)),
            Some(v) if v.is_blank() => problems.push(format!("missing field '{}'", feature.name)),
            Some(v) => match v.as_number() {
                None => problems.push(format!("field '{}' must be numeric, got '{}'", feature.name, v)),
                Some(x) => match feature.range {
                    Some((lo, hi)) if x < lo || x > hi => problems.push(format!(
                        "field '{}' = {} is outside [{}, {}]",
                        feature.name, x, lo, hi
                    )),
                    _ => numeric[[0, j]] = x,
                },
            },
        }
    }

    for (j, feature) in schema.categorical.iter().enumerate() {
        match record.get(&feature.name) {
            None => problems.push(format!("missing field '{}'", feature.name)),
            Some(v) if v.is_blank() => problems.push(format!("missing field '{}'", feature.name)),
            Some(v) => {
                let value = v.as_category();
                match &feature.allowed {
                    Some(allowed) if !allowed.contains(&value) => problems.push(format!(
                        "field '{}' = '{}' is not one of [{}]",
                        feature.name,
                        value,
                        allowed.join(", ")
                    )),
                    _ => categorical[[0, j]] = value,
                }
            }
        }
    }

    if problems.is_empty() {
        Ok(ValidatedRecord { numeric, categorical })
    } else {
        Err(RiskError::InputValidationError(problems.join("; ")))
    }
}

/// Serves predictions from a pipeline artifact loaded at most once
#[derive(Debug)]
pub struct Predictor {
    model_path: PathBuf,
    pipeline: OnceLock<Arc<RiskPipeline>>,
    /// Held only while the artifact is being read, so concurrent first
    /// requests decode it once
    load_lock: Mutex<()>,
}

impl Predictor {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            pipeline: OnceLock::new(),
            load_lock: Mutex::new(()),
        }
    }

    /// Predictor over an already fitted pipeline; starts `Loaded`
    pub fn from_pipeline(pipeline: RiskPipeline) -> Result<Self> {
        if !pipeline.is_fitted() {
            return Err(RiskError::ModelNotFitted);
        }
        let cell = OnceLock::new();
        let _ = cell.set(Arc::new(pipeline));
        Ok(Self { model_path: PathBuf::new(), pipeline: cell, load_lock: Mutex::new(()) })
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn state(&self) -> PredictorState {
        if self.pipeline.get().is_some() {
            PredictorState::Loaded
        } else {
            PredictorState::Unloaded
        }
    }

    /// The shared pipeline, loading it on first call
    pub fn pipeline(&self) -> Result<Arc<RiskPipeline>> {
        if let Some(p) = self.pipeline.get() {
            return Ok(Arc::clone(p));
        }

        // a poisoned lock only means an earlier load panicked
        let _guard = self.load_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(p) = self.pipeline.get() {
            return Ok(Arc::clone(p));
        }

        let start = Instant::now();
        let loaded = Arc::new(load_pipeline(&self.model_path)?);
        let _ = self.pipeline.set(Arc::clone(&loaded));
        info!(
            path = %self.model_path.display(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Model loaded"
        );
        Ok(loaded)
    }

    /// Schema of the loaded model
    pub fn schema(&self) -> Result<FeatureSchema> {
        Ok(self.pipeline()?.schema().clone())
    }

    pub fn predict(&self, record: &PatientRecord) -> Result<PredictionResult> {
        let pipeline = self.pipeline()?;
        let schema = pipeline.schema();
        let input = validate_record(schema, record)?;

        let start = Instant::now();
        let outputs = pipeline.predict_proba(input.numeric.view(), input.categorical.view())?;
        let mut predictions = Vec::with_capacity(outputs.len());
        for out in outputs {
            let row = out.proba.row(0);
            let best = argmax(row);
            let class = out.classes[best];
            let target = schema.target(&out.output);
            predictions.push(DiseasePrediction {
                label: target
                    .map(|t| t.label_for(class))
                    .unwrap_or_else(|| class.to_string()),
                color: target
                    .and_then(|t| t.levels.get(&class))
                    .map(|l| l.color.clone()),
                class,
                probability: row[best],
                probabilities: out.classes.iter().copied().zip(row.iter().copied()).collect(),
                disease: out.output,
            });
        }
        debug!(elapsed_us = start.elapsed().as_micros() as u64, "Predicted record");
        Ok(PredictionResult { predictions })
    }
}
