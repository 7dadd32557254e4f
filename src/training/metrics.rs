//! Classification metrics and the persisted metrics report

use crate::error::{RiskError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Precision, recall and F1 of one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassReport {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Evaluation of one output on held-out rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputMetrics {
    /// Support-weighted F1
    pub f1: f64,
    pub accuracy: f64,
    pub f1_macro: f64,
    pub support: usize,
    pub per_class: BTreeMap<i64, ClassReport>,
}

impl OutputMetrics {
    /// Compute metrics over the classes present in either vector.
    ///
    /// Undefined ratios (no predicted or no true rows of a class) are 0.
    pub fn compute(y_true: &Array1<i64>, y_pred: &Array1<i64>) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(RiskError::ShapeError {
                expected: format!("{} predictions", y_true.len()),
                actual: format!("{} predictions", y_pred.len()),
            });
        }
        let n = y_true.len();
        if n == 0 {
            return Err(RiskError::InsufficientDataError(
                "cannot evaluate on zero rows".to_string(),
            ));
        }

        let labels: BTreeSet<i64> = y_true.iter().chain(y_pred.iter()).copied().collect();
        let mut per_class = BTreeMap::new();
        let mut correct = 0usize;
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            if t == p {
                correct += 1;
            }
        }

        for &label in &labels {
            let mut tp = 0usize;
            let mut fp = 0usize;
            let mut fn_ = 0usize;
            for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
                match (t == label, p == label) {
                    (true, true) => tp += 1,
                    (false, true) => fp += 1,
                    (true, false) => fn_ += 1,
                    (false, false) => {}
                }
            }
            let precision = ratio(tp, tp + fp);
            let recall = ratio(tp, tp + fn_);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            per_class.insert(label, ClassReport { precision, recall, f1, support: tp + fn_ });
        }

        let f1 = per_class
            .values()
            .map(|r| r.f1 * r.support as f64)
            .sum::<f64>()
            / n as f64;
        let f1_macro = per_class.values().map(|r| r.f1).sum::<f64>() / per_class.len() as f64;

        Ok(Self {
            f1,
            accuracy: correct as f64 / n as f64,
            f1_macro,
            support: n,
            per_class,
        })
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Disease name to held-out metrics, as written next to the model artifact
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricsReport {
    pub outputs: BTreeMap<String, OutputMetrics>,
}

impl MetricsReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, output: impl Into<String>, metrics: OutputMetrics) {
        self.outputs.insert(output.into(), metrics);
    }

    pub fn get(&self, output: &str) -> Option<&OutputMetrics> {
        self.outputs.get(output)
    }

    /// Write pretty JSON, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}
