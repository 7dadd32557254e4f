//! Patient data handling
//!
//! - [`FeatureSchema`] - which columns are features and how targets are labelled
//! - [`DataLoader`] - CSV loading, schema validation and null cleaning
//! - [`Dataset`] - typed, column-wise view of the cleaned records
//! - [`PatientRecord`] - a single observation submitted for inference
//! - [`RandomOverSampler`] - seeded minority-class oversampling

mod loader;
mod record;
pub mod sampling;
pub mod schema;

pub use loader::DataLoader;
pub use record::{FieldValue, PatientRecord};
pub use sampling::RandomOverSampler;
pub use schema::{
    bmi_category, canonical_category, CategoricalFeature, FeatureSchema, NumericFeature,
    RiskLevel, TargetSource, TargetSpec,
};

use crate::error::{RiskError, Result};
use ndarray::{Array1, Array2, Axis};
use std::collections::BTreeMap;

/// Validated patient records sharing one schema.
///
/// Numeric features are stored as an `n × n_numeric` matrix, categorical
/// features as canonical strings, and each target as a vector of class codes.
#[derive(Debug, Clone)]
pub struct Dataset {
    schema: FeatureSchema,
    numeric: Array2<f64>,
    categorical: Array2<String>,
    targets: Vec<Array1<i64>>,
}

impl Dataset {
    /// Assemble a dataset, checking every part agrees on the row count
    pub fn new(
        schema: FeatureSchema,
        numeric: Array2<f64>,
        categorical: Array2<String>,
        targets: Vec<Array1<i64>>,
    ) -> Result<Self> {
        let n = numeric.nrows();
        if numeric.ncols() != schema.numeric.len() {
            return Err(RiskError::ShapeError {
                expected: format!("{} numeric columns", schema.numeric.len()),
                actual: format!("{} numeric columns", numeric.ncols()),
            });
        }
        if categorical.ncols() != schema.categorical.len() || categorical.nrows() != n {
            return Err(RiskError::ShapeError {
                expected: format!("{} x {} categorical values", n, schema.categorical.len()),
                actual: format!("{} x {}", categorical.nrows(), categorical.ncols()),
            });
        }
        if targets.len() != schema.targets.len() || targets.iter().any(|t| t.len() != n) {
            return Err(RiskError::ShapeError {
                expected: format!("{} targets of length {}", schema.targets.len(), n),
                actual: format!(
                    "{} targets of lengths {:?}",
                    targets.len(),
                    targets.iter().map(|t| t.len()).collect::<Vec<_>>()
                ),
            });
        }
        Ok(Self { schema, numeric, categorical, targets })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.numeric.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn numeric(&self) -> &Array2<f64> {
        &self.numeric
    }

    pub fn categorical(&self) -> &Array2<String> {
        &self.categorical
    }

    pub fn targets(&self) -> &[Array1<i64>] {
        &self.targets
    }

    /// Labels of a target by name
    pub fn target(&self, name: &str) -> Option<&Array1<i64>> {
        self.schema
            .targets
            .iter()
            .position(|t| t.name == name)
            .map(|i| &self.targets[i])
    }

    /// Rows at `indices`, in that order; repeated indices duplicate rows
    pub fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            schema: self.schema.clone(),
            numeric: self.numeric.select(Axis(0), indices),
            categorical: self.categorical.select(Axis(0), indices),
            targets: self.targets.iter().map(|t| t.select(Axis(0), indices)).collect(),
        }
    }

    /// Reconstruct the feature fields of row `i` as an inference record
    pub fn record(&self, i: usize) -> Option<PatientRecord> {
        if i >= self.len() {
            return None;
        }
        let mut record = PatientRecord::new();
        for (j, f) in self.schema.numeric.iter().enumerate() {
            record.insert(f.name.clone(), self.numeric[[i, j]]);
        }
        for (j, f) in self.schema.categorical.iter().enumerate() {
            record.insert(f.name.clone(), self.categorical[[i, j]].clone());
        }
        Some(record)
    }

    /// Number of rows per class of a target, ordered by class code
    pub fn class_counts(&self, target: &str) -> Option<BTreeMap<i64, usize>> {
        self.target(target).map(class_counts)
    }
}

/// Count occurrences of each class code
pub fn class_counts(labels: &Array1<i64>) -> BTreeMap<i64, usize> {
    let mut counts = BTreeMap::new();
    for &label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}
