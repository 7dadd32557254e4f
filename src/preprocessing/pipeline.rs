//! Column-wise preprocessing: scale numeric columns, one-hot categorical ones

use super::{OneHotEncoder, StandardScaler};
use crate::data::Dataset;
use crate::error::{RiskError, Result};
use ndarray::{concatenate, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

/// Deterministic feature preprocessing feeding the classifiers.
///
/// Output layout is the scaled numeric columns in schema order followed by
/// the one-hot blocks of the categorical columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturePreprocessor {
    numeric_columns: Vec<String>,
    categorical_columns: Vec<String>,
    scaler: StandardScaler,
    encoder: OneHotEncoder,
    is_fitted: bool,
}

impl FeaturePreprocessor {
    pub fn new<N, C>(numeric: &[N], categorical: &[C]) -> Self
    where
        N: AsRef<str>,
        C: AsRef<str>,
    {
        Self {
            numeric_columns: numeric.iter().map(|s| s.as_ref().to_string()).collect(),
            categorical_columns: categorical.iter().map(|s| s.as_ref().to_string()).collect(),
            scaler: StandardScaler::new(),
            encoder: OneHotEncoder::new(),
            is_fitted: false,
        }
    }

    pub fn numeric_columns(&self) -> &[String] {
        &self.numeric_columns
    }

    pub fn categorical_columns(&self) -> &[String] {
        &self.categorical_columns
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    pub fn fit(&mut self, data: &Dataset) -> Result<&mut Self> {
        let schema = data.schema();
        if schema.numeric_names() != self.numeric_columns
            || schema.categorical_names() != self.categorical_columns
        {
            return Err(RiskError::SchemaError(format!(
                "dataset columns {:?} do not match preprocessor columns {:?} + {:?}",
                schema.feature_names(),
                self.numeric_columns,
                self.categorical_columns
            )));
        }
        let start = Instant::now();
        if !self.numeric_columns.is_empty() {
            self.scaler.fit(data.numeric().view())?;
        }
        let names: Vec<&str> = self.categorical_columns.iter().map(String::as_str).collect();
        self.encoder.fit(data.categorical().view(), &names)?;
        self.is_fitted = true;
        debug!(
            n_features = self.n_output_features(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Fitted preprocessor"
        );
        Ok(self)
    }

    /// Transform raw numeric and categorical blocks into the model matrix
    pub fn transform(
        &self,
        numeric: ArrayView2<f64>,
        categorical: ArrayView2<String>,
    ) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(RiskError::ModelNotFitted);
        }
        if numeric.nrows() != categorical.nrows() {
            return Err(RiskError::ShapeError {
                expected: format!("{} categorical rows", numeric.nrows()),
                actual: format!("{} categorical rows", categorical.nrows()),
            });
        }
        let scaled = if self.numeric_columns.is_empty() {
            Array2::zeros((numeric.nrows(), 0))
        } else {
            self.scaler.transform(numeric)?
        };
        let encoded = self.encoder.transform(categorical)?;
        Ok(concatenate(Axis(1), &[scaled.view(), encoded.view()])?)
    }

    pub fn transform_dataset(&self, data: &Dataset) -> Result<Array2<f64>> {
        self.transform(data.numeric().view(), data.categorical().view())
    }

    pub fn fit_transform(&mut self, data: &Dataset) -> Result<Array2<f64>> {
        self.fit(data)?;
        self.transform_dataset(data)
    }

    pub fn n_output_features(&self) -> usize {
        self.numeric_columns.len() + self.encoder.n_output_features()
    }

    /// Names of the model matrix columns
    pub fn feature_names(&self) -> Vec<String> {
        self.numeric_columns
            .iter()
            .cloned()
            .chain(self.encoder.feature_names())
            .collect()
    }
}
