//! The fitted model pipeline: preprocessing followed by one forest per disease

use super::config::ForestConfig;
use super::multi_output::MultiOutputClassifier;
use crate::data::{Dataset, FeatureSchema};
use crate::error::{RiskError, Result};
use crate::preprocessing::FeaturePreprocessor;
use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

/// Facts recorded when the pipeline is fitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineMetadata {
    pub trained_at: DateTime<Utc>,
    pub n_samples: usize,
    /// Model matrix column names after preprocessing
    pub feature_names: Vec<String>,
    pub crate_version: String,
}

/// Class probabilities of one output for a batch of rows
#[derive(Debug, Clone)]
pub struct OutputProbabilities {
    pub output: String,
    /// Class codes, one per column of `proba`
    pub classes: Vec<i64>,
    pub proba: Array2<f64>,
}

/// Preprocessor and per-disease classifiers fitted together
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskPipeline {
    schema: FeatureSchema,
    preprocessor: FeaturePreprocessor,
    classifier: MultiOutputClassifier,
    metadata: Option<PipelineMetadata>,
}

/// Assemble an unfitted pipeline for `schema`
pub fn build_pipeline(schema: FeatureSchema, forest: ForestConfig) -> Result<RiskPipeline> {
    schema.validate()?;
    forest.validate()?;
    let preprocessor =
        FeaturePreprocessor::new(&schema.numeric_names(), &schema.categorical_names());
    Ok(RiskPipeline {
        schema,
        preprocessor,
        classifier: MultiOutputClassifier::new(forest),
        metadata: None,
    })
}

impl RiskPipeline {
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn preprocessor(&self) -> &FeaturePreprocessor {
        &self.preprocessor
    }

    pub fn classifier(&self) -> &MultiOutputClassifier {
        &self.classifier
    }

    pub fn metadata(&self) -> Option<&PipelineMetadata> {
        self.metadata.as_ref()
    }

    pub fn is_fitted(&self) -> bool {
        self.metadata.is_some() && self.classifier.is_fitted()
    }

    pub fn fit(&mut self, data: &Dataset) -> Result<&mut Self> {
        if data.schema() != &self.schema {
            return Err(RiskError::SchemaError(format!(
                "dataset schema '{}' does not match pipeline schema '{}'",
                data.schema().name,
                self.schema.name
            )));
        }
        if data.is_empty() {
            return Err(RiskError::InsufficientDataError("cannot fit on zero rows".to_string()));
        }

        let start = Instant::now();
        let x = self.preprocessor.fit_transform(data)?;
        let targets: Vec<(&str, &Array1<i64>)> = self
            .schema
            .targets
            .iter()
            .zip(data.targets())
            .map(|(t, y)| (t.name.as_str(), y))
            .collect();
        self.classifier.fit(&x, &targets)?;

        self.metadata = Some(PipelineMetadata {
            trained_at: Utc::now(),
            n_samples: data.len(),
            feature_names: self.preprocessor.feature_names(),
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
        });
        info!(
            rows = data.len(),
            features = x.ncols(),
            outputs = targets.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fitted pipeline"
        );
        Ok(self)
    }

    fn ensure_fitted(&self) -> Result<()> {
        if self.is_fitted() {
            Ok(())
        } else {
            Err(RiskError::ModelNotFitted)
        }
    }

    /// Class probabilities per output for raw feature blocks
    pub fn predict_proba(
        &self,
        numeric: ArrayView2<f64>,
        categorical: ArrayView2<String>,
    ) -> Result<Vec<OutputProbabilities>> {
        self.ensure_fitted()?;
        let x = self.preprocessor.transform(numeric, categorical)?;
        self.classifier
            .estimators()
            .map(|(name, forest)| {
                Ok(OutputProbabilities {
                    output: name.to_string(),
                    classes: forest.classes().to_vec(),
                    proba: forest.predict_proba(&x)?,
                })
            })
            .collect()
    }

    /// Predicted class codes per output for raw feature blocks
    pub fn predict(
        &self,
        numeric: ArrayView2<f64>,
        categorical: ArrayView2<String>,
    ) -> Result<Vec<(String, Array1<i64>)>> {
        self.ensure_fitted()?;
        let x = self.preprocessor.transform(numeric, categorical)?;
        self.classifier.predict(&x)
    }

    pub fn predict_dataset(&self, data: &Dataset) -> Result<Vec<(String, Array1<i64>)>> {
        self.predict(data.numeric().view(), data.categorical().view())
    }

    /// Mean decrease in impurity per model matrix column, for one output
    pub fn feature_importances(&self, output: &str) -> Option<Vec<(String, f64)>> {
        let forest = self.classifier.estimator(output)?;
        let importances = forest.feature_importances()?;
        Some(
            self.preprocessor
                .feature_names()
                .into_iter()
                .zip(importances.iter().copied())
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataLoader;
    use polars::prelude::*;

    fn small_dataset() -> Dataset {
        let n = 40;
        let bmi: Vec<f64> = (0..n).map(|i| 17.0 + i as f64 * 0.5).collect();
        let flag: Vec<f64> = (0..n).map(|i| (i % 2) as f64).collect();
        let genhlth: Vec<f64> = (0..n).map(|i| (1 + i % 5) as f64).collect();
        let diabetes: Vec<f64> = (0..n).map(|i| if i < 20 { 0.0 } else { 2.0 }).collect();
        let df = df!(
            "BMI" => &bmi,
            "HighBP" => &flag,
            "HighChol" => &flag,
            "GenHlth" => &genhlth,
            "Smoker" => &flag,
            "PhysActivity" => &flag,
            "Fruits" => &flag,
            "Veggies" => &flag,
            "Diabetes_012" => &diabetes
        )
        .unwrap();
        DataLoader::new(FeatureSchema::brfss()).from_dataframe(&df).unwrap()
    }

    #[test]
    fn test_fit_and_predict() {
        let data = small_dataset();
        let mut pipeline = build_pipeline(
            FeatureSchema::brfss(),
            ForestConfig::default().with_n_estimators(10),
        )
        .unwrap();
        pipeline.fit(&data).unwrap();
        assert!(pipeline.is_fitted());

        let preds = pipeline.predict_dataset(&data).unwrap();
        assert_eq!(preds.len(), 2);
        assert_eq!(preds[0].0, "Diabetes");
        assert!(preds[0].1.iter().all(|c| [0, 2].contains(c)));

        let proba = pipeline
            .predict_proba(data.numeric().view(), data.categorical().view())
            .unwrap();
        assert_eq!(proba[1].output, "Obesity");
        assert_eq!(proba[1].classes, vec![0, 1, 2, 3]);

        let importances = pipeline.feature_importances("Diabetes").unwrap();
        assert_eq!(importances[0].0, "BMI");
    }

    #[test]
    fn test_unfitted_pipeline() {
        let pipeline = build_pipeline(FeatureSchema::brfss(), ForestConfig::default()).unwrap();
        let data = small_dataset();
        assert!(matches!(
            pipeline.predict_dataset(&data),
            Err(RiskError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_schema_mismatch() {
        let mut pipeline =
            build_pipeline(FeatureSchema::vitals(), ForestConfig::default().with_n_estimators(2))
                .unwrap();
        assert!(matches!(pipeline.fit(&small_dataset()), Err(RiskError::SchemaError(_))));
    }
}
