//! One independent classifier per target

use super::config::ForestConfig;
use super::random_forest::RandomForest;
use crate::error::{RiskError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Named forests, one per output, kept in target order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiOutputClassifier {
    config: ForestConfig,
    estimators: Vec<(String, RandomForest)>,
}

impl MultiOutputClassifier {
    pub fn new(config: ForestConfig) -> Self {
        Self { config, estimators: Vec::new() }
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    /// Fit a fresh forest for each `(name, labels)` pair
    pub fn fit(&mut self, x: &Array2<f64>, targets: &[(&str, &Array1<i64>)]) -> Result<&mut Self> {
        if targets.is_empty() {
            return Err(RiskError::TrainingError("no targets to fit".to_string()));
        }
        let mut estimators = Vec::with_capacity(targets.len());
        for (name, y) in targets {
            let mut forest = RandomForest::new(self.config.clone());
            forest.fit(x, y).map_err(|e| match e {
                RiskError::TrainingError(msg) => {
                    RiskError::TrainingError(format!("output '{}': {}", name, msg))
                }
                other => other,
            })?;
            info!(output = %name, classes = ?forest.classes(), "Fitted output classifier");
            estimators.push((name.to_string(), forest));
        }
        self.estimators = estimators;
        Ok(self)
    }

    pub fn estimator(&self, name: &str) -> Option<&RandomForest> {
        self.estimators.iter().find(|(n, _)| n == name).map(|(_, f)| f)
    }

    pub fn estimators(&self) -> impl Iterator<Item = (&str, &RandomForest)> {
        self.estimators.iter().map(|(n, f)| (n.as_str(), f))
    }

    pub fn output_names(&self) -> Vec<&str> {
        self.estimators.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn is_fitted(&self) -> bool {
        !self.estimators.is_empty()
    }

    /// Predicted class codes per output
    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<(String, Array1<i64>)>> {
        if !self.is_fitted() {
            return Err(RiskError::ModelNotFitted);
        }
        self.estimators
            .iter()
            .map(|(name, forest)| Ok((name.clone(), forest.predict(x)?)))
            .collect()
    }

    /// Class probabilities per output; columns follow each forest's `classes()`
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Vec<(String, Array2<f64>)>> {
        if !self.is_fitted() {
            return Err(RiskError::ModelNotFitted);
        }
        self.estimators
            .iter()
            .map(|(name, forest)| Ok((name.clone(), forest.predict_proba(x)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_independent_outputs() {
        let x = array![[0.0], [0.1], [0.2], [1.0], [1.1], [1.2]];
        let a = array![0, 0, 0, 1, 1, 1];
        let b = array![2, 2, 2, 2, 5, 5];
        let mut clf = MultiOutputClassifier::new(ForestConfig::default().with_n_estimators(10));
        clf.fit(&x, &[("A", &a), ("B", &b)]).unwrap();

        assert_eq!(clf.output_names(), vec!["A", "B"]);
        assert_eq!(clf.estimator("B").unwrap().classes(), &[2, 5]);
        let preds = clf.predict(&x).unwrap();
        assert_eq!(preds[0].0, "A");
        assert_eq!(preds[0].1.len(), 6);
    }

    #[test]
    fn test_unfitted() {
        let clf = MultiOutputClassifier::new(ForestConfig::default());
        assert!(matches!(clf.predict(&array![[0.0]]), Err(RiskError::ModelNotFitted)));
    }
}
