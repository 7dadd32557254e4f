//! Random forest classifier

use super::config::{ClassWeight, ForestConfig};
use super::decision_tree::DecisionTree;
use crate::data::class_counts;
use crate::error::{RiskError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::debug;

/// Bagged ensemble of [`DecisionTree`]s over integer class codes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    config: ForestConfig,
    trees: Vec<DecisionTree>,
    /// Sorted class codes; column `j` of `predict_proba` is `classes[j]`
    classes: Vec<i64>,
    n_features: usize,
    feature_importances: Option<Array1<f64>>,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(ForestConfig::default())
    }
}

impl RandomForest {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            classes: Vec::new(),
            n_features: 0,
            feature_importances: None,
        }
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    /// Fit the forest; trees are grown in parallel with per-tree seeds
    /// `random_state + tree_index`
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<&mut Self> {
        self.config.validate()?;
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(RiskError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(RiskError::InsufficientDataError(
                "cannot fit a forest on zero samples".to_string(),
            ));
        }

        let start = Instant::now();
        let counts = class_counts(y);
        let classes: Vec<i64> = counts.keys().copied().collect();
        let class_idx: Vec<usize> = y
            .iter()
            .map(|c| classes.binary_search(c).unwrap_or_default())
            .collect();
        let class_weights = class_weights(self.config.class_weight, &counts, n_samples);
        let weights: Vec<f64> = class_idx.iter().map(|&c| class_weights[c]).collect();

        let n_features = x.ncols();
        let max_features = self.config.max_features.resolve(n_features);
        let base_seed = self.config.random_state;
        let cfg = &self.config;

        let trees = (0..cfg.n_estimators)
            .into_par_iter()
            .map(|tree_idx| -> Result<DecisionTree> {
                let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(tree_idx as u64));
                let sample: Vec<usize> = if cfg.bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };

                let mut tree = DecisionTree::new()
                    .with_max_depth(cfg.max_depth)
                    .with_min_samples_split(cfg.min_samples_split)
                    .with_min_samples_leaf(cfg.min_samples_leaf)
                    .with_max_features(Some(max_features));
                tree.fit(x, &class_idx, &weights, classes.len(), &sample, &mut rng)?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()
            .map_err(|e| RiskError::TrainingError(format!("tree fitting failed: {}", e)))?;

        self.trees = trees;
        self.classes = classes;
        self.n_features = n_features;
        self.compute_feature_importances();

        debug!(
            n_trees = self.trees.len(),
            n_classes = self.classes.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fitted random forest"
        );
        Ok(self)
    }

    fn compute_feature_importances(&mut self) {
        let mut total = Array1::<f64>::zeros(self.n_features);
        for imp in self.trees.iter().filter_map(|t| t.feature_importances()) {
            total += imp;
        }
        let sum = total.sum();
        if sum > 0.0 {
            total /= sum;
        }
        self.feature_importances = Some(total);
    }

    /// Mean of the trees' leaf distributions, one column per class
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.trees.is_empty() {
            return Err(RiskError::ModelNotFitted);
        }
        // tree order is preserved so the float sum is deterministic
        let per_tree = self
            .trees
            .par_iter()
            .map(|tree| tree.predict_proba(x))
            .collect::<Result<Vec<_>>>()?;

        let mut proba = Array2::<f64>::zeros((x.nrows(), self.classes.len()));
        for p in &per_tree {
            proba += p;
        }
        proba /= self.trees.len() as f64;
        Ok(proba)
    }

    /// Most probable class code per row; ties go to the lowest code
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba
            .axis_iter(Axis(0))
            .map(|row| self.classes[argmax(row)])
            .collect())
    }

    pub fn classes(&self) -> &[i64] {
        &self.classes
    }

    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }
}

/// Index of the largest value, first one on ties
pub fn argmax(values: ArrayView1<f64>) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Weight per class index, in sorted class order
fn class_weights(mode: ClassWeight, counts: &BTreeMap<i64, usize>, n_samples: usize) -> Vec<f64> {
    match mode {
        ClassWeight::None => vec![1.0; counts.len()],
        ClassWeight::Balanced => {
            let k = counts.len() as f64;
            counts
                .values()
                .map(|&c| n_samples as f64 / (k * c as f64))
                .collect()
        }
    }
}
