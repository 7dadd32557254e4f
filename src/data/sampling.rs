//! Random oversampling of minority classes

use super::{class_counts, Dataset};
use crate::error::{RiskError, Result};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Duplicates rows of minority classes of one target until every class
/// matches the majority count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomOverSampler {
    /// Target whose classes are balanced
    target: String,
    seed: u64,
}

impl RandomOverSampler {
    pub fn new(target: impl Into<String>) -> Self {
        Self { target: target.into(), seed: 42 }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Return a new dataset: the original rows followed by the duplicates
    pub fn resample(&self, data: &Dataset) -> Result<Dataset> {
        let labels = data.target(&self.target).ok_or_else(|| {
            RiskError::SchemaError(format!("unknown oversampling target '{}'", self.target))
        })?;
        let counts = class_counts(labels);
        let Some(&majority) = counts.values().max() else {
            return Ok(data.clone());
        };

        let mut by_class: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (i, &label) in labels.iter().enumerate() {
            by_class.entry(label).or_default().push(i);
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut indices: Vec<usize> = (0..data.len()).collect();
        for (class, rows) in &by_class {
            let n_to_add = majority - rows.len();
            for _ in 0..n_to_add {
                indices.push(rows[rng.gen_range(0..rows.len())]);
            }
            if n_to_add > 0 {
                info!(target_name = %self.target, class, added = n_to_add, "Oversampled class");
            }
        }
        Ok(data.select(&indices))
    }
}
