//! CART classification tree with weighted Gini impurity

use crate::error::{RiskError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Decision tree node, stored in a flat arena; children are arena indices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf holding the weighted class distribution of its samples
    Leaf {
        distribution: Vec<f64>,
        n_samples: usize,
    },
    /// Internal node; samples with `x[feature_idx] <= threshold` go left
    Split {
        feature_idx: usize,
        threshold: f64,
        left: usize,
        right: usize,
        n_samples: usize,
        impurity: f64,
    },
}

impl TreeNode {
    fn leaf(counts: &[f64], n_samples: usize) -> Self {
        let total: f64 = counts.iter().sum();
        let distribution = if total > 0.0 {
            counts.iter().map(|c| c / total).collect()
        } else {
            vec![1.0 / counts.len().max(1) as f64; counts.len()]
        };
        TreeNode::Leaf { distribution, n_samples }
    }

    fn placeholder() -> Self {
        TreeNode::Leaf { distribution: Vec::new(), n_samples: 0 }
    }
}

/// A node still to be grown: its arena slot and its block of `rows`
struct PendingNode {
    slot: usize,
    start: usize,
    end: usize,
    depth: usize,
}

/// Classification tree over class indices `0..n_classes`.
///
/// Classes are indices into the caller's class list; the forest owns the
/// mapping back to class codes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Arena of nodes, root first; empty until fitted
    nodes: Vec<TreeNode>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features sampled at each split; all when `None`
    pub max_features: Option<usize>,
    n_features: usize,
    n_classes: usize,
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything split search needs, borrowed for the duration of a fit
struct FitContext<'a> {
    x: &'a Array2<f64>,
    y: &'a [usize],
    weights: &'a [f64],
    max_features: usize,
}

impl DecisionTree {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            n_features: 0,
            n_classes: 0,
            feature_importances: None,
        }
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Fit on the rows listed in `indices` (repeats allowed, as in a bootstrap sample).
    ///
    /// `y[i]` is the class index of row `i` and `weights[i]` its sample weight.
    pub fn fit(
        &mut self,
        x: &Array2<f64>,
        y: &[usize],
        weights: &[f64],
        n_classes: usize,
        indices: &[usize],
        rng: &mut ChaCha8Rng,
    ) -> Result<&mut Self> {
        if x.nrows() != y.len() || y.len() != weights.len() {
            return Err(RiskError::ShapeError {
                expected: format!("{} labels and weights", x.nrows()),
                actual: format!("{} labels, {} weights", y.len(), weights.len()),
            });
        }
        if indices.is_empty() {
            return Err(RiskError::TrainingError("cannot fit a tree on zero samples".to_string()));
        }
        if n_classes == 0 || y.iter().any(|&c| c >= n_classes) {
            return Err(RiskError::TrainingError(format!(
                "class indices must lie in 0..{}",
                n_classes
            )));
        }

        self.n_features = x.ncols();
        self.n_classes = n_classes;
        let ctx = FitContext {
            x,
            y,
            weights,
            max_features: self
                .max_features
                .unwrap_or(self.n_features)
                .clamp(1, self.n_features.max(1)),
        };

        let mut importances = vec![0.0; self.n_features];
        self.nodes = self.build(&ctx, indices.to_vec(), &mut importances, rng);

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|v| *v /= total);
        }
        self.feature_importances = Some(Array1::from_vec(importances));
        Ok(self)
    }

    fn class_counts(&self, ctx: &FitContext, rows: &[usize]) -> Vec<f64> {
        let mut counts = vec![0.0; self.n_classes];
        for &i in rows {
            counts[ctx.y[i]] += ctx.weights[i];
        }
        counts
    }

    /// Grow the tree depth-first from an explicit stack of pending nodes
    fn build(
        &self,
        ctx: &FitContext,
        mut rows: Vec<usize>,
        importances: &mut [f64],
        rng: &mut ChaCha8Rng,
    ) -> Vec<TreeNode> {
        let mut nodes = vec![TreeNode::placeholder()];
        let mut stack = vec![PendingNode { slot: 0, start: 0, end: rows.len(), depth: 0 }];

        while let Some(task) = stack.pop() {
            let block = &mut rows[task.start..task.end];
            let n_samples = block.len();
            let counts = self.class_counts(ctx, block);
            let impurity = gini(&counts);

            let should_stop = n_samples < self.min_samples_split
                || n_samples < 2 * self.min_samples_leaf
                || self.max_depth.map_or(false, |d| task.depth >= d)
                || impurity <= f64::EPSILON;
            let split = if should_stop {
                None
            } else {
                self.best_split(ctx, block, &counts, impurity, rng)
            };
            let Some(split) = split else {
                nodes[task.slot] = TreeNode::leaf(&counts, n_samples);
                continue;
            };

            let node_weight: f64 = counts.iter().sum();
            importances[split.feature] += node_weight * split.gain;

            // partition in place: left block first
            let mut mid = 0;
            for k in 0..block.len() {
                if ctx.x[[block[k], split.feature]] <= split.threshold {
                    block.swap(mid, k);
                    mid += 1;
                }
            }

            let left = nodes.len();
            let right = left + 1;
            nodes.push(TreeNode::placeholder());
            nodes.push(TreeNode::placeholder());
            nodes[task.slot] = TreeNode::Split {
                feature_idx: split.feature,
                threshold: split.threshold,
                left,
                right,
                n_samples,
                impurity,
            };

            // right pushed first so the left subtree is grown first
            let depth = task.depth + 1;
            stack.push(PendingNode { slot: right, start: task.start + mid, end: task.end, depth });
            stack.push(PendingNode { slot: left, start: task.start, end: task.start + mid, depth });
        }
        nodes
    }

    /// Best threshold over a random subset of features, by weighted Gini gain
    fn best_split(
        &self,
        ctx: &FitContext,
        rows: &[usize],
        counts: &[f64],
        parent_impurity: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<Split> {
        if self.n_features == 0 {
            return None;
        }
        let total_weight: f64 = counts.iter().sum();
        let n = rows.len();
        let features = index::sample(rng, self.n_features, ctx.max_features);
        let mut best: Option<Split> = None;
        let mut sorted = rows.to_vec();

        for feature in features.iter() {
            sorted.sort_by(|&a, &b| ctx.x[[a, feature]].total_cmp(&ctx.x[[b, feature]]));

            let mut left = vec![0.0; self.n_classes];
            let mut left_weight = 0.0;
            for k in 0..n - 1 {
                let i = sorted[k];
                left[ctx.y[i]] += ctx.weights[i];
                left_weight += ctx.weights[i];

                let v = ctx.x[[i, feature]];
                let next = ctx.x[[sorted[k + 1], feature]];
                if next <= v {
                    continue;
                }
                let n_left = k + 1;
                if n_left < self.min_samples_leaf || n - n_left < self.min_samples_leaf {
                    continue;
                }

                let right: Vec<f64> = counts.iter().zip(&left).map(|(c, l)| c - l).collect();
                let right_weight = total_weight - left_weight;
                let child = (left_weight * gini(&left) + right_weight * gini(&right)) / total_weight;
                let gain = parent_impurity - child;
                if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(Split { feature, threshold: (v + next) / 2.0, gain });
                }
            }
        }
        best
    }

    /// Class distribution of the leaf `row` falls into
    pub fn predict_proba_row(&self, row: ArrayView1<f64>) -> Result<&[f64]> {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx).ok_or(RiskError::ModelNotFitted)? {
                TreeNode::Leaf { distribution, .. } => return Ok(distribution.as_slice()),
                TreeNode::Split { feature_idx, threshold, left, right, .. } => {
                    idx = if row[*feature_idx] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.n_features {
            return Err(RiskError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        let mut proba = Array2::zeros((x.nrows(), self.n_classes));
        for (i, row) in x.rows().into_iter().enumerate() {
            let dist = self.predict_proba_row(row)?;
            for (j, &p) in dist.iter().enumerate() {
                proba[[i, j]] = p;
            }
        }
        Ok(proba)
    }

    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    pub fn is_fitted(&self) -> bool {
        !self.nodes.is_empty()
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Longest root-to-leaf path, in edges
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = if self.nodes.is_empty() { vec![] } else { vec![(0, 0)] };
        while let Some((idx, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            if let Some(TreeNode::Split { left, right, .. }) = self.nodes.get(idx) {
                stack.push((*left, depth + 1));
                stack.push((*right, depth + 1));
            }
        }
        max_depth
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }
}

struct Split {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Gini impurity of weighted class counts
fn gini(counts: &[f64]) -> f64 {
    let total: f64 = counts.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    1.0 - counts.iter().map(|c| (c / total).powi(2)).sum::<f64>()
}
