//! One-hot encoding of categorical feature columns

use crate::error::{RiskError, Result};
use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One-hot encoder with a fixed, sorted category layout per column.
///
/// Values not seen during fit encode as all zeros for their column.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OneHotEncoder {
    columns: Vec<String>,
    /// Sorted categories of each column
    categories: Vec<Vec<String>>,
    is_fitted: bool,
}

impl OneHotEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn categories; `columns` names the columns of `x` in order
    pub fn fit(&mut self, x: ArrayView2<String>, columns: &[&str]) -> Result<&mut Self> {
        if x.ncols() != columns.len() {
            return Err(RiskError::ShapeError {
                expected: format!("{} columns", columns.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self.categories = x
            .axis_iter(Axis(1))
            .map(|col| {
                col.iter()
                    .cloned()
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect()
            })
            .collect();
        self.is_fitted = true;
        Ok(self)
    }

    pub fn transform(&self, x: ArrayView2<String>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(RiskError::ModelNotFitted);
        }
        if x.ncols() != self.columns.len() {
            return Err(RiskError::ShapeError {
                expected: format!("{} columns", self.columns.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let mut out = Array2::zeros((x.nrows(), self.n_output_features()));
        for (i, row) in x.axis_iter(Axis(0)).enumerate() {
            let mut offset = 0;
            for (value, cats) in row.iter().zip(&self.categories) {
                if let Ok(k) = cats.binary_search(value) {
                    out[[i, offset + k]] = 1.0;
                }
                offset += cats.len();
            }
        }
        Ok(out)
    }

    pub fn n_output_features(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    /// Output column names, `<column>_<value>`
    pub fn feature_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .zip(&self.categories)
            .flat_map(|(col, cats)| cats.iter().map(move |c| format!("{}_{}", col, c)))
            .collect()
    }

    pub fn categories(&self, column: &str) -> Option<&[String]> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.categories[i].as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn strings(rows: &[&[&str]]) -> Array2<String> {
        let ncols = rows.first().map(|r| r.len()).unwrap_or(0);
        Array2::from_shape_fn((rows.len(), ncols), |(i, j)| rows[i][j].to_string())
    }

    #[test]
    fn test_onehot_layout_is_sorted() {
        let x = strings(&[&["1", "b"], &["0", "a"], &["1", "c"]]);
        let mut enc = OneHotEncoder::new();
        let out = enc.fit(x.view(), &["Smoker", "Diet"]).unwrap().transform(x.view()).unwrap();

        assert_eq!(
            enc.feature_names(),
            vec!["Smoker_0", "Smoker_1", "Diet_a", "Diet_b", "Diet_c"]
        );
        assert_eq!(out.row(0).to_vec(), vec![0.0, 1.0, 0.0, 1.0, 0.0]);
        assert_eq!(out.row(1).to_vec(), vec![1.0, 0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_unseen_category_is_all_zeros() {
        let x = strings(&[&["0"], &["1"]]);
        let mut enc = OneHotEncoder::new();
        enc.fit(x.view(), &["Smoker"]).unwrap();
        let out = enc.transform(strings(&[&["7"]]).view()).unwrap();
        assert_eq!(out.row(0).sum(), 0.0);
    }
}
