//! CSV loading and validation against a [`FeatureSchema`]

use super::schema::{canonical_category, FeatureSchema};
use super::Dataset;
use crate::error::{RiskError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Loads patient CSVs into typed [`Dataset`]s.
///
/// Every CSV column is read as text and converted per schema role, so a
/// malformed number anywhere in the file is a [`RiskError::SchemaError`]
/// naming the column.
#[derive(Debug, Clone)]
pub struct DataLoader {
    schema: FeatureSchema,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new(FeatureSchema::default())
    }
}

impl DataLoader {
    pub fn new(schema: FeatureSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Load a CSV file, or the first `*.csv` (by name) inside a directory
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Dataset> {
        let path = path.as_ref();
        if path.is_dir() {
            let csv = first_csv_in(path)?;
            info!(dir = %path.display(), file = %csv.display(), "Using first CSV in data directory");
            self.load_csv(csv)
        } else {
            self.load_csv(path)
        }
    }

    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<Dataset> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RiskError::DataError(format!("file not found: {}", path.display())));
        }
        let start = Instant::now();
        let df = CsvReadOptions::default()
            .with_has_header(true)
            // no inference: all columns as strings
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;
        debug!(
            path = %path.display(),
            rows = df.height(),
            cols = df.width(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Read CSV"
        );
        self.from_dataframe(&df)
    }

    /// Validate and convert an in-memory frame
    pub fn from_dataframe(&self, df: &DataFrame) -> Result<Dataset> {
        let schema = &self.schema;
        let missing: Vec<&str> = schema
            .required_columns()
            .into_iter()
            .filter(|c| df.column(c).is_err())
            .collect();
        if !missing.is_empty() {
            return Err(RiskError::SchemaError(format!(
                "missing required columns: {}",
                missing.join(", ")
            )));
        }

        let n_raw = df.height();
        let mut numeric_cols: BTreeMap<&str, Vec<Option<f64>>> = BTreeMap::new();
        let numeric_sources = schema
            .numeric_names()
            .into_iter()
            .chain(schema.targets.iter().flat_map(|t| t.source.columns()));
        for name in numeric_sources {
            if !numeric_cols.contains_key(name) {
                numeric_cols.insert(name, numeric_column(df, name)?);
            }
        }
        let categorical_cols = schema
            .categorical_names()
            .into_iter()
            .map(|name| categorical_column(df, name))
            .collect::<Result<Vec<_>>>()?;

        let keep: Vec<usize> = (0..n_raw)
            .filter(|&i| {
                numeric_cols.values().all(|col| col[i].is_some())
                    && categorical_cols.iter().all(|col| col[i].is_some())
            })
            .collect();
        let dropped = n_raw - keep.len();
        if dropped > 0 {
            info!(dropped, kept = keep.len(), "Dropped rows with missing values");
        }
        if keep.is_empty() {
            return Err(RiskError::InsufficientDataError(format!(
                "no complete rows among {} read",
                n_raw
            )));
        }

        let n = keep.len();
        let value = |name: &str, row: usize| -> f64 {
            numeric_cols
                .get(name)
                .and_then(|col| col[row])
                .unwrap_or(f64::NAN)
        };

        let mut numeric = Array2::<f64>::zeros((n, schema.numeric.len()));
        for (j, f) in schema.numeric.iter().enumerate() {
            for (i, &row) in keep.iter().enumerate() {
                numeric[[i, j]] = value(&f.name, row);
            }
        }

        let mut categorical = Array2::<String>::default((n, schema.categorical.len()));
        for (j, col) in categorical_cols.iter().enumerate() {
            for (i, &row) in keep.iter().enumerate() {
                categorical[[i, j]] = col[row].clone().unwrap_or_default();
            }
        }

        let mut targets = Vec::with_capacity(schema.targets.len());
        for target in &schema.targets {
            let sources = target.source.columns();
            let mut labels = Vec::with_capacity(n);
            for &row in &keep {
                let raw: Vec<f64> = sources.iter().map(|c| value(c, row)).collect();
                if matches!(target.source, super::TargetSource::Column(_))
                    && raw[0].fract() != 0.0
                {
                    return Err(RiskError::SchemaError(format!(
                        "target '{}' has non-integral class label {}",
                        target.name, raw[0]
                    )));
                }
                labels.push(target.derive(&raw));
            }
            targets.push(Array1::from_vec(labels));
        }

        info!(rows = n, schema = %schema.name, "Loaded dataset");
        Dataset::new(schema.clone(), numeric, categorical, targets)
    }
}

fn first_csv_in(dir: &Path) -> Result<PathBuf> {
    let mut csvs: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .map(|ext| ext.eq_ignore_ascii_case("csv"))
                    .unwrap_or(false)
        })
        .collect();
    csvs.sort();
    csvs.into_iter()
        .next()
        .ok_or_else(|| RiskError::DataError(format!("no CSV file found in {}", dir.display())))
}

/// Column as floats; blanks and NaN count as missing
fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = df.column(name)?.as_materialized_series();
    if series.dtype() == &DataType::String {
        return series
            .str()?
            .into_iter()
            .map(|v| parse_number(name, v))
            .collect();
    }
    let cast = series.strict_cast(&DataType::Float64).map_err(|_| {
        RiskError::SchemaError(format!(
            "column '{}' cannot be read as numbers (dtype {})",
            name,
            series.dtype()
        ))
    })?;
    Ok(cast
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect())
}

fn parse_number(column: &str, raw: Option<&str>) -> Result<Option<f64>> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    raw.parse::<f64>()
        .map(|v| Some(v).filter(|x| x.is_finite()))
        .map_err(|_| {
            RiskError::SchemaError(format!(
                "column '{}' cannot be read as numbers: '{}'",
                column, raw
            ))
        })
}

/// Column as canonical category strings; blanks count as missing
fn categorical_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = df.column(name)?.as_materialized_series();
    let cast = series.cast(&DataType::String)?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|v| {
            v.map(canonical_category)
                .filter(|s| !s.is_empty())
        })
        .collect())
}
