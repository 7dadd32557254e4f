//! Feature schema: which columns feed the model and how targets are labelled

use crate::error::{RiskError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// A numeric input feature with an optional valid domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericFeature {
    pub name: String,
    /// Inclusive `[min, max]` accepted at inference time
    pub range: Option<(f64, f64)>,
}

impl NumericFeature {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), range: None }
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.range = Some((min, max));
        self
    }
}

/// A categorical input feature, optionally restricted to a set of values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalFeature {
    pub name: String,
    /// Canonical values accepted at inference time; `None` accepts anything
    pub allowed: Option<Vec<String>>,
}

impl CategoricalFeature {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), allowed: None }
    }

    pub fn with_allowed<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = Some(values.into_iter().map(Into::into).collect());
        self
    }
}

/// Where the label of a target comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TargetSource {
    /// Integral class codes read from a CSV column
    Column(String),
    /// WHO BMI bands computed from a BMI column
    BmiCategory { column: String },
    /// Stage-2 hypertension flag computed from blood pressure readings
    BloodPressure { systolic: String, diastolic: String },
}

impl TargetSource {
    /// Columns the source reads from the raw data
    pub fn columns(&self) -> Vec<&str> {
        match self {
            TargetSource::Column(c) => vec![c.as_str()],
            TargetSource::BmiCategory { column } => vec![column.as_str()],
            TargetSource::BloodPressure { systolic, diastolic } => {
                vec![systolic.as_str(), diastolic.as_str()]
            }
        }
    }
}

/// Human-readable description of one class of a target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskLevel {
    pub label: String,
    /// Badge colour used by the result page
    pub color: String,
}

impl RiskLevel {
    pub fn new(label: impl Into<String>, color: impl Into<String>) -> Self {
        Self { label: label.into(), color: color.into() }
    }
}

/// One disease the model predicts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub name: String,
    pub source: TargetSource,
    pub levels: BTreeMap<i64, RiskLevel>,
}

impl TargetSpec {
    pub fn new(name: impl Into<String>, source: TargetSource) -> Self {
        Self { name: name.into(), source, levels: BTreeMap::new() }
    }

    pub fn with_level(mut self, class: i64, label: &str, color: &str) -> Self {
        self.levels.insert(class, RiskLevel::new(label, color));
        self
    }

    /// Label for a class code, falling back to the code itself
    pub fn label_for(&self, class: i64) -> String {
        self.levels
            .get(&class)
            .map(|l| l.label.clone())
            .unwrap_or_else(|| format!("{} class {}", self.name, class))
    }

    /// Compute the label for a raw row (values keyed by source column)
    pub fn derive(&self, values: &[f64]) -> i64 {
        match &self.source {
            TargetSource::Column(_) => values[0].round() as i64,
            TargetSource::BmiCategory { .. } => bmi_category(values[0]),
            TargetSource::BloodPressure { .. } => {
                i64::from(values[0] >= 140.0 || values[1] >= 90.0)
            }
        }
    }
}

/// BMI band: 0 underweight, 1 normal, 2 overweight, 3 obese
pub fn bmi_category(bmi: f64) -> i64 {
    if bmi < 18.5 {
        0
    } else if bmi < 25.0 {
        1
    } else if bmi < 30.0 {
        2
    } else {
        3
    }
}

/// Canonical string form of a categorical value.
///
/// Integral numbers drop their fractional part so that `1.0` read from a CSV
/// and `"1"` posted by a form encode to the same category.
pub fn canonical_category(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 => {
            format!("{}", v as i64)
        }
        _ => trimmed.to_string(),
    }
}

/// Column contract shared by the loader, the pipeline and the predictor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub name: String,
    pub numeric: Vec<NumericFeature>,
    pub categorical: Vec<CategoricalFeature>,
    pub targets: Vec<TargetSpec>,
}

fn obesity_target(bmi_column: &str) -> TargetSpec {
    TargetSpec::new("Obesity", TargetSource::BmiCategory { column: bmi_column.to_string() })
        .with_level(0, "Underweight", "#3498DB")
        .with_level(1, "Normal Weight", "#27AE60")
        .with_level(2, "Overweight", "#F39C12")
        .with_level(3, "Obese", "#E74C3C")
}

fn diabetes_target(column: &str) -> TargetSpec {
    TargetSpec::new("Diabetes", TargetSource::Column(column.to_string()))
        .with_level(0, "No Diabetes Risk", "#27AE60")
        .with_level(1, "Prediabetes Risk", "#F39C12")
        .with_level(2, "Diabetes Risk", "#E74C3C")
}

fn binary_flag(name: &str) -> CategoricalFeature {
    CategoricalFeature::new(name).with_allowed(["0", "1"])
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::vitals()
    }
}

impl FeatureSchema {
    /// Three-output schema over clinical vitals: Diabetes, Hypertension, Obesity
    pub fn vitals() -> Self {
        Self {
            name: "vitals".to_string(),
            numeric: vec![
                NumericFeature::new("Age").with_range(18.0, 120.0),
                NumericFeature::new("BMI").with_range(10.0, 70.0),
                NumericFeature::new("SystolicBP").with_range(70.0, 250.0),
                NumericFeature::new("DiastolicBP").with_range(40.0, 160.0),
                NumericFeature::new("Glucose").with_range(40.0, 400.0),
            ],
            categorical: vec![
                binary_flag("Smoker"),
                binary_flag("PhysActivity"),
                binary_flag("HighChol"),
                CategoricalFeature::new("GenHlth").with_allowed(["1", "2", "3", "4", "5"]),
            ],
            targets: vec![
                diabetes_target("Diabetes"),
                TargetSpec::new("Hypertension", TargetSource::Column("Hypertension".to_string()))
                    .with_level(0, "Normal Blood Pressure", "#27AE60")
                    .with_level(1, "Hypertension Risk", "#E74C3C"),
                obesity_target("BMI"),
            ],
        }
    }

    /// Two-output schema matching the BRFSS diabetes health-indicator survey
    pub fn brfss() -> Self {
        Self {
            name: "brfss".to_string(),
            numeric: vec![
                NumericFeature::new("BMI").with_range(10.0, 100.0),
                NumericFeature::new("HighBP").with_range(0.0, 1.0),
                NumericFeature::new("HighChol").with_range(0.0, 1.0),
                NumericFeature::new("GenHlth").with_range(1.0, 5.0),
            ],
            categorical: vec![
                binary_flag("Smoker"),
                binary_flag("PhysActivity"),
                binary_flag("Fruits"),
                binary_flag("Veggies"),
            ],
            targets: vec![diabetes_target("Diabetes_012"), obesity_target("BMI")],
        }
    }

    /// Resolve a built-in schema by name
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "vitals" => Some(Self::vitals()),
            "brfss" => Some(Self::brfss()),
            _ => None,
        }
    }

    /// Resolve `name` as a built-in schema, otherwise read it as a JSON file
    pub fn resolve(name_or_path: &str) -> Result<Self> {
        if let Some(schema) = Self::builtin(name_or_path) {
            return Ok(schema);
        }
        Self::from_json_file(name_or_path)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            RiskError::SchemaError(format!("cannot read schema file {}: {}", path.display(), e))
        })?;
        let schema: Self = serde_json::from_str(&json)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Check the schema is internally consistent
    pub fn validate(&self) -> Result<()> {
        if self.numeric.is_empty() && self.categorical.is_empty() {
            return Err(RiskError::SchemaError("schema has no input features".to_string()));
        }
        if self.targets.is_empty() {
            return Err(RiskError::SchemaError("schema has no targets".to_string()));
        }
        let mut seen = std::collections::BTreeSet::new();
        for name in self.feature_names() {
            if !seen.insert(name) {
                return Err(RiskError::SchemaError(format!("duplicate feature '{}'", name)));
            }
        }
        let mut targets = std::collections::BTreeSet::new();
        for t in &self.targets {
            if !targets.insert(t.name.as_str()) {
                return Err(RiskError::SchemaError(format!("duplicate target '{}'", t.name)));
            }
        }
        for f in &self.numeric {
            if let Some((lo, hi)) = f.range {
                if lo > hi {
                    return Err(RiskError::SchemaError(format!(
                        "feature '{}' has an empty range [{}, {}]",
                        f.name, lo, hi
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn numeric_names(&self) -> Vec<&str> {
        self.numeric.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn categorical_names(&self) -> Vec<&str> {
        self.categorical.iter().map(|f| f.name.as_str()).collect()
    }

    /// All input feature names, numeric first
    pub fn feature_names(&self) -> Vec<&str> {
        self.numeric_names()
            .into_iter()
            .chain(self.categorical_names())
            .collect()
    }

    pub fn target_names(&self) -> Vec<&str> {
        self.targets.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn target(&self, name: &str) -> Option<&TargetSpec> {
        self.targets.iter().find(|t| t.name == name)
    }

    /// Every column the raw CSV must provide, deduplicated, in schema order
    pub fn required_columns(&self) -> Vec<&str> {
        let mut cols: Vec<&str> = Vec::new();
        let target_cols = self.targets.iter().flat_map(|t| t.source.columns());
        for c in self.feature_names().into_iter().chain(target_cols) {
            if !cols.contains(&c) {
                cols.push(c);
            }
        }
        cols
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bmi_category_bands() {
        assert_eq!(bmi_category(17.0), 0);
        assert_eq!(bmi_category(18.5), 1);
        assert_eq!(bmi_category(24.9), 1);
        assert_eq!(bmi_category(25.0), 2);
        assert_eq!(bmi_category(31.2), 3);
    }

    #[test]
    fn test_canonical_category() {
        assert_eq!(canonical_category("1.0"), "1");
        assert_eq!(canonical_category(" 2 "), "2");
        assert_eq!(canonical_category("0.5"), "0.5");
        assert_eq!(canonical_category("yes"), "yes");
    }

    #[test]
    fn test_vitals_required_columns() {
        let schema = FeatureSchema::vitals();
        let cols = schema.required_columns();
        assert!(cols.contains(&"Glucose"));
        assert!(cols.contains(&"Diabetes"));
        assert!(cols.contains(&"Hypertension"));
        // BMI is both a feature and the Obesity source; listed once
        assert_eq!(cols.iter().filter(|c| **c == "BMI").count(), 1);
        assert_eq!(schema.target_names(), vec!["Diabetes", "Hypertension", "Obesity"]);
    }

    #[test]
    fn test_blood_pressure_derivation() {
        let target = TargetSpec::new(
            "Hypertension",
            TargetSource::BloodPressure {
                systolic: "SystolicBP".into(),
                diastolic: "DiastolicBP".into(),
            },
        );
        assert_eq!(target.derive(&[120.0, 80.0]), 0);
        assert_eq!(target.derive(&[145.0, 80.0]), 1);
        assert_eq!(target.derive(&[120.0, 95.0]), 1);
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let mut schema = FeatureSchema::brfss();
        schema.categorical.push(CategoricalFeature::new("BMI"));
        assert!(matches!(schema.validate(), Err(RiskError::SchemaError(_))));
    }

    #[test]
    fn test_schema_json_roundtrip() {
        let schema = FeatureSchema::vitals();
        let json = serde_json::to_string(&schema).unwrap();
        let back: FeatureSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(schema, back);
    }
}
