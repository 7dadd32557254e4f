//! Single-record inference
//!
//! [`Predictor`] loads the pipeline artifact once, validates each record
//! against the model's schema and returns a label and probability per disease.

mod engine;

pub use engine::{
    validate_record, DiseasePrediction, PredictionResult, Predictor, PredictorState,
    ValidatedRecord,
};
