//! Integration test: predictor loading, state and input validation

mod common;

use lifestyle_risk::data::{DataLoader, FeatureSchema};
use lifestyle_risk::export::save_pipeline;
use lifestyle_risk::inference::{Predictor, PredictorState};
use lifestyle_risk::training::{build_pipeline, ForestConfig, RiskPipeline};
use lifestyle_risk::RiskError;

fn fitted_pipeline() -> RiskPipeline {
    let dir = tempfile::tempdir().unwrap();
    let csv = common::write_vitals_csv(dir.path(), "vitals.csv", 300, 9);
    let data = DataLoader::new(FeatureSchema::vitals()).load(csv).unwrap();
    let mut pipeline = build_pipeline(
        FeatureSchema::vitals(),
        ForestConfig::default().with_n_estimators(10).with_max_depth(Some(6)),
    )
    .unwrap();
    pipeline.fit(&data).unwrap();
    pipeline
}

#[test]
fn test_missing_model_file() {
    let dir = tempfile::tempdir().unwrap();
    let predictor = Predictor::new(dir.path().join("nope.bin"));
    assert_eq!(predictor.state(), PredictorState::Unloaded);

    let err = predictor.predict(&common::sample_record()).unwrap_err();
    assert!(matches!(err, RiskError::ModelNotFoundError(_)), "{:?}", err);
    assert_eq!(predictor.state(), PredictorState::Unloaded);
}

#[test]
fn test_loads_once_and_shares_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("risk.bin");
    save_pipeline(&fitted_pipeline(), &path).unwrap();

    let predictor = Predictor::new(&path);
    assert_eq!(predictor.state(), PredictorState::Unloaded);
    let first = predictor.predict(&common::sample_record()).unwrap();
    assert_eq!(predictor.state(), PredictorState::Loaded);

    // the cached pipeline keeps serving after the file is gone
    std::fs::remove_file(&path).unwrap();
    let second = predictor.predict(&common::sample_record()).unwrap();
    assert_eq!(first, second);

    let a = predictor.pipeline().unwrap();
    let b = predictor.pipeline().unwrap();
    assert!(std::sync::Arc::ptr_eq(&a, &b));
}

#[test]
fn test_corrupt_artifact_is_serialization_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("risk.bin");
    std::fs::write(&path, b"definitely not a model").unwrap();

    let predictor = Predictor::new(&path);
    let err = predictor.pipeline().unwrap_err();
    assert!(matches!(err, RiskError::SerializationError(_)), "{:?}", err);
    assert_eq!(predictor.state(), PredictorState::Unloaded);
}

#[test]
fn test_invalid_record_lists_every_problem() {
    let predictor = Predictor::from_pipeline(fitted_pipeline()).unwrap();
    assert_eq!(predictor.state(), PredictorState::Loaded);

    let mut record = common::sample_record();
    record.remove("Glucose");
    record.insert("Age", "forty");
    record.insert("GenHlth", "9");

    match predictor.predict(&record) {
        Err(RiskError::InputValidationError(msg)) => {
            assert!(msg.contains("Glucose"), "{}", msg);
            assert!(msg.contains("Age"), "{}", msg);
            assert!(msg.contains("GenHlth"), "{}", msg);
        }
        other => panic!("expected InputValidationError, got {:?}", other),
    }
}

#[test]
fn test_extra_fields_ignored_and_numeric_strings_accepted() {
    let predictor = Predictor::from_pipeline(fitted_pipeline()).unwrap();
    let record = common::sample_record()
        .with("Age", "45")
        .with("Smoker", 0.0)
        .with("Notes", "free text");

    let baseline = predictor.predict(&common::sample_record()).unwrap();
    let result = predictor.predict(&record).unwrap();
    assert_eq!(result, baseline);
}

#[test]
fn test_unfitted_pipeline_rejected() {
    let pipeline = build_pipeline(FeatureSchema::vitals(), ForestConfig::default()).unwrap();
    assert!(matches!(Predictor::from_pipeline(pipeline), Err(RiskError::ModelNotFitted)));
}

#[test]
fn test_concurrent_first_calls_share_one_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("risk.bin");
    save_pipeline(&fitted_pipeline(), &path).unwrap();

    let predictor = Predictor::new(&path);
    let barrier = std::sync::Barrier::new(8);
    let loaded: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    predictor.pipeline().unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(predictor.state(), PredictorState::Loaded);
    for p in &loaded[1..] {
        assert!(std::sync::Arc::ptr_eq(&loaded[0], p));
    }
    assert_eq!(std::sync::Arc::strong_count(&loaded[0]), 9);
}
