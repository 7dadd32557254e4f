//! Integration test: load → train → persist → predict on synthetic vitals

mod common;

use lifestyle_risk::data::{DataLoader, FeatureSchema};
use lifestyle_risk::export::load_pipeline;
use lifestyle_risk::inference::Predictor;
use lifestyle_risk::training::{
    argmax, ForestConfig, MetricsReport, RiskPipeline, Trainer, TrainingConfig, TrainingSummary,
};
use std::path::Path;

fn small_config(dir: &Path, model: &str) -> TrainingConfig {
    TrainingConfig::new()
        .with_model_path(dir.join(model))
        .with_forest(
            ForestConfig::default()
                .with_n_estimators(20)
                .with_max_depth(Some(10)),
        )
}

fn train(dir: &Path, model: &str) -> (RiskPipeline, TrainingSummary) {
    let csv = dir.join("vitals.csv");
    if !csv.exists() {
        common::write_vitals_csv(dir, "vitals.csv", 1000, 11);
    }
    let loader = DataLoader::new(FeatureSchema::vitals());
    Trainer::new(small_config(dir, model))
        .train_from_path(&loader, &csv)
        .unwrap()
}

#[test]
fn test_training_writes_model_and_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let (pipeline, summary) = train(dir.path(), "models/risk.bin");

    assert!(pipeline.is_fitted());
    assert_eq!(summary.n_rows, 1000);
    assert_eq!(summary.n_train + summary.n_test, 1000);
    assert_eq!(summary.stratified_on, "Diabetes");
    assert!(summary.model_path.exists());
    assert!(summary.metrics_path.exists());

    let report = MetricsReport::load(&summary.metrics_path).unwrap();
    for disease in ["Diabetes", "Hypertension", "Obesity"] {
        let m = report.get(disease).unwrap_or_else(|| panic!("no metrics for {}", disease));
        assert!((0.0..=1.0).contains(&m.f1), "{} f1 = {}", disease, m.f1);
        assert!((0.0..=1.0).contains(&m.accuracy));
        assert_eq!(m.support, summary.n_test);
    }

    // labels are deterministic functions of the features, so the forest should learn them
    assert!(report.get("Obesity").unwrap().accuracy > 0.8);
}

#[test]
fn test_predictions_are_valid_distributions() {
    let dir = tempfile::tempdir().unwrap();
    let (_, summary) = train(dir.path(), "risk.bin");
    let schema = FeatureSchema::vitals();

    let predictor = Predictor::new(&summary.model_path);
    let result = predictor.predict(&common::sample_record()).unwrap();
    assert_eq!(result.predictions.len(), 3);

    for p in &result.predictions {
        let target = schema.target(&p.disease).unwrap();
        assert!(target.levels.contains_key(&p.class), "{} class {}", p.disease, p.class);
        assert_eq!(p.label, target.label_for(p.class));
        assert!(p.color.is_some());

        let total: f64 = p.probabilities.values().sum();
        assert!((total - 1.0).abs() < 1e-9, "{} sums to {}", p.disease, total);
        assert!(p.probabilities.values().all(|v| (0.0..=1.0).contains(v)));

        let (best, best_p) = p
            .probabilities
            .iter()
            .fold((i64::MIN, -1.0), |acc, (&c, &v)| if v > acc.1 { (c, v) } else { acc });
        assert_eq!(p.class, best);
        assert_eq!(p.probability, best_p);
    }

    // BMI 31.2 sits well inside the obese band
    assert_eq!(result.get("Obesity").unwrap().class, 3);
}

#[test]
fn test_persisted_pipeline_predicts_identically() {
    let dir = tempfile::tempdir().unwrap();
    let (pipeline, summary) = train(dir.path(), "risk.bin");
    let loaded = load_pipeline(&summary.model_path).unwrap();

    let data = DataLoader::new(FeatureSchema::vitals())
        .load(dir.path().join("vitals.csv"))
        .unwrap();
    let sample = data.select(&(0..100).collect::<Vec<_>>());

    assert_eq!(
        pipeline.predict_dataset(&sample).unwrap(),
        loaded.predict_dataset(&sample).unwrap()
    );

    let before = pipeline
        .predict_proba(sample.numeric().view(), sample.categorical().view())
        .unwrap();
    let after = loaded
        .predict_proba(sample.numeric().view(), sample.categorical().view())
        .unwrap();
    for (a, b) in before.iter().zip(&after) {
        assert_eq!(a.output, b.output);
        assert_eq!(a.classes, b.classes);
        assert_eq!(a.proba, b.proba);
        for row in a.proba.rows() {
            let k = argmax(row);
            assert!(k < a.classes.len());
        }
    }
}

#[test]
fn test_same_seed_same_model() {
    let dir = tempfile::tempdir().unwrap();
    let (first, first_summary) = train(dir.path(), "a.bin");
    let (second, second_summary) = train(dir.path(), "b.bin");

    assert_eq!(first_summary.metrics, second_summary.metrics);

    let data = DataLoader::new(FeatureSchema::vitals())
        .load(dir.path().join("vitals.csv"))
        .unwrap();
    let a = first.predict_proba(data.numeric().view(), data.categorical().view()).unwrap();
    let b = second.predict_proba(data.numeric().view(), data.categorical().view()).unwrap();
    for (x, y) in a.iter().zip(&b) {
        assert_eq!(x.proba, y.proba);
    }
}

#[test]
fn test_stratified_split_keeps_every_class_in_test() {
    let dir = tempfile::tempdir().unwrap();
    let (_, summary) = train(dir.path(), "risk.bin");
    let report = MetricsReport::load(&summary.metrics_path).unwrap();
    let diabetes = report.get("Diabetes").unwrap();
    for class in [0, 1, 2] {
        let support = diabetes.per_class.get(&class).map(|c| c.support).unwrap_or(0);
        assert!(support > 0, "class {} missing from the test partition", class);
    }
}

#[test]
fn test_oversampling_grows_training_set() {
    let dir = tempfile::tempdir().unwrap();
    let csv = common::write_vitals_csv(dir.path(), "vitals.csv", 400, 5);
    let loader = DataLoader::new(FeatureSchema::vitals());
    let config = small_config(dir.path(), "risk.bin").with_oversample(true);
    let (_, summary) = Trainer::new(config).train_from_path(&loader, csv).unwrap();
    assert!(summary.n_fit > summary.n_train);
}

#[test]
fn test_training_rows_predict_known_classes() {
    let dir = tempfile::tempdir().unwrap();
    let (pipeline, summary) = train(dir.path(), "risk.bin");
    let data = DataLoader::new(FeatureSchema::vitals())
        .load(dir.path().join("vitals.csv"))
        .unwrap();
    let batch = pipeline.predict_dataset(&data.select(&[0, 1, 2, 3, 4])).unwrap();

    let predictor = Predictor::new(&summary.model_path);
    for i in 0..5 {
        let record = data.record(i).unwrap();
        let result = predictor.predict(&record).unwrap();
        for ((name, classes), p) in batch.iter().zip(&result.predictions) {
            assert_eq!(name, &p.disease);
            assert_eq!(classes[i], p.class);
            let known = data.class_counts(name).unwrap();
            assert!(known.contains_key(&p.class));
        }
    }
}
