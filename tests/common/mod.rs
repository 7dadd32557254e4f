//! Synthetic patient data shared by the integration tests

#![allow(dead_code)]

use lifestyle_risk::data::PatientRecord;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const HEADER: &str =
    "Age,BMI,SystolicBP,DiastolicBP,Glucose,Smoker,PhysActivity,HighChol,GenHlth,Diabetes,Hypertension";

/// One CSV line of plausible vitals with labels that follow from them
fn synthetic_row(rng: &mut ChaCha8Rng, i: usize) -> String {
    let age: f64 = rng.gen_range(18.0..90.0);
    // cycle BMI bands so every obesity class is well represented
    let bmi: f64 = match i % 4 {
        0 => rng.gen_range(15.0..18.4),
        1 => rng.gen_range(18.5..24.9),
        2 => rng.gen_range(25.0..29.9),
        _ => rng.gen_range(30.0..45.0),
    };
    let systolic: f64 = rng.gen_range(95.0..180.0);
    let diastolic: f64 = rng.gen_range(60.0..110.0);
    let glucose: f64 = rng.gen_range(70.0..220.0);
    let smoker = rng.gen_range(0..2);
    let active = rng.gen_range(0..2);
    let high_chol = rng.gen_range(0..2);
    let gen_hlth = rng.gen_range(1..6);

    let diabetes = if glucose >= 126.0 {
        2
    } else if glucose >= 100.0 {
        1
    } else {
        0
    };
    let hypertension = i64::from(systolic >= 140.0 || diastolic >= 90.0);

    format!(
        "{:.0},{:.1},{:.0},{:.0},{:.0},{},{},{},{},{},{}",
        age, bmi, systolic, diastolic, glucose, smoker, active, high_chol, gen_hlth, diabetes,
        hypertension
    )
}

/// Write `n` synthetic records to `dir/<name>` and return the path
pub fn write_vitals_csv(dir: &Path, name: &str, n: usize, seed: u64) -> PathBuf {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "{}", HEADER).unwrap();
    for i in 0..n {
        writeln!(file, "{}", synthetic_row(&mut rng, i)).unwrap();
    }
    path
}

/// A complete, valid record for the vitals schema
pub fn sample_record() -> PatientRecord {
    PatientRecord::new()
        .with("Age", 45.0)
        .with("BMI", 31.2)
        .with("SystolicBP", 130.0)
        .with("DiastolicBP", 85.0)
        .with("Glucose", 140.0)
        .with("Smoker", "0")
        .with("PhysActivity", "1")
        .with("HighChol", "0")
        .with("GenHlth", "3")
}
