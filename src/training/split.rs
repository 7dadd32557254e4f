//! Seeded, stratified train/test split

use crate::error::{RiskError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

/// Row indices of the two partitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Split rows so each class keeps its proportion in both partitions.
///
/// `ceil(n * test_size)` rows go to test, allotted to classes by largest
/// remainder. Every class keeps at least one row on each side, so a class
/// with fewer than two rows is an error.
pub fn stratified_split(labels: &[i64], test_size: f64, seed: u64) -> Result<SplitIndices> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(RiskError::InvalidParameter {
            name: "test_size".to_string(),
            value: test_size.to_string(),
            reason: "must be strictly between 0 and 1".to_string(),
        });
    }
    let n = labels.len();

    let mut by_class: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        by_class.entry(label).or_default().push(i);
    }
    if let Some((class, rows)) = by_class.iter().find(|(_, rows)| rows.len() < 2) {
        return Err(RiskError::InsufficientDataError(format!(
            "class {} has {} sample(s); stratified split needs at least 2",
            class,
            rows.len()
        )));
    }

    let n_test = ((n as f64) * test_size).ceil() as usize;
    let allocation = allocate(&by_class, n, n_test);

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(n - n_test);
    let mut test = Vec::with_capacity(n_test);
    for ((_, rows), &k) in by_class.iter().zip(&allocation) {
        let mut rows = rows.clone();
        rows.shuffle(&mut rng);
        test.extend_from_slice(&rows[..k]);
        train.extend_from_slice(&rows[k..]);
    }

    if train.is_empty() || test.is_empty() {
        return Err(RiskError::InsufficientDataError(format!(
            "split of {} rows leaves an empty partition (train {}, test {})",
            n,
            train.len(),
            test.len()
        )));
    }
    train.shuffle(&mut rng);
    test.shuffle(&mut rng);
    Ok(SplitIndices { train, test })
}

/// Test rows per class: floor of the proportional share, then the remaining
/// rows by largest fractional part (ties to the lower class), capped so every
/// class keeps one training row and gets at least one test row when possible
fn allocate(by_class: &BTreeMap<i64, Vec<usize>>, n: usize, n_test: usize) -> Vec<usize> {
    let sizes: Vec<usize> = by_class.values().map(Vec::len).collect();
    let shares: Vec<f64> = sizes
        .iter()
        .map(|&s| s as f64 * n_test as f64 / n as f64)
        .collect();
    let mut alloc: Vec<usize> = shares
        .iter()
        .zip(&sizes)
        .map(|(&share, &s)| (share.floor() as usize).clamp(1, s - 1))
        .collect();

    let mut order: Vec<usize> = (0..sizes.len()).collect();
    order.sort_by(|&a, &b| {
        let fa = shares[a] - shares[a].floor();
        let fb = shares[b] - shares[b].floor();
        fb.total_cmp(&fa).then(a.cmp(&b))
    });

    let mut assigned: usize = alloc.iter().sum();
    while assigned < n_test {
        let mut progressed = false;
        for &c in &order {
            if assigned >= n_test {
                break;
            }
            if alloc[c] + 1 < sizes[c] {
                alloc[c] += 1;
                assigned += 1;
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }
    alloc
}
