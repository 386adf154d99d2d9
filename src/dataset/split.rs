//! Deterministic train/test splitting and cross-validation folds.
//!
//! Both operate on row indices so the same partition can be applied to records,
//! feature matrices and label vectors without copying them first.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SplitError {
    #[error("cannot split an empty dataset")]
    Empty,
    #[error("test fraction must be in (0, 1), got {0}")]
    InvalidFraction(f64),
    #[error("need at least 2 rows to hold out a test set, got {0}")]
    TooFewRows(usize),
    #[error("fold count must be >= 2, got {0}")]
    TooFewFolds(usize),
    #[error("cannot build {folds} folds from {rows} rows")]
    MoreFoldsThanRows { folds: usize, rows: usize },
}

/// Row indices of a single held-out split, each side in ascending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Indices of one cross-validation round: fit on `train`, score on `validation`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldIndices {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
}

/// Split `n_rows` rows into disjoint train and test index sets.
///
/// Rows are ranked by a seeded hash of their index and the lowest-ranked
/// `round(test_fraction * n_rows)` rows form the test set. At least one row
/// lands on each side. Both sides keep the original row order.
pub fn train_test_split(
    n_rows: usize,
    test_fraction: f64,
    seed: u64,
) -> Result<TrainTestSplit, SplitError> {
    if n_rows == 0 {
        return Err(SplitError::Empty);
    }
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(SplitError::InvalidFraction(test_fraction));
    }
    if n_rows < 2 {
        return Err(SplitError::TooFewRows(n_rows));
    }
    let test_n = ((n_rows as f64) * test_fraction).round() as usize;
    let test_n = test_n.clamp(1, n_rows - 1);

    let mut ranked: Vec<(u128, usize)> = (0..n_rows)
        .map(|idx| (row_rank(seed, idx), idx))
        .collect();
    ranked.sort_unstable();

    let mut is_test = vec![false; n_rows];
    for &(_, idx) in ranked.iter().take(test_n) {
        is_test[idx] = true;
    }
    let (test, train): (Vec<usize>, Vec<usize>) = (0..n_rows).partition(|&idx| is_test[idx]);
    Ok(TrainTestSplit { train, test })
}

fn row_rank(seed: u64, idx: usize) -> u128 {
    let hash = blake3::hash(format!("studypass-split|{seed}|{idx}").as_bytes());
    let mut key = [0u8; 16];
    key.copy_from_slice(&hash.as_bytes()[0..16]);
    u128::from_le_bytes(key)
}

/// Partition `0..n_rows` into `k` disjoint folds covering every row once.
///
/// Fold sizes differ by at most one; larger folds come first. Indices inside a
/// fold are sorted.
pub fn cross_validation_folds(
    n_rows: usize,
    k: usize,
    seed: u64,
) -> Result<Vec<Vec<usize>>, SplitError> {
    if n_rows == 0 {
        return Err(SplitError::Empty);
    }
    if k < 2 {
        return Err(SplitError::TooFewFolds(k));
    }
    if k > n_rows {
        return Err(SplitError::MoreFoldsThanRows {
            folds: k,
            rows: n_rows,
        });
    }
    let mut indices: Vec<usize> = (0..n_rows).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let base = n_rows / k;
    let extra = n_rows % k;
    let mut folds = Vec::with_capacity(k);
    let mut start = 0usize;
    for fold_idx in 0..k {
        let size = base + usize::from(fold_idx < extra);
        let mut fold = indices[start..start + size].to_vec();
        fold.sort_unstable();
        folds.push(fold);
        start += size;
    }
    Ok(folds)
}

/// Expand folds into (train, validation) pairs, one per fold.
pub fn fold_pairs(folds: &[Vec<usize>]) -> Vec<FoldIndices> {
    (0..folds.len())
        .map(|held_out| {
            let mut train: Vec<usize> = folds
                .iter()
                .enumerate()
                .filter(|(idx, _)| *idx != held_out)
                .flat_map(|(_, fold)| fold.iter().copied())
                .collect();
            train.sort_unstable();
            FoldIndices {
                train,
                validation: folds[held_out].clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_is_deterministic_for_seed() {
        let a = train_test_split(40, 0.2, 7).unwrap();
        let b = train_test_split(40, 0.2, 7).unwrap();
        assert_eq!(a, b);
        let c = train_test_split(40, 0.2, 8).unwrap();
        assert_ne!(a.test, c.test);
    }

    #[test]
    fn split_is_disjoint_ordered_and_sized() {
        let split = train_test_split(63, 0.2, 0).unwrap();
        assert_eq!(split.test.len(), 13);
        assert_eq!(split.train.len(), 50);
        assert!(split.test.windows(2).all(|w| w[0] < w[1]));
        assert!(split.train.windows(2).all(|w| w[0] < w[1]));
        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..63).collect::<Vec<_>>());
    }

    #[test]
    fn split_keeps_both_sides_non_empty() {
        let split = train_test_split(2, 0.01, 3).unwrap();
        assert_eq!(split.test.len(), 1);
        assert_eq!(split.train.len(), 1);
        assert_eq!(train_test_split(1, 0.2, 0), Err(SplitError::TooFewRows(1)));
        assert_eq!(
            train_test_split(10, 1.0, 0),
            Err(SplitError::InvalidFraction(1.0))
        );
    }

    #[test]
    fn five_folds_of_fifty_rows() {
        let folds = cross_validation_folds(50, 5, 0).unwrap();
        assert_eq!(folds.len(), 5);
        assert!(folds.iter().all(|fold| fold.len() == 10));
        let mut all: Vec<usize> = folds.iter().flatten().copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn uneven_folds_put_extra_rows_first() {
        let folds = cross_validation_folds(12, 5, 1).unwrap();
        let sizes: Vec<usize> = folds.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![3, 3, 2, 2, 2]);
        assert_eq!(
            cross_validation_folds(3, 5, 1),
            Err(SplitError::MoreFoldsThanRows { folds: 5, rows: 3 })
        );
    }

    #[test]
    fn fold_pairs_hold_out_each_fold_once() {
        let folds = cross_validation_folds(10, 5, 2).unwrap();
        let pairs = fold_pairs(&folds);
        assert_eq!(pairs.len(), 5);
        for (pair, fold) in pairs.iter().zip(&folds) {
            assert_eq!(&pair.validation, fold);
            assert_eq!(pair.train.len(), 8);
            assert!(pair.train.iter().all(|idx| !fold.contains(idx)));
        }
    }
}
