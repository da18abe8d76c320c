//! Cross-validation splitters

use crate::error::{DiagnosisError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cross-validation strategy. Neither strategy shuffles, so splits depend only on row order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CVStrategy {
    /// Contiguous folds
    KFold { n_splits: usize },
    /// Maintains class distribution per fold
    StratifiedKFold { n_splits: usize },
}

impl CVStrategy {
    pub fn n_splits(&self) -> usize {
        match self {
            CVStrategy::KFold { n_splits } | CVStrategy::StratifiedKFold { n_splits } => *n_splits,
        }
    }
}

/// A single train/test split
#[derive(Debug, Clone)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Cross-validation splitter
pub struct CrossValidator {
    strategy: CVStrategy,
}

impl CrossValidator {
    pub fn new(strategy: CVStrategy) -> Self {
        Self { strategy }
    }

    /// Generate train/test splits; stratification needs the encoded labels
    pub fn split(&self, n_samples: usize, y: Option<&Array1<f64>>) -> Result<Vec<CVSplit>> {
        let n_splits = self.strategy.n_splits();
        if n_splits < 2 {
            return Err(DiagnosisError::ValidationError(
                "n_splits must be at least 2".to_string(),
            ));
        }
        if n_samples < n_splits {
            return Err(DiagnosisError::ValidationError(format!(
                "n_samples ({}) must be >= n_splits ({})",
                n_samples, n_splits
            )));
        }

        let folds = match self.strategy {
            CVStrategy::KFold { .. } => Self::k_fold(n_samples, n_splits),
            CVStrategy::StratifiedKFold { .. } => {
                let y = y.ok_or_else(|| {
                    DiagnosisError::ValidationError(
                        "StratifiedKFold requires target array".to_string(),
                    )
                })?;
                Self::stratified(y, n_splits)
            }
        };

        let splits = (0..n_splits)
            .map(|fold_idx| {
                let test_indices = folds[fold_idx].clone();
                let mut train_indices: Vec<usize> = folds
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != fold_idx)
                    .flat_map(|(_, f)| f.iter().copied())
                    .collect();
                train_indices.sort_unstable();
                CVSplit {
                    train_indices,
                    test_indices,
                    fold_idx,
                }
            })
            .collect();
        Ok(splits)
    }

    fn k_fold(n_samples: usize, n_splits: usize) -> Vec<Vec<usize>> {
        let base = n_samples / n_splits;
        let remainder = n_samples % n_splits;
        let mut folds = Vec::with_capacity(n_splits);
        let mut current = 0;
        for i in 0..n_splits {
            let size = if i < remainder { base + 1 } else { base };
            folds.push((current..current + size).collect());
            current += size;
        }
        folds
    }

    /// Deal each class's rows round-robin over the folds, classes in sorted order
    fn stratified(y: &Array1<f64>, n_splits: usize) -> Vec<Vec<usize>> {
        let mut class_indices: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (idx, &val) in y.iter().enumerate() {
            class_indices.entry(val.round() as i64).or_default().push(idx);
        }

        let mut folds: Vec<Vec<usize>> = vec![Vec::new(); n_splits];
        let mut offset = 0;
        for indices in class_indices.values() {
            for (i, &idx) in indices.iter().enumerate() {
                folds[(i + offset) % n_splits].push(idx);
            }
            // Continue where the previous class stopped so fold sizes stay balanced
            offset = (offset + indices.len()) % n_splits;
        }
        for fold in &mut folds {
            fold.sort_unstable();
        }
        folds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kfold_covers_all_rows_once() {
        let splits = CrossValidator::new(CVStrategy::KFold { n_splits: 3 })
            .split(10, None)
            .unwrap();
        assert_eq!(splits.len(), 3);
        let mut all: Vec<usize> = splits.iter().flat_map(|s| s.test_indices.clone()).collect();
        all.sort();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
        assert_eq!(splits[0].test_indices, vec![0, 1, 2, 3]);
        assert_eq!(splits[0].train_indices.len(), 6);
    }

    #[test]
    fn test_stratified_keeps_minority_in_every_fold() {
        let y: Array1<f64> = (0..30).map(|i| if i < 24 { 0.0 } else { 1.0 }).collect();
        let splits = CrossValidator::new(CVStrategy::StratifiedKFold { n_splits: 3 })
            .split(30, Some(&y))
            .unwrap();
        for split in &splits {
            let minority = split.test_indices.iter().filter(|&&i| y[i] == 1.0).count();
            assert_eq!(minority, 2, "fold {} minority count", split.fold_idx);
            assert_eq!(split.test_indices.len(), 10);
        }
    }

    #[test]
    fn test_splits_are_deterministic() {
        let y: Array1<f64> = (0..20).map(|i| (i % 3) as f64).collect();
        let cv = CrossValidator::new(CVStrategy::StratifiedKFold { n_splits: 4 });
        let a = cv.split(20, Some(&y)).unwrap();
        let b = cv.split(20, Some(&y)).unwrap();
        for (sa, sb) in a.iter().zip(b.iter()) {
            assert_eq!(sa.test_indices, sb.test_indices);
        }
    }

    #[test]
    fn test_too_few_samples() {
        let result = CrossValidator::new(CVStrategy::KFold { n_splits: 5 }).split(3, None);
        assert!(matches!(result, Err(DiagnosisError::ValidationError(_))));
    }
}
