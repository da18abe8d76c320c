//! SMOTE oversampling

use crate::error::{DiagnosisError, Result};
use ndarray::{Array2, ArrayView1};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

/// Ordered float for BinaryHeap-based partial sort
#[derive(Debug, Clone, Copy)]
struct DistIdx(f64, usize);

impl PartialEq for DistIdx {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for DistIdx {}
impl PartialOrd for DistIdx {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for DistIdx {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0).then(self.1.cmp(&other.1))
    }
}

/// Oversampled training data; original rows first, synthetic rows after
#[derive(Debug, Clone)]
pub struct Resampled {
    pub x: Array2<f64>,
    pub y: Vec<usize>,
    /// Rows added per class
    pub n_synthetic: BTreeMap<usize, usize>,
}

/// SMOTE (Synthetic Minority Over-sampling Technique)
///
/// Every class is grown to the majority count by interpolating between a class member and
/// one of its `k` nearest same-class neighbours. Classes with a single row have no
/// neighbours and are duplicated instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Smote {
    k_neighbors: usize,
    seed: u64,
}

impl Default for Smote {
    fn default() -> Self {
        Self::new()
    }
}

impl Smote {
    pub fn new() -> Self {
        Self {
            k_neighbors: 5,
            seed: 42,
        }
    }

    pub fn with_k_neighbors(mut self, k: usize) -> Self {
        self.k_neighbors = k.max(1);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum::<f64>()
    }

    /// k nearest members of `members` to `members[position]`, excluding itself
    fn find_neighbors(x: &Array2<f64>, members: &[usize], position: usize, k: usize) -> Vec<usize> {
        let point = x.row(members[position]);
        let mut heap: BinaryHeap<DistIdx> = BinaryHeap::with_capacity(k + 1);
        for (j, &row) in members.iter().enumerate() {
            if j == position {
                continue;
            }
            let d = DistIdx(Self::distance(point, x.row(row)), j);
            if heap.len() < k {
                heap.push(d);
            } else if heap.peek().map_or(false, |worst| d < *worst) {
                heap.pop();
                heap.push(d);
            }
        }
        let mut neighbors: Vec<usize> = heap.into_iter().map(|DistIdx(_, j)| j).collect();
        neighbors.sort_unstable();
        neighbors
    }

    pub fn fit_resample(&self, x: &Array2<f64>, y: &[usize]) -> Result<Resampled> {
        if x.nrows() != y.len() {
            return Err(DiagnosisError::ShapeError {
                expected: format!("{} labels", x.nrows()),
                actual: format!("{} labels", y.len()),
            });
        }
        let mut members: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (i, &label) in y.iter().enumerate() {
            members.entry(label).or_default().push(i);
        }
        if members.len() < 2 {
            return Err(DiagnosisError::ValidationError(
                "Need at least 2 classes for SMOTE".to_string(),
            ));
        }

        let majority = members.values().map(Vec::len).max().unwrap_or(0);
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut synthetic: Vec<Vec<f64>> = Vec::new();
        let mut synthetic_y: Vec<usize> = Vec::new();
        let mut n_synthetic = BTreeMap::new();

        for (&class, rows) in &members {
            let needed = majority - rows.len();
            n_synthetic.insert(class, needed);
            if needed == 0 {
                continue;
            }
            let k = self.k_neighbors.min(rows.len() - 1);

            for _ in 0..needed {
                let position = rng.gen_range(0..rows.len());
                let base = x.row(rows[position]);
                let sample: Vec<f64> = if k == 0 {
                    base.to_vec()
                } else {
                    let neighbors = Self::find_neighbors(x, rows, position, k);
                    let neighbor = x.row(rows[neighbors[rng.gen_range(0..neighbors.len())]]);
                    let gap: f64 = rng.gen();
                    base.iter()
                        .zip(neighbor.iter())
                        .map(|(&p, &n)| p + gap * (n - p))
                        .collect()
                };
                synthetic.push(sample);
                synthetic_y.push(class);
            }
        }

        let n_original = x.nrows();
        let n_total = n_original + synthetic.len();
        let result_x = Array2::from_shape_fn((n_total, x.ncols()), |(i, j)| {
            if i < n_original {
                x[[i, j]]
            } else {
                synthetic[i - n_original][j]
            }
        });
        let mut result_y = y.to_vec();
        result_y.extend(synthetic_y);

        Ok(Resampled {
            x: result_x,
            y: result_y,
            n_synthetic,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_balances_classes() {
        let x = Array2::from_shape_fn((12, 2), |(i, j)| (i * 2 + j) as f64);
        let y: Vec<usize> = (0..12).map(|i| if i < 9 { 0 } else { 1 }).collect();
        let resampled = Smote::new().fit_resample(&x, &y).unwrap();

        assert_eq!(resampled.x.nrows(), 18);
        assert_eq!(resampled.y.iter().filter(|&&c| c == 1).count(), 9);
        assert_eq!(resampled.n_synthetic[&1], 6);
        assert_eq!(resampled.n_synthetic[&0], 0);
        // Synthetic minority rows stay inside the minority's bounding box
        for i in 12..18 {
            assert!(resampled.x[[i, 0]] >= 18.0 && resampled.x[[i, 0]] <= 22.0);
        }
    }

    #[test]
    fn test_single_row_class_is_duplicated() {
        let x = array![[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [9.0, 9.0]];
        let y = vec![0, 0, 0, 1];
        let resampled = Smote::new().fit_resample(&x, &y).unwrap();
        for i in 4..resampled.x.nrows() {
            assert_eq!(resampled.x.row(i), x.row(3));
        }
    }

    #[test]
    fn test_deterministic_with_seed() {
        let x = Array2::from_shape_fn((10, 2), |(i, j)| ((i * 5 + j * 3) % 7) as f64);
        let y: Vec<usize> = (0..10).map(|i| usize::from(i >= 7)).collect();
        let a = Smote::new().with_seed(3).fit_resample(&x, &y).unwrap();
        let b = Smote::new().with_seed(3).fit_resample(&x, &y).unwrap();
        assert_eq!(a.x, b.x);
    }

    #[test]
    fn test_single_class_rejected() {
        let x = array![[0.0], [1.0]];
        assert!(Smote::new().fit_resample(&x, &[0, 0]).is_err());
    }
}
