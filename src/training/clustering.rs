//! K-Means clustering
//!
//! Unsupervised: `fit()` takes X only and assigns cluster labels.

use crate::error::{DiagnosisError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// K-Means clustering with k-means++ initialization and multiple restarts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KMeans {
    pub n_clusters: usize,
    /// Number of initializations; the run with the lowest inertia is kept
    pub n_init: usize,
    pub max_iter: usize,
    pub tol: f64,
    pub random_state: Option<u64>,
    /// Fitted cluster centroids (n_clusters × n_features)
    centroids: Option<Array2<f64>>,
    /// Cluster label per training row
    labels: Option<Array1<usize>>,
    /// Sum of squared distances to nearest centroid
    inertia: Option<f64>,
}

impl Default for KMeans {
    fn default() -> Self {
        Self::new(3)
    }
}

fn euclidean_sq(a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

fn nearest(row: &ArrayView1<f64>, centroids: &Array2<f64>) -> (usize, f64) {
    let mut best_c = 0;
    let mut best_dist = f64::MAX;
    for (c, centroid) in centroids.rows().into_iter().enumerate() {
        let d = euclidean_sq(row, &centroid);
        if d < best_dist {
            best_dist = d;
            best_c = c;
        }
    }
    (best_c, best_dist)
}

impl KMeans {
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            n_init: 10,
            max_iter: 300,
            tol: 1e-4,
            random_state: Some(42),
            centroids: None,
            labels: None,
            inertia: None,
        }
    }

    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init.max(1);
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// K-means++ initialization: pick centroids spread apart
    fn kmeans_pp_init(x: &Array2<f64>, k: usize, rng: &mut ChaCha8Rng) -> Array2<f64> {
        let n_samples = x.nrows();
        let mut centroids = Array2::zeros((k, x.ncols()));

        let first = rng.gen_range(0..n_samples);
        centroids.row_mut(0).assign(&x.row(first));

        for c in 1..k {
            let dists: Vec<f64> = x
                .rows()
                .into_iter()
                .map(|row| {
                    (0..c)
                        .map(|j| euclidean_sq(&row, &centroids.row(j)))
                        .fold(f64::MAX, f64::min)
                })
                .collect();

            // Weighted random selection proportional to D²
            let total: f64 = dists.iter().sum();
            let chosen = if total <= 0.0 {
                rng.gen_range(0..n_samples)
            } else {
                let r = rng.gen::<f64>() * total;
                let mut cumulative = 0.0;
                let mut chosen = n_samples - 1;
                for (i, &d) in dists.iter().enumerate() {
                    cumulative += d;
                    if cumulative >= r && d > 0.0 {
                        chosen = i;
                        break;
                    }
                }
                chosen
            };
            centroids.row_mut(c).assign(&x.row(chosen));
        }

        centroids
    }

    /// One Lloyd run from a k-means++ start; returns (centroids, labels, inertia)
    fn run_once(&self, x: &Array2<f64>, rng: &mut ChaCha8Rng) -> (Array2<f64>, Array1<usize>, f64) {
        let n_samples = x.nrows();
        let mut centroids = Self::kmeans_pp_init(x, self.n_clusters, rng);
        let mut labels: Array1<usize> = Array1::from_elem(n_samples, usize::MAX);

        for _ in 0..self.max_iter {
            // Assignment step
            let new_labels: Vec<usize> = (0..n_samples)
                .into_par_iter()
                .map(|i| nearest(&x.row(i), &centroids).0)
                .collect();
            let changed = new_labels
                .iter()
                .zip(labels.iter())
                .filter(|(a, b)| a != b)
                .count();
            labels = Array1::from_vec(new_labels);

            // Update step
            let mut new_centroids = Array2::zeros(centroids.dim());
            let mut counts = vec![0usize; self.n_clusters];
            for (i, &c) in labels.iter().enumerate() {
                counts[c] += 1;
                let mut row = new_centroids.row_mut(c);
                row += &x.row(i);
            }
            for c in 0..self.n_clusters {
                if counts[c] > 0 {
                    let mut row = new_centroids.row_mut(c);
                    row /= counts[c] as f64;
                } else {
                    // Empty cluster: reseed from a random row
                    let idx = rng.gen_range(0..n_samples);
                    new_centroids.row_mut(c).assign(&x.row(idx));
                }
            }

            let shift: f64 = centroids
                .iter()
                .zip(new_centroids.iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f64>()
                .sqrt();
            centroids = new_centroids;

            if changed == 0 || shift < self.tol {
                break;
            }
        }

        // Final assignment against the final centroids
        let mut inertia = 0.0;
        for (i, row) in x.rows().into_iter().enumerate() {
            let (c, d) = nearest(&row, &centroids);
            labels[i] = c;
            inertia += d;
        }
        (centroids, labels, inertia)
    }

    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        if self.n_clusters == 0 {
            return Err(DiagnosisError::ValidationError(
                "n_clusters must be positive".to_string(),
            ));
        }
        if n_samples < self.n_clusters {
            return Err(DiagnosisError::TrainingError(format!(
                "n_samples ({}) < n_clusters ({})",
                n_samples, self.n_clusters
            )));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(DiagnosisError::ValidationError(
                "Non-finite values in clustering input".to_string(),
            ));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(42));
        let mut best: Option<(Array2<f64>, Array1<usize>, f64)> = None;
        for _ in 0..self.n_init.max(1) {
            let run = self.run_once(x, &mut rng);
            if best.as_ref().map_or(true, |b| run.2 < b.2) {
                best = Some(run);
            }
        }

        if let Some((centroids, labels, inertia)) = best {
            self.centroids = Some(centroids);
            self.labels = Some(labels);
            self.inertia = Some(inertia);
        }
        Ok(self)
    }

    /// Nearest-centroid label for each row
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        let centroids = self.centroids.as_ref().ok_or(DiagnosisError::ModelNotFitted)?;
        Ok(x.rows().into_iter().map(|row| nearest(&row, centroids).0).collect())
    }

    pub fn centroids(&self) -> Option<&Array2<f64>> {
        self.centroids.as_ref()
    }

    pub fn labels(&self) -> Option<&Array1<usize>> {
        self.labels.as_ref()
    }

    pub fn inertia(&self) -> Option<f64> {
        self.inertia
    }
}
