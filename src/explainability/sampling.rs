//! Model-agnostic Shapley estimation by permutation sampling

use crate::error::{DiagnosisError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Estimates Shapley values of a black-box scoring function.
///
/// Each permutation walks the features in random order, switching them one by one from a
/// random background row to the explained row; a feature's value is the average change in
/// output when it is switched.
pub struct PermutationExplainer {
    background: Array2<f64>,
    n_permutations: usize,
    seed: u64,
}

impl PermutationExplainer {
    pub fn new(background: Array2<f64>) -> Self {
        Self {
            background,
            n_permutations: 50,
            seed: 42,
        }
    }

    pub fn with_permutations(mut self, n: usize) -> Self {
        self.n_permutations = n.max(1);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Mean output over the background rows
    pub fn base_value<F>(&self, score: &F) -> Result<f64>
    where
        F: Fn(&Array2<f64>) -> Result<Array1<f64>>,
    {
        Ok(score(&self.background)?.mean().unwrap_or(0.0))
    }

    /// Attributions for one row. `row_index` only perturbs the seed.
    pub fn explain_row<F>(&self, score: &F, instance: ArrayView1<f64>, row_index: usize) -> Result<Array1<f64>>
    where
        F: Fn(&Array2<f64>) -> Result<Array1<f64>>,
    {
        let n_features = instance.len();
        if self.background.nrows() == 0 {
            return Err(DiagnosisError::ComputationError(
                "Permutation sampling needs at least one background row".to_string(),
            ));
        }
        if self.background.ncols() != n_features {
            return Err(DiagnosisError::ShapeError {
                expected: format!("{} features", self.background.ncols()),
                actual: format!("{} features", n_features),
            });
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(row_index as u64));
        let steps = n_features + 1;
        let mut permutations = Vec::with_capacity(self.n_permutations);
        // All coalitions of all permutations go through the model in one call
        let mut coalitions = Array2::zeros((self.n_permutations * steps, n_features));

        for p in 0..self.n_permutations {
            let mut order: Vec<usize> = (0..n_features).collect();
            order.shuffle(&mut rng);
            let reference = self.background.row(rng.gen_range(0..self.background.nrows()));

            let mut current = reference.to_owned();
            coalitions.row_mut(p * steps).assign(&current);
            for (k, &feature) in order.iter().enumerate() {
                current[feature] = instance[feature];
                coalitions.row_mut(p * steps + k + 1).assign(&current);
            }
            permutations.push(order);
        }

        let outputs = score(&coalitions)?;
        if outputs.len() != coalitions.nrows() {
            return Err(DiagnosisError::ShapeError {
                expected: format!("{} outputs", coalitions.nrows()),
                actual: format!("{} outputs", outputs.len()),
            });
        }

        let mut phi = Array1::zeros(n_features);
        for (p, order) in permutations.iter().enumerate() {
            for (k, &feature) in order.iter().enumerate() {
                let before = outputs[p * steps + k];
                let after = outputs[p * steps + k + 1];
                phi[feature] += after - before;
            }
        }
        Ok(phi / self.n_permutations as f64)
    }
}
