//! Random Forest implementation

use super::decision_tree::DecisionTree;
use crate::error::{DiagnosisError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Random Forest model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    /// Individual trees
    trees: Vec<DecisionTree>,
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: Option<usize>,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Maximum features per split
    pub max_features: MaxFeatures,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Random state
    pub random_state: Option<u64>,
    /// Is classification task
    is_classification: bool,
    /// Feature importances
    feature_importances: Option<Array1<f64>>,
    /// Number of features
    n_features: usize,
    /// Number of classes (classification)
    n_classes: usize,
}

/// Strategy for max features
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// All features
    All,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new_classifier(100)
    }
}

impl RandomForest {
    /// Classifier forest; considers sqrt(n_features) per split
    pub fn new_classifier(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            random_state: None,
            is_classification: true,
            feature_importances: None,
            n_features: 0,
            n_classes: 0,
        }
    }

    /// Regressor forest; considers every feature per split
    pub fn new_regressor(n_estimators: usize) -> Self {
        Self {
            max_features: MaxFeatures::All,
            is_classification: false,
            ..Self::new_classifier(n_estimators)
        }
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    fn compute_max_features(&self, n_features: usize) -> usize {
        match self.max_features {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::All => n_features,
        }
        .max(1)
    }

    /// Fit the forest to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(DiagnosisError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if self.n_estimators == 0 {
            return Err(DiagnosisError::ValidationError(
                "n_estimators must be positive".to_string(),
            ));
        }

        self.n_features = n_features;
        let max_features = self.compute_max_features(n_features);
        if self.is_classification {
            self.n_classes = y.iter().fold(0.0f64, |m, &v| m.max(v.round())) as usize + 1;
        }

        let base_seed = self.random_state.unwrap_or(42);

        // Trees are built in parallel; collect keeps them in index order
        let trees: Vec<DecisionTree> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let seed = base_seed.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);

                let sample_indices: Vec<usize> = if self.bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };

                let x_boot = x.select(Axis(0), &sample_indices);
                let y_boot: Array1<f64> = sample_indices.iter().map(|&i| y[i]).collect();

                let mut tree = if self.is_classification {
                    DecisionTree::new_classifier().with_n_classes(self.n_classes)
                } else {
                    DecisionTree::new_regressor()
                };
                if let Some(d) = self.max_depth {
                    tree = tree.with_max_depth(d);
                }
                tree = tree
                    .with_min_samples_leaf(self.min_samples_leaf)
                    .with_max_features(max_features)
                    .with_random_state(seed);

                tree.fit(&x_boot, &y_boot)?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        self.trees = trees;
        self.compute_feature_importances();

        Ok(self)
    }

    fn compute_feature_importances(&mut self) {
        let mut total = vec![0.0; self.n_features];
        for tree in &self.trees {
            if let Some(imp) = tree.feature_importances() {
                for (i, &val) in imp.iter().enumerate() {
                    total[i] += val;
                }
            }
        }
        let sum: f64 = total.iter().sum();
        if sum > 0.0 {
            for imp in &mut total {
                *imp /= sum;
            }
        }
        self.feature_importances = Some(Array1::from_vec(total));
    }

    /// Predictions: argmax of averaged class proportions, or the mean of tree outputs
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(DiagnosisError::ModelNotFitted);
        }

        if self.is_classification {
            let proba = self.predict_proba(x)?;
            Ok(proba
                .rows()
                .into_iter()
                .map(|row| {
                    let mut best = 0;
                    for (c, &p) in row.iter().enumerate() {
                        if p > row[best] {
                            best = c;
                        }
                    }
                    best as f64
                })
                .collect())
        } else {
            let all: Vec<Array1<f64>> = self
                .trees
                .par_iter()
                .map(|tree| tree.predict(x))
                .collect::<Result<Vec<_>>>()?;
            let mut sum = Array1::zeros(x.nrows());
            for p in &all {
                sum += p;
            }
            Ok(sum / all.len() as f64)
        }
    }

    /// Class probabilities averaged over the trees (classification only)
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.trees.is_empty() {
            return Err(DiagnosisError::ModelNotFitted);
        }
        if !self.is_classification {
            return Err(DiagnosisError::ValidationError(
                "predict_proba is only available for classification".to_string(),
            ));
        }

        let all: Vec<Array2<f64>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict_proba(x))
            .collect::<Result<Vec<_>>>()?;

        let mut proba = Array2::zeros((x.nrows(), self.n_classes));
        for p in &all {
            proba += p;
        }
        Ok(proba / all.len() as f64)
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    pub fn is_classification(&self) -> bool {
        self.is_classification
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}
