//! Gradient Boosting implementation
//!
//! Gradient boosted regression trees with row and column subsampling. Classification
//! boosts log-odds; more than two classes are handled one-vs-rest.

use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use super::decision_tree::DecisionTree;
use crate::error::{DiagnosisError, Result};

/// Gradient Boosting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientBoostingConfig {
    /// Number of boosting rounds (trees)
    pub n_estimators: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Minimum samples per leaf
    pub min_samples_leaf: usize,
    /// Subsample ratio for each tree
    pub subsample: f64,
    /// Column subsample ratio
    pub colsample_bytree: f64,
    /// Random seed
    pub random_state: Option<u64>,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 6,
            min_samples_leaf: 1,
            subsample: 0.8,
            colsample_bytree: 0.8,
            random_state: Some(42),
        }
    }
}

/// Additive tree ensemble: `initial + learning_rate * sum(tree(x[cols]))`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostedTrees {
    trees: Vec<DecisionTree>,
    col_indices_per_tree: Vec<Vec<usize>>,
    initial: f64,
    learning_rate: f64,
}

impl BoostedTrees {
    /// Boost against `y`; `logistic` switches the loss from squared error to log loss
    fn fit(
        config: &GradientBoostingConfig,
        x: &Array2<f64>,
        y: &Array1<f64>,
        logistic: bool,
        rng: &mut Xoshiro256PlusPlus,
        importances: &mut [f64],
    ) -> Result<Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        let initial = if logistic {
            let p = y.mean().unwrap_or(0.5).clamp(1e-6, 1.0 - 1e-6);
            (p / (1.0 - p)).ln()
        } else {
            y.mean().unwrap_or(0.0)
        };

        let mut raw = Array1::from_elem(n_samples, initial);
        let mut trees = Vec::with_capacity(config.n_estimators);
        let mut col_indices_per_tree = Vec::with_capacity(config.n_estimators);

        for _ in 0..config.n_estimators {
            // Negative gradient of the loss
            let residuals: Array1<f64> = if logistic {
                y.iter()
                    .zip(raw.iter())
                    .map(|(yi, ri)| yi - 1.0 / (1.0 + (-ri).exp()))
                    .collect()
            } else {
                y - &raw
            };

            let sample_indices = subsample_indices(n_samples, config.subsample, rng);
            let col_indices = subsample_indices(n_features, config.colsample_bytree, rng);

            let x_sub = x
                .select(Axis(0), &sample_indices)
                .select(Axis(1), &col_indices);
            let y_sub: Array1<f64> = sample_indices.iter().map(|&i| residuals[i]).collect();

            let mut tree = DecisionTree::new_regressor()
                .with_max_depth(config.max_depth)
                .with_min_samples_leaf(config.min_samples_leaf);
            tree.fit(&x_sub, &y_sub)?;

            // Every row moves, not only the rows the tree was fitted on
            let tree_pred = tree.predict(&x.select(Axis(1), &col_indices))?;
            raw.scaled_add(config.learning_rate, &tree_pred);

            if let Some(tree_importance) = tree.feature_importances() {
                for (j, &col_idx) in col_indices.iter().enumerate() {
                    importances[col_idx] += tree_importance[j];
                }
            }

            trees.push(tree);
            col_indices_per_tree.push(col_indices);
        }

        Ok(Self {
            trees,
            col_indices_per_tree,
            initial,
            learning_rate: config.learning_rate,
        })
    }

    /// Raw additive output (log-odds for classifiers)
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let mut raw = Array1::from_elem(x.nrows(), self.initial);
        for (tree, cols) in self.trees.iter().zip(self.col_indices_per_tree.iter()) {
            let pred = tree.predict(&x.select(Axis(1), cols))?;
            raw.scaled_add(self.learning_rate, &pred);
        }
        Ok(raw)
    }

    /// (tree, column map) pairs; tree feature `j` is input column `cols[j]`
    pub fn trees(&self) -> impl Iterator<Item = (&DecisionTree, &[usize])> {
        self.trees
            .iter()
            .zip(self.col_indices_per_tree.iter().map(Vec::as_slice))
    }

    pub fn initial(&self) -> f64 {
        self.initial
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }
}

fn subsample_indices(n: usize, ratio: f64, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
    let sample_size = (((n as f64) * ratio).ceil() as usize).clamp(1, n.max(1));
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices.truncate(sample_size);
    indices.sort_unstable();
    indices
}

fn make_rng(config: &GradientBoostingConfig) -> Xoshiro256PlusPlus {
    match config.random_state {
        Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
        None => Xoshiro256PlusPlus::from_entropy(),
    }
}

fn normalize(importances: &mut [f64]) {
    let total: f64 = importances.iter().sum();
    if total > 0.0 {
        for imp in importances.iter_mut() {
            *imp /= total;
        }
    }
}

fn check_input(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(DiagnosisError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(DiagnosisError::ValidationError(
            "Gradient boosting needs at least one row and one feature".to_string(),
        ));
    }
    Ok(())
}

/// Gradient Boosting Regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    config: GradientBoostingConfig,
    ensemble: Option<BoostedTrees>,
    feature_importances: Vec<f64>,
}

impl GradientBoostingRegressor {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            ensemble: None,
            feature_importances: Vec::new(),
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_input(x, y)?;
        let mut rng = make_rng(&self.config);
        let mut importances = vec![0.0; x.ncols()];
        self.ensemble = Some(BoostedTrees::fit(
            &self.config,
            x,
            y,
            false,
            &mut rng,
            &mut importances,
        )?);
        normalize(&mut importances);
        self.feature_importances = importances;
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.ensemble()?.decision_function(x)
    }

    pub fn ensemble(&self) -> Result<&BoostedTrees> {
        self.ensemble.as_ref().ok_or(DiagnosisError::ModelNotFitted)
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }
}

/// Gradient Boosting Classifier over labels `0..K`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    config: GradientBoostingConfig,
    /// One ensemble for binary problems (class 1 log-odds), one per class otherwise
    ensembles: Vec<BoostedTrees>,
    n_classes: usize,
    feature_importances: Vec<f64>,
}

impl GradientBoostingClassifier {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            ensembles: Vec::new(),
            n_classes: 0,
            feature_importances: Vec::new(),
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_input(x, y)?;
        let n_classes = y.iter().fold(0.0f64, |m, &v| m.max(v.round())) as usize + 1;
        if n_classes < 2 {
            return Err(DiagnosisError::TrainingError(
                "Classification needs at least two classes".to_string(),
            ));
        }

        let mut rng = make_rng(&self.config);
        let mut importances = vec![0.0; x.ncols()];
        let targets: Vec<usize> = if n_classes == 2 { vec![1] } else { (0..n_classes).collect() };

        let mut ensembles = Vec::with_capacity(targets.len());
        for class in targets {
            let y_bin: Array1<f64> = y
                .iter()
                .map(|&v| if v.round() as usize == class { 1.0 } else { 0.0 })
                .collect();
            ensembles.push(BoostedTrees::fit(
                &self.config,
                x,
                &y_bin,
                true,
                &mut rng,
                &mut importances,
            )?);
        }

        normalize(&mut importances);
        self.ensembles = ensembles;
        self.n_classes = n_classes;
        self.feature_importances = importances;
        Ok(self)
    }

    /// Class probabilities, shape (n_samples, n_classes)
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.ensembles.is_empty() {
            return Err(DiagnosisError::ModelNotFitted);
        }
        let sigmoid = |v: f64| 1.0 / (1.0 + (-v).exp());
        let mut proba = Array2::zeros((x.nrows(), self.n_classes));

        if self.n_classes == 2 {
            let raw = self.ensembles[0].decision_function(x)?;
            for (i, &r) in raw.iter().enumerate() {
                let p = sigmoid(r);
                proba[[i, 0]] = 1.0 - p;
                proba[[i, 1]] = p;
            }
        } else {
            for (c, ensemble) in self.ensembles.iter().enumerate() {
                let raw = ensemble.decision_function(x)?;
                proba.column_mut(c).assign(&raw.mapv(sigmoid));
            }
            for mut row in proba.rows_mut() {
                let sum = row.sum();
                if sum > 0.0 {
                    row /= sum;
                }
            }
        }
        Ok(proba)
    }

    /// Predict class labels; the lowest label wins ties
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
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
    }

    pub fn ensembles(&self) -> &[BoostedTrees] {
        &self.ensembles
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }
}
