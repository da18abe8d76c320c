//! Attribution over a bounded sample of rows

use super::sampling::PermutationExplainer;
use super::tree_shap;
use crate::config::ExplainConfig;
use crate::error::{DiagnosisError, Result};
use crate::profiling::TaskType;
use crate::training::{FittedModel, ModelCapability, OutputTarget, TreeEnsembleView};
use ndarray::{Array1, Array2, Axis};
use rand::seq::index::sample;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which estimator produced the attributions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributionMethod {
    TreeShap,
    PermutationSampling,
}

impl AttributionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributionMethod::TreeShap => "tree_shap",
            AttributionMethod::PermutationSampling => "permutation_sampling",
        }
    }
}

/// Attributions for the sampled rows.
///
/// `values[i]` explains the model score behind `predictions[i]`: the predicted class's score
/// for classifiers, the prediction for regressors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplanationSample {
    /// Sampled rows of the feature matrix
    pub rows: Array2<f64>,
    /// Source row of each sampled row, ascending
    pub row_indices: Vec<usize>,
    /// rows × features
    pub values: Array2<f64>,
    /// Expected score each row's attributions start from
    pub base_values: Array1<f64>,
    pub predictions: Array1<f64>,
    pub method: AttributionMethod,
}

impl ExplanationSample {
    pub fn n_rows(&self) -> usize {
        self.row_indices.len()
    }

    /// Mean |attribution| per feature
    pub fn mean_abs(&self) -> Array1<f64> {
        if self.values.nrows() == 0 {
            return Array1::zeros(self.values.ncols());
        }
        self.values.mapv(f64::abs).mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(self.values.ncols()))
    }

    /// Base value averaged over the sampled rows
    pub fn base_value(&self) -> f64 {
        self.base_values.mean().unwrap_or(0.0)
    }
}

/// Computes attributions for a fitted model
#[derive(Debug, Clone)]
pub struct Explainer {
    config: ExplainConfig,
    seed: u64,
}

impl Explainer {
    pub fn new(config: ExplainConfig) -> Self {
        Self { config, seed: 42 }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Rows to explain: everything up to the cap, else a seeded subsample in source order
    pub fn sample_indices(&self, n_rows: usize) -> Vec<usize> {
        let cap = self.config.sample_size;
        if n_rows <= cap {
            return (0..n_rows).collect();
        }
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut indices = sample(&mut rng, n_rows, cap).into_vec();
        indices.sort_unstable();
        indices
    }

    pub fn explain(&self, model: &FittedModel, x: &Array2<f64>) -> Result<ExplanationSample> {
        if x.ncols() != model.n_features() {
            return Err(DiagnosisError::ShapeError {
                expected: format!("{} features", model.n_features()),
                actual: format!("{} features", x.ncols()),
            });
        }
        let row_indices = self.sample_indices(x.nrows());
        let rows = x.select(Axis(0), &row_indices);
        let predictions = model.predict(&rows)?;
        let targets: Vec<OutputTarget> = predictions
            .iter()
            .map(|&p| match model.task_type() {
                TaskType::Classification => OutputTarget::Class(p.round().max(0.0) as usize),
                TaskType::Regression => OutputTarget::Value,
            })
            .collect();

        let (values, base_values, method) = match model.capability() {
            ModelCapability::TreeBased => {
                let (values, base) = self.tree_attributions(model, &rows, &targets)?;
                (values, base, AttributionMethod::TreeShap)
            }
            ModelCapability::Generic => {
                let (values, base) = self.sampled_attributions(model, x, &rows, &targets)?;
                (values, base, AttributionMethod::PermutationSampling)
            }
        };

        Ok(ExplanationSample {
            rows,
            row_indices,
            values,
            base_values,
            predictions,
            method,
        })
    }

    fn tree_attributions(
        &self,
        model: &FittedModel,
        rows: &Array2<f64>,
        targets: &[OutputTarget],
    ) -> Result<(Array2<f64>, Array1<f64>)> {
        let mut views: BTreeMap<OutputTarget, TreeEnsembleView<'_>> = BTreeMap::new();
        for &target in targets {
            if !views.contains_key(&target) {
                views.insert(target, model.tree_view(target)?);
            }
        }
        let expected: BTreeMap<OutputTarget, f64> = views
            .iter()
            .map(|(&target, view)| (target, tree_shap::expected_value(view)))
            .collect();

        let n_features = rows.ncols();
        let per_row: Vec<Array1<f64>> = (0..rows.nrows())
            .into_par_iter()
            .map(|i| {
                let view = &views[&targets[i]];
                tree_shap::shap_values(view, rows.row(i), n_features)
            })
            .collect();

        let mut values = Array2::zeros((rows.nrows(), n_features));
        for (i, phi) in per_row.iter().enumerate() {
            values.row_mut(i).assign(phi);
        }
        let base = targets.iter().map(|t| expected[t]).collect();
        Ok((values, base))
    }

    fn sampled_attributions(
        &self,
        model: &FittedModel,
        x: &Array2<f64>,
        rows: &Array2<f64>,
        targets: &[OutputTarget],
    ) -> Result<(Array2<f64>, Array1<f64>)> {
        let background_indices = {
            let n = x.nrows();
            let size = self.config.background_size.min(n).max(1);
            let mut rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(1));
            let mut indices = sample(&mut rng, n, size).into_vec();
            indices.sort_unstable();
            indices
        };
        let explainer = PermutationExplainer::new(x.select(Axis(0), &background_indices))
            .with_permutations(self.config.permutation_samples)
            .with_seed(self.seed);

        let mut bases: BTreeMap<OutputTarget, f64> = BTreeMap::new();
        for &target in targets {
            if !bases.contains_key(&target) {
                let score = |m: &Array2<f64>| model.output(m, target);
                bases.insert(target, explainer.base_value(&score)?);
            }
        }

        let per_row: Vec<Array1<f64>> = (0..rows.nrows())
            .into_par_iter()
            .map(|i| {
                let target = targets[i];
                let score = |m: &Array2<f64>| model.output(m, target);
                explainer.explain_row(&score, rows.row(i), i)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut values = Array2::zeros((rows.nrows(), rows.ncols()));
        for (i, phi) in per_row.iter().enumerate() {
            values.row_mut(i).assign(phi);
        }
        let base = targets.iter().map(|t| bases[t]).collect();
        Ok((values, base))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SelectionConfig;
    use crate::training::ModelKind;

    fn quick_selection() -> SelectionConfig {
        let mut config = SelectionConfig::default();
        config.forest.n_estimators = 8;
        config.boosting.n_estimators = 8;
        config.boosting.max_depth = 3;
        config
    }

    fn data(n: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 3), |(i, j)| match j {
            0 => i as f64,
            1 => ((i * 7) % 11) as f64,
            _ => ((i * 3) % 5) as f64,
        });
        let y = (0..n).map(|i| if i < n / 2 { 0.0 } else { 1.0 }).collect();
        (x, y)
    }

    #[test]
    fn test_sample_is_capped_and_sorted() {
        let explainer = Explainer::new(ExplainConfig {
            sample_size: 20,
            ..Default::default()
        });
        let indices = explainer.sample_indices(100);
        assert_eq!(indices.len(), 20);
        assert!(indices.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(indices, explainer.sample_indices(100));
        assert_eq!(explainer.sample_indices(5), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_tree_attributions_are_additive() {
        let (x, y) = data(80);
        let model = FittedModel::fit(
            ModelKind::RandomForest,
            TaskType::Classification,
            &x,
            &y,
            &quick_selection(),
        )
        .unwrap();
        let explanation = Explainer::new(ExplainConfig {
            sample_size: 30,
            ..Default::default()
        })
        .explain(&model, &x)
        .unwrap();

        assert_eq!(explanation.method, AttributionMethod::TreeShap);
        assert_eq!(explanation.values.dim(), (30, 3));
        for i in 0..explanation.n_rows() {
            let class = explanation.predictions[i] as usize;
            let row = explanation.rows.row(i).insert_axis(Axis(0)).to_owned();
            let score = model.output(&row, OutputTarget::Class(class)).unwrap()[0];
            let total = explanation.values.row(i).sum() + explanation.base_values[i];
            assert!((total - score).abs() < 1e-6, "row {}: {} vs {}", i, total, score);
        }
    }

    #[test]
    fn test_boosted_regression_is_additive() {
        let (x, _) = data(60);
        let y: Array1<f64> = x.column(0).mapv(|v| v * 0.5) + &x.column(2);
        let model = FittedModel::fit(
            ModelKind::GradientBoosting,
            TaskType::Regression,
            &x,
            &y,
            &quick_selection(),
        )
        .unwrap();
        let explanation = Explainer::new(ExplainConfig::default()).explain(&model, &x).unwrap();
        let predictions = model.predict(&x).unwrap();
        for (i, &source) in explanation.row_indices.iter().enumerate() {
            let total = explanation.values.row(i).sum() + explanation.base_values[i];
            assert!((total - predictions[source]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_linear_model_uses_sampling() {
        let (x, y) = data(40);
        let model = FittedModel::fit(
            ModelKind::LogisticRegression,
            TaskType::Classification,
            &x,
            &y,
            &quick_selection(),
        )
        .unwrap();
        let explanation = Explainer::new(ExplainConfig {
            permutation_samples: 10,
            background_size: 10,
            ..Default::default()
        })
        .explain(&model, &x)
        .unwrap();
        assert_eq!(explanation.method, AttributionMethod::PermutationSampling);
        assert_eq!(explanation.values.dim(), (40, 3));
        assert!(explanation.values.iter().all(|v| v.is_finite()));
    }
}
