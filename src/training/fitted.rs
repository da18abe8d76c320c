//! Candidate models and their fitted form
//!
//! Every fitted model carries an explicit [`ModelCapability`] so that attribution can pick
//! an exact tree algorithm or fall back to the model-agnostic estimator without guessing.

use super::decision_tree::TreeNode;
use super::gradient_boosting::{BoostedTrees, GradientBoostingClassifier, GradientBoostingRegressor};
use super::linear_models::{LinearRegression, LogisticRegression, MulticlassLogistic};
use super::random_forest::RandomForest;
use crate::config::SelectionConfig;
use crate::error::{DiagnosisError, Result};
use crate::preprocessing::StandardScaler;
use crate::profiling::TaskType;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Candidate model families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    LogisticRegression,
    LinearRegression,
    RandomForest,
    GradientBoosting,
}

impl ModelKind {
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::LogisticRegression => "LogisticRegression",
            ModelKind::LinearRegression => "LinearRegression",
            ModelKind::RandomForest => "RandomForest",
            ModelKind::GradientBoosting => "GradientBoosting",
        }
    }

    /// Candidate set in evaluation order
    pub fn candidates(task: TaskType) -> [ModelKind; 3] {
        match task {
            TaskType::Classification => [
                ModelKind::LogisticRegression,
                ModelKind::RandomForest,
                ModelKind::GradientBoosting,
            ],
            TaskType::Regression => [
                ModelKind::LinearRegression,
                ModelKind::RandomForest,
                ModelKind::GradientBoosting,
            ],
        }
    }

    /// Linear models see standardized features
    pub fn needs_scaling(&self) -> bool {
        matches!(self, ModelKind::LogisticRegression | ModelKind::LinearRegression)
    }

    pub fn capability(&self) -> ModelCapability {
        match self {
            ModelKind::RandomForest | ModelKind::GradientBoosting => ModelCapability::TreeBased,
            ModelKind::LogisticRegression | ModelKind::LinearRegression => ModelCapability::Generic,
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the attribution layer may assume about a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelCapability {
    /// Additive ensemble of decision trees; exact TreeSHAP applies
    TreeBased,
    /// Black box; only predictions are available
    Generic,
}

/// Scalar output an explanation is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OutputTarget {
    /// Regression prediction
    Value,
    /// Model score for one class
    Class(usize),
}

/// How a leaf contributes to the explained output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafValue {
    /// The leaf's stored value
    Value,
    /// The leaf's proportion of one class
    ClassProportion(usize),
}

/// One tree of an additive ensemble, as seen by the attribution code.
///
/// Output contribution is `weight * leaf(x[feature_map])`.
#[derive(Debug, Clone, Copy)]
pub struct TreeComponent<'a> {
    pub root: &'a TreeNode,
    /// Tree feature `j` reads input column `feature_map[j]`; `None` means identity
    pub feature_map: Option<&'a [usize]>,
    pub weight: f64,
    pub leaf: LeafValue,
}

impl TreeComponent<'_> {
    pub fn input_column(&self, tree_feature: usize) -> usize {
        self.feature_map.map_or(tree_feature, |m| m[tree_feature])
    }

    pub fn leaf_output(&self, node: &TreeNode) -> f64 {
        match (node, self.leaf) {
            (TreeNode::Leaf { value, .. }, LeafValue::Value) => *value,
            (TreeNode::Leaf { proba, .. }, LeafValue::ClassProportion(c)) => {
                proba.get(c).copied().unwrap_or(0.0)
            }
            (TreeNode::Split { .. }, _) => 0.0,
        }
    }
}

/// Explained output = `offset + sum(component outputs)`
#[derive(Debug, Clone)]
pub struct TreeEnsembleView<'a> {
    pub components: Vec<TreeComponent<'a>>,
    pub offset: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Estimator {
    Linear(LinearRegression),
    Logistic(MulticlassLogistic),
    Forest(RandomForest),
    BoostingClassifier(GradientBoostingClassifier),
    BoostingRegressor(GradientBoostingRegressor),
}

/// A trained candidate together with its feature scaling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedModel {
    kind: ModelKind,
    task: TaskType,
    capability: ModelCapability,
    scaler: Option<StandardScaler>,
    estimator: Estimator,
    n_features: usize,
}

impl FittedModel {
    /// Fit `kind` on `x`/`y`. Classification labels must be encoded as `0..K`.
    pub fn fit(
        kind: ModelKind,
        task: TaskType,
        x: &Array2<f64>,
        y: &Array1<f64>,
        config: &SelectionConfig,
    ) -> Result<Self> {
        let (scaler, x_fit) = if kind.needs_scaling() {
            let mut scaler = StandardScaler::new();
            let scaled = scaler.fit_transform(x)?;
            (Some(scaler), scaled)
        } else {
            (None, x.clone())
        };

        let estimator = match (kind, task) {
            (ModelKind::LogisticRegression, TaskType::Classification) => {
                let template = LogisticRegression::new()
                    .with_max_iter(config.logistic.max_iter)
                    .with_learning_rate(config.logistic.learning_rate)
                    .with_alpha(config.logistic.alpha);
                let mut model = MulticlassLogistic::new(template);
                model.fit(&x_fit, y)?;
                Estimator::Logistic(model)
            }
            (ModelKind::LinearRegression, TaskType::Regression) => {
                let mut model = LinearRegression::new();
                model.fit(&x_fit, y)?;
                Estimator::Linear(model)
            }
            (ModelKind::RandomForest, _) => {
                let forest = match task {
                    TaskType::Classification => RandomForest::new_classifier(config.forest.n_estimators),
                    TaskType::Regression => RandomForest::new_regressor(config.forest.n_estimators),
                };
                let mut model = forest
                    .with_max_depth(config.forest.max_depth)
                    .with_min_samples_leaf(config.forest.min_samples_leaf)
                    .with_random_state(config.random_state);
                model.fit(&x_fit, y)?;
                Estimator::Forest(model)
            }
            (ModelKind::GradientBoosting, TaskType::Classification) => {
                let mut model = GradientBoostingClassifier::new(config.boosting.clone());
                model.fit(&x_fit, y)?;
                Estimator::BoostingClassifier(model)
            }
            (ModelKind::GradientBoosting, TaskType::Regression) => {
                let mut model = GradientBoostingRegressor::new(config.boosting.clone());
                model.fit(&x_fit, y)?;
                Estimator::BoostingRegressor(model)
            }
            (kind, task) => {
                return Err(DiagnosisError::TrainingError(format!(
                    "{} does not support {}",
                    kind, task
                )))
            }
        };

        Ok(Self {
            kind,
            task,
            capability: kind.capability(),
            scaler,
            estimator,
            n_features: x.ncols(),
        })
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn task_type(&self) -> TaskType {
        self.task
    }

    pub fn capability(&self) -> ModelCapability {
        self.capability
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    fn prepare(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.n_features {
            return Err(DiagnosisError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        match &self.scaler {
            Some(scaler) => scaler.transform(x),
            None => Ok(x.clone()),
        }
    }

    /// Predicted labels (classification) or values (regression)
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let x = self.prepare(x)?;
        match &self.estimator {
            Estimator::Linear(m) => m.predict(&x),
            Estimator::Logistic(m) => m.predict(&x),
            Estimator::Forest(m) => m.predict(&x),
            Estimator::BoostingClassifier(m) => m.predict(&x),
            Estimator::BoostingRegressor(m) => m.predict(&x),
        }
    }

    /// The scalar each row's explanation is about.
    ///
    /// Forests and linear classifiers report class probabilities, boosted classifiers the
    /// class margin (log-odds), regressors the prediction.
    pub fn output(&self, x: &Array2<f64>, target: OutputTarget) -> Result<Array1<f64>> {
        match target {
            OutputTarget::Value => self.predict(x),
            OutputTarget::Class(class) => {
                if let Estimator::BoostingClassifier(model) = &self.estimator {
                    let x = self.prepare(x)?;
                    let ensembles = model.ensembles();
                    if model.n_classes() == 2 {
                        let margin = ensembles[0].decision_function(&x)?;
                        return Ok(if class == 1 { margin } else { -margin });
                    }
                    return match ensembles.get(class) {
                        Some(ensemble) => ensemble.decision_function(&x),
                        None => Ok(Array1::zeros(x.nrows())),
                    };
                }
                let proba = self.predict_proba(x)?;
                if class >= proba.ncols() {
                    return Ok(Array1::zeros(x.nrows()));
                }
                Ok(proba.column(class).to_owned())
            }
        }
    }

    /// Class probabilities (classification only)
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let x = self.prepare(x)?;
        match &self.estimator {
            Estimator::Logistic(m) => m.predict_proba(&x),
            Estimator::Forest(m) if m.is_classification() => m.predict_proba(&x),
            Estimator::BoostingClassifier(m) => m.predict_proba(&x),
            _ => Err(DiagnosisError::ValidationError(
                "Probabilities are only available for classifiers".to_string(),
            )),
        }
    }

    /// Additive tree decomposition of the explained output (tree-based models only)
    pub fn tree_view(&self, target: OutputTarget) -> Result<TreeEnsembleView<'_>> {
        match (&self.estimator, target) {
            (Estimator::Forest(forest), target) => {
                let leaf = match target {
                    OutputTarget::Class(c) if forest.is_classification() => LeafValue::ClassProportion(c),
                    OutputTarget::Value if !forest.is_classification() => LeafValue::Value,
                    _ => {
                        return Err(DiagnosisError::ValidationError(
                            "Output target does not match the forest's task".to_string(),
                        ))
                    }
                };
                let weight = 1.0 / forest.n_trees().max(1) as f64;
                let components = forest
                    .trees()
                    .iter()
                    .map(|tree| {
                        let root = tree.root().ok_or(DiagnosisError::ModelNotFitted)?;
                        Ok(TreeComponent {
                            root,
                            feature_map: None,
                            weight,
                            leaf,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(TreeEnsembleView {
                    components,
                    offset: 0.0,
                })
            }
            (Estimator::BoostingRegressor(model), OutputTarget::Value) => boosted_view(model.ensemble()?, 1.0),
            (Estimator::BoostingClassifier(model), OutputTarget::Class(c)) => {
                let ensembles = model.ensembles();
                if model.n_classes() == 2 {
                    let sign = if c == 1 { 1.0 } else { -1.0 };
                    boosted_view(&ensembles[0], sign)
                } else {
                    let ensemble = ensembles.get(c).ok_or_else(|| {
                        DiagnosisError::ValidationError(format!("Unknown class {}", c))
                    })?;
                    boosted_view(ensemble, 1.0)
                }
            }
            _ => Err(DiagnosisError::ValidationError(format!(
                "{} has no tree decomposition for this output",
                self.kind
            ))),
        }
    }
}

fn boosted_view(ensemble: &BoostedTrees, sign: f64) -> Result<TreeEnsembleView<'_>> {
    let components = ensemble
        .trees()
        .map(|(tree, cols)| {
            let root = tree.root().ok_or(DiagnosisError::ModelNotFitted)?;
            Ok(TreeComponent {
                root,
                feature_map: Some(cols),
                weight: sign * ensemble.learning_rate(),
                leaf: LeafValue::Value,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(TreeEnsembleView {
        components,
        offset: sign * ensemble.initial(),
    })
}
