//! Cross-validated model selection
//!
//! Every candidate produces its own `Result`. Failed candidates are recorded on the
//! leaderboard and never abort the run; only an empty leaderboard is an error.

use super::cross_validation::{CVStrategy, CrossValidator};
use super::fitted::{FittedModel, ModelCapability, ModelKind};
use super::metrics::{f1_macro, mean_std, r2_score};
use crate::config::SelectionConfig;
use crate::dataset::Column;
use crate::error::{DiagnosisError, Result};
use crate::events::{DiagnosticEvent, EventSink};
use crate::preprocessing::LabelEncoder;
use crate::profiling::{TaskType, TaskTypeClassifier};
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

const STAGE: &str = "model_selection";

/// Cross-validation outcome for one candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResult {
    pub model: ModelKind,
    pub mean_score: f64,
    pub std_score: f64,
    /// Scores in fold order
    pub fold_scores: Vec<f64>,
    pub task_type: TaskType,
    pub capability: ModelCapability,
}

/// A candidate that could not be evaluated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateFailure {
    pub model: ModelKind,
    pub reason: String,
}

/// Candidates ranked by mean CV score, best first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leaderboard {
    pub task_type: TaskType,
    /// "F1" or "R2"
    pub metric: String,
    pub results: Vec<ModelResult>,
    pub failures: Vec<CandidateFailure>,
}

impl Leaderboard {
    /// Rank survivors; a stable sort keeps candidate order on ties
    fn ranked(
        task_type: TaskType,
        mut results: Vec<ModelResult>,
        failures: Vec<CandidateFailure>,
    ) -> Result<Self> {
        if results.is_empty() {
            return Err(DiagnosisError::NoModelTrained {
                attempted: failures.len(),
            });
        }
        results.sort_by(|a, b| b.mean_score.total_cmp(&a.mean_score));
        Ok(Self {
            task_type,
            metric: task_type.metric_name().to_string(),
            results,
            failures,
        })
    }

    pub fn best(&self) -> Option<&ModelResult> {
        self.results.first()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Rank of a model (0 is best), if it survived
    pub fn rank_of(&self, model: ModelKind) -> Option<usize> {
        self.results.iter().position(|r| r.model == model)
    }
}

/// Target prepared for training
#[derive(Debug, Clone)]
pub struct EncodedTarget {
    pub task_type: TaskType,
    /// Class codes `0..K` for classification, raw values for regression
    pub y: Array1<f64>,
    /// Present for classification
    pub encoder: Option<LabelEncoder>,
}

/// Leaderboard plus the best candidate refit on all rows
#[derive(Debug, Clone)]
pub struct Selection {
    pub leaderboard: Leaderboard,
    pub best_model: FittedModel,
    pub target: EncodedTarget,
}

/// Evaluates the fixed candidate set with k-fold cross-validation
#[derive(Debug, Clone)]
pub struct ModelSelector {
    config: SelectionConfig,
    classifier: TaskTypeClassifier,
}

impl Default for ModelSelector {
    fn default() -> Self {
        Self::new(SelectionConfig::default())
    }
}

impl ModelSelector {
    pub fn new(config: SelectionConfig) -> Self {
        Self {
            config,
            classifier: TaskTypeClassifier::default(),
        }
    }

    pub fn with_classifier(mut self, classifier: TaskTypeClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    /// Decide the task and encode the target. The target must have no missing values.
    pub fn encode_target(&self, target: &Column) -> Result<EncodedTarget> {
        let task_type = self.classifier.classify(target);
        match task_type {
            TaskType::Classification => {
                let mut encoder = LabelEncoder::new();
                encoder.fit(target)?;
                let y = encoder.transform_f64(target)?;
                Ok(EncodedTarget {
                    task_type,
                    y,
                    encoder: Some(encoder),
                })
            }
            TaskType::Regression => {
                let values = target.as_numeric().ok_or_else(|| {
                    DiagnosisError::DataError(format!("Target '{}' is not numeric", target.name()))
                })?;
                let y = values
                    .iter()
                    .map(|v| {
                        v.ok_or_else(|| {
                            DiagnosisError::DataError(format!(
                                "Target '{}' has missing values",
                                target.name()
                            ))
                        })
                    })
                    .collect::<Result<Array1<f64>>>()?;
                Ok(EncodedTarget {
                    task_type,
                    y,
                    encoder: None,
                })
            }
        }
    }

    /// Cross-validate every candidate, rank them and refit the best on all rows
    pub fn select(&self, x: &Array2<f64>, target: &Column, sink: &dyn EventSink) -> Result<Selection> {
        if x.nrows() != target.len() {
            return Err(DiagnosisError::ShapeError {
                expected: format!("{} target values", x.nrows()),
                actual: format!("{} target values", target.len()),
            });
        }
        if x.ncols() == 0 {
            return Err(DiagnosisError::NoNumericFeatures);
        }

        let encoded = self.encode_target(target)?;
        let task_type = encoded.task_type;
        let n_splits = self.config.cv_folds;
        let strategy = match task_type {
            TaskType::Classification => CVStrategy::StratifiedKFold { n_splits },
            TaskType::Regression => CVStrategy::KFold { n_splits },
        };
        let splits = CrossValidator::new(strategy).split(x.nrows(), Some(&encoded.y))?;

        sink.record(
            DiagnosticEvent::info(STAGE, "Evaluating candidates")
                .with_field("task", task_type)
                .with_field("folds", n_splits)
                .with_field("rows", x.nrows()),
        );

        let mut results = Vec::new();
        let mut failures = Vec::new();
        for kind in ModelKind::candidates(task_type) {
            let scored = |split: &super::CVSplit| -> Result<f64> {
                self.score_fold(kind, task_type, x, &encoded.y, &split.train_indices, &split.test_indices)
            };
            let fold_scores: Result<Vec<f64>> = if self.config.parallel_folds {
                splits.par_iter().map(scored).collect()
            } else {
                splits.iter().map(scored).collect()
            };

            match fold_scores {
                Ok(fold_scores) => {
                    let (mean_score, std_score) = mean_std(&fold_scores);
                    sink.record(
                        DiagnosticEvent::info(STAGE, "Candidate evaluated")
                            .with_field("model", kind)
                            .with_field("mean", format!("{:.4}", mean_score))
                            .with_field("std", format!("{:.4}", std_score)),
                    );
                    results.push(ModelResult {
                        model: kind,
                        mean_score,
                        std_score,
                        fold_scores,
                        task_type,
                        capability: kind.capability(),
                    });
                }
                Err(err) => {
                    sink.record(
                        DiagnosticEvent::warn(STAGE, "Candidate failed")
                            .with_field("model", kind)
                            .with_field("reason", &err),
                    );
                    failures.push(CandidateFailure {
                        model: kind,
                        reason: err.to_string(),
                    });
                }
            }
        }

        let leaderboard = Leaderboard::ranked(task_type, results, failures)?;
        let best_kind = leaderboard
            .best()
            .map(|r| r.model)
            .ok_or(DiagnosisError::NoModelTrained { attempted: 0 })?;
        let best_model = FittedModel::fit(best_kind, task_type, x, &encoded.y, &self.config)?;

        sink.record(
            DiagnosticEvent::info(STAGE, "Best model refit on all rows")
                .with_field("model", best_kind)
                .with_field("metric", &leaderboard.metric),
        );

        Ok(Selection {
            leaderboard,
            best_model,
            target: encoded,
        })
    }

    fn score_fold(
        &self,
        kind: ModelKind,
        task_type: TaskType,
        x: &Array2<f64>,
        y: &Array1<f64>,
        train: &[usize],
        test: &[usize],
    ) -> Result<f64> {
        let x_train = x.select(Axis(0), train);
        let y_train: Array1<f64> = train.iter().map(|&i| y[i]).collect();
        let x_test = x.select(Axis(0), test);
        let y_test: Array1<f64> = test.iter().map(|&i| y[i]).collect();

        let model = FittedModel::fit(kind, task_type, &x_train, &y_train, &self.config)?;
        let predictions = model.predict(&x_test)?;
        let score = match task_type {
            TaskType::Classification => f1_macro(&y_test, &predictions),
            TaskType::Regression => r2_score(&y_test, &predictions),
        };
        if !score.is_finite() {
            return Err(DiagnosisError::ComputationError(format!(
                "{} produced a non-finite score",
                kind
            )));
        }
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{MemorySink, NullSink};

    fn quick_config() -> SelectionConfig {
        let mut config = SelectionConfig::default();
        config.forest.n_estimators = 10;
        config.boosting.n_estimators = 10;
        config.boosting.max_depth = 3;
        config
    }

    fn separable() -> (Array2<f64>, Column) {
        let x = Array2::from_shape_fn((60, 2), |(i, j)| {
            if j == 0 {
                i as f64
            } else {
                ((i * 7) % 5) as f64
            }
        });
        let labels: Vec<&str> = (0..60).map(|i| if i < 30 { "no" } else { "yes" }).collect();
        (x, Column::from_strs("label", &labels))
    }

    #[test]
    fn test_classification_leaderboard() {
        let (x, y) = separable();
        let selection = ModelSelector::new(quick_config()).select(&x, &y, &NullSink).unwrap();

        assert_eq!(selection.leaderboard.task_type, TaskType::Classification);
        assert_eq!(selection.leaderboard.metric, "F1");
        assert_eq!(selection.leaderboard.len(), 3);
        for pair in selection.leaderboard.results.windows(2) {
            assert!(pair[0].mean_score >= pair[1].mean_score);
        }
        let best = selection.leaderboard.best().unwrap();
        assert_eq!(best.fold_scores.len(), 3);
        assert_eq!(selection.best_model.kind(), best.model);
        assert_eq!(selection.target.encoder.as_ref().unwrap().classes(), ["no", "yes"]);
    }

    #[test]
    fn test_regression_uses_r2() {
        let x = Array2::from_shape_fn((45, 1), |(i, _)| i as f64);
        let values: Vec<f64> = (0..45).map(|i| 3.0 * i as f64 + 1.0).collect();
        let y = Column::from_f64("price", &values);
        let selection = ModelSelector::new(quick_config()).select(&x, &y, &NullSink).unwrap();

        assert_eq!(selection.leaderboard.task_type, TaskType::Regression);
        assert_eq!(selection.leaderboard.metric, "R2");
        assert!(selection.leaderboard.rank_of(ModelKind::LinearRegression).is_some());
        assert!(selection.leaderboard.rank_of(ModelKind::LogisticRegression).is_none());
    }

    #[test]
    fn test_same_seed_same_scores() {
        let (x, y) = separable();
        let selector = ModelSelector::new(quick_config());
        let a = selector.select(&x, &y, &NullSink).unwrap();
        let b = selector.select(&x, &y, &NullSink).unwrap();

        let models = |s: &Selection| s.leaderboard.results.iter().map(|r| r.model).collect::<Vec<_>>();
        assert_eq!(models(&a), models(&b));
        for (ra, rb) in a.leaderboard.results.iter().zip(b.leaderboard.results.iter()) {
            assert_eq!(ra.mean_score.to_bits(), rb.mean_score.to_bits());
            assert_eq!(ra.fold_scores, rb.fold_scores);
        }
    }

    #[test]
    fn test_sequential_folds_match_parallel() {
        let (x, y) = separable();
        let mut config = quick_config();
        let parallel = ModelSelector::new(config.clone()).select(&x, &y, &NullSink).unwrap();
        config.parallel_folds = false;
        let sequential = ModelSelector::new(config).select(&x, &y, &NullSink).unwrap();
        for (p, s) in parallel.leaderboard.results.iter().zip(sequential.leaderboard.results.iter()) {
            assert_eq!(p.fold_scores, s.fold_scores);
        }
    }

    #[test]
    fn test_empty_leaderboard_is_no_model_trained() {
        let failures = vec![CandidateFailure {
            model: ModelKind::RandomForest,
            reason: "boom".to_string(),
        }];
        let result = Leaderboard::ranked(TaskType::Classification, Vec::new(), failures);
        assert!(matches!(result, Err(DiagnosisError::NoModelTrained { attempted: 1 })));
    }

    #[test]
    fn test_ties_keep_candidate_order() {
        let result = |model| ModelResult {
            model,
            mean_score: 0.5,
            std_score: 0.0,
            fold_scores: vec![0.5],
            task_type: TaskType::Classification,
            capability: model.capability(),
        };
        let board = Leaderboard::ranked(
            TaskType::Classification,
            vec![result(ModelKind::LogisticRegression), result(ModelKind::RandomForest)],
            Vec::new(),
        )
        .unwrap();
        assert_eq!(board.results[0].model, ModelKind::LogisticRegression);
    }

    #[test]
    fn test_events_emitted_per_candidate() {
        let (x, y) = separable();
        let sink = MemorySink::new();
        ModelSelector::new(quick_config()).select(&x, &y, &sink).unwrap();
        let evaluated = sink
            .for_stage("model_selection")
            .into_iter()
            .filter(|e| e.message == "Candidate evaluated")
            .count();
        assert_eq!(evaluated, 3);
    }

    #[test]
    fn test_no_features_rejected() {
        let x = Array2::<f64>::zeros((10, 0));
        let y = Column::from_f64("y", &[0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0]);
        let result = ModelSelector::default().select(&x, &y, &NullSink);
        assert!(matches!(result, Err(DiagnosisError::NoNumericFeatures)));
    }
}
