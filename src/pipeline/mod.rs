//! End-to-end dataset diagnosis
//!
//! Stages run strictly forward: profiling, leakage checks, model selection, attribution,
//! error clustering, fairness, suggestions. Only configuration errors abort a run; every
//! other failure is logged, recorded as a warning and replaced by an empty result.

use crate::config::DiagnosisConfig;
use crate::dataset::Dataset;
use crate::error::{DiagnosisError, Result};
use crate::events::{DiagnosticEvent, EventSink};
use crate::explainability::{AttributionMethod, ErrorClusterer, ExplanationSample, Explainer};
use crate::fairness::{FairnessChecker, FairnessResult};
use crate::preprocessing::FeatureMatrix;
use crate::profiling::{DatasetProfiler, LeakageDetector, Profile, TaskType, TaskTypeClassifier};
use crate::recommender::{IssuesBundle, Suggestion, SuggestionEngine};
use crate::report::insights;
use crate::training::{Leaderboard, ModelSelector, Selection};
use chrono::{DateTime, Utc};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Category of a non-fatal data-quality problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    SmallDataset,
    DroppedTargetRows,
    IdLikeFeature,
    NoNumericFeatures,
    NoModelTrained,
    StageFailure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQualityWarning {
    pub kind: WarningKind,
    pub message: String,
}

impl DataQualityWarning {
    fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Everything a run found, ready for rendering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticBundle {
    pub dataset_id: String,
    pub target: String,
    pub task_type: TaskType,
    pub profile: Profile,
    /// Absent when no model could be trained
    pub leaderboard: Option<Leaderboard>,
    pub best_model: Option<String>,
    pub best_score: Option<f64>,
    pub attribution_method: Option<AttributionMethod>,
    /// (feature, mean |attribution|), strongest first
    pub feature_importance: Vec<(String, f64)>,
    pub issues: IssuesBundle,
    pub fairness: Vec<FairnessResult>,
    pub warnings: Vec<DataQualityWarning>,
    pub suggestions: Vec<Suggestion>,
    pub insights: String,
    pub generated_at: DateTime<Utc>,
}

impl DiagnosticBundle {
    /// "F1" or "R2"
    pub fn metric_name(&self) -> &'static str {
        self.task_type.metric_name()
    }

    pub fn has_warning(&self, kind: WarningKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }
}

/// Bundle plus the intermediate artifacts of a run
#[derive(Debug, Clone)]
pub struct Diagnosis {
    pub bundle: DiagnosticBundle,
    pub matrix: Option<FeatureMatrix>,
    pub selection: Option<Selection>,
    pub explanation: Option<ExplanationSample>,
}

/// Runs every diagnosis stage over one dataset
#[derive(Debug, Clone)]
pub struct DiagnosisPipeline {
    config: DiagnosisConfig,
    dataset_id: String,
}

impl Default for DiagnosisPipeline {
    fn default() -> Self {
        Self::new(DiagnosisConfig::default())
    }
}

impl DiagnosisPipeline {
    pub fn new(config: DiagnosisConfig) -> Self {
        Self {
            config,
            dataset_id: "dataset".to_string(),
        }
    }

    pub fn with_dataset_id(mut self, id: impl Into<String>) -> Self {
        self.dataset_id = id.into();
        self
    }

    pub fn config(&self) -> &DiagnosisConfig {
        &self.config
    }

    fn classifier(&self) -> TaskTypeClassifier {
        TaskTypeClassifier::new().with_threshold(self.config.thresholds.max_classification_cardinality)
    }

    fn selector(&self) -> ModelSelector {
        ModelSelector::new(self.config.selection.clone()).with_classifier(self.classifier())
    }

    pub fn run(&self, dataset: &Dataset, target: &str, sink: &dyn EventSink) -> Result<DiagnosticBundle> {
        Ok(self.run_detailed(dataset, target, sink)?.bundle)
    }

    /// Feature matrix and model selection only; used to re-score a remediated dataset
    pub fn select_models(&self, dataset: &Dataset, target: &str, sink: &dyn EventSink) -> Result<Selection> {
        self.config.validate()?;
        let (clean, _) = dataset.drop_missing_target(target)?;
        let (features, target_column) = clean.split_target(target)?;
        let matrix = self.config.missing_policy.build_matrix(&features)?;
        self.selector()
            .select(&matrix.x, &target_column.select_rows(&matrix.rows), sink)
    }

    pub fn run_detailed(&self, dataset: &Dataset, target: &str, sink: &dyn EventSink) -> Result<Diagnosis> {
        self.config.validate()?;
        let mut warnings = Vec::new();
        let mut warn = |stage: &str, kind: WarningKind, message: String| {
            sink.record(DiagnosticEvent::warn(stage, message.clone()));
            warnings.push(DataQualityWarning::new(kind, message));
        };

        // Profiling validates the target; an unusable target ends the run here
        let profile = DatasetProfiler::new()
            .with_classifier(self.classifier())
            .profile(dataset, target)?;
        sink.record(
            DiagnosticEvent::info("profiling", "Dataset profiled")
                .with_field("rows", profile.n_rows)
                .with_field("columns", profile.n_cols)
                .with_field("task", profile.task_type),
        );

        let (clean, dropped) = dataset.drop_missing_target(target)?;
        if dropped > 0 {
            sink.record(DiagnosticEvent::debug("profiling", "Dropped rows with missing target").with_field("rows", dropped));
            warn(
                "profiling",
                WarningKind::DroppedTargetRows,
                format!("{} rows with a missing '{}' were dropped", dropped, target),
            );
        }
        if clean.n_rows() < self.config.thresholds.small_dataset_rows {
            warn(
                "profiling",
                WarningKind::SmallDataset,
                format!(
                    "Dataset is very small ({} rows); results may not be reliable",
                    clean.n_rows()
                ),
            );
        }

        let (features, target_column) = clean.split_target(target)?;
        for column in id_like_columns(&features) {
            warn(
                "profiling",
                WarningKind::IdLikeFeature,
                format!("Feature '{}' has a unique value per row and looks like an identifier", column),
            );
        }

        let detector = LeakageDetector::new()
            .with_leakage_threshold(self.config.thresholds.leakage)
            .with_collinearity_threshold(self.config.thresholds.collinearity);
        let target_leakage = detector.detect_target_leakage(&features, &target_column);
        let high_correlation = detector.detect_high_correlation(&features);
        sink.record(
            DiagnosticEvent::info("leakage", "Correlation checks finished")
                .with_field("leaks", target_leakage.len())
                .with_field("collinear_pairs", high_correlation.len()),
        );

        let mut issues = IssuesBundle {
            imbalance_ratio: profile.imbalance_ratio,
            missing_percentage: profile.missing_percentages(),
            numeric_skew: profile.skewness(),
            target_leakage,
            high_correlation,
            error_clusters: Vec::new(),
        };

        let mut matrix = None;
        let mut selection = None;
        match self.config.missing_policy.build_matrix(&features) {
            Ok(m) => {
                let y = target_column.select_rows(&m.rows);
                match self.selector().select(&m.x, &y, sink) {
                    Ok(s) => selection = Some(s),
                    Err(err) if err.is_fatal() => return Err(err),
                    Err(DiagnosisError::NoModelTrained { attempted }) => warn(
                        "model_selection",
                        WarningKind::NoModelTrained,
                        format!("All {} candidate models failed; no model was trained", attempted),
                    ),
                    Err(err) => warn(
                        "model_selection",
                        WarningKind::StageFailure,
                        DiagnosisError::stage("model_selection", err).to_string(),
                    ),
                }
                matrix = Some(m);
            }
            Err(DiagnosisError::NoNumericFeatures) => warn(
                "model_selection",
                WarningKind::NoNumericFeatures,
                "No numeric features found; model training was skipped".to_string(),
            ),
            Err(err) => warn(
                "model_selection",
                WarningKind::StageFailure,
                DiagnosisError::stage("model_selection", err).to_string(),
            ),
        }

        let mut explanation = None;
        let mut fairness = Vec::new();
        if let (Some(m), Some(s)) = (&matrix, &selection) {
            let explainer = Explainer::new(self.config.explain.clone()).with_seed(self.config.selection.random_state);
            match explainer.explain(&s.best_model, &m.x) {
                Ok(e) => {
                    sink.record(
                        DiagnosticEvent::info("explanation", "Attributions computed")
                            .with_field("rows", e.n_rows())
                            .with_field("method", e.method.as_str()),
                    );
                    explanation = Some(e);
                }
                Err(err) => warn(
                    "explanation",
                    WarningKind::StageFailure,
                    DiagnosisError::stage("explanation", err).to_string(),
                ),
            }

            if s.target.task_type == TaskType::Classification {
                if let Some(e) = &explanation {
                    let y_true: Array1<f64> = e.row_indices.iter().map(|&i| s.target.y[i]).collect();
                    issues.error_clusters = ErrorClusterer::new(self.config.clustering.clone())
                        .with_random_state(self.config.selection.random_state)
                        .find_clusters(&e.rows, &y_true, &e.predictions, &e.values, &m.feature_names, sink);
                }

                match s.best_model.predict(&m.x) {
                    Ok(y_pred) => {
                        let raw_features = features.select_rows(&m.rows);
                        fairness = FairnessChecker::new().scan(
                            &raw_features,
                            &s.target.y,
                            &y_pred,
                            self.config.max_fairness_attributes,
                        );
                        sink.record(
                            DiagnosticEvent::info("fairness", "Fairness scan finished")
                                .with_field("attributes", fairness.len()),
                        );
                    }
                    Err(err) => warn(
                        "fairness",
                        WarningKind::StageFailure,
                        DiagnosisError::stage("fairness", err).to_string(),
                    ),
                }
            }
        }

        let suggestions = SuggestionEngine::new(self.config.thresholds.clone()).generate(&issues, target);
        sink.record(DiagnosticEvent::info("suggestions", "Suggestions generated").with_field("count", suggestions.len()));

        let leaderboard = selection.as_ref().map(|s| s.leaderboard.clone());
        let best = leaderboard.as_ref().and_then(|l| l.best());
        let feature_importance = match (&explanation, &matrix) {
            (Some(e), Some(m)) => ranked_importance(e, &m.feature_names),
            _ => Vec::new(),
        };

        let mut bundle = DiagnosticBundle {
            dataset_id: self.dataset_id.clone(),
            target: target.to_string(),
            task_type: profile.task_type,
            best_model: best.map(|r| r.model.name().to_string()),
            best_score: best.map(|r| r.mean_score),
            profile,
            leaderboard,
            attribution_method: explanation.as_ref().map(|e| e.method),
            feature_importance,
            issues,
            fairness,
            warnings,
            suggestions,
            insights: String::new(),
            generated_at: Utc::now(),
        };
        bundle.insights = insights::summarize(&bundle);

        Ok(Diagnosis {
            bundle,
            matrix,
            selection,
            explanation,
        })
    }
}

/// Text columns, or integral numeric columns, with one distinct value per row
fn id_like_columns(features: &Dataset) -> Vec<String> {
    if features.n_rows() < 2 {
        return Vec::new();
    }
    features
        .columns()
        .iter()
        .filter(|c| c.n_unique() == features.n_rows())
        .filter(|c| match c.as_numeric() {
            Some(values) => values.iter().flatten().all(|v| v.fract() == 0.0),
            None => true,
        })
        .map(|c| c.name().to_string())
        .collect()
}

fn ranked_importance(explanation: &ExplanationSample, names: &[String]) -> Vec<(String, f64)> {
    let mut ranked: Vec<(String, f64)> = names
        .iter()
        .cloned()
        .zip(explanation.mean_abs().iter().copied())
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Column;
    use crate::events::{MemorySink, NullSink};

    fn quick() -> DiagnosisPipeline {
        DiagnosisPipeline::new(DiagnosisConfig::new().with_n_estimators(10))
    }

    fn binary_dataset(n: usize) -> Dataset {
        let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let z: Vec<f64> = (0..n).map(|i| ((i * 7) % 13) as f64).collect();
        let y: Vec<&str> = (0..n).map(|i| if i % 3 == 0 { "a" } else { "b" }).collect();
        Dataset::new(vec![
            Column::from_f64("x", &x),
            Column::from_f64("z", &z),
            Column::from_strs("y", &y),
        ])
        .unwrap()
    }

    #[test]
    fn test_missing_target_is_fatal() {
        let result = quick().run(&binary_dataset(30), "nope", &NullSink);
        assert!(matches!(result, Err(DiagnosisError::ConfigurationError(_))));
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let pipeline = DiagnosisPipeline::new(DiagnosisConfig::new().with_cv_folds(1));
        assert!(matches!(
            pipeline.run(&binary_dataset(30), "y", &NullSink),
            Err(DiagnosisError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_no_numeric_features_still_reports() {
        let n = 30;
        let city: Vec<&str> = (0..n).map(|i| if i % 2 == 0 { "x" } else { "y" }).collect();
        let y: Vec<f64> = (0..n).map(|i| (i % 2) as f64).collect();
        let dataset = Dataset::new(vec![Column::from_strs("city", &city), Column::from_f64("y", &y)]).unwrap();
        let bundle = quick().run(&dataset, "y", &NullSink).unwrap();

        assert!(bundle.has_warning(WarningKind::NoNumericFeatures));
        assert!(bundle.leaderboard.is_none());
        assert!(bundle.best_model.is_none());
        assert_eq!(bundle.task_type, TaskType::Classification);
    }

    #[test]
    fn test_small_dataset_warning() {
        let dataset = Dataset::new(vec![
            Column::from_f64("x", &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
            Column::from_f64("y", &[0.0, 1.0, 0.0, 1.0, 0.0, 1.0]),
        ])
        .unwrap();
        let bundle = quick().run(&dataset, "y", &NullSink).unwrap();
        assert!(bundle.has_warning(WarningKind::SmallDataset));
        assert!(bundle.has_warning(WarningKind::IdLikeFeature));
    }

    #[test]
    fn test_classification_run_fills_every_section() {
        let sink = MemorySink::new();
        let diagnosis = quick().run_detailed(&binary_dataset(60), "y", &sink).unwrap();
        let bundle = &diagnosis.bundle;

        assert_eq!(bundle.task_type, TaskType::Classification);
        assert_eq!(bundle.leaderboard.as_ref().map(Leaderboard::len), Some(3));
        assert!(bundle.best_score.is_some());
        assert!(bundle.attribution_method.is_some());
        assert_eq!(bundle.feature_importance.len(), 2);
        assert!(!bundle.insights.is_empty());
        assert!(diagnosis.explanation.is_some());
        assert!(!sink.for_stage("model_selection").is_empty());
        assert!(!sink.for_stage("suggestions").is_empty());
    }
}
