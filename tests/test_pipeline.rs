//! End-to-end tests for the diagnosis pipeline and report emission

use explainml::prelude::*;
use explainml::pipeline::Diagnosis;
use explainml::report::{self, markdown};

// ============================================================================
// Fixtures
// ============================================================================

/// 200 rows, 180/20 binary target, a leaked copy of the target and a duplicated feature pair
fn leaky_dataset() -> Dataset {
    let n = 200;
    let y: Vec<f64> = (0..n).map(|i| if i % 10 == 0 { 1.0 } else { 0.0 }).collect();
    let f1: Vec<f64> = (0..n).map(|i| ((i * 37) % 101) as f64).collect();
    let f2: Vec<f64> = f1.iter().map(|v| v * 2.0).collect();
    let z: Vec<f64> = (0..n).map(|i| ((i * 53) % 89) as f64 / 10.0).collect();
    let city: Vec<&str> = (0..n).map(|i| ["north", "south", "east"][i % 3]).collect();

    Dataset::new(vec![
        Column::from_f64("f1", &f1),
        Column::from_f64("f2", &f2),
        Column::from_f64("z", &z),
        Column::from_f64("leak", &y),
        Column::from_strs("city", &city),
        Column::from_f64("label", &y),
    ])
    .unwrap()
}

fn regression_dataset() -> Dataset {
    let n = 120;
    let a: Vec<f64> = (0..n).map(|i| ((i * 7) % 31) as f64).collect();
    let b: Vec<f64> = (0..n).map(|i| ((i * 11) % 17) as f64).collect();
    let price: Vec<f64> = a.iter().zip(&b).map(|(a, b)| 3.0 * a - 2.0 * b).collect();
    Dataset::new(vec![
        Column::from_f64("a", &a),
        Column::from_f64("b", &b),
        Column::from_f64("price", &price),
    ])
    .unwrap()
}

fn pipeline() -> DiagnosisPipeline {
    DiagnosisPipeline::new(DiagnosisConfig::new().with_n_estimators(20)).with_dataset_id("synthetic")
}

fn run(dataset: &Dataset, target: &str) -> Diagnosis {
    pipeline().run_detailed(dataset, target, &NullSink).unwrap()
}

fn count(bundle: &DiagnosticBundle, kind: SuggestionType, priority: Priority) -> usize {
    bundle
        .suggestions
        .iter()
        .filter(|s| s.kind == kind && s.priority == priority)
        .count()
}

// ============================================================================
// Classification
// ============================================================================

#[test]
fn test_leaky_imbalanced_classification() {
    let bundle = run(&leaky_dataset(), "label").bundle;

    assert_eq!(bundle.task_type, TaskType::Classification);
    assert_eq!(bundle.issues.imbalance_ratio, Some(9.0));
    assert_eq!(count(&bundle, SuggestionType::Leakage, Priority::Critical), 1, "one leaked feature");
    assert_eq!(count(&bundle, SuggestionType::Collinearity, Priority::Medium), 1, "one duplicated pair");
    assert_eq!(count(&bundle, SuggestionType::Balancing, Priority::High), 1);

    let leaderboard = bundle.leaderboard.as_ref().expect("leaderboard");
    assert!(!leaderboard.is_empty());
    assert_eq!(leaderboard.metric, "F1");
    assert!(bundle.best_model.is_some());

    let leak = bundle.suggestions.iter().find(|s| s.kind == SuggestionType::Leakage).unwrap();
    assert_eq!(leak.feature, "leak");
    let pair = bundle.suggestions.iter().find(|s| s.kind == SuggestionType::Collinearity).unwrap();
    assert_eq!(pair.feature, "f1, f2");
}

#[test]
fn test_suggestions_follow_rule_order() {
    let bundle = run(&leaky_dataset(), "label").bundle;
    let order = |kind: SuggestionType| bundle.suggestions.iter().position(|s| s.kind == kind).unwrap();
    assert!(order(SuggestionType::Balancing) < order(SuggestionType::Leakage));
    assert!(order(SuggestionType::Leakage) < order(SuggestionType::Collinearity));
}

#[test]
fn test_categorical_feature_is_profiled_not_trained() {
    let diagnosis = run(&leaky_dataset(), "label");
    assert!(diagnosis.bundle.profile.column("city").is_some());
    let matrix = diagnosis.matrix.expect("feature matrix");
    assert!(!matrix.feature_names.iter().any(|f| f == "city"));
    assert_eq!(matrix.n_features(), 4);
}

#[test]
fn test_explanation_covers_capped_sample() {
    let config = DiagnosisConfig::new().with_n_estimators(20).with_sample_size(50);
    let diagnosis = DiagnosisPipeline::new(config)
        .run_detailed(&leaky_dataset(), "label", &NullSink)
        .unwrap();
    let explanation = diagnosis.explanation.expect("explanation");
    assert_eq!(explanation.n_rows(), 50);
    assert_eq!(diagnosis.bundle.feature_importance.len(), 4);
}

#[test]
fn test_stages_emit_events() {
    let sink = MemorySink::new();
    pipeline().run(&leaky_dataset(), "label", &sink).unwrap();
    for stage in ["profiling", "leakage", "model_selection", "explanation", "suggestions"] {
        assert!(!sink.for_stage(stage).is_empty(), "no events for stage {}", stage);
    }
}

#[test]
fn test_runs_are_deterministic() {
    let a = run(&leaky_dataset(), "label").bundle;
    let b = run(&leaky_dataset(), "label").bundle;
    let scores = |bundle: &DiagnosticBundle| -> Vec<(ModelKind, f64)> {
        bundle
            .leaderboard
            .as_ref()
            .unwrap()
            .results
            .iter()
            .map(|r| (r.model, r.mean_score))
            .collect()
    };
    assert_eq!(scores(&a), scores(&b));
    assert_eq!(a.suggestions, b.suggestions);
}

// ============================================================================
// Regression and failure modes
// ============================================================================

#[test]
fn test_regression_has_no_imbalance_or_fairness() {
    let bundle = run(&regression_dataset(), "price").bundle;
    assert_eq!(bundle.task_type, TaskType::Regression);
    assert_eq!(bundle.metric_name(), "R2");
    assert!(bundle.issues.imbalance_ratio.is_none());
    assert!(bundle.fairness.is_empty());
    assert!(bundle.issues.error_clusters.is_empty());
    assert!(bundle.best_score.unwrap() > 0.5, "linear signal should be learnable");
}

#[test]
fn test_single_valued_target_is_rejected() {
    let dataset = Dataset::new(vec![
        Column::from_f64("x", &[1.0, 2.0, 3.0, 4.0]),
        Column::from_f64("y", &[1.0, 1.0, 1.0, 1.0]),
    ])
    .unwrap();
    let result = pipeline().run(&dataset, "y", &NullSink);
    assert!(matches!(result, Err(DiagnosisError::ConfigurationError(_))));
}

#[test]
fn test_missing_target_rows_are_dropped_with_warning() {
    let n = 60;
    let x: Vec<f64> = (0..n).map(|i| (i % 13) as f64).collect();
    let y: Vec<Option<f64>> = (0..n).map(|i| if i % 20 == 0 { None } else { Some((i % 2) as f64) }).collect();
    let dataset = Dataset::new(vec![Column::from_f64("x", &x), Column::numeric("y", y)]).unwrap();

    let bundle = pipeline().run(&dataset, "y", &NullSink).unwrap();
    assert!(bundle.has_warning(WarningKind::DroppedTargetRows));
    assert_eq!(bundle.profile.dropped_target_rows, 3);
}

#[test]
fn test_no_model_trained_still_produces_bundle() {
    // An overflowed sensor column makes every candidate fail to fit
    let n = 60;
    let label: Vec<f64> = (0..n).map(|i| (i % 2) as f64).collect();
    let leak: Vec<f64> = label.iter().enumerate().map(|(i, v)| v + (i % 5) as f64 * 0.01).collect();
    let dataset = Dataset::new(vec![
        Column::from_f64("sensor", &vec![f64::INFINITY; n]),
        Column::from_f64("leak", &leak),
        Column::from_f64("label", &label),
    ])
    .unwrap();

    let diagnosis = run(&dataset, "label");
    let bundle = diagnosis.bundle;
    assert!(bundle.has_warning(WarningKind::NoModelTrained));
    assert!(bundle.leaderboard.is_none());
    assert!(bundle.best_model.is_none());
    assert!(bundle.best_score.is_none());
    assert!(diagnosis.explanation.is_none());
    assert!(bundle.fairness.is_empty());
    assert!(bundle.feature_importance.is_empty());

    assert_eq!(bundle.issues.target_leakage.len(), 1);
    assert_eq!(bundle.issues.target_leakage[0].feature, "leak");
    assert_eq!(count(&bundle, SuggestionType::Leakage, Priority::Critical), 1);
    assert!(bundle.insights.starts_with("No model could be trained to predict 'label'."));
}

#[test]
fn test_skewed_regression_target_gets_transformation() {
    let n = 100;
    let x: Vec<f64> = (0..n).map(|i| (i % 7) as f64).collect();
    let y: Vec<f64> = (0..n).map(|i| if i % 50 == 0 { 500.0 + i as f64 } else { (i % 23) as f64 }).collect();
    let dataset = Dataset::new(vec![Column::from_f64("x", &x), Column::from_f64("y", &y)]).unwrap();

    let bundle = run(&dataset, "y").bundle;
    assert_eq!(bundle.task_type, TaskType::Regression);
    assert!(bundle
        .suggestions
        .iter()
        .any(|s| s.kind == SuggestionType::Transformation && s.feature == "y"));
}

// ============================================================================
// Reports
// ============================================================================

#[test]
fn test_markdown_report_sections() {
    let bundle = run(&leaky_dataset(), "label").bundle;
    let md = markdown::render(&bundle);

    assert!(md.starts_with("# ExplainML++ Report"));
    assert!(md.contains("- **Dataset:** synthetic"));
    assert!(md.contains("- **Target:** label"));
    assert!(md.contains("## Leaderboard"));
    assert!(md.contains("## Suggestions"));
    assert!(md.contains("- [critical] Remove 'leak' (data leakage risk)."));
    assert!(md.contains(&bundle.insights));
}

#[test]
fn test_insights_name_model_and_metric() {
    let bundle = run(&leaky_dataset(), "label").bundle;
    let model = bundle.best_model.clone().unwrap();
    assert!(bundle.insights.starts_with(&format!("The {} model achieves an F1 score of", model)));
    assert!(bundle.insights.contains("class imbalance"));
    assert!(bundle.insights.contains("data leakage"));
    assert!(bundle.insights.contains("Recommendations: "));
}

#[test]
fn test_write_report_creates_parent_dirs() {
    let bundle = run(&regression_dataset(), "price").bundle;
    let dir = tempfile::tempdir().unwrap();

    let md_path = dir.path().join("nested/out/report.md");
    write_report(&bundle, &md_path, ReportFormat::Markdown).unwrap();
    let md = std::fs::read_to_string(&md_path).unwrap();
    assert!(md.contains("- **Task:** regression"));

    let json_path = dir.path().join("report.json");
    write_report(&bundle, &json_path, ReportFormat::from_path(&json_path)).unwrap();
    let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(value["target"], "price");
    assert_eq!(value["task_type"], "regression");
    let score = value["best_score"].as_f64().unwrap();
    assert!((score - bundle.best_score.unwrap()).abs() < 1e-9);
}

#[test]
fn test_report_format_parsing() {
    assert_eq!("json".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
    assert_eq!("MD".parse::<ReportFormat>().unwrap(), ReportFormat::Markdown);
    assert!("pdf".parse::<ReportFormat>().is_err());
    assert!(report::render(&run(&regression_dataset(), "price").bundle, ReportFormat::Json).is_ok());
}

// ============================================================================
// Remediation
// ============================================================================

#[test]
fn test_apply_fixes_drops_leak_and_balances() {
    let dataset = leaky_dataset();
    let config = DiagnosisConfig::new().with_n_estimators(20);
    let bundle = DiagnosisPipeline::new(config.clone()).run(&dataset, "label", &NullSink).unwrap();

    let remediated = apply_suggestions(&dataset, "label", &bundle.suggestions, &config).unwrap();
    assert!(remediated.dataset.column("leak").is_none());
    assert_eq!(remediated.dataset.n_rows(), 360, "minority grown to the majority count");

    let selection = DiagnosisPipeline::new(config)
        .select_models(&remediated.dataset, "label", &NullSink)
        .unwrap();
    assert_eq!(selection.leaderboard.len(), 3);
}
