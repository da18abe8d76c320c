//! Applies remediation suggestions to a dataset
//!
//! Produces a new [`Dataset`]; the input is never touched. Drops and transforms happen in
//! suggestion order, balancing last because it rewrites every row.

mod smote;

pub use smote::{Resampled, Smote};

use crate::config::DiagnosisConfig;
use crate::dataset::{Column, Dataset};
use crate::error::{DiagnosisError, Result};
use crate::preprocessing::LabelEncoder;
use crate::recommender::{Suggestion, SuggestionType};
use serde::{Deserialize, Serialize};

/// What happened to one suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    Applied,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationAction {
    pub kind: SuggestionType,
    pub feature: String,
    pub outcome: ActionOutcome,
    pub detail: String,
}

/// Remediated dataset plus the action log
#[derive(Debug, Clone)]
pub struct Remediated {
    pub dataset: Dataset,
    pub actions: Vec<RemediationAction>,
}

impl Remediated {
    pub fn applied(&self) -> impl Iterator<Item = &RemediationAction> {
        self.actions.iter().filter(|a| a.outcome == ActionOutcome::Applied)
    }
}

/// `sign(x) * ln(1 + |x|)`; defined for negative values too
pub fn signed_log1p(value: f64) -> f64 {
    value.signum() * value.abs().ln_1p()
}

pub fn apply_suggestions(
    dataset: &Dataset,
    target: &str,
    suggestions: &[Suggestion],
    config: &DiagnosisConfig,
) -> Result<Remediated> {
    if dataset.column(target).is_none() {
        return Err(DiagnosisError::FeatureNotFound(target.to_string()));
    }

    let mut current = dataset.clone();
    let mut actions = Vec::new();
    let mut balancing: Option<&Suggestion> = None;

    let mut record = |s: &Suggestion, outcome: ActionOutcome, detail: String| {
        actions.push(RemediationAction {
            kind: s.kind,
            feature: s.feature.clone(),
            outcome,
            detail,
        });
    };

    for suggestion in suggestions {
        let feature = suggestion.feature.as_str();
        match suggestion.kind {
            SuggestionType::Removal | SuggestionType::Leakage => {
                if feature == target {
                    record(suggestion, ActionOutcome::Skipped, "target is never dropped".to_string());
                } else if current.column(feature).is_none() {
                    record(suggestion, ActionOutcome::Skipped, "column not present".to_string());
                } else {
                    current = current.without_columns(&[feature]);
                    record(suggestion, ActionOutcome::Applied, format!("dropped '{}'", feature));
                }
            }
            SuggestionType::Transformation if feature == target => {
                record(suggestion, ActionOutcome::Skipped, "target is never transformed".to_string())
            }
            SuggestionType::Transformation => match current.column(feature).and_then(|c| c.as_numeric()) {
                Some(values) => {
                    let transformed: Vec<Option<f64>> = values.iter().map(|v| v.map(signed_log1p)).collect();
                    current = current.with_column(Column::numeric(feature, transformed))?;
                    record(suggestion, ActionOutcome::Applied, format!("log-transformed '{}'", feature));
                }
                _ => record(suggestion, ActionOutcome::Skipped, "no numeric feature to transform".to_string()),
            },
            SuggestionType::Balancing => balancing = Some(suggestion),
            SuggestionType::Imputation | SuggestionType::Collinearity | SuggestionType::Error => {
                record(suggestion, ActionOutcome::Skipped, "advisory".to_string())
            }
        }
    }

    if let Some(suggestion) = balancing {
        match balance(&current, target, config) {
            Ok((balanced, added)) => {
                current = balanced;
                record(suggestion, ActionOutcome::Applied, format!("SMOTE added {} rows", added));
            }
            Err(err) => record(suggestion, ActionOutcome::Skipped, err.to_string()),
        }
    }

    Ok(Remediated {
        dataset: current,
        actions,
    })
}

/// SMOTE over the numeric features; the result keeps only numeric features and the target
fn balance(dataset: &Dataset, target: &str, config: &DiagnosisConfig) -> Result<(Dataset, usize)> {
    let (clean, _) = dataset.drop_missing_target(target)?;
    let (features, target_column) = clean.split_target(target)?;
    let matrix = config.missing_policy.build_matrix(&features)?;
    let target_column = target_column.select_rows(&matrix.rows);

    let mut encoder = LabelEncoder::new();
    let codes = encoder.fit_transform(&target_column)?;

    // First row of each class stands in for the class label of synthetic rows
    let mut representative = vec![usize::MAX; encoder.n_classes()];
    for (row, &code) in codes.iter().enumerate() {
        if representative[code] == usize::MAX {
            representative[code] = row;
        }
    }

    let resampled = Smote::new()
        .with_seed(config.selection.random_state)
        .fit_resample(&matrix.x, &codes)?;
    let added = resampled.x.nrows() - matrix.x.nrows();

    let mut columns: Vec<Column> = matrix
        .feature_names
        .iter()
        .enumerate()
        .map(|(j, name)| Column::numeric(name.clone(), resampled.x.column(j).iter().map(|&v| Some(v)).collect()))
        .collect();
    let label_rows: Vec<usize> = resampled.y.iter().map(|&code| representative[code]).collect();
    columns.push(target_column.select_rows(&label_rows));

    Ok((Dataset::new(columns)?, added))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommender::Priority;

    fn suggestion(kind: SuggestionType, feature: &str) -> Suggestion {
        Suggestion {
            kind,
            feature: feature.to_string(),
            issue: String::new(),
            suggestion: String::new(),
            priority: Priority::High,
        }
    }

    fn dataset() -> Dataset {
        let n = 20;
        Dataset::new(vec![
            Column::from_f64("a", &(0..n).map(|i| i as f64).collect::<Vec<_>>()),
            Column::from_f64("skewed", &(0..n).map(|i| (i * i * i) as f64).collect::<Vec<_>>()),
            Column::from_f64("leak", &(0..n).map(|i| if i < 16 { 0.0 } else { 1.0 }).collect::<Vec<_>>()),
            Column::from_strs("city", &(0..n).map(|i| if i % 2 == 0 { "x" } else { "y" }).collect::<Vec<_>>()),
            Column::from_strs("label", &(0..n).map(|i| if i < 16 { "no" } else { "yes" }).collect::<Vec<_>>()),
        ])
        .unwrap()
    }

    #[test]
    fn test_drop_and_transform() {
        let suggestions = vec![
            suggestion(SuggestionType::Leakage, "leak"),
            suggestion(SuggestionType::Transformation, "skewed"),
            suggestion(SuggestionType::Removal, "label"),
            suggestion(SuggestionType::Imputation, "a"),
        ];
        let out = apply_suggestions(&dataset(), "label", &suggestions, &DiagnosisConfig::default()).unwrap();

        assert!(out.dataset.column("leak").is_none());
        assert!(out.dataset.column("label").is_some());
        let skewed = out.dataset.column("skewed").unwrap().as_numeric().unwrap();
        assert!((skewed[2].unwrap() - 9.0f64.ln()).abs() < 1e-12);
        assert_eq!(out.applied().count(), 2);
        assert_eq!(out.actions[2].outcome, ActionOutcome::Skipped);
        assert_eq!(out.actions[3].detail, "advisory");
    }

    #[test]
    fn test_numeric_target_is_not_transformed() {
        let ds = Dataset::new(vec![
            Column::from_f64("a", &(0..20).map(|i| i as f64).collect::<Vec<_>>()),
            Column::from_f64("price", &(0..20).map(|i| (i * i) as f64).collect::<Vec<_>>()),
        ])
        .unwrap();
        let suggestions = vec![suggestion(SuggestionType::Transformation, "price")];
        let out = apply_suggestions(&ds, "price", &suggestions, &DiagnosisConfig::default()).unwrap();

        assert_eq!(out.actions[0].outcome, ActionOutcome::Skipped);
        assert_eq!(out.actions[0].detail, "target is never transformed");
        let price = out.dataset.column("price").unwrap().as_numeric().unwrap();
        assert_eq!(price[3], Some(9.0));
    }

    #[test]
    fn test_balancing_oversamples_minority() {
        let suggestions = vec![suggestion(SuggestionType::Balancing, "label")];
        let out = apply_suggestions(&dataset(), "label", &suggestions, &DiagnosisConfig::default()).unwrap();
        let labels = out.dataset.column("label").unwrap();
        assert_eq!(out.dataset.n_rows(), 32);
        assert!(out.dataset.column("city").is_none());
        let yes = (0..labels.len()).filter(|&i| labels.value_label(i).as_deref() == Some("yes")).count();
        assert_eq!(yes, 16);
        assert_eq!(out.actions[0].outcome, ActionOutcome::Applied);
    }

    #[test]
    fn test_input_is_untouched() {
        let original = dataset();
        let suggestions = vec![suggestion(SuggestionType::Removal, "a")];
        apply_suggestions(&original, "label", &suggestions, &DiagnosisConfig::default()).unwrap();
        assert!(original.column("a").is_some());
    }

    #[test]
    fn test_signed_log1p() {
        assert_eq!(signed_log1p(0.0), 0.0);
        assert!((signed_log1p(-(std::f64::consts::E - 1.0)) + 1.0).abs() < 1e-12);
    }
}
