//! Natural-language summary of a diagnosis

use crate::pipeline::DiagnosticBundle;
use crate::recommender::{Suggestion, SuggestionType};

/// A short paragraph: best model and score, one sentence per notable kind of finding,
/// then the first two recommended actions.
pub fn summarize(bundle: &DiagnosticBundle) -> String {
    let mut text = match (&bundle.best_model, bundle.best_score) {
        (Some(model), Some(score)) => format!(
            "The {} model achieves an {} score of {:.2} in predicting '{}'. ",
            model,
            bundle.metric_name(),
            score,
            bundle.target
        ),
        _ => format!("No model could be trained to predict '{}'. ", bundle.target),
    };

    let has = |kind: SuggestionType| bundle.suggestions.iter().any(|s| s.kind == kind);
    if has(SuggestionType::Balancing) {
        text.push_str("Performance may be limited by class imbalance; resampling could help. ");
    }
    if has(SuggestionType::Removal) {
        text.push_str("Several features have high missing rates and should be dropped to improve reliability. ");
    }
    if has(SuggestionType::Error) {
        text.push_str("The model struggles with specific groups of rows, suggesting bias or data gaps. ");
    }
    if has(SuggestionType::Leakage) {
        text.push_str("Potential data leakage was detected. ");
    }

    let actions = leading_actions(&bundle.suggestions, 2);
    if actions.is_empty() {
        text.push_str("No remediation is needed.");
    } else {
        text.push_str("Recommendations: ");
        text.push_str(&actions.join(", "));
        text.push('.');
    }
    text
}

/// Suggestion text per kind, kinds in order of first appearance; a later suggestion
/// of the same kind replaces the earlier one
fn leading_actions(suggestions: &[Suggestion], limit: usize) -> Vec<&str> {
    let mut latest: Vec<(SuggestionType, &str)> = Vec::new();
    for suggestion in suggestions {
        let text = suggestion.suggestion.trim_end_matches('.');
        match latest.iter_mut().find(|(kind, _)| *kind == suggestion.kind) {
            Some(entry) => entry.1 = text,
            None => latest.push((suggestion.kind, text)),
        }
    }
    latest.into_iter().take(limit).map(|(_, text)| text).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommender::Priority;

    fn suggestion(kind: SuggestionType, text: &str) -> Suggestion {
        Suggestion {
            kind,
            feature: "f".to_string(),
            issue: String::new(),
            suggestion: text.to_string(),
            priority: Priority::High,
        }
    }

    #[test]
    fn test_leading_actions_keep_last_of_each_kind() {
        let suggestions = vec![
            suggestion(SuggestionType::Transformation, "Apply log transform to 'a'."),
            suggestion(SuggestionType::Transformation, "Apply log transform to 'b'."),
            suggestion(SuggestionType::Leakage, "Remove 'x' (data leakage risk)."),
            suggestion(SuggestionType::Collinearity, "Remove one of 'p' or 'q'."),
        ];
        assert_eq!(
            leading_actions(&suggestions, 2),
            vec!["Apply log transform to 'b'", "Remove 'x' (data leakage risk)"]
        );
    }

    #[test]
    fn test_leading_actions_empty() {
        assert!(leading_actions(&[], 2).is_empty());
    }
}
