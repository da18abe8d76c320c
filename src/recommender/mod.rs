//! Rule-based remediation suggestions
//!
//! Every rule reads one kind of finding and fires independently; nothing is deduplicated.
//! Output order is fixed: balancing, missing data, skew, leakage, collinearity, errors.

use crate::config::ThresholdConfig;
use crate::explainability::ErrorCluster;
use crate::profiling::{CollinearityFinding, LeakageFinding};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of remediation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionType {
    Balancing,
    Removal,
    Imputation,
    Transformation,
    Leakage,
    Collinearity,
    Error,
}

impl SuggestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionType::Balancing => "balancing",
            SuggestionType::Removal => "removal",
            SuggestionType::Imputation => "imputation",
            SuggestionType::Transformation => "transformation",
            SuggestionType::Leakage => "leakage",
            SuggestionType::Collinearity => "collinearity",
            SuggestionType::Error => "error",
        }
    }
}

impl fmt::Display for SuggestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recommended action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(rename = "type")]
    pub kind: SuggestionType,
    /// Affected feature(s); pairs and cluster features are comma-joined
    pub feature: String,
    pub issue: String,
    pub suggestion: String,
    pub priority: Priority,
}

/// Every finding the rules read
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssuesBundle {
    pub imbalance_ratio: Option<f64>,
    /// (column, missing %) in column order
    pub missing_percentage: Vec<(String, f64)>,
    /// (column, skewness) in column order
    pub numeric_skew: Vec<(String, f64)>,
    pub target_leakage: Vec<LeakageFinding>,
    pub high_correlation: Vec<CollinearityFinding>,
    pub error_clusters: Vec<ErrorCluster>,
}

/// Applies the rule table to an [`IssuesBundle`]
#[derive(Debug, Clone)]
pub struct SuggestionEngine {
    thresholds: ThresholdConfig,
}

impl Default for SuggestionEngine {
    fn default() -> Self {
        Self::new(ThresholdConfig::default())
    }
}

impl SuggestionEngine {
    pub fn new(thresholds: ThresholdConfig) -> Self {
        Self { thresholds }
    }

    pub fn generate(&self, issues: &IssuesBundle, target: &str) -> Vec<Suggestion> {
        let mut suggestions = Vec::new();
        let t = &self.thresholds;

        if let Some(ratio) = issues.imbalance_ratio {
            if ratio > t.imbalance_trigger {
                suggestions.push(Suggestion {
                    kind: SuggestionType::Balancing,
                    feature: target.to_string(),
                    issue: format!("High class imbalance ({:.1}x)", ratio),
                    suggestion: "Apply SMOTE or class weighting.".to_string(),
                    priority: Priority::High,
                });
            }
        }

        for (column, pct) in &issues.missing_percentage {
            if *pct > t.missing_removal_pct {
                suggestions.push(Suggestion {
                    kind: SuggestionType::Removal,
                    feature: column.clone(),
                    issue: format!("{:.1}% missing", pct),
                    suggestion: format!("Remove '{}' due to excessive missing data.", column),
                    priority: Priority::High,
                });
            } else if *pct > t.missing_imputation_pct {
                suggestions.push(Suggestion {
                    kind: SuggestionType::Imputation,
                    feature: column.clone(),
                    issue: format!("{:.1}% missing", pct),
                    suggestion: format!("Impute '{}' using median or mode.", column),
                    priority: Priority::Medium,
                });
            }
        }

        for (column, skew) in &issues.numeric_skew {
            if skew.abs() > t.skew_trigger {
                suggestions.push(Suggestion {
                    kind: SuggestionType::Transformation,
                    feature: column.clone(),
                    issue: format!("High skewness ({:.2})", skew),
                    suggestion: format!("Apply log transform to '{}'.", column),
                    priority: Priority::High,
                });
            }
        }

        for finding in &issues.target_leakage {
            suggestions.push(Suggestion {
                kind: SuggestionType::Leakage,
                feature: finding.feature.clone(),
                issue: format!("High corr with target ({:.2})", finding.correlation),
                suggestion: format!("Remove '{}' (data leakage risk).", finding.feature),
                priority: Priority::Critical,
            });
        }

        for pair in &issues.high_correlation {
            suggestions.push(Suggestion {
                kind: SuggestionType::Collinearity,
                feature: format!("{}, {}", pair.feature_a, pair.feature_b),
                issue: "High correlation".to_string(),
                suggestion: format!("Remove one of '{}' or '{}'.", pair.feature_a, pair.feature_b),
                priority: Priority::Medium,
            });
        }

        for cluster in &issues.error_clusters {
            suggestions.push(Suggestion {
                kind: SuggestionType::Error,
                feature: cluster.features.join(", "),
                issue: format!("High errors in {}", cluster.condition),
                suggestion: "Collect more data or create interaction feature.".to_string(),
                priority: Priority::High,
            });
        }

        suggestions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiling::CorrelationMethod;

    fn missing(pct: f64) -> IssuesBundle {
        IssuesBundle {
            missing_percentage: vec![("cabin".to_string(), pct)],
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_thresholds() {
        let engine = SuggestionEngine::default();

        let high = engine.generate(&missing(55.0), "y");
        assert_eq!(high.len(), 1);
        assert_eq!(high[0].kind, SuggestionType::Removal);
        assert_eq!(high[0].priority, Priority::High);
        assert_eq!(high[0].issue, "55.0% missing");

        let medium = engine.generate(&missing(30.0), "y");
        assert_eq!(medium.len(), 1);
        assert_eq!(medium[0].kind, SuggestionType::Imputation);
        assert_eq!(medium[0].priority, Priority::Medium);

        assert!(engine.generate(&missing(15.0), "y").is_empty());
        assert!(engine.generate(&missing(50.0), "y")[0].kind == SuggestionType::Imputation);
    }

    #[test]
    fn test_rule_order_and_priorities() {
        let issues = IssuesBundle {
            imbalance_ratio: Some(9.0),
            missing_percentage: vec![("a".to_string(), 0.0)],
            numeric_skew: vec![("fare".to_string(), -3.25), ("age".to_string(), 0.4)],
            target_leakage: vec![LeakageFinding {
                feature: "leak".to_string(),
                correlation: 0.999,
                method: CorrelationMethod::PointBiserial,
            }],
            high_correlation: vec![CollinearityFinding {
                feature_a: "f1".to_string(),
                feature_b: "f2".to_string(),
                correlation: 1.0,
            }],
            error_clusters: vec![ErrorCluster {
                condition: "age≈61.0, fare≈7.5".to_string(),
                size: 4,
                features: vec!["age".to_string(), "fare".to_string()],
                centers: vec![61.0, 7.5],
            }],
        };
        let suggestions = SuggestionEngine::default().generate(&issues, "survived");
        let kinds: Vec<SuggestionType> = suggestions.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SuggestionType::Balancing,
                SuggestionType::Transformation,
                SuggestionType::Leakage,
                SuggestionType::Collinearity,
                SuggestionType::Error,
            ]
        );
        assert_eq!(suggestions[0].feature, "survived");
        assert_eq!(suggestions[0].issue, "High class imbalance (9.0x)");
        assert_eq!(suggestions[1].issue, "High skewness (-3.25)");
        assert_eq!(suggestions[2].priority, Priority::Critical);
        assert_eq!(suggestions[2].issue, "High corr with target (1.00)");
        assert_eq!(suggestions[3].feature, "f1, f2");
        assert_eq!(suggestions[4].feature, "age, fare");
        assert_eq!(suggestions[4].issue, "High errors in age≈61.0, fare≈7.5");
    }

    #[test]
    fn test_balanced_regression_has_no_balancing() {
        let issues = IssuesBundle {
            imbalance_ratio: None,
            ..Default::default()
        };
        assert!(SuggestionEngine::default().generate(&issues, "price").is_empty());
        let mild = IssuesBundle {
            imbalance_ratio: Some(2.0),
            ..Default::default()
        };
        assert!(SuggestionEngine::default().generate(&mild, "y").is_empty());
    }

    #[test]
    fn test_suggestion_serializes_type_key() {
        let suggestion = Suggestion {
            kind: SuggestionType::Leakage,
            feature: "x".to_string(),
            issue: "i".to_string(),
            suggestion: "s".to_string(),
            priority: Priority::Critical,
        };
        let json = serde_json::to_string(&suggestion).unwrap();
        assert!(json.contains(r#""type":"leakage""#));
        assert!(json.contains(r#""priority":"critical""#));
    }
}
