//! Markdown rendering of a [`DiagnosticBundle`]

use crate::pipeline::DiagnosticBundle;

/// Render the whole bundle. Sections with nothing to show are left out; suggestions keep
/// the order the engine produced.
pub fn render(bundle: &DiagnosticBundle) -> String {
    let mut md = String::new();

    md.push_str("# ExplainML++ Report\n\n");
    md.push_str(&format!("*Generated: {}*\n\n", bundle.generated_at.format("%Y-%m-%d %H:%M UTC")));
    md.push_str(&format!("- **Dataset:** {}\n", bundle.dataset_id));
    md.push_str(&format!("- **Target:** {}\n", bundle.target));
    md.push_str(&format!("- **Task:** {}\n", bundle.task_type));
    md.push_str(&format!(
        "- **Rows:** {} ({} columns)\n",
        bundle.profile.n_rows, bundle.profile.n_cols
    ));
    match (&bundle.best_model, bundle.best_score) {
        (Some(model), Some(score)) => md.push_str(&format!(
            "- **Best Model:** {} ({}: {:.3})\n",
            model,
            bundle.metric_name(),
            score
        )),
        _ => md.push_str("- **Best Model:** none\n"),
    }
    if let Some(method) = bundle.attribution_method {
        md.push_str(&format!("- **Attribution:** {}\n", method.as_str()));
    }
    md.push('\n');

    if let Some(leaderboard) = &bundle.leaderboard {
        md.push_str("## Leaderboard\n\n");
        md.push_str(&format!("| Rank | Model | Mean {} | Std |\n", leaderboard.metric));
        md.push_str("|------|-------|------|-----|\n");
        for (rank, result) in leaderboard.results.iter().enumerate() {
            md.push_str(&format!(
                "| {} | {} | {:.3} | {:.3} |\n",
                rank + 1,
                result.model,
                result.mean_score,
                result.std_score
            ));
        }
        for failure in &leaderboard.failures {
            md.push_str(&format!("\n- {} failed: {}", failure.model, failure.reason));
        }
        md.push('\n');
    }

    if !bundle.warnings.is_empty() {
        md.push_str("## Warnings\n\n");
        for warning in &bundle.warnings {
            md.push_str(&format!("- {}\n", warning.message));
        }
        md.push('\n');
    }

    md.push_str("## Findings\n\n");
    if let Some(ratio) = bundle.issues.imbalance_ratio {
        md.push_str(&format!("- **Imbalance ratio:** {:.2}\n", ratio));
    }
    for (column, pct) in bundle.issues.missing_percentage.iter().filter(|(_, pct)| *pct > 0.0) {
        md.push_str(&format!("- **Missing:** {} ({:.1}%)\n", column, pct));
    }
    for finding in &bundle.issues.target_leakage {
        md.push_str(&format!(
            "- **Leakage:** {} (corr {:.3}, {})\n",
            finding.feature,
            finding.correlation,
            finding.method.as_str()
        ));
    }
    for pair in &bundle.issues.high_correlation {
        md.push_str(&format!(
            "- **Collinear:** {} / {} (corr {:.3})\n",
            pair.feature_a, pair.feature_b, pair.correlation
        ));
    }
    for cluster in &bundle.issues.error_clusters {
        md.push_str(&format!("- **Error cluster:** {} ({} rows)\n", cluster.condition, cluster.size));
    }
    md.push('\n');

    if !bundle.feature_importance.is_empty() {
        md.push_str("## Feature Importance\n\n| Feature | Mean abs. attribution |\n|---------|------|\n");
        for (feature, value) in bundle.feature_importance.iter().take(10) {
            md.push_str(&format!("| {} | {:.4} |\n", feature, value));
        }
        md.push('\n');
    }

    if !bundle.fairness.is_empty() {
        md.push_str("## Fairness\n\n");
        md.push_str("| Attribute | Group | Size | Accuracy | Positive rate |\n");
        md.push_str("|-----------|-------|------|----------|---------------|\n");
        for result in &bundle.fairness {
            for group in &result.groups {
                md.push_str(&format!(
                    "| {} | {} | {} | {:.3} | {:.3} |\n",
                    result.attribute,
                    group.group_value,
                    group.group_size,
                    group.accuracy,
                    group.predicted_positive_rate
                ));
            }
        }
        md.push('\n');
    }

    if !bundle.suggestions.is_empty() {
        md.push_str("## Suggestions\n\n");
        for s in &bundle.suggestions {
            md.push_str(&format!("- [{}] {}\n", s.priority, s.suggestion));
        }
        md.push('\n');
    }

    md.push_str("## Summary\n\n");
    md.push_str(&bundle.insights);
    md.push('\n');
    md
}
