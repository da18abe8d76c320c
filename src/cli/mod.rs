//! explainml CLI Module
//!
//! Command-line interface for dataset diagnosis and inspection.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::DiagnosisConfig;
use crate::dataset::DataLoader;
use crate::events::TracingSink;
use crate::pipeline::DiagnosisPipeline;
use crate::recommender::Priority;
use crate::remediation::{apply_suggestions, ActionOutcome};
use crate::report::{write_report, ReportFormat};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn priority_tag(priority: Priority) -> ColoredString {
    let tag = format!("[{}]", priority);
    match priority {
        Priority::Critical => tag.red().bold(),
        Priority::High => tag.yellow(),
        Priority::Medium => tag.truecolor(120, 170, 255),
        Priority::Low => dim(&tag),
    }
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "explainml")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Automated dataset diagnosis: profiling, model selection and explanations")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Diagnose a dataset against a target column
    Diagnose {
        /// Input data file (CSV, TSV, JSON or Parquet)
        data: PathBuf,

        /// Target column name
        #[arg(short, long)]
        target: String,

        /// Report file
        #[arg(short, long, default_value = "reports/report.md")]
        output: PathBuf,

        /// Report format (markdown, json); defaults to the output extension
        #[arg(short, long)]
        format: Option<String>,

        /// JSON file with configuration overrides
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Apply the suggested fixes and re-run model selection
        #[arg(long)]
        apply_fixes: bool,
    },

    /// Show data information
    Info {
        /// Input data file
        data: PathBuf,
    },
}

pub struct DiagnoseArgs<'a> {
    pub data: &'a Path,
    pub target: &'a str,
    pub output: &'a Path,
    pub format: Option<&'a str>,
    pub config: Option<&'a Path>,
    pub apply_fixes: bool,
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_diagnose(args: DiagnoseArgs<'_>) -> anyhow::Result<()> {
    section("Diagnose");

    let config = match args.config {
        Some(path) => DiagnosisConfig::from_json_file(path)?,
        None => DiagnosisConfig::default(),
    };
    let format = match args.format {
        Some(f) => f.parse::<ReportFormat>()?,
        None => ReportFormat::from_path(args.output),
    };

    step_run("Loading data");
    let start = Instant::now();
    let dataset = DataLoader::new().load(args.data)?;
    step_done(&format!("{} rows × {} cols in {:?}", dataset.n_rows(), dataset.n_cols(), start.elapsed()));

    let dataset_id = args
        .data
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("dataset")
        .to_string();
    let pipeline = DiagnosisPipeline::new(config).with_dataset_id(dataset_id);

    step_run("Running diagnosis");
    let start = Instant::now();
    let bundle = pipeline.run(&dataset, args.target, &TracingSink)?;
    step_done(&format!("{:?}", start.elapsed()));

    println!();
    println!("  {:<16} {}", muted("Task"), bundle.task_type.to_string().white().bold());
    if let Some(ratio) = bundle.issues.imbalance_ratio {
        println!("  {:<16} {}", muted("Imbalance"), format!("{:.2}", ratio).white());
    }
    match (&bundle.best_model, bundle.best_score) {
        (Some(model), Some(score)) => {
            println!("  {:<16} {}", muted("Best model"), model.white().bold());
            println!("  {:<16} {}", muted(bundle.metric_name()), format!("{:.4}", score).white().bold());
        }
        _ => println!("  {:<16} {}", muted("Best model"), "none".yellow()),
    }

    if !bundle.warnings.is_empty() {
        section("Warnings");
        for warning in &bundle.warnings {
            println!("  {} {}", "!".yellow(), warning.message);
        }
    }

    if !bundle.suggestions.is_empty() {
        section("Suggestions");
        for s in &bundle.suggestions {
            println!("  {} {}", priority_tag(s.priority), s.suggestion);
        }
    }

    println!();
    step_run(&format!("Writing report → {}", args.output.display()));
    write_report(&bundle, args.output, format)?;
    step_done(&format!("{:?}", format).to_lowercase());

    if args.apply_fixes {
        section("Apply fixes");
        let remediated = apply_suggestions(&dataset, args.target, &bundle.suggestions, pipeline.config())?;
        for action in &remediated.actions {
            let mark = match action.outcome {
                ActionOutcome::Applied => ok("✓"),
                ActionOutcome::Skipped => dim("·"),
            };
            println!("  {} {:<15} {:<20} {}", mark, action.kind.as_str(), action.feature, dim(&action.detail));
        }

        step_run("Re-running model selection");
        let start = Instant::now();
        let selection = pipeline.select_models(&remediated.dataset, args.target, &TracingSink)?;
        step_done(&format!("{:?}", start.elapsed()));

        let best = selection.leaderboard.best();
        if let Some(best) = best {
            println!();
            println!(
                "  {} {} {} {:.4}",
                ok("best"),
                best.model.name().white().bold(),
                muted(&format!("{}:", selection.leaderboard.metric)),
                best.mean_score
            );
            if let Some(before) = bundle.best_score {
                let delta = best.mean_score - before;
                let text = format!("{:+.4}", delta);
                println!("  {:<16} {}", muted("Change"), if delta >= 0.0 { ok(&text) } else { text.red() });
            }
        }
    }

    println!();
    Ok(())
}

pub fn cmd_info(data_path: &Path) -> anyhow::Result<()> {
    section("Data Info");

    let dataset = DataLoader::new().load(data_path)?;

    println!("  {:<12} {}", muted("File"), data_path.display());
    println!("  {:<12} {}", muted("Rows"), dataset.n_rows());
    println!("  {:<12} {}", muted("Columns"), dataset.n_cols());
    println!();

    println!("  {:<20} {:<12} {:>8} {:>8}", muted("Column"), muted("Type"), muted("Missing"), muted("Unique"));
    println!("  {}", dim(&"─".repeat(52)));
    for column in dataset.columns() {
        println!(
            "  {:<20} {:<12} {:>8} {:>8}",
            column.name(),
            column.kind().as_str().truecolor(140, 140, 140),
            column.missing_count(),
            column.n_unique()
        );
    }
    println!();
    Ok(())
}
