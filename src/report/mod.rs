//! Report emission
//!
//! Renders a [`DiagnosticBundle`] as Markdown or pretty JSON. Renderers only read the bundle;
//! scores and suggestion order come through unchanged.

pub mod insights;
pub mod markdown;

use crate::error::{DiagnosisError, Result};
use crate::pipeline::DiagnosticBundle;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Markdown,
    Json,
}

impl ReportFormat {
    /// Guess from a file extension; anything but `.json` is Markdown
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ReportFormat::Json,
            _ => ReportFormat::Markdown,
        }
    }
}

impl FromStr for ReportFormat {
    type Err = DiagnosisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(ReportFormat::Markdown),
            "json" => Ok(ReportFormat::Json),
            other => Err(DiagnosisError::ConfigurationError(format!(
                "Unknown report format '{}' (expected markdown or json)",
                other
            ))),
        }
    }
}

pub fn render(bundle: &DiagnosticBundle, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Markdown => Ok(markdown::render(bundle)),
        ReportFormat::Json => Ok(serde_json::to_string_pretty(bundle)?),
    }
}

/// Write the report, creating parent directories as needed
pub fn write_report(bundle: &DiagnosticBundle, path: impl AsRef<Path>, format: ReportFormat) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, render(bundle, format)?)?;
    Ok(())
}
