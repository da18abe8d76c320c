//! File ingestion through polars

use super::{Column, Dataset};
use crate::error::{DiagnosisError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// Supported input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Tsv,
    Json,
    JsonLines,
    Parquet,
}

impl FileFormat {
    /// Detect the format from the file extension; unknown extensions are read as CSV
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        match ext.as_str() {
            "tsv" => FileFormat::Tsv,
            "json" => FileFormat::Json,
            "jsonl" | "ndjson" => FileFormat::JsonLines,
            "parquet" | "pq" => FileFormat::Parquet,
            _ => FileFormat::Csv,
        }
    }
}

/// Loads tabular files into a [`Dataset`] with cleaned column names
pub struct DataLoader {
    infer_schema_length: usize,
    sanitize_names: bool,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            infer_schema_length: 1000,
            sanitize_names: true,
        }
    }

    /// Rows scanned to infer CSV column types
    pub fn with_infer_schema_length(mut self, rows: usize) -> Self {
        self.infer_schema_length = rows.max(1);
        self
    }

    /// Keep the raw column names
    pub fn with_sanitize_names(mut self, sanitize: bool) -> Self {
        self.sanitize_names = sanitize;
        self
    }

    /// Load a file, picking the reader from its extension
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Dataset> {
        let path = path.as_ref();
        let df = self.load_frame(path, FileFormat::from_path(path))?;
        let dataset = dataframe_to_dataset(&df)?;
        Ok(if self.sanitize_names {
            dataset.with_sanitized_names()
        } else {
            dataset
        })
    }

    /// Read the raw polars frame
    pub fn load_frame(&self, path: &Path, format: FileFormat) -> Result<DataFrame> {
        let file = File::open(path).map_err(|e| {
            DiagnosisError::DataError(format!("Cannot open '{}': {}", path.display(), e))
        })?;

        let df = match format {
            FileFormat::Csv | FileFormat::Tsv => {
                let separator = if format == FileFormat::Tsv { b'\t' } else { b',' };
                CsvReadOptions::default()
                    .with_has_header(true)
                    .with_infer_schema_length(Some(self.infer_schema_length))
                    .with_parse_options(CsvParseOptions::default().with_separator(separator))
                    .into_reader_with_file_handle(file)
                    .finish()?
            }
            FileFormat::Json => JsonReader::new(file).finish()?,
            FileFormat::JsonLines => JsonReader::new(file)
                .with_json_format(JsonFormat::JsonLines)
                .finish()?,
            FileFormat::Parquet => ParquetReader::new(file).finish()?,
        };
        Ok(df)
    }
}

fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Boolean
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Convert a polars frame; numeric and boolean columns become numeric, everything else text
pub fn dataframe_to_dataset(df: &DataFrame) -> Result<Dataset> {
    let mut columns = Vec::with_capacity(df.width());
    for col in df.get_columns() {
        let series = col.as_materialized_series();
        let name = series.name().to_string();

        if is_numeric_dtype(series.dtype()) {
            let casted = series.cast(&DataType::Float64)?;
            let values: Vec<Option<f64>> = casted
                .f64()?
                .into_iter()
                .map(|v| v.filter(|x| !x.is_nan()))
                .collect();
            columns.push(Column::numeric(name, values));
        } else {
            let casted = series.cast(&DataType::String)?;
            let values: Vec<Option<String>> = casted
                .str()?
                .into_iter()
                .map(|v| v.map(str::to_string))
                .collect();
            columns.push(Column::categorical(name, values));
        }
    }
    Dataset::new(columns)
}
