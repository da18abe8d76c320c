//! Tabular dataset model
//!
//! A [`Dataset`] is an ordered collection of equally long, named columns. Every operation
//! that changes the data returns a new value; the caller's dataset is never touched.

mod loader;

pub use loader::{DataLoader, FileFormat};

use crate::error::{DiagnosisError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Declared value domain of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Categorical => "categorical",
        }
    }
}

/// Column storage; `None` marks a missing cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
}

/// A named column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    name: String,
    data: ColumnData,
}

/// Render a numeric cell the way it reads in a CSV (`1` rather than `1.0`)
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Replace every character outside `[A-Za-z0-9_]` with an underscore
pub fn sanitize_column_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

fn numeric_key(value: f64) -> u64 {
    // -0.0 and 0.0 are the same category
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numeric(values),
        }
    }

    /// Numeric column without missing values; NaN is read as missing
    pub fn from_f64(name: impl Into<String>, values: &[f64]) -> Self {
        Self::numeric(
            name,
            values
                .iter()
                .map(|&v| if v.is_nan() { None } else { Some(v) })
                .collect(),
        )
    }

    pub fn categorical(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Categorical(values),
        }
    }

    pub fn from_strs(name: impl Into<String>, values: &[&str]) -> Self {
        Self::categorical(name, values.iter().map(|v| Some(v.to_string())).collect())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn kind(&self) -> ColumnKind {
        match self.data {
            ColumnData::Numeric(_) => ColumnKind::Numeric,
            ColumnData::Categorical(_) => ColumnKind::Categorical,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.kind() == ColumnKind::Numeric
    }

    pub fn len(&self) -> usize {
        match &self.data {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_missing(&self, row: usize) -> bool {
        match &self.data {
            ColumnData::Numeric(v) => v[row].is_none(),
            ColumnData::Categorical(v) => v[row].is_none(),
        }
    }

    pub fn missing_count(&self) -> usize {
        (0..self.len()).filter(|&i| self.is_missing(i)).count()
    }

    /// Number of distinct non-missing values
    pub fn n_unique(&self) -> usize {
        match &self.data {
            ColumnData::Numeric(v) => v
                .iter()
                .flatten()
                .map(|&x| numeric_key(x))
                .collect::<HashSet<_>>()
                .len(),
            ColumnData::Categorical(v) => v
                .iter()
                .flatten()
                .map(String::as_str)
                .collect::<HashSet<_>>()
                .len(),
        }
    }

    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match &self.data {
            ColumnData::Numeric(v) => Some(v),
            ColumnData::Categorical(_) => None,
        }
    }

    pub fn as_categorical(&self) -> Option<&[Option<String>]> {
        match &self.data {
            ColumnData::Categorical(v) => Some(v),
            ColumnData::Numeric(_) => None,
        }
    }

    /// Cell rendered as a group key; `None` when missing
    pub fn value_label(&self, row: usize) -> Option<String> {
        match &self.data {
            ColumnData::Numeric(v) => v[row].map(format_value),
            ColumnData::Categorical(v) => v[row].clone(),
        }
    }

    /// Copy of the rows at `indices`, in that order
    pub fn select_rows(&self, indices: &[usize]) -> Column {
        let data = match &self.data {
            ColumnData::Numeric(v) => ColumnData::Numeric(indices.iter().map(|&i| v[i]).collect()),
            ColumnData::Categorical(v) => {
                ColumnData::Categorical(indices.iter().map(|&i| v[i].clone()).collect())
            }
        };
        Column {
            name: self.name.clone(),
            data,
        }
    }

    pub fn renamed(&self, name: impl Into<String>) -> Column {
        Column {
            name: name.into(),
            data: self.data.clone(),
        }
    }
}

/// Identifies the label column and checks that it is usable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub name: String,
}

impl TargetSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Reject absent, ID-like and single-valued targets
    pub fn validate<'a>(&self, dataset: &'a Dataset) -> Result<&'a Column> {
        let column = dataset.column(&self.name).ok_or_else(|| {
            DiagnosisError::ConfigurationError(format!(
                "Target column '{}' not found. Available columns: {}",
                self.name,
                dataset.column_names().join(", ")
            ))
        })?;

        let n_unique = column.n_unique();
        if n_unique == dataset.n_rows() {
            return Err(DiagnosisError::ConfigurationError(format!(
                "Target column '{}' has a unique value for every row; it looks like an ID, not a label",
                self.name
            )));
        }
        if n_unique < 2 {
            return Err(DiagnosisError::ConfigurationError(format!(
                "Target column '{}' must have at least 2 distinct values, found {}",
                self.name, n_unique
            )));
        }
        Ok(column)
    }
}

/// Ordered collection of named, equally long columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Dataset {
    /// Build a dataset, checking the equal-length and unique-name invariants
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let n_rows = columns.first().map(Column::len).unwrap_or(0);
        let mut seen = HashSet::new();
        for column in &columns {
            if column.len() != n_rows {
                return Err(DiagnosisError::ShapeError {
                    expected: format!("{} rows in column '{}'", n_rows, column.name()),
                    actual: format!("{} rows", column.len()),
                });
            }
            if !seen.insert(column.name().to_string()) {
                return Err(DiagnosisError::DataError(format!(
                    "Duplicate column name '{}'",
                    column.name()
                )));
            }
        }
        Ok(Self { columns, n_rows })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name().to_string()).collect()
    }

    pub fn numeric_columns(&self) -> Vec<&Column> {
        self.columns.iter().filter(|c| c.is_numeric()).collect()
    }

    /// Columns with exactly two distinct values
    pub fn binary_columns(&self) -> Vec<&Column> {
        self.columns.iter().filter(|c| c.n_unique() == 2).collect()
    }

    /// New dataset whose column names only contain `[A-Za-z0-9_]`.
    ///
    /// Names that collide after cleaning get a numeric suffix so the result stays valid.
    pub fn with_sanitized_names(&self) -> Dataset {
        let mut seen: HashSet<String> = HashSet::new();
        let columns = self
            .columns
            .iter()
            .map(|column| {
                let base = sanitize_column_name(column.name());
                let mut name = base.clone();
                let mut suffix = 1;
                while !seen.insert(name.clone()) {
                    name = format!("{}_{}", base, suffix);
                    suffix += 1;
                }
                column.renamed(name)
            })
            .collect();
        Dataset {
            columns,
            n_rows: self.n_rows,
        }
    }

    pub fn select_rows(&self, indices: &[usize]) -> Dataset {
        Dataset {
            columns: self.columns.iter().map(|c| c.select_rows(indices)).collect(),
            n_rows: indices.len(),
        }
    }

    pub fn without_columns(&self, names: &[&str]) -> Dataset {
        Dataset {
            columns: self
                .columns
                .iter()
                .filter(|c| !names.contains(&c.name()))
                .cloned()
                .collect(),
            n_rows: self.n_rows,
        }
    }

    /// Replace the column with the same name
    pub fn with_column(&self, column: Column) -> Result<Dataset> {
        if column.len() != self.n_rows {
            return Err(DiagnosisError::ShapeError {
                expected: format!("{} rows", self.n_rows),
                actual: format!("{} rows", column.len()),
            });
        }
        let position = self
            .columns
            .iter()
            .position(|c| c.name() == column.name())
            .ok_or_else(|| DiagnosisError::FeatureNotFound(column.name().to_string()))?;
        let mut columns = self.columns.clone();
        columns[position] = column;
        Ok(Dataset {
            columns,
            n_rows: self.n_rows,
        })
    }

    /// Drop rows whose target is missing; returns the new dataset and the dropped count
    pub fn drop_missing_target(&self, target: &str) -> Result<(Dataset, usize)> {
        let column = self
            .column(target)
            .ok_or_else(|| DiagnosisError::ConfigurationError(format!("Target column '{}' not found.", target)))?;
        let keep: Vec<usize> = (0..self.n_rows).filter(|&i| !column.is_missing(i)).collect();
        let dropped = self.n_rows - keep.len();
        if dropped == 0 {
            return Ok((self.clone(), 0));
        }
        Ok((self.select_rows(&keep), dropped))
    }

    /// Split into (features, target)
    pub fn split_target(&self, target: &str) -> Result<(Dataset, Column)> {
        let column = self
            .column(target)
            .cloned()
            .ok_or_else(|| DiagnosisError::ConfigurationError(format!("Target column '{}' not found.", target)))?;
        Ok((self.without_columns(&[target]), column))
    }

    /// Numeric columns only, as a new dataset
    pub fn numeric_subset(&self) -> Dataset {
        Dataset {
            columns: self.columns.iter().filter(|c| c.is_numeric()).cloned().collect(),
            n_rows: self.n_rows,
        }
    }
}
