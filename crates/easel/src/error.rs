// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use thiserror::Error;
#[derive(Error, Debug)]
pub enum EaselError {
    #[error("Data error: {0}")]
    Data(#[from] DataError),
    #[error("Chart error: {0}")]
    Chart(#[from] ChartError),
    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),
    #[error("Data source error: {0}")]
    Source(#[from] SourceError),
    #[error("Export error: {0}")]
    Export(#[from] ExportError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialisation error: {0}")]
    Serialisation(#[from] SerialisationError),
}
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Column '{column}' not found in dataset")]
    ColumnNotFound { column: String },
    #[error("Column length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },
    #[error("Row index {0} out of bounds")]
    OutOfBounds(usize),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    #[error("Empty dataset provided")]
    EmptyDataset,
}
#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Field '{field}' not found in dataset")]
    FieldNotFound { field: String },
    #[error("{chart} chart requires the '{axis}' field to be set")]
    MissingAxis { chart: &'static str, axis: &'static str },
    #[error("Table chart requires at least one column (or row, for vertical orientation)")]
    EmptyColumnList,
    #[error("Invalid {chart} chart specification: {reason}")]
    InvalidSpec { chart: &'static str, reason: String },
}
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid range for field '{field}': min {min} exceeds max {max}")]
    InvalidRange { field: String, min: f64, max: f64 },
    #[error("Invalid predicate on field '{field}': {reason}")]
    InvalidPredicate { field: String, reason: String },
}
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Data file '{path}' not found")]
    FileNotFound { path: String },
    #[error("Unsupported data format: {format}")]
    UnsupportedFormat { format: String },
    #[error("Database query failed for source '{source_id}': {source}")]
    Database {
        source_id: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("API request to '{url}' failed: {source}")]
    Api {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to decode response from source '{source_id}': {reason}")]
    Decode { source_id: String, reason: String },
    #[error("Data source '{source_id}' not configured")]
    NotConfigured { source_id: String },
}
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("{format} export failed: no renderer available (tried: {})", .tried.join(", "))]
    AllRenderersFailed { format: String, tried: Vec<String> },
    #[error("Failed to write export file '{path}': {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
#[derive(Error, Debug)]
pub enum SerialisationError {
    #[error("JSON serialisation failed: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
    #[error("YAML serialisation failed: {source}")]
    Yaml {
        #[from]
        source: serde_yaml::Error,
    },
}
pub type Result<T> = std::result::Result<T, EaselError>;
pub type DataResult<T> = std::result::Result<T, DataError>;
pub type ChartResult<T> = std::result::Result<T, ChartError>;
impl From<serde_json::Error> for EaselError {
    fn from(err: serde_json::Error) -> Self {
        EaselError::Serialisation(SerialisationError::Json { source: err })
    }
}
impl From<serde_yaml::Error> for EaselError {
    fn from(err: serde_yaml::Error) -> Self {
        EaselError::Serialisation(SerialisationError::Yaml { source: err })
    }
}
impl EaselError {
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EaselError::Chart(_) | EaselError::Filter(_) | EaselError::Data(DataError::ColumnNotFound { .. })
        )
    }
    pub fn category(&self) -> &'static str {
        match self {
            EaselError::Data(_) => "Data",
            EaselError::Chart(_) => "Chart",
            EaselError::Filter(_) => "Filter",
            EaselError::Source(_) => "Source",
            EaselError::Export(_) => "Export",
            EaselError::Io(_) => "I/O",
            EaselError::Serialisation(_) => "Serialisation",
        }
    }
    pub fn user_message(&self) -> String {
        match self {
            EaselError::Chart(ChartError::FieldNotFound { field }) => {
                format!("The field '{field}' does not exist in the selected data source. Check the chart's field assignments.")
            }
            EaselError::Chart(ChartError::MissingAxis { chart, axis }) => {
                format!("The {chart} chart is missing its {axis} field. Assign a field before rendering.")
            }
            EaselError::Export(ExportError::AllRenderersFailed { format, tried }) => {
                format!(
                    "Could not produce {format} output. Install one of the optional renderers: {}.",
                    tried.join(", ")
                )
            }
            _ => self.to_string(),
        }
    }
}
