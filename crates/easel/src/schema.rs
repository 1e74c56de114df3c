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

use crate::error::{DataError, DataResult};
use crate::frame::{Column, ColumnData, DataFrame, DataType};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;
/// Ordered probe list. ISO forms first, then day-first European forms,
/// then month-first US forms; ambiguous values resolve to the earlier entry.
pub const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y/%m/%d",
    "%Y/%m/%d %H:%M:%S",
    "%Y.%m.%d",
    "%d-%m-%Y",
    "%d/%m/%Y",
    "%d.%m.%Y",
    "%d-%m-%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%m-%d-%Y",
    "%m/%d/%Y",
    "%m-%d-%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%Y%m%d",
    "%Y%m%d%H%M%S",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%Y %B %d",
    "%d/%m/%y",
    "%m/%d/%y",
    "%y-%m-%d",
];
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Values sampled per column for the datetime probe.
    pub sample_size: usize,
    /// Minimum fraction of sampled values a pattern must parse.
    pub acceptance_threshold: f64,
    pub datetime_formats: Vec<String>,
}
impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            sample_size: 100,
            acceptance_threshold: 0.8,
            datetime_formats: DATETIME_FORMATS.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}
impl InferenceConfig {
    pub fn validate(&self) -> DataResult<()> {
        if self.sample_size == 0 {
            return Err(DataError::InvalidOperation(
                "sample_size must be positive".to_string(),
            ));
        }
        if self.acceptance_threshold <= 0.0 || self.acceptance_threshold > 1.0 {
            return Err(DataError::InvalidOperation(
                "acceptance_threshold must be in (0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Integer,
    Numeric,
    Datetime,
    Text,
}
impl FieldType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Integer | FieldType::Numeric)
    }
}
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldStats {
    Numeric {
        min: Option<f64>,
        max: Option<f64>,
        mean: Option<f64>,
    },
    Categorical {
        unique_count: usize,
    },
}
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub inferred_type: FieldType,
    pub null_count: usize,
    pub stats: FieldStats,
}
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchemaSummary {
    pub total_fields: usize,
    pub numeric_count: usize,
    pub datetime_count: usize,
    pub text_count: usize,
}
#[derive(Debug, Clone, Default)]
pub struct SchemaInferrer {
    config: InferenceConfig,
}
impl SchemaInferrer {
    pub fn new() -> Self {
        Self {
            config: InferenceConfig::default(),
        }
    }
    pub fn with_config(config: InferenceConfig) -> DataResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }
    /// Produces one descriptor per column, in column order. Deterministic:
    /// the same frame always yields the same descriptors.
    pub fn infer(&self, frame: &DataFrame) -> DataResult<Vec<FieldDescriptor>> {
        frame
            .column_names()
            .iter()
            .map(|name| {
                let column = frame.column(name)?;
                Ok(self.infer_column(name, column))
            })
            .collect()
    }
    pub fn summarize(descriptors: &[FieldDescriptor]) -> SchemaSummary {
        let mut summary = SchemaSummary {
            total_fields: descriptors.len(),
            numeric_count: 0,
            datetime_count: 0,
            text_count: 0,
        };
        for d in descriptors {
            match d.inferred_type {
                FieldType::Integer | FieldType::Numeric => summary.numeric_count += 1,
                FieldType::Datetime => summary.datetime_count += 1,
                FieldType::Text => summary.text_count += 1,
            }
        }
        summary
    }
    fn infer_column(&self, name: &str, column: &Column) -> FieldDescriptor {
        let null_count = column.null_count();
        let inferred_type = self.detect_field_type(column);
        let stats = if inferred_type.is_numeric() {
            numeric_stats(column)
        } else {
            FieldStats::Categorical {
                unique_count: unique_count(column),
            }
        };
        debug!(field = name, kind = ?inferred_type, "inferred field type");
        FieldDescriptor {
            name: name.to_string(),
            inferred_type,
            null_count,
            stats,
        }
    }
    fn detect_field_type(&self, column: &Column) -> FieldType {
        match column.data_type() {
            DataType::Int64 => return FieldType::Integer,
            DataType::Timestamp => return FieldType::Datetime,
            DataType::Float64 => {
                let whole = (0..column.len())
                    .filter_map(|i| column.to_f64(i))
                    .all(|v| v.fract() == 0.0);
                return if whole { FieldType::Integer } else { FieldType::Numeric };
            }
            DataType::String => {}
        }
        let values: Vec<String> = (0..column.len())
            .filter_map(|i| column.get_string(i))
            .collect();
        if values.is_empty() {
            return FieldType::Text;
        }
        if values.iter().all(|s| s.trim().parse::<f64>().is_ok()) {
            let integral = values.iter().all(|s| s.trim().parse::<i64>().is_ok());
            return if integral { FieldType::Integer } else { FieldType::Numeric };
        }
        let sample: Vec<&str> = values
            .iter()
            .take(self.config.sample_size)
            .map(String::as_str)
            .collect();
        for format in &self.config.datetime_formats {
            if self.sample_passes(&sample, |s| parse_with_format(s, format).is_some()) {
                return FieldType::Datetime;
            }
        }
        // last resort: permissive parse covering offset and RFC forms
        if self.sample_passes(&sample, |s| parse_datetime_permissive(s).is_some()) {
            return FieldType::Datetime;
        }
        FieldType::Text
    }
    fn sample_passes<F>(&self, sample: &[&str], parse: F) -> bool
    where
        F: Fn(&str) -> bool,
    {
        if sample.is_empty() {
            return false;
        }
        let hits = sample.iter().filter(|s| parse(s.trim())).count();
        hits as f64 / sample.len() as f64 >= self.config.acceptance_threshold
    }
}
fn numeric_stats(column: &Column) -> FieldStats {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    let mut count = 0usize;
    for i in 0..column.len() {
        if let Some(v) = column.to_f64(i) {
            min = min.min(v);
            max = max.max(v);
            sum += v;
            count += 1;
        }
    }
    if count == 0 {
        FieldStats::Numeric {
            min: None,
            max: None,
            mean: None,
        }
    } else {
        FieldStats::Numeric {
            min: Some(min),
            max: Some(max),
            mean: Some(sum / count as f64),
        }
    }
}
fn unique_count(column: &Column) -> usize {
    let mut seen = HashSet::new();
    for i in 0..column.len() {
        if let Some(v) = column.get_string(i) {
            seen.insert(v);
        }
    }
    seen.len()
}
fn parse_with_format(value: &str, format: &str) -> Option<NaiveDateTime> {
    if format.contains("%H") {
        NaiveDateTime::parse_from_str(value, format).ok()
    } else {
        NaiveDate::parse_from_str(value, format)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    }
}
/// Lenient parse used as the inference fallback and for filter evaluation
/// over textual columns.
pub fn parse_datetime_permissive(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Some(dt) = parse_with_format(trimmed, format) {
            return Some(dt);
        }
    }
    None
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Column, DataFrame, DataType};
    use proptest::prelude::*;
    fn string_column(values: &[&str]) -> Column {
        let opts: Vec<Option<String>> = values
            .iter()
            .map(|s| if s.is_empty() { None } else { Some((*s).to_string()) })
            .collect();
        Column::from_strings(&opts, DataType::String).expect("column")
    }
    fn frame_of(columns: Vec<(&str, Column)>) -> DataFrame {
        let mut df = DataFrame::new("test".to_string());
        for (name, column) in columns {
            df.add_column(name.to_string(), column).expect("add");
        }
        df
    }
    #[test]
    fn numeric_strings_classified_before_date_probe() {
        let df = frame_of(vec![
            ("ints", string_column(&["1", "2", "3"])),
            ("floats", string_column(&["1.5", "2.0", "3.25"])),
        ]);
        let schema = SchemaInferrer::new().infer(&df).expect("infer");
        assert_eq!(schema[0].inferred_type, FieldType::Integer);
        assert_eq!(schema[1].inferred_type, FieldType::Numeric);
    }
    #[test]
    fn declared_timestamp_short_circuits() {
        let df = frame_of(vec![(
            "ts",
            Column::from_timestamps(vec![Some(1_700_000_000_000), None]),
        )]);
        let schema = SchemaInferrer::new().infer(&df).expect("infer");
        assert_eq!(schema[0].inferred_type, FieldType::Datetime);
        assert_eq!(schema[0].null_count, 1);
    }
    #[test]
    fn iso_dates_detected_via_pattern_probe() {
        let df = frame_of(vec![(
            "day",
            string_column(&["2024-01-15", "2024-02-20", "2024-03-25"]),
        )]);
        let schema = SchemaInferrer::new().infer(&df).expect("infer");
        assert_eq!(schema[0].inferred_type, FieldType::Datetime);
        assert_eq!(schema[0].stats, FieldStats::Categorical { unique_count: 3 });
    }
    #[test]
    fn nine_of_ten_parse_rate_meets_threshold() {
        let mut values: Vec<&str> = vec!["2024-01-15"; 9];
        values.push("not a date");
        let df = frame_of(vec![("day", string_column(&values))]);
        let schema = SchemaInferrer::new().infer(&df).expect("infer");
        assert_eq!(schema[0].inferred_type, FieldType::Datetime);
    }
    #[test]
    fn seven_of_ten_parse_rate_falls_to_text() {
        let mut values: Vec<&str> = vec!["2024-01-15"; 7];
        values.extend(["x", "y", "z"]);
        let df = frame_of(vec![("day", string_column(&values))]);
        let schema = SchemaInferrer::new().infer(&df).expect("infer");
        assert_eq!(schema[0].inferred_type, FieldType::Text);
    }
    #[test]
    fn all_null_column_is_text_with_zero_uniques() {
        let df = frame_of(vec![("empty", string_column(&["", "", ""]))]);
        let schema = SchemaInferrer::new().infer(&df).expect("infer");
        assert_eq!(schema[0].inferred_type, FieldType::Text);
        assert_eq!(schema[0].stats, FieldStats::Categorical { unique_count: 0 });
        assert_eq!(schema[0].null_count, 3);
    }
    #[test]
    fn permissive_fallback_catches_offset_timestamps() {
        let df = frame_of(vec![(
            "at",
            string_column(&["2024-01-15T10:30:00+02:00", "2024-02-20T08:00:00+02:00"]),
        )]);
        let schema = SchemaInferrer::new().infer(&df).expect("infer");
        assert_eq!(schema[0].inferred_type, FieldType::Datetime);
    }
    #[test]
    fn numeric_stats_ignore_nulls() {
        let df = frame_of(vec![(
            "v",
            Column::from_f64(vec![Some(10.0), None, Some(30.0)]),
        )]);
        let schema = SchemaInferrer::new().infer(&df).expect("infer");
        assert_eq!(
            schema[0].stats,
            FieldStats::Numeric {
                min: Some(10.0),
                max: Some(30.0),
                mean: Some(20.0),
            }
        );
    }
    #[test]
    fn summary_counts_types() {
        let df = frame_of(vec![
            ("a", string_column(&["1", "2"])),
            ("b", string_column(&["2024-01-01", "2024-01-02"])),
            ("c", string_column(&["x", "y"])),
        ]);
        let schema = SchemaInferrer::new().infer(&df).expect("infer");
        let summary = SchemaInferrer::summarize(&schema);
        assert_eq!(summary.total_fields, 3);
        assert_eq!(summary.numeric_count, 1);
        assert_eq!(summary.datetime_count, 1);
        assert_eq!(summary.text_count, 1);
    }
    #[test]
    fn config_validation_rejects_bad_threshold() {
        let config = InferenceConfig {
            acceptance_threshold: 1.5,
            ..InferenceConfig::default()
        };
        assert!(SchemaInferrer::with_config(config).is_err());
    }
    proptest! {
        #[test]
        fn inference_is_idempotent(values in prop::collection::vec("[a-z0-9 .:/-]{0,16}", 1..40)) {
            let refs: Vec<&str> = values.iter().map(String::as_str).collect();
            let df = frame_of(vec![("col", string_column(&refs))]);
            let inferrer = SchemaInferrer::new();
            let first = inferrer.infer(&df).expect("infer");
            let second = inferrer.infer(&df).expect("infer");
            prop_assert_eq!(first, second);
        }
    }
}
