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
use crate::frame::common::DataType;
use chrono::DateTime;
use rayon::prelude::*;
use std::sync::Arc;
const MAX_STRING_LENGTH: usize = 1024 * 1024;
pub trait ColumnData: Send + Sync + std::fmt::Debug {
    fn len(&self) -> usize;
    fn data_type(&self) -> DataType;
    fn null_count(&self) -> usize;
    fn get_string(&self, index: usize) -> Option<String>;
    fn to_f64(&self, index: usize) -> Option<f64>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
/// Columnar storage. Timestamp values are epoch milliseconds (UTC).
#[derive(Debug, Clone)]
pub enum Column {
    Int64(Arc<[Option<i64>]>),
    Float64(Arc<[Option<f64>]>),
    String(Arc<[Option<Arc<str>>]>),
    Timestamp(Arc<[Option<i64>]>),
}
impl ColumnData for Column {
    fn len(&self) -> usize {
        match self {
            Column::Int64(data) => data.len(),
            Column::Float64(data) => data.len(),
            Column::String(data) => data.len(),
            Column::Timestamp(data) => data.len(),
        }
    }
    fn data_type(&self) -> DataType {
        match self {
            Column::Int64(_) => DataType::Int64,
            Column::Float64(_) => DataType::Float64,
            Column::String(_) => DataType::String,
            Column::Timestamp(_) => DataType::Timestamp,
        }
    }
    fn null_count(&self) -> usize {
        match self {
            Column::Int64(data) => data.par_iter().filter(|v| v.is_none()).count(),
            Column::Float64(data) => data.par_iter().filter(|v| v.is_none()).count(),
            Column::String(data) => data.par_iter().filter(|v| v.is_none()).count(),
            Column::Timestamp(data) => data.par_iter().filter(|v| v.is_none()).count(),
        }
    }
    fn get_string(&self, index: usize) -> Option<String> {
        match self {
            Column::Int64(data) => data.get(index)?.as_ref().map(|v| v.to_string()),
            Column::Float64(data) => data.get(index)?.as_ref().map(|v| v.to_string()),
            Column::String(data) => data.get(index)?.as_ref().map(|s| s.to_string()),
            Column::Timestamp(data) => data.get(index)?.as_ref().map(|ms| format_timestamp(*ms)),
        }
    }
    fn to_f64(&self, index: usize) -> Option<f64> {
        match self {
            Column::Int64(data) => data.get(index).and_then(|opt| opt.map(|v| v as f64)),
            Column::Float64(data) => data.get(index).copied()?,
            Column::String(data) => data
                .get(index)
                .and_then(|opt| opt.as_ref().and_then(|s| s.parse::<f64>().ok())),
            Column::Timestamp(data) => data.get(index).and_then(|opt| opt.map(|v| v as f64)),
        }
    }
}
fn format_timestamp(ms: i64) -> String {
    match DateTime::from_timestamp_millis(ms) {
        Some(dt) => {
            let naive = dt.naive_utc();
            if ms % 86_400_000 == 0 {
                naive.format("%Y-%m-%d").to_string()
            } else {
                naive.format("%Y-%m-%d %H:%M:%S").to_string()
            }
        }
        None => ms.to_string(),
    }
}
impl Column {
    pub fn timestamp_millis(&self, index: usize) -> Option<i64> {
        match self {
            Column::Timestamp(data) => data.get(index).copied()?,
            _ => None,
        }
    }
    pub fn from_strings(values: &[Option<String>], data_type: DataType) -> DataResult<Self> {
        Ok(match data_type {
            DataType::Int64 => {
                let parsed: DataResult<Vec<Option<i64>>> = values
                    .par_iter()
                    .map(|opt_str| match opt_str {
                        None => Ok(None),
                        Some(s) if s.trim().is_empty() => Ok(None),
                        Some(s) => s
                            .trim()
                            .parse::<i64>()
                            .map(Some)
                            .map_err(|e| DataError::Parse(e.to_string())),
                    })
                    .collect();
                Column::Int64(parsed?.into())
            }
            DataType::Float64 => {
                let parsed: DataResult<Vec<Option<f64>>> = values
                    .par_iter()
                    .map(|opt_str| match opt_str {
                        None => Ok(None),
                        Some(s) if s.trim().is_empty() => Ok(None),
                        Some(s) => s
                            .trim()
                            .parse::<f64>()
                            .map(Some)
                            .map_err(|e| DataError::Parse(e.to_string())),
                    })
                    .collect();
                Column::Float64(parsed?.into())
            }
            DataType::Timestamp => {
                return Err(DataError::InvalidOperation(
                    "timestamp columns are built from epoch values, not strings".to_string(),
                ))
            }
            DataType::String => {
                let strings: Vec<Option<Arc<str>>> = values
                    .iter()
                    .map(|opt| {
                        opt.as_ref().map(|s| {
                            if s.len() > MAX_STRING_LENGTH {
                                let mut end = MAX_STRING_LENGTH;
                                while !s.is_char_boundary(end) {
                                    end -= 1;
                                }
                                Arc::from(&s[..end])
                            } else {
                                Arc::from(s.as_str())
                            }
                        })
                    })
                    .collect();
                Column::String(strings.into())
            }
        })
    }
    pub fn from_timestamps(values: Vec<Option<i64>>) -> Self {
        Column::Timestamp(values.into())
    }
    pub fn from_i64(values: Vec<Option<i64>>) -> Self {
        Column::Int64(values.into())
    }
    pub fn from_f64(values: Vec<Option<f64>>) -> Self {
        Column::Float64(values.into())
    }
    pub fn select_rows(&self, indices: &[usize]) -> DataResult<Column> {
        match self {
            Column::Int64(data) => {
                let new_data: DataResult<Vec<Option<i64>>> = indices
                    .par_iter()
                    .map(|&i| {
                        if i >= data.len() {
                            Err(DataError::OutOfBounds(i))
                        } else {
                            Ok(data.get(i).copied().unwrap_or(None))
                        }
                    })
                    .collect();
                Ok(Column::Int64(new_data?.into()))
            }
            Column::Float64(data) => {
                let new_data: DataResult<Vec<Option<f64>>> = indices
                    .par_iter()
                    .map(|&i| {
                        if i >= data.len() {
                            Err(DataError::OutOfBounds(i))
                        } else {
                            Ok(data.get(i).copied().unwrap_or(None))
                        }
                    })
                    .collect();
                Ok(Column::Float64(new_data?.into()))
            }
            Column::String(data) => {
                let new_data: DataResult<Vec<Option<Arc<str>>>> = indices
                    .par_iter()
                    .map(|&i| {
                        if i >= data.len() {
                            Err(DataError::OutOfBounds(i))
                        } else {
                            Ok(data.get(i).cloned().unwrap_or(None))
                        }
                    })
                    .collect();
                Ok(Column::String(new_data?.into()))
            }
            Column::Timestamp(data) => {
                let new_data: DataResult<Vec<Option<i64>>> = indices
                    .par_iter()
                    .map(|&i| {
                        if i >= data.len() {
                            Err(DataError::OutOfBounds(i))
                        } else {
                            Ok(data.get(i).copied().unwrap_or(None))
                        }
                    })
                    .collect();
                Ok(Column::Timestamp(new_data?.into()))
            }
        }
    }
}
#[derive(Debug)]
pub struct ColumnBuilder {
    values: Vec<Option<String>>,
    inferred_type: Option<DataType>,
}
impl ColumnBuilder {
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            inferred_type: None,
        }
    }
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
            inferred_type: None,
        }
    }
    pub fn push(&mut self, value: Option<String>) {
        if self.inferred_type.is_none() {
            if let Some(ref s) = value {
                if !s.trim().is_empty() {
                    self.inferred_type = Some(Self::infer_type(s));
                }
            }
        }
        self.values.push(value);
    }
    /// Mixed columns degrade to String rather than failing the load.
    pub fn build(self) -> DataResult<Column> {
        let data_type = self.inferred_type.unwrap_or(DataType::String);
        match Column::from_strings(&self.values, data_type) {
            Ok(column) => Ok(column),
            Err(DataError::Parse(_)) => Column::from_strings(&self.values, DataType::String),
            Err(e) => Err(e),
        }
    }
    fn infer_type(sample: &str) -> DataType {
        let trimmed = sample.trim();
        if trimmed.parse::<i64>().is_ok() {
            DataType::Int64
        } else if trimmed.parse::<f64>().is_ok() {
            DataType::Float64
        } else {
            DataType::String
        }
    }
}
impl Default for ColumnBuilder {
    fn default() -> Self {
        Self::new()
    }
}
