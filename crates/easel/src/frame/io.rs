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
use crate::frame::column::ColumnBuilder;
use crate::frame::dataframe::DataFrame;
use std::path::Path;
#[derive(Debug, Clone)]
pub struct CsvReader {
    has_headers: bool,
    delimiter: u8,
}
impl CsvReader {
    pub fn new() -> Self {
        Self {
            has_headers: true,
            delimiter: b',',
        }
    }
    pub fn with_headers(mut self, has_headers: bool) -> Self {
        self.has_headers = has_headers;
        self
    }
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
    pub fn read_file(&self, path: &Path, name: String) -> DataResult<DataFrame> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(self.has_headers)
            .delimiter(self.delimiter)
            .flexible(true)
            .from_path(path)
            .map_err(|e| DataError::Parse(e.to_string()))?;
        let mut frame = self.read_inner(reader, name)?;
        frame.metadata.source_path = Some(path.to_path_buf());
        Ok(frame)
    }
    pub fn read_str(&self, content: &str, name: String) -> DataResult<DataFrame> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(self.has_headers)
            .delimiter(self.delimiter)
            .flexible(true)
            .from_reader(content.as_bytes());
        self.read_inner(reader, name)
    }
    fn read_inner<R: std::io::Read>(
        &self,
        mut reader: csv::Reader<R>,
        name: String,
    ) -> DataResult<DataFrame> {
        let headers: Vec<String> = if self.has_headers {
            reader
                .headers()
                .map_err(|e| DataError::Parse(e.to_string()))?
                .iter()
                .map(|h| h.trim().to_string())
                .collect()
        } else {
            Vec::new()
        };
        let mut builders: Vec<ColumnBuilder> =
            headers.iter().map(|_| ColumnBuilder::new()).collect();
        let mut headers = headers;
        for record in reader.records() {
            let record = record.map_err(|e| DataError::Parse(e.to_string()))?;
            if headers.is_empty() {
                headers = (0..record.len()).map(|i| format!("column_{i}")).collect();
                builders = headers.iter().map(|_| ColumnBuilder::new()).collect();
            }
            for (i, builder) in builders.iter_mut().enumerate() {
                let cell = record.get(i).map(str::trim);
                match cell {
                    Some("") | None => builder.push(None),
                    Some(value) => builder.push(Some(value.to_string())),
                }
            }
        }
        let mut frame = DataFrame::new(name);
        for (header, builder) in headers.into_iter().zip(builders) {
            frame.add_column(header, builder.build()?)?;
        }
        Ok(frame)
    }
}
impl Default for CsvReader {
    fn default() -> Self {
        Self::new()
    }
}
/// Builds a frame from a JSON array of flat objects. Column order follows
/// first appearance; objects missing a key contribute a null.
pub fn frame_from_records(records: &[serde_json::Value], name: String) -> DataResult<DataFrame> {
    let mut keys: Vec<String> = Vec::new();
    for record in records {
        let obj = record.as_object().ok_or_else(|| {
            DataError::Parse("expected an array of JSON objects".to_string())
        })?;
        for key in obj.keys() {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
    }
    let mut frame = DataFrame::new(name);
    for key in &keys {
        let mut builder = ColumnBuilder::with_capacity(records.len());
        for record in records {
            let cell = record.get(key).and_then(json_to_cell);
            builder.push(cell);
        }
        frame.add_column(key.clone(), builder.build()?)?;
    }
    Ok(frame)
}
fn json_to_cell(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}
