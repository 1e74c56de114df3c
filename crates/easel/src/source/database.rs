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

use crate::error::{Result, SourceError};
use crate::frame::{Column, DataFrame};
use crate::source::{SourceAdapter, SourceConfig, SourceKind};
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use std::path::Path;
use tracing::info;
/// SQLite-backed sources: either a free-form query or `SELECT *` over a
/// configured table.
pub struct DatabaseAdapter {
    config: SourceConfig,
}
#[derive(Debug, Clone)]
enum CellBuffer {
    Untyped,
    Int(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}
impl DatabaseAdapter {
    pub fn new(config: SourceConfig) -> Self {
        Self { config }
    }
    fn db_error(&self, source: rusqlite::Error) -> SourceError {
        SourceError::Database {
            source_id: self.config.id.clone(),
            source,
        }
    }
    fn connection_params(&self) -> Result<(&Path, String)> {
        match &self.config.kind {
            SourceKind::Database { path, sql, table } => {
                let query = match (sql, table) {
                    (Some(sql), _) => sql.clone(),
                    (None, Some(table)) => format!("SELECT * FROM \"{table}\""),
                    (None, None) => {
                        return Err(SourceError::NotConfigured {
                            source_id: self.config.id.clone(),
                        }
                        .into())
                    }
                };
                Ok((path.as_path(), query))
            }
            _ => Err(SourceError::NotConfigured {
                source_id: self.config.id.clone(),
            }
            .into()),
        }
    }
}
impl SourceAdapter for DatabaseAdapter {
    fn fetch(&self) -> Result<DataFrame> {
        let (path, query) = self.connection_params()?;
        let connection = Connection::open(path).map_err(|e| self.db_error(e))?;
        let mut statement = connection.prepare(&query).map_err(|e| self.db_error(e))?;
        let names: Vec<String> = statement
            .column_names()
            .iter()
            .map(|s| (*s).to_string())
            .collect();
        let column_count = names.len();
        let mut buffers: Vec<CellBuffer> = vec![CellBuffer::Untyped; column_count];
        let mut row_count = 0usize;
        let mut rows = statement.query([]).map_err(|e| self.db_error(e))?;
        while let Some(row) = rows.next().map_err(|e| self.db_error(e))? {
            for (i, buffer) in buffers.iter_mut().enumerate() {
                let value = row.get_ref(i).map_err(|e| self.db_error(e))?;
                push_cell(buffer, value, row_count);
            }
            row_count += 1;
        }
        let mut frame = DataFrame::new(self.config.name.clone());
        for (name, buffer) in names.into_iter().zip(buffers) {
            frame.add_column(name, finish_buffer(buffer, row_count))?;
        }
        frame.metadata.source_path = Some(path.to_path_buf());
        info!(
            source = self.config.id.as_str(),
            rows = frame.row_count(),
            "loaded database source"
        );
        Ok(frame)
    }
    fn connect_test(&self) -> bool {
        match self.connection_params() {
            Ok((path, _)) => path.exists() && Connection::open(path).is_ok(),
            Err(_) => false,
        }
    }
}
/// Column type is pinned by the first non-null value; later values that do
/// not fit widen the whole buffer (integer to float, anything to text).
fn push_cell(buffer: &mut CellBuffer, value: ValueRef<'_>, row: usize) {
    let current = std::mem::replace(buffer, CellBuffer::Untyped);
    *buffer = push_owned(current, value, row);
}
fn push_owned(buffer: CellBuffer, value: ValueRef<'_>, row: usize) -> CellBuffer {
    match buffer {
        CellBuffer::Untyped => match value {
            ValueRef::Null => CellBuffer::Untyped,
            ValueRef::Integer(_) => push_owned(CellBuffer::Int(vec![None; row]), value, row),
            ValueRef::Real(_) => push_owned(CellBuffer::Float(vec![None; row]), value, row),
            _ => push_owned(CellBuffer::Text(vec![None; row]), value, row),
        },
        CellBuffer::Int(mut values) => match value {
            ValueRef::Null => {
                values.push(None);
                CellBuffer::Int(values)
            }
            ValueRef::Integer(v) => {
                values.push(Some(v));
                CellBuffer::Int(values)
            }
            ValueRef::Real(_) => {
                let widened: Vec<Option<f64>> =
                    values.iter().map(|v| v.map(|i| i as f64)).collect();
                push_owned(CellBuffer::Float(widened), value, row)
            }
            _ => {
                let widened: Vec<Option<String>> =
                    values.iter().map(|v| v.map(|i| i.to_string())).collect();
                push_owned(CellBuffer::Text(widened), value, row)
            }
        },
        CellBuffer::Float(mut values) => match value {
            ValueRef::Null => {
                values.push(None);
                CellBuffer::Float(values)
            }
            ValueRef::Integer(v) => {
                values.push(Some(v as f64));
                CellBuffer::Float(values)
            }
            ValueRef::Real(v) => {
                values.push(Some(v));
                CellBuffer::Float(values)
            }
            _ => {
                let widened: Vec<Option<String>> =
                    values.iter().map(|v| v.map(|f| f.to_string())).collect();
                push_owned(CellBuffer::Text(widened), value, row)
            }
        },
        CellBuffer::Text(mut values) => {
            let cell = match value {
                ValueRef::Null => None,
                ValueRef::Integer(v) => Some(v.to_string()),
                ValueRef::Real(v) => Some(v.to_string()),
                ValueRef::Text(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
                ValueRef::Blob(bytes) => Some(format!("<blob {} bytes>", bytes.len())),
            };
            values.push(cell);
            CellBuffer::Text(values)
        }
    }
}
fn finish_buffer(buffer: CellBuffer, row_count: usize) -> Column {
    match buffer {
        CellBuffer::Untyped => Column::from_strings(
            &vec![None::<String>; row_count],
            crate::frame::DataType::String,
        )
        .unwrap_or_else(|_| Column::from_i64(Vec::new())),
        CellBuffer::Int(values) => Column::from_i64(values),
        CellBuffer::Float(values) => Column::from_f64(values),
        CellBuffer::Text(values) => {
            Column::from_strings(&values, crate::frame::DataType::String)
                .unwrap_or_else(|_| Column::from_i64(Vec::new()))
        }
    }
}
