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
use crate::frame::column::{Column, ColumnData};
use crate::frame::common::{ColumnMetadata, DatasetMetadata};
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
#[derive(Debug, Clone)]
pub struct DataFrame {
    columns: HashMap<String, Arc<Column>>,
    column_order: Vec<String>,
    pub metadata: DatasetMetadata,
}
impl DataFrame {
    pub fn new(name: String) -> Self {
        Self {
            columns: HashMap::new(),
            column_order: Vec::new(),
            metadata: DatasetMetadata::new(name, 0, 0),
        }
    }
    pub fn add_column(&mut self, name: String, column: Column) -> DataResult<()> {
        if !self.columns.is_empty() && column.len() != self.row_count() {
            return Err(DataError::LengthMismatch {
                expected: self.row_count(),
                got: column.len(),
            });
        }
        if !self.columns.contains_key(&name) {
            self.column_order.push(name.clone());
        }
        self.metadata.row_count = column.len();
        self.columns.insert(name, Arc::new(column));
        self.metadata.column_count = self.column_order.len();
        Ok(())
    }
    pub fn row_count(&self) -> usize {
        self.metadata.row_count
    }
    pub fn column_count(&self) -> usize {
        self.column_order.len()
    }
    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }
    pub fn column_names(&self) -> &[String] {
        &self.column_order
    }
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }
    pub fn get_column(&self, name: &str) -> Option<&Arc<Column>> {
        self.columns.get(name)
    }
    pub fn column(&self, name: &str) -> DataResult<&Arc<Column>> {
        self.columns.get(name).ok_or_else(|| DataError::ColumnNotFound {
            column: name.to_string(),
        })
    }
    pub fn column_metadata(&self) -> Vec<ColumnMetadata> {
        self.column_order
            .iter()
            .filter_map(|name| {
                self.columns.get(name).map(|col| ColumnMetadata {
                    name: name.clone(),
                    data_type: col.data_type(),
                    null_count: col.null_count(),
                })
            })
            .collect()
    }
    /// New frame restricted to the named columns, in the given order.
    pub fn select(&self, names: &[String]) -> DataResult<DataFrame> {
        let mut result = DataFrame::new(self.metadata.name.clone());
        for name in names {
            let column = self.column(name)?;
            result.add_column(name.clone(), column.as_ref().clone())?;
        }
        result.metadata.source_path = self.metadata.source_path.clone();
        Ok(result)
    }
    /// New frame containing only the given row indices, all columns.
    pub fn select_rows(&self, indices: &[usize]) -> DataResult<DataFrame> {
        let mut result = DataFrame::new(self.metadata.name.clone());
        for name in &self.column_order {
            let column = self.column(name)?;
            result.add_column(name.clone(), column.select_rows(indices)?)?;
        }
        result.metadata.row_count = indices.len();
        result.metadata.source_path = self.metadata.source_path.clone();
        Ok(result)
    }
    /// Row-index filter; the predicate sees a row index into this frame.
    pub fn filter<F>(&self, predicate: F) -> DataResult<DataFrame>
    where
        F: Fn(usize) -> bool + Send + Sync,
    {
        let indices: Vec<usize> = (0..self.row_count())
            .into_par_iter()
            .filter(|&i| predicate(i))
            .collect();
        self.select_rows(&indices)
    }
    pub fn head(&self, limit: usize) -> DataResult<DataFrame> {
        let indices: Vec<usize> = (0..self.row_count().min(limit)).collect();
        self.select_rows(&indices)
    }
    pub fn print_sample(&self, limit: usize) {
        let shown = self.row_count().min(limit);
        println!("{}", self.column_order.join(" | "));
        for i in 0..shown {
            let row: Vec<String> = self
                .column_order
                .iter()
                .map(|name| {
                    self.columns
                        .get(name)
                        .and_then(|col| col.get_string(i))
                        .unwrap_or_else(|| "null".to_string())
                })
                .collect();
            println!("{}", row.join(" | "));
        }
        if self.row_count() > shown {
            println!("... {} more rows", self.row_count() - shown);
        }
    }
}
