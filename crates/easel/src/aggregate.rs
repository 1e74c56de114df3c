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

use crate::chart_spec::{AggFunction, ChartSpec};
use crate::error::{DataResult, Result};
use crate::frame::{Column, ColumnData, DataFrame};
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;
const PARALLEL_THRESHOLD: usize = 10_000;
#[derive(Debug, Clone)]
pub struct Aggregator {
    parallel_threshold: usize,
}
impl Aggregator {
    pub fn new() -> Self {
        Self {
            parallel_threshold: PARALLEL_THRESHOLD,
        }
    }
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }
    /// Groups by the chart's key fields and reduces each y field. Charts
    /// with no aggregation function, no key, or no y fields pass the frame
    /// through untouched.
    pub fn aggregate(&self, frame: &DataFrame, spec: &ChartSpec) -> Result<DataFrame> {
        let key_fields = spec.group_fields();
        let y_fields = spec.y_fields();
        if spec.aggregation().is_empty() || key_fields.is_empty() || y_fields.is_empty() {
            return Ok(frame.clone());
        }
        let key_columns: Vec<Arc<Column>> = key_fields
            .iter()
            .map(|name| frame.column(name).cloned())
            .collect::<DataResult<_>>()?;
        let y_columns: Vec<Arc<Column>> = y_fields
            .iter()
            .map(|name| frame.column(name).cloned())
            .collect::<DataResult<_>>()?;
        let groups = if frame.row_count() > self.parallel_threshold {
            build_groups_parallel(&key_columns, frame.row_count())
        } else {
            build_groups_sequential(&key_columns, frame.row_count())
        };
        // sorted keys keep repeated runs byte-identical
        let mut sorted: Vec<(Vec<String>, Vec<usize>)> = groups.into_iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        let first_rows: Vec<usize> = sorted
            .iter()
            .filter_map(|(_, indices)| indices.first().copied())
            .collect();
        let mut result = DataFrame::new(frame.metadata.name.clone());
        for (name, column) in key_fields.iter().zip(&key_columns) {
            result.add_column(name.clone(), column.select_rows(&first_rows)?)?;
        }
        for (name, column) in y_fields.iter().zip(&y_columns) {
            let mut function = spec
                .aggregation()
                .resolve(name)
                .unwrap_or(AggFunction::Sum);
            if !column.data_type().is_numeric() && function != AggFunction::Count {
                warn!(
                    field = name.as_str(),
                    requested = ?function,
                    "non-numeric aggregation target downgraded to count"
                );
                function = AggFunction::Count;
            }
            let reduced = reduce_column(column, &sorted, function);
            result.add_column(name.clone(), reduced)?;
        }
        Ok(result)
    }
}
impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}
/// Rows with a null in any key field are dropped from every group.
fn group_key(key_columns: &[Arc<Column>], row: usize) -> Option<Vec<String>> {
    key_columns.iter().map(|col| col.get_string(row)).collect()
}
fn build_groups_sequential(
    key_columns: &[Arc<Column>],
    row_count: usize,
) -> HashMap<Vec<String>, Vec<usize>> {
    let mut groups: HashMap<Vec<String>, Vec<usize>> = HashMap::new();
    for row in 0..row_count {
        if let Some(key) = group_key(key_columns, row) {
            groups.entry(key).or_default().push(row);
        }
    }
    groups
}
fn build_groups_parallel(
    key_columns: &[Arc<Column>],
    row_count: usize,
) -> HashMap<Vec<String>, Vec<usize>> {
    (0..row_count)
        .into_par_iter()
        .fold(
            HashMap::<Vec<String>, Vec<usize>>::new,
            |mut acc, row| {
                if let Some(key) = group_key(key_columns, row) {
                    acc.entry(key).or_default().push(row);
                }
                acc
            },
        )
        .reduce(HashMap::new, |mut left, right| {
            for (key, mut rows) in right {
                left.entry(key).or_default().append(&mut rows);
            }
            left
        })
        .into_iter()
        // parallel fold order is nondeterministic; restore row order per group
        .map(|(key, mut rows)| {
            rows.sort_unstable();
            (key, rows)
        })
        .collect()
}
fn reduce_column(
    column: &Column,
    groups: &[(Vec<String>, Vec<usize>)],
    function: AggFunction,
) -> Column {
    match function {
        AggFunction::Count => {
            let counts: Vec<Option<i64>> = groups
                .iter()
                .map(|(_, indices)| {
                    let n = indices
                        .iter()
                        .filter(|&&i| column.get_string(i).is_some())
                        .count();
                    Some(n as i64)
                })
                .collect();
            Column::from_i64(counts)
        }
        _ => {
            let values: Vec<Option<f64>> = groups
                .iter()
                .map(|(_, indices)| {
                    let numbers: Vec<f64> =
                        indices.iter().filter_map(|&i| column.to_f64(i)).collect();
                    if numbers.is_empty() {
                        return None;
                    }
                    Some(match function {
                        AggFunction::Sum => numbers.iter().sum(),
                        AggFunction::Mean => {
                            numbers.iter().sum::<f64>() / numbers.len() as f64
                        }
                        AggFunction::Min => numbers.iter().copied().fold(f64::INFINITY, f64::min),
                        AggFunction::Max => {
                            numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max)
                        }
                        AggFunction::Count => unreachable!(),
                    })
                })
                .collect();
            Column::from_f64(values)
        }
    }
}
