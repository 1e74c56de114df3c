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

use crate::error::{FilterError, Result};
use crate::frame::{Column, ColumnData, DataFrame, DataType};
use crate::schema::parse_datetime_permissive;
use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum DateWindow {
    Today,
    Yesterday,
    #[serde(rename = "last_7_days")]
    Last7Days,
    #[serde(rename = "last_30_days")]
    Last30Days,
    ThisMonth,
    LastMonth,
    Custom {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
}
impl DateWindow {
    /// Inclusive bounds, resolved against the given reference date.
    pub fn resolve(&self, today: NaiveDate) -> (Option<NaiveDateTime>, Option<NaiveDateTime>) {
        let (start, end) = match self {
            DateWindow::Today => (Some(today), Some(today)),
            DateWindow::Yesterday => {
                let y = today.checked_sub_days(Days::new(1));
                (y, y)
            }
            DateWindow::Last7Days => (today.checked_sub_days(Days::new(6)), Some(today)),
            DateWindow::Last30Days => (today.checked_sub_days(Days::new(29)), Some(today)),
            DateWindow::ThisMonth => {
                let first = today.with_day(1);
                (first, Some(today))
            }
            DateWindow::LastMonth => {
                let first_this = today.with_day(1);
                let first_last = first_this.and_then(|d| d.checked_sub_months(Months::new(1)));
                let last_last = first_this.and_then(|d| d.checked_sub_days(Days::new(1)));
                (first_last, last_last)
            }
            DateWindow::Custom { start, end } => (*start, *end),
        };
        (
            start.and_then(|d| d.and_hms_opt(0, 0, 0)),
            end.and_then(|d| d.and_hms_opt(23, 59, 59)),
        )
    }
}
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterPredicate {
    Range {
        field: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    Set {
        field: String,
        values: Vec<String>,
    },
    DateWindow {
        field: String,
        window: DateWindow,
    },
    Equality {
        field: String,
        value: String,
    },
}
impl FilterPredicate {
    pub fn field(&self) -> &str {
        match self {
            FilterPredicate::Range { field, .. } => field,
            FilterPredicate::Set { field, .. } => field,
            FilterPredicate::DateWindow { field, .. } => field,
            FilterPredicate::Equality { field, .. } => field,
        }
    }
    pub fn validate(&self) -> Result<()> {
        if let FilterPredicate::Range {
            field,
            min: Some(min),
            max: Some(max),
        } = self
        {
            if min > max {
                return Err(FilterError::InvalidRange {
                    field: field.clone(),
                    min: *min,
                    max: *max,
                }
                .into());
            }
        }
        Ok(())
    }
}
/// One chart's click selection, propagated to every other chart on the
/// dashboard. The source chart itself stays unfiltered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrossFilter {
    pub source_chart_id: String,
    pub field: String,
    pub value: String,
}
impl CrossFilter {
    /// Click semantics: clicking the active selection clears it, any other
    /// click replaces it.
    pub fn toggle(current: Option<CrossFilter>, clicked: CrossFilter) -> Option<CrossFilter> {
        match current {
            Some(active) if active == clicked => None,
            _ => Some(clicked),
        }
    }
}
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FilterState {
    #[serde(default)]
    pub predicates: Vec<FilterPredicate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cross_filter: Option<CrossFilter>,
}
impl FilterState {
    pub fn new(predicates: Vec<FilterPredicate>) -> Self {
        Self {
            predicates,
            cross_filter: None,
        }
    }
    pub fn with_cross_filter(mut self, cross: CrossFilter) -> Self {
        self.cross_filter = Some(cross);
        self
    }
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty() && self.cross_filter.is_none()
    }
}
#[derive(Debug, Clone, Default)]
pub struct FilterEngine {
    reference_time: Option<DateTime<Utc>>,
}
impl FilterEngine {
    pub fn new() -> Self {
        Self {
            reference_time: None,
        }
    }
    /// Pins "now" for date-window resolution; tests use this.
    pub fn with_reference_time(mut self, now: DateTime<Utc>) -> Self {
        self.reference_time = Some(now);
        self
    }
    /// Applies every predicate (AND) plus the cross filter, producing a new
    /// frame. Predicates naming unknown fields are skipped. Pure: the input
    /// frame is never modified.
    pub fn apply(&self, frame: &DataFrame, state: &FilterState) -> Result<DataFrame> {
        if state.is_empty() {
            return Ok(frame.clone());
        }
        let today = self
            .reference_time
            .unwrap_or_else(Utc::now)
            .date_naive();
        let mut mask = vec![true; frame.row_count()];
        for predicate in &state.predicates {
            predicate.validate()?;
            self.apply_predicate(frame, predicate, today, &mut mask);
        }
        if let Some(ref cross) = state.cross_filter {
            let equality = FilterPredicate::Equality {
                field: cross.field.clone(),
                value: cross.value.clone(),
            };
            self.apply_predicate(frame, &equality, today, &mut mask);
        }
        let indices: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(i, keep)| keep.then_some(i))
            .collect();
        Ok(frame.select_rows(&indices)?)
    }
    fn apply_predicate(
        &self,
        frame: &DataFrame,
        predicate: &FilterPredicate,
        today: NaiveDate,
        mask: &mut [bool],
    ) {
        let Some(column) = frame.get_column(predicate.field()) else {
            debug!(field = predicate.field(), "filter field not in dataset, skipped");
            return;
        };
        match predicate {
            FilterPredicate::Range { min, max, .. } => {
                for (i, keep) in mask.iter_mut().enumerate() {
                    if !*keep {
                        continue;
                    }
                    *keep = match column.to_f64(i) {
                        Some(v) => min.is_none_or(|m| v >= m) && max.is_none_or(|m| v <= m),
                        None => false,
                    };
                }
            }
            FilterPredicate::Set { values, .. } => {
                let wanted: HashSet<&str> = values.iter().map(String::as_str).collect();
                for (i, keep) in mask.iter_mut().enumerate() {
                    if !*keep {
                        continue;
                    }
                    *keep = column
                        .get_string(i)
                        .is_some_and(|v| wanted.contains(v.as_str()));
                }
            }
            FilterPredicate::DateWindow { window, .. } => {
                let (start, end) = window.resolve(today);
                for (i, keep) in mask.iter_mut().enumerate() {
                    if !*keep {
                        continue;
                    }
                    *keep = match row_datetime(column, i) {
                        Some(dt) => {
                            start.is_none_or(|s| dt >= s) && end.is_none_or(|e| dt <= e)
                        }
                        None => false,
                    };
                }
            }
            FilterPredicate::Equality { value, .. } => {
                apply_equality(column, value, mask);
            }
        }
    }
}
fn row_datetime(column: &Column, index: usize) -> Option<NaiveDateTime> {
    match column.data_type() {
        DataType::Timestamp => column
            .timestamp_millis(index)
            .and_then(DateTime::from_timestamp_millis)
            .map(|dt| dt.naive_utc()),
        _ => column
            .get_string(index)
            .and_then(|s| parse_datetime_permissive(&s)),
    }
}
/// Equality with the legacy fallback chain: numeric comparison when both
/// sides are numeric, otherwise exact string match; when exact matching
/// selects nothing, retry as substring containment.
fn apply_equality(column: &Column, value: &str, mask: &mut [bool]) {
    let numeric_target = value.trim().parse::<f64>().ok();
    let exact: Vec<bool> = (0..mask.len())
        .map(|i| {
            if let (Some(target), Some(v)) =
                (numeric_target.filter(|_| column.data_type().is_numeric()), column.to_f64(i))
            {
                v == target
            } else {
                column.get_string(i).as_deref() == Some(value)
            }
        })
        .collect();
    let chosen = if mask
        .iter()
        .zip(&exact)
        .any(|(keep, hit)| *keep && *hit)
    {
        exact
    } else {
        (0..mask.len())
            .map(|i| {
                column
                    .get_string(i)
                    .is_some_and(|s| s.contains(value))
            })
            .collect()
    };
    for (keep, hit) in mask.iter_mut().zip(chosen) {
        *keep = *keep && hit;
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    fn string_column(values: &[&str]) -> Column {
        let opts: Vec<Option<String>> = values
            .iter()
            .map(|s| if s.is_empty() { None } else { Some((*s).to_string()) })
            .collect();
        Column::from_strings(&opts, DataType::String).expect("column")
    }
    fn sample_frame() -> DataFrame {
        let mut df = DataFrame::new("orders".to_string());
        df.add_column(
            "region".to_string(),
            string_column(&["North", "South", "East", "North"]),
        )
        .expect("add");
        df.add_column(
            "amount".to_string(),
            Column::from_f64(vec![Some(120.0), Some(80.0), Some(200.0), Some(50.0)]),
        )
        .expect("add");
        df.add_column(
            "ordered_at".to_string(),
            string_column(&["2024-03-10", "2024-03-14", "2024-02-01", "2024-03-15"]),
        )
        .expect("add");
        df
    }
    fn engine() -> FilterEngine {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).single().expect("time");
        FilterEngine::new().with_reference_time(now)
    }
    #[test]
    fn range_filter_is_inclusive() {
        let df = sample_frame();
        let state = FilterState::new(vec![FilterPredicate::Range {
            field: "amount".to_string(),
            min: Some(80.0),
            max: Some(120.0),
        }]);
        let out = engine().apply(&df, &state).expect("apply");
        assert_eq!(out.row_count(), 2);
    }
    #[test]
    fn inverted_range_is_rejected() {
        let df = sample_frame();
        let state = FilterState::new(vec![FilterPredicate::Range {
            field: "amount".to_string(),
            min: Some(10.0),
            max: Some(5.0),
        }]);
        assert!(engine().apply(&df, &state).is_err());
    }
    #[test]
    fn set_filter_keeps_membership() {
        let df = sample_frame();
        let state = FilterState::new(vec![FilterPredicate::Set {
            field: "region".to_string(),
            values: vec!["North".to_string()],
        }]);
        let out = engine().apply(&df, &state).expect("apply");
        assert_eq!(out.row_count(), 2);
    }
    #[test]
    fn predicates_compose_with_and() {
        let df = sample_frame();
        let state = FilterState::new(vec![
            FilterPredicate::Set {
                field: "region".to_string(),
                values: vec!["North".to_string()],
            },
            FilterPredicate::Range {
                field: "amount".to_string(),
                min: Some(100.0),
                max: None,
            },
        ]);
        let out = engine().apply(&df, &state).expect("apply");
        assert_eq!(out.row_count(), 1);
        assert_eq!(
            out.column("amount").expect("col").to_f64(0),
            Some(120.0)
        );
    }
    #[test]
    fn last_7_days_window() {
        let df = sample_frame();
        let state = FilterState::new(vec![FilterPredicate::DateWindow {
            field: "ordered_at".to_string(),
            window: DateWindow::Last7Days,
        }]);
        let out = engine().apply(&df, &state).expect("apply");
        // 2024-03-09 .. 2024-03-15 inclusive
        assert_eq!(out.row_count(), 3);
    }
    #[test]
    fn last_month_window() {
        let df = sample_frame();
        let state = FilterState::new(vec![FilterPredicate::DateWindow {
            field: "ordered_at".to_string(),
            window: DateWindow::LastMonth,
        }]);
        let out = engine().apply(&df, &state).expect("apply");
        assert_eq!(out.row_count(), 1);
        assert_eq!(
            out.column("region").expect("col").get_string(0),
            Some("East".to_string())
        );
    }
    #[test]
    fn equality_numeric_comparison() {
        let df = sample_frame();
        let state = FilterState::new(vec![FilterPredicate::Equality {
            field: "amount".to_string(),
            value: "120".to_string(),
        }]);
        let out = engine().apply(&df, &state).expect("apply");
        assert_eq!(out.row_count(), 1);
    }
    #[test]
    fn equality_falls_back_to_substring() {
        let df = sample_frame();
        let state = FilterState::new(vec![FilterPredicate::Equality {
            field: "region".to_string(),
            value: "orth".to_string(),
        }]);
        let out = engine().apply(&df, &state).expect("apply");
        assert_eq!(out.row_count(), 2);
    }
    #[test]
    fn exact_match_suppresses_substring_fallback() {
        let mut df = DataFrame::new("t".to_string());
        df.add_column(
            "name".to_string(),
            string_column(&["North", "Northwest"]),
        )
        .expect("add");
        let state = FilterState::new(vec![FilterPredicate::Equality {
            field: "name".to_string(),
            value: "North".to_string(),
        }]);
        let out = engine().apply(&df, &state).expect("apply");
        assert_eq!(out.row_count(), 1);
    }
    #[test]
    fn unknown_field_predicate_is_skipped() {
        let df = sample_frame();
        let state = FilterState::new(vec![FilterPredicate::Equality {
            field: "ghost".to_string(),
            value: "x".to_string(),
        }]);
        let out = engine().apply(&df, &state).expect("apply");
        assert_eq!(out.row_count(), df.row_count());
    }
    #[test]
    fn cross_filter_applies_as_equality() {
        let df = sample_frame();
        let state = FilterState::new(Vec::new()).with_cross_filter(CrossFilter {
            source_chart_id: "chart-1".to_string(),
            field: "region".to_string(),
            value: "South".to_string(),
        });
        let out = engine().apply(&df, &state).expect("apply");
        assert_eq!(out.row_count(), 1);
    }
    #[test]
    fn cross_filter_toggle_clears_and_replaces() {
        let click = CrossFilter {
            source_chart_id: "c1".to_string(),
            field: "region".to_string(),
            value: "North".to_string(),
        };
        let active = CrossFilter::toggle(None, click.clone());
        assert_eq!(active, Some(click.clone()));
        // same click clears
        assert_eq!(CrossFilter::toggle(active.clone(), click.clone()), None);
        // different click replaces
        let other = CrossFilter {
            value: "South".to_string(),
            ..click
        };
        assert_eq!(CrossFilter::toggle(active, other.clone()), Some(other));
    }
    #[test]
    fn filtering_is_idempotent() {
        let df = sample_frame();
        let state = FilterState::new(vec![FilterPredicate::Range {
            field: "amount".to_string(),
            min: Some(100.0),
            max: None,
        }]);
        let engine = engine();
        let once = engine.apply(&df, &state).expect("apply");
        let twice = engine.apply(&once, &state).expect("apply");
        assert_eq!(once.row_count(), twice.row_count());
        for i in 0..once.row_count() {
            assert_eq!(
                once.column("amount").expect("col").to_f64(i),
                twice.column("amount").expect("col").to_f64(i)
            );
        }
    }
    #[test]
    fn predicate_round_trips_through_json() {
        let predicate = FilterPredicate::DateWindow {
            field: "ordered_at".to_string(),
            window: DateWindow::Last30Days,
        };
        let json = serde_json::to_string(&predicate).expect("serialize");
        assert!(json.contains("\"kind\":\"date_window\""));
        assert!(json.contains("last_30_days"));
        let back: FilterPredicate = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, predicate);
    }
}
