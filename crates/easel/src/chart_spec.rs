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

use crate::error::{ChartError, ChartResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AggFunction {
    Sum,
    #[serde(alias = "avg", alias = "average")]
    Mean,
    Count,
    Min,
    Max,
}
/// Per-chart aggregation choices: a default function plus per-field
/// overrides, override winning where both are set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SeriesAggregation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<AggFunction>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub per_field: HashMap<String, AggFunction>,
}
impl SeriesAggregation {
    pub fn none() -> Self {
        Self::default()
    }
    pub fn of(function: AggFunction) -> Self {
        Self {
            default: Some(function),
            per_field: HashMap::new(),
        }
    }
    pub fn with_field(mut self, field: &str, function: AggFunction) -> Self {
        self.per_field.insert(field.to_string(), function);
        self
    }
    pub fn resolve(&self, field: &str) -> Option<AggFunction> {
        self.per_field.get(field).copied().or(self.default)
    }
    pub fn is_empty(&self) -> bool {
        self.default.is_none() && self.per_field.is_empty()
    }
}
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LegendPosition {
    Top,
    Bottom,
    #[default]
    Right,
}
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartStyle {
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_theme")]
    pub color_theme: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub custom_colors: HashMap<String, String>,
    #[serde(default)]
    pub show_labels: bool,
    #[serde(default = "default_true")]
    pub show_legend: bool,
    #[serde(default)]
    pub legend_position: LegendPosition,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_title: Option<String>,
}
fn default_theme() -> String {
    "default".to_string()
}
fn default_true() -> bool {
    true
}
fn default_height() -> u32 {
    400
}
impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            title: String::new(),
            color_theme: default_theme(),
            custom_colors: HashMap::new(),
            show_labels: false,
            show_legend: true,
            legend_position: LegendPosition::default(),
            height: default_height(),
            x_title: None,
            y_title: None,
        }
    }
}
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineChartSpec {
    pub x: String,
    pub y: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default)]
    pub agg: SeriesAggregation,
    #[serde(default)]
    pub style: ChartStyle,
}
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BarChartSpec {
    pub x: String,
    pub y: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default)]
    pub agg: SeriesAggregation,
    #[serde(default)]
    pub style: ChartStyle,
}
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PieChartSpec {
    /// Slice labels come from `group`, falling back to `x`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    pub y: String,
    #[serde(default)]
    pub agg: SeriesAggregation,
    #[serde(default)]
    pub style: ChartStyle,
}
impl PieChartSpec {
    pub fn category(&self) -> Option<&str> {
        self.group.as_deref().or(self.x.as_deref())
    }
}
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TableOrientation {
    #[default]
    Horizontal,
    Vertical,
}
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableChartSpec {
    #[serde(default)]
    pub columns: Vec<String>,
    /// Fields that become table rows in vertical orientation.
    #[serde(default)]
    pub rows: Vec<String>,
    #[serde(default)]
    pub orientation: TableOrientation,
    #[serde(default = "default_table_limit")]
    pub limit: usize,
    #[serde(default)]
    pub style: ChartStyle,
}
fn default_table_limit() -> usize {
    100
}
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComboChartSpec {
    pub x: String,
    /// First entry renders as bars; a second, when present, as a line on a
    /// secondary axis. Later entries are ignored.
    pub y: Vec<String>,
    #[serde(default)]
    pub agg: SeriesAggregation,
    #[serde(default)]
    pub style: ChartStyle,
}
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChartSpec {
    Line(LineChartSpec),
    Bar(BarChartSpec),
    Pie(PieChartSpec),
    Table(TableChartSpec),
    Combo(ComboChartSpec),
}
impl ChartSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            ChartSpec::Line(_) => "line",
            ChartSpec::Bar(_) => "bar",
            ChartSpec::Pie(_) => "pie",
            ChartSpec::Table(_) => "table",
            ChartSpec::Combo(_) => "combo",
        }
    }
    pub fn style(&self) -> &ChartStyle {
        match self {
            ChartSpec::Line(s) => &s.style,
            ChartSpec::Bar(s) => &s.style,
            ChartSpec::Pie(s) => &s.style,
            ChartSpec::Table(s) => &s.style,
            ChartSpec::Combo(s) => &s.style,
        }
    }
    /// Structural validation ahead of any data access. Field existence is
    /// checked against the dataset separately at render time.
    pub fn validate(&self) -> ChartResult<()> {
        match self {
            ChartSpec::Line(s) => validate_xy("line", &s.x, &s.y),
            ChartSpec::Bar(s) => validate_xy("bar", &s.x, &s.y),
            ChartSpec::Combo(s) => validate_xy("combo", &s.x, &s.y),
            ChartSpec::Pie(s) => {
                if s.category().is_none() {
                    return Err(ChartError::MissingAxis {
                        chart: "pie",
                        axis: "category",
                    });
                }
                if s.y.is_empty() {
                    return Err(ChartError::MissingAxis {
                        chart: "pie",
                        axis: "y",
                    });
                }
                Ok(())
            }
            ChartSpec::Table(s) => {
                let fields = match s.orientation {
                    TableOrientation::Horizontal => &s.columns,
                    TableOrientation::Vertical => &s.rows,
                };
                if fields.is_empty() {
                    return Err(ChartError::EmptyColumnList);
                }
                Ok(())
            }
        }
    }
    /// Grouping key for aggregation: `[x] + [group]` for axis charts, the
    /// category field alone for pies, nothing for tables.
    pub fn group_fields(&self) -> Vec<String> {
        match self {
            ChartSpec::Line(s) => key_of(&s.x, s.group.as_deref()),
            ChartSpec::Bar(s) => key_of(&s.x, s.group.as_deref()),
            ChartSpec::Combo(s) => vec![s.x.clone()],
            ChartSpec::Pie(s) => s.category().map(|c| vec![c.to_string()]).unwrap_or_default(),
            ChartSpec::Table(_) => Vec::new(),
        }
    }
    pub fn y_fields(&self) -> Vec<String> {
        match self {
            ChartSpec::Line(s) => s.y.clone(),
            ChartSpec::Bar(s) => s.y.clone(),
            // combo reads at most two series; later entries are ignored
            ChartSpec::Combo(s) => s.y.iter().take(2).cloned().collect(),
            ChartSpec::Pie(s) => vec![s.y.clone()],
            ChartSpec::Table(_) => Vec::new(),
        }
    }
    pub fn aggregation(&self) -> &SeriesAggregation {
        static NONE: std::sync::OnceLock<SeriesAggregation> = std::sync::OnceLock::new();
        match self {
            ChartSpec::Line(s) => &s.agg,
            ChartSpec::Bar(s) => &s.agg,
            ChartSpec::Combo(s) => &s.agg,
            ChartSpec::Pie(s) => &s.agg,
            ChartSpec::Table(_) => NONE.get_or_init(SeriesAggregation::none),
        }
    }
    /// Every dataset field the chart reads.
    pub fn referenced_fields(&self) -> Vec<String> {
        match self {
            ChartSpec::Table(s) => match s.orientation {
                TableOrientation::Horizontal => s.columns.clone(),
                TableOrientation::Vertical => s.rows.clone(),
            },
            _ => {
                let mut fields = self.group_fields();
                for y in self.y_fields() {
                    if !fields.contains(&y) {
                        fields.push(y);
                    }
                }
                fields
            }
        }
    }
}
fn validate_xy(chart: &'static str, x: &str, y: &[String]) -> ChartResult<()> {
    if x.trim().is_empty() {
        return Err(ChartError::MissingAxis { chart, axis: "x" });
    }
    if y.is_empty() || y.iter().all(|f| f.trim().is_empty()) {
        return Err(ChartError::MissingAxis { chart, axis: "y" });
    }
    Ok(())
}
fn key_of(x: &str, group: Option<&str>) -> Vec<String> {
    let mut key = vec![x.to_string()];
    if let Some(g) = group {
        if !g.is_empty() && !key.iter().any(|k| k == g) {
            key.push(g.to_string());
        }
    }
    key
}
/// Persisted chart bookkeeping: a spec bound to a datasource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartRecord {
    pub id: String,
    pub datasource_id: String,
    pub spec: ChartSpec,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
impl ChartRecord {
    pub fn new(datasource_id: String, spec: ChartSpec) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            datasource_id,
            spec,
            created_at: now,
            updated_at: now,
        }
    }
}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub chart_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
impl DashboardRecord {
    pub fn new(name: String, description: String, chart_ids: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            description,
            chart_ids,
            created_at: now,
            updated_at: now,
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    fn bar(x: &str, y: &[&str]) -> ChartSpec {
        ChartSpec::Bar(BarChartSpec {
            x: x.to_string(),
            y: y.iter().map(|s| (*s).to_string()).collect(),
            group: None,
            agg: SeriesAggregation::none(),
            style: ChartStyle::default(),
        })
    }
    #[test]
    fn bar_without_y_is_rejected() {
        let spec = bar("region", &[]);
        assert!(matches!(
            spec.validate(),
            Err(ChartError::MissingAxis { chart: "bar", axis: "y" })
        ));
    }
    #[test]
    fn bar_without_x_is_rejected() {
        let spec = bar("", &["sales"]);
        assert!(matches!(
            spec.validate(),
            Err(ChartError::MissingAxis { chart: "bar", axis: "x" })
        ));
    }
    #[test]
    fn pie_category_falls_back_to_x() {
        let spec = ChartSpec::Pie(PieChartSpec {
            group: None,
            x: Some("region".to_string()),
            y: "sales".to_string(),
            agg: SeriesAggregation::none(),
            style: ChartStyle::default(),
        });
        assert!(spec.validate().is_ok());
        assert_eq!(spec.group_fields(), vec!["region".to_string()]);
    }
    #[test]
    fn combo_accepts_single_series() {
        let spec = ChartSpec::Combo(ComboChartSpec {
            x: "month".to_string(),
            y: vec!["revenue".to_string()],
            agg: SeriesAggregation::none(),
            style: ChartStyle::default(),
        });
        assert!(spec.validate().is_ok());
        assert_eq!(spec.y_fields(), vec!["revenue".to_string()]);
    }
    #[test]
    fn combo_without_y_is_rejected() {
        let spec = ChartSpec::Combo(ComboChartSpec {
            x: "month".to_string(),
            y: Vec::new(),
            agg: SeriesAggregation::none(),
            style: ChartStyle::default(),
        });
        assert!(matches!(
            spec.validate(),
            Err(ChartError::MissingAxis { chart: "combo", axis: "y" })
        ));
    }
    #[test]
    fn empty_table_is_rejected() {
        let spec = ChartSpec::Table(TableChartSpec {
            columns: Vec::new(),
            rows: Vec::new(),
            orientation: TableOrientation::Horizontal,
            limit: 100,
            style: ChartStyle::default(),
        });
        assert!(matches!(spec.validate(), Err(ChartError::EmptyColumnList)));
    }
    #[test]
    fn per_field_aggregation_beats_default() {
        let agg = SeriesAggregation::of(AggFunction::Sum).with_field("price", AggFunction::Mean);
        assert_eq!(agg.resolve("price"), Some(AggFunction::Mean));
        assert_eq!(agg.resolve("sales"), Some(AggFunction::Sum));
    }
    #[test]
    fn group_key_is_x_then_group() {
        let spec = ChartSpec::Line(LineChartSpec {
            x: "month".to_string(),
            y: vec!["sales".to_string()],
            group: Some("region".to_string()),
            agg: SeriesAggregation::of(AggFunction::Sum),
            style: ChartStyle::default(),
        });
        assert_eq!(spec.group_fields(), vec!["month".to_string(), "region".to_string()]);
        assert_eq!(
            spec.referenced_fields(),
            vec!["month".to_string(), "region".to_string(), "sales".to_string()]
        );
    }
    #[test]
    fn spec_round_trips_through_json() {
        let spec = bar("region", &["sales"]);
        let json = serde_json::to_string(&spec).expect("serialize");
        assert!(json.contains("\"type\":\"bar\""));
        let back: ChartSpec = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, spec);
    }
    #[test]
    fn avg_alias_deserializes_to_mean() {
        let f: AggFunction = serde_json::from_str("\"avg\"").expect("parse");
        assert_eq!(f, AggFunction::Mean);
    }
}
