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

use crate::aggregate::Aggregator;
use crate::chart_spec::{
    BarChartSpec, ChartSpec, ChartStyle, ComboChartSpec, LegendPosition, LineChartSpec,
    PieChartSpec, TableChartSpec, TableOrientation,
};
use crate::error::{ChartError, Result};
use crate::figure::{ChartArtifact, Figure};
use crate::frame::{ColumnData, DataFrame};
use crate::palette::{assign_colors, Theme};
use serde_json::{json, Value};
use tracing::debug;
#[derive(Debug, Clone, Default)]
pub struct ChartRenderer {
    aggregator: Aggregator,
}
impl ChartRenderer {
    pub fn new() -> Self {
        Self {
            aggregator: Aggregator::new(),
        }
    }
    /// Full chart pipeline: structural validation, field existence checks
    /// against the dataset, aggregation, then figure construction.
    pub fn render(&self, frame: &DataFrame, spec: &ChartSpec) -> Result<ChartArtifact> {
        spec.validate()?;
        for field in spec.referenced_fields() {
            if !frame.has_column(&field) {
                return Err(ChartError::FieldNotFound { field }.into());
            }
        }
        let aggregated = self.aggregator.aggregate(frame, spec)?;
        debug!(
            chart = spec.kind(),
            rows = aggregated.row_count(),
            "rendering chart"
        );
        let figure = match spec {
            ChartSpec::Line(s) => line_figure(&aggregated, s)?,
            ChartSpec::Bar(s) => bar_figure(&aggregated, s)?,
            ChartSpec::Pie(s) => pie_figure(&aggregated, s)?,
            ChartSpec::Table(s) => table_figure(&aggregated, s)?,
            ChartSpec::Combo(s) => combo_figure(&aggregated, s)?,
        };
        let style = spec.style();
        Ok(ChartArtifact {
            figure,
            title: style.title.clone(),
            height: style.height,
        })
    }
}
fn string_cell(frame: &DataFrame, field: &str, row: usize) -> Value {
    frame
        .get_column(field)
        .and_then(|col| col.get_string(row))
        .map(Value::String)
        .unwrap_or(Value::Null)
}
fn number_cell(frame: &DataFrame, field: &str, row: usize) -> Value {
    frame
        .get_column(field)
        .and_then(|col| col.to_f64(row))
        .and_then(|v| serde_json::Number::from_f64(v).map(Value::Number))
        .unwrap_or(Value::Null)
}
fn rows_of(frame: &DataFrame) -> std::ops::Range<usize> {
    0..frame.row_count()
}
/// Distinct non-null values of a column, in order of first appearance.
fn distinct_values(frame: &DataFrame, field: &str) -> Vec<String> {
    let mut seen = Vec::new();
    if let Some(column) = frame.get_column(field) {
        for row in 0..frame.row_count() {
            if let Some(v) = column.get_string(row) {
                if !seen.contains(&v) {
                    seen.push(v);
                }
            }
        }
    }
    seen
}
fn grouped_xy_traces(
    frame: &DataFrame,
    x: &str,
    y: &str,
    group: Option<&str>,
    style: &ChartStyle,
    build: impl Fn(Vec<Value>, Vec<Value>, Option<String>, String) -> Value,
) -> Vec<Value> {
    let theme = Theme::named(&style.color_theme);
    match group {
        Some(group_field) => {
            let values = distinct_values(frame, group_field);
            let colors = assign_colors(&values, &theme, &style.custom_colors);
            let group_col = frame.get_column(group_field).cloned();
            values
                .into_iter()
                .map(|value| {
                    let indices: Vec<usize> = rows_of(frame)
                        .filter(|&row| {
                            group_col
                                .as_ref()
                                .and_then(|col| col.get_string(row))
                                .as_deref()
                                == Some(value.as_str())
                        })
                        .collect();
                    let xs: Vec<Value> =
                        indices.iter().map(|&row| string_cell(frame, x, row)).collect();
                    let ys: Vec<Value> =
                        indices.iter().map(|&row| number_cell(frame, y, row)).collect();
                    let color = colors
                        .get(&value)
                        .cloned()
                        .unwrap_or_else(|| theme.primary().to_string());
                    build(xs, ys, Some(value), color)
                })
                .collect()
        }
        None => {
            let xs: Vec<Value> = rows_of(frame).map(|row| string_cell(frame, x, row)).collect();
            let ys: Vec<Value> = rows_of(frame).map(|row| number_cell(frame, y, row)).collect();
            vec![build(xs, ys, None, theme.primary().to_string())]
        }
    }
}
fn line_figure(frame: &DataFrame, spec: &LineChartSpec) -> Result<Figure> {
    let y = &spec.y[0];
    let mode = if spec.style.show_labels {
        "lines+markers+text"
    } else {
        "lines+markers"
    };
    let show_labels = spec.style.show_labels;
    let traces = grouped_xy_traces(
        frame,
        &spec.x,
        y,
        spec.group.as_deref(),
        &spec.style,
        |xs, ys, name, color| {
            let mut trace = json!({
                "type": "scatter",
                "mode": mode,
                "x": xs,
                "y": ys,
                "line": {"color": color},
                "marker": {"color": color},
            });
            if let Some(name) = name {
                trace["name"] = Value::String(name);
            }
            if show_labels {
                trace["texttemplate"] = json!("%{y}");
                trace["textposition"] = json!("top center");
            }
            trace
        },
    );
    Ok(Figure::new(traces, common_layout(&spec.style)))
}
fn bar_figure(frame: &DataFrame, spec: &BarChartSpec) -> Result<Figure> {
    let y = &spec.y[0];
    let show_labels = spec.style.show_labels;
    let traces = grouped_xy_traces(
        frame,
        &spec.x,
        y,
        spec.group.as_deref(),
        &spec.style,
        |xs, ys, name, color| {
            let mut trace = json!({
                "type": "bar",
                "x": xs,
                "y": ys,
                "marker": {"color": color},
            });
            if let Some(name) = name {
                trace["name"] = Value::String(name);
            }
            if show_labels {
                trace["texttemplate"] = json!("%{y}");
                trace["textposition"] = json!("outside");
            }
            trace
        },
    );
    Ok(Figure::new(traces, common_layout(&spec.style)))
}
fn pie_figure(frame: &DataFrame, spec: &PieChartSpec) -> Result<Figure> {
    let category = spec.category().ok_or(ChartError::MissingAxis {
        chart: "pie",
        axis: "category",
    })?;
    let labels = distinct_values(frame, category);
    let category_col = frame.get_column(category).cloned();
    let value_col = frame.get_column(&spec.y).cloned();
    if value_col.as_ref().is_some_and(|col| !col.data_type().is_numeric()) {
        return Err(ChartError::InvalidSpec {
            chart: "pie",
            reason: format!("y field '{}' is not numeric", spec.y),
        }
        .into());
    }
    // slice values always sum per label, whatever the upstream aggregation
    let values: Vec<f64> = labels
        .iter()
        .map(|label| {
            rows_of(frame)
                .filter(|&row| {
                    category_col
                        .as_ref()
                        .and_then(|col| col.get_string(row))
                        .as_deref()
                        == Some(label.as_str())
                })
                .filter_map(|row| value_col.as_ref().and_then(|col| col.to_f64(row)))
                .sum()
        })
        .collect();
    let theme = Theme::named(&spec.style.color_theme);
    let assigned = assign_colors(&labels, &theme, &spec.style.custom_colors);
    let colors: Vec<String> = labels
        .iter()
        .map(|label| {
            assigned
                .get(label)
                .cloned()
                .unwrap_or_else(|| theme.primary().to_string())
        })
        .collect();
    let textinfo = if spec.style.show_labels {
        "label+percent"
    } else {
        "percent"
    };
    let trace = json!({
        "type": "pie",
        "labels": labels,
        "values": values,
        "marker": {"colors": colors},
        "textinfo": textinfo,
    });
    Ok(Figure::new(vec![trace], common_layout(&spec.style)))
}
fn table_figure(frame: &DataFrame, spec: &TableChartSpec) -> Result<Figure> {
    let limit = spec.limit.min(frame.row_count());
    let (header, cells): (Vec<String>, Vec<Vec<Value>>) = match spec.orientation {
        TableOrientation::Horizontal => {
            let header = spec.columns.clone();
            let cells = spec
                .columns
                .iter()
                .map(|field| {
                    (0..limit)
                        .map(|row| string_cell(frame, field, row))
                        .collect()
                })
                .collect();
            (header, cells)
        }
        TableOrientation::Vertical => {
            // transpose: each chosen field becomes a table row, with
            // generic Col1..ColN headers for the original rows
            let header = (1..=limit).map(|i| format!("Col{i}")).collect();
            let cells = (0..limit)
                .map(|row| {
                    spec.rows
                        .iter()
                        .map(|field| string_cell(frame, field, row))
                        .collect()
                })
                .collect();
            (header, cells)
        }
    };
    let trace = json!({
        "type": "table",
        "header": {
            "values": header,
            "fill": {"color": "#f1f3f5"},
            "align": "left",
        },
        "cells": {
            "values": cells,
            "align": "left",
        },
    });
    // tables only take title and height from the shared styling
    let layout = json!({
        "title": {"text": spec.style.title, "x": 0.5},
        "height": spec.style.height,
        "paper_bgcolor": "#ffffff",
    });
    Ok(Figure::new(vec![trace], layout))
}
fn combo_figure(frame: &DataFrame, spec: &ComboChartSpec) -> Result<Figure> {
    let theme = Theme::named(&spec.style.color_theme);
    let bar_color = theme.colors.first().cloned().unwrap_or_else(|| theme.primary().to_string());
    let xs: Vec<Value> = rows_of(frame)
        .map(|row| string_cell(frame, &spec.x, row))
        .collect();
    let bar_ys: Vec<Value> = rows_of(frame)
        .map(|row| number_cell(frame, &spec.y[0], row))
        .collect();
    let bar_trace = json!({
        "type": "bar",
        "name": spec.y[0],
        "x": xs.clone(),
        "y": bar_ys,
        "marker": {"color": bar_color},
        "yaxis": "y",
    });
    let mut traces = vec![bar_trace];
    let mut layout = common_layout(&spec.style);
    // the line series is optional; without it the combo is a plain bar
    if let Some(line_field) = spec.y.get(1) {
        let line_color = theme
            .colors
            .get(1)
            .cloned()
            .unwrap_or_else(|| theme.primary().to_string());
        let line_ys: Vec<Value> = rows_of(frame)
            .map(|row| number_cell(frame, line_field, row))
            .collect();
        traces.push(json!({
            "type": "scatter",
            "mode": "lines+markers",
            "name": line_field,
            "x": xs,
            "y": line_ys,
            "line": {"color": line_color},
            "marker": {"color": line_color},
            "yaxis": "y2",
        }));
        layout["yaxis2"] = json!({
            "title": {"text": line_field},
            "overlaying": "y",
            "side": "right",
        });
    }
    Ok(Figure::new(traces, layout))
}
fn common_layout(style: &ChartStyle) -> Value {
    let mut layout = json!({
        "title": {"text": style.title, "x": 0.5},
        "height": style.height,
        "showlegend": style.show_legend,
        "plot_bgcolor": "#ffffff",
        "paper_bgcolor": "#ffffff",
        "font": {"color": "#2a3f5f"},
    });
    layout["legend"] = match style.legend_position {
        LegendPosition::Top => json!({"orientation": "h", "y": 1.12, "x": 0.0}),
        LegendPosition::Bottom => json!({"orientation": "h", "y": -0.25, "x": 0.0}),
        LegendPosition::Right => json!({"x": 1.02, "y": 1.0}),
    };
    if let Some(ref x_title) = style.x_title {
        layout["xaxis"] = json!({"title": {"text": x_title}});
    }
    if let Some(ref y_title) = style.y_title {
        layout["yaxis"] = json!({"title": {"text": y_title}});
    }
    layout
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart_spec::{AggFunction, SeriesAggregation};
    use crate::error::EaselError;
    use crate::frame::{Column, DataType};
    fn sales_frame() -> DataFrame {
        let mut df = DataFrame::new("sales".to_string());
        let regions: Vec<Option<String>> = ["A", "B", "A", "B", "A"]
            .iter()
            .map(|s| Some((*s).to_string()))
            .collect();
        df.add_column(
            "region".to_string(),
            Column::from_strings(&regions, DataType::String).expect("col"),
        )
        .expect("add");
        df.add_column(
            "sales".to_string(),
            Column::from_f64(vec![
                Some(100.0),
                Some(400.0),
                Some(300.0),
                Some(580.0),
                Some(420.0),
            ]),
        )
        .expect("add");
        df
    }
    fn bar_spec(x: &str, y: &str) -> ChartSpec {
        ChartSpec::Bar(BarChartSpec {
            x: x.to_string(),
            y: vec![y.to_string()],
            group: None,
            agg: SeriesAggregation::of(AggFunction::Sum),
            style: ChartStyle::default(),
        })
    }
    #[test]
    fn missing_field_is_named_in_error() {
        let df = sales_frame();
        let err = ChartRenderer::new()
            .render(&df, &bar_spec("nope", "sales"))
            .unwrap_err();
        match err {
            EaselError::Chart(ChartError::FieldNotFound { field }) => assert_eq!(field, "nope"),
            other => panic!("unexpected error: {other}"),
        }
    }
    #[test]
    fn invalid_spec_fails_before_data_access() {
        let df = sales_frame();
        let spec = ChartSpec::Bar(BarChartSpec {
            x: "region".to_string(),
            y: Vec::new(),
            group: None,
            agg: SeriesAggregation::none(),
            style: ChartStyle::default(),
        });
        assert!(matches!(
            ChartRenderer::new().render(&df, &spec),
            Err(EaselError::Chart(ChartError::MissingAxis { .. }))
        ));
    }
    #[test]
    fn aggregated_bar_chart_end_to_end() {
        let df = sales_frame();
        let artifact = ChartRenderer::new()
            .render(&df, &bar_spec("region", "sales"))
            .expect("render");
        assert_eq!(artifact.height, 400);
        assert_eq!(artifact.figure.trace_count(), 1);
        let trace = &artifact.figure.data[0];
        assert_eq!(trace["type"], "bar");
        assert_eq!(trace["x"], json!(["A", "B"]));
        assert_eq!(trace["y"], json!([820.0, 980.0]));
    }
    #[test]
    fn line_chart_truncates_to_first_y() {
        let mut df = sales_frame();
        df.add_column(
            "cost".to_string(),
            Column::from_f64(vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0)]),
        )
        .expect("add");
        let spec = ChartSpec::Line(LineChartSpec {
            x: "region".to_string(),
            y: vec!["sales".to_string(), "cost".to_string()],
            group: None,
            agg: SeriesAggregation::of(AggFunction::Sum),
            style: ChartStyle::default(),
        });
        let artifact = ChartRenderer::new().render(&df, &spec).expect("render");
        assert_eq!(artifact.figure.trace_count(), 1);
        assert_eq!(artifact.figure.data[0]["y"], json!([820.0, 980.0]));
    }
    #[test]
    fn grouped_bar_gets_one_trace_per_group() {
        let mut df = sales_frame();
        let months: Vec<Option<String>> = ["Jan", "Jan", "Feb", "Feb", "Mar"]
            .iter()
            .map(|s| Some((*s).to_string()))
            .collect();
        df.add_column(
            "month".to_string(),
            Column::from_strings(&months, DataType::String).expect("col"),
        )
        .expect("add");
        let spec = ChartSpec::Bar(BarChartSpec {
            x: "month".to_string(),
            y: vec!["sales".to_string()],
            group: Some("region".to_string()),
            agg: SeriesAggregation::of(AggFunction::Sum),
            style: ChartStyle::default(),
        });
        let artifact = ChartRenderer::new().render(&df, &spec).expect("render");
        assert_eq!(artifact.figure.trace_count(), 2);
        let names: Vec<&str> = artifact
            .figure
            .data
            .iter()
            .filter_map(|t| t["name"].as_str())
            .collect();
        assert_eq!(names, vec!["A", "B"]);
        let colors: Vec<&str> = artifact
            .figure
            .data
            .iter()
            .filter_map(|t| t["marker"]["color"].as_str())
            .collect();
        assert_ne!(colors[0], colors[1]);
    }
    #[test]
    fn pie_sums_values_per_label() {
        let df = sales_frame();
        let spec = ChartSpec::Pie(PieChartSpec {
            group: Some("region".to_string()),
            x: None,
            y: "sales".to_string(),
            agg: SeriesAggregation::none(),
            style: ChartStyle::default(),
        });
        let artifact = ChartRenderer::new().render(&df, &spec).expect("render");
        let trace = &artifact.figure.data[0];
        assert_eq!(trace["labels"], json!(["A", "B"]));
        assert_eq!(trace["values"], json!([820.0, 980.0]));
    }
    #[test]
    fn vertical_table_transposes_with_generic_headers() {
        let df = sales_frame();
        let spec = ChartSpec::Table(TableChartSpec {
            columns: Vec::new(),
            rows: vec!["region".to_string(), "sales".to_string()],
            orientation: TableOrientation::Vertical,
            limit: 3,
            style: ChartStyle::default(),
        });
        let artifact = ChartRenderer::new().render(&df, &spec).expect("render");
        let trace = &artifact.figure.data[0];
        assert_eq!(trace["header"]["values"], json!(["Col1", "Col2", "Col3"]));
        assert_eq!(
            trace["cells"]["values"][0],
            json!(["A", "100"])
        );
    }
    #[test]
    fn table_caps_rows_at_limit() {
        let df = sales_frame();
        let spec = ChartSpec::Table(TableChartSpec {
            columns: vec!["region".to_string()],
            rows: Vec::new(),
            orientation: TableOrientation::Horizontal,
            limit: 2,
            style: ChartStyle::default(),
        });
        let artifact = ChartRenderer::new().render(&df, &spec).expect("render");
        let cells = artifact.figure.data[0]["cells"]["values"][0]
            .as_array()
            .expect("cells");
        assert_eq!(cells.len(), 2);
    }
    #[test]
    fn combo_puts_second_series_on_secondary_axis() {
        let mut df = sales_frame();
        df.add_column(
            "margin".to_string(),
            Column::from_f64(vec![Some(0.1), Some(0.2), Some(0.3), Some(0.4), Some(0.5)]),
        )
        .expect("add");
        let spec = ChartSpec::Combo(ComboChartSpec {
            x: "region".to_string(),
            y: vec![
                "sales".to_string(),
                "margin".to_string(),
                "ignored".to_string(),
            ],
            agg: SeriesAggregation::none(),
            style: ChartStyle::default(),
        });
        // the third entry names no real column; it must never be read
        let artifact = ChartRenderer::new().render(&df, &spec).expect("render");
        assert_eq!(artifact.figure.trace_count(), 2);
        assert_eq!(artifact.figure.data[0]["type"], "bar");
        assert_eq!(artifact.figure.data[1]["yaxis"], "y2");
        assert!(artifact.figure.layout["yaxis2"]["overlaying"] == json!("y"));
    }
    #[test]
    fn combo_with_single_series_renders_bar_only() {
        let df = sales_frame();
        let spec = ChartSpec::Combo(ComboChartSpec {
            x: "region".to_string(),
            y: vec!["sales".to_string()],
            agg: SeriesAggregation::of(AggFunction::Sum),
            style: ChartStyle::default(),
        });
        let artifact = ChartRenderer::new().render(&df, &spec).expect("render");
        assert_eq!(artifact.figure.trace_count(), 1);
        assert_eq!(artifact.figure.data[0]["type"], "bar");
        assert_eq!(artifact.figure.data[0]["y"], json!([820.0, 980.0]));
        assert!(artifact.figure.layout["yaxis2"].is_null());
    }
    #[test]
    fn pie_rejects_non_numeric_y() {
        let mut df = sales_frame();
        let notes: Vec<Option<String>> = ["x", "y", "z", "w", "v"]
            .iter()
            .map(|s| Some((*s).to_string()))
            .collect();
        df.add_column(
            "note".to_string(),
            Column::from_strings(&notes, DataType::String).expect("col"),
        )
        .expect("add");
        let spec = ChartSpec::Pie(PieChartSpec {
            group: Some("region".to_string()),
            x: None,
            y: "note".to_string(),
            agg: SeriesAggregation::none(),
            style: ChartStyle::default(),
        });
        assert!(matches!(
            ChartRenderer::new().render(&df, &spec),
            Err(EaselError::Chart(ChartError::InvalidSpec { chart: "pie", .. }))
        ));
    }
    #[test]
    fn layout_carries_common_styling() {
        let df = sales_frame();
        let mut style = ChartStyle::default();
        style.title = "Sales by Region".to_string();
        style.legend_position = LegendPosition::Bottom;
        style.x_title = Some("Region".to_string());
        let spec = ChartSpec::Bar(BarChartSpec {
            x: "region".to_string(),
            y: vec!["sales".to_string()],
            group: None,
            agg: SeriesAggregation::of(AggFunction::Sum),
            style,
        });
        let artifact = ChartRenderer::new().render(&df, &spec).expect("render");
        let layout = &artifact.figure.layout;
        assert_eq!(layout["title"]["text"], "Sales by Region");
        assert_eq!(layout["title"]["x"], json!(0.5));
        assert_eq!(layout["legend"]["orientation"], "h");
        assert_eq!(layout["xaxis"]["title"]["text"], "Region");
        assert_eq!(layout["height"], json!(400));
    }
}
