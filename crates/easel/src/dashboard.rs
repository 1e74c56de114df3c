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

use crate::chart_spec::ChartSpec;
use crate::error::{EaselError, ExportError, Result};
use crate::figure::ChartArtifact;
use crate::filter::{FilterEngine, FilterState};
use crate::frame::DataFrame;
use crate::render::ChartRenderer;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, warn};
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
}
/// A chart ready for composition: its id, its spec, and the source frame
/// it draws from.
#[derive(Debug, Clone)]
pub struct ResolvedChart {
    pub chart_id: String,
    pub spec: ChartSpec,
    pub frame: DataFrame,
}
#[derive(Debug, Clone)]
pub enum ChartOutcome {
    Rendered {
        chart_id: String,
        artifact: ChartArtifact,
        /// True when this chart is the active cross-filter's source and
        /// therefore rendered unfiltered.
        filter_origin: bool,
    },
    Failed {
        chart_id: String,
        message: String,
    },
}
impl ChartOutcome {
    pub fn chart_id(&self) -> &str {
        match self {
            ChartOutcome::Rendered { chart_id, .. } => chart_id,
            ChartOutcome::Failed { chart_id, .. } => chart_id,
        }
    }
    pub fn is_rendered(&self) -> bool {
        matches!(self, ChartOutcome::Rendered { .. })
    }
}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Html,
    Png,
    Pdf,
}
impl ExportFormat {
    fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Html => "html",
            ExportFormat::Png => "png",
            ExportFormat::Pdf => "pdf",
        }
    }
    fn label(&self) -> &'static str {
        match self {
            ExportFormat::Html => "HTML",
            ExportFormat::Png => "PNG",
            ExportFormat::Pdf => "PDF",
        }
    }
}
#[derive(Debug, Default)]
pub struct DashboardComposer {
    renderer: ChartRenderer,
    filters: FilterEngine,
}
impl DashboardComposer {
    pub fn new() -> Self {
        Self {
            renderer: ChartRenderer::new(),
            filters: FilterEngine::new(),
        }
    }
    pub fn with_filter_engine(mut self, filters: FilterEngine) -> Self {
        self.filters = filters;
        self
    }
    /// Renders every chart under the shared filter state. A failing chart
    /// becomes a `Failed` outcome; its siblings still render. The cross
    /// filter's source chart is rendered without it and marked as origin.
    pub fn compose(&self, charts: &[ResolvedChart], filters: &FilterState) -> Vec<ChartOutcome> {
        charts
            .iter()
            .map(|chart| {
                let is_origin = filters
                    .cross_filter
                    .as_ref()
                    .is_some_and(|cross| cross.source_chart_id == chart.chart_id);
                let effective = if is_origin {
                    FilterState {
                        predicates: filters.predicates.clone(),
                        cross_filter: None,
                    }
                } else {
                    filters.clone()
                };
                let result = self
                    .filters
                    .apply(&chart.frame, &effective)
                    .and_then(|filtered| self.renderer.render(&filtered, &chart.spec));
                match result {
                    Ok(artifact) => ChartOutcome::Rendered {
                        chart_id: chart.chart_id.clone(),
                        artifact,
                        filter_origin: is_origin,
                    },
                    Err(error) => {
                        warn!(
                            chart = chart.chart_id.as_str(),
                            error = %error,
                            "chart failed to render, emitting placeholder"
                        );
                        ChartOutcome::Failed {
                            chart_id: chart.chart_id.clone(),
                            message: error.user_message(),
                        }
                    }
                }
            })
            .collect()
    }
    /// Writes the dashboard in the requested format and returns the file
    /// path. PNG and PDF rasterize an intermediate HTML page through the
    /// first available external renderer.
    pub fn export(
        &self,
        dashboard: &DashboardSpec,
        outcomes: &[ChartOutcome],
        format: ExportFormat,
        out_dir: &Path,
    ) -> Result<PathBuf> {
        std::fs::create_dir_all(out_dir)?;
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let base = sanitize_file_name(&dashboard.name);
        let html_path = out_dir.join(format!("{base}_{stamp}.html"));
        let html = render_html(dashboard, outcomes);
        std::fs::write(&html_path, html).map_err(|source| ExportError::WriteFailed {
            path: html_path.display().to_string(),
            source,
        })?;
        if format == ExportFormat::Html {
            info!(path = %html_path.display(), "dashboard exported");
            return Ok(html_path);
        }
        let out_path = out_dir.join(format!("{base}_{stamp}.{}", format.extension()));
        rasterize(&html_path, &out_path, format)?;
        info!(path = %out_path.display(), "dashboard exported");
        Ok(out_path)
    }
}
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    if cleaned.trim_matches('_').is_empty() {
        "dashboard".to_string()
    } else {
        cleaned
    }
}
/// Self-contained page: the plotly runtime comes from its CDN, each chart
/// renders into its own div, failed charts show an error placeholder.
fn render_html(dashboard: &DashboardSpec, outcomes: &[ChartOutcome]) -> String {
    let mut body = String::new();
    for (index, outcome) in outcomes.iter().enumerate() {
        match outcome {
            ChartOutcome::Rendered { artifact, .. } => {
                let div_id = format!("chart-{index}");
                let figure_json = artifact
                    .to_json()
                    .unwrap_or_else(|_| "{\"data\":[],\"layout\":{}}".to_string());
                body.push_str(&format!(
                    "<div class=\"chart\" id=\"{div_id}\"></div>\n\
                     <script>var fig{index} = {figure_json};\n\
                     Plotly.newPlot(\"{div_id}\", fig{index}.data, fig{index}.layout, {{responsive: true}});</script>\n"
                ));
            }
            ChartOutcome::Failed { chart_id, message } => {
                body.push_str(&format!(
                    "<div class=\"chart chart-error\">\
                     <h3>Chart unavailable</h3>\
                     <p>{} could not be rendered: {}</p></div>\n",
                    html_escape(chart_id),
                    html_escape(message)
                ));
            }
        }
    }
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n\
         <script src=\"https://cdn.plot.ly/plotly-2.32.0.min.js\"></script>\n\
         <style>\n\
         body {{ font-family: Arial, sans-serif; margin: 24px; background: #fafafa; }}\n\
         h1 {{ color: #2c3e50; }}\n\
         .chart {{ background: #ffffff; border: 1px solid #e0e0e0; border-radius: 6px;\n\
                   padding: 12px; margin-bottom: 24px; }}\n\
         .chart-error {{ color: #c0392b; }}\n\
         </style>\n</head>\n<body>\n\
         <h1>{title}</h1>\n<p>{description}</p>\n{body}</body>\n</html>\n",
        title = html_escape(&dashboard.name),
        description = html_escape(&dashboard.description),
        body = body
    )
}
fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
struct RasterStrategy {
    name: &'static str,
    program: &'static str,
    args: fn(&Path, &Path) -> Vec<String>,
}
fn strategies_for(format: ExportFormat) -> Vec<RasterStrategy> {
    match format {
        ExportFormat::Png => vec![
            RasterStrategy {
                name: "wkhtmltoimage",
                program: "wkhtmltoimage",
                args: |html, out| {
                    vec![
                        "--quality".to_string(),
                        "90".to_string(),
                        html.display().to_string(),
                        out.display().to_string(),
                    ]
                },
            },
            RasterStrategy {
                name: "chromium headless screenshot",
                program: "chromium",
                args: |html, out| {
                    vec![
                        "--headless".to_string(),
                        "--disable-gpu".to_string(),
                        format!("--screenshot={}", out.display()),
                        "--window-size=1400,1000".to_string(),
                        html.display().to_string(),
                    ]
                },
            },
            RasterStrategy {
                name: "google-chrome headless screenshot",
                program: "google-chrome",
                args: |html, out| {
                    vec![
                        "--headless".to_string(),
                        "--disable-gpu".to_string(),
                        format!("--screenshot={}", out.display()),
                        "--window-size=1400,1000".to_string(),
                        html.display().to_string(),
                    ]
                },
            },
        ],
        ExportFormat::Pdf => vec![
            RasterStrategy {
                name: "wkhtmltopdf",
                program: "wkhtmltopdf",
                args: |html, out| {
                    vec![html.display().to_string(), out.display().to_string()]
                },
            },
            RasterStrategy {
                name: "chromium headless print",
                program: "chromium",
                args: |html, out| {
                    vec![
                        "--headless".to_string(),
                        "--disable-gpu".to_string(),
                        format!("--print-to-pdf={}", out.display()),
                        html.display().to_string(),
                    ]
                },
            },
            RasterStrategy {
                name: "google-chrome headless print",
                program: "google-chrome",
                args: |html, out| {
                    vec![
                        "--headless".to_string(),
                        "--disable-gpu".to_string(),
                        format!("--print-to-pdf={}", out.display()),
                        html.display().to_string(),
                    ]
                },
            },
        ],
        ExportFormat::Html => Vec::new(),
    }
}
/// Tries each renderer in order; the first one that produces the output
/// file wins. When none is available the error names everything tried.
fn rasterize(html_path: &Path, out_path: &Path, format: ExportFormat) -> Result<()> {
    let mut tried = Vec::new();
    for strategy in strategies_for(format) {
        let args = (strategy.args)(html_path, out_path);
        match Command::new(strategy.program).args(&args).output() {
            Ok(output) if output.status.success() && out_path.exists() => {
                info!(strategy = strategy.name, "rasterized dashboard");
                return Ok(());
            }
            Ok(_) | Err(_) => {
                tried.push(strategy.name.to_string());
            }
        }
    }
    Err(EaselError::Export(ExportError::AllRenderersFailed {
        format: format.label().to_string(),
        tried,
    }))
}
