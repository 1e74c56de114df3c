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

//! Data-to-chart transformation pipeline for dashboard building: schema
//! inference over tabular sources, chart-spec driven aggregation and
//! rendering, interactive filtering, and dashboard composition/export.

pub mod aggregate;
pub mod chart_spec;
pub mod dashboard;
pub mod error;
pub mod figure;
pub mod filter;
pub mod frame;
pub mod palette;
pub mod render;
pub mod schema;
pub mod source;
pub use aggregate::Aggregator;
pub use chart_spec::{
    AggFunction, BarChartSpec, ChartRecord, ChartSpec, ChartStyle, ComboChartSpec,
    DashboardRecord, LegendPosition, LineChartSpec, PieChartSpec, SeriesAggregation,
    TableChartSpec, TableOrientation,
};
pub use dashboard::{
    ChartOutcome, DashboardComposer, DashboardSpec, ExportFormat, ResolvedChart,
};
pub use error::{EaselError, Result};
pub use figure::{ChartArtifact, Figure};
pub use filter::{CrossFilter, DateWindow, FilterEngine, FilterPredicate, FilterState};
pub use frame::{Column, ColumnData, DataFrame, DataType};
pub use palette::{assign_colors, Theme};
pub use render::ChartRenderer;
pub use schema::{FieldDescriptor, FieldStats, FieldType, InferenceConfig, SchemaInferrer};
pub use source::{
    adapter_for, load_source_configs, CachedSource, SourceAdapter, SourceCache, SourceConfig,
    SourceKind,
};
/// Infers a field descriptor per column with the default configuration.
pub fn infer_schema(frame: &DataFrame) -> Result<Vec<FieldDescriptor>> {
    Ok(SchemaInferrer::new().infer(frame)?)
}
/// Groups and reduces a frame according to a chart spec.
pub fn aggregate(frame: &DataFrame, spec: &ChartSpec) -> Result<DataFrame> {
    Aggregator::new().aggregate(frame, spec)
}
/// Validates, aggregates and renders a chart from a raw frame.
pub fn render_chart(frame: &DataFrame, spec: &ChartSpec) -> Result<ChartArtifact> {
    ChartRenderer::new().render(frame, spec)
}
/// Applies a filter state to a frame, returning the filtered copy.
pub fn apply_filters(frame: &DataFrame, state: &FilterState) -> Result<DataFrame> {
    FilterEngine::new().apply(frame, state)
}
/// Facade wiring the pipeline stages over a shared source cache.
pub struct Easel {
    cache: SourceCache,
    inferrer: SchemaInferrer,
    renderer: ChartRenderer,
    filters: FilterEngine,
    composer: DashboardComposer,
}
impl Easel {
    pub fn new() -> Self {
        Self {
            cache: SourceCache::new(),
            inferrer: SchemaInferrer::new(),
            renderer: ChartRenderer::new(),
            filters: FilterEngine::new(),
            composer: DashboardComposer::new(),
        }
    }
    pub fn cache(&self) -> &SourceCache {
        &self.cache
    }
    pub fn schema_for(&self, config: &SourceConfig) -> Result<std::sync::Arc<Vec<FieldDescriptor>>> {
        Ok(self.cache.get_or_fetch(config)?.schema.clone())
    }
    /// Renders a chart over a (possibly cached) source, applying filters
    /// first.
    pub fn render_from_source(
        &self,
        config: &SourceConfig,
        spec: &ChartSpec,
        state: &FilterState,
    ) -> Result<ChartArtifact> {
        let cached = self.cache.get_or_fetch(config)?;
        let filtered = self.filters.apply(&cached.frame, state)?;
        self.renderer.render(&filtered, spec)
    }
    pub fn compose(&self, charts: &[ResolvedChart], state: &FilterState) -> Vec<ChartOutcome> {
        self.composer.compose(charts, state)
    }
    pub fn export(
        &self,
        dashboard: &DashboardSpec,
        outcomes: &[ChartOutcome],
        format: ExportFormat,
        out_dir: &std::path::Path,
    ) -> Result<std::path::PathBuf> {
        self.composer.export(dashboard, outcomes, format, out_dir)
    }
    pub fn inferrer(&self) -> &SchemaInferrer {
        &self.inferrer
    }
}
impl Default for Easel {
    fn default() -> Self {
        Self::new()
    }
}
