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

use anyhow::Result;
use easel::{
    AggFunction, BarChartSpec, ChartSpec, ChartStyle, DashboardComposer, DashboardSpec, Easel,
    ExportFormat, FilterPredicate, FilterState, LineChartSpec, PieChartSpec, ResolvedChart,
    SeriesAggregation, SourceConfig,
};
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let csv_path = Path::new("sample_sales.csv");
    if !csv_path.exists() {
        create_sample_data(csv_path)?;
        println!("Created {}", csv_path.display());
    }

    let system = Easel::new();
    let source = SourceConfig::file("sales", "Sample Sales", csv_path);

    let schema = system.schema_for(&source)?;
    println!("Inferred schema:");
    for field in schema.iter() {
        println!("  {}: {:?} ({} nulls)", field.name, field.inferred_type, field.null_count);
    }

    let cached = system.cache().get_or_fetch(&source)?;
    println!("\nDataset sample:");
    cached.frame.print_sample(5);

    let bar = ChartSpec::Bar(BarChartSpec {
        x: "region".to_string(),
        y: vec!["sales".to_string()],
        group: None,
        agg: SeriesAggregation::of(AggFunction::Sum),
        style: ChartStyle {
            title: "Sales by Region".to_string(),
            ..ChartStyle::default()
        },
    });
    let pie = ChartSpec::Pie(PieChartSpec {
        group: Some("product".to_string()),
        x: None,
        y: "sales".to_string(),
        agg: SeriesAggregation::of(AggFunction::Sum),
        style: ChartStyle {
            title: "Share by Product".to_string(),
            color_theme: "ocean".to_string(),
            show_labels: true,
            ..ChartStyle::default()
        },
    });
    let line = ChartSpec::Line(LineChartSpec {
        x: "day".to_string(),
        y: vec!["sales".to_string()],
        group: Some("region".to_string()),
        agg: SeriesAggregation::of(AggFunction::Sum),
        style: ChartStyle {
            title: "Daily Sales by Region".to_string(),
            ..ChartStyle::default()
        },
    });

    let filters = FilterState::new(vec![FilterPredicate::Range {
        field: "sales".to_string(),
        min: Some(50.0),
        max: None,
    }]);

    let charts: Vec<ResolvedChart> = [("bar", bar), ("pie", pie), ("line", line)]
        .into_iter()
        .map(|(id, spec)| ResolvedChart {
            chart_id: id.to_string(),
            spec,
            frame: cached.frame.as_ref().clone(),
        })
        .collect();

    let composer = DashboardComposer::new();
    let outcomes = composer.compose(&charts, &filters);
    for outcome in &outcomes {
        println!(
            "chart '{}': {}",
            outcome.chart_id(),
            if outcome.is_rendered() { "rendered" } else { "failed" }
        );
    }

    let dashboard = DashboardSpec {
        name: "Sales Overview".to_string(),
        description: "Demo dashboard produced by easel".to_string(),
    };
    let path = composer.export(&dashboard, &outcomes, ExportFormat::Html, Path::new("exports"))?;
    println!("\nDashboard exported to {}", path.display());
    Ok(())
}

fn create_sample_data(path: &Path) -> Result<()> {
    let sample_csv = "\
product,sales,region,day
Widget,150.5,North,2024-03-01
Gadget,89.2,South,2024-03-01
Widget,200.0,East,2024-03-02
Doohickey,175.8,West,2024-03-02
Widget,95.5,North,2024-03-03
Gadget,210.3,South,2024-03-03
Doohickey,165.7,East,2024-03-04
Widget,188.9,West,2024-03-04
Gadget,145.2,North,2024-03-05
Doohickey,198.4,South,2024-03-05
";
    std::fs::write(path, sample_csv)?;
    Ok(())
}
