//! This module renders panel charts to PNG images.

use anyhow::{Context, Result};
use plotters::prelude::*;
use soilwatch_core::window::ChartData;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Line colors per dataset, in channel order.
const SERIES_COLORS: [RGBColor; 3] = [
    RGBColor(255, 99, 132),
    RGBColor(54, 162, 235),
    RGBColor(75, 192, 192),
];

/// Saves every non-empty chart and returns the written paths.
pub fn plot_charts(output_dir: &Path, charts: &[ChartData]) -> Result<Vec<PathBuf>> {
    println!("[Plotting] Rendering {} chart(s)...", charts.len());
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", output_dir))?;

    let mut written = Vec::new();
    for chart in charts {
        if chart.is_empty() {
            println!("[Plotting] Warning: No data to plot for {}.", chart.group);
            continue;
        }
        written.push(plot_chart(output_dir, chart)?);
    }

    if !written.is_empty() {
        println!("[Plotting] Charts have been saved to '{}'.", output_dir.display());
    }
    Ok(written)
}

pub fn chart_file_name(chart: &ChartData) -> String {
    format!("{}_chart.png", chart.group.slug())
}

/// Draws one panel's window as a line chart with the time labels on the x axis.
pub fn plot_chart(output_dir: &Path, chart: &ChartData) -> Result<PathBuf> {
    let path = output_dir.join(chart_file_name(chart));
    let root = BitMapBackend::new(&path, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let max_x = (chart.labels.len() as u64).saturating_sub(1).max(1);
    let (lo, hi) = chart.value_bounds().unwrap_or((0.0, 1.0));
    let pad = if hi > lo { (hi - lo) * 0.1 } else { 1.0 };
    let labels = &chart.labels;

    let mut cartesian = ChartBuilder::on(&root)
        .caption(chart.group.title(), ("sans-serif", 40).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0u64..max_x, (lo - pad)..(hi + pad))?;

    cartesian
        .configure_mesh()
        .x_labels(labels.len())
        .x_label_formatter(&|x| labels.get(*x as usize).cloned().unwrap_or_default())
        .x_desc("Time")
        .y_desc(chart.group.label_prefix())
        .draw()?;

    for (i, dataset) in chart.datasets.iter().enumerate() {
        let color = SERIES_COLORS[i % SERIES_COLORS.len()];
        cartesian
            .draw_series(LineSeries::new(
                dataset.data.iter().enumerate().map(|(x, v)| (x as u64, *v)),
                color.stroke_width(2),
            ))?
            .label(dataset.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.filled()));
    }

    cartesian
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    root.present()?;
    drop(cartesian);
    drop(root);
    Ok(path)
}
