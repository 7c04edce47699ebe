//! Chart export to PNG (plotters bitmap backend).

use color_eyre::eyre::eyre;
use color_eyre::Result;
use plotters::prelude::*;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::chart_data::{format_axis_label, ChartKind, ChartSpec};
use crate::pipeline::DashboardView;

/// Bar-series palette, dark to light blue
const PALETTE: [RGBColor; 7] = [
    RGBColor(31, 78, 121),
    RGBColor(46, 134, 193),
    RGBColor(93, 173, 226),
    RGBColor(133, 193, 233),
    RGBColor(21, 67, 96),
    RGBColor(52, 152, 219),
    RGBColor(174, 214, 241),
];

/// Fraction of a category slot covered by its bars
const GROUP_WIDTH: f64 = 0.8;

/// Horizontal extent `(x0, x1)` of series `idx` of `count` within the slot centred on `x`.
pub fn bar_extent(x: f64, idx: usize, count: usize) -> (f64, f64) {
    let count = count.max(1) as f64;
    let width = GROUP_WIDTH / count;
    let x0 = x - GROUP_WIDTH / 2.0 + width * idx as f64;
    (x0, x0 + width)
}

/// Write every non-empty chart of `view` to `<dir>/<section id>.png`.
pub fn export_view(view: &DashboardView, dir: &Path, width: u32, height: u32) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .map_err(|e| eyre!("Could not create export directory {}: {}", dir.display(), e))?;

    let mut written = Vec::new();
    for section in view.all_sections() {
        let Some(chart) = section.chart() else {
            continue;
        };
        if chart.is_empty() {
            continue;
        }
        let path = dir.join(format!("{}.png", section.id));
        write_chart_png(&path, chart, width, height)?;
        written.push(path);
    }
    info!(dir = %dir.display(), charts = written.len(), "exported charts");
    Ok(written)
}

/// Write one chart to PNG.
pub fn write_chart_png(path: &Path, spec: &ChartSpec, width: u32, height: u32) -> Result<()> {
    if spec.is_empty() {
        return Err(eyre!("No data to export"));
    }

    let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE)?;

    let [x_min, x_max] = spec.x_range();
    let y_max = match spec.y_max() {
        y if y > 0.0 => y * 1.05,
        _ => 1.0,
    };

    let mut chart = ChartBuilder::on(&root)
        .caption(spec.title.as_str(), ("sans-serif", 22))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, 0.0..y_max)?;

    let x_labels = match spec.kind {
        ChartKind::Line => 12,
        _ => spec.categories.len().max(1),
    };
    let x_formatter = |x: &f64| spec.x_tick_label(*x);
    let y_formatter = |y: &f64| format_axis_label(*y);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(x_labels)
        .x_label_formatter(&x_formatter)
        .y_label_formatter(&y_formatter)
        .x_desc(spec.x_label.as_str())
        .y_desc(spec.y_label.as_str())
        .draw()?;

    let series_count = spec.series.len();
    for (idx, series) in spec.series.iter().enumerate() {
        let color = PALETTE[idx % PALETTE.len()];
        match spec.kind {
            ChartKind::Line => {
                chart
                    .draw_series(LineSeries::new(series.points.iter().copied(), color.stroke_width(2)))?
                    .label(series.name.as_str())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
                chart.draw_series(
                    series
                        .points
                        .iter()
                        .map(|&p| Circle::new(p, 4, color.filled())),
                )?;
            }
            ChartKind::Bar | ChartKind::Histogram => {
                let count = if spec.kind == ChartKind::Histogram { 1 } else { series_count };
                chart
                    .draw_series(series.points.iter().map(|&(x, y)| {
                        let (x0, x1) = if spec.kind == ChartKind::Histogram {
                            (x - 0.5, x + 0.5)
                        } else {
                            bar_extent(x, idx, count)
                        };
                        Rectangle::new([(x0, 0.0), (x1, y)], color.filled())
                    }))?
                    .label(series.name.as_str())
                    .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
            }
        }
    }

    if series_count > 1 || spec.kind == ChartKind::Line {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    root.present()?;
    Ok(())
}
