//! Convert summary tables into renderer-neutral chart specs.
//!
//! A [`ChartSpec`] is what the terminal widgets, the PNG exporter and the text
//! report all consume. Bar-like charts use the category index as x; line charts
//! use the month number.

use polars::prelude::*;

use crate::columns::*;
use crate::error::{require_columns, DashboardResult};

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChartKind {
    Bar,
    Histogram,
    Line,
}

/// One named series of (x, y) points.
#[derive(Clone, Debug, PartialEq)]
pub struct ChartSeries {
    pub name: String,
    pub points: Vec<(f64, f64)>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChartSpec {
    pub title: String,
    pub kind: ChartKind,
    pub x_label: String,
    pub y_label: String,
    /// Labels for x positions 0..n of bar-like charts. Empty for line charts.
    pub categories: Vec<String>,
    pub series: Vec<ChartSeries>,
    /// Fixed x-axis bounds; derived from the points when None.
    pub x_bounds: Option<[f64; 2]>,
}

impl ChartSpec {
    fn new(title: impl Into<String>, kind: ChartKind, x_label: &str, y_label: &str) -> Self {
        Self {
            title: title.into(),
            kind,
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            categories: Vec::new(),
            series: Vec::new(),
            x_bounds: None,
        }
    }

    /// True when there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|s| s.points.is_empty())
    }

    /// Largest y value over all series, 0 when empty.
    pub fn y_max(&self) -> f64 {
        self.series
            .iter()
            .flat_map(|s| s.points.iter().map(|&(_, y)| y))
            .fold(0.0, f64::max)
    }

    /// x-axis bounds: the fixed ones, else the span of the points (padded for a single x).
    pub fn x_range(&self) -> [f64; 2] {
        if let Some(bounds) = self.x_bounds {
            return bounds;
        }
        if self.kind != ChartKind::Line {
            return [-0.5, self.categories.len().max(1) as f64 - 0.5];
        }
        let (lo, hi) = self
            .series
            .iter()
            .flat_map(|s| s.points.iter().map(|&(x, _)| x))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(a, b), x| {
                (a.min(x), b.max(x))
            });
        if !lo.is_finite() {
            [0.0, 1.0]
        } else if hi > lo {
            [lo, hi]
        } else {
            [lo - 0.5, hi + 0.5]
        }
    }

    /// Label for an x position: the category, a month name, or a number.
    pub fn x_tick_label(&self, x: f64) -> String {
        match self.kind {
            ChartKind::Line => month_label(x.round() as i32),
            _ => self
                .categories
                .get(x.round().max(0.0) as usize)
                .cloned()
                .unwrap_or_else(|| format_axis_label(x)),
        }
    }
}

/// Three-letter month abbreviation for 1..=12, else the number.
pub fn month_label(month: i32) -> String {
    usize::try_from(month - 1)
        .ok()
        .and_then(|idx| MONTH_ABBREVIATIONS.get(idx))
        .map(|m| m.to_string())
        .unwrap_or_else(|| month.to_string())
}

/// Compact numeric label: fixed two decimals, scientific for very large or tiny values.
pub fn format_axis_label(v: f64) -> String {
    if v.abs() >= 1e6 || (v.abs() < 1e-2 && v != 0.0) {
        format!("{:.2e}", v)
    } else if (v - v.round()).abs() < 1e-9 {
        format!("{:.0}", v)
    } else {
        format!("{:.2}", v)
    }
}

fn column_labels(df: &DataFrame, name: &str) -> DashboardResult<Vec<String>> {
    let column = df.column(name)?;
    if matches!(column.dtype(), DataType::Int32 | DataType::Int64) && name == PURCHASE_MONTH {
        return Ok(column_values(df, name)?
            .into_iter()
            .map(|m| month_label(m as i32))
            .collect());
    }
    let strings = column.cast(&DataType::String)?;
    Ok(strings
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or("null").to_string())
        .collect())
}

fn column_values(df: &DataFrame, name: &str) -> DashboardResult<Vec<f64>> {
    let values = df.column(name)?.cast(&DataType::Float64)?;
    Ok(values
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(0.0))
        .collect())
}

/// One bar per row: `category` labels the bar, `value` is its height.
pub fn bar_chart(
    table: &DataFrame,
    category: &str,
    value: &str,
    title: impl Into<String>,
    x_label: &str,
    y_label: &str,
) -> DashboardResult<ChartSpec> {
    require_columns(table, &[category, value])?;
    let mut spec = ChartSpec::new(title, ChartKind::Bar, x_label, y_label);
    spec.categories = column_labels(table, category)?;
    spec.series.push(ChartSeries {
        name: value.to_string(),
        points: column_values(table, value)?
            .into_iter()
            .enumerate()
            .map(|(i, y)| (i as f64, y))
            .collect(),
    });
    Ok(spec)
}

/// Grouped bars: one group per distinct `group` value (in table order), one series per `hue` value.
pub fn grouped_bar_chart(
    table: &DataFrame,
    group: &str,
    hue: &str,
    value: &str,
    title: impl Into<String>,
    x_label: &str,
    y_label: &str,
) -> DashboardResult<ChartSpec> {
    let mut spec = ChartSpec::new(title, ChartKind::Bar, x_label, y_label);
    push_grouped_points(&mut spec, table, group, hue, value)?;
    Ok(spec)
}

/// Grouped bars per `purchase_month` with one group for every month, January to December.
pub fn monthly_grouped_bar_chart(
    table: &DataFrame,
    hue: &str,
    value: &str,
    title: impl Into<String>,
    y_label: &str,
) -> DashboardResult<ChartSpec> {
    let mut spec = ChartSpec::new(title, ChartKind::Bar, "Month", y_label);
    spec.categories = (1..=12).map(month_label).collect();
    push_grouped_points(&mut spec, table, PURCHASE_MONTH, hue, value)?;
    Ok(spec)
}

fn push_grouped_points(
    spec: &mut ChartSpec,
    table: &DataFrame,
    group: &str,
    hue: &str,
    value: &str,
) -> DashboardResult<()> {
    require_columns(table, &[group, hue, value])?;
    let groups = column_labels(table, group)?;
    let hues = column_labels(table, hue)?;
    let values = column_values(table, value)?;

    for ((g, h), y) in groups.into_iter().zip(hues).zip(values) {
        let x = match spec.categories.iter().position(|c| *c == g) {
            Some(idx) => idx,
            None => {
                spec.categories.push(g);
                spec.categories.len() - 1
            }
        };
        match spec.series.iter_mut().find(|s| s.name == h) {
            Some(series) => series.points.push((x as f64, y)),
            None => spec.series.push(ChartSeries {
                name: h,
                points: vec![(x as f64, y)],
            }),
        }
    }
    Ok(())
}

/// Histogram bars labelled `start-end` from a `review_score_distribution` table.
pub fn histogram_chart(
    table: &DataFrame,
    title: impl Into<String>,
    x_label: &str,
    y_label: &str,
) -> DashboardResult<ChartSpec> {
    require_columns(table, &[BIN_START, BIN_END, FREQUENCY])?;
    let starts = column_values(table, BIN_START)?;
    let ends = column_values(table, BIN_END)?;
    let mut spec = ChartSpec::new(title, ChartKind::Histogram, x_label, y_label);
    spec.categories = starts
        .iter()
        .zip(&ends)
        .map(|(s, e)| format!("{}-{}", format_axis_label(*s), format_axis_label(*e)))
        .collect();
    spec.series.push(ChartSeries {
        name: FREQUENCY.to_string(),
        points: column_values(table, FREQUENCY)?
            .into_iter()
            .enumerate()
            .map(|(i, y)| (i as f64, y))
            .collect(),
    });
    Ok(spec)
}

/// Line over months: x is the month number and the axis always spans January to December.
pub fn monthly_line_chart(
    table: &DataFrame,
    value: &str,
    series_name: &str,
    title: impl Into<String>,
    y_label: &str,
) -> DashboardResult<ChartSpec> {
    require_columns(table, &[PURCHASE_MONTH, value])?;
    let months = column_values(table, PURCHASE_MONTH)?;
    let values = column_values(table, value)?;
    let mut spec = ChartSpec::new(title, ChartKind::Line, "Month", y_label);
    spec.x_bounds = Some([1.0, 12.0]);
    spec.series.push(ChartSeries {
        name: series_name.to_string(),
        points: months.into_iter().zip(values).collect(),
    });
    Ok(spec)
}
