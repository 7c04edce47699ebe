//! Plain-text rendering of a [`DashboardView`] for `--report`.

use std::io::Write;

use color_eyre::Result;
use polars::prelude::DataFrame;

use crate::chart_data::format_axis_label;
use crate::error::{Notice, NoticeLevel};
use crate::pipeline::{DashboardView, Panel, Section};

/// Write the view's notices, controls and every section's summary table.
pub fn write_report<W: Write>(view: &DashboardView, out: &mut W) -> Result<()> {
    writeln!(out, "E-Commerce Product Analysis")?;
    writeln!(out)?;

    for notice in &view.notices {
        write_notice(notice, out)?;
    }

    let controls = &view.controls;
    match controls.date_range {
        Some(range) => writeln!(out, "Date range: {} to {}", range.start, range.end)?,
        None => writeln!(out, "Date range: (none)")?,
    }
    writeln!(out, "Rows: {}", view.row_count)?;
    if view.sections.is_empty() && view.tabs.is_empty() {
        return Ok(());
    }
    writeln!(
        out,
        "Selected state: {}  Overview state: {}  Product: {}",
        controls.state.as_deref().unwrap_or("-"),
        controls.overview_state.as_deref().unwrap_or("-"),
        controls.product.as_deref().unwrap_or("-"),
    )?;

    for section in &view.sections {
        write_section(section, out)?;
    }
    for tab in &view.tabs {
        writeln!(out)?;
        writeln!(out, "=== {} ===", tab.tab.title())?;
        for section in &tab.sections {
            write_section(section, out)?;
        }
    }
    Ok(())
}

fn write_notice<W: Write>(notice: &Notice, out: &mut W) -> Result<()> {
    let label = match notice.level {
        NoticeLevel::Warning => "warning",
        NoticeLevel::Error => "error",
    };
    writeln!(out, "[{}] {}", label, notice.message)?;
    Ok(())
}

fn write_section<W: Write>(section: &Section, out: &mut W) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "### {}", section.title)?;
    match &section.panel {
        Panel::Notice(notice) => write_notice(notice, out),
        Panel::Chart { table, .. } if table.height() == 0 => {
            writeln!(out, "(no data)")?;
            Ok(())
        }
        Panel::Chart { table, .. } => write_table(table, out),
    }
}

/// Fixed-width table: columns padded to their widest cell, numbers right-aligned.
fn write_table<W: Write>(table: &DataFrame, out: &mut W) -> Result<()> {
    let columns = table.get_columns();
    let mut cells: Vec<Vec<String>> = Vec::with_capacity(columns.len());
    let mut numeric = Vec::with_capacity(columns.len());
    for column in columns {
        numeric.push(column.dtype().is_primitive_numeric());
        let mut values = vec![column.name().to_string()];
        for i in 0..table.height() {
            let value = column.get(i)?;
            values.push(match value.extract::<f64>() {
                Some(v) if column.dtype().is_float() => format_axis_label(v),
                _ => value.str_value().to_string(),
            });
        }
        cells.push(values);
    }

    let widths: Vec<usize> = cells
        .iter()
        .map(|col| col.iter().map(|c| c.chars().count()).max().unwrap_or(0))
        .collect();

    for row in 0..=table.height() {
        let line: Vec<String> = cells
            .iter()
            .zip(&widths)
            .zip(&numeric)
            .map(|((col, width), is_numeric)| {
                if *is_numeric && row > 0 {
                    format!("{:>width$}", col[row], width = width)
                } else {
                    format!("{:<width$}", col[row], width = width)
                }
            })
            .collect();
        writeln!(out, "{}", line.join("  ").trim_end())?;
        if row == 0 {
            let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
            writeln!(out, "{}", rule.join("  "))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::*;
    use crate::pipeline::{Dashboard, DashboardSettings, Filters};
    use crate::prepare::prepare;
    use polars::df;

    fn render_to_string(view: &DashboardView) -> String {
        let mut buf = Vec::new();
        write_report(view, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn report_lists_every_section() {
        let df = df!(
            ORDER_ITEM_ID => &[1i64, 1, 1],
            PRODUCT_ID => &["A", "A", "B"],
            PRODUCT_CATEGORY => &["toys", "toys", "garden"],
            SELLER_STATE => &["SP", "SP", "RJ"],
            PURCHASE_TIMESTAMP => &[
                "2018-01-10 10:00:00",
                "2018-02-10 10:00:00",
                "2018-01-20 10:00:00",
            ],
            REVIEW_SCORE => &[5i64, 3, 1]
        )
        .unwrap();
        let dash = Dashboard::new(prepare(df).unwrap(), DashboardSettings::default());
        let text = render_to_string(&dash.render(&Filters::default()));
        assert!(text.contains("Date range: 2018-01-10 to 2018-02-10"));
        assert!(text.contains("Rows: 3"));
        assert!(text.contains("### Best sales per state and month"));
        assert!(text.contains("### Review score distribution"));
        assert!(text.contains("=== Monthly sales ==="));
        assert!(text.contains("=== Sales overview ==="));
        assert!(text.contains("=== Top product trends ==="));
        assert!(text.contains("### Monthly sales in SP"));
        assert!(text.contains("seller_state  total_sales"));
    }

    #[test]
    fn report_shows_notices_without_sections() {
        let dir = tempfile::tempdir().unwrap();
        let dash = Dashboard::load(
            &dir.path().join("missing.csv"),
            &crate::loader::LoadOptions::default(),
            DashboardSettings::default(),
        );
        let text = render_to_string(&dash.render(&Filters::default()));
        assert!(text.contains("[error] File not found"));
        assert!(!text.contains("###"));
    }

    #[test]
    fn table_is_aligned() {
        let table = df!(
            SELLER_STATE => &["SP", "RJ"],
            TOTAL_SALES => &[12i64, 3]
        )
        .unwrap();
        let mut buf = Vec::new();
        write_table(&table, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "seller_state  total_sales");
        assert_eq!(lines[1], "------------  -----------");
        assert_eq!(lines[2], "SP                     12");
        assert_eq!(lines[3], "RJ                      3");
    }
}
