mod common;

use chrono::NaiveDate;
use salesdash::pipeline::Tab;
use salesdash::{report, Dashboard, DashboardSettings, DateRange, Filters, LoadOptions};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn load(dir: &tempfile::TempDir) -> Dashboard {
    let path = common::write_sales_csv(dir.path());
    Dashboard::load(&path, &LoadOptions::default(), DashboardSettings::default())
}

#[test]
fn csv_loads_with_bounds_and_rows() {
    let dir = tempfile::tempdir().unwrap();
    let dash = load(&dir);
    assert!(dash.has_timestamps());
    assert_eq!(dash.row_count(), 7);
    assert_eq!(
        dash.bounds(),
        Some(DateRange::new(date(2017, 1, 5), date(2017, 3, 1)))
    );
}

#[test]
fn default_filters_cover_everything() {
    let dir = tempfile::tempdir().unwrap();
    let view = load(&dir).render(&Filters::default());

    assert_eq!(view.row_count, 7);
    assert!(view.notices.is_empty());
    assert_eq!(view.controls.products, vec!["p1", "p2", "p3"]);
    assert_eq!(view.controls.states, vec!["SP", "RJ"]);
    assert_eq!(view.controls.state.as_deref(), Some("SP"));
    assert_eq!(view.controls.product.as_deref(), Some("p1"));
    assert_eq!(view.sections.len(), 2);
    assert_eq!(view.tabs.len(), 3);
}

#[test]
fn state_totals_are_ranked() {
    let dir = tempfile::tempdir().unwrap();
    let view = load(&dir).render(&Filters::default());
    let overview = view.tab(Tab::SalesOverview).unwrap();
    let table = overview.sections[0].table().unwrap();

    let states = table.column("seller_state").unwrap();
    let totals = table.column("total_sales").unwrap();
    assert_eq!(states.get(0).unwrap().str_value(), "SP");
    assert_eq!(totals.get(0).unwrap().extract::<i64>(), Some(4));
    assert_eq!(states.get(1).unwrap().str_value(), "RJ");
    assert_eq!(totals.get(1).unwrap().extract::<i64>(), Some(3));
}

#[test]
fn date_range_narrows_every_section() {
    let dir = tempfile::tempdir().unwrap();
    let filters = Filters {
        date_range: Some(DateRange::new(date(2017, 1, 1), date(2017, 1, 31))),
        ..Filters::default()
    };
    let view = load(&dir).render(&filters);

    assert_eq!(view.row_count, 3);
    assert_eq!(view.controls.states, vec!["SP"]);
    assert_eq!(view.controls.products, vec!["p1", "p2"]);

    let review = view
        .all_sections()
        .find(|s| s.id == "review_distribution")
        .unwrap();
    let freq: i64 = review
        .table()
        .unwrap()
        .column("frequency")
        .unwrap()
        .i64()
        .unwrap()
        .into_iter()
        .flatten()
        .sum();
    assert_eq!(freq, 3);
}

#[test]
fn selection_outside_range_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let filters = Filters {
        date_range: Some(DateRange::new(date(2017, 1, 1), date(2017, 1, 31))),
        state: Some("RJ".to_string()),
        product: Some("p3".to_string()),
        ..Filters::default()
    };
    let view = load(&dir).render(&filters);
    assert_eq!(view.controls.state.as_deref(), Some("SP"));
    assert_eq!(view.controls.product.as_deref(), Some("p1"));
}

#[test]
fn missing_timestamp_column_reports_and_skips_charts() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::write_csv_without_timestamps(dir.path());
    let dash = Dashboard::load(&path, &LoadOptions::default(), DashboardSettings::default());
    let view = dash.render(&Filters::default());

    assert!(view.sections.is_empty());
    assert!(view.tabs.is_empty());
    assert!(view
        .notices
        .iter()
        .any(|n| n.is_error() && n.message.contains("order_purchase_timestamp")));
}

#[test]
fn missing_file_renders_error_notice() {
    let dir = tempfile::tempdir().unwrap();
    let dash = Dashboard::load(
        &dir.path().join("absent.csv"),
        &LoadOptions::default(),
        DashboardSettings::default(),
    );
    let view = dash.render(&Filters::default());
    assert_eq!(view.row_count, 0);
    assert!(view.notices.iter().any(|n| n.is_error()));
}

#[test]
fn report_contains_every_tab() {
    let dir = tempfile::tempdir().unwrap();
    let view = load(&dir).render(&Filters::default());
    let mut out = Vec::new();
    report::write_report(&view, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert!(text.contains("E-Commerce Product Analysis"));
    for tab in Tab::ALL {
        assert!(text.contains(tab.title()), "missing tab {}", tab.title());
    }
    assert!(text.contains("Rows: 7"));
}
