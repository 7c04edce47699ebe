mod common;

use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{buffer::Buffer, layout::Rect, widgets::Widget};
use salesdash::widgets::sidebar::SidebarFocus;
use salesdash::{App, AppEvent, Tab};
use std::sync::mpsc::{channel, Receiver};

fn key(code: KeyCode) -> AppEvent {
    AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

/// Feed `event` and every follow-up event the app returns.
fn dispatch(app: &mut App, event: AppEvent) {
    let mut next = Some(event);
    while let Some(event) = next {
        next = app.event(&event);
    }
}

fn loaded_app(dir: &tempfile::TempDir) -> (App, Receiver<AppEvent>) {
    let path = common::write_sales_csv(dir.path());
    let (tx, rx) = channel();
    let mut app = App::new(tx);
    dispatch(&mut app, AppEvent::Open(path));
    (app, rx)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn open_loads_and_renders() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _rx) = loaded_app(&dir);
    let view = app.view().unwrap();
    assert_eq!(view.row_count, 7);
    let range = app.filters().date_range.unwrap();
    assert_eq!(range.start, date(2017, 1, 5));
    assert_eq!(range.end, date(2017, 3, 1));
}

#[test]
fn quit_keys_exit() {
    let (tx, _rx) = channel();
    let mut app = App::new(tx);
    assert!(matches!(
        app.event(&key(KeyCode::Char('q'))),
        Some(AppEvent::Exit)
    ));
    assert!(matches!(app.event(&key(KeyCode::Esc)), Some(AppEvent::Exit)));
}

#[test]
fn key_release_is_ignored() {
    let (tx, _rx) = channel();
    let mut app = App::new(tx);
    let mut release = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
    release.kind = KeyEventKind::Release;
    assert!(app.event(&AppEvent::Key(release)).is_none());
}

#[test]
fn start_date_moves_and_stays_in_bounds() {
    let dir = tempfile::tempdir().unwrap();
    let (mut app, _rx) = loaded_app(&dir);
    assert_eq!(app.focus(), SidebarFocus::StartDate);

    dispatch(&mut app, key(KeyCode::Right));
    assert_eq!(app.filters().date_range.unwrap().start, date(2017, 1, 6));

    dispatch(&mut app, key(KeyCode::Left));
    dispatch(&mut app, key(KeyCode::Left));
    assert_eq!(app.filters().date_range.unwrap().start, date(2017, 1, 5));

    dispatch(&mut app, key(KeyCode::PageUp));
    let range = app.filters().date_range.unwrap();
    assert_eq!(range.start, date(2017, 2, 4));
    assert_eq!(app.view().unwrap().row_count, 3);
}

#[test]
fn selectors_cycle_through_options() {
    let dir = tempfile::tempdir().unwrap();
    let (mut app, _rx) = loaded_app(&dir);

    dispatch(&mut app, key(KeyCode::Tab));
    dispatch(&mut app, key(KeyCode::Tab));
    assert_eq!(app.focus(), SidebarFocus::State);
    assert_eq!(app.filters().state.as_deref(), Some("SP"));

    dispatch(&mut app, key(KeyCode::Right));
    assert_eq!(app.filters().state.as_deref(), Some("RJ"));
    dispatch(&mut app, key(KeyCode::Right));
    assert_eq!(app.filters().state.as_deref(), Some("SP"));

    dispatch(&mut app, key(KeyCode::BackTab));
    dispatch(&mut app, key(KeyCode::BackTab));
    dispatch(&mut app, key(KeyCode::BackTab));
    assert_eq!(app.focus(), SidebarFocus::Product);
    dispatch(&mut app, key(KeyCode::Left));
    assert_eq!(app.filters().product.as_deref(), Some("p3"));
}

#[test]
fn reset_restores_full_range() {
    let dir = tempfile::tempdir().unwrap();
    let (mut app, _rx) = loaded_app(&dir);
    dispatch(&mut app, key(KeyCode::PageUp));
    assert_eq!(app.view().unwrap().row_count, 3);

    dispatch(&mut app, key(KeyCode::Char('r')));
    assert_eq!(app.view().unwrap().row_count, 7);
    assert_eq!(app.filters().date_range.unwrap().start, date(2017, 1, 5));
}

#[test]
fn number_keys_switch_tabs_and_help_toggles() {
    let dir = tempfile::tempdir().unwrap();
    let (mut app, _rx) = loaded_app(&dir);
    dispatch(&mut app, key(KeyCode::Char('3')));
    assert_eq!(app.tab(), Tab::TopProductTrends);
    dispatch(&mut app, key(KeyCode::Char('2')));
    assert_eq!(app.tab(), Tab::SalesOverview);

    dispatch(&mut app, key(KeyCode::Char('?')));
    assert!(app.show_help());
    // q closes help instead of quitting
    assert!(app.event(&key(KeyCode::Char('q'))).is_none());
    assert!(!app.show_help());
}

#[test]
fn export_without_directory_sets_status() {
    let dir = tempfile::tempdir().unwrap();
    let (mut app, _rx) = loaded_app(&dir);
    dispatch(&mut app, key(KeyCode::Char('e')));
    let status = app.status().unwrap();
    assert!(status.message.contains("--export-dir"));
}

#[test]
fn renders_dashboard_without_panicking() {
    let dir = tempfile::tempdir().unwrap();
    let (mut app, _rx) = loaded_app(&dir);
    let area = Rect::new(0, 0, 140, 45);
    let mut buf = Buffer::empty(area);
    (&mut app).render(area, &mut buf);
    let text: String = buf.content().iter().map(|c| c.symbol()).collect();
    assert!(text.contains("E-Commerce Product Analysis"));
    assert!(text.contains("Filters"));
    assert!(text.contains("Best sales per state and month"));
    assert!(text.contains("Rows: 7"));
}
