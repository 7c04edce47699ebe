use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::{buffer::Buffer, layout::Rect, widgets::Widget};

use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph, Tabs, Wrap};

pub mod aggregate;
pub mod chart_data;
pub mod chart_export;
pub mod columns;
pub mod config;
pub mod error;
pub mod error_display;
pub mod filter;
pub mod loader;
pub mod pipeline;
pub mod prepare;
pub mod report;
pub mod widgets;

pub use config::{
    rgb_to_256_color, rgb_to_basic_ansi, AppConfig, ColorParser, ConfigManager, Theme,
};
pub use error::{DashboardError, DashboardResult, Notice, NoticeLevel};
pub use filter::DateRange;
pub use loader::LoadOptions;
pub use pipeline::{Dashboard, DashboardSettings, DashboardView, Filters, Tab};
pub use salesdash_cli::Args;

use filter::shift_date;
use widgets::chart::ChartPanel;
use widgets::controls::Controls;
use widgets::debug::DebugState;
use widgets::sidebar::{Sidebar, SidebarFocus};

/// Application name used for the config directory and other app-specific paths
pub const APP_NAME: &str = "salesdash";

/// Days a date moves per PageUp/PageDown
const PAGE_DAYS: i64 = 30;

const TITLE: &str = "E-Commerce Product Analysis";
const DESCRIPTION: &str =
    "Monthly sales of the top products by total sales, best-selling states and review scores.";

#[derive(Clone, Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Open(PathBuf),
    DoLoad(PathBuf), // Internal event to actually perform loading after UI update
    Refresh,
    Export,
    Exit,
    Crash(String),
    Resize(u16, u16), // resized (width, height)
}

#[derive(Clone, Debug, Default)]
pub enum LoadingState {
    #[default]
    Idle,
    Loading {
        file_path: PathBuf,
        current_phase: String,
        progress_percent: u16, // 0-100
    },
}

impl LoadingState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadingState::Loading { .. })
    }
}

pub struct App {
    events: Sender<AppEvent>,
    path: Option<PathBuf>,
    dashboard: Option<Dashboard>,
    view: Option<DashboardView>,
    filters: Filters,
    /// Arguments whose filters apply to the first render after a load
    launch_args: Option<Args>,
    focus: SidebarFocus,
    tab: Tab,
    show_help: bool,
    /// Outcome of the last export
    status: Option<Notice>,
    debug: DebugState,
    loading_state: LoadingState,
    theme: Theme,
    config: AppConfig,
    load_options: LoadOptions,
    settings: DashboardSettings,
    export_dir: Option<PathBuf>,
}

impl App {
    pub fn send_event(&mut self, event: AppEvent) -> Result<()> {
        self.events.send(event)?;
        Ok(())
    }

    fn render_loading_gauge(loading_state: &LoadingState, area: Rect, buf: &mut Buffer) {
        if let LoadingState::Loading {
            file_path,
            current_phase,
            progress_percent,
        } = loading_state
        {
            let gauge_width = (area.width as f64 * 0.33) as u16;

            let center_layout = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Fill(1),
                    Constraint::Length(3),
                    Constraint::Fill(1),
                ])
                .split(area);

            let gauge_area = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Fill(1),
                    Constraint::Length(gauge_width),
                    Constraint::Fill(1),
                ])
                .split(center_layout[1])[1];

            let title = format!("Loading {}", file_path.display());
            Gauge::default()
                .block(Block::default().borders(Borders::ALL).title(title))
                .percent(*progress_percent)
                .label(current_phase.clone())
                .render(gauge_area, buf);
        }
    }

    pub fn new(events: Sender<AppEvent>) -> App {
        let theme = Theme::from_config(&AppConfig::default().theme).unwrap_or_default();
        Self::new_with_config(events, theme, AppConfig::default())
    }

    pub fn new_with_config(events: Sender<AppEvent>, theme: Theme, app_config: AppConfig) -> App {
        let settings = DashboardSettings {
            top_n: app_config.dashboard.top_n,
            histogram_bins: app_config.dashboard.histogram_bins,
        };
        let mut app = App {
            events,
            path: None,
            dashboard: None,
            view: None,
            filters: Filters::default(),
            launch_args: None,
            focus: SidebarFocus::default(),
            tab: Tab::MonthlySales,
            show_help: false,
            status: None,
            debug: DebugState::default(),
            loading_state: LoadingState::Idle,
            theme,
            load_options: LoadOptions::default(),
            settings,
            export_dir: app_config.export.dir.clone(),
            config: app_config,
        };
        if app.config.debug.enabled {
            app.enable_debug();
        }
        app
    }

    /// Take load options, dashboard settings, export directory and initial filters from `args`.
    pub fn with_args(mut self, args: &Args) -> Self {
        self.load_options = LoadOptions::from_args_and_config(args, &self.config);
        self.settings = DashboardSettings::from_args_and_config(args, &self.config);
        if args.export_dir.is_some() {
            self.export_dir = args.export_dir.clone();
        }
        if args.debug {
            self.enable_debug();
        }
        self.launch_args = Some(args.clone());
        self
    }

    pub fn enable_debug(&mut self) {
        self.debug.enabled = true;
    }

    fn color(&self, name: &str) -> Color {
        self.theme.get(name)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn view(&self) -> Option<&DashboardView> {
        self.view.as_ref()
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    pub fn focus(&self) -> SidebarFocus {
        self.focus
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn status(&self) -> Option<&Notice> {
        self.status.as_ref()
    }

    fn load(&mut self, path: &Path) {
        let dashboard = Dashboard::load(path, &self.load_options, self.settings);
        self.filters = match &self.launch_args {
            Some(args) => Filters::from_args(args, dashboard.bounds()),
            None => Filters::default(),
        };
        self.path = Some(path.to_path_buf());
        self.dashboard = Some(dashboard);
    }

    fn refresh(&mut self) {
        if let Some(dashboard) = &self.dashboard {
            let view = dashboard.render(&self.filters);
            self.filters = view.controls.to_filters();
            self.debug.last_render = Some(view.elapsed);
            self.view = Some(view);
        }
    }

    fn export(&mut self) {
        let Some(view) = &self.view else {
            return;
        };
        self.status = Some(match &self.export_dir {
            Some(dir) => match chart_export::export_view(
                view,
                dir,
                self.config.export.width,
                self.config.export.height,
            ) {
                Ok(paths) => Notice::warning(format!(
                    "Exported {} chart(s) to {}",
                    paths.len(),
                    dir.display()
                )),
                Err(e) => Notice::error(error_display::user_message_from_report(&e, Some(dir.as_path()))),
            },
            None => Notice::warning("No export directory set. Start with --export-dir DIR."),
        });
    }

    /// Move the focused date by `days`, keeping it inside the data bounds.
    fn shift_focused_date(&mut self, days: i64) -> bool {
        let Some(view) = &self.view else {
            return false;
        };
        let (Some(bounds), Some(range)) = (view.controls.bounds, view.controls.date_range) else {
            return false;
        };
        let mut range = range;
        match self.focus {
            SidebarFocus::StartDate => range.start = shift_date(range.start, days),
            SidebarFocus::EndDate => range.end = shift_date(range.end, days),
            _ => return false,
        }
        self.filters.date_range = Some(range.clamp_to(&bounds));
        true
    }

    /// Step the focused selector through its options, wrapping around.
    fn cycle_selection(&mut self, step: isize) -> bool {
        let Some(view) = &self.view else {
            return false;
        };
        let controls = &view.controls;
        let (options, current) = match self.focus {
            SidebarFocus::State => (&controls.states, &controls.state),
            SidebarFocus::OverviewState => (&controls.states, &controls.overview_state),
            SidebarFocus::Product => (&controls.products, &controls.product),
            _ => return false,
        };
        if options.is_empty() {
            return false;
        }
        let len = options.len() as isize;
        let idx = current
            .as_ref()
            .and_then(|c| options.iter().position(|o| o == c))
            .unwrap_or(0) as isize;
        let next = Some(options[(idx + step).rem_euclid(len) as usize].clone());
        match self.focus {
            SidebarFocus::State => self.filters.state = next,
            SidebarFocus::OverviewState => self.filters.overview_state = next,
            _ => self.filters.product = next,
        }
        true
    }

    fn adjust(&mut self, step: isize, page: bool) -> Option<AppEvent> {
        let changed = if self.focus.is_date() {
            let days = (if page { PAGE_DAYS } else { 1 }) * step as i64;
            self.shift_focused_date(days)
        } else if page {
            false
        } else {
            self.cycle_selection(step)
        };
        changed.then_some(AppEvent::Refresh)
    }

    fn key(&mut self, event: &KeyEvent) -> Option<AppEvent> {
        self.debug.on_key(event);
        if event.kind == KeyEventKind::Release {
            return None;
        }

        if self.show_help {
            if matches!(event.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                self.show_help = false;
                self.debug.last_action = "close_help".to_string();
            }
            return None;
        }

        let action = match event.code {
            KeyCode::Char('q') | KeyCode::Esc => return Some(AppEvent::Exit),
            KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => {
                return Some(AppEvent::Exit)
            }
            KeyCode::Char('?') => {
                self.show_help = true;
                ("open_help", None)
            }
            KeyCode::Tab | KeyCode::Down => {
                self.focus = self.focus.next();
                ("focus_next", None)
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.focus = self.focus.prev();
                ("focus_prev", None)
            }
            KeyCode::Left => ("decrease", self.adjust(-1, false)),
            KeyCode::Right => ("increase", self.adjust(1, false)),
            KeyCode::PageDown => ("page_back", self.adjust(-1, true)),
            KeyCode::PageUp => ("page_forward", self.adjust(1, true)),
            KeyCode::Char(c @ '1'..='3') => {
                let idx = c as usize - '1' as usize;
                self.tab = Tab::ALL[idx];
                ("select_tab", None)
            }
            KeyCode::Char('r') => {
                self.filters = Filters::default();
                self.status = None;
                ("reset_filters", Some(AppEvent::Refresh))
            }
            KeyCode::Char('e') => ("export", Some(AppEvent::Export)),
            _ => ("none", None),
        };
        self.debug.last_action = action.0.to_string();
        action.1
    }

    pub fn event(&mut self, event: &AppEvent) -> Option<AppEvent> {
        self.debug.num_events += 1;
        match event {
            AppEvent::Key(key) => self.key(key),
            AppEvent::Open(path) => {
                // Show the loading state first, then load on the next event
                self.loading_state = LoadingState::Loading {
                    file_path: path.clone(),
                    current_phase: "Reading file".to_string(),
                    progress_percent: 10,
                };
                Some(AppEvent::DoLoad(path.clone()))
            }
            AppEvent::DoLoad(path) => {
                self.load(path);
                self.loading_state = LoadingState::Idle;
                Some(AppEvent::Refresh)
            }
            AppEvent::Refresh => {
                self.refresh();
                None
            }
            AppEvent::Export => {
                self.export();
                None
            }
            AppEvent::Resize(_, _) => None,
            AppEvent::Exit | AppEvent::Crash(_) => None,
        }
    }

    fn render_header(&self, area: Rect, buf: &mut Buffer) {
        let mut title = vec![Span::styled(
            TITLE,
            Style::default()
                .fg(self.color("primary"))
                .add_modifier(Modifier::BOLD),
        )];
        if let Some(path) = &self.path {
            title.push(Span::styled(
                format!("  {}", path.display()),
                Style::default().fg(self.color("dimmed")),
            ));
        }
        let mut lines = vec![Line::from(title)];
        if self.config.display.show_description {
            lines.push(Line::from(Span::styled(
                DESCRIPTION,
                Style::default().fg(self.color("text_secondary")),
            )));
        }
        Paragraph::new(lines).render(area, buf);
    }

    fn notice_lines(&self) -> Vec<Line<'static>> {
        let notices = self
            .view
            .iter()
            .flat_map(|v| v.notices.iter())
            .chain(self.status.iter());
        notices
            .map(|n| {
                let (label, color) = match n.level {
                    NoticeLevel::Warning => ("warning", self.color("warning")),
                    NoticeLevel::Error => ("error", self.color("error")),
                };
                Line::from(vec![
                    Span::styled(format!("{}: ", label), Style::default().fg(color)),
                    Span::raw(n.message.clone()),
                ])
            })
            .collect()
    }

    fn render_dashboard(&self, view: &DashboardView, area: Rect, buf: &mut Buffer) {
        if view.sections.is_empty() && view.tabs.is_empty() {
            Paragraph::new("Nothing to chart. See the messages above.")
                .style(Style::default().fg(self.color("text_secondary")))
                .centered()
                .render(area, buf);
            return;
        }

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage(45),
                Constraint::Length(1),
                Constraint::Fill(1),
            ])
            .split(area);

        render_sections(&view.sections, rows[0], buf, &self.theme);

        let titles: Vec<Line> = Tab::ALL
            .iter()
            .enumerate()
            .map(|(i, t)| Line::from(format!("{} {}", i + 1, t.title())))
            .collect();
        Tabs::new(titles)
            .select(self.tab.index())
            .style(Style::default().fg(self.color("text_secondary")))
            .highlight_style(
                Style::default()
                    .fg(self.color("border_active"))
                    .add_modifier(Modifier::BOLD),
            )
            .render(rows[1], buf);

        if let Some(tab) = view.tab(self.tab) {
            render_sections(&tab.sections, rows[2], buf, &self.theme);
        }
    }

    fn render_help(&self, area: Rect, buf: &mut Buffer) {
        const HELP: [(&str, &str); 9] = [
            ("Tab / ↓", "Focus next filter"),
            ("Shift+Tab / ↑", "Focus previous filter"),
            ("← →", "Change date by a day, or pick previous/next option"),
            ("PgUp PgDn", "Move the focused date by 30 days"),
            ("1 2 3", "Monthly sales / Sales overview / Top product trends"),
            ("r", "Reset filters to the full date range"),
            ("e", "Export charts as PNG (needs --export-dir)"),
            ("?", "Toggle this help"),
            ("q / Esc", "Quit"),
        ];
        let width = area.width.min(72);
        let height = (HELP.len() as u16 + 2).min(area.height);
        let popup = Rect::new(
            area.x + (area.width - width) / 2,
            area.y + (area.height - height) / 2,
            width,
            height,
        );
        Clear.render(popup, buf);
        let lines: Vec<Line> = HELP
            .iter()
            .map(|(k, d)| {
                Line::from(vec![
                    Span::styled(
                        format!("{:<16}", k),
                        Style::default().fg(self.color("border_active")),
                    ),
                    Span::raw(*d),
                ])
            })
            .collect();
        Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.color("border")))
                    .title(" Help "),
            )
            .wrap(Wrap { trim: true })
            .render(popup, buf);
    }
}

fn render_sections(sections: &[pipeline::Section], area: Rect, buf: &mut Buffer, theme: &Theme) {
    if sections.is_empty() {
        return;
    }
    let constraints = vec![Constraint::Ratio(1, sections.len() as u32); sections.len()];
    let cells = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);
    for (section, cell) in sections.iter().zip(cells.iter()) {
        ChartPanel::new(section, theme).render(*cell, buf);
    }
}

impl Widget for &mut App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        self.debug.num_frames += 1;

        let notice_lines = self.notice_lines();
        let header_height = if self.config.display.show_description { 2 } else { 1 };
        let mut constraints = vec![
            Constraint::Length(header_height),
            Constraint::Length(notice_lines.len() as u16),
            Constraint::Fill(1),
            Constraint::Length(1), // Controls
        ];
        if self.debug.enabled {
            constraints.push(Constraint::Length(1));
        }
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        self.render_header(layout[0], buf);
        Paragraph::new(notice_lines)
            .wrap(Wrap { trim: true })
            .render(layout[1], buf);

        match &self.view {
            Some(view) => {
                let main = Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([
                        Constraint::Length(self.config.display.sidebar_width),
                        Constraint::Fill(1),
                    ])
                    .split(layout[2]);
                Sidebar::new(&view.controls, self.focus, &self.theme).render(main[0], buf);
                self.render_dashboard(view, main[1], buf);
            }
            None => {
                if self.loading_state.is_loading() {
                    App::render_loading_gauge(&self.loading_state, layout[2], buf);
                } else {
                    Paragraph::new("No data loaded").render(layout[2], buf);
                }
            }
        }

        let row_count = self.view.as_ref().map(|v| v.row_count);
        let controls = match row_count {
            Some(count) => Controls::with_row_count(count),
            None => Controls::new(),
        };
        controls
            .with_dimmed(self.show_help)
            .with_bg(self.color("controls_bg"))
            .render(layout[3], buf);

        if self.debug.enabled {
            (&self.debug).render(layout[4], buf);
        }

        if self.show_help {
            self.render_help(area, buf);
        }
    }
}
