//! One dashboard run: filter, aggregate and chart, with every failure turned
//! into an inline notice.
//!
//! [`Dashboard`] owns the immutable prepared dataset. Each call to
//! [`Dashboard::render`] recomputes the filtered view and all summary tables
//! from scratch and returns a [`DashboardView`] for the presentation adapters.

use std::path::Path;
use std::time::{Duration, Instant};

use polars::prelude::DataFrame;
use tracing::{debug, error};

use crate::aggregate::{
    best_selling_state, distinct_in_order, monthly_sales_for_state, monthly_sales_top_products,
    review_score_distribution, sales_trend_for_product, top_product_ids, total_sales_per_state,
};
use crate::chart_data::{
    bar_chart, histogram_chart, monthly_grouped_bar_chart, monthly_line_chart, ChartSpec,
};
use crate::columns::*;
use crate::config::AppConfig;
use crate::error::{DashboardResult, Notice};
use crate::filter::{date_bounds, filter_by_date_range, DateRange};
use crate::loader::{load_csv, LoadOptions};
use crate::prepare::{prepare, Prepared};

/// User selections driving one render. Unset values fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    pub date_range: Option<DateRange>,
    pub state: Option<String>,
    pub overview_state: Option<String>,
    pub product: Option<String>,
}

impl Filters {
    /// Filters given on the command line. A single date bound is completed from `bounds`.
    pub fn from_args(args: &salesdash_cli::Args, bounds: Option<DateRange>) -> Self {
        let date_range = match (args.start_date, args.end_date, bounds) {
            (Some(start), Some(end), _) => Some(DateRange::new(start, end)),
            (Some(start), None, Some(b)) => Some(DateRange::new(start, b.end)),
            (None, Some(end), Some(b)) => Some(DateRange::new(b.start, end)),
            _ => None,
        };
        Self {
            date_range,
            state: args.state.clone(),
            overview_state: args.overview_state.clone(),
            product: args.product.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardSettings {
    pub top_n: usize,
    pub histogram_bins: usize,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            top_n: crate::aggregate::DEFAULT_TOP_N,
            histogram_bins: crate::aggregate::DEFAULT_HISTOGRAM_BINS,
        }
    }
}

impl DashboardSettings {
    /// CLI flags take precedence over the `[dashboard]` config section
    pub fn from_args_and_config(args: &salesdash_cli::Args, config: &AppConfig) -> Self {
        Self {
            top_n: args.top_n.unwrap_or(config.dashboard.top_n).max(1),
            histogram_bins: args.bins.unwrap_or(config.dashboard.histogram_bins).max(1),
        }
    }
}

/// Resolved selector state of one render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Controls {
    /// Earliest and latest purchase date of the full dataset
    pub bounds: Option<DateRange>,
    pub date_range: Option<DateRange>,
    /// Seller states of the filtered data in first-appearance order
    pub states: Vec<String>,
    /// Top-N product ids of the filtered data in rank order
    pub products: Vec<String>,
    pub state: Option<String>,
    pub overview_state: Option<String>,
    pub product: Option<String>,
}

impl Controls {
    /// Filters that reproduce this render's selections
    pub fn to_filters(&self) -> Filters {
        Filters {
            date_range: self.date_range,
            state: self.state.clone(),
            overview_state: self.overview_state.clone(),
            product: self.product.clone(),
        }
    }
}

/// Content of a section: a chart with its table, or the notice that replaced it.
#[derive(Debug, Clone)]
pub enum Panel {
    Chart { table: DataFrame, chart: ChartSpec },
    Notice(Notice),
}

#[derive(Debug, Clone)]
pub struct Section {
    /// Stable identifier, used as the export file name
    pub id: &'static str,
    pub title: String,
    pub panel: Panel,
}

impl Section {
    fn build(
        id: &'static str,
        title: String,
        result: DashboardResult<(DataFrame, ChartSpec)>,
    ) -> Self {
        let panel = match result {
            Ok((table, chart)) => Panel::Chart { table, chart },
            Err(err) => {
                debug!(section = id, error = %err, "section replaced by notice");
                Panel::Notice(Notice::from(&err))
            }
        };
        Self { id, title, panel }
    }

    pub fn chart(&self) -> Option<&ChartSpec> {
        match &self.panel {
            Panel::Chart { chart, .. } => Some(chart),
            Panel::Notice(_) => None,
        }
    }

    pub fn table(&self) -> Option<&DataFrame> {
        match &self.panel {
            Panel::Chart { table, .. } => Some(table),
            Panel::Notice(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    MonthlySales,
    SalesOverview,
    TopProductTrends,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::MonthlySales, Tab::SalesOverview, Tab::TopProductTrends];

    pub fn title(self) -> &'static str {
        match self {
            Tab::MonthlySales => "Monthly sales",
            Tab::SalesOverview => "Sales overview",
            Tab::TopProductTrends => "Top product trends",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Tab::MonthlySales => 0,
            Tab::SalesOverview => 1,
            Tab::TopProductTrends => 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TabView {
    pub tab: Tab,
    pub sections: Vec<Section>,
}

/// Everything one render produced.
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub notices: Vec<Notice>,
    pub controls: Controls,
    /// Rows left after the date filter
    pub row_count: usize,
    /// Top-level sections shown above the tabs
    pub sections: Vec<Section>,
    pub tabs: Vec<TabView>,
    pub elapsed: Duration,
}

impl DashboardView {
    /// Top-level sections followed by every tab's sections
    pub fn all_sections(&self) -> impl Iterator<Item = &Section> {
        self.sections
            .iter()
            .chain(self.tabs.iter().flat_map(|t| t.sections.iter()))
    }

    pub fn tab(&self, tab: Tab) -> Option<&TabView> {
        self.tabs.iter().find(|t| t.tab == tab)
    }
}

/// The loaded dataset plus the settings every render uses.
pub struct Dashboard {
    data: DataFrame,
    notices: Vec<Notice>,
    has_timestamps: bool,
    bounds: Option<DateRange>,
    settings: DashboardSettings,
}

impl Dashboard {
    pub fn new(prepared: Prepared, settings: DashboardSettings) -> Self {
        let has_timestamps = prepared.has_timestamps();
        let mut notices = prepared.notices;
        let bounds = if has_timestamps {
            date_bounds(&prepared.df).unwrap_or_else(|err| {
                notices.push(Notice::from(&err));
                None
            })
        } else {
            None
        };
        Self {
            data: prepared.df,
            notices,
            has_timestamps,
            bounds,
            settings,
        }
    }

    /// Load and prepare `path`. A failure becomes an error notice over an empty dataset.
    pub fn load(path: &Path, options: &LoadOptions, settings: DashboardSettings) -> Self {
        match load_csv(path, options).and_then(prepare) {
            Ok(prepared) => Self::new(prepared, settings),
            Err(err) => {
                error!(path = %path.display(), error = %err, "could not load dataset");
                let prepared = Prepared {
                    df: DataFrame::empty(),
                    notices: vec![Notice::from(&err)],
                };
                Self::new(prepared, settings)
            }
        }
    }

    pub fn data(&self) -> &DataFrame {
        &self.data
    }

    pub fn bounds(&self) -> Option<DateRange> {
        self.bounds
    }

    pub fn settings(&self) -> DashboardSettings {
        self.settings
    }

    /// Rows in the full dataset
    pub fn row_count(&self) -> usize {
        self.data.height()
    }

    pub fn has_timestamps(&self) -> bool {
        self.has_timestamps
    }

    /// Run the filter and every aggregation for `filters`.
    pub fn render(&self, filters: &Filters) -> DashboardView {
        let started = Instant::now();
        let mut notices = self.notices.clone();

        let mut controls = Controls {
            bounds: self.bounds,
            date_range: filters.date_range.or(self.bounds),
            ..Controls::default()
        };

        if !self.has_timestamps {
            return DashboardView {
                notices,
                controls,
                row_count: 0,
                sections: Vec::new(),
                tabs: Vec::new(),
                elapsed: started.elapsed(),
            };
        }

        let filtered = match controls.date_range {
            Some(range) => filter_by_date_range(&self.data, &range).unwrap_or_else(|err| {
                notices.push(Notice::from(&err));
                self.data.clear()
            }),
            None => self.data.clear(),
        };

        controls.states = distinct_in_order(&filtered, SELLER_STATE).unwrap_or_default();
        controls.products = top_product_ids(&filtered, self.settings.top_n).unwrap_or_default();
        controls.state = resolve_selection(filters.state.as_deref(), &controls.states);
        controls.overview_state =
            resolve_selection(filters.overview_state.as_deref(), &controls.states);
        controls.product = resolve_selection(filters.product.as_deref(), &controls.products);

        let sections = vec![
            self.best_selling_section(&filtered),
            self.review_section(&filtered),
        ];
        let tabs = vec![
            TabView {
                tab: Tab::MonthlySales,
                sections: vec![state_section(
                    "monthly_sales_state",
                    &filtered,
                    controls.state.as_deref(),
                )],
            },
            TabView {
                tab: Tab::SalesOverview,
                sections: vec![
                    total_per_state_section(&filtered),
                    state_section(
                        "monthly_sales_overview_state",
                        &filtered,
                        controls.overview_state.as_deref(),
                    ),
                ],
            },
            TabView {
                tab: Tab::TopProductTrends,
                sections: vec![
                    self.top_products_monthly_section(&filtered),
                    product_trend_section(&filtered, controls.product.as_deref()),
                ],
            },
        ];

        let elapsed = started.elapsed();
        debug!(
            rows = filtered.height(),
            states = controls.states.len(),
            products = controls.products.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "rendered dashboard"
        );

        DashboardView {
            notices,
            controls,
            row_count: filtered.height(),
            sections,
            tabs,
            elapsed,
        }
    }

    fn best_selling_section(&self, df: &DataFrame) -> Section {
        Section::build(
            "best_selling_state",
            "Best sales per state and month".to_string(),
            best_selling_state(df).and_then(|table| {
                let chart = bar_chart(
                    &table,
                    SELLER_STATE,
                    ORDER_COUNT,
                    "Highest sales per state and month",
                    "State",
                    "Total sales",
                )?;
                Ok((table, chart))
            }),
        )
    }

    fn review_section(&self, df: &DataFrame) -> Section {
        Section::build(
            "review_distribution",
            "Review score distribution".to_string(),
            review_score_distribution(df, self.settings.histogram_bins).and_then(|table| {
                let chart =
                    histogram_chart(&table, "Review score distribution", "Review score", "Frequency")?;
                Ok((table, chart))
            }),
        )
    }

    fn top_products_monthly_section(&self, df: &DataFrame) -> Section {
        let n = self.settings.top_n;
        Section::build(
            "top_products_monthly",
            format!("Monthly sales of the top {} products", n),
            monthly_sales_top_products(df, n).and_then(|table| {
                let chart = monthly_grouped_bar_chart(
                    &table,
                    PRODUCT_ID,
                    TOTAL_SALES,
                    format!("Top {} products per month", n),
                    "Total sales",
                )?;
                Ok((table, chart))
            }),
        )
    }
}

/// Keep `selected` when it is one of `options`, otherwise fall back to the first option.
pub fn resolve_selection(selected: Option<&str>, options: &[String]) -> Option<String> {
    selected
        .and_then(|s| options.iter().find(|o| o.as_str() == s))
        .or_else(|| options.first())
        .cloned()
}

fn state_section(id: &'static str, df: &DataFrame, state: Option<&str>) -> Section {
    let state = state.unwrap_or_default();
    Section::build(
        id,
        format!("Monthly sales in {}", state),
        monthly_sales_for_state(df, state).and_then(|table| {
            let chart = bar_chart(
                &table,
                PURCHASE_MONTH,
                TOTAL_SALES,
                format!("Sales in {} per month", state),
                "Month",
                "Total sales",
            )?;
            Ok((table, chart))
        }),
    )
}

fn total_per_state_section(df: &DataFrame) -> Section {
    Section::build(
        "total_sales_per_state",
        "Total sales per state".to_string(),
        total_sales_per_state(df).and_then(|table| {
            let chart = bar_chart(
                &table,
                SELLER_STATE,
                TOTAL_SALES,
                "Total sales per state",
                "State",
                "Total sales",
            )?;
            Ok((table, chart))
        }),
    )
}

fn product_trend_section(df: &DataFrame, product: Option<&str>) -> Section {
    let product = product.unwrap_or_default();
    Section::build(
        "product_trend",
        "Sales trend per month".to_string(),
        sales_trend_for_product(df, product).and_then(|table| {
            let chart = monthly_line_chart(
                &table,
                TOTAL_SALES,
                product,
                format!("Sales trend of {} per month", product),
                "Total sales",
            )?;
            Ok((table, chart))
        }),
    )
}
