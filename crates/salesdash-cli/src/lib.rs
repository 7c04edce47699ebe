//! Shared CLI definitions for salesdash.
//!
//! Used by the main application and by the build script (manpage) and
//! gen_docs binary (command-line-options markdown).

use chrono::NaiveDate;
use clap::{CommandFactory, Parser};
use std::path::PathBuf;

/// Default location of the dataset, relative to the working directory.
pub const DEFAULT_DATA_PATH: &str = "dashboard/main_data.csv";

/// Parse a `YYYY-MM-DD` date argument.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| format!("invalid date '{}': {} (expected YYYY-MM-DD)", s, e))
}

/// Command-line arguments for salesdash
#[derive(Clone, Parser, Debug)]
#[command(
    name = "salesdash",
    version,
    about = "E-commerce sales dashboard in the terminal",
    long_about = "Load a pre-joined orders/products/sellers/reviews CSV and explore \
                  best-selling states, review scores and monthly sales trends."
)]
pub struct Args {
    /// Path to the dataset CSV (default: config [data] path, then dashboard/main_data.csv)
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// First purchase date to include (YYYY-MM-DD). Defaults to the earliest date in the data
    #[arg(long = "start-date", value_name = "DATE", value_parser = parse_date)]
    pub start_date: Option<NaiveDate>,

    /// Last purchase date to include (YYYY-MM-DD). Defaults to the latest date in the data
    #[arg(long = "end-date", value_name = "DATE", value_parser = parse_date)]
    pub end_date: Option<NaiveDate>,

    /// Seller state shown in the "Monthly sales" tab
    #[arg(long = "state", value_name = "STATE")]
    pub state: Option<String>,

    /// Seller state shown in the "Sales overview" tab
    #[arg(long = "overview-state", value_name = "STATE")]
    pub overview_state: Option<String>,

    /// Product shown in the "Top product trends" tab (must be one of the top products)
    #[arg(long = "product", value_name = "PRODUCT_ID")]
    pub product: Option<String>,

    /// Number of top products to rank (default: 10)
    #[arg(long = "top-n", value_name = "N")]
    pub top_n: Option<usize>,

    /// Number of bins in the review score histogram (default: 5)
    #[arg(long = "bins", value_name = "N")]
    pub bins: Option<usize>,

    /// Specify the delimiter to use when reading the CSV
    #[arg(long = "delimiter")]
    pub delimiter: Option<u8>,

    /// Specify that the file has no header
    #[arg(long = "no-header")]
    pub no_header: Option<bool>,

    /// Number of rows to use when inferring CSV schema
    #[arg(long = "infer-schema-length", value_name = "N")]
    pub infer_schema_length: Option<usize>,

    /// Print every summary table to stdout instead of starting the terminal UI
    #[arg(long = "report", action)]
    pub report: bool,

    /// Write every chart of the dashboard as PNG into this directory
    #[arg(long = "export-dir", value_name = "DIR")]
    pub export_dir: Option<PathBuf>,

    /// Enable debug mode to show operational information
    #[arg(long = "debug", action)]
    pub debug: bool,

    /// Write log output to this file (the terminal UI never logs to the screen)
    #[arg(long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Generate default configuration file at ~/.config/salesdash/config.toml
    #[arg(long = "generate-config", action)]
    pub generate_config: bool,

    /// Force overwrite existing config file when using --generate-config
    #[arg(long = "force", requires = "generate_config", action)]
    pub force: bool,
}

/// Escape `|` and newlines for use in markdown table cells.
fn escape_table_cell(s: &str) -> String {
    s.replace('|', "\\|").replace(['\n', '\r'], " ")
}

/// Render command-line options as markdown.
pub fn render_options_markdown() -> String {
    let mut cmd = Args::command();
    cmd.build();

    let mut out = String::from("# Command Line Options\n\n");

    out.push_str("## Usage\n\n```\n");
    out.push_str(&cmd.render_usage().to_string());
    out.push_str("\n```\n\n");

    out.push_str("## Options\n\n");
    out.push_str("| Option | Description |\n");
    out.push_str("|--------|-------------|\n");

    for arg in cmd.get_arguments() {
        let id = arg.get_id().as_ref().to_string();
        if id == "help" || id == "version" {
            continue;
        }

        let placeholder: String = arg
            .get_value_names()
            .map(|names| {
                names
                    .iter()
                    .map(|n: &clap::builder::Str| format!("<{}>", n.as_ref() as &str))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default();

        let option_str = if arg.is_positional() {
            if arg.is_required_set() {
                placeholder
            } else {
                format!("[{placeholder}]")
            }
        } else {
            let mut parts = Vec::new();
            if let Some(s) = arg.get_short() {
                parts.push(format!("-{s}"));
            }
            if let Some(l) = arg.get_long() {
                parts.push(format!("--{l}"));
            }
            let op = parts.join(", ");
            if arg.get_action().takes_values() && !placeholder.is_empty() {
                format!("{op} {placeholder}")
            } else {
                op
            }
        };

        let help = arg
            .get_help()
            .map(|h| escape_table_cell(&h.to_string()))
            .unwrap_or_else(|| "-".to_string());

        out.push_str(&format!("| `{option_str}` | {help} |\n"));
    }

    out
}
