use polars::prelude::*;
use std::path::Path;
use tracing::{info, warn};

use crate::columns::KEY_COLUMNS;
use crate::config::AppConfig;
use crate::error::{DashboardError, DashboardResult};

/// CSV reading options. Unset fields fall back to polars defaults.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    pub delimiter: Option<u8>,
    pub has_header: Option<bool>,
    pub infer_schema_length: Option<usize>,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn with_has_header(mut self, has_header: bool) -> Self {
        self.has_header = Some(has_header);
        self
    }

    pub fn with_infer_schema_length(mut self, rows: usize) -> Self {
        self.infer_schema_length = Some(rows);
        self
    }

    /// Create LoadOptions from CLI args and config, with CLI args taking precedence
    pub fn from_args_and_config(args: &salesdash_cli::Args, config: &AppConfig) -> Self {
        Self {
            delimiter: args.delimiter.or(config.data.delimiter),
            has_header: match args.no_header {
                Some(no_header) => Some(!no_header),
                None => config.data.has_header,
            },
            infer_schema_length: args
                .infer_schema_length
                .or(config.data.infer_schema_length),
        }
    }
}

/// Read the dataset CSV eagerly. The file is read once per session and never mutated.
pub fn load_csv(path: &Path, options: &LoadOptions) -> DashboardResult<DataFrame> {
    if !path.is_file() {
        warn!(path = %path.display(), "dataset not found");
        return Err(DashboardError::FileNotFound(path.to_path_buf()));
    }

    let mut read_options = CsvReadOptions::default();
    if let Some(has_header) = options.has_header {
        read_options.has_header = has_header;
    }
    if options.infer_schema_length.is_some() {
        read_options = read_options.with_infer_schema_length(options.infer_schema_length);
    }
    if let Some(delimiter) = options.delimiter {
        read_options = read_options.map_parse_options(|opts| opts.with_separator(delimiter));
    }

    let df = read_options
        .try_into_reader_with_file_path(Some(path.into()))
        .and_then(|reader| reader.finish())
        .map_err(|source| DashboardError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let df = normalize_key_columns(df)?;
    info!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "loaded dataset"
    );
    Ok(df)
}

/// Cast identifier columns to strings so numeric-looking ids compare as text.
fn normalize_key_columns(df: DataFrame) -> DashboardResult<DataFrame> {
    let casts: Vec<Expr> = KEY_COLUMNS
        .iter()
        .filter(|name| {
            df.get_column_index(name).is_some()
                && df
                    .column(name)
                    .map(|c| c.dtype() != &DataType::String)
                    .unwrap_or(false)
        })
        .map(|name| col(*name).cast(DataType::String))
        .collect();

    if casts.is_empty() {
        return Ok(df);
    }
    Ok(df.lazy().with_columns(casts).collect()?)
}
