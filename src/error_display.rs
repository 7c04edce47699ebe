//! User-facing error message formatting.
//!
//! Uses typed error matching (DashboardError, PolarsError variants, io::ErrorKind)
//! rather than string parsing to produce short, actionable messages.

use polars::prelude::PolarsError;
use std::io;
use std::path::Path;

use crate::error::DashboardError;

/// Format a DashboardError as an inline message.
pub fn user_message(err: &DashboardError) -> String {
    match err {
        DashboardError::FileNotFound(path) => format!("File not found: {}", path.display()),
        DashboardError::Parse { path, source } => format!(
            "Error parsing the file {}: {}",
            path.display(),
            user_message_from_polars(source)
        ),
        DashboardError::MissingColumn(name) => {
            format!("Column '{}' was not found in the dataset.", name)
        }
        DashboardError::Polars(e) => user_message_from_polars(e),
        DashboardError::Io(e) => user_message_from_io(e, None),
    }
}

/// Format a PolarsError as a user-facing message by matching on its variant.
pub fn user_message_from_polars(err: &PolarsError) -> String {
    use polars::prelude::PolarsError as PE;

    match err {
        PE::ColumnNotFound(msg) => format!(
            "Column not found: {}. Check spelling and that the column exists.",
            msg
        ),
        PE::IO { error, msg } => {
            user_message_from_io(error.as_ref(), msg.as_ref().map(|m| m.as_ref()))
        }
        PE::NoData(msg) => format!("No data: {}", msg),
        PE::SchemaMismatch(msg) => format!("Schema mismatch: {}", msg),
        PE::ShapeMismatch(msg) => format!("Row shape mismatch: {}", msg),
        PE::InvalidOperation(msg) => format!("Operation not allowed: {}", msg),
        PE::ComputeError(msg) => format!("Could not compute result: {}", msg),
        PE::Context { error, msg } => {
            format!("{}: {}", msg, user_message_from_polars(error))
        }
        #[allow(unreachable_patterns)]
        _ => err.to_string(),
    }
}

/// Format an io::Error as a user-facing message by matching on ErrorKind.
pub fn user_message_from_io(err: &io::Error, context: Option<&str>) -> String {
    use std::io::ErrorKind;

    let base: String = match err.kind() {
        ErrorKind::NotFound => "File or directory not found.".to_string(),
        ErrorKind::PermissionDenied => "Permission denied. Check read access.".to_string(),
        ErrorKind::InvalidData | ErrorKind::InvalidInput => {
            "Invalid or corrupted data.".to_string()
        }
        ErrorKind::UnexpectedEof => "Unexpected end of file.".to_string(),
        ErrorKind::OutOfMemory => "Out of memory.".to_string(),
        _ => err.to_string(),
    };

    match context {
        Some(ctx) if !ctx.is_empty() => format!("{} {}", base, ctx),
        _ => base,
    }
}

/// Format a color_eyre Report by downcasting to known error types.
/// Walks the cause chain to find DashboardError, PolarsError or io::Error.
pub fn user_message_from_report(report: &color_eyre::eyre::Report, path: Option<&Path>) -> String {
    let prefix = |msg: String| match path {
        Some(p) => format!("Failed to load {}: {}", p.display(), msg),
        None => msg,
    };

    for cause in report.chain() {
        if let Some(de) = cause.downcast_ref::<DashboardError>() {
            return prefix(user_message(de));
        }
        if let Some(pe) = cause.downcast_ref::<PolarsError>() {
            return prefix(user_message_from_polars(pe));
        }
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            return prefix(user_message_from_io(io_err, None));
        }
    }

    // Fallback: first line of display to avoid long tracebacks
    let display = report.to_string();
    let first_line = display.lines().next().unwrap_or("An error occurred");
    prefix(first_line.trim().to_string())
}
