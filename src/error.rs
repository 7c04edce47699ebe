use std::io;
use std::path::PathBuf;

use polars::prelude::{DataFrame, PolarsError};
use thiserror::Error;

/// Failures raised by loading, preparing, filtering and aggregating the dataset.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("error parsing {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },
    #[error("column '{0}' not found in dataset")]
    MissingColumn(String),
    #[error(transparent)]
    Polars(#[from] PolarsError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type DashboardResult<T> = std::result::Result<T, DashboardError>;

/// Fails with [`DashboardError::MissingColumn`] naming the first absent column.
pub fn require_columns(df: &DataFrame, columns: &[&str]) -> DashboardResult<()> {
    match columns
        .iter()
        .find(|name| df.get_column_index(name).is_none())
    {
        Some(missing) => Err(DashboardError::MissingColumn((*missing).to_string())),
        None => Ok(()),
    }
}

/// Severity of an inline notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Warning,
    Error,
}

/// A message shown in place of (or above) a chart. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

impl From<&DashboardError> for Notice {
    fn from(err: &DashboardError) -> Self {
        Notice::error(crate::error_display::user_message(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn require_columns_reports_first_missing() {
        let df = df!("a" => &[1i32], "b" => &[2i32]).unwrap();
        assert!(require_columns(&df, &["a", "b"]).is_ok());
        match require_columns(&df, &["a", "c", "d"]) {
            Err(DashboardError::MissingColumn(name)) => assert_eq!(name, "c"),
            other => panic!("expected missing column, got {:?}", other),
        }
    }

    #[test]
    fn notice_from_missing_column() {
        let err = DashboardError::MissingColumn("seller_state".into());
        let notice = Notice::from(&err);
        assert!(notice.is_error());
        assert!(notice.message.contains("seller_state"));
    }
}
