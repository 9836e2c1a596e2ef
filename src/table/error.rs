use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("Failed to read table file '{0}'")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse CSV table '{name}'")]
    Csv {
        name: String,
        #[source]
        source: PolarsError,
    },

    #[error("Failed to parse spreadsheet '{name}'")]
    Spreadsheet {
        name: String,
        #[source]
        source: calamine::Error,
    },

    #[error("Unsupported table format for '{0}'")]
    UnsupportedFormat(String),

    #[error("Column '{header}' of table '{name}' has {found} cells, expected {expected}")]
    ColumnHeight {
        name: String,
        header: String,
        expected: usize,
        found: usize,
    },

    #[error("Table '{0}' has no rows")]
    Empty(String),

    #[error("Failed to write table '{0}'")]
    Write(PathBuf, #[source] PolarsError),
}
