use crate::archive::error::ArchiveError;
use crate::config::ConfigError;
use crate::table::error::TableError;
use crate::transport::error::TransferError;
use crate::types::period::Period;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConaguaError {
    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("No resource available for '{location}' in the {window} months up to {start}")]
    ResourceExhausted {
        location: String,
        start: Period,
        window: u32,
    },

    #[error("Table '{table}' does not match the expected schema: {message}")]
    SchemaMismatch { table: String, message: String },

    #[error("Month name '{0}' has no column abbreviation")]
    UnmappedMonthName(String),

    #[error("Forecast bundle is unusable: {0}")]
    ForecastBundle(String),

    #[error("Failed to create working directory '{0}'")]
    WorkingDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to list directory '{0}'")]
    DirectoryListing(PathBuf, #[source] std::io::Error),

    #[error("Failed to write output file '{0}'")]
    OutputWrite(PathBuf, #[source] std::io::Error),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("Failed processing DataFrame: {0}")]
    DataFrameProcessing(#[from] PolarsError),
}

impl ConaguaError {
    pub(crate) fn schema(table: &str, message: impl Into<String>) -> Self {
        ConaguaError::SchemaMismatch {
            table: table.to_string(),
            message: message.into(),
        }
    }
}
