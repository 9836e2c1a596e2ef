use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Malformed archive")]
    Malformed(#[from] zip::result::ZipError),

    #[error("Archive entry '{0}' would be extracted outside the destination directory")]
    UnsafeEntry(String),

    #[error("Failed to read archive '{0}'")]
    Open(PathBuf, #[source] std::io::Error),

    #[error("Failed to write extracted entry '{0}'")]
    Write(PathBuf, #[source] std::io::Error),
}
