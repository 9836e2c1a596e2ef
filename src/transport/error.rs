use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Failed to read response body from {0}")]
    Body(String, #[source] reqwest::Error),
}
