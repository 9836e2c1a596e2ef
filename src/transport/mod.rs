//! Byte-level retrieval of remote resources.

pub mod error;

use crate::transport::error::TransferError;
use log::{info, warn};
use reqwest::{Client, StatusCode};
use std::future::Future;

/// Fetches the raw bytes behind a location.
///
/// The pipeline only talks to the network through this trait, so tests can
/// serve archives and tables from memory.
pub trait Transport {
    fn fetch(&self, location: &str) -> impl Future<Output = Result<Vec<u8>, TransferError>> + Send;
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, TransferError> {
        info!("Downloading {}", location);
        let response = self
            .client
            .get(location)
            .send()
            .await
            .map_err(|e| TransferError::NetworkRequest(location.to_string(), e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(TransferError::NotFound(location.to_string()));
        }

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", location, e);
                return Err(if let Some(status) = e.status() {
                    TransferError::HttpStatus {
                        url: location.to_string(),
                        status,
                        source: e,
                    }
                } else {
                    TransferError::NetworkRequest(location.to_string(), e)
                });
            }
        };

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransferError::Body(location.to_string(), e))?;
        info!("Downloaded {} bytes from {}", bytes.len(), location);
        Ok(bytes.to_vec())
    }
}
