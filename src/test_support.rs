use crate::transport::error::TransferError;
use crate::transport::Transport;
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::Mutex;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Builds a zip archive in memory. Entries with `None` content are
/// directories.
pub(crate) fn zip_bytes(entries: &[(&str, Option<&str>)]) -> zip::result::ZipResult<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, content) in entries {
        match content {
            Some(text) => {
                writer.start_file(*name, options)?;
                writer.write_all(text.as_bytes())?;
            }
            None => writer.add_directory(*name, options)?,
        }
    }
    Ok(writer.finish()?.into_inner())
}

/// Builds the text of a yearly wide table with one row per `(region, value)`;
/// every month of the row holds the same value.
pub(crate) fn yearly_csv(regions: &[(&str, f64)]) -> String {
    let mut csv = String::from("ESTADO,ENE,FEB,MAR,ABR,MAY,JUN,JUL,AGO,SEP,OCT,NOV,DIC,ANUAL\n");
    for (region, value) in regions {
        csv.push_str(region);
        for _ in 0..12 {
            csv.push_str(&format!(",{value}"));
        }
        csv.push_str(&format!(",{}\n", value * 12.0));
    }
    csv
}

/// In-memory [`Transport`] that records every requested location.
#[derive(Debug, Default)]
pub(crate) struct MemoryTransport {
    resources: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
}

impl MemoryTransport {
    pub(crate) fn with(mut self, location: &str, bytes: Vec<u8>) -> Self {
        self.resources.insert(location.to_string(), bytes);
        self
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("request log poisoned").clone()
    }
}

impl Transport for MemoryTransport {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, TransferError> {
        self.requests
            .lock()
            .expect("request log poisoned")
            .push(location.to_string());
        self.resources
            .get(location)
            .cloned()
            .ok_or_else(|| TransferError::NotFound(location.to_string()))
    }
}
