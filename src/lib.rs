pub mod archive;
mod conagua;
pub mod config;
mod error;
pub mod forecast;
pub mod normalize;
pub mod retrieval;
mod series;
pub mod table;
mod text;
pub mod transport;
mod types;

#[cfg(test)]
mod test_support;

pub use conagua::Conagua;
pub use config::{Config, ConfigError, KindConfig};
pub use error::ConaguaError;
pub use series::CanonicalSeries;

pub use archive::error::ArchiveError;
pub use forecast::{ForecastDataset, ForecastKey, ForecastMerger};
pub use normalize::{SchemaNormalizer, YearTable};
pub use retrieval::{FallbackRetriever, RetrievalAttempt, Retrieved};
pub use table::error::TableError;
pub use table::{RawTable, SheetReader, TableReader};
pub use transport::error::TransferError;
pub use transport::{HttpTransport, Transport};

pub use types::data_kind::{DataKind, UnknownDataKind};
pub use types::months;
pub use types::period::Period;
