//! Entry point of the pipeline: downloads the historical archive, the recent
//! bulletin tables and optionally the monthly forecast, and normalizes the
//! result into one [`CanonicalSeries`].

use crate::archive;
use crate::config::{render, Config};
use crate::error::ConaguaError;
use crate::forecast::{ForecastDataset, ForecastMerger};
use crate::normalize::SchemaNormalizer;
use crate::retrieval::FallbackRetriever;
use crate::series::CanonicalSeries;
use crate::table::{RawTable, SheetReader, TableReader, REGION_COLUMN};
use crate::transport::{HttpTransport, Transport};
use crate::types::data_kind::DataKind;
use crate::types::period::Period;
use bon::bon;
use log::info;
use std::path::{Path, PathBuf};

/// A bulletin table together with the year it covers.
struct YearlyTable {
    year: i32,
    table: RawTable,
}

/// Runs the acquisition and normalization steps for one [`DataKind`].
///
/// The transport and table reader are pluggable; [`Conagua::new`] uses HTTP
/// and the polars/calamine reader.
///
/// # Examples
///
/// ```no_run
/// use conagua::{Conagua, Config, DataKind};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), conagua::ConaguaError> {
/// let client = Conagua::new(Config::load(None)?);
/// let series = client
///     .run()
///     .kind(DataKind::Precipitation)
///     .include_forecast(true)
///     .call()
///     .await?;
/// println!("{}", series.frame);
/// # Ok(())
/// # }
/// ```
pub struct Conagua<T = HttpTransport, R = SheetReader> {
    config: Config,
    transport: T,
    reader: R,
}

impl Conagua {
    pub fn new(config: Config) -> Self {
        Self::with_parts(config, HttpTransport::new(), SheetReader)
    }
}

#[bon]
impl<T: Transport, R: TableReader + Clone> Conagua<T, R> {
    pub fn with_parts(config: Config, transport: T, reader: R) -> Self {
        Self {
            config,
            transport,
            reader,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs the whole pipeline.
    ///
    /// # Arguments
    ///
    /// * `.kind(DataKind)`: **Required.** Which dataset to build.
    /// * `.include_forecast(bool)`: Optional. Merge the latest monthly forecast
    ///   into the newest yearly table. Ignored for temperature. Defaults to `false`.
    /// * `.directory(PathBuf)`: Optional. Working directory for the extracted and
    ///   generated tables. Defaults to [`DataKind::default_folder`].
    /// * `.start(Period)`: Optional. Month from which the forecast search goes
    ///   back. Defaults to the current month.
    ///
    /// # Errors
    ///
    /// Any failed step aborts the run. Files already written to the working
    /// directory are left in place.
    #[builder]
    pub async fn run(
        &self,
        kind: DataKind,
        include_forecast: Option<bool>,
        directory: Option<PathBuf>,
        start: Option<Period>,
    ) -> Result<CanonicalSeries, ConaguaError> {
        let directory = directory.unwrap_or_else(|| PathBuf::from(kind.default_folder()));
        info!("Using working directory {}", directory.display());
        tokio::fs::create_dir_all(&directory)
            .await
            .map_err(|e| ConaguaError::WorkingDirCreation(directory.clone(), e))?;

        self.download_archive(kind, &directory).await?;

        let mut tables = self.bulletin_tables(kind).await?;

        if include_forecast.unwrap_or(false) {
            if kind.accepts_forecast() {
                let start = start.unwrap_or_else(Period::current);
                self.merge_forecast(kind, start, &mut tables).await?;
            } else {
                info!("Forecasts only exist for precipitation, skipping for {}", kind);
            }
        }

        for yearly in &tables {
            let path = directory.join(format!("{}{}.csv", yearly.year, kind.file_suffix()));
            yearly.table.write_csv(&path)?;
            info!("Saved {}", path.display());
        }

        self.normalize(kind, &directory)
    }

    /// Normalizes the tables already present in `directory`.
    pub fn normalize(&self, kind: DataKind, directory: &Path) -> Result<CanonicalSeries, ConaguaError> {
        SchemaNormalizer::new(self.reader.clone(), self.config.for_kind(kind)).normalize(directory)
    }

    async fn download_archive(&self, kind: DataKind, directory: &Path) -> Result<(), ConaguaError> {
        let location = self.config.archive_url(kind)?;
        let bytes = self.transport.fetch(location).await?;
        let destination = directory.to_path_buf();
        let extracted =
            tokio::task::spawn_blocking(move || archive::extract_bytes(&bytes, &destination))
                .await??;
        info!("Archive provided {} files", extracted.len());
        Ok(())
    }

    /// Reads the yearly bulletin tables from the configured start year up to
    /// the current year. Without a bulletin location nothing is read.
    async fn bulletin_tables(&self, kind: DataKind) -> Result<Vec<YearlyTable>, ConaguaError> {
        let Some(template) = self.config.bulletin_url.as_deref() else {
            info!("No bulletin location configured, skipping bulletin tables");
            return Ok(Vec::new());
        };

        let sentinels = &self.config.for_kind(kind).banner_sentinels;
        let mut tables = Vec::new();
        for year in self.config.bulletin_start_year..=Period::current().year() {
            let year_text = year.to_string();
            let location = render(
                template,
                &[("folder", kind.bulletin_folder()), ("year", year_text.as_str())],
            );
            let bytes = self.transport.fetch(&location).await?;
            let mut table = self.reader.read_bytes(&location, &bytes)?;
            table.promote_banner(sentinels);
            table.canonicalize_headers();
            tables.push(YearlyTable { year, table });
        }
        Ok(tables)
    }

    /// Retrieves the newest forecast bundle and merges it into the table of the
    /// latest year. Without bulletin tables the forecast starts a new table
    /// for its own year.
    async fn merge_forecast(
        &self,
        kind: DataKind,
        start: Period,
        tables: &mut Vec<YearlyTable>,
    ) -> Result<(), ConaguaError> {
        let kind_config = self.config.for_kind(kind);
        let retriever = FallbackRetriever::new(
            &self.transport,
            self.config.forecast_url(kind)?,
            kind_config.forecast_kind.as_str(),
            self.config.retry_window,
        );
        let retrieved = retriever
            .retrieve(start, |bytes| ForecastDataset::from_archive(&bytes, &self.reader))
            .await?;
        info!(
            "Using forecast of {} after {} attempts",
            retrieved.period, retrieved.attempts
        );

        if tables.is_empty() {
            let year = retrieved.period.year();
            let rows = retrieved
                .value
                .regions()
                .into_iter()
                .map(|region| vec![region])
                .collect();
            tables.push(YearlyTable {
                year,
                table: RawTable::new(
                    format!("{}{}.csv", year, kind.file_suffix()),
                    vec![REGION_COLUMN.to_string()],
                    rows,
                ),
            });
        }

        let merger = ForecastMerger::new(&kind_config.forecast_value_column);
        if let Some(latest) = tables.iter_mut().max_by_key(|yearly| yearly.year) {
            merger.merge(&mut latest.table, retrieved.value)?;
        }
        Ok(())
    }
}
