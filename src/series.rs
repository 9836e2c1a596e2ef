//! The canonical long-form series produced by normalization.

use crate::error::ConaguaError;
use crate::types::period::Period;
use chrono::NaiveDate;
use log::info;
use polars::prelude::*;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

pub const DATE_COLUMN: &str = "date";
pub const YEAR_COLUMN: &str = "year";
pub const MONTH_COLUMN: &str = "month";

/// Monthly values per region, one row per month, sorted by `date`.
///
/// Columns are `date` (first day of the month), `year`, `month` and one `f64`
/// column per canonical region name, unless a column order was configured.
#[derive(Debug, Clone)]
pub struct CanonicalSeries {
    /// The underlying Polars DataFrame.
    pub frame: DataFrame,
}

impl CanonicalSeries {
    pub fn new(frame: DataFrame) -> Self {
        Self { frame }
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    /// Names of the region columns.
    pub fn regions(&self) -> Vec<String> {
        self.frame
            .get_column_names_str()
            .into_iter()
            .filter(|name| ![DATE_COLUMN, YEAR_COLUMN, MONTH_COLUMN].contains(name))
            .map(str::to_string)
            .collect()
    }

    /// Keeps the rows whose date lies within the inclusive bounds. A missing
    /// bound does not restrict.
    pub fn filter_dates(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Self, ConaguaError> {
        let mut predicate = lit(true);
        if let Some(start) = start {
            predicate = predicate.and(col(DATE_COLUMN).gt_eq(lit(start)));
        }
        if let Some(end) = end {
            predicate = predicate.and(col(DATE_COLUMN).lt_eq(lit(end)));
        }
        let frame = self.frame.clone().lazy().filter(predicate).collect()?;
        Ok(Self { frame })
    }

    /// Selects `date` followed by `order`.
    ///
    /// # Errors
    ///
    /// [`ConaguaError::SchemaMismatch`] when a column of `order` is absent.
    pub fn reorder(&self, order: &[String]) -> Result<Self, ConaguaError> {
        if let Some(missing) = order
            .iter()
            .find(|name| self.frame.column(name.as_str()).is_err())
        {
            return Err(ConaguaError::schema(
                "output",
                format!("configured column '{missing}' is not in the data"),
            ));
        }
        let columns: Vec<&str> = std::iter::once(DATE_COLUMN)
            .chain(order.iter().map(String::as_str).filter(|c| *c != DATE_COLUMN))
            .collect();
        Ok(Self {
            frame: self.frame.select(columns)?,
        })
    }

    /// Writes the series to `path`, as Parquet when the extension is
    /// `.parquet` and as CSV otherwise.
    pub fn write(&self, path: &Path) -> Result<(), ConaguaError> {
        let is_parquet = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("parquet"));
        if is_parquet {
            self.write_parquet(path)
        } else {
            self.write_csv(path)
        }
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), ConaguaError> {
        let mut file =
            File::create(path).map_err(|e| ConaguaError::OutputWrite(path.to_path_buf(), e))?;
        let mut frame = self.frame.clone();
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut frame)?;
        info!("Wrote {} rows to {}", frame.height(), path.display());
        Ok(())
    }

    pub fn write_parquet(&self, path: &Path) -> Result<(), ConaguaError> {
        let file =
            File::create(path).map_err(|e| ConaguaError::OutputWrite(path.to_path_buf(), e))?;
        let mut frame = self.frame.clone();
        ParquetWriter::new(file)
            .with_compression(ParquetCompression::Snappy)
            .finish(&mut frame)?;
        info!("Wrote {} rows to {}", frame.height(), path.display());
        Ok(())
    }
}

/// One month of one yearly table.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MonthRecord {
    pub period: Period,
    pub values: HashMap<String, Option<f64>>,
}

/// Collects month records and region names in first-seen order.
#[derive(Debug, Default)]
pub(crate) struct SeriesBuilder {
    regions: Vec<String>,
    records: Vec<MonthRecord>,
}

impl SeriesBuilder {
    pub fn add_region(&mut self, region: &str) {
        if !self.regions.iter().any(|r| r == region) {
            self.regions.push(region.to_string());
        }
    }

    pub fn push(&mut self, record: MonthRecord) {
        self.records.push(record);
    }

    pub fn build(mut self) -> Result<CanonicalSeries, ConaguaError> {
        self.records.sort_by_key(|record| record.period);

        let dates: Vec<NaiveDate> = self
            .records
            .iter()
            .map(|record| {
                record.period.first_day().ok_or_else(|| {
                    ConaguaError::schema("output", format!("invalid period {}", record.period))
                })
            })
            .collect::<Result<_, _>>()?;
        let years: Vec<i32> = self.records.iter().map(|r| r.period.year()).collect();
        let months: Vec<u32> = self.records.iter().map(|r| r.period.month()).collect();

        let mut columns = vec![
            Column::new(DATE_COLUMN.into(), dates),
            Column::new(YEAR_COLUMN.into(), years),
            Column::new(MONTH_COLUMN.into(), months),
        ];
        for region in &self.regions {
            let values: Vec<Option<f64>> = self
                .records
                .iter()
                .map(|record| record.values.get(region).copied().flatten())
                .collect();
            columns.push(Column::new(region.as_str().into(), values));
        }

        Ok(CanonicalSeries::new(DataFrame::new(columns)?))
    }
}
