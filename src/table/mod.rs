//! Text-cell tables as they come out of spreadsheets, bulletins and forecast
//! CSVs, before any normalization.

pub mod error;

use crate::table::error::TableError;
use crate::text::{canonical, decode_text};
use calamine::{open_workbook_auto_from_rs, Reader};
use log::debug;
use polars::prelude::*;
use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

/// Internal name of the region-identifier column.
pub const REGION_COLUMN: &str = "estado";
/// Header of the yearly total column.
pub const ANNUAL_COLUMN: &str = "anual";
/// Canonical region text of the country-wide aggregate row.
pub const NATIONAL_ROW: &str = "nacional";

const REGION_ALIASES: [&str; 3] = ["estado", "entidad", "entidad federativa"];

/// File formats a [`TableReader`] understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Spreadsheet,
}

impl TableFormat {
    /// Detects the format from the extension of a file name or URL.
    pub fn from_name(name: &str) -> Option<Self> {
        let extension = Path::new(name).extension()?.to_str()?.to_lowercase();
        match extension.as_str() {
            "csv" => Some(TableFormat::Csv),
            "xls" | "xlsx" | "xlsm" | "xlsb" | "ods" => Some(TableFormat::Spreadsheet),
            _ => None,
        }
    }
}

/// A wide table of text cells with a single header row.
///
/// Every row has exactly as many cells as there are headers; missing cells are
/// empty strings.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    name: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    /// Builds a table whose first grid row is the header.
    pub fn from_grid(name: impl Into<String>, mut grid: Vec<Vec<String>>) -> Result<Self, TableError> {
        let name = name.into();
        if grid.is_empty() {
            return Err(TableError::Empty(name));
        }
        let width = grid.iter().map(Vec::len).max().unwrap_or(0);
        let mut headers = grid.remove(0);
        headers.resize(width, String::new());
        Ok(Self::new(name, headers, grid))
    }

    /// Source identifier, usually the file name the table was read from.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    /// Cells of the column named `header`, top to bottom.
    pub fn column(&self, header: &str) -> Option<Vec<&str>> {
        let index = self.column_index(header)?;
        Some(self.rows.iter().map(|row| row[index].as_str()).collect())
    }

    /// Canonicalizes every header and renames region aliases to
    /// [`REGION_COLUMN`].
    pub fn canonicalize_headers(&mut self) {
        for header in self.headers.iter_mut() {
            let canonical_header = canonical(header);
            *header = if REGION_ALIASES.contains(&canonical_header.as_str()) {
                REGION_COLUMN.to_string()
            } else {
                canonical_header
            };
        }
    }

    /// Canonicalizes every cell of one column. Returns `false` if the column
    /// does not exist.
    pub fn canonicalize_column(&mut self, header: &str) -> bool {
        let Some(index) = self.column_index(header) else {
            return false;
        };
        for row in self.rows.iter_mut() {
            row[index] = canonical(&row[index]);
        }
        true
    }

    /// Replaces a banner header with the first data row.
    ///
    /// Some yearly spreadsheets start with a title row such as
    /// "PRECIPITACIÓN A NIVEL NACIONAL Y POR ENTIDAD FEDERATIVA"; the real
    /// header is the row below it. Returns whether a promotion happened.
    pub fn promote_banner(&mut self, sentinels: &[String]) -> bool {
        let sentinels: Vec<String> = sentinels.iter().map(|s| canonical(s)).collect();
        let is_banner = self
            .headers
            .iter()
            .any(|header| sentinels.contains(&canonical(header)));
        if !is_banner || self.rows.is_empty() {
            return false;
        }

        debug!("Promoting second row of '{}' to header", self.name);
        self.headers = self.rows.remove(0);
        self.canonicalize_headers();
        true
    }

    /// Renames the column at `index`. Returns `false` if there is no such
    /// column.
    pub fn set_header(&mut self, index: usize, header: impl Into<String>) -> bool {
        match self.headers.get_mut(index) {
            Some(slot) => {
                *slot = header.into();
                true
            }
            None => false,
        }
    }

    /// Creates the column `header`, or overwrites it if present.
    ///
    /// # Errors
    ///
    /// [`TableError::ColumnHeight`] if `values` does not have one cell per row;
    /// the table is left unchanged.
    pub fn set_column(&mut self, header: &str, values: Vec<String>) -> Result<(), TableError> {
        if values.len() != self.rows.len() {
            return Err(TableError::ColumnHeight {
                name: self.name.clone(),
                header: header.to_string(),
                expected: self.rows.len(),
                found: values.len(),
            });
        }
        match self.column_index(header) {
            Some(index) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[index] = value;
                }
            }
            None => {
                self.headers.push(header.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    /// Removes the column `header`. Returns whether it existed.
    pub fn drop_column(&mut self, header: &str) -> bool {
        let Some(index) = self.column_index(header) else {
            return false;
        };
        self.headers.remove(index);
        for row in self.rows.iter_mut() {
            row.remove(index);
        }
        true
    }

    /// Keeps only the rows for which `keep` returns `true`.
    pub fn retain_rows(&mut self, keep: impl FnMut(&Vec<String>) -> bool) {
        self.rows.retain(keep);
    }

    /// Writes the table as headerless CSV with the header as first line, so it
    /// reads back through [`SheetReader`] unchanged.
    pub fn write_csv(&self, path: &Path) -> Result<(), TableError> {
        let columns: Vec<Column> = self
            .headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let values: Vec<&str> = std::iter::once(header.as_str())
                    .chain(self.rows.iter().map(|row| row[i].as_str()))
                    .collect();
                Column::new(format!("column_{}", i + 1).into(), values)
            })
            .collect();
        let mut df =
            DataFrame::new(columns).map_err(|e| TableError::Write(path.to_path_buf(), e))?;
        let mut file = File::create(path).map_err(|e| TableError::Io(path.to_path_buf(), e))?;
        CsvWriter::new(&mut file)
            .include_header(false)
            .finish(&mut df)
            .map_err(|e| TableError::Write(path.to_path_buf(), e))
    }
}

/// Number of fields of the widest CSV record in `text`. Separators and line
/// breaks inside double quotes do not count.
fn record_width(text: &str) -> usize {
    let mut widest = 0;
    let mut fields = 1;
    let mut in_quotes = false;
    let mut empty_line = true;
    for c in text.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                empty_line = false;
            }
            ',' if !in_quotes => {
                fields += 1;
                empty_line = false;
            }
            '\n' if !in_quotes => {
                if !empty_line {
                    widest = widest.max(fields);
                }
                fields = 1;
                empty_line = true;
            }
            '\r' => {}
            _ => empty_line = false,
        }
    }
    if !empty_line {
        widest = widest.max(fields);
    }
    widest.max(1)
}

/// Reads tables of text cells from raw bytes or files.
pub trait TableReader {
    /// Parses `bytes`; `name` is used for format detection and error messages.
    fn read_bytes(&self, name: &str, bytes: &[u8]) -> Result<RawTable, TableError>;

    fn read_path(&self, path: &Path) -> Result<RawTable, TableError> {
        let bytes = std::fs::read(path).map_err(|e| TableError::Io(path.to_path_buf(), e))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.read_bytes(&name, &bytes)
    }
}

/// Reads CSV through polars and spreadsheets through calamine. Only the first
/// worksheet of a workbook is read.
#[derive(Debug, Clone, Copy, Default)]
pub struct SheetReader;

impl SheetReader {
    fn read_csv(name: &str, bytes: &[u8]) -> Result<Vec<Vec<String>>, TableError> {
        let csv_error = |source| TableError::Csv {
            name: name.to_string(),
            source,
        };
        let text = decode_text(bytes);
        // Banner lines are narrower than the table below them, so the width
        // comes from the widest record rather than the first.
        let schema: Schema = (1..=record_width(&text))
            .map(|i| Field::new(format!("column_{i}").into(), DataType::String))
            .collect();
        let df = CsvReadOptions::default()
            .with_has_header(false)
            .with_schema(Some(Arc::new(schema)))
            .map_parse_options(|options| options.with_truncate_ragged_lines(true))
            .into_reader_with_file_handle(Cursor::new(text.into_bytes()))
            .finish()
            .map_err(csv_error)?;

        let mut grid: Vec<Vec<String>> = vec![Vec::with_capacity(df.width()); df.height()];
        for column in df.get_columns() {
            let series = column
                .as_materialized_series()
                .cast(&DataType::String)
                .map_err(csv_error)?;
            let values = series.str().map_err(csv_error)?;
            for (row, value) in grid.iter_mut().zip(values.into_iter()) {
                row.push(value.unwrap_or_default().to_string());
            }
        }
        Ok(grid)
    }

    fn read_spreadsheet(name: &str, bytes: &[u8]) -> Result<Vec<Vec<String>>, TableError> {
        let spreadsheet_error = |source| TableError::Spreadsheet {
            name: name.to_string(),
            source,
        };
        let mut workbook =
            open_workbook_auto_from_rs(Cursor::new(bytes.to_vec())).map_err(spreadsheet_error)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| TableError::Empty(name.to_string()))?
            .map_err(spreadsheet_error)?;
        Ok(range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect())
    }
}

impl TableReader for SheetReader {
    fn read_bytes(&self, name: &str, bytes: &[u8]) -> Result<RawTable, TableError> {
        let grid = match TableFormat::from_name(name) {
            Some(TableFormat::Csv) => Self::read_csv(name, bytes)?,
            Some(TableFormat::Spreadsheet) => Self::read_spreadsheet(name, bytes)?,
            None => return Err(TableError::UnsupportedFormat(name.to_string())),
        };
        let table = RawTable::from_grid(name, grid)?;
        debug!(
            "Read table '{}' with {} columns and {} rows",
            name,
            table.headers().len(),
            table.height()
        );
        Ok(table)
    }
}
