//! Turns a directory of yearly wide tables into one [`CanonicalSeries`].
//!
//! The yearly tables are wide: one row per state, one column per month, plus
//! the state name and a yearly total. Layouts drift over the decades (title
//! rows above the header, `ENTIDAD` instead of `ESTADO`, accents, stray
//! spaces), so every table goes through the same steps before the months are
//! transposed into rows:
//!
//! 1. promote the second row to header when the first is a banner;
//! 2. canonicalize headers and state names;
//! 3. resolve every header to the region, the yearly total or a month;
//! 4. drop the yearly total and the national row;
//! 5. emit one record per month, dated by the year in the file name.

use crate::config::KindConfig;
use crate::error::ConaguaError;
use crate::series::{CanonicalSeries, MonthRecord, SeriesBuilder};
use crate::table::{RawTable, TableFormat, TableReader, ANNUAL_COLUMN, NATIONAL_ROW, REGION_COLUMN};
use crate::text::first_year;
use crate::types::months::number_for_abbreviation;
use crate::types::period::Period;
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// Cell texts that stand for a missing value.
const MISSING_MARKERS: [&str; 5] = ["", "-", "nd", "n/d", "s/d"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderRole {
    Region,
    Annual,
    Month(u32),
    Blank,
}

/// Month values of one yearly table, after cleaning.
#[derive(Debug, Clone, PartialEq)]
pub struct YearTable {
    pub year: i32,
    /// Canonical region names in table order.
    pub regions: Vec<String>,
    /// Month number to one value per region.
    pub months: BTreeMap<u32, Vec<Option<f64>>>,
}

#[derive(Debug, Clone)]
pub struct SchemaNormalizer<R> {
    reader: R,
    banner_sentinels: Vec<String>,
    column_order: Option<Vec<String>>,
}

impl<R: TableReader> SchemaNormalizer<R> {
    pub fn new(reader: R, config: &KindConfig) -> Self {
        Self {
            reader,
            banner_sentinels: config.banner_sentinels.clone(),
            column_order: config.column_order.clone(),
        }
    }

    /// Normalizes every table directly inside `directory`.
    ///
    /// Files are visited in name order. Files without a table extension are
    /// ignored and unreadable tables are skipped with a warning; any schema
    /// problem in a readable table fails the whole run.
    pub fn normalize(&self, directory: &Path) -> Result<CanonicalSeries, ConaguaError> {
        let paths = table_files(directory)?;
        info!("Normalizing {} tables in {}", paths.len(), directory.display());

        let mut years = BTreeSet::new();
        let mut builder = SeriesBuilder::default();
        for path in paths {
            let table = match self.reader.read_path(&path) {
                Ok(table) => table,
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };
            let name = table.name().to_string();
            let year_table = self.normalize_table(table)?;
            if !years.insert(year_table.year) {
                return Err(ConaguaError::schema(
                    &name,
                    format!("year {} appears in more than one table", year_table.year),
                ));
            }
            add_year(&mut builder, year_table)?;
        }
        if years.is_empty() {
            warn!("No tables found in {}", directory.display());
        }

        let series = builder.build()?;
        match &self.column_order {
            Some(order) => series.reorder(order),
            None => Ok(series),
        }
    }

    /// Cleans one yearly table and indexes its values by month.
    pub fn normalize_table(&self, mut table: RawTable) -> Result<YearTable, ConaguaError> {
        let year = first_year(table.name()).ok_or_else(|| {
            ConaguaError::schema(table.name(), "no four-digit year in the table name")
        })?;

        table.promote_banner(&self.banner_sentinels);
        table.canonicalize_headers();
        table.canonicalize_column(REGION_COLUMN);

        let roles = resolve_headers(&table)?;
        let region_index = roles
            .iter()
            .position(|role| *role == HeaderRole::Region)
            .ok_or_else(|| ConaguaError::schema(table.name(), "missing region column"))?;
        if !roles.iter().any(|role| matches!(role, HeaderRole::Month(_))) {
            return Err(ConaguaError::schema(table.name(), "no month columns"));
        }

        let mut regions = Vec::new();
        let mut months: BTreeMap<u32, Vec<Option<f64>>> = BTreeMap::new();
        for row in table.rows() {
            let region = &row[region_index];
            if region.is_empty() || region == NATIONAL_ROW {
                continue;
            }
            if regions.contains(region) {
                return Err(ConaguaError::schema(
                    table.name(),
                    format!("region '{region}' appears twice"),
                ));
            }
            regions.push(region.clone());
            for (cell, role) in row.iter().zip(&roles) {
                if let HeaderRole::Month(month) = role {
                    let value = parse_cell(cell).ok_or_else(|| {
                        ConaguaError::schema(
                            table.name(),
                            format!("value '{cell}' of '{region}' is not a number"),
                        )
                    })?;
                    months.entry(*month).or_default().push(value);
                }
            }
        }

        debug!(
            "Table '{}' ({}) has {} regions and {} months",
            table.name(),
            year,
            regions.len(),
            months.len()
        );
        Ok(YearTable {
            year,
            regions,
            months,
        })
    }
}

/// Table files directly inside `directory`, sorted by name.
fn table_files(directory: &Path) -> Result<Vec<PathBuf>, ConaguaError> {
    let listing_error = |e| ConaguaError::DirectoryListing(directory.to_path_buf(), e);
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(directory).map_err(listing_error)? {
        let path = entry.map_err(listing_error)?.path();
        let is_table = path.is_file()
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(TableFormat::from_name)
                .is_some();
        if is_table {
            paths.push(path);
        } else {
            debug!("Ignoring {}", path.display());
        }
    }
    paths.sort();
    Ok(paths)
}

fn resolve_headers(table: &RawTable) -> Result<Vec<HeaderRole>, ConaguaError> {
    let mut roles = Vec::with_capacity(table.headers().len());
    for (index, header) in table.headers().iter().enumerate() {
        let role = match header.as_str() {
            REGION_COLUMN => HeaderRole::Region,
            ANNUAL_COLUMN => HeaderRole::Annual,
            "" if table.rows().iter().all(|row| row[index].trim().is_empty()) => {
                HeaderRole::Blank
            }
            other => number_for_abbreviation(other).map(HeaderRole::Month).ok_or_else(|| {
                ConaguaError::schema(table.name(), format!("unrecognized column '{other}'"))
            })?,
        };
        if role != HeaderRole::Blank && roles.contains(&role) {
            return Err(ConaguaError::schema(
                table.name(),
                format!("column '{header}' appears twice"),
            ));
        }
        roles.push(role);
    }
    Ok(roles)
}

/// `Some(None)` for a missing-value marker, `None` for text that is no number.
fn parse_cell(cell: &str) -> Option<Option<f64>> {
    let cell = cell.trim();
    if MISSING_MARKERS.contains(&cell.to_lowercase().as_str()) {
        return Some(None);
    }
    cell.parse().ok().map(Some)
}

fn add_year(builder: &mut SeriesBuilder, table: YearTable) -> Result<(), ConaguaError> {
    for region in &table.regions {
        builder.add_region(region);
    }
    for (month, values) in table.months {
        let period = Period::try_new(table.year, month).ok_or_else(|| {
            ConaguaError::schema(&table.year.to_string(), format!("invalid month {month}"))
        })?;
        let values: HashMap<String, Option<f64>> =
            table.regions.iter().cloned().zip(values).collect();
        builder.push(MonthRecord { period, values });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::SheetReader;
    use crate::test_support::yearly_csv;
    use std::fs;
    use tempfile::TempDir;

    fn normalizer() -> SchemaNormalizer<SheetReader> {
        SchemaNormalizer::new(SheetReader, &KindConfig::default())
    }

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_single_year_table() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        fs::write(
            dir.path().join("2020.csv"),
            yearly_csv(&[("Sonora", 10.0), ("Nacional", 50.0)]),
        )?;

        let series = normalizer().normalize(dir.path())?;

        assert_eq!(series.height(), 12);
        assert_eq!(series.regions(), vec!["sonora"]);
        let values: Vec<Option<f64>> = series.frame.column("sonora")?.f64()?.into_iter().collect();
        assert_eq!(values, vec![Some(10.0); 12]);
        let years: Vec<Option<i32>> = series.frame.column("year")?.i32()?.into_iter().collect();
        assert_eq!(years, vec![Some(2020); 12]);
        Ok(())
    }

    #[test]
    fn test_banner_row_is_promoted() -> Result<(), ConaguaError> {
        let table = RawTable::new(
            "1999.xls",
            strings(&["PRECIPITACIÓN A NIVEL NACIONAL Y POR ENTIDAD FEDERATIVA", "", ""]),
            vec![
                strings(&["ENTIDAD", "ENE", "ANUAL"]),
                strings(&["SONORA ", "4.2", "4.2"]),
                strings(&["NACIONAL", "9", "9"]),
            ],
        );

        let year_table = normalizer().normalize_table(table)?;

        assert_eq!(year_table.year, 1999);
        assert_eq!(year_table.regions, vec!["sonora"]);
        assert_eq!(year_table.months[&1], vec![Some(4.2)]);
        Ok(())
    }

    #[test]
    fn test_missing_markers_and_blank_columns() -> Result<(), ConaguaError> {
        let table = RawTable::new(
            "2001.csv",
            strings(&["Estado", "Ene", "Feb", "Mar", ""]),
            vec![
                strings(&["Yucatán", "-", "N/D", " 3.5 ", ""]),
                strings(&["", "", "", "", ""]),
            ],
        );

        let year_table = normalizer().normalize_table(table)?;

        assert_eq!(year_table.regions, vec!["yucatan"]);
        assert_eq!(year_table.months[&1], vec![None]);
        assert_eq!(year_table.months[&2], vec![None]);
        assert_eq!(year_table.months[&3], vec![Some(3.5)]);
        Ok(())
    }

    #[test]
    fn test_unrecognized_header_fails() {
        let table = RawTable::new(
            "2001.csv",
            strings(&["estado", "ene", "promedio"]),
            vec![strings(&["sonora", "1", "1"])],
        );
        let result = normalizer().normalize_table(table);
        assert!(
            matches!(result, Err(ConaguaError::SchemaMismatch { message, .. }) if message.contains("promedio"))
        );
    }

    #[test]
    fn test_missing_region_column_fails() {
        let table = RawTable::new("2001.csv", strings(&["ene", "feb"]), vec![strings(&["1", "2"])]);
        assert!(matches!(
            normalizer().normalize_table(table),
            Err(ConaguaError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_table_without_month_columns_fails() {
        let table = RawTable::new("2010.csv", strings(&["estado"]), vec![strings(&["sonora"])]);
        assert!(matches!(
            normalizer().normalize_table(table),
            Err(ConaguaError::SchemaMismatch { message, .. }) if message.contains("month")
        ));
    }

    #[test]
    fn test_banner_first_csv_keeps_every_month() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        fs::write(
            dir.path().join("2010.csv"),
            "PRECIPITACIÓN A NIVEL NACIONAL Y POR ENTIDAD FEDERATIVA\n\
             ENTIDAD,ENE,FEB,ANUAL\n\
             SONORA ,1.5,2.5,4\n\
             NACIONAL,9,9,18\n",
        )?;

        let series = normalizer().normalize(dir.path())?;

        assert_eq!(series.height(), 2);
        assert_eq!(series.regions(), vec!["sonora"]);
        let values: Vec<Option<f64>> = series.frame.column("sonora")?.f64()?.into_iter().collect();
        assert_eq!(values, vec![Some(1.5), Some(2.5)]);
        Ok(())
    }

    #[test]
    fn test_unparseable_year_fails() {
        let table = RawTable::new("resumen.csv", strings(&["estado", "ene"]), vec![]);
        assert!(matches!(
            normalizer().normalize_table(table),
            Err(ConaguaError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_non_numeric_cell_fails() {
        let table = RawTable::new(
            "2001.csv",
            strings(&["estado", "ene"]),
            vec![strings(&["sonora", "mucho"])],
        );
        assert!(matches!(
            normalizer().normalize_table(table),
            Err(ConaguaError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_duplicate_year_fails() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("2020.csv"), yearly_csv(&[("Sonora", 1.0)]))?;
        fs::write(dir.path().join("2020Precip.csv"), yearly_csv(&[("Sonora", 2.0)]))?;

        let result = normalizer().normalize(dir.path());

        assert!(matches!(result, Err(ConaguaError::SchemaMismatch { .. })));
        Ok(())
    }

    #[test]
    fn test_multiple_years_are_sorted_and_other_files_ignored(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("2021.csv"), yearly_csv(&[("Yucatán", 2.0)]))?;
        fs::write(
            dir.path().join("2020.csv"),
            yearly_csv(&[("Sonora", 1.0), ("Yucatán", 3.0)]),
        )?;
        fs::write(dir.path().join("LEEME.txt"), "notas")?;
        fs::write(dir.path().join("1990.xls"), "not really a workbook")?;
        fs::create_dir(dir.path().join("2019.csv"))?;

        let series = normalizer().normalize(dir.path())?;

        assert_eq!(series.height(), 24);
        assert_eq!(series.regions(), vec!["sonora", "yucatan"]);
        let sonora: Vec<Option<f64>> = series.frame.column("sonora")?.f64()?.into_iter().collect();
        assert_eq!(sonora[11], Some(1.0));
        assert_eq!(sonora[12], None);
        Ok(())
    }

    #[test]
    fn test_normalizing_twice_is_identical() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("2020.csv"), yearly_csv(&[("Sonora", 1.5)]))?;
        fs::write(dir.path().join("2021.csv"), yearly_csv(&[("Jalisco", 7.0)]))?;

        let first = normalizer().normalize(dir.path())?;
        let second = normalizer().normalize(dir.path())?;

        assert!(first.frame.equals_missing(&second.frame));
        Ok(())
    }

    #[test]
    fn test_configured_column_order() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        fs::write(
            dir.path().join("2020.csv"),
            yearly_csv(&[("Sonora", 1.0), ("Jalisco", 2.0)]),
        )?;
        let config = KindConfig {
            column_order: Some(strings(&["jalisco", "sonora", "month"])),
            ..KindConfig::default()
        };

        let series = SchemaNormalizer::new(SheetReader, &config).normalize(dir.path())?;

        assert_eq!(
            series.frame.get_column_names_str(),
            vec!["date", "jalisco", "sonora", "month"]
        );
        Ok(())
    }
}
