//! Monthly forecast bundles: decoding the zip of per-state CSV tables and
//! folding the forecast values into the table of the latest year.

use crate::error::ConaguaError;
use crate::table::{RawTable, TableFormat, TableReader, NATIONAL_ROW, REGION_COLUMN};
use crate::text::canonical;
use crate::types::months::abbreviation_for_name;
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::io::{Cursor, Read};
use std::path::Path;
use zip::ZipArchive;

/// Folder names holding the per-state statistics inside a bundle. The second
/// spelling occurs in published bundles.
const STATISTICS_FOLDERS: [&str; 2] = ["ESTADISTICAS", "ESTADISITCAS"];
const STATES_SEGMENT: &str = "Estados";
const STATE_CODE_COLUMN: &str = "cv_estado";
const UNNAMED_INDEX_COLUMN: &str = "unnamed: 0";

/// Identifies one forecast table of a bundle.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ForecastKey {
    /// Forecast sub-type, lower-cased (`"lluvia"`).
    pub kind: String,
    pub year: i32,
    /// Canonical Spanish month name (`"marzo"`).
    pub month_name: String,
}

impl ForecastKey {
    /// Parses the key of a bundle entry such as
    /// `03-MAM-Pronostico-de-Marzo-2025-Lluvia/ESTADISTICAS/Lluvia_Estados_marzo_2025.csv`.
    ///
    /// The kind is the last `-` piece of the parent path up to its first `/`;
    /// month and year are the `_` segments 2 and 3 of the file stem.
    pub fn from_entry_name(name: &str) -> Option<Self> {
        let (parent, file_name) = name.rsplit_once('/')?;
        let kind = parent.rsplit('-').next()?.split('/').next()?.to_lowercase();
        let stem = Path::new(file_name).file_stem()?.to_str()?;
        let segments: Vec<&str> = stem.split('_').collect();
        let month_name = canonical(segments.get(2)?);
        let year = segments.get(3)?.trim().parse().ok()?;
        Some(Self {
            kind,
            year,
            month_name,
        })
    }
}

impl fmt::Display for ForecastKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.kind, self.year, self.month_name)
    }
}

/// Whether a bundle entry is a per-state forecast table.
pub fn is_forecast_entry(name: &str) -> bool {
    let Some((parent, file_name)) = name.rsplit_once('/') else {
        return false;
    };
    let in_statistics = parent
        .split('/')
        .any(|segment| STATISTICS_FOLDERS.iter().any(|f| segment.eq_ignore_ascii_case(f)));
    in_statistics
        && TableFormat::from_name(file_name) == Some(TableFormat::Csv)
        && file_name.split('_').any(|segment| segment == STATES_SEGMENT)
}

/// Forecast tables of one bundle, keyed by kind, year and month.
#[derive(Debug, Clone, Default)]
pub struct ForecastDataset {
    tables: BTreeMap<ForecastKey, RawTable>,
}

impl ForecastDataset {
    /// Decodes a downloaded bundle.
    ///
    /// # Errors
    ///
    /// Fails when the bytes are not a zip archive, a matching member cannot be
    /// read, or no member is a forecast table.
    pub fn from_archive<R: TableReader>(bytes: &[u8], reader: &R) -> Result<Self, ConaguaError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| ConaguaError::ForecastBundle(e.to_string()))?;

        let mut tables = BTreeMap::new();
        for index in 0..archive.len() {
            let mut entry = archive
                .by_index(index)
                .map_err(|e| ConaguaError::ForecastBundle(e.to_string()))?;
            let name = entry.name().to_string();
            if entry.is_dir() || !is_forecast_entry(&name) {
                continue;
            }
            let Some(key) = ForecastKey::from_entry_name(&name) else {
                warn!("Skipping forecast table with unexpected name '{}'", name);
                continue;
            };

            let mut content = Vec::new();
            entry
                .read_to_end(&mut content)
                .map_err(|e| ConaguaError::ForecastBundle(format!("{name}: {e}")))?;
            let mut table = reader.read_bytes(&name, &content)?;
            prepare_table(&mut table);
            debug!("Forecast table {} has {} rows", key, table.height());
            tables.insert(key, table);
        }

        if tables.is_empty() {
            return Err(ConaguaError::ForecastBundle(
                "no per-state forecast tables found".to_string(),
            ));
        }
        info!("Decoded {} forecast tables", tables.len());
        Ok(Self { tables })
    }

    pub fn insert(&mut self, key: ForecastKey, table: RawTable) {
        self.tables.insert(key, table);
    }

    pub fn keys(&self) -> impl Iterator<Item = &ForecastKey> {
        self.tables.keys()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Region names of the first table, national row excluded.
    pub fn regions(&self) -> Vec<String> {
        self.tables
            .values()
            .next()
            .and_then(|table| table.column(REGION_COLUMN))
            .map(|cells| {
                cells
                    .into_iter()
                    .filter(|cell| {
                        let region = canonical(cell);
                        !region.is_empty() && region != NATIONAL_ROW
                    })
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Canonicalizes headers, names the unlabeled index column and drops the state
/// code column.
fn prepare_table(table: &mut RawTable) {
    table.canonicalize_headers();
    if let Some(first) = table.headers().first() {
        if first.is_empty() || first == UNNAMED_INDEX_COLUMN {
            table.set_header(0, REGION_COLUMN);
        }
    }
    table.drop_column(STATE_CODE_COLUMN);
}

/// Writes forecast values into a yearly table, one month column per key.
#[derive(Debug, Clone)]
pub struct ForecastMerger {
    value_column: String,
}

impl Default for ForecastMerger {
    fn default() -> Self {
        Self::new("pronostico (mm)")
    }
}

impl ForecastMerger {
    pub fn new(value_column: &str) -> Self {
        Self {
            value_column: canonical(value_column),
        }
    }

    /// Merges `dataset` into `target`, aligning rows on the canonical region.
    ///
    /// All columns are computed before `target` is touched; on error it is left
    /// unchanged. Target rows without a forecast value get an empty cell.
    /// Returns the month columns written.
    pub fn merge(
        &self,
        target: &mut RawTable,
        dataset: ForecastDataset,
    ) -> Result<Vec<&'static str>, ConaguaError> {
        let target_regions: Vec<String> = target
            .column(REGION_COLUMN)
            .ok_or_else(|| ConaguaError::schema(target.name(), "missing region column"))?
            .into_iter()
            .map(canonical)
            .collect();
        let known: HashSet<&str> = target_regions.iter().map(String::as_str).collect();

        let mut columns: Vec<(&'static str, Vec<String>)> = Vec::new();
        for (key, table) in &dataset.tables {
            let abbreviation = abbreviation_for_name(&key.month_name)
                .ok_or_else(|| ConaguaError::UnmappedMonthName(key.month_name.clone()))?;
            let values = self.values_by_region(table)?;

            if let Some(region) = values
                .keys()
                .find(|region| *region != NATIONAL_ROW && !known.contains(region.as_str()))
            {
                return Err(ConaguaError::schema(
                    target.name(),
                    format!("forecast region '{region}' has no row"),
                ));
            }

            // The national row is an aggregate; a forecast total would not
            // match the bulletin's own, so it stays empty.
            let column = target_regions
                .iter()
                .map(|region| match region.as_str() {
                    NATIONAL_ROW => String::new(),
                    _ => values.get(region).cloned().unwrap_or_default(),
                })
                .collect();
            debug!("Forecast {} fills column '{}'", key, abbreviation);
            columns.push((abbreviation, column));
        }

        let written = columns.iter().map(|(header, _)| *header).collect();
        for (header, values) in columns {
            target.set_column(header, values)?;
        }
        info!("Merged forecast columns {:?} into '{}'", written, target.name());
        Ok(written)
    }

    fn values_by_region(&self, table: &RawTable) -> Result<HashMap<String, String>, ConaguaError> {
        let regions = table
            .column(REGION_COLUMN)
            .ok_or_else(|| ConaguaError::schema(table.name(), "missing region column"))?;
        let values = table.column(&self.value_column).ok_or_else(|| {
            ConaguaError::schema(
                table.name(),
                format!("missing value column '{}'", self.value_column),
            )
        })?;
        Ok(regions
            .into_iter()
            .zip(values)
            .map(|(region, value)| (canonical(region), value.trim().to_string()))
            .filter(|(region, _)| !region.is_empty())
            .collect())
    }
}
