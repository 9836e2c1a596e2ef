//! Fixed month lookup tables used by the bulletins, the forecast bundles and the
//! yearly spreadsheets.
//!
//! Month numbers are 1-based everywhere (`1` = January).

use crate::text::canonical;

/// Spanish month names as they appear in forecast bundle locations.
pub const MONTH_NAMES: [&str; 12] = [
    "Enero",
    "Febrero",
    "Marzo",
    "Abril",
    "Mayo",
    "Junio",
    "Julio",
    "Agosto",
    "Septiembre",
    "Octubre",
    "Noviembre",
    "Diciembre",
];

/// Three-letter column headers of the yearly tables.
pub const MONTH_ABBREVIATIONS: [&str; 12] = [
    "ene", "feb", "mar", "abr", "may", "jun", "jul", "ago", "sep", "oct", "nov", "dic",
];

/// Three-month season codes that prefix forecast bundle names.
pub const SEASON_CODES: [&str; 12] = [
    "01-EFM", "02-FMA", "03-MAM", "04-AMJ", "05-MJJ", "06-JJA", "07-JAS", "08-ASO", "09-SON",
    "10-OND", "11-NDE", "12-DEF",
];

fn index_of(month: u32) -> Option<usize> {
    (1..=12).contains(&month).then(|| month as usize - 1)
}

/// Spanish name for a month number, e.g. `3` -> `"Marzo"`.
pub fn month_name(month: u32) -> Option<&'static str> {
    index_of(month).map(|i| MONTH_NAMES[i])
}

/// Season code for a month number, e.g. `3` -> `"03-MAM"`.
pub fn season_code(month: u32) -> Option<&'static str> {
    index_of(month).map(|i| SEASON_CODES[i])
}

/// Maps a full month name in any casing (`"MARZO"`, `"marzo "`) to its column
/// abbreviation (`"mar"`).
///
/// # Examples
///
/// ```
/// use conagua::months::abbreviation_for_name;
///
/// assert_eq!(abbreviation_for_name("Marzo"), Some("mar"));
/// assert_eq!(abbreviation_for_name("setiembre"), None);
/// ```
pub fn abbreviation_for_name(name: &str) -> Option<&'static str> {
    let name = canonical(name);
    MONTH_NAMES
        .iter()
        .position(|candidate| candidate.to_lowercase() == name)
        .map(|i| MONTH_ABBREVIATIONS[i])
}

/// Maps a canonical column abbreviation (`"ago"`) to its month number (`8`).
pub fn number_for_abbreviation(abbreviation: &str) -> Option<u32> {
    MONTH_ABBREVIATIONS
        .iter()
        .position(|candidate| *candidate == abbreviation)
        .map(|i| i as u32 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_to_abbreviation() {
        assert_eq!(abbreviation_for_name("enero"), Some("ene"));
        assert_eq!(abbreviation_for_name("SEPTIEMBRE"), Some("sep"));
        assert_eq!(abbreviation_for_name(" diciembre "), Some("dic"));
        assert_eq!(abbreviation_for_name("january"), None);
    }

    #[test]
    fn test_abbreviation_to_number() {
        for (i, abbreviation) in MONTH_ABBREVIATIONS.iter().enumerate() {
            assert_eq!(number_for_abbreviation(abbreviation), Some(i as u32 + 1));
        }
        assert_eq!(number_for_abbreviation("anual"), None);
    }

    #[test]
    fn test_out_of_range_months() {
        assert_eq!(month_name(0), None);
        assert_eq!(season_code(13), None);
        assert_eq!(month_name(12), Some("Diciembre"));
        assert_eq!(season_code(1), Some("01-EFM"));
    }
}
