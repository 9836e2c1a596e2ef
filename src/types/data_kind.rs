//! Defines the kinds of climate records CONAGUA publishes and the naming
//! conventions attached to each of them.

use crate::text::canonical;
use std::fmt;
use std::str::FromStr;

/// The measured quantity of a dataset.
///
/// Selects which archive, bulletin folder and banner strings a run uses, and
/// whether forecast bundles can be merged into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    /// Monthly accumulated rainfall in millimetres.
    Precipitation,
    /// Monthly mean temperature in degrees Celsius.
    Temperature,
}

impl DataKind {
    /// Folder of the yearly bulletins on the publisher's site.
    pub(crate) fn bulletin_folder(&self) -> &'static str {
        match self {
            DataKind::Precipitation => "PREC",
            DataKind::Temperature => "TMED",
        }
    }

    /// Working directory name used when the caller does not pick one.
    pub fn default_folder(&self) -> &'static str {
        match self {
            DataKind::Precipitation => "Precipitacion",
            DataKind::Temperature => "Temperatura",
        }
    }

    /// Suffix of the per-year tables a run writes, `<year><suffix>.csv`.
    pub(crate) fn file_suffix(&self) -> &'static str {
        match self {
            DataKind::Precipitation => "Precip",
            DataKind::Temperature => "Tmed",
        }
    }

    /// Only rainfall has a monthly forecast that can be merged.
    pub fn accepts_forecast(&self) -> bool {
        matches!(self, DataKind::Precipitation)
    }

    pub(crate) fn config_key(&self) -> &'static str {
        match self {
            DataKind::Precipitation => "precipitation",
            DataKind::Temperature => "temperature",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.config_key())
    }
}

/// Error returned when a string names no known [`DataKind`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid data type: {0}")]
pub struct UnknownDataKind(pub String);

/// Parses the Spanish and English aliases accepted on the command line.
///
/// # Examples
///
/// ```
/// use conagua::DataKind;
///
/// assert_eq!("lluvia".parse::<DataKind>().unwrap(), DataKind::Precipitation);
/// assert_eq!("Precipitación".parse::<DataKind>().unwrap(), DataKind::Precipitation);
/// assert_eq!("temp".parse::<DataKind>().unwrap(), DataKind::Temperature);
/// assert!("wind".parse::<DataKind>().is_err());
/// ```
impl FromStr for DataKind {
    type Err = UnknownDataKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match canonical(s).as_str() {
            "precipitacion" | "precipitation" | "rain" | "lluvia" | "prec" => {
                Ok(DataKind::Precipitation)
            }
            "temperatura" | "temp" | "temperature" | "tmed" => Ok(DataKind::Temperature),
            _ => Err(UnknownDataKind(s.to_string())),
        }
    }
}
