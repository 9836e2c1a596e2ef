//! Run configuration: resource locations, banner strings, output column order
//! and the forecast retry window.

use crate::types::data_kind::DataKind;
use log::info;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable consulted when no config path is given explicitly.
pub const CONFIG_ENV_VAR: &str = "CONAGUA_CONFIG";
/// Config file looked up in the current directory as a last resort.
pub const DEFAULT_CONFIG_FILE: &str = "conagua.json";

const RAIN_BANNER: &str = "precipitación a nivel nacional y por entidad federativa";
const TEMPERATURE_BANNER: &str =
    "temperatura media promedio a nivel nacional y por entidad federativa";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{0}'")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config file '{0}'")]
    Parse(PathBuf, #[source] serde_json::Error),

    #[error("No {what} configured for {kind} data")]
    MissingLocation { kind: DataKind, what: &'static str },

    #[error("Retry window must be at least one month")]
    EmptyWindow,
}

/// Settings of one [`DataKind`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct KindConfig {
    /// Location of the historical zip archive.
    pub archive_url: Option<String>,
    /// Title strings that mark a banner row read as header.
    pub banner_sentinels: Vec<String>,
    /// Output columns after `date`, in order. `None` keeps the natural order.
    pub column_order: Option<Vec<String>>,
    /// Sub-type used in the forecast location (`{kind}`).
    pub forecast_kind: String,
    /// Column of the forecast tables holding the forecast amount.
    pub forecast_value_column: String,
}

impl Default for KindConfig {
    fn default() -> Self {
        Self {
            archive_url: None,
            banner_sentinels: vec![RAIN_BANNER.to_string(), TEMPERATURE_BANNER.to_string()],
            column_order: None,
            forecast_kind: "Lluvia".to_string(),
            forecast_value_column: "pronostico (mm)".to_string(),
        }
    }
}

/// Top-level configuration, read from JSON.
///
/// Every field is optional in the file; missing fields take the defaults of
/// [`Config::default`].
///
/// # Examples
///
/// ```
/// use conagua::{Config, DataKind};
///
/// let config: Config = serde_json::from_str(r#"{
///     "retry_window": 3,
///     "precipitation": { "archive_url": "https://example.org/lluvia.zip" }
/// }"#).unwrap();
///
/// assert_eq!(config.retry_window, 3);
/// assert_eq!(config.bulletin_start_year, 2024);
/// assert_eq!(
///     config.for_kind(DataKind::Precipitation).forecast_value_column,
///     "pronostico (mm)"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Template of the yearly bulletin tables, with `{folder}` and `{year}`.
    pub bulletin_url: Option<String>,
    /// First year for which bulletin tables are read.
    pub bulletin_start_year: i32,
    /// Template of the monthly forecast bundles, with `{year}`, `{month}`,
    /// `{month_name}`, `{season}` and `{kind}`.
    pub forecast_url: Option<String>,
    /// Number of months the forecast search goes back.
    pub retry_window: u32,
    pub precipitation: KindConfig,
    pub temperature: KindConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bulletin_url: None,
            bulletin_start_year: 2024,
            forecast_url: None,
            retry_window: 2,
            precipitation: KindConfig::default(),
            temperature: KindConfig::default(),
        }
    }
}

impl Config {
    /// Loads the configuration.
    ///
    /// An explicit `path` must exist. Otherwise `$CONAGUA_CONFIG` is used when
    /// set, then `conagua.json` in the current directory; when neither exists
    /// the defaults are returned.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));
        match explicit {
            Some(path) => Self::from_file(&path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::from_file(fallback)
                } else {
                    info!("No config file found, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        let config: Config =
            serde_json::from_str(&text).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry_window == 0 {
            return Err(ConfigError::EmptyWindow);
        }
        Ok(())
    }

    pub fn for_kind(&self, kind: DataKind) -> &KindConfig {
        match kind {
            DataKind::Precipitation => &self.precipitation,
            DataKind::Temperature => &self.temperature,
        }
    }

    pub(crate) fn archive_url(&self, kind: DataKind) -> Result<&str, ConfigError> {
        self.for_kind(kind)
            .archive_url
            .as_deref()
            .ok_or(ConfigError::MissingLocation {
                kind,
                what: "archive_url",
            })
    }

    pub(crate) fn forecast_url(&self, kind: DataKind) -> Result<&str, ConfigError> {
        self.forecast_url
            .as_deref()
            .ok_or(ConfigError::MissingLocation {
                kind,
                what: "forecast_url",
            })
    }
}

/// Replaces every `{key}` of `template` with its value.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    values
        .iter()
        .fold(template.to_string(), |acc, (key, value)| {
            acc.replace(&format!("{{{key}}}"), value)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.retry_window, 2);
        assert!(config.forecast_url.is_none());
        assert_eq!(config.temperature.banner_sentinels.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_render() {
        let rendered = render(
            "https://host/{folder}/{year}.pdf",
            &[("folder", "PREC"), ("year", "2025")],
        );
        assert_eq!(rendered, "https://host/PREC/2025.pdf");
        assert_eq!(render("{unknown}", &[("year", "1")]), "{unknown}");
    }

    #[test]
    fn test_from_file_and_missing_location() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = NamedTempFile::new()?;
        write!(
            file,
            r#"{{"temperature": {{"archive_url": "https://host/t.zip", "column_order": ["year", "month", "sonora"]}}}}"#
        )?;

        let config = Config::from_file(file.path())?;
        assert_eq!(config.archive_url(DataKind::Temperature)?, "https://host/t.zip");
        assert_eq!(
            config.temperature.column_order,
            Some(vec!["year".to_string(), "month".to_string(), "sonora".to_string()])
        );
        assert!(matches!(
            config.archive_url(DataKind::Precipitation),
            Err(ConfigError::MissingLocation { what: "archive_url", .. })
        ));
        Ok(())
    }

    #[test]
    fn test_zero_window_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = NamedTempFile::new()?;
        write!(file, r#"{{"retry_window": 0}}"#)?;
        assert!(matches!(
            Config::from_file(file.path()),
            Err(ConfigError::EmptyWindow)
        ));
        Ok(())
    }

    #[test]
    fn test_explicit_missing_path_fails() {
        let result = Config::load(Some(Path::new("/definitely/not/here/conagua.json")));
        assert!(matches!(result, Err(ConfigError::Read(_, _))));
    }
}
