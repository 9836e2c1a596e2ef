use crate::cli::OutputArgs;
use conagua::{CanonicalSeries, Conagua, ConaguaError, Config, DataKind};
use log::info;
use std::path::PathBuf;

/// Runs the full pipeline and writes the filtered series.
pub async fn download(
    kind: DataKind,
    forecast: bool,
    dir: Option<PathBuf>,
    output: &OutputArgs,
) -> Result<PathBuf, ConaguaError> {
    let client = Conagua::new(Config::load(output.config.as_deref())?);
    let series = client
        .run()
        .kind(kind)
        .include_forecast(forecast)
        .maybe_directory(dir)
        .call()
        .await?;
    save(series, output)
}

/// Normalizes an existing directory and writes the filtered series.
pub fn normalize(kind: DataKind, dir: PathBuf, output: &OutputArgs) -> Result<PathBuf, ConaguaError> {
    let client = Conagua::new(Config::load(output.config.as_deref())?);
    let series = client.normalize(kind, &dir)?;
    save(series, output)
}

fn save(series: CanonicalSeries, output: &OutputArgs) -> Result<PathBuf, ConaguaError> {
    let series = series.filter_dates(output.start_date, output.end_date)?;
    info!("Series has {} rows", series.height());
    series.write(&output.output)?;
    Ok(output.output.clone())
}
