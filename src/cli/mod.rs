//! Command line interface.

pub mod command;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use conagua::DataKind;
use std::path::PathBuf;

pub const DEFAULT_OUTPUT: &str = "conagua_data.csv";

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Contains the commands
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download, merge and normalize a dataset
    Download {
        /// Data type: lluvia/precipitacion or temperatura
        #[arg(short, long)]
        kind: DataKind,
        /// Merge the latest monthly forecast (rainfall only)
        #[arg(short, long)]
        forecast: bool,
        /// Working directory for the downloaded tables
        #[arg(short, long)]
        dir: Option<PathBuf>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Normalize tables already present in a directory
    Normalize {
        /// Data type: lluvia/precipitacion or temperatura
        #[arg(short, long)]
        kind: DataKind,
        /// Directory holding one table per year
        #[arg(short, long)]
        dir: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args)]
pub struct OutputArgs {
    /// First date kept, YYYY-MM-DD
    #[arg(long)]
    pub start_date: Option<NaiveDate>,
    /// Last date kept, YYYY-MM-DD
    #[arg(long)]
    pub end_date: Option<NaiveDate>,
    /// Output file, Parquet when it ends in .parquet
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,
    /// Config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_download() {
        let cli = Cli::parse_from([
            "conagua",
            "download",
            "--kind",
            "lluvia",
            "--forecast",
            "--start-date",
            "2020-01-01",
        ]);
        match cli.command {
            Commands::Download {
                kind,
                forecast,
                dir,
                output,
            } => {
                assert_eq!(kind, DataKind::Precipitation);
                assert!(forecast);
                assert!(dir.is_none());
                assert_eq!(output.start_date, NaiveDate::from_ymd_opt(2020, 1, 1));
                assert_eq!(output.output, PathBuf::from(DEFAULT_OUTPUT));
            }
            Commands::Normalize { .. } => panic!("expected download"),
        }
    }

    #[test]
    fn test_rejects_unknown_kind() {
        let result = Cli::try_parse_from(["conagua", "normalize", "--kind", "viento", "--dir", "x"]);
        assert!(result.is_err());
    }
}
