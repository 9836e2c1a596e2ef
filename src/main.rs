mod cli;

use clap::Parser;
use cli::{command, Cli, Commands};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Download {
            kind,
            forecast,
            dir,
            output,
        } => command::download(kind, forecast, dir, &output).await,
        Commands::Normalize { kind, dir, output } => command::normalize(kind, dir, &output),
    };

    match result {
        Ok(path) => {
            println!("File saved to `{}`", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
