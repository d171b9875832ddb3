mod cli;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use cli::{Cli, Commands};
use deck_core::DeckConfig;
use deck_core::logging;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = DeckConfig::load()?;
    let _log_guard = logging::init_logging(&config)?;
    info!("Starting deck v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Classify { data } => {
            let decision = cli::run_classify(&data)?;
            println!("{}", serde_json::to_string_pretty(&decision)?);
        }
        Commands::Chart {
            data,
            output,
            title,
        } => {
            cli::run_chart(&data, &output, title.as_deref())?;
            println!("{}", output.display());
        }
        Commands::Image {
            prompt,
            output,
            blocking,
        } => {
            let saved = cli::run_image(&config, &prompt, &output, blocking)?;
            println!("{}", saved.display());
        }
    }

    Ok(())
}
