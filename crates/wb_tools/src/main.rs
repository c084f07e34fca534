//! Wizard Beams - Development Tools

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "wb-tools")]
#[command(about = "Development tools for Wizard Beams")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a balance RON file, or every RON file in a directory
    Validate {
        /// Balance file or data directory
        path: PathBuf,
    },
    /// Print the built-in balance table as RON
    DumpBalance {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { path } => {
            if path.is_dir() {
                tracing::info!("Validating balance files in: {}", path.display());
                match wb_tools::validate::validate_data_directory(&path) {
                    Ok(report) if report.is_ok() => {
                        tracing::info!(files = report.checked(), "Validation passed");
                    }
                    Ok(report) => {
                        for (file, reason) in &report.failed {
                            tracing::error!("{}: {reason}", file.display());
                        }
                        std::process::exit(1);
                    }
                    Err(e) => {
                        tracing::error!("Validation failed: {e}");
                        std::process::exit(1);
                    }
                }
            } else {
                tracing::info!("Validating balance file: {}", path.display());
                match wb_tools::validate::validate_balance_file(&path) {
                    Ok(_) => tracing::info!("Validation passed"),
                    Err(e) => {
                        tracing::error!("Validation failed: {e}");
                        std::process::exit(1);
                    }
                }
            }
        }
        Commands::DumpBalance { output } => {
            let text = match wb_tools::validate::dump_balance() {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!("Dump failed: {e}");
                    std::process::exit(1);
                }
            };
            match output {
                Some(path) => {
                    if let Err(e) = std::fs::write(&path, text) {
                        tracing::error!("Failed to write '{}': {e}", path.display());
                        std::process::exit(1);
                    }
                    tracing::info!("Balance table written to {}", path.display());
                }
                None => println!("{text}"),
            }
        }
    }
}
