//! Headless Wizard Beams combat runner.
//!
//! Plays AI-vs-AI fights without graphics for balance testing and CI.
//!
//! # Usage
//!
//! ```bash
//! # Run a single fight and print its metrics as JSON
//! cargo run -p wb_headless -- run --tier 2 --seed 42
//!
//! # Run a batch balance test
//! cargo run -p wb_headless -- batch --tier 1 --count 1000 --output results/
//!
//! # Verify that a seed replays identically
//! cargo run -p wb_headless -- verify --seed 12345 --runs 5
//! ```
//!
//! Output (stdout): JSON
//! Logs (stderr): tracing, `RUST_LOG` overrides the level

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wb_core::balance::BalanceConfig;
use wb_headless::batch::{run_batch, verify_determinism, BatchConfig, RESULTS_FILE};
use wb_headless::game_runner::{run_game, GameConfig, DEFAULT_MAX_SECONDS};

#[derive(Parser)]
#[command(name = "wb_headless")]
#[command(about = "Headless Wizard Beams combat runner for balance testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single AI-vs-AI fight
    Run {
        /// Enemy tier both sides are rolled from
        #[arg(short, long, default_value = "1")]
        tier: u8,

        /// Random seed
        #[arg(short, long, default_value = "0")]
        seed: u64,

        /// Maximum fight duration in simulated seconds
        #[arg(long, default_value_t = DEFAULT_MAX_SECONDS)]
        max_seconds: u32,

        /// Make the enemy an elite
        #[arg(long)]
        elite: bool,

        /// Balance RON file (defaults to the built-in table)
        #[arg(short, long)]
        balance: Option<PathBuf>,
    },

    /// Run a batch of fights for balance testing
    Batch {
        /// Enemy tier both sides are rolled from
        #[arg(short, long, default_value = "1")]
        tier: u8,

        /// Number of fights to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Maximum parallel fights (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Starting random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Maximum fight duration in simulated seconds
        #[arg(long, default_value_t = DEFAULT_MAX_SECONDS)]
        max_seconds: u32,

        /// Make every enemy an elite
        #[arg(long)]
        elite: bool,

        /// Balance RON file (defaults to the built-in table)
        #[arg(short, long)]
        balance: Option<PathBuf>,
    },

    /// Verify determinism by running the same seed multiple times
    Verify {
        /// Enemy tier both sides are rolled from
        #[arg(short, long, default_value = "1")]
        tier: u8,

        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is for JSON
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let outcome = match cli.command {
        Commands::Run {
            tier,
            seed,
            max_seconds,
            elite,
            balance,
        } => cmd_run(tier, seed, max_seconds, elite, balance),
        Commands::Batch {
            tier,
            count,
            parallel,
            output,
            seed,
            max_seconds,
            elite,
            balance,
        } => {
            let config = BatchConfig {
                tier,
                combat_count: count,
                parallel,
                output_dir: output,
                seed_start: seed,
                max_seconds,
                elite_enemy: elite,
                balance_path: balance,
            };
            cmd_batch(config)
        }
        Commands::Verify { tier, seed, runs } => cmd_verify(tier, seed, runs),
    };

    match outcome {
        Ok(code) => code,
        Err(message) => {
            tracing::error!("{message}");
            ExitCode::FAILURE
        }
    }
}

/// Run a single fight and print its metrics.
fn cmd_run(
    tier: u8,
    seed: u64,
    max_seconds: u32,
    elite: bool,
    balance: Option<PathBuf>,
) -> Result<ExitCode, String> {
    let balance = match balance {
        Some(path) => BalanceConfig::load(&path).map_err(|e| e.to_string())?,
        None => BalanceConfig::default(),
    };
    balance.validate().map_err(|e| e.to_string())?;

    let mut config = GameConfig::new(tier, seed)
        .with_max_seconds(max_seconds)
        .with_balance(balance);
    config.elite_enemy = elite;

    let metrics = run_game(&config).map_err(|e| e.to_string())?;
    let json = serde_json::to_string_pretty(&metrics).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(ExitCode::SUCCESS)
}

/// Run a batch and save `batch.json` into the output directory.
fn cmd_batch(config: BatchConfig) -> Result<ExitCode, String> {
    let output = config.output_dir.clone();
    std::fs::create_dir_all(&output)
        .map_err(|e| format!("Cannot create output directory '{}': {e}", output.display()))?;

    let results = run_batch(config).map_err(|e| e.to_string())?;
    let path = output.join(RESULTS_FILE);
    results.save(&path).map_err(|e| e.to_string())?;

    let summary = &results.summary;
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Combats played: {}", summary.total_combats);
    if !results.errors.is_empty() {
        eprintln!("Combats FAILED: {}", results.errors.len());
        for error in results.errors.iter().take(10) {
            eprintln!("  #{} (seed {}): {}", error.combat_index, error.seed, error.message);
        }
    }
    eprintln!("Duration: {:.1}s", results.duration_seconds);
    eprintln!("\nWin Rates:");
    for (side, rate) in &summary.win_rates {
        eprintln!("  {side}: {:.1}%", rate * 100.0);
    }
    eprintln!("  timeouts: {}", summary.timeouts);
    eprintln!("Average fight: {:.1}s", summary.avg_duration_seconds);
    eprintln!("\nResults saved to: {}", path.display());

    if results.errors.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Verify determinism.
fn cmd_verify(tier: u8, seed: u64, runs: u32) -> Result<ExitCode, String> {
    tracing::info!(tier, seed, runs, "Verifying determinism");
    let config = GameConfig::new(tier, seed);
    if verify_determinism(&config, runs).map_err(|e| e.to_string())? {
        eprintln!("PASS: All {runs} runs produced identical results");
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        Ok(ExitCode::FAILURE)
    }
}
