//! Headless combat runner for AI testing and CI verification.
//!
//! Plays AI-vs-AI fights without a renderer and reports JSON metrics. This
//! enables:
//!
//! - **Balance testing**: thousands of seeded fights per tier in parallel
//! - **CI verification**: repeated runs of one seed must end identically
//!
//! # Example
//!
//! ```bash
//! # One fight, metrics on stdout
//! cargo run -p wb_headless -- run --tier 2 --seed 7
//!
//! # Balance batch
//! cargo run -p wb_headless -- batch --tier 2 --count 1000 --output results/
//!
//! # Determinism check
//! cargo run -p wb_headless -- verify --tier 3 --seed 12345 --runs 5
//! ```

pub mod batch;
pub mod game_runner;
pub mod metrics;

pub use batch::{run_batch, BatchConfig, BatchResults};
pub use game_runner::{run_game, GameConfig};
pub use metrics::{BatchSummary, CombatMetrics, MetricsCollector, SideMetrics};
