//! Batch fight runner for balance testing.
//!
//! Runs many seeded fights in parallel using rayon and aggregates the
//! metrics into a [`BatchSummary`].

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use wb_core::balance::BalanceConfig;
use wb_core::error::{CombatError, Result};

use crate::game_runner::{run_game, GameConfig, DEFAULT_MAX_SECONDS};
use crate::metrics::{BatchSummary, CombatMetrics};

/// File name written into the output directory.
pub const RESULTS_FILE: &str = "batch.json";

/// Configuration for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Tier both combatants are rolled from.
    pub tier: u8,
    /// Number of fights to run.
    pub combat_count: u32,
    /// Maximum parallel fights (0 = use rayon default).
    pub parallel: u32,
    /// Output directory for results.
    pub output_dir: PathBuf,
    /// Starting seed; fight `i` uses `seed_start + i`.
    pub seed_start: u64,
    /// Simulated seconds per fight before timeout.
    pub max_seconds: u32,
    /// Apply the elite row to every enemy.
    pub elite_enemy: bool,
    /// Balance file to load instead of the defaults.
    pub balance_path: Option<PathBuf>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            tier: 1,
            combat_count: 100,
            parallel: 0,
            output_dir: PathBuf::from("results"),
            seed_start: 0,
            max_seconds: DEFAULT_MAX_SECONDS,
            elite_enemy: false,
            balance_path: None,
        }
    }
}

impl BatchConfig {
    /// Create config for a tier.
    #[must_use]
    pub fn new(tier: u8, combat_count: u32) -> Self {
        Self {
            tier,
            combat_count,
            ..Default::default()
        }
    }

    /// Set output directory.
    #[must_use]
    pub fn with_output(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    /// Set seed start.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set the per-fight time limit.
    #[must_use]
    pub fn with_max_seconds(mut self, seconds: u32) -> Self {
        self.max_seconds = seconds;
        self
    }

    fn game_config(&self, index: u32, balance: &BalanceConfig) -> GameConfig {
        let seed = self.seed_start.wrapping_add(u64::from(index));
        let mut config = GameConfig::new(self.tier, seed)
            .with_max_seconds(self.max_seconds)
            .with_balance(balance.clone());
        config.combat_id = format!("combat_{index:05}");
        config.elite_enemy = self.elite_enemy;
        config
    }
}

/// Results from a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used.
    pub config: BatchConfig,
    /// Individual fight metrics, in seed order.
    pub combats: Vec<CombatMetrics>,
    /// Aggregate summary.
    pub summary: BatchSummary,
    /// Total wall-clock runtime.
    pub duration_seconds: f64,
    /// Fights that could not be run.
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| CombatError::InvalidState(format!("batch results: {e}")))?;
        std::fs::write(path, json).map_err(|e| io_error(path, e))
    }

    /// Load results from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or malformed.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| io_error(path, e))?;
        serde_json::from_str(&json).map_err(|e| CombatError::DataParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

fn io_error(path: &Path, source: std::io::Error) -> CombatError {
    CombatError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// A fight that failed to run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Fight index.
    pub combat_index: u32,
    /// Seed used.
    pub seed: u64,
    /// Error message.
    pub message: String,
}

/// Progress tracking for batch runs.
#[derive(Debug)]
pub struct BatchProgress {
    /// Total fights.
    pub total: u32,
    completed: AtomicU32,
    start_time: Instant,
    partial_wins: Mutex<std::collections::BTreeMap<String, u32>>,
}

impl BatchProgress {
    /// Create new progress tracker.
    #[must_use]
    pub fn new(total: u32) -> Self {
        Self {
            total,
            completed: AtomicU32::new(0),
            start_time: Instant::now(),
            partial_wins: Mutex::new(std::collections::BTreeMap::new()),
        }
    }

    /// Record a completed fight.
    pub fn record_completion(&self, winner: Option<&str>) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        if let Some(w) = winner {
            if let Ok(mut wins) = self.partial_wins.lock() {
                *wins.entry(w.to_string()).or_insert(0) += 1;
            }
        }
    }

    /// Current completion count.
    pub fn current(&self) -> u32 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Completion percentage.
    pub fn percentage(&self) -> f64 {
        f64::from(self.current()) / f64::from(self.total.max(1)) * 100.0
    }

    /// Estimated time remaining.
    pub fn eta(&self) -> Duration {
        let completed = self.current();
        if completed == 0 {
            return Duration::from_secs(0);
        }
        let per_combat = self.start_time.elapsed().as_secs_f64() / f64::from(completed);
        let remaining = self.total.saturating_sub(completed);
        Duration::from_secs_f64(per_combat * f64::from(remaining))
    }

    /// Win rates over the fights finished so far.
    pub fn current_win_rates(&self) -> std::collections::BTreeMap<String, f64> {
        let completed = self.current();
        if completed == 0 {
            return std::collections::BTreeMap::new();
        }
        match self.partial_wins.lock() {
            Ok(wins) => wins
                .iter()
                .map(|(k, v)| (k.clone(), f64::from(*v) / f64::from(completed)))
                .collect(),
            Err(_) => std::collections::BTreeMap::new(),
        }
    }
}

/// Run a batch of fights.
///
/// # Errors
///
/// Returns an error if the balance file cannot be loaded or is invalid.
/// Individual fight failures are collected into [`BatchResults::errors`].
pub fn run_batch(config: BatchConfig) -> Result<BatchResults> {
    let start = Instant::now();
    let balance = match &config.balance_path {
        Some(path) => {
            let balance = BalanceConfig::load(path)?;
            info!(path = %path.display(), "Loaded balance table");
            balance
        }
        None => BalanceConfig::default(),
    };
    balance.validate()?;

    info!(
        tier = config.tier,
        count = config.combat_count,
        parallel = config.parallel,
        seed_start = config.seed_start,
        "Starting batch run"
    );

    let progress = BatchProgress::new(config.combat_count);
    let run_one = |index: u32| -> std::result::Result<CombatMetrics, BatchError> {
        let game = config.game_config(index, &balance);
        let seed = game.seed;
        match run_game(&game) {
            Ok(metrics) => {
                progress.record_completion(metrics.winner.as_deref());
                let completed = progress.current();
                if completed % 50 == 0 {
                    debug!(
                        completed,
                        total = progress.total,
                        pct = format!("{:.1}", progress.percentage()),
                        eta_secs = progress.eta().as_secs(),
                        rates = ?progress.current_win_rates(),
                        "Batch progress"
                    );
                }
                Ok(metrics)
            }
            Err(e) => {
                warn!(combat_index = index, seed, error = %e, "Combat failed");
                Err(BatchError {
                    combat_index: index,
                    seed,
                    message: e.to_string(),
                })
            }
        }
    };

    let collect = || -> Vec<_> { (0..config.combat_count).into_par_iter().map(run_one).collect() };
    let results = if config.parallel > 0 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel as usize)
            .build()
        {
            Ok(pool) => pool.install(collect),
            Err(e) => {
                warn!(error = %e, "Could not build thread pool, using the global one");
                collect()
            }
        }
    } else {
        collect()
    };

    let mut combats = Vec::with_capacity(results.len());
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(metrics) => combats.push(metrics),
            Err(e) => errors.push(e),
        }
    }

    let summary = BatchSummary::from_combats(&combats);
    let duration_seconds = start.elapsed().as_secs_f64();
    info!(
        combats = combats.len(),
        failed = errors.len(),
        secs = format!("{duration_seconds:.1}"),
        "Batch complete"
    );

    Ok(BatchResults {
        config,
        combats,
        summary,
        duration_seconds,
        errors,
    })
}

/// Run the same fight `runs` times and check every run ends identically.
///
/// # Errors
///
/// Returns an error if a fight cannot be built.
pub fn verify_determinism(config: &GameConfig, runs: u32) -> Result<bool> {
    let mut first: Option<CombatMetrics> = None;
    for _ in 0..runs {
        let metrics = run_game(config)?;
        match &first {
            None => first = Some(metrics),
            Some(expected) => {
                if metrics.final_state_hash != expected.final_state_hash
                    || metrics.duration_ticks != expected.duration_ticks
                    || metrics.winner != expected.winner
                {
                    return Ok(false);
                }
            }
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_config_builder() {
        let config = BatchConfig::new(2, 500)
            .with_output(PathBuf::from("/tmp/results"))
            .with_seed(12345)
            .with_max_seconds(30);

        assert_eq!(config.tier, 2);
        assert_eq!(config.combat_count, 500);
        assert_eq!(config.seed_start, 12345);
        assert_eq!(config.game_config(3, &BalanceConfig::default()).seed, 12348);
    }

    #[test]
    fn test_progress_tracking() {
        let progress = BatchProgress::new(100);
        assert_eq!(progress.current(), 0);

        progress.record_completion(Some("player"));
        progress.record_completion(Some("enemy"));
        progress.record_completion(Some("player"));

        assert_eq!(progress.current(), 3);
        let rates = progress.current_win_rates();
        assert!((rates["player"] - 0.666).abs() < 0.01);
    }

    #[test]
    fn test_run_batch_small() {
        let config = BatchConfig::new(1, 6).with_max_seconds(10);
        let results = run_batch(config).unwrap();

        assert_eq!(results.combats.len(), 6);
        assert!(results.errors.is_empty());
        assert_eq!(results.summary.total_combats, 6);
        let seeds: Vec<u64> = results.combats.iter().map(|c| c.seed).collect();
        assert_eq!(seeds, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_bad_tier_fights_are_reported() {
        let results = run_batch(BatchConfig::new(7, 2).with_max_seconds(1)).unwrap();
        assert!(results.combats.is_empty());
        assert_eq!(results.errors.len(), 2);
    }

    #[test]
    fn test_parallel_pool_matches_default() {
        let serial = run_batch(BatchConfig::new(2, 4).with_max_seconds(8)).unwrap();
        let mut config = BatchConfig::new(2, 4).with_max_seconds(8);
        config.parallel = 2;
        let pooled = run_batch(config).unwrap();
        let hashes = |r: &BatchResults| -> Vec<u64> {
            r.combats.iter().map(|c| c.final_state_hash).collect()
        };
        assert_eq!(hashes(&serial), hashes(&pooled));
    }

    #[test]
    fn test_verify_determinism() {
        let config = GameConfig::new(3, 12345).with_max_seconds(10);
        assert!(verify_determinism(&config, 3).unwrap());
    }

    #[test]
    fn test_batch_results_save_load() {
        let results = run_batch(BatchConfig::new(1, 3).with_max_seconds(5)).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(RESULTS_FILE);

        results.save(&path).unwrap();
        assert!(path.exists());

        let loaded = BatchResults::load(&path).unwrap();
        assert_eq!(loaded.combats.len(), 3);
        assert_eq!(loaded.config.tier, 1);
    }
}
