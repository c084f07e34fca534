//! Single-fight execution for headless testing.
//!
//! Both combatants are rolled from the same enemy tier with a seeded random
//! source, driven by their tier AI, and stepped at [`TICK_RATE`] until the
//! fight ends or the time limit is hit.
//!
//! # Bounds
//!
//! - The tick loop is capped at `max_seconds * TICK_RATE` iterations
//! - Progress is logged every simulated ten seconds at debug level

use std::time::Instant;

use tracing::{debug, info};

use wb_core::ai::AiProfile;
use wb_core::balance::BalanceConfig;
use wb_core::components::Side;
use wb_core::data::enemy::{generate_enemy, make_elite, EnemyProfile};
use wb_core::error::Result;
use wb_core::math::Fixed;
use wb_core::rng::CombatRng;
use wb_core::simulation::{CombatSimulation, TICK_RATE};

use crate::metrics::{CombatMetrics, MetricsCollector};

/// Default fight length limit in simulated seconds.
pub const DEFAULT_MAX_SECONDS: u32 = 180;

/// Salt mixing the roster seed into the in-fight seed.
const COMBAT_SEED_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

/// Configuration for a single fight.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Fight ID for tracking.
    pub combat_id: String,
    /// Tier both combatants are rolled from.
    pub tier: u8,
    /// Random seed for determinism.
    pub seed: u64,
    /// Simulated seconds before timeout.
    pub max_seconds: u32,
    /// Apply the elite row to the enemy.
    pub elite_enemy: bool,
    /// Balance table.
    pub balance: BalanceConfig,
}

impl GameConfig {
    /// Config for a tier and seed with default balance.
    #[must_use]
    pub fn new(tier: u8, seed: u64) -> Self {
        Self {
            combat_id: format!("combat_t{tier}_{seed}"),
            tier,
            seed,
            max_seconds: DEFAULT_MAX_SECONDS,
            elite_enemy: false,
            balance: BalanceConfig::default(),
        }
    }

    /// Set the time limit.
    #[must_use]
    pub fn with_max_seconds(mut self, seconds: u32) -> Self {
        self.max_seconds = seconds;
        self
    }

    /// Set the balance table.
    #[must_use]
    pub fn with_balance(mut self, balance: BalanceConfig) -> Self {
        self.balance = balance;
        self
    }

    /// Max ticks implied by the time limit.
    #[must_use]
    pub fn max_ticks(&self) -> u64 {
        u64::from(self.max_seconds) * u64::from(TICK_RATE)
    }
}

/// Roll both combatants for a config.
///
/// # Errors
///
/// Returns an error if the tier is missing from the balance table.
pub fn roll_combatants(config: &GameConfig) -> Result<(EnemyProfile, EnemyProfile)> {
    let mut rng = CombatRng::from_seed(config.seed);
    let player = generate_enemy(config.tier, &config.balance, &mut rng)?;
    let mut enemy = generate_enemy(config.tier, &config.balance, &mut rng)?;
    if config.elite_enemy {
        enemy = make_elite(enemy, &config.balance, &mut rng);
    }
    Ok((player, enemy))
}

/// Build the simulation for a config without running it.
///
/// # Errors
///
/// Returns an error if the tier is unknown or a rolled loadout is invalid.
pub fn build_simulation(config: &GameConfig) -> Result<CombatSimulation> {
    let (player, enemy) = roll_combatants(config)?;
    debug!(
        player_school = ?player.loadout.school_attunement,
        player_element = ?player.loadout.element_attunement,
        enemy_school = ?enemy.loadout.school_attunement,
        enemy_element = ?enemy.loadout.element_attunement,
        "Rolled combatants"
    );
    let rng = CombatRng::from_seed(config.seed ^ COMBAT_SEED_SALT);
    Ok(CombatSimulation::new(
        config.balance.clone(),
        &player.loadout,
        &enemy.loadout,
        Box::new(rng),
    )?
    .with_ai(Side::Player, AiProfile::from_enemy(&player))
    .with_ai(Side::Enemy, AiProfile::from_enemy(&enemy)))
}

/// Run one fight to completion or timeout.
///
/// # Errors
///
/// Returns an error if the simulation cannot be built.
pub fn run_game(config: &GameConfig) -> Result<CombatMetrics> {
    let started = Instant::now();
    info!(
        combat_id = %config.combat_id,
        tier = config.tier,
        seed = config.seed,
        max_seconds = config.max_seconds,
        "Starting combat"
    );

    let mut sim = build_simulation(config)?;
    let mut collector = MetricsCollector::new(&config.combat_id, config.tier, config.seed);
    let dt = Fixed::ONE / Fixed::from_num(TICK_RATE);
    let max_ticks = config.max_ticks();
    let progress_every = u64::from(TICK_RATE) * 10;

    for tick in 0..max_ticks {
        collector.set_tick(tick);
        let events = sim.tick(dt);
        for event in &events.events {
            collector.on_event(event);
        }
        if sim.is_over() {
            break;
        }
        if tick > 0 && tick % progress_every == 0 {
            debug!(
                combat_id = %config.combat_id,
                tick,
                collision = %sim.combat().collision_point,
                "Combat progress"
            );
        }
    }

    let metrics = collector.finalize(&sim);
    info!(
        combat_id = %config.combat_id,
        winner = ?metrics.winner,
        end = %metrics.end_condition,
        ticks = metrics.duration_ticks,
        wall_ms = started.elapsed().as_millis() as u64,
        "Combat finished"
    );
    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_metrics() {
        let config = GameConfig::new(2, 17).with_max_seconds(20);
        let a = run_game(&config).unwrap();
        let b = run_game(&config).unwrap();
        assert_eq!(a.final_state_hash, b.final_state_hash);
        assert_eq!(a.duration_ticks, b.duration_ticks);
        assert_eq!(a.winner, b.winner);
    }

    #[test]
    fn test_time_limit_bounds_duration() {
        let config = GameConfig::new(1, 3).with_max_seconds(5);
        let metrics = run_game(&config).unwrap();
        assert!(metrics.duration_ticks <= config.max_ticks());
        if metrics.winner.is_none() {
            assert_eq!(metrics.end_condition, "timeout");
        }
    }

    #[test]
    fn test_unknown_tier_is_an_error() {
        assert!(run_game(&GameConfig::new(9, 1)).is_err());
    }

    #[test]
    fn test_elite_enemy_gets_more_hp() {
        let mut config = GameConfig::new(2, 8);
        let (_, plain) = roll_combatants(&config).unwrap();
        config.elite_enemy = true;
        let (_, elite) = roll_combatants(&config).unwrap();
        assert_eq!(
            elite.loadout.max_hp,
            plain.loadout.max_hp + config.balance.enemy.elite.hp_bonus
        );
        assert!(elite.is_elite);
    }
}
