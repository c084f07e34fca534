//! Balance testing utilities for headless duels.
//!
//! Runs many seeded AI-vs-AI fights and aggregates who won and how.

use wb_core::components::{CombatResult, Side};
use wb_core::events::CombatEvent;
use wb_core::simulation::{CombatSimulation, TICK_RATE};

use crate::fixtures::frame;

/// Result of a simulated duel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuelResult {
    /// Winner (None on timeout).
    pub result: Option<CombatResult>,
    /// Simulation ticks elapsed.
    pub ticks: u64,
    /// Stability punishments suffered by the player.
    pub player_punishments: u32,
    /// Stability punishments suffered by the enemy.
    pub enemy_punishments: u32,
    /// Spells cast by either side.
    pub spells_cast: u32,
}

/// Statistics for a set of duels.
#[derive(Debug, Clone, Default)]
pub struct DuelStats {
    /// Total duels run.
    pub total: u32,
    /// Player wins.
    pub player_wins: u32,
    /// Enemy wins.
    pub enemy_wins: u32,
    /// Fights that hit the time limit.
    pub timeouts: u32,
    /// Average ticks to resolution.
    pub avg_ticks: f64,
}

impl DuelStats {
    /// Aggregate a batch of results.
    #[must_use]
    pub fn from_results(results: &[DuelResult]) -> Self {
        let mut stats = Self {
            total: results.len() as u32,
            ..Self::default()
        };
        let mut ticks = 0u64;
        for r in results {
            ticks += r.ticks;
            match r.result {
                Some(CombatResult::PlayerWin) => stats.player_wins += 1,
                Some(CombatResult::EnemyWin) => stats.enemy_wins += 1,
                None => stats.timeouts += 1,
            }
        }
        if stats.total > 0 {
            stats.avg_ticks = ticks as f64 / f64::from(stats.total);
        }
        stats
    }

    /// Player win rate (0.0 to 1.0).
    pub fn player_win_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.5;
        }
        f64::from(self.player_wins) / f64::from(self.total)
    }

    /// Enemy win rate (0.0 to 1.0).
    pub fn enemy_win_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.5;
        }
        f64::from(self.enemy_wins) / f64::from(self.total)
    }

    /// Check if the player win rate is inside a range.
    pub fn is_balanced(&self, min_rate: f64, max_rate: f64) -> bool {
        let rate = self.player_win_rate();
        rate >= min_rate && rate <= max_rate
    }
}

/// Play a fight to the end or until `max_seconds`.
pub fn play_out(mut sim: CombatSimulation, max_seconds: u32) -> DuelResult {
    let max_ticks = u64::from(max_seconds) * u64::from(TICK_RATE);
    let mut out = DuelResult {
        result: None,
        ticks: 0,
        player_punishments: 0,
        enemy_punishments: 0,
        spells_cast: 0,
    };
    while !sim.is_over() && out.ticks < max_ticks {
        for event in sim.tick(frame()).events {
            match event {
                CombatEvent::StabilityPunishment { side: Side::Player, .. } => {
                    out.player_punishments += 1;
                }
                CombatEvent::StabilityPunishment { side: Side::Enemy, .. } => {
                    out.enemy_punishments += 1;
                }
                CombatEvent::SpellCast { .. } => out.spells_cast += 1,
                _ => {}
            }
        }
        out.ticks += 1;
    }
    out.result = sim.result();
    tracing::debug!(
        result = ?out.result,
        ticks = out.ticks,
        spells = out.spells_cast,
        "Duel played out"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::ai_duel;

    fn result(result: Option<CombatResult>, ticks: u64) -> DuelResult {
        DuelResult {
            result,
            ticks,
            player_punishments: 0,
            enemy_punishments: 0,
            spells_cast: 0,
        }
    }

    #[test]
    fn test_duel_stats_win_rate() {
        let stats = DuelStats::from_results(&[
            result(Some(CombatResult::PlayerWin), 100),
            result(Some(CombatResult::PlayerWin), 200),
            result(Some(CombatResult::EnemyWin), 300),
            result(None, 400),
        ]);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.timeouts, 1);
        assert!((stats.player_win_rate() - 0.5).abs() < 1e-9);
        assert!((stats.enemy_win_rate() - 0.25).abs() < 1e-9);
        assert!((stats.avg_ticks - 250.0).abs() < 1e-9);
        assert!(stats.is_balanced(0.4, 0.6));
    }

    #[test]
    fn test_empty_stats_are_even() {
        let stats = DuelStats::default();
        assert!((stats.player_win_rate() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_play_out_respects_time_limit() {
        let duel = play_out(ai_duel(1, 4), 2);
        assert!(duel.ticks <= 2 * u64::from(TICK_RATE));
        if duel.result.is_none() {
            assert_eq!(duel.ticks, 2 * u64::from(TICK_RATE));
        }
    }
}
