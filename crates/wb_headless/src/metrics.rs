//! Combat metrics collection for balance analysis.
//!
//! A [`MetricsCollector`] watches the events of one fight and produces a
//! [`CombatMetrics`] record; [`BatchSummary`] aggregates many of them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use wb_core::components::Side;
use wb_core::events::CombatEvent;
use wb_core::simulation::CombatSimulation;

/// Complete metrics for a single fight.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CombatMetrics {
    /// Unique fight identifier.
    pub combat_id: String,
    /// Enemy tier both sides were rolled from.
    pub tier: u8,
    /// Random seed used.
    pub seed: u64,
    /// Total fight duration in ticks.
    pub duration_ticks: u64,
    /// Total fight duration in simulated seconds.
    pub duration_seconds: f64,
    /// Winning side (None = timeout).
    pub winner: Option<String>,
    /// How the fight ended: `overwhelm`, `death` or `timeout`.
    pub end_condition: String,
    /// Collision point when the fight stopped.
    pub final_collision_point: f64,
    /// Per-side metrics keyed by `player` / `enemy`.
    pub sides: BTreeMap<String, SideMetrics>,
    /// Final simulation state hash (for determinism validation).
    pub final_state_hash: u64,
}

impl CombatMetrics {
    /// Create an empty record for a fight.
    #[must_use]
    pub fn new(combat_id: impl Into<String>, tier: u8, seed: u64) -> Self {
        let sides = Side::BOTH
            .into_iter()
            .map(|side| (side.as_str().to_string(), SideMetrics::default()))
            .collect();
        Self {
            combat_id: combat_id.into(),
            tier,
            seed,
            end_condition: "timeout".to_string(),
            sides,
            ..Default::default()
        }
    }

    /// Get the metrics of one side.
    pub fn side_mut(&mut self, side: Side) -> &mut SideMetrics {
        self.sides.entry(side.as_str().to_string()).or_default()
    }

    /// Metrics of one side, if recorded.
    #[must_use]
    pub fn side(&self, side: Side) -> Option<&SideMetrics> {
        self.sides.get(side.as_str())
    }
}

/// Metrics for one combatant in a fight.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SideMetrics {
    /// Spells cast, by spell name.
    pub spells_cast: BTreeMap<String, u32>,
    /// Stability punishments suffered.
    pub punishments: u32,
    /// Times thrown onto the neutral beam.
    pub forced_neutrals: u32,
    /// Misfires while channeling.
    pub misfires: u32,
    /// Completed beam switches (including neutral).
    pub beam_switches: u32,
    /// Shield hits absorbed.
    pub shield_breaks: u32,
    /// HP lost over the fight.
    pub hp_lost: i32,
    /// HP left at the end.
    pub hp_remaining: i32,
    /// Stability left at the end.
    pub stability_remaining: f64,
    /// Whether the side panicked.
    pub panicked: bool,
}

impl SideMetrics {
    /// Total spells cast.
    #[must_use]
    pub fn total_spells(&self) -> u32 {
        self.spells_cast.values().sum()
    }
}

/// Summary statistics across many fights.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Total fights played.
    pub total_combats: u32,
    /// Fights won by each side.
    pub wins_by_side: BTreeMap<String, u32>,
    /// Win rates by side.
    pub win_rates: BTreeMap<String, f64>,
    /// Fights that hit the time limit.
    pub timeouts: u32,
    /// Fights ended by pushing the collision to an edge.
    pub overwhelms: u32,
    /// Fights ended by HP reaching zero.
    pub deaths: u32,
    /// Average fight duration in seconds.
    pub avg_duration_seconds: f64,
    /// Shortest fight in ticks.
    pub min_duration_ticks: u64,
    /// Longest fight in ticks.
    pub max_duration_ticks: u64,
    /// Average punishments per fight by side.
    pub avg_punishments: BTreeMap<String, f64>,
    /// Average spells cast per fight by side.
    pub avg_spells_cast: BTreeMap<String, f64>,
    /// Average forced neutrals per fight by side.
    pub avg_forced_neutrals: BTreeMap<String, f64>,
}

impl BatchSummary {
    /// Calculate summary from a list of fight metrics.
    #[must_use]
    pub fn from_combats(combats: &[CombatMetrics]) -> Self {
        if combats.is_empty() {
            return Self::default();
        }

        let total = combats.len() as f64;
        let mut summary = Self {
            total_combats: combats.len() as u32,
            min_duration_ticks: u64::MAX,
            ..Default::default()
        };

        let mut duration_sum = 0.0;
        for combat in combats {
            duration_sum += combat.duration_seconds;
            summary.min_duration_ticks = summary.min_duration_ticks.min(combat.duration_ticks);
            summary.max_duration_ticks = summary.max_duration_ticks.max(combat.duration_ticks);

            match &combat.winner {
                Some(winner) => *summary.wins_by_side.entry(winner.clone()).or_default() += 1,
                None => summary.timeouts += 1,
            }
            match combat.end_condition.as_str() {
                "overwhelm" => summary.overwhelms += 1,
                "death" => summary.deaths += 1,
                _ => {}
            }

            for (side, metrics) in &combat.sides {
                *summary.avg_punishments.entry(side.clone()).or_default() +=
                    f64::from(metrics.punishments);
                *summary.avg_spells_cast.entry(side.clone()).or_default() +=
                    f64::from(metrics.total_spells());
                *summary.avg_forced_neutrals.entry(side.clone()).or_default() +=
                    f64::from(metrics.forced_neutrals);
            }
        }

        summary.avg_duration_seconds = duration_sum / total;
        for side in Side::BOTH {
            let wins = summary.wins_by_side.get(side.as_str()).copied().unwrap_or(0);
            summary
                .win_rates
                .insert(side.as_str().to_string(), f64::from(wins) / total);
        }
        for averages in [
            &mut summary.avg_punishments,
            &mut summary.avg_spells_cast,
            &mut summary.avg_forced_neutrals,
        ] {
            for value in averages.values_mut() {
                *value /= total;
            }
        }

        summary
    }

    /// Check that no side wins more than `threshold` away from even.
    #[must_use]
    pub fn is_balanced(&self, threshold: f64) -> bool {
        self.win_rates
            .values()
            .all(|rate| (rate - 0.5).abs() <= threshold)
    }

    /// Get the dominant side (if any).
    #[must_use]
    pub fn dominant_side(&self, threshold: f64) -> Option<&String> {
        self.win_rates
            .iter()
            .find(|(_, rate)| **rate > 0.5 + threshold)
            .map(|(side, _)| side)
    }
}

/// Metrics collector that tracks events during a fight.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    metrics: CombatMetrics,
    current_tick: u64,
}

impl MetricsCollector {
    /// Create a new metrics collector.
    #[must_use]
    pub fn new(combat_id: &str, tier: u8, seed: u64) -> Self {
        Self {
            metrics: CombatMetrics::new(combat_id, tier, seed),
            current_tick: 0,
        }
    }

    /// Update the current tick.
    pub fn set_tick(&mut self, tick: u64) {
        self.current_tick = tick;
    }

    /// Record one emitted event.
    pub fn on_event(&mut self, event: &CombatEvent) {
        match event {
            CombatEvent::SpellCast { side, spell } => {
                *self
                    .metrics
                    .side_mut(*side)
                    .spells_cast
                    .entry(spell.as_str().to_string())
                    .or_default() += 1;
            }
            CombatEvent::StabilityPunishment { side, .. } => {
                self.metrics.side_mut(*side).punishments += 1;
            }
            CombatEvent::ForcedNeutral { side, .. } => {
                self.metrics.side_mut(*side).forced_neutrals += 1;
            }
            CombatEvent::Misfire { side, .. } => self.metrics.side_mut(*side).misfires += 1,
            CombatEvent::BeamSwitchCompleted { side, .. } => {
                self.metrics.side_mut(*side).beam_switches += 1;
            }
            CombatEvent::ShieldBroke { side } => self.metrics.side_mut(*side).shield_breaks += 1,
            CombatEvent::PanicStarted { side } => self.metrics.side_mut(*side).panicked = true,
            CombatEvent::BeamOverwhelm { winner } => {
                tracing::debug!(tick = self.current_tick, winner = winner.as_str(), "Overwhelm");
                self.metrics.end_condition = "overwhelm".to_string();
            }
            CombatEvent::HpDeath { loser } => {
                tracing::debug!(tick = self.current_tick, loser = loser.as_str(), "Death");
                self.metrics.end_condition = "death".to_string();
            }
            _ => {}
        }
    }

    /// Close the record with the final simulation state.
    #[must_use]
    pub fn finalize(mut self, sim: &CombatSimulation) -> CombatMetrics {
        self.metrics.duration_ticks = sim.tick_count();
        self.metrics.duration_seconds = sim.elapsed().to_num::<f64>();
        self.metrics.winner = sim
            .result()
            .map(|result| result.winner().as_str().to_string());
        self.metrics.final_collision_point = sim.combat().collision_point.to_num::<f64>();
        self.metrics.final_state_hash = sim.state_hash();
        for side in Side::BOTH {
            let state = sim.side_state(side);
            let metrics = self.metrics.side_mut(side);
            metrics.hp_remaining = state.hp;
            metrics.hp_lost = state.max_hp - state.hp;
            metrics.stability_remaining = state.stability.to_num::<f64>();
        }
        self.metrics
    }

    /// Get current metrics (for inspection during the fight).
    #[must_use]
    pub fn current(&self) -> &CombatMetrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wb_core::data::spell::SpellId;
    use wb_core::data::gem::GemId;

    fn combat(seed: u64, winner: Option<&str>, ticks: u64, end: &str) -> CombatMetrics {
        let mut metrics = CombatMetrics::new(format!("c{seed}"), 1, seed);
        metrics.winner = winner.map(str::to_string);
        metrics.duration_ticks = ticks;
        metrics.duration_seconds = ticks as f64 / 60.0;
        metrics.end_condition = end.to_string();
        metrics
    }

    #[test]
    fn test_new_record_has_both_sides() {
        let metrics = CombatMetrics::new("c1", 2, 12345);
        assert_eq!(metrics.seed, 12345);
        assert_eq!(metrics.end_condition, "timeout");
        assert!(metrics.side(Side::Player).is_some());
        assert!(metrics.side(Side::Enemy).is_some());
    }

    #[test]
    fn test_collector_counts_events() {
        let mut collector = MetricsCollector::new("c1", 1, 1);
        collector.on_event(&CombatEvent::SpellCast {
            side: Side::Player,
            spell: SpellId::GreyBolt,
        });
        collector.on_event(&CombatEvent::SpellCast {
            side: Side::Player,
            spell: SpellId::GreyBolt,
        });
        collector.on_event(&CombatEvent::Misfire {
            side: Side::Enemy,
            gem: GemId(3),
        });
        collector.on_event(&CombatEvent::HpDeath { loser: Side::Enemy });

        let metrics = collector.current();
        let player = metrics.side(Side::Player).unwrap();
        assert_eq!(player.spells_cast.get("grey_bolt"), Some(&2));
        assert_eq!(player.total_spells(), 2);
        assert_eq!(metrics.side(Side::Enemy).unwrap().misfires, 1);
        assert_eq!(metrics.end_condition, "death");
    }

    #[test]
    fn test_batch_summary() {
        let summary = BatchSummary::from_combats(&[
            combat(1, Some("player"), 600, "overwhelm"),
            combat(2, Some("enemy"), 1200, "death"),
            combat(3, None, 1800, "timeout"),
        ]);

        assert_eq!(summary.total_combats, 3);
        assert_eq!(summary.timeouts, 1);
        assert_eq!(summary.overwhelms, 1);
        assert_eq!(summary.deaths, 1);
        assert_eq!(summary.min_duration_ticks, 600);
        assert_eq!(summary.max_duration_ticks, 1800);
        assert!((summary.avg_duration_seconds - 20.0).abs() < 1e-9);
        assert!((summary.win_rates["player"] - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_balance_check() {
        let mut summary = BatchSummary::default();
        summary.win_rates.insert("player".to_string(), 0.52);
        summary.win_rates.insert("enemy".to_string(), 0.48);

        assert!(summary.is_balanced(0.1));
        assert!(!summary.is_balanced(0.01));
        assert_eq!(summary.dominant_side(0.01).map(String::as_str), Some("player"));
    }

    #[test]
    fn test_empty_batch() {
        let summary = BatchSummary::from_combats(&[]);
        assert_eq!(summary.total_combats, 0);
        assert!(summary.win_rates.is_empty());
    }
}
