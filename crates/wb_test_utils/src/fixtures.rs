//! Test fixtures and helpers.
//!
//! Pre-built loadouts, duels and random sources for consistent testing.

use std::collections::VecDeque;

use fixed::types::I32F32;

use wb_core::ai::AiProfile;
use wb_core::balance::BalanceConfig;
use wb_core::components::{BeamSchool, Element, NodeId, Side};
use wb_core::data::gem::{Gem, GemId, PassiveStat};
use wb_core::data::loadout::Loadout;
use wb_core::data::spell::SpellId;
use wb_core::events::CombatEvent;
use wb_core::math::Fixed;
use wb_core::rng::{CombatRng, RandomSource};
use wb_core::simulation::{CombatSimulation, TICK_RATE};

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// One simulation frame at [`TICK_RATE`].
#[must_use]
pub fn frame() -> Fixed {
    Fixed::ONE / Fixed::from_num(TICK_RATE)
}

/// A gem carrying `spell`, with a neutral passive worth nothing.
#[must_use]
pub fn spell_gem(spell: SpellId, school: BeamSchool, balance: &BalanceConfig) -> Gem {
    let (charge, debuff) = spell.book_costs(balance);
    Gem {
        id: GemId(0),
        element: spell.element(),
        school,
        passive_stat: PassiveStat::AwarenessSpeed,
        passive_value: Fixed::ZERO,
        spell: Some(spell),
        spell_charge_time: charge,
        spell_mana_debuff: debuff,
        upgraded: false,
    }
}

/// Loadout with every node open, for tests that skip node activation.
#[must_use]
pub fn open_loadout(school: BeamSchool, element: Element, balance: &BalanceConfig) -> Loadout {
    let mut loadout = Loadout::new(school, element, balance);
    loadout.all_nodes_open = true;
    loadout
}

/// Open loadout with the given spells slotted into gem slots in order,
/// starting at the crown.
///
/// # Panics
///
/// Panics if more spells are given than there are gem slots.
#[must_use]
pub fn loadout_with_spells(
    school: BeamSchool,
    element: Element,
    spells: &[SpellId],
    balance: &BalanceConfig,
) -> Loadout {
    assert!(spells.len() <= NodeId::GEM_SLOTS.len(), "too many spells");
    let mut loadout = open_loadout(school, element, balance);
    for (spell, node) in spells.iter().zip(NodeId::GEM_SLOTS) {
        let gem = match loadout.find_spell_gem(*spell) {
            Some(gem) => gem,
            None => loadout.add_gem(spell_gem(*spell, BeamSchool::Neutral, balance)),
        };
        loadout.slot_gem(gem, node).expect("gem slot accepts a gem");
    }
    loadout
}

/// A duel between two loadouts with a seeded RNG and no AI.
///
/// # Panics
///
/// Panics if either loadout is invalid.
#[must_use]
pub fn duel(player: &Loadout, enemy: &Loadout, seed: u64) -> CombatSimulation {
    CombatSimulation::new(
        BalanceConfig::default(),
        player,
        enemy,
        Box::new(CombatRng::from_seed(seed)),
    )
    .expect("valid loadouts")
}

/// A mirror duel with both sides driven by a tier AI.
///
/// # Panics
///
/// Panics if the tier is not in the balance table.
#[must_use]
pub fn ai_duel(tier: u8, seed: u64) -> CombatSimulation {
    let balance = BalanceConfig::default();
    let spells = [SpellId::GreyBolt, SpellId::Shield];
    let player = loadout_with_spells(BeamSchool::Order, Element::Fire, &spells, &balance);
    let enemy = loadout_with_spells(BeamSchool::Chaos, Element::Water, &spells, &balance);
    let profile = AiProfile::for_tier(tier, &balance).expect("tier in table");
    duel(&player, &enemy, seed)
        .with_ai(Side::Player, profile.clone())
        .with_ai(Side::Enemy, profile)
}

/// Run frames until `seconds` have passed or the fight ends, collecting
/// every event.
pub fn run_for(sim: &mut CombatSimulation, seconds: f64) -> Vec<CombatEvent> {
    let frames = (seconds * f64::from(TICK_RATE)).ceil() as u64;
    let mut events = Vec::new();
    for _ in 0..frames {
        if sim.is_over() {
            break;
        }
        events.extend(sim.tick(frame()).events);
    }
    events
}

/// Random source that replays a fixed list of rolls, then repeats the last.
///
/// Rolls are given as fractions in `[0, 1)`.
#[derive(Debug, Clone)]
pub struct ScriptedRng {
    rolls: VecDeque<u32>,
    last: u32,
}

impl ScriptedRng {
    /// Script a sequence of rolls.
    #[must_use]
    pub fn new(rolls: &[f64]) -> Self {
        let rolls: VecDeque<u32> = rolls.iter().map(|r| to_bits(*r)).collect();
        let last = rolls.back().copied().unwrap_or(0);
        Self { rolls, last }
    }

    /// Always roll the same value.
    #[must_use]
    pub fn constant(roll: f64) -> Self {
        Self::new(&[roll])
    }
}

fn to_bits(roll: f64) -> u32 {
    let clamped = roll.clamp(0.0, 1.0 - f64::EPSILON);
    (clamped * f64::from(u32::MAX)) as u32
}

impl RandomSource for ScriptedRng {
    fn next_u32(&mut self) -> u32 {
        match self.rolls.pop_front() {
            Some(bits) => {
                self.last = bits;
                bits
            }
            None => self.last,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_rng_replays_then_repeats() {
        let mut rng = ScriptedRng::new(&[0.25, 0.75]);
        assert!((rng.roll() - fixed_f(0.25)).abs() < fixed_f(1e-6));
        assert!((rng.roll() - fixed_f(0.75)).abs() < fixed_f(1e-6));
        assert!((rng.roll() - fixed_f(0.75)).abs() < fixed_f(1e-6));
    }

    #[test]
    fn test_scripted_pick_index() {
        let mut rng = ScriptedRng::constant(0.99);
        assert_eq!(rng.pick_index(4), 3);
        let mut rng = ScriptedRng::constant(0.0);
        assert_eq!(rng.pick_index(4), 0);
    }

    #[test]
    fn test_loadout_with_spells_slots_in_order() {
        let balance = BalanceConfig::default();
        let loadout = loadout_with_spells(
            BeamSchool::Pure,
            Element::Fire,
            &[SpellId::GreyBolt, SpellId::Fireball],
            &balance,
        );
        loadout.validate().unwrap();
        assert_eq!(loadout.gem_slots.len(), 2);
        let crown = loadout.gem_slots[&NodeId::Crown];
        assert_eq!(loadout.gems.get(crown).unwrap().spell, Some(SpellId::GreyBolt));
    }

    #[test]
    fn test_frame_length() {
        assert!((frame() - fixed_f(1.0 / 60.0)).abs() < fixed_f(1e-9));
    }
}
