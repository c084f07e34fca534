//! Elemental matchups and the per-side dominant element.
//!
//! The dominant element follows the network's open gems, but a change only
//! takes effect after `element.shift_delay` seconds of holding steady.

use crate::balance::BalanceConfig;
use crate::components::{Element, Matchup};
use crate::events::CombatEvent;
use crate::math::Fixed;
use crate::network::NodeNetwork;
use crate::side::{ElementShift, SideState};

/// Compare two (possibly absent) elements.
#[must_use]
pub fn matchup(a: Option<Element>, b: Option<Element>) -> Matchup {
    match (a, b) {
        (Some(a), Some(b)) if a != b => {
            if a.beats() == b {
                Matchup::WinnerA
            } else if b.beats() == a {
                Matchup::WinnerB
            } else {
                Matchup::Neutral
            }
        }
        _ => Matchup::Neutral,
    }
}

/// Beam push multiplier from the player's point of view.
///
/// The enemy's push uses the same value; a multiplier below one slows the
/// collision point's drift toward the enemy.
#[must_use]
pub fn element_multiplier(player: Element, enemy: Element, balance: &BalanceConfig) -> Fixed {
    let multiplier = balance.element.push_multiplier;
    match matchup(Some(player), Some(enemy)) {
        Matchup::WinnerA => multiplier,
        Matchup::WinnerB => Fixed::ONE / multiplier,
        Matchup::Neutral => Fixed::ONE,
    }
}

/// Stability damage a spell deals to its defender.
///
/// A raised shield cleanly blocks a non-projectile spell whose element the
/// defender beats.
#[must_use]
pub fn spell_stability_damage(
    spell_element: Option<Element>,
    defender: Element,
    shield_up: bool,
    is_projectile: bool,
    balance: &BalanceConfig,
) -> Fixed {
    if spell_element.is_none() {
        return balance.element.spell_stability_base;
    }
    match matchup(spell_element, Some(defender)) {
        Matchup::WinnerA => balance.element.spell_stability_counter,
        Matchup::WinnerB if shield_up && !is_projectile => Fixed::ZERO,
        _ => balance.element.spell_stability_base,
    }
}

/// Compare the network's dominant element against the current one and
/// start, keep or cancel the pending shift.
pub fn recalculate(state: &mut SideState, network: &NodeNetwork, balance: &BalanceConfig) {
    let fresh = network.dominant_element(state.element_attunement);
    if fresh == state.dominant_element {
        state.pending_element = None;
        return;
    }
    if state.pending_element.map(|p| p.target) != Some(fresh) {
        state.pending_element = Some(ElementShift {
            target: fresh,
            timer: balance.element.shift_delay,
        });
    }
}

/// Recalculate, then tick the pending shift and commit it on expiry.
pub fn update(
    state: &mut SideState,
    network: &NodeNetwork,
    dt: Fixed,
    balance: &BalanceConfig,
    events: &mut Vec<CombatEvent>,
) {
    recalculate(state, network, balance);

    let Some(mut shift) = state.pending_element else {
        return;
    };
    shift.timer -= dt;
    if shift.timer > Fixed::ZERO {
        state.pending_element = Some(shift);
        return;
    }

    state.dominant_element = shift.target;
    state.pending_element = None;
    tracing::debug!(side = state.side.as_str(), element = ?shift.target, "Element shifted");
    events.push(CombatEvent::ElementChanged {
        side: state.side,
        element: shift.target,
    });
}
