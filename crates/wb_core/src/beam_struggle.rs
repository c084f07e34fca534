//! The beam struggle: effective mana on both sides pushes a shared collision
//! point between 0 (enemy wins) and 100 (player wins).

use serde::{Deserialize, Serialize};

use crate::balance::BalanceConfig;
use crate::components::{CombatResult, Side};
use crate::element::element_multiplier;
use crate::events::CombatEvent;
use crate::math::{fixed_serde, Fixed};
use crate::network::NodeNetwork;
use crate::side::SideState;

const COLLISION_MAX: Fixed = Fixed::const_from_int(100);

/// Combat-wide state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatState {
    /// Tug-of-war position in `[0, 100]`.
    #[serde(with = "fixed_serde")]
    pub collision_point: Fixed,
    /// Terminal flag.
    pub combat_over: bool,
    /// Winner, once decided.
    pub result: Option<CombatResult>,
}

impl CombatState {
    /// Fresh combat at the starting collision point.
    #[must_use]
    pub fn new(balance: &BalanceConfig) -> Self {
        Self {
            collision_point: balance.beam.collision_start,
            combat_over: false,
            result: None,
        }
    }

    /// End the combat. Only the first call has any effect.
    ///
    /// Returns `true` if this call ended the combat.
    pub fn finish(&mut self, result: CombatResult) -> bool {
        if self.combat_over {
            return false;
        }
        self.combat_over = true;
        self.result = Some(result);
        tracing::info!(?result, collision = %self.collision_point, "Combat ended");
        true
    }
}

/// Mana a side loses because the opposing beam counters its own.
///
/// Zero whenever either side is on the neutral beam.
#[must_use]
pub fn counter_debuff(
    state: &SideState,
    opponent: &SideState,
    opponent_network: &NodeNetwork,
    balance: &BalanceConfig,
) -> Fixed {
    let countered = state.current_beam_school.is_attack()
        && opponent.current_beam_school.beats() == Some(state.current_beam_school);
    if !countered {
        return Fixed::ZERO;
    }
    if opponent_network.all_mana_nodes_active() {
        balance.school.counter_debuff_max
    } else {
        balance.school.counter_debuff
    }
}

/// Net mana driving a side's beam. May be negative.
///
/// `network mana + 1 - channel upkeep - counter debuff + panic bonus -
/// spell book debuff`.
#[must_use]
pub fn effective_mana(
    state: &SideState,
    network: &NodeNetwork,
    channel_cost: Fixed,
    opponent: &SideState,
    opponent_network: &NodeNetwork,
    balance: &BalanceConfig,
) -> Fixed {
    Fixed::from_num(network.node_mana()) + Fixed::ONE - channel_cost
        - counter_debuff(state, opponent, opponent_network, balance)
        + state.panic_mana_bonus
        - state.spell_book_debuff
}

/// Beam thickness for rendering, interpolated on `[0, max_mana]`.
#[must_use]
pub fn beam_thickness(mana: Fixed, balance: &BalanceConfig) -> Fixed {
    let t = (mana / balance.beam.max_mana).clamp(Fixed::ZERO, Fixed::ONE);
    balance.beam.beam_min_thickness
        + (balance.beam.beam_max_thickness - balance.beam.beam_min_thickness) * t
}

/// Move the collision point by the mana difference and check for a winner.
///
/// Both sides' `effective_mana` must already be stored on their states.
pub fn update(
    combat: &mut CombatState,
    player: &SideState,
    enemy: &SideState,
    dt: Fixed,
    balance: &BalanceConfig,
    events: &mut Vec<CombatEvent>,
) {
    if combat.combat_over {
        return;
    }

    let diff = player.effective_mana - enemy.effective_mana;
    let multiplier = element_multiplier(player.dominant_element, enemy.dominant_element, balance);
    let push = diff * balance.beam.push_rate * multiplier * dt;
    combat.collision_point = (combat.collision_point + push).clamp(Fixed::ZERO, COLLISION_MAX);

    let winner = if combat.collision_point >= COLLISION_MAX {
        Side::Player
    } else if combat.collision_point <= Fixed::ZERO {
        Side::Enemy
    } else {
        return;
    };

    let result = CombatResult::won_by(winner);
    if combat.finish(result) {
        events.push(CombatEvent::BeamOverwhelm { winner });
        events.push(CombatEvent::CombatEnded { result });
    }
}
