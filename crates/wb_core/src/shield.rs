//! Shield state machine: `Unavailable <-> Down <-> Up -> Recharging -> Up`.
//!
//! The shield exists only while the shield gem is channeled. A raised shield
//! absorbs one projectile, then recharges and rises again on its own.

use crate::balance::BalanceConfig;
use crate::components::ShieldState;
use crate::data::gem::PassiveStat;
use crate::data::spell::SpellData;
use crate::events::CombatEvent;
use crate::math::Fixed;
use crate::network::NodeNetwork;
use crate::side::SideState;

fn set(state: &mut SideState, new: ShieldState, events: &mut Vec<CombatEvent>) {
    state.shield_state = new;
    events.push(CombatEvent::ShieldStateChanged {
        side: state.side,
        state: new,
    });
}

/// Shield gem channeled: the shield becomes available, lowered.
pub fn activate(state: &mut SideState, events: &mut Vec<CombatEvent>) {
    state.shield_recharge_timer = Fixed::ZERO;
    set(state, ShieldState::Down, events);
}

/// Shield gem lost: the shield becomes unavailable.
pub fn deactivate(state: &mut SideState, events: &mut Vec<CombatEvent>) {
    state.shield_recharge_timer = Fixed::ZERO;
    set(state, ShieldState::Unavailable, events);
}

/// Raise a lowered shield, lower a raised one, or cancel a recharge.
///
/// Returns `false` while unavailable.
pub fn toggle_shield(state: &mut SideState, events: &mut Vec<CombatEvent>) -> bool {
    let next = match state.shield_state {
        ShieldState::Unavailable => return false,
        ShieldState::Down => ShieldState::Up,
        ShieldState::Up => ShieldState::Down,
        ShieldState::Recharging => {
            state.shield_recharge_timer = Fixed::ZERO;
            ShieldState::Down
        }
    };
    set(state, next, events);
    true
}

/// Whether the shield stops this spell outright.
#[must_use]
pub fn can_block(state: &SideState, spell: &SpellData) -> bool {
    state.shield_up() && spell.is_projectile
}

/// Take a hit: the shield breaks and starts recharging.
pub fn absorb_hit(
    state: &mut SideState,
    network: &NodeNetwork,
    balance: &BalanceConfig,
    events: &mut Vec<CombatEvent>,
) {
    let bonus = network.passive_bonus(PassiveStat::ShieldRecharge);
    state.shield_recharge_timer =
        (balance.shield.recharge_time + bonus).max(balance.floors.shield_recharge);
    tracing::debug!(
        side = state.side.as_str(),
        recharge = %state.shield_recharge_timer,
        "Shield broke"
    );
    events.push(CombatEvent::ShieldBroke { side: state.side });
    set(state, ShieldState::Recharging, events);
}

/// Tick the recharge timer.
pub fn update(state: &mut SideState, dt: Fixed, events: &mut Vec<CombatEvent>) {
    if state.shield_state != ShieldState::Recharging {
        return;
    }
    state.shield_recharge_timer -= dt;
    if state.shield_recharge_timer > Fixed::ZERO {
        return;
    }
    state.shield_recharge_timer = Fixed::ZERO;
    set(state, ShieldState::Up, events);
    events.push(CombatEvent::ShieldRestored { side: state.side });
}
