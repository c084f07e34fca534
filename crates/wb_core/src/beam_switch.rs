//! Beam school switching: `Ready -> Charging -> Locked -> Ready`.
//!
//! Neutral is instant but costs stability. Attack schools charge first and
//! then lock the switcher for `beam_switch.lock_time`.

use crate::balance::BalanceConfig;
use crate::components::{BeamSchool, BeamSwitchState};
use crate::data::gem::PassiveStat;
use crate::events::CombatEvent;
use crate::math::Fixed;
use crate::network::NodeNetwork;
use crate::side::SideState;

/// Request a switch to `school`.
///
/// Rejected unless the switcher is ready, the school differs from the current
/// one, and (for attack schools) the school is not locked out and its beam
/// node is open. Rejections never touch timers.
pub fn request_switch(
    state: &mut SideState,
    network: &NodeNetwork,
    school: BeamSchool,
    balance: &BalanceConfig,
    events: &mut Vec<CombatEvent>,
) -> bool {
    if state.beam_switch_state != BeamSwitchState::Ready || school == state.current_beam_school {
        return false;
    }

    let Some(node) = school.beam_node() else {
        state.current_beam_school = BeamSchool::Neutral;
        state.beam_switch_state = BeamSwitchState::Locked;
        state.beam_switch_timer = balance.beam_switch.neutral_lock_time;
        state.beam_switch_target = None;
        tracing::debug!(side = state.side.as_str(), "Voluntary switch to neutral");
        events.push(CombatEvent::BeamSwitchCompleted {
            side: state.side,
            school: BeamSchool::Neutral,
        });
        events.push(CombatEvent::StabilityDamage {
            side: state.side,
            amount: balance.beam_switch.neutral_voluntary_stability,
        });
        return true;
    };

    if state.is_locked_out(school) || !network.state(node).is_active() {
        return false;
    }

    let bonus = network.passive_bonus(PassiveStat::BeamSwitch);
    state.beam_switch_state = BeamSwitchState::Charging;
    state.beam_switch_timer = (balance.beam_switch.charge_time + bonus).max(balance.floors.beam_switch);
    state.beam_switch_target = Some(school);
    tracing::debug!(
        side = state.side.as_str(),
        ?school,
        charge = %state.beam_switch_timer,
        "Beam switch charging"
    );
    events.push(CombatEvent::BeamSwitchStarted {
        side: state.side,
        school,
    });
    true
}

/// Throw the side onto the neutral beam, bypassing the charge.
pub fn forced_neutral(state: &mut SideState, balance: &BalanceConfig, events: &mut Vec<CombatEvent>) {
    let previous = state.current_beam_school;
    state.current_beam_school = BeamSchool::Neutral;
    state.beam_switch_state = BeamSwitchState::Locked;
    state.beam_switch_timer = balance.beam_switch.neutral_lock_time;
    state.beam_switch_target = None;
    tracing::debug!(side = state.side.as_str(), ?previous, "Forced to neutral");
    events.push(CombatEvent::ForcedNeutral {
        side: state.side,
        previous,
    });
    events.push(CombatEvent::BeamSwitchCompleted {
        side: state.side,
        school: BeamSchool::Neutral,
    });
    events.push(CombatEvent::StabilityDamage {
        side: state.side,
        amount: balance.beam_switch.neutral_forced_stability,
    });
}

/// Tick the charge or lock timer.
///
/// An active attack school that is locked out or whose beam node went down
/// is forced to neutral first.
pub fn update(
    state: &mut SideState,
    network: &NodeNetwork,
    dt: Fixed,
    balance: &BalanceConfig,
    events: &mut Vec<CombatEvent>,
) {
    if let Some(node) = state.current_beam_school.beam_node() {
        if state.is_locked_out(state.current_beam_school) || !network.state(node).is_active() {
            forced_neutral(state, balance, events);
            return;
        }
    }

    if state.beam_switch_state == BeamSwitchState::Ready {
        return;
    }

    state.beam_switch_timer -= dt;
    if state.beam_switch_timer > Fixed::ZERO {
        return;
    }

    match state.beam_switch_state {
        BeamSwitchState::Charging => {
            let school = state.beam_switch_target.take().unwrap_or(state.current_beam_school);
            let usable = school
                .beam_node()
                .is_some_and(|node| network.state(node).is_active());
            if state.is_locked_out(school) || !usable {
                forced_neutral(state, balance, events);
                return;
            }
            state.current_beam_school = school;
            state.beam_switch_state = BeamSwitchState::Locked;
            state.beam_switch_timer = balance.beam_switch.lock_time;
            tracing::debug!(side = state.side.as_str(), ?school, "Beam switch completed");
            events.push(CombatEvent::BeamSwitchCompleted {
                side: state.side,
                school,
            });
        }
        BeamSwitchState::Locked => {
            state.beam_switch_state = BeamSwitchState::Ready;
            state.beam_switch_timer = Fixed::ZERO;
        }
        BeamSwitchState::Ready => {}
    }
}
