//! Stability meter.
//!
//! Neutral drains, attack beams regenerate, and mitigated spells add timed
//! drains on top. Hitting zero punishes the side with a random damaged node
//! and resets the meter to full.

use crate::balance::BalanceConfig;
use crate::components::{BeamSchool, NodeId, NodeState};
use crate::events::CombatEvent;
use crate::math::Fixed;
use crate::network::NodeNetwork;
use crate::rng::{choose, RandomSource};
use crate::side::{ActiveDrain, SideState};

fn clamp(value: Fixed, balance: &BalanceConfig) -> Fixed {
    value.clamp(Fixed::ZERO, balance.stability.max)
}

/// Instant stability loss.
pub fn apply_damage(
    state: &mut SideState,
    amount: Fixed,
    balance: &BalanceConfig,
    events: &mut Vec<CombatEvent>,
) {
    state.stability = clamp(state.stability - amount, balance);
    events.push(CombatEvent::StabilityChanged {
        side: state.side,
        stability: state.stability,
    });
}

/// Queue a drain of `total` spread evenly over `duration` seconds.
pub fn apply_drain(state: &mut SideState, total: Fixed, duration: Fixed) {
    if duration <= Fixed::ZERO {
        return;
    }
    state.active_drains.push(ActiveDrain {
        remaining: total,
        rate: total / duration,
        duration,
        elapsed: Fixed::ZERO,
    });
}

/// Apply passive drain or regen and every timed drain, then clamp.
///
/// Returns `true` when stability hit zero and punishment is due.
pub fn update(state: &mut SideState, dt: Fixed, balance: &BalanceConfig) -> bool {
    if state.current_beam_school == BeamSchool::Neutral {
        state.stability -= balance.stability.drain_rate * dt;
    } else {
        state.stability += balance.stability.regen_rate * dt;
    }

    let mut drained = Fixed::ZERO;
    state.active_drains.retain_mut(|drain| {
        let amount = drain.rate * dt;
        drained += amount;
        drain.remaining -= amount;
        drain.elapsed += dt;
        drain.elapsed < drain.duration && drain.remaining > Fixed::ZERO
    });
    state.stability -= drained;

    state.stability = clamp(state.stability, balance);
    state.stability <= Fixed::ZERO
}

/// Pick a uniformly random node that is not already damaged.
pub fn punishment_target(network: &NodeNetwork, rng: &mut dyn RandomSource) -> Option<NodeId> {
    let candidates: Vec<NodeId> = NodeId::ALL
        .into_iter()
        .filter(|id| network.state(*id) != NodeState::Damaged)
        .collect();
    choose(rng, &candidates).copied()
}

/// Refill stability after a punishment.
pub fn reset(state: &mut SideState, balance: &BalanceConfig, events: &mut Vec<CombatEvent>) {
    state.stability = balance.stability.max;
    events.push(CombatEvent::StabilityChanged {
        side: state.side,
        stability: state.stability,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Element, Side};
    use crate::data::loadout::Loadout;
    use crate::math::fx;
    use crate::rng::CombatRng;

    fn setup(school: BeamSchool) -> (SideState, BalanceConfig) {
        let balance = BalanceConfig::default();
        let loadout = Loadout::new(BeamSchool::Order, Element::Air, &balance);
        let mut state = SideState::new(Side::Player, &loadout, &balance);
        state.current_beam_school = school;
        (state, balance)
    }

    #[test]
    fn test_neutral_drains_attack_regens() {
        let (mut state, balance) = setup(BeamSchool::Neutral);
        assert!(!update(&mut state, fx(2.0), &balance));
        assert_eq!(state.stability, fx(75.0));

        state.current_beam_school = BeamSchool::Order;
        update(&mut state, fx(10.0), &balance);
        assert_eq!(state.stability, fx(85.0));
        update(&mut state, fx(100.0), &balance);
        assert_eq!(state.stability, fx(100.0));
    }

    #[test]
    fn test_damage_clamps_and_emits() {
        let (mut state, balance) = setup(BeamSchool::Order);
        let mut events = Vec::new();
        apply_damage(&mut state, fx(140.0), &balance, &mut events);
        assert_eq!(state.stability, Fixed::ZERO);
        assert_eq!(
            events,
            vec![CombatEvent::StabilityChanged {
                side: Side::Player,
                stability: Fixed::ZERO,
            }]
        );
    }

    #[test]
    fn test_timed_drain_runs_for_its_duration() {
        let (mut state, balance) = setup(BeamSchool::Order);
        state.stability = fx(60.0);
        apply_drain(&mut state, fx(30.0), fx(3.0));

        // Regen +1/s, drain -10/s.
        update(&mut state, fx(1.0), &balance);
        assert_eq!(state.stability, fx(51.0));
        update(&mut state, fx(2.0), &balance);
        assert_eq!(state.stability, fx(33.0));
        assert!(state.active_drains.is_empty());
        update(&mut state, fx(1.0), &balance);
        assert_eq!(state.stability, fx(34.0));
    }

    #[test]
    fn test_drains_stack() {
        let (mut state, balance) = setup(BeamSchool::Order);
        apply_drain(&mut state, fx(45.0), fx(3.0));
        apply_drain(&mut state, fx(30.0), fx(3.0));
        assert_eq!(state.active_drains.len(), 2);
        update(&mut state, fx(3.0), &balance);
        assert_eq!(state.stability, fx(28.0));
        assert!(state.active_drains.is_empty());
    }

    #[test]
    fn test_zero_requests_punishment() {
        let (mut state, balance) = setup(BeamSchool::Neutral);
        state.stability = fx(1.0);
        assert!(update(&mut state, fx(1.0), &balance));
        assert_eq!(state.stability, Fixed::ZERO);

        let mut events = Vec::new();
        reset(&mut state, &balance, &mut events);
        assert_eq!(state.stability, fx(100.0));
    }

    #[test]
    fn test_punishment_skips_damaged_nodes() {
        let balance = BalanceConfig::default();
        let loadout = Loadout::new(BeamSchool::Order, Element::Air, &balance);
        let mut network = NodeNetwork::new(Side::Player, &balance);
        network.init(&loadout);
        let mut events = Vec::new();
        for id in NodeId::ALL.into_iter().filter(|id| *id != NodeId::Crown) {
            network.damage_node(id, &mut events);
        }

        let mut rng = CombatRng::from_seed(5);
        assert_eq!(punishment_target(&network, &mut rng), Some(NodeId::Crown));
        network.damage_node(NodeId::Crown, &mut events);
        assert_eq!(punishment_target(&network, &mut rng), None);
    }
}
