//! Channeling: committing open spell gems to an active, mana-draining state.
//!
//! A request starts a pending timer; the node turns `Channeled` only when the
//! timer completes and the node is still open. Channeled gems lock out the
//! beam school that counters their own school.

use serde::{Deserialize, Serialize};

use crate::balance::BalanceConfig;
use crate::components::{BeamSchool, NodeId, NodeState};
use crate::data::gem::GemId;
use crate::data::spell::SpellRegistry;
use crate::events::CombatEvent;
use crate::math::{fixed_serde, Fixed};
use crate::network::NodeNetwork;
use crate::side::SideState;
use crate::{beam_switch, shield};

/// A channel request waiting out `channeling.channel_time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingChannel {
    /// Gem being channeled.
    pub gem: GemId,
    /// Node holding the gem when requested.
    pub node: NodeId,
    /// Seconds remaining.
    #[serde(with = "fixed_serde")]
    pub timer: Fixed,
}

/// Per-side pending channel timers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelingSystem {
    pending: Vec<PendingChannel>,
}

impl ChannelingSystem {
    /// Create an empty system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pending requests in request order.
    #[must_use]
    pub fn pending(&self) -> &[PendingChannel] {
        &self.pending
    }

    /// Whether a gem is waiting to be channeled.
    #[must_use]
    pub fn is_pending(&self, gem: GemId) -> bool {
        self.pending.iter().any(|p| p.gem == gem)
    }

    /// Start channeling a slotted gem.
    ///
    /// Rejected if the gem's node is not open, the gem has no spell, the
    /// channel cap (channeled plus pending) is reached, or the gem is already
    /// pending or channeled. If the gem's lockout hits the active beam the
    /// side is forced to neutral and a misfire is emitted before the timer
    /// starts.
    pub fn request_channel(
        &mut self,
        state: &mut SideState,
        network: &NodeNetwork,
        gem: GemId,
        balance: &BalanceConfig,
        events: &mut Vec<CombatEvent>,
    ) -> bool {
        let Some(node) = network.node_of_gem(gem) else {
            return false;
        };
        if network.state(node) != NodeState::Open {
            return false;
        }
        let Some(record) = network.gem(gem) else {
            return false;
        };
        if !record.has_spell() {
            return false;
        }
        if state.channeled_gems.len() + self.pending.len() >= balance.channeling.max_channeled_spells
        {
            return false;
        }
        if self.is_pending(gem) || state.is_channeled(gem) {
            return false;
        }

        if record.school.lockout() == Some(state.current_beam_school) {
            beam_switch::forced_neutral(state, balance, events);
            tracing::debug!(side = state.side.as_str(), %gem, "Channel misfire");
            events.push(CombatEvent::Misfire {
                side: state.side,
                gem,
            });
        }

        self.pending.push(PendingChannel {
            gem,
            node,
            timer: balance.channeling.channel_time,
        });
        true
    }

    /// Release a channeled gem back to an open node.
    pub fn request_unchannel(
        &mut self,
        state: &mut SideState,
        network: &mut NodeNetwork,
        gem: GemId,
        events: &mut Vec<CombatEvent>,
    ) -> bool {
        if !state.is_channeled(gem) {
            return false;
        }
        if let Some(node) = network.node_of_gem(gem) {
            if network.state(node) == NodeState::Channeled {
                network.set_state(node, NodeState::Open, events);
            }
        }
        release(state, network, gem, events);
        true
    }

    /// A channeled node was damaged or disrupted: drop its gem from the
    /// channeled list without touching the node.
    pub fn release_lost_node(
        &mut self,
        state: &mut SideState,
        network: &NodeNetwork,
        node: NodeId,
        events: &mut Vec<CombatEvent>,
    ) {
        let Some(gem) = network.node(node).gem else {
            return;
        };
        if state.is_channeled(gem) {
            tracing::debug!(side = state.side.as_str(), %node, %gem, "Channeled node lost");
            release(state, network, gem, events);
        }
    }

    /// Upkeep of every channeled spell.
    #[must_use]
    pub fn continuous_mana_cost(
        state: &SideState,
        network: &NodeNetwork,
        spells: &SpellRegistry,
    ) -> Fixed {
        state
            .channeled_gems
            .iter()
            .filter_map(|gem| network.gem(*gem)?.spell)
            .filter_map(|spell| spells.get(spell))
            .map(|data| data.mana_cost)
            .sum()
    }

    /// Tick pending timers and complete the ones that ran out.
    pub fn update(
        &mut self,
        state: &mut SideState,
        network: &mut NodeNetwork,
        dt: Fixed,
        events: &mut Vec<CombatEvent>,
    ) {
        for pending in &mut self.pending {
            pending.timer -= dt;
        }

        let (done, waiting): (Vec<_>, Vec<_>) = self
            .pending
            .drain(..)
            .partition(|p| p.timer <= Fixed::ZERO);
        self.pending = waiting;

        for pending in done {
            if network.state(pending.node) != NodeState::Open
                || network.node(pending.node).gem != Some(pending.gem)
            {
                continue;
            }
            let Some(spell) = network.gem(pending.gem).and_then(|g| g.spell) else {
                continue;
            };

            network.set_state(pending.node, NodeState::Channeled, events);
            state.channeled_gems.push(pending.gem);
            recalc_lockouts(state, network);

            if network.gem(pending.gem).is_some_and(|g| g.is_shield()) {
                shield::activate(state, events);
            }

            tracing::debug!(side = state.side.as_str(), gem = %pending.gem, %spell, "Spell channeled");
            events.push(CombatEvent::SpellChanneled {
                side: state.side,
                gem: pending.gem,
                spell,
            });
        }
    }
}

fn release(state: &mut SideState, network: &NodeNetwork, gem: GemId, events: &mut Vec<CombatEvent>) {
    state.channeled_gems.retain(|g| *g != gem);
    if network.gem(gem).is_some_and(|g| g.is_shield()) {
        shield::deactivate(state, events);
    }
    recalc_lockouts(state, network);
    events.push(CombatEvent::SpellUnchanneled {
        side: state.side,
        gem,
    });
}

/// Rebuild the locked-out school list from the channeled gems.
pub fn recalc_lockouts(state: &mut SideState, network: &NodeNetwork) {
    let mut locked: Vec<BeamSchool> = Vec::new();
    for gem in &state.channeled_gems {
        let lockout = network.gem(*gem).and_then(|g| g.school.lockout());
        if let Some(school) = lockout {
            if !locked.contains(&school) {
                locked.push(school);
            }
        }
    }
    state.locked_beam_types = locked;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Element, ShieldState, Side};
    use crate::data::gem::{Gem, PassiveStat};
    use crate::data::loadout::Loadout;
    use crate::data::spell::SpellId;
    use crate::math::fx;

    struct Setup {
        state: SideState,
        network: NodeNetwork,
        balance: BalanceConfig,
        bolt: GemId,
        shield_gem: GemId,
        fire: GemId,
    }

    fn fire_gem(balance: &BalanceConfig) -> Gem {
        let (charge, debuff) = SpellId::Fireball.book_costs(balance);
        Gem {
            id: GemId(0),
            element: Some(Element::Fire),
            school: BeamSchool::Pure,
            passive_stat: PassiveStat::BeamSwitch,
            passive_value: fx(-0.5),
            spell: Some(SpellId::Fireball),
            spell_charge_time: charge,
            spell_mana_debuff: debuff,
            upgraded: false,
        }
    }

    fn setup(school: BeamSchool) -> Setup {
        let balance = BalanceConfig::default();
        let mut loadout = Loadout::new(school, Element::Earth, &balance);
        loadout.all_nodes_open = true;
        let bolt = loadout.find_spell_gem(SpellId::GreyBolt).unwrap();
        let shield_gem = loadout.find_spell_gem(SpellId::Shield).unwrap();
        let fire = loadout.add_gem(fire_gem(&balance));
        loadout.slot_gem(bolt, NodeId::Crown).unwrap();
        loadout.slot_gem(shield_gem, NodeId::Throat).unwrap();
        loadout.slot_gem(fire, NodeId::LeftRoot).unwrap();
        let mut network = NodeNetwork::new(Side::Player, &balance);
        network.init(&loadout);
        let state = SideState::new(Side::Player, &loadout, &balance);
        Setup {
            state,
            network,
            balance,
            bolt,
            shield_gem,
            fire,
        }
    }

    #[test]
    fn test_channel_completes_after_timer() {
        let mut s = setup(BeamSchool::Order);
        let mut channeling = ChannelingSystem::new();
        let mut events = Vec::new();

        assert!(channeling.request_channel(&mut s.state, &s.network, s.bolt, &s.balance, &mut events));
        assert!(channeling.is_pending(s.bolt));
        assert_eq!(s.network.state(NodeId::Crown), NodeState::Open);

        channeling.update(&mut s.state, &mut s.network, fx(0.5), &mut events);
        assert!(!s.state.is_channeled(s.bolt));
        channeling.update(&mut s.state, &mut s.network, fx(0.5), &mut events);
        assert!(s.state.is_channeled(s.bolt));
        assert_eq!(s.network.state(NodeId::Crown), NodeState::Channeled);
        assert!(events.iter().any(|e| e.name() == "spell_channeled"));
    }

    #[test]
    fn test_rejections() {
        let mut s = setup(BeamSchool::Order);
        let mut channeling = ChannelingSystem::new();
        let mut events = Vec::new();

        // Non-open node.
        s.network.disrupt_node(NodeId::Crown, &mut events);
        assert!(!channeling.request_channel(&mut s.state, &s.network, s.bolt, &s.balance, &mut events));
        s.network.set_state(NodeId::Crown, NodeState::Open, &mut events);

        // Duplicate pending.
        assert!(channeling.request_channel(&mut s.state, &s.network, s.bolt, &s.balance, &mut events));
        assert!(!channeling.request_channel(&mut s.state, &s.network, s.bolt, &s.balance, &mut events));

        // Unslotted gem.
        assert!(!channeling.request_channel(&mut s.state, &s.network, GemId(99), &s.balance, &mut events));
    }

    #[test]
    fn test_cap_counts_pending() {
        let mut s = setup(BeamSchool::Order);
        s.balance.channeling.max_channeled_spells = 2;
        let mut channeling = ChannelingSystem::new();
        let mut events = Vec::new();
        assert!(channeling.request_channel(&mut s.state, &s.network, s.bolt, &s.balance, &mut events));
        assert!(channeling.request_channel(&mut s.state, &s.network, s.shield_gem, &s.balance, &mut events));
        assert!(!channeling.request_channel(&mut s.state, &s.network, s.fire, &s.balance, &mut events));
    }

    #[test]
    fn test_misfire_forces_neutral_first() {
        // A pure gem locks chaos.
        let mut s = setup(BeamSchool::Chaos);
        let mut channeling = ChannelingSystem::new();
        let mut events = Vec::new();

        assert!(channeling.request_channel(&mut s.state, &s.network, s.fire, &s.balance, &mut events));
        assert_eq!(s.state.current_beam_school, BeamSchool::Neutral);
        let names: Vec<_> = events.iter().map(CombatEvent::name).collect();
        assert_eq!(
            names,
            vec!["forced_neutral", "beam_switch_completed", "stability_damage", "misfire"]
        );

        channeling.update(&mut s.state, &mut s.network, fx(1.0), &mut events);
        assert_eq!(s.state.locked_beam_types, vec![BeamSchool::Chaos]);
        let misfire = events.iter().position(|e| e.name() == "misfire").unwrap();
        let channeled = events.iter().position(|e| e.name() == "spell_channeled").unwrap();
        assert!(misfire < channeled);
    }

    #[test]
    fn test_shield_gem_toggles_shield_availability() {
        let mut s = setup(BeamSchool::Order);
        let mut channeling = ChannelingSystem::new();
        let mut events = Vec::new();
        channeling.request_channel(&mut s.state, &s.network, s.shield_gem, &s.balance, &mut events);
        channeling.update(&mut s.state, &mut s.network, fx(1.0), &mut events);
        assert_eq!(s.state.shield_state, ShieldState::Down);

        assert!(channeling.request_unchannel(&mut s.state, &mut s.network, s.shield_gem, &mut events));
        assert_eq!(s.state.shield_state, ShieldState::Unavailable);
        assert_eq!(s.network.state(NodeId::Throat), NodeState::Open);
        assert!(!channeling.request_unchannel(&mut s.state, &mut s.network, s.shield_gem, &mut events));
    }

    #[test]
    fn test_completion_needs_open_node() {
        let mut s = setup(BeamSchool::Order);
        let mut channeling = ChannelingSystem::new();
        let mut events = Vec::new();
        channeling.request_channel(&mut s.state, &s.network, s.bolt, &s.balance, &mut events);
        s.network.damage_node(NodeId::Crown, &mut events);
        channeling.update(&mut s.state, &mut s.network, fx(1.0), &mut events);
        assert!(!s.state.is_channeled(s.bolt));
        assert!(channeling.pending().is_empty());
    }

    #[test]
    fn test_release_lost_node_and_upkeep() {
        let mut s = setup(BeamSchool::Order);
        let spells = SpellRegistry::from_balance(&s.balance);
        let mut channeling = ChannelingSystem::new();
        let mut events = Vec::new();
        channeling.request_channel(&mut s.state, &s.network, s.bolt, &s.balance, &mut events);
        channeling.request_channel(&mut s.state, &s.network, s.fire, &s.balance, &mut events);
        channeling.update(&mut s.state, &mut s.network, fx(1.0), &mut events);
        assert_eq!(
            ChannelingSystem::continuous_mana_cost(&s.state, &s.network, &spells),
            fx(3.0)
        );

        s.network.damage_node(NodeId::LeftRoot, &mut events);
        channeling.release_lost_node(&mut s.state, &s.network, NodeId::LeftRoot, &mut events);
        assert_eq!(s.state.channeled_gems, vec![s.bolt]);
        assert!(s.state.locked_beam_types.is_empty());
        assert_eq!(
            ChannelingSystem::continuous_mana_cost(&s.state, &s.network, &spells),
            fx(1.0)
        );
    }
}
