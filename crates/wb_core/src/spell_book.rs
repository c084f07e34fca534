//! Hold-to-charge casting front-end.
//!
//! A side selects one of its channeled spells, holds to charge it for the
//! gem's charge time and then resolves it at a target. While charging or
//! ready the gem's mana debuff is written to the side's state.

use serde::{Deserialize, Serialize};

use crate::components::NodeId;
use crate::data::gem::GemId;
use crate::data::spell::{SpellId, SpellRegistry, Targeting};
use crate::math::{fixed_serde, Fixed};
use crate::network::NodeNetwork;
use crate::side::SideState;
use crate::spell_caster::SpellCaster;

/// Spell book state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpellBookState {
    /// Nothing held.
    #[default]
    Idle,
    /// Holding; the charge timer runs.
    Charging,
    /// Charged and waiting for a target.
    Ready,
}

/// A spell the book can charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellEntry {
    /// Channeled gem.
    pub gem: GemId,
    /// Its spell.
    pub spell: SpellId,
    /// Node holding the gem.
    pub node: NodeId,
}

/// Per-side spell book.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellBook {
    state: SpellBookState,
    selected: usize,
    active: Option<SpellEntry>,
    #[serde(with = "fixed_serde")]
    charge_timer: Fixed,
}

impl SpellBook {
    /// Create an idle book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> SpellBookState {
        self.state
    }

    /// Channeled spell gems except the shield, in channel order.
    #[must_use]
    pub fn available_spells(state: &SideState, network: &NodeNetwork) -> Vec<SpellEntry> {
        state
            .channeled_gems
            .iter()
            .filter_map(|&gem| {
                let record = network.gem(gem)?;
                let spell = record.spell.filter(|s| s.is_damage())?;
                let node = network.node_of_gem(gem)?;
                Some(SpellEntry { gem, spell, node })
            })
            .collect()
    }

    /// Entry under the selection cursor.
    #[must_use]
    pub fn selected_entry(&self, state: &SideState, network: &NodeNetwork) -> Option<SpellEntry> {
        let spells = Self::available_spells(state, network);
        let last = spells.len().checked_sub(1)?;
        spells.get(self.selected.min(last)).copied()
    }

    /// Entry being charged or held ready, else the selection.
    #[must_use]
    pub fn active_entry(&self, state: &SideState, network: &NodeNetwork) -> Option<SpellEntry> {
        self.active.or_else(|| self.selected_entry(state, network))
    }

    /// Move the selection left (idle only).
    pub fn cycle_left(&mut self, state: &SideState, network: &NodeNetwork) {
        let len = Self::available_spells(state, network).len();
        if self.state != SpellBookState::Idle || len == 0 {
            return;
        }
        self.selected = (self.selected.min(len - 1) + len - 1) % len;
    }

    /// Move the selection right (idle only).
    pub fn cycle_right(&mut self, state: &SideState, network: &NodeNetwork) {
        let len = Self::available_spells(state, network).len();
        if self.state != SpellBookState::Idle || len == 0 {
            return;
        }
        self.selected = (self.selected.min(len - 1) + 1) % len;
    }

    /// Start charging the selected spell.
    ///
    /// Rejected unless idle with a selection that is off cooldown.
    pub fn start_hold(
        &mut self,
        state: &mut SideState,
        network: &NodeNetwork,
        caster: &SpellCaster,
    ) -> bool {
        if self.state != SpellBookState::Idle {
            return false;
        }
        let Some(entry) = self.selected_entry(state, network) else {
            return false;
        };
        if caster.is_on_cooldown(state.side, entry.spell) {
            return false;
        }
        self.state = SpellBookState::Charging;
        self.active = Some(entry);
        self.charge_timer = Fixed::ZERO;
        self.sync_debuff(state, network);
        true
    }

    /// Release a hold before it charged.
    pub fn cancel_hold(&mut self, state: &mut SideState) -> bool {
        if self.state != SpellBookState::Charging {
            return false;
        }
        self.reset(state);
        true
    }

    /// Drop a charged spell without casting it.
    pub fn cancel_ready(&mut self, state: &mut SideState) -> bool {
        if self.state != SpellBookState::Ready {
            return false;
        }
        self.reset(state);
        true
    }

    /// Take the charged spell for casting and return to idle.
    pub fn take_ready(&mut self, state: &mut SideState) -> Option<SpellId> {
        if self.state != SpellBookState::Ready {
            return None;
        }
        let spell = self.active.map(|entry| entry.spell);
        self.reset(state);
        spell
    }

    /// `(remaining, total)` charge seconds while charging.
    #[must_use]
    pub fn charge_progress(&self, network: &NodeNetwork) -> Option<(Fixed, Fixed)> {
        if self.state != SpellBookState::Charging {
            return None;
        }
        let total = network.gem(self.active?.gem)?.spell_charge_time;
        Some(((total - self.charge_timer).max(Fixed::ZERO), total))
    }

    /// Advance the charge.
    ///
    /// Returns an immediate spell that finished charging; the book is already
    /// idle again and the caller casts it without a target. A held gem that
    /// stopped being channeled cancels the book.
    pub fn update(
        &mut self,
        dt: Fixed,
        state: &mut SideState,
        network: &NodeNetwork,
        spells: &SpellRegistry,
    ) -> Option<SpellId> {
        if let Some(entry) = self.active {
            if !state.is_channeled(entry.gem) {
                tracing::debug!(side = state.side.as_str(), gem = %entry.gem, "Spell book lost its gem");
                self.reset(state);
                return None;
            }
        }

        if self.state == SpellBookState::Charging {
            self.charge_timer += dt;
            let entry = self.active?;
            let charge_time = network
                .gem(entry.gem)
                .map_or(Fixed::ZERO, |g| g.spell_charge_time);
            if self.charge_timer >= charge_time {
                self.state = SpellBookState::Ready;
                let immediate = spells
                    .get(entry.spell)
                    .is_some_and(|s| s.targeting == Targeting::Immediate);
                if immediate {
                    return self.take_ready(state);
                }
            }
        }

        self.sync_debuff(state, network);
        None
    }

    fn reset(&mut self, state: &mut SideState) {
        self.state = SpellBookState::Idle;
        self.active = None;
        self.charge_timer = Fixed::ZERO;
        state.spell_book_debuff = Fixed::ZERO;
    }

    fn sync_debuff(&self, state: &mut SideState, network: &NodeNetwork) {
        state.spell_book_debuff = match (self.state, self.active) {
            (SpellBookState::Idle, _) | (_, None) => Fixed::ZERO,
            (_, Some(entry)) => network
                .gem(entry.gem)
                .map_or(Fixed::ZERO, |g| g.spell_mana_debuff),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::BalanceConfig;
    use crate::channeling::ChannelingSystem;
    use crate::components::{BeamSchool, Element, NodeState, Side};
    use crate::data::gem::{Gem, PassiveStat};
    use crate::data::loadout::Loadout;
    use crate::math::fx;

    fn gem(spell: SpellId, balance: &BalanceConfig) -> Gem {
        let (charge, debuff) = spell.book_costs(balance);
        Gem {
            id: GemId(0),
            element: spell.element(),
            school: BeamSchool::Neutral,
            passive_stat: PassiveStat::NodeRepair,
            passive_value: fx(-0.5),
            spell: Some(spell),
            spell_charge_time: charge,
            spell_mana_debuff: debuff,
            upgraded: false,
        }
    }

    /// Side with bolt on the crown, fireball on the throat, the shield on the
    /// left root, all channeled.
    fn setup() -> (SideState, NodeNetwork, BalanceConfig) {
        let balance = BalanceConfig::default();
        let mut loadout = Loadout::empty(BeamSchool::Pure, Element::Fire, &balance);
        loadout.all_nodes_open = true;
        let mut gems = Vec::new();
        for (spell, node) in [
            (SpellId::GreyBolt, NodeId::Crown),
            (SpellId::Fireball, NodeId::Throat),
            (SpellId::Shield, NodeId::LeftRoot),
        ] {
            let id = loadout.add_gem(gem(spell, &balance));
            loadout.slot_gem(id, node).unwrap();
            gems.push(id);
        }
        let mut network = NodeNetwork::new(Side::Player, &balance);
        network.init(&loadout);
        let mut state = SideState::new(Side::Player, &loadout, &balance);
        let mut channeling = ChannelingSystem::new();
        let mut events = Vec::new();
        for id in gems {
            channeling.request_channel(&mut state, &network, id, &balance, &mut events);
        }
        channeling.update(&mut state, &mut network, fx(1.0), &mut events);
        (state, network, balance)
    }

    #[test]
    fn test_open_gems_are_not_listed_until_channeled() {
        let balance = BalanceConfig::default();
        let mut loadout = Loadout::empty(BeamSchool::Pure, Element::Fire, &balance);
        loadout.all_nodes_open = true;
        let bolt = loadout.add_gem(gem(SpellId::GreyBolt, &balance));
        loadout.slot_gem(bolt, NodeId::Crown).unwrap();
        let fireball = loadout.add_gem(gem(SpellId::Fireball, &balance));
        loadout.slot_gem(fireball, NodeId::Throat).unwrap();

        let mut network = NodeNetwork::new(Side::Player, &balance);
        network.init(&loadout);
        let mut state = SideState::new(Side::Player, &loadout, &balance);
        assert_eq!(network.state(NodeId::Throat), NodeState::Open);
        assert!(SpellBook::available_spells(&state, &network).is_empty());

        let mut channeling = ChannelingSystem::new();
        let mut events = Vec::new();
        assert!(channeling.request_channel(&mut state, &network, fireball, &balance, &mut events));
        channeling.update(&mut state, &mut network, fx(1.0), &mut events);

        let listed = SpellBook::available_spells(&state, &network);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].gem, fireball);
        assert_eq!(listed[0].node, NodeId::Throat);
    }

    #[test]
    fn test_available_spells_skip_shield() {
        let (state, network, _) = setup();
        let spells: Vec<SpellId> = SpellBook::available_spells(&state, &network)
            .iter()
            .map(|e| e.spell)
            .collect();
        assert_eq!(spells, vec![SpellId::GreyBolt, SpellId::Fireball]);
    }

    #[test]
    fn test_cycle_wraps_when_idle() {
        let (state, network, _) = setup();
        let mut book = SpellBook::new();
        book.cycle_left(&state, &network);
        assert_eq!(book.selected_entry(&state, &network).map(|e| e.spell), Some(SpellId::Fireball));
        book.cycle_right(&state, &network);
        assert_eq!(book.selected_entry(&state, &network).map(|e| e.spell), Some(SpellId::GreyBolt));
    }

    #[test]
    fn test_charge_applies_debuff_then_ready() {
        let (mut state, network, balance) = setup();
        let spells = SpellRegistry::from_balance(&balance);
        let caster = SpellCaster::new();
        let mut book = SpellBook::new();

        assert!(book.start_hold(&mut state, &network, &caster));
        assert_eq!(state.spell_book_debuff, fx(2.0));
        assert!(!book.start_hold(&mut state, &network, &caster));

        // Cycling is locked while charging.
        book.cycle_right(&state, &network);
        assert_eq!(book.active_entry(&state, &network).map(|e| e.spell), Some(SpellId::GreyBolt));

        assert_eq!(book.update(fx(1.0), &mut state, &network, &spells), None);
        assert_eq!(book.charge_progress(&network), Some((fx(0.5), fx(1.5))));
        book.update(fx(0.5), &mut state, &network, &spells);
        assert_eq!(book.state(), SpellBookState::Ready);
        assert_eq!(state.spell_book_debuff, fx(2.0));

        assert_eq!(book.take_ready(&mut state), Some(SpellId::GreyBolt));
        assert_eq!(book.state(), SpellBookState::Idle);
        assert_eq!(state.spell_book_debuff, Fixed::ZERO);
    }

    #[test]
    fn test_cancel_hold_clears_debuff() {
        let (mut state, network, _) = setup();
        let caster = SpellCaster::new();
        let mut book = SpellBook::new();
        book.start_hold(&mut state, &network, &caster);
        assert!(!book.cancel_ready(&mut state));
        assert!(book.cancel_hold(&mut state));
        assert_eq!(state.spell_book_debuff, Fixed::ZERO);
        assert_eq!(book.take_ready(&mut state), None);
    }

    #[test]
    fn test_immediate_spell_auto_fires() {
        let balance = BalanceConfig::default();
        let mut loadout = Loadout::empty(BeamSchool::Pure, Element::Air, &balance);
        loadout.all_nodes_open = true;
        let choke = loadout.add_gem(gem(SpellId::AirChoke, &balance));
        loadout.slot_gem(choke, NodeId::Crown).unwrap();
        let mut network = NodeNetwork::new(Side::Enemy, &balance);
        network.init(&loadout);
        let mut state = SideState::new(Side::Enemy, &loadout, &balance);
        let mut channeling = ChannelingSystem::new();
        let mut events = Vec::new();
        channeling.request_channel(&mut state, &network, choke, &balance, &mut events);
        channeling.update(&mut state, &mut network, fx(1.0), &mut events);

        let spells = SpellRegistry::from_balance(&balance);
        let mut book = SpellBook::new();
        book.start_hold(&mut state, &network, &SpellCaster::new());
        assert_eq!(book.update(fx(2.0), &mut state, &network, &spells), Some(SpellId::AirChoke));
        assert_eq!(book.state(), SpellBookState::Idle);
        assert_eq!(state.spell_book_debuff, Fixed::ZERO);
    }

    #[test]
    fn test_losing_gem_cancels() {
        let (mut state, network, balance) = setup();
        let spells = SpellRegistry::from_balance(&balance);
        let mut book = SpellBook::new();
        book.start_hold(&mut state, &network, &SpellCaster::new());
        state.channeled_gems.retain(|g| network.node_of_gem(*g) != Some(NodeId::Crown));
        book.update(fx(0.1), &mut state, &network, &spells);
        assert_eq!(book.state(), SpellBookState::Idle);
        assert_eq!(state.spell_book_debuff, Fixed::ZERO);
    }
}
