//! What a combatant brings into a fight.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::balance::BalanceConfig;
use crate::components::{BeamSchool, Element, NodeId, NodeKind};
use crate::data::gem::{create_grey_bolt, create_shield_gem, Gem, GemArena, GemId};
use crate::error::{CombatError, Result};
use crate::math::{fixed_serde, Fixed};

/// Attunements, HP, gems and slot assignments for one side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loadout {
    /// Beam school the side starts on; its beam node starts open.
    pub school_attunement: BeamSchool,
    /// Element that seeds the dominant element.
    pub element_attunement: Element,
    /// Current HP.
    pub hp: i32,
    /// Maximum HP.
    pub max_hp: i32,
    /// Every gem carried.
    pub gems: GemArena,
    /// Slot assignments, node to gem.
    pub gem_slots: BTreeMap<NodeId, GemId>,
    /// Milliseconds per awareness hop before passives.
    #[serde(with = "fixed_serde")]
    pub awareness_speed: Fixed,
    /// Multiplier on activation and repair times.
    #[serde(with = "fixed_serde")]
    pub activation_time_multiplier: Fixed,
    /// Open every node at combat start.
    pub all_nodes_open: bool,
}

impl Loadout {
    /// A fresh run: starting HP plus an unslotted grey bolt and shield gem.
    #[must_use]
    pub fn new(school: BeamSchool, element: Element, balance: &BalanceConfig) -> Self {
        let mut gems = GemArena::new();
        create_grey_bolt(&mut gems, balance);
        create_shield_gem(&mut gems, balance);
        Self {
            school_attunement: school,
            element_attunement: element,
            hp: balance.hp.starting_max,
            max_hp: balance.hp.starting_max,
            gems,
            gem_slots: BTreeMap::new(),
            awareness_speed: balance.nodes.awareness_travel_time,
            activation_time_multiplier: Fixed::ONE,
            all_nodes_open: false,
        }
    }

    /// A loadout with no gems at all.
    #[must_use]
    pub fn empty(school: BeamSchool, element: Element, balance: &BalanceConfig) -> Self {
        let mut loadout = Self::new(school, element, balance);
        loadout.gems = GemArena::new();
        loadout
    }

    /// Add a gem to the collection without slotting it.
    pub fn add_gem(&mut self, gem: Gem) -> GemId {
        self.gems.add(gem)
    }

    /// First gem carrying a spell.
    #[must_use]
    pub fn find_spell_gem(&self, spell: crate::data::spell::SpellId) -> Option<GemId> {
        self.gems.iter().find(|g| g.spell == Some(spell)).map(|g| g.id)
    }

    /// Put a gem into a gem-slot node.
    ///
    /// The gem leaves any slot it occupied, and whatever gem sat in the target
    /// node becomes unslotted.
    pub fn slot_gem(&mut self, gem: GemId, node: NodeId) -> Result<()> {
        if !self.gems.contains(gem) {
            return Err(CombatError::UnknownGem(gem.0));
        }
        if node.kind() != NodeKind::GemSlot {
            return Err(CombatError::InvalidState(format!(
                "Node '{node}' cannot hold a gem"
            )));
        }
        self.gem_slots.retain(|_, slotted| *slotted != gem);
        self.gem_slots.insert(node, gem);
        Ok(())
    }

    /// Empty a slot, returning the gem that was there.
    pub fn unslot_gem(&mut self, node: NodeId) -> Option<GemId> {
        self.gem_slots.remove(&node)
    }

    /// Gems not assigned to any slot.
    #[must_use]
    pub fn unslotted_gems(&self) -> Vec<GemId> {
        self.gems
            .iter()
            .map(|g| g.id)
            .filter(|id| !self.gem_slots.values().any(|slotted| slotted == id))
            .collect()
    }

    /// Check slot assignments reference carried gems in gem-slot nodes.
    pub fn validate(&self) -> Result<()> {
        for (node, gem) in &self.gem_slots {
            if !self.gems.contains(*gem) {
                return Err(CombatError::UnknownGem(gem.0));
            }
            if node.kind() != NodeKind::GemSlot {
                return Err(CombatError::InvalidState(format!(
                    "Node '{node}' cannot hold a gem"
                )));
            }
        }
        if self.hp <= 0 || self.max_hp <= 0 {
            return Err(CombatError::InvalidState(
                "Loadout HP must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
