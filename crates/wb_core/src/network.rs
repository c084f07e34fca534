//! Per-side node network.
//!
//! Thirteen nodes, each `Dormant -> Open <-> Channeled`, with `Damaged` as
//! the failure state that must be repaired back to `Dormant`. A single
//! awareness token walks the graph; the node it rests on is activated or
//! repaired over time.
//!
//! Every state change goes through [`NodeNetwork::set_state`], which resets
//! progress, recomputes passive bonuses and emits
//! [`CombatEvent::NodeStateChanged`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::balance::BalanceConfig;
use crate::components::{Element, NodeId, NodeKind, NodeState, Side};
use crate::data::gem::{Gem, GemArena, GemId, PassiveStat};
use crate::data::loadout::Loadout;
use crate::events::CombatEvent;
use crate::math::{fixed_map_serde, fixed_serde, Fixed, Vec2Fixed};
use crate::pathfinding::{find_path, layout};

const MS_PER_SECOND: Fixed = Fixed::const_from_int(1000);

/// One node of the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Identity.
    pub id: NodeId,
    /// Lifecycle state.
    pub state: NodeState,
    /// Slotted gem.
    pub gem: Option<GemId>,
    /// Activation or repair progress in `[0, 1]`.
    #[serde(with = "fixed_serde")]
    pub activation_progress: Fixed,
    /// Arena position in pixels.
    pub position: Vec2Fixed,
}

/// The awareness token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Awareness {
    /// Node the token is at (or departing from while travelling).
    pub node: NodeId,
    /// Final destination of the current path.
    pub target: Option<NodeId>,
    /// Remaining hops, next hop first.
    pub path: Vec<NodeId>,
    /// Seconds spent on the current hop.
    #[serde(with = "fixed_serde")]
    pub travel_progress: Fixed,
    /// Repairing a damaged node met on the path.
    pub repairing: bool,
    /// Seconds spent on the in-transit repair.
    #[serde(with = "fixed_serde")]
    pub repair_timer: Fixed,
}

impl Awareness {
    fn at(node: NodeId) -> Self {
        Self {
            node,
            target: None,
            path: Vec::new(),
            travel_progress: Fixed::ZERO,
            repairing: false,
            repair_timer: Fixed::ZERO,
        }
    }
}

/// A side's node graph, gems and awareness token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeNetwork {
    side: Side,
    nodes: BTreeMap<NodeId, Node>,
    gems: GemArena,
    awareness: Awareness,
    #[serde(with = "fixed_serde")]
    awareness_speed: Fixed,
    #[serde(with = "fixed_serde")]
    activation_time_multiplier: Fixed,
    #[serde(with = "fixed_map_serde")]
    passive_bonuses: BTreeMap<PassiveStat, Fixed>,
}

impl NodeNetwork {
    /// Create an all-dormant network for a side, positioned in the arena.
    #[must_use]
    pub fn new(side: Side, balance: &BalanceConfig) -> Self {
        let nodes = NodeId::ALL
            .into_iter()
            .map(|id| {
                let (x, y) = layout(id);
                let x = match side {
                    Side::Player => x,
                    Side::Enemy => balance.arena.width - x,
                };
                let node = Node {
                    id,
                    state: NodeState::Dormant,
                    gem: None,
                    activation_progress: Fixed::ZERO,
                    position: Vec2Fixed::from_ints(x, y),
                };
                (id, node)
            })
            .collect();

        Self {
            side,
            nodes,
            gems: GemArena::new(),
            awareness: Awareness::at(NodeId::Belly),
            awareness_speed: balance.nodes.awareness_travel_time,
            activation_time_multiplier: Fixed::ONE,
            passive_bonuses: BTreeMap::new(),
        }
    }

    /// Reset for a new combat.
    ///
    /// Slots the loadout's gems (assignments to unknown gems are skipped),
    /// opens the attuned beam node (or every node for bosses) and parks the
    /// awareness token there. No events are emitted.
    pub fn init(&mut self, loadout: &Loadout) {
        for node in self.nodes.values_mut() {
            node.state = NodeState::Dormant;
            node.gem = None;
            node.activation_progress = Fixed::ZERO;
        }

        self.gems = loadout.gems.clone();
        for (&node_id, &gem) in &loadout.gem_slots {
            if !self.gems.contains(gem) {
                continue;
            }
            if let Some(node) = self.nodes.get_mut(&node_id) {
                node.gem = Some(gem);
            }
        }

        let attuned = loadout.school_attunement.beam_node();
        if let Some(node) = attuned.and_then(|id| self.nodes.get_mut(&id)) {
            node.state = NodeState::Open;
        }

        if loadout.all_nodes_open {
            for node in self.nodes.values_mut() {
                node.state = NodeState::Open;
            }
        }

        self.awareness = Awareness::at(attuned.unwrap_or(NodeId::Sternum));
        self.awareness_speed = loadout.awareness_speed;
        self.activation_time_multiplier = loadout.activation_time_multiplier;
        self.recalc_passives();
    }

    /// Owning side.
    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    /// A node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        // Every NodeId is inserted at construction.
        &self.nodes[&id]
    }

    /// Every node in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// State of a node.
    #[must_use]
    pub fn state(&self, id: NodeId) -> NodeState {
        self.node(id).state
    }

    /// Whether a node is open (not channeled).
    #[must_use]
    pub fn is_open(&self, id: NodeId) -> bool {
        self.state(id) == NodeState::Open
    }

    /// Nodes currently in a state.
    #[must_use]
    pub fn nodes_in(&self, state: NodeState) -> Vec<NodeId> {
        self.nodes()
            .filter(|n| n.state == state)
            .map(|n| n.id)
            .collect()
    }

    /// Unconditional transition; the only way node state changes in combat.
    pub fn set_state(&mut self, id: NodeId, new: NodeState, events: &mut Vec<CombatEvent>) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        let old = node.state;
        node.state = new;
        node.activation_progress = Fixed::ZERO;
        let snapshot = node.clone();
        self.recalc_passives();
        events.push(CombatEvent::NodeStateChanged {
            side: self.side,
            node: id,
            old,
            new,
            snapshot,
        });
    }

    /// Break a node.
    pub fn damage_node(&mut self, id: NodeId, events: &mut Vec<CombatEvent>) {
        self.set_state(id, NodeState::Damaged, events);
    }

    /// Knock a node back to dormant.
    pub fn disrupt_node(&mut self, id: NodeId, events: &mut Vec<CombatEvent>) {
        self.set_state(id, NodeState::Dormant, events);
    }

    // ---- gems ----

    /// Gems carried into this combat.
    #[must_use]
    pub const fn gems(&self) -> &GemArena {
        &self.gems
    }

    /// Look up a carried gem.
    #[must_use]
    pub fn gem(&self, id: GemId) -> Option<&Gem> {
        self.gems.get(id)
    }

    /// Gem slotted in a node.
    #[must_use]
    pub fn gem_at_node(&self, id: NodeId) -> Option<&Gem> {
        self.node(id).gem.and_then(|gem| self.gems.get(gem))
    }

    /// Node holding a gem.
    #[must_use]
    pub fn node_of_gem(&self, gem: GemId) -> Option<NodeId> {
        self.nodes().find(|n| n.gem == Some(gem)).map(|n| n.id)
    }

    /// Put a carried gem into a gem-slot node, moving it out of any other slot.
    ///
    /// Returns `false` for unknown gems and non gem-slot nodes.
    pub fn slot_gem(&mut self, id: NodeId, gem: GemId) -> bool {
        if !self.gems.contains(gem) || id.kind() != NodeKind::GemSlot {
            return false;
        }
        for node in self.nodes.values_mut() {
            if node.gem == Some(gem) {
                node.gem = None;
            }
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.gem = Some(gem);
        }
        self.recalc_passives();
        true
    }

    /// Empty a node's slot.
    pub fn unslot_gem(&mut self, id: NodeId) -> Option<GemId> {
        let removed = self.nodes.get_mut(&id).and_then(|n| n.gem.take());
        if removed.is_some() {
            self.recalc_passives();
        }
        removed
    }

    // ---- derived queries ----

    fn recalc_passives(&mut self) {
        let mut bonuses = BTreeMap::new();
        for node in self.nodes.values() {
            if !node.state.is_active() {
                continue;
            }
            if let Some(gem) = node.gem.and_then(|g| self.gems.get(g)) {
                *bonuses.entry(gem.passive_stat).or_insert(Fixed::ZERO) += gem.passive_value;
            }
        }
        self.passive_bonuses = bonuses;
    }

    /// Summed passive bonus of gems on open or channeled nodes.
    #[must_use]
    pub fn passive_bonus(&self, stat: PassiveStat) -> Fixed {
        self.passive_bonuses
            .get(&stat)
            .copied()
            .unwrap_or(Fixed::ZERO)
    }

    /// Count of open or channeled mana nodes (at most 10).
    #[must_use]
    pub fn node_mana(&self) -> u32 {
        let count = self
            .nodes()
            .filter(|n| n.id.contributes_mana() && n.state.is_active())
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Whether every mana node is open or channeled.
    #[must_use]
    pub fn all_mana_nodes_active(&self) -> bool {
        self.nodes()
            .filter(|n| n.id.contributes_mana())
            .all(|n| n.state.is_active())
    }

    /// Element with the most open gems, counting the attunement once more.
    ///
    /// Channeled gems do not count. Ties go to the attunement.
    #[must_use]
    pub fn dominant_element(&self, attunement: Element) -> Element {
        let mut counts = [0u32; 4];
        let index = |e: Element| Element::ALL.iter().position(|x| *x == e).unwrap_or(0);

        for node in self.nodes() {
            if node.state != NodeState::Open {
                continue;
            }
            if let Some(element) = self.gem_at_node(node.id).and_then(|g| g.element) {
                counts[index(element)] += 1;
            }
        }
        counts[index(attunement)] += 1;

        let mut best = 0;
        let mut dominant = attunement;
        for (element, count) in Element::ALL.into_iter().zip(counts) {
            if count > best || (count == best && element == attunement) {
                best = count;
                dominant = element;
            }
        }
        dominant
    }

    // ---- timing ----

    /// Milliseconds per hop after passives, floored.
    #[must_use]
    pub fn effective_awareness_speed(&self, balance: &BalanceConfig) -> Fixed {
        let bonus = self.passive_bonus(PassiveStat::AwarenessSpeed);
        (self.awareness_speed + bonus).max(balance.floors.awareness_speed)
    }

    /// Seconds to open a dormant node.
    #[must_use]
    pub fn effective_activation_time(&self, balance: &BalanceConfig) -> Fixed {
        let bonus = self.passive_bonus(PassiveStat::ActivationSpeed);
        ((balance.nodes.activation_time + bonus) * self.activation_time_multiplier)
            .max(balance.floors.activation_speed)
    }

    /// Seconds to repair a damaged node.
    #[must_use]
    pub fn effective_repair_time(&self, balance: &BalanceConfig) -> Fixed {
        let bonus = self.passive_bonus(PassiveStat::NodeRepair);
        ((balance.nodes.repair_time + bonus) * self.activation_time_multiplier)
            .max(balance.floors.node_repair)
    }

    /// Base milliseconds per hop before passives.
    #[must_use]
    pub const fn awareness_speed(&self) -> Fixed {
        self.awareness_speed
    }

    /// Change the base hop time.
    pub fn set_awareness_speed(&mut self, ms: Fixed) {
        self.awareness_speed = ms;
    }

    /// Multiplier on activation and repair times.
    #[must_use]
    pub const fn activation_time_multiplier(&self) -> Fixed {
        self.activation_time_multiplier
    }

    // ---- awareness ----

    /// The awareness token.
    #[must_use]
    pub const fn awareness(&self) -> &Awareness {
        &self.awareness
    }

    /// Whether the token has a path in flight.
    #[must_use]
    pub fn is_traveling(&self) -> bool {
        !self.awareness.path.is_empty()
    }

    /// Send the token toward a node.
    ///
    /// No-op (returns `false`) while travelling or when already there.
    pub fn set_awareness_target(&mut self, target: NodeId) -> bool {
        if self.is_traveling() || target == self.awareness.node {
            return false;
        }
        let path = find_path(self.awareness.node, target);
        if path.len() < 2 {
            return false;
        }
        self.awareness.target = Some(target);
        self.awareness.path = path[1..].to_vec();
        self.awareness.travel_progress = Fixed::ZERO;
        self.awareness.repairing = false;
        self.awareness.repair_timer = Fixed::ZERO;
        true
    }

    /// Interpolated token position for rendering.
    #[must_use]
    pub fn awareness_position(&self, balance: &BalanceConfig) -> Vec2Fixed {
        let here = self.node(self.awareness.node).position;
        let Some(&next) = self.awareness.path.first() else {
            return here;
        };
        if self.awareness.repairing {
            return here;
        }
        let hop = self.effective_awareness_speed(balance) / MS_PER_SECOND;
        let t = (self.awareness.travel_progress / hop).min(Fixed::ONE);
        here.lerp(self.node(next).position, t)
    }

    /// Advance activation, repair and travel.
    pub fn update(&mut self, dt: Fixed, balance: &BalanceConfig, events: &mut Vec<CombatEvent>) {
        let Some(&next) = self.awareness.path.first() else {
            self.process_current_node(dt, balance, events);
            return;
        };

        let hop = self.effective_awareness_speed(balance) / MS_PER_SECOND;

        // Step onto a damaged node ahead and repair it before moving on.
        if self.state(next) == NodeState::Damaged
            && !self.awareness.repairing
            && self.awareness.node != next
        {
            self.awareness.travel_progress += dt;
            if self.awareness.travel_progress >= hop {
                self.awareness.node = next;
                self.awareness.travel_progress = Fixed::ZERO;
                self.awareness.repairing = true;
                self.awareness.repair_timer = Fixed::ZERO;
            }
            return;
        }

        if self.awareness.repairing {
            let here = self.awareness.node;
            if self.state(here) != NodeState::Damaged {
                self.finish_in_transit_repair();
                return;
            }
            self.awareness.repair_timer += dt;
            if self.awareness.repair_timer >= self.effective_repair_time(balance) {
                self.set_state(here, NodeState::Dormant, events);
                self.finish_in_transit_repair();
            }
            return;
        }

        self.awareness.travel_progress += dt;
        if self.awareness.travel_progress >= hop {
            self.awareness.node = next;
            self.awareness.travel_progress = Fixed::ZERO;
            self.awareness.path.remove(0);
            if self.awareness.path.is_empty() {
                self.awareness.target = None;
            }
        }
    }

    fn finish_in_transit_repair(&mut self) {
        self.awareness.repairing = false;
        self.awareness.repair_timer = Fixed::ZERO;
        if !self.awareness.path.is_empty() {
            self.awareness.path.remove(0);
        }
        if self.awareness.path.is_empty() {
            self.awareness.target = None;
        }
    }

    fn process_current_node(
        &mut self,
        dt: Fixed,
        balance: &BalanceConfig,
        events: &mut Vec<CombatEvent>,
    ) {
        let id = self.awareness.node;
        let (time, next_state) = match self.state(id) {
            NodeState::Damaged => (self.effective_repair_time(balance), NodeState::Dormant),
            NodeState::Dormant => (self.effective_activation_time(balance), NodeState::Open),
            NodeState::Open | NodeState::Channeled => return,
        };

        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        node.activation_progress += dt / time;
        if node.activation_progress >= Fixed::ONE {
            self.set_state(id, next_state, events);
        }
    }
}
