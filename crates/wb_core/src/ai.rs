//! Combat AI.
//!
//! Works for either side. Every decision interval the AI reads a snapshot of
//! both combatants and emits [`AiCommand`]s, which the simulation applies
//! through the same entry points a human player uses. Priorities run in a
//! fixed order: awareness, shield, damage spell, beam.

use serde::{Deserialize, Serialize};

use crate::balance::BalanceConfig;
use crate::components::{BeamSchool, BeamSwitchState, NodeId, NodeKind, NodeState, ShieldState, Side};
use crate::data::enemy::EnemyProfile;
use crate::data::gem::GemId;
use crate::data::spell::{SpellId, SpellRegistry, Targeting};
use crate::math::{fixed_serde, Fixed};
use crate::network::NodeNetwork;
use crate::rng::{choose, RandomSource};
use crate::side::SideState;
use crate::spell_caster::{SpellCaster, SpellTarget};

const COLLISION_MAX: Fixed = Fixed::const_from_int(100);

/// Tunables that differ between opponents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiProfile {
    /// Tier for targeting weights (1 is uniform).
    pub tier: u8,
    /// Seconds between beam decisions.
    #[serde(with = "fixed_serde")]
    pub reaction_time: Fixed,
    /// Schools the AI may switch to.
    pub beam_types_unlocked: Vec<BeamSchool>,
}

impl AiProfile {
    /// Profile of a generated enemy.
    #[must_use]
    pub fn from_enemy(profile: &EnemyProfile) -> Self {
        Self {
            tier: profile.tier,
            reaction_time: profile.reaction_time,
            beam_types_unlocked: profile.beam_types_unlocked.clone(),
        }
    }

    /// Profile with every school unlocked, for a tier row.
    pub fn for_tier(tier: u8, balance: &BalanceConfig) -> crate::error::Result<Self> {
        let row = balance.tier(tier)?;
        Ok(Self {
            tier,
            reaction_time: row.reaction_time,
            beam_types_unlocked: BeamSchool::ATTACK.to_vec(),
        })
    }
}

/// A decision, applied by the simulation for the AI's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum AiCommand {
    /// Panic began: apply the mana bonus and speed up awareness.
    BeginPanic,
    /// Panic wore off.
    EndPanic,
    /// Move the awareness token.
    SetAwarenessTarget {
        /// Destination.
        node: NodeId,
    },
    /// Channel a gem.
    Channel {
        /// Gem to channel.
        gem: GemId,
    },
    /// Release a channeled gem.
    Unchannel {
        /// Gem to release.
        gem: GemId,
    },
    /// Raise or lower the shield.
    ToggleShield,
    /// Cast a channeled spell.
    Cast {
        /// Spell.
        spell: SpellId,
        /// Target.
        target: SpellTarget,
    },
    /// Switch beam school.
    Switch {
        /// Requested school.
        school: BeamSchool,
    },
}

/// Read-only view of the combat handed to the AI.
pub struct AiView<'a> {
    /// The AI's own side.
    pub own: &'a SideState,
    /// Its network.
    pub own_network: &'a NodeNetwork,
    /// The opponent.
    pub opponent: &'a SideState,
    /// The opponent's network.
    pub opponent_network: &'a NodeNetwork,
    /// Shared collision point.
    pub collision_point: Fixed,
    /// Cooldown lookup.
    pub caster: &'a SpellCaster,
    /// Tunables.
    pub balance: &'a BalanceConfig,
    /// Spell descriptors.
    pub spells: &'a SpellRegistry,
}

/// Decision-making state for one AI-controlled side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatAi {
    side: Side,
    profile: AiProfile,
    #[serde(with = "fixed_serde")]
    decision_timer: Fixed,
    #[serde(with = "fixed_serde")]
    spell_timer: Fixed,
    #[serde(with = "fixed_serde")]
    reaction_timer: Fixed,
    panic_active: bool,
    panic_used: bool,
    #[serde(with = "fixed_serde")]
    panic_timer: Fixed,
}

impl CombatAi {
    /// Create an AI for a side.
    #[must_use]
    pub fn new(side: Side, profile: AiProfile) -> Self {
        Self {
            side,
            profile,
            decision_timer: Fixed::ZERO,
            spell_timer: Fixed::ZERO,
            reaction_timer: Fixed::ZERO,
            panic_active: false,
            panic_used: false,
            panic_timer: Fixed::ZERO,
        }
    }

    /// Controlled side.
    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    /// Targeting and reaction profile.
    #[must_use]
    pub const fn profile(&self) -> &AiProfile {
        &self.profile
    }

    /// Whether panic is running.
    #[must_use]
    pub const fn is_panicking(&self) -> bool {
        self.panic_active
    }

    /// Advance timers and, on a decision tick, decide.
    pub fn update(
        &mut self,
        dt: Fixed,
        view: &AiView<'_>,
        rng: &mut dyn RandomSource,
    ) -> Vec<AiCommand> {
        self.decision_timer += dt;
        self.spell_timer += dt;
        self.reaction_timer += dt;

        let mut commands = Vec::new();
        self.update_panic(dt, view, &mut commands);

        if self.decision_timer < view.balance.enemy.ai_decision_interval {
            return commands;
        }
        self.decision_timer = Fixed::ZERO;

        if let Some(node) = awareness_target(view) {
            commands.push(AiCommand::SetAwarenessTarget { node });
        }
        shield_decision(view, &mut commands);
        self.spell_decision(view, rng, &mut commands);
        if let Some(school) = self.beam_decision(view) {
            self.reaction_timer = Fixed::ZERO;
            commands.push(AiCommand::Switch { school });
        }

        if !commands.is_empty() {
            tracing::trace!(side = self.side.as_str(), ?commands, "AI decisions");
        }
        commands
    }

    /// Distance of the collision point from this side's losing edge.
    fn remaining(&self, collision: Fixed) -> Fixed {
        match self.side {
            Side::Player => collision,
            Side::Enemy => COLLISION_MAX - collision,
        }
    }

    fn update_panic(&mut self, dt: Fixed, view: &AiView<'_>, commands: &mut Vec<AiCommand>) {
        let panic = &view.balance.enemy.panic;
        if self.panic_active {
            self.panic_timer -= dt;
            if self.panic_timer <= Fixed::ZERO {
                self.panic_active = false;
                commands.push(AiCommand::EndPanic);
            }
        } else if !self.panic_used && self.remaining(view.collision_point) <= panic.threshold {
            self.panic_active = true;
            self.panic_used = true;
            self.panic_timer = panic.duration;
            tracing::debug!(side = self.side.as_str(), "AI panic");
            commands.push(AiCommand::BeginPanic);
        }
    }

    fn spell_decision(
        &mut self,
        view: &AiView<'_>,
        rng: &mut dyn RandomSource,
        commands: &mut Vec<AiCommand>,
    ) {
        let ai = &view.balance.enemy;
        let channeled: Vec<(GemId, SpellId)> = view
            .own
            .channeled_gems
            .iter()
            .filter_map(|&gem| {
                let spell = view.own_network.gem(gem)?.spell?;
                spell.is_damage().then_some((gem, spell))
            })
            .collect();

        let Some(&(gem, spell)) = channeled.first() else {
            if view.own.stability > ai.spell_stability_threshold
                && view.own.effective_mana >= ai.spell_channel_mana
            {
                let candidate = view.own_network.nodes().find(|n| {
                    n.state == NodeState::Open
                        && n.gem
                            .and_then(|g| view.own_network.gem(g))
                            .is_some_and(|g| g.has_damage_spell())
                });
                if let Some(gem) = candidate.and_then(|n| n.gem) {
                    commands.push(AiCommand::Channel { gem });
                }
            }
            return;
        };

        if view.own.effective_mana < ai.spell_unchannel_mana {
            commands.push(AiCommand::Unchannel { gem });
            return;
        }
        if self.spell_timer < ai.spell_cast_interval || view.caster.is_on_cooldown(self.side, spell) {
            return;
        }

        let targeting = view.spells.get(spell).map(|s| s.targeting);
        let target = match targeting {
            Some(Targeting::Immediate) => SpellTarget::None,
            Some(Targeting::SingleNode | Targeting::AoeCircle) => {
                match pick_target(view.opponent_network, self.profile.tier, rng) {
                    Some(node) => SpellTarget::Node(node),
                    None => return,
                }
            }
            _ => return,
        };
        self.spell_timer = Fixed::ZERO;
        commands.push(AiCommand::Cast { spell, target });
    }

    fn can_switch_to(&self, school: BeamSchool, own: &SideState, network: &NodeNetwork) -> bool {
        if school == own.current_beam_school || own.is_locked_out(school) {
            return false;
        }
        if !self.profile.beam_types_unlocked.contains(&school) {
            return false;
        }
        school.beam_node().is_some_and(|node| network.is_open(node))
    }

    fn beam_decision(&self, view: &AiView<'_>) -> Option<BeamSchool> {
        let own = view.own;
        if own.beam_switch_state != BeamSwitchState::Ready
            || self.reaction_timer < self.profile.reaction_time
        {
            return None;
        }
        let theirs = view.opponent.current_beam_school;
        let counter = theirs.countered_by();
        let usable = |school: BeamSchool| self.can_switch_to(school, own, view.own_network);

        if own.current_beam_school == BeamSchool::Neutral {
            if let Some(school) = counter.filter(|s| usable(*s)) {
                return Some(school);
            }
            return BeamSchool::ATTACK.into_iter().find(|s| usable(*s));
        }

        if theirs.beats() == Some(own.current_beam_school)
            && own.stability > view.balance.enemy.counter_stability_threshold
        {
            return Some(counter.filter(|s| usable(*s)).unwrap_or(BeamSchool::Neutral));
        }

        if let Some(school) = counter.filter(|s| usable(*s)) {
            return Some(school);
        }

        if own.is_locked_out(own.current_beam_school) {
            return BeamSchool::ATTACK.into_iter().find(|s| usable(*s));
        }
        None
    }
}

fn first_in(network: &NodeNetwork, state: NodeState, kind: NodeKind) -> Option<NodeId> {
    network
        .nodes_in(state)
        .into_iter()
        .find(|id| id.kind() == kind)
}

fn holds_spell(network: &NodeNetwork, node: NodeId) -> bool {
    network.gem_at_node(node).is_some_and(|g| g.has_spell())
}

/// Where to send the awareness token, if anywhere.
fn awareness_target(view: &AiView<'_>) -> Option<NodeId> {
    let network = view.own_network;
    if network.is_traveling() {
        return None;
    }

    if view.own.current_beam_school == BeamSchool::Neutral {
        let escape = first_in(network, NodeState::Damaged, NodeKind::BeamType)
            .or_else(|| first_in(network, NodeState::Dormant, NodeKind::BeamType));
        if escape.is_some() {
            return escape;
        }
    }

    let damaged = network.nodes_in(NodeState::Damaged);
    if let Some(first) = damaged.first() {
        let spell = damaged.iter().find(|id| holds_spell(network, **id));
        return Some(*spell.unwrap_or(first));
    }

    let dormant_slots: Vec<NodeId> = network
        .nodes_in(NodeState::Dormant)
        .into_iter()
        .filter(|id| id.kind() == NodeKind::GemSlot)
        .collect();
    dormant_slots
        .iter()
        .find(|id| holds_spell(network, **id))
        .or_else(|| dormant_slots.first())
        .copied()
        .or_else(|| first_in(network, NodeState::Dormant, NodeKind::BeamType))
}

fn shield_decision(view: &AiView<'_>, commands: &mut Vec<AiCommand>) {
    match view.own.shield_state {
        ShieldState::Unavailable => {
            let network = view.own_network;
            let shield = network.nodes().find(|n| {
                n.gem
                    .and_then(|g| network.gem(g))
                    .is_some_and(|g| g.is_shield())
            });
            let Some(node) = shield.filter(|n| n.state == NodeState::Open) else {
                return;
            };
            let mana = Fixed::from_num(network.node_mana()) + Fixed::ONE;
            if mana >= view.balance.enemy.shield_channel_mana {
                if let Some(gem) = node.gem {
                    commands.push(AiCommand::Channel { gem });
                }
            }
        }
        ShieldState::Down if !view.opponent.channeled_gems.is_empty() => {
            commands.push(AiCommand::ToggleShield);
        }
        _ => {}
    }
}

/// Weighted pick over the opponent's open or channeled nodes.
///
/// From tier 2, spell-bearing gem slots weigh `tier`; from tier 3, beam
/// nodes weigh 2. Everything else weighs 1.
pub fn pick_target(network: &NodeNetwork, tier: u8, rng: &mut dyn RandomSource) -> Option<NodeId> {
    let mut candidates = Vec::new();
    for node in network.nodes() {
        if !node.state.is_active() {
            continue;
        }
        let weight = match node.id.kind() {
            NodeKind::GemSlot if tier >= 2 && holds_spell(network, node.id) => usize::from(tier),
            NodeKind::BeamType if tier >= 3 => 2,
            _ => 1,
        };
        candidates.extend(std::iter::repeat(node.id).take(weight));
    }
    choose(rng, &candidates).copied()
}
