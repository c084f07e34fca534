//! Combat events and the in-process event bus.
//!
//! Every state transition that other systems (or the presentation layer)
//! care about is published as a [`CombatEvent`]. Systems push events onto a
//! queue while they run; the simulation then routes internal reactions and
//! forwards each event to subscribers whose [`SideFilter`] matches.

use serde::{Deserialize, Serialize};

use crate::components::{
    BeamSchool, CombatResult, Element, NodeId, NodeState, ShieldState, Side,
};
use crate::data::gem::GemId;
use crate::data::spell::SpellId;
use crate::math::{fixed_serde, Fixed};
use crate::network::Node;

/// A notification emitted by the combat core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CombatEvent {
    /// A node changed state.
    NodeStateChanged {
        /// Owning side.
        side: Side,
        /// Node that changed.
        node: NodeId,
        /// State before the change.
        old: NodeState,
        /// State after the change.
        new: NodeState,
        /// The node as it stands after the change.
        snapshot: Node,
    },
    /// An attack beam started charging.
    BeamSwitchStarted {
        /// Switching side.
        side: Side,
        /// School being charged.
        school: BeamSchool,
    },
    /// A beam switch took effect.
    BeamSwitchCompleted {
        /// Switching side.
        side: Side,
        /// School now active.
        school: BeamSchool,
    },
    /// A side was thrown onto the neutral beam.
    ForcedNeutral {
        /// Affected side.
        side: Side,
        /// School that was active before.
        previous: BeamSchool,
    },
    /// Channeling a gem locked out the active beam.
    Misfire {
        /// Channeling side.
        side: Side,
        /// Gem being channeled.
        gem: GemId,
    },
    /// Instant stability loss.
    StabilityDamage {
        /// Affected side.
        side: Side,
        /// Stability points lost.
        #[serde(with = "fixed_serde")]
        amount: Fixed,
    },
    /// Stability loss spread over time.
    StabilityDrain {
        /// Affected side.
        side: Side,
        /// Total stability points to drain.
        #[serde(with = "fixed_serde")]
        amount: Fixed,
        /// Seconds the drain lasts.
        #[serde(with = "fixed_serde")]
        duration: Fixed,
    },
    /// Stability changed by a discrete amount.
    StabilityChanged {
        /// Affected side.
        side: Side,
        /// New stability value.
        #[serde(with = "fixed_serde")]
        stability: Fixed,
    },
    /// Stability hit zero and a node was damaged.
    StabilityPunishment {
        /// Punished side.
        side: Side,
        /// Node that was damaged.
        node: NodeId,
    },
    /// Shield changed state.
    ShieldStateChanged {
        /// Shield owner.
        side: Side,
        /// New state.
        state: ShieldState,
    },
    /// Shield absorbed a hit and started recharging.
    ShieldBroke {
        /// Shield owner.
        side: Side,
    },
    /// Shield finished recharging.
    ShieldRestored {
        /// Shield owner.
        side: Side,
    },
    /// A gem finished channeling.
    SpellChanneled {
        /// Channeling side.
        side: Side,
        /// Channeled gem.
        gem: GemId,
        /// Spell the gem provides.
        spell: SpellId,
    },
    /// A gem stopped being channeled.
    SpellUnchanneled {
        /// Owning side.
        side: Side,
        /// Released gem.
        gem: GemId,
    },
    /// A spell was cast.
    SpellCast {
        /// Casting side.
        side: Side,
        /// Spell cast.
        spell: SpellId,
    },
    /// A side's dominant element changed.
    ElementChanged {
        /// Affected side.
        side: Side,
        /// New dominant element.
        element: Element,
    },
    /// A side lost hit points.
    HpChanged {
        /// Damaged side.
        side: Side,
        /// Remaining HP.
        hp: i32,
    },
    /// A side entered panic mode.
    PanicStarted {
        /// Panicking side.
        side: Side,
    },
    /// Collision point reached a bound.
    BeamOverwhelm {
        /// Side that pushed the collision to the opponent's edge.
        winner: Side,
    },
    /// A side's HP reached zero.
    HpDeath {
        /// Side that died.
        loser: Side,
    },
    /// Combat ended.
    CombatEnded {
        /// Final result.
        result: CombatResult,
    },
}

impl CombatEvent {
    /// Side this event is scoped to, if any.
    ///
    /// `BeamOverwhelm`, `HpDeath` and `CombatEnded` concern the whole combat
    /// and are delivered to every subscriber.
    #[must_use]
    pub const fn side(&self) -> Option<Side> {
        match self {
            CombatEvent::NodeStateChanged { side, .. }
            | CombatEvent::BeamSwitchStarted { side, .. }
            | CombatEvent::BeamSwitchCompleted { side, .. }
            | CombatEvent::ForcedNeutral { side, .. }
            | CombatEvent::Misfire { side, .. }
            | CombatEvent::StabilityDamage { side, .. }
            | CombatEvent::StabilityDrain { side, .. }
            | CombatEvent::StabilityChanged { side, .. }
            | CombatEvent::StabilityPunishment { side, .. }
            | CombatEvent::ShieldStateChanged { side, .. }
            | CombatEvent::ShieldBroke { side }
            | CombatEvent::ShieldRestored { side }
            | CombatEvent::SpellChanneled { side, .. }
            | CombatEvent::SpellUnchanneled { side, .. }
            | CombatEvent::SpellCast { side, .. }
            | CombatEvent::ElementChanged { side, .. }
            | CombatEvent::HpChanged { side, .. }
            | CombatEvent::PanicStarted { side } => Some(*side),
            CombatEvent::BeamOverwhelm { .. }
            | CombatEvent::HpDeath { .. }
            | CombatEvent::CombatEnded { .. } => None,
        }
    }

    /// Snake-case event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            CombatEvent::NodeStateChanged { .. } => "node_state_changed",
            CombatEvent::BeamSwitchStarted { .. } => "beam_switch_started",
            CombatEvent::BeamSwitchCompleted { .. } => "beam_switch_completed",
            CombatEvent::ForcedNeutral { .. } => "forced_neutral",
            CombatEvent::Misfire { .. } => "misfire",
            CombatEvent::StabilityDamage { .. } => "stability_damage",
            CombatEvent::StabilityDrain { .. } => "stability_drain",
            CombatEvent::StabilityChanged { .. } => "stability_changed",
            CombatEvent::StabilityPunishment { .. } => "stability_punishment",
            CombatEvent::ShieldStateChanged { .. } => "shield_state_changed",
            CombatEvent::ShieldBroke { .. } => "shield_broke",
            CombatEvent::ShieldRestored { .. } => "shield_restored",
            CombatEvent::SpellChanneled { .. } => "spell_channeled",
            CombatEvent::SpellUnchanneled { .. } => "spell_unchanneled",
            CombatEvent::SpellCast { .. } => "spell_cast",
            CombatEvent::ElementChanged { .. } => "element_changed",
            CombatEvent::HpChanged { .. } => "hp_changed",
            CombatEvent::PanicStarted { .. } => "panic_started",
            CombatEvent::BeamOverwhelm { .. } => "beam_overwhelm",
            CombatEvent::HpDeath { .. } => "hp_death",
            CombatEvent::CombatEnded { .. } => "combat_ended",
        }
    }
}

/// Which events a subscriber receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SideFilter {
    /// Every event.
    #[default]
    Any,
    /// Events scoped to one side, plus combat-wide events.
    Only(Side),
}

impl SideFilter {
    /// Whether an event passes this filter.
    #[must_use]
    pub fn matches(self, event: &CombatEvent) -> bool {
        match (self, event.side()) {
            (SideFilter::Any, _) | (SideFilter::Only(_), None) => true,
            (SideFilter::Only(wanted), Some(side)) => wanted == side,
        }
    }
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut(&CombatEvent) + Send>;

struct Subscriber {
    id: SubscriptionId,
    filter: SideFilter,
    handler: Handler,
}

/// Fire-and-forget publish/subscribe channel owned by a combat session.
///
/// Handlers never feed back into the simulation; they observe only.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Subscriber>,
    next_id: u64,
}

impl EventBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. Events are delivered in subscription order.
    pub fn subscribe<F>(&mut self, filter: SideFilter, handler: F) -> SubscriptionId
    where
        F: FnMut(&CombatEvent) + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push(Subscriber {
            id,
            filter,
            handler: Box::new(handler),
        });
        id
    }

    /// Remove a handler. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    /// Deliver an event to every matching subscriber.
    pub fn publish(&mut self, event: &CombatEvent) {
        for subscriber in &mut self.subscribers {
            if subscriber.filter.matches(event) {
                (subscriber.handler)(event);
            }
        }
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

/// Events generated during a simulation tick, in emission order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickEvents {
    /// Every event published this tick.
    pub events: Vec<CombatEvent>,
    /// Set on the tick combat ended.
    pub result: Option<CombatResult>,
}

impl TickEvents {
    /// Number of events with the given name.
    #[must_use]
    pub fn count(&self, name: &str) -> usize {
        self.events.iter().filter(|e| e.name() == name).count()
    }

    /// Events that pass a side filter.
    pub fn filtered(&self, filter: SideFilter) -> impl Iterator<Item = &CombatEvent> {
        self.events.iter().filter(move |e| filter.matches(e))
    }

    /// Whether nothing happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
