//! Combat simulation driver.
//!
//! [`CombatSimulation`] owns both combatants, the shared collision point, the
//! spell caster, optional AIs and the event bus. An external loop calls
//! [`CombatSimulation::tick`] with the frame delta; every system advances in
//! a fixed order and the events it queued are routed before the next system
//! runs.
//!
//! # Determinism
//!
//! With the same balance table, loadouts, random seed and `dt` sequence the
//! simulation produces identical states. All arithmetic is fixed-point and
//! all randomness comes from the injected [`RandomSource`].
//!
//! # Tick order
//!
//! 1. AI decisions
//! 2. Node networks
//! 3. Channeling timers
//! 4. Spell books
//! 5. Beam switchers
//! 6. Dominant element
//! 7. Stability and punishment
//! 8. Shields
//! 9. Spells and projectiles
//! 10. Beam struggle and win check

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::ai::{AiCommand, AiProfile, AiView, CombatAi};
use crate::balance::BalanceConfig;
use crate::beam_struggle::{self, effective_mana, CombatState};
use crate::beam_switch;
use crate::channeling::ChannelingSystem;
use crate::components::{BeamSchool, CombatResult, NodeId, NodeState, Side};
use crate::data::gem::GemId;
use crate::data::loadout::Loadout;
use crate::data::spell::{SpellId, SpellRegistry};
use crate::element;
use crate::error::{CombatError, Result};
use crate::events::{CombatEvent, EventBus, SideFilter, SubscriptionId, TickEvents};
use crate::math::{fixed_serde, Fixed};
use crate::network::NodeNetwork;
use crate::render::{self, Renderer};
use crate::rng::RandomSource;
use crate::shield;
use crate::side::SideState;
use crate::spell_book::SpellBook;
use crate::spell_caster::{Combatants, SpellCaster, SpellContext, SpellTarget};
use crate::stability;

/// Simulation tick rate (ticks per second) used by headless runs.
pub const TICK_RATE: u32 = 60;

/// Everything one side owns during a fight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    /// Beam, stability, shield, HP.
    pub state: SideState,
    /// Node graph and awareness token.
    pub network: NodeNetwork,
    /// Pending channels.
    pub channeling: ChannelingSystem,
    /// Hold-to-charge casting.
    pub spell_book: SpellBook,
}

impl Combatant {
    fn new(side: Side, loadout: &Loadout, balance: &BalanceConfig) -> Self {
        let mut network = NodeNetwork::new(side, balance);
        network.init(loadout);
        let mut state = SideState::new(side, loadout, balance);
        element::recalculate(&mut state, &network, balance);
        Self {
            state,
            network,
            channeling: ChannelingSystem::new(),
            spell_book: SpellBook::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Sides {
    player: Combatant,
    enemy: Combatant,
}

impl Sides {
    const fn get(&self, side: Side) -> &Combatant {
        match side {
            Side::Player => &self.player,
            Side::Enemy => &self.enemy,
        }
    }

    fn get_mut(&mut self, side: Side) -> &mut Combatant {
        match side {
            Side::Player => &mut self.player,
            Side::Enemy => &mut self.enemy,
        }
    }
}

impl Combatants for Sides {
    fn side(&self, side: Side) -> (&SideState, &NodeNetwork) {
        let c = self.get(side);
        (&c.state, &c.network)
    }

    fn side_mut(&mut self, side: Side) -> (&mut SideState, &mut NodeNetwork) {
        let c = self.get_mut(side);
        (&mut c.state, &mut c.network)
    }
}

/// Serializable copy of every piece of mutable combat state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatSnapshot {
    /// Ticks run so far.
    pub tick: u64,
    /// Seconds simulated so far.
    #[serde(with = "fixed_serde")]
    pub elapsed: Fixed,
    /// Collision point and result.
    pub combat: CombatState,
    /// Player side.
    pub player: Combatant,
    /// Enemy side.
    pub enemy: Combatant,
    /// Projectiles and cooldowns.
    pub caster: SpellCaster,
    /// Attached AIs.
    pub ai: Vec<CombatAi>,
}

impl CombatSnapshot {
    /// Encode with bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| CombatError::InvalidState(format!("Failed to serialize combat: {}", e)))
    }

    /// Decode a bincode snapshot.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| CombatError::InvalidState(format!("Failed to deserialize combat: {}", e)))
    }
}

/// One fight between two combatants.
pub struct CombatSimulation {
    balance: BalanceConfig,
    spells: SpellRegistry,
    combat: CombatState,
    sides: Sides,
    caster: SpellCaster,
    ai: Vec<CombatAi>,
    rng: Box<dyn RandomSource + Send>,
    bus: EventBus,
    /// Events from commands issued between ticks, returned with the next tick.
    carried: Vec<CombatEvent>,
    tick: u64,
    elapsed: Fixed,
}

impl std::fmt::Debug for CombatSimulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombatSimulation")
            .field("tick", &self.tick)
            .field("combat", &self.combat)
            .field("ai", &self.ai.len())
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

impl CombatSimulation {
    /// Build a fight from two validated loadouts.
    pub fn new(
        balance: BalanceConfig,
        player: &Loadout,
        enemy: &Loadout,
        rng: Box<dyn RandomSource + Send>,
    ) -> Result<Self> {
        player.validate()?;
        enemy.validate()?;
        let sides = Sides {
            player: Combatant::new(Side::Player, player, &balance),
            enemy: Combatant::new(Side::Enemy, enemy, &balance),
        };
        tracing::debug!(
            player = ?player.school_attunement,
            enemy = ?enemy.school_attunement,
            "Combat started"
        );
        Ok(Self {
            spells: SpellRegistry::from_balance(&balance),
            combat: CombatState::new(&balance),
            balance,
            sides,
            caster: SpellCaster::new(),
            ai: Vec::new(),
            rng,
            bus: EventBus::new(),
            carried: Vec::new(),
            tick: 0,
            elapsed: Fixed::ZERO,
        })
    }

    /// Resume a fight from a snapshot.
    #[must_use]
    pub fn restore(
        balance: BalanceConfig,
        snapshot: CombatSnapshot,
        rng: Box<dyn RandomSource + Send>,
    ) -> Self {
        Self {
            spells: SpellRegistry::from_balance(&balance),
            balance,
            combat: snapshot.combat,
            sides: Sides {
                player: snapshot.player,
                enemy: snapshot.enemy,
            },
            caster: snapshot.caster,
            ai: snapshot.ai,
            rng,
            bus: EventBus::new(),
            carried: Vec::new(),
            tick: snapshot.tick,
            elapsed: snapshot.elapsed,
        }
    }

    /// Hand a side to the AI, replacing any AI already driving it.
    #[must_use]
    pub fn with_ai(mut self, side: Side, profile: AiProfile) -> Self {
        self.ai.retain(|ai| ai.side() != side);
        self.ai.push(CombatAi::new(side, profile));
        self
    }

    // ---- accessors ----

    /// Tunables in use.
    #[must_use]
    pub const fn balance(&self) -> &BalanceConfig {
        &self.balance
    }

    /// Spell descriptors.
    #[must_use]
    pub const fn spells(&self) -> &SpellRegistry {
        &self.spells
    }

    /// Collision point and result.
    #[must_use]
    pub const fn combat(&self) -> &CombatState {
        &self.combat
    }

    /// Whether the fight has ended.
    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.combat.combat_over
    }

    /// Winner, once decided.
    #[must_use]
    pub const fn result(&self) -> Option<CombatResult> {
        self.combat.result
    }

    /// One side's combatant.
    #[must_use]
    pub const fn combatant(&self, side: Side) -> &Combatant {
        self.sides.get(side)
    }

    /// One side's state.
    #[must_use]
    pub const fn side_state(&self, side: Side) -> &SideState {
        &self.sides.get(side).state
    }

    /// One side's network.
    #[must_use]
    pub const fn network(&self, side: Side) -> &NodeNetwork {
        &self.sides.get(side).network
    }

    /// Projectiles, rocks and cooldowns.
    #[must_use]
    pub const fn caster(&self) -> &SpellCaster {
        &self.caster
    }

    /// AI driving a side, if any.
    #[must_use]
    pub fn ai(&self, side: Side) -> Option<&CombatAi> {
        self.ai.iter().find(|ai| ai.side() == side)
    }

    /// Ticks run so far.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Seconds simulated so far.
    #[must_use]
    pub const fn elapsed(&self) -> Fixed {
        self.elapsed
    }

    // ---- events ----

    /// Observe events for the sides a filter selects.
    pub fn subscribe<F>(&mut self, filter: SideFilter, handler: F) -> SubscriptionId
    where
        F: FnMut(&CombatEvent) + Send + 'static,
    {
        self.bus.subscribe(filter, handler)
    }

    /// Remove an observer.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    // ---- tick ----

    /// Advance the fight by `dt` seconds.
    ///
    /// Returns every event of this tick, preceded by events from commands
    /// issued since the previous tick. Does nothing once the fight is over.
    pub fn tick(&mut self, dt: Fixed) -> TickEvents {
        let mut out = TickEvents {
            events: std::mem::take(&mut self.carried),
            result: None,
        };
        if self.combat.combat_over {
            return out;
        }
        let mut queue = Vec::new();

        // 1. AI
        self.run_ai(dt, &mut queue);
        self.settle(&mut queue, &mut out.events);

        // 2. Networks
        for side in Side::BOTH {
            self.sides.get_mut(side).network.update(dt, &self.balance, &mut queue);
        }
        self.settle(&mut queue, &mut out.events);

        // 3. Channeling
        for side in Side::BOTH {
            let c = self.sides.get_mut(side);
            c.channeling.update(&mut c.state, &mut c.network, dt, &mut queue);
        }
        self.settle(&mut queue, &mut out.events);

        // 4. Spell books
        for side in Side::BOTH {
            let c = self.sides.get_mut(side);
            let fired = c.spell_book.update(dt, &mut c.state, &c.network, &self.spells);
            if let Some(spell) = fired {
                self.cast(side, spell, SpellTarget::None, &mut queue);
            }
        }
        self.settle(&mut queue, &mut out.events);

        // 5. Beam switchers
        for side in Side::BOTH {
            let c = self.sides.get_mut(side);
            beam_switch::update(&mut c.state, &c.network, dt, &self.balance, &mut queue);
        }
        self.settle(&mut queue, &mut out.events);

        // 6. Element
        for side in Side::BOTH {
            let c = self.sides.get_mut(side);
            element::update(&mut c.state, &c.network, dt, &self.balance, &mut queue);
        }
        self.settle(&mut queue, &mut out.events);

        // 7. Stability
        let mut punished = Vec::new();
        for side in Side::BOTH {
            let c = self.sides.get_mut(side);
            if !stability::update(&mut c.state, dt, &self.balance) {
                continue;
            }
            if let Some(node) = stability::punishment_target(&c.network, &mut *self.rng) {
                c.network.damage_node(node, &mut queue);
                tracing::debug!(side = side.as_str(), node = node.as_str(), "Stability punishment");
                queue.push(CombatEvent::StabilityPunishment { side, node });
            }
            punished.push(side);
        }
        self.settle(&mut queue, &mut out.events);
        // The refill lands after the punished node's own reactions.
        for side in punished {
            stability::reset(&mut self.sides.get_mut(side).state, &self.balance, &mut queue);
        }
        self.settle(&mut queue, &mut out.events);

        // 8. Shields
        for side in Side::BOTH {
            shield::update(&mut self.sides.get_mut(side).state, dt, &mut queue);
        }
        self.settle(&mut queue, &mut out.events);

        // 9. Spells
        {
            let mut ctx = SpellContext {
                balance: &self.balance,
                spells: &self.spells,
                rng: &mut *self.rng,
                combat: &mut self.combat,
                events: &mut queue,
            };
            self.caster.update(dt, &mut self.sides, &mut ctx);
        }
        self.settle(&mut queue, &mut out.events);

        // 10. Beam struggle
        self.update_effective_mana();
        beam_struggle::update(
            &mut self.combat,
            &self.sides.player.state,
            &self.sides.enemy.state,
            dt,
            &self.balance,
            &mut queue,
        );
        self.settle(&mut queue, &mut out.events);

        self.tick += 1;
        self.elapsed += dt;
        if self.combat.combat_over {
            out.result = self.combat.result;
        }

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.tick, state_hash = hash, "Combat state hash");
        }

        #[cfg(feature = "debug-validation")]
        self.check_invariants();

        out
    }

    #[cfg(feature = "debug-validation")]
    fn check_invariants(&self) {
        for side in Side::BOTH {
            let state = &self.sides.get(side).state;
            assert!(
                state.stability >= Fixed::ZERO && state.stability <= self.balance.stability.max,
                "{} stability out of range: {}",
                side.as_str(),
                state.stability
            );
            assert!(state.hp >= 0, "{} hp below zero", side.as_str());
            assert!(
                !state.is_locked_out(state.current_beam_school)
                    || state.current_beam_school == BeamSchool::Neutral,
                "{} kept a locked-out beam",
                side.as_str()
            );
        }
        let max = Fixed::from_num(100);
        assert!(self.combat.collision_point >= Fixed::ZERO && self.combat.collision_point <= max);
    }

    fn run_ai(&mut self, dt: Fixed, queue: &mut Vec<CombatEvent>) {
        for index in 0..self.ai.len() {
            let side = self.ai[index].side();
            let commands = {
                let own = self.sides.get(side);
                let opponent = self.sides.get(side.opponent());
                let view = AiView {
                    own: &own.state,
                    own_network: &own.network,
                    opponent: &opponent.state,
                    opponent_network: &opponent.network,
                    collision_point: self.combat.collision_point,
                    caster: &self.caster,
                    balance: &self.balance,
                    spells: &self.spells,
                };
                self.ai[index].update(dt, &view, &mut *self.rng)
            };
            for command in commands {
                self.apply_command(side, command, queue);
            }
        }
    }

    fn apply_command(&mut self, side: Side, command: AiCommand, queue: &mut Vec<CombatEvent>) {
        let c = self.sides.get_mut(side);
        match command {
            AiCommand::BeginPanic => {
                c.state.panic_mana_bonus = self.balance.enemy.panic.mana_bonus;
                let speed = c.network.awareness_speed().min(self.balance.nodes.awareness_travel_time);
                c.network.set_awareness_speed(speed);
                queue.push(CombatEvent::PanicStarted { side });
            }
            AiCommand::EndPanic => c.state.panic_mana_bonus = Fixed::ZERO,
            AiCommand::SetAwarenessTarget { node } => {
                c.network.set_awareness_target(node);
            }
            AiCommand::Channel { gem } => {
                c.channeling.request_channel(&mut c.state, &c.network, gem, &self.balance, queue);
            }
            AiCommand::Unchannel { gem } => {
                c.channeling.request_unchannel(&mut c.state, &mut c.network, gem, queue);
            }
            AiCommand::ToggleShield => {
                shield::toggle_shield(&mut c.state, queue);
            }
            AiCommand::Cast { spell, target } => {
                self.cast(side, spell, target, queue);
            }
            AiCommand::Switch { school } => {
                beam_switch::request_switch(&mut c.state, &c.network, school, &self.balance, queue);
            }
        }
    }

    fn cast(
        &mut self,
        side: Side,
        spell: SpellId,
        target: SpellTarget,
        queue: &mut Vec<CombatEvent>,
    ) -> bool {
        let mut ctx = SpellContext {
            balance: &self.balance,
            spells: &self.spells,
            rng: &mut *self.rng,
            combat: &mut self.combat,
            events: queue,
        };
        self.caster.cast_spell(side, spell, target, &mut self.sides, &mut ctx)
    }

    fn update_effective_mana(&mut self) {
        let mana = |me: &Combatant, them: &Combatant| {
            let cost = ChannelingSystem::continuous_mana_cost(&me.state, &me.network, &self.spells);
            effective_mana(&me.state, &me.network, cost, &them.state, &them.network, &self.balance)
        };
        let player = mana(&self.sides.player, &self.sides.enemy);
        let enemy = mana(&self.sides.enemy, &self.sides.player);
        self.sides.player.state.effective_mana = player;
        self.sides.enemy.state.effective_mana = enemy;
    }

    /// Route queued events in emission order, publish them and move them to
    /// `out`. Reactions may queue further events; those are handled too.
    fn settle(&mut self, queue: &mut Vec<CombatEvent>, out: &mut Vec<CombatEvent>) {
        let mut index = 0;
        while index < queue.len() {
            let event = queue[index].clone();
            self.route(&event, queue);
            self.bus.publish(&event);
            out.push(event);
            index += 1;
        }
        queue.clear();
    }

    fn route(&mut self, event: &CombatEvent, queue: &mut Vec<CombatEvent>) {
        match *event {
            CombatEvent::StabilityDamage { side, amount } => {
                let c = self.sides.get_mut(side);
                stability::apply_damage(&mut c.state, amount, &self.balance, queue);
            }
            CombatEvent::StabilityDrain { side, amount, duration } => {
                stability::apply_drain(&mut self.sides.get_mut(side).state, amount, duration);
            }
            CombatEvent::NodeStateChanged { side, node, old, new, .. }
                if matches!(new, NodeState::Damaged | NodeState::Dormant) =>
            {
                let c = self.sides.get_mut(side);
                if old == NodeState::Channeled {
                    c.channeling.release_lost_node(&mut c.state, &c.network, node, queue);
                }
                if c.state.current_beam_school.beam_node() == Some(node) {
                    beam_switch::forced_neutral(&mut c.state, &self.balance, queue);
                }
            }
            _ => {}
        }
    }

    /// Run a command between ticks: route its events now and hand them back
    /// with the next tick.
    fn command<F>(&mut self, apply: F) -> bool
    where
        F: FnOnce(&mut Self, &mut Vec<CombatEvent>) -> bool,
    {
        if self.combat.combat_over {
            return false;
        }
        let mut queue = Vec::new();
        let accepted = apply(self, &mut queue);
        let mut carried = std::mem::take(&mut self.carried);
        self.settle(&mut queue, &mut carried);
        self.carried = carried;
        accepted
    }

    // ---- commands ----

    /// Start switching a side's beam school.
    pub fn request_switch(&mut self, side: Side, school: BeamSchool) -> bool {
        self.command(|sim, queue| {
            let c = sim.sides.get_mut(side);
            beam_switch::request_switch(&mut c.state, &c.network, school, &sim.balance, queue)
        })
    }

    /// Start channeling a slotted gem.
    pub fn request_channel(&mut self, side: Side, gem: GemId) -> bool {
        self.command(|sim, queue| {
            let c = sim.sides.get_mut(side);
            c.channeling.request_channel(&mut c.state, &c.network, gem, &sim.balance, queue)
        })
    }

    /// Release a channeled gem.
    pub fn request_unchannel(&mut self, side: Side, gem: GemId) -> bool {
        self.command(|sim, queue| {
            let c = sim.sides.get_mut(side);
            c.channeling.request_unchannel(&mut c.state, &mut c.network, gem, queue)
        })
    }

    /// Cast a channeled spell directly, bypassing the spell book.
    pub fn cast_spell(&mut self, side: Side, spell: SpellId, target: SpellTarget) -> bool {
        self.command(|sim, queue| sim.cast(side, spell, target, queue))
    }

    /// Send a side's awareness token toward a node.
    pub fn set_awareness_target(&mut self, side: Side, node: NodeId) -> bool {
        self.command(|sim, _| sim.sides.get_mut(side).network.set_awareness_target(node))
    }

    /// Raise or lower a side's shield.
    pub fn toggle_shield(&mut self, side: Side) -> bool {
        self.command(|sim, queue| shield::toggle_shield(&mut sim.sides.get_mut(side).state, queue))
    }

    /// Select the previous spell in a side's book.
    pub fn cycle_spell_left(&mut self, side: Side) {
        let c = self.sides.get_mut(side);
        c.spell_book.cycle_left(&c.state, &c.network);
    }

    /// Select the next spell in a side's book.
    pub fn cycle_spell_right(&mut self, side: Side) {
        let c = self.sides.get_mut(side);
        c.spell_book.cycle_right(&c.state, &c.network);
    }

    /// Begin charging the selected spell.
    pub fn start_hold(&mut self, side: Side) -> bool {
        if self.combat.combat_over {
            return false;
        }
        let c = self.sides.get_mut(side);
        c.spell_book.start_hold(&mut c.state, &c.network, &self.caster)
    }

    /// Stop charging.
    pub fn cancel_hold(&mut self, side: Side) -> bool {
        let c = self.sides.get_mut(side);
        c.spell_book.cancel_hold(&mut c.state)
    }

    /// Drop a charged spell.
    pub fn cancel_ready(&mut self, side: Side) -> bool {
        let c = self.sides.get_mut(side);
        c.spell_book.cancel_ready(&mut c.state)
    }

    /// Cast a side's charged spell at a target.
    ///
    /// The book returns to idle whether or not the cast is accepted.
    pub fn resolve_spell(&mut self, side: Side, target: SpellTarget) -> bool {
        self.command(|sim, queue| {
            let c = sim.sides.get_mut(side);
            match c.spell_book.take_ready(&mut c.state) {
                Some(spell) => sim.cast(side, spell, target, queue),
                None => false,
            }
        })
    }

    // ---- output ----

    /// Draw both beams, both networks, projectiles and status lines.
    pub fn render(&self, renderer: &mut dyn Renderer) {
        let player = &self.sides.player;
        let enemy = &self.sides.enemy;
        render::draw_beams(renderer, &self.combat, &player.state, &enemy.state, &self.balance);
        render::draw_network(renderer, &player.network, &self.balance);
        render::draw_network(renderer, &enemy.network, &self.balance);
        for projectile in self.caster.projectiles() {
            render::draw_projectile(renderer, projectile);
        }
        #[allow(clippy::cast_precision_loss)]
        let right = self.balance.arena.width as f32 - 240.0;
        render::draw_side_status(renderer, &player.state, 16.0, 16.0);
        render::draw_side_status(renderer, &enemy.state, right, 16.0);
    }

    /// Copy of all mutable state.
    #[must_use]
    pub fn snapshot(&self) -> CombatSnapshot {
        CombatSnapshot {
            tick: self.tick,
            elapsed: self.elapsed,
            combat: self.combat.clone(),
            player: self.sides.player.clone(),
            enemy: self.sides.enemy.clone(),
            caster: self.caster.clone(),
            ai: self.ai.clone(),
        }
    }

    /// Hash of the bincode-encoded snapshot, for determinism checks.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        match self.snapshot().to_bytes() {
            Ok(bytes) => bytes.hash(&mut hasher),
            Err(e) => tracing::warn!(error = %e, "Could not encode combat state"),
        }
        hasher.finish()
    }
}
