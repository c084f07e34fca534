//! Spell casting, projectile flight and hit resolution.
//!
//! Casting validates the spell, starts its cooldown and dispatches on the
//! spell's [`SpellEffect`]. Projectile spells resolve on arrival; air choke
//! and water beam resolve on the spot. Everything that touches the other
//! side goes through its [`SideState`] and [`NodeNetwork`]; stability effects
//! are queued as events for the simulation to route.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::balance::BalanceConfig;
use crate::beam_struggle::CombatState;
use crate::components::{CombatResult, NodeId, NodeState, Side};
use crate::data::gem::PassiveStat;
use crate::data::spell::{SpellData, SpellEffect, SpellId, SpellRegistry, Targeting};
use crate::element::spell_stability_damage;
use crate::events::CombatEvent;
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::network::NodeNetwork;
use crate::pathfinding::{find_nearest_root, find_path};
use crate::projectile::{Projectile, ProjectileTarget};
use crate::rng::RandomSource;
use crate::shield;
use crate::side::SideState;

const PERCENT: Fixed = Fixed::const_from_int(100);

/// Target chosen for a cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpellTarget {
    /// No target (immediate spells).
    #[default]
    None,
    /// A defender node.
    Node(NodeId),
    /// An arena point (area spells).
    Point(Vec2Fixed),
}

/// Access to both combatants' state and network.
pub trait Combatants {
    /// Read one side.
    fn side(&self, side: Side) -> (&SideState, &NodeNetwork);
    /// Mutate one side.
    fn side_mut(&mut self, side: Side) -> (&mut SideState, &mut NodeNetwork);
}

/// Shared resources a spell needs to resolve.
pub struct SpellContext<'a> {
    /// Tunables.
    pub balance: &'a BalanceConfig,
    /// Spell descriptors.
    pub spells: &'a SpellRegistry,
    /// Hit rolls.
    pub rng: &'a mut dyn RandomSource,
    /// Combat-wide state, for HP death.
    pub combat: &'a mut CombatState,
    /// Event queue.
    pub events: &'a mut Vec<CombatEvent>,
}

/// Remaining cooldown of one spell for one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cooldown {
    /// Casting side.
    pub side: Side,
    /// Spell.
    pub spell: SpellId,
    /// Seconds left.
    #[serde(with = "fixed_serde")]
    pub remaining: Fixed,
}

/// An earth barrage rock waiting for its stagger delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRock {
    /// Casting side.
    pub owner: Side,
    /// Cast this rock belongs to.
    pub cast_id: u32,
    /// Seconds until launch.
    #[serde(with = "fixed_serde")]
    pub delay: Fixed,
    /// Launch point.
    pub start: Vec2Fixed,
    /// Target node.
    pub node: NodeId,
    /// Target node position.
    pub target_point: Vec2Fixed,
}

/// Owner of every projectile, pending rock and cooldown in a combat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellCaster {
    projectiles: Vec<Projectile>,
    pending_rocks: Vec<PendingRock>,
    cooldowns: Vec<Cooldown>,
    absorbed_casts: BTreeSet<u32>,
    next_cast_id: u32,
}

impl SpellCaster {
    /// Create an empty caster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Projectiles in flight.
    #[must_use]
    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// Barrage rocks not yet launched.
    #[must_use]
    pub fn pending_rocks(&self) -> &[PendingRock] {
        &self.pending_rocks
    }

    /// Seconds until a side may cast a spell again.
    #[must_use]
    pub fn cooldown_remaining(&self, side: Side, spell: SpellId) -> Fixed {
        self.cooldowns
            .iter()
            .find(|c| c.side == side && c.spell == spell)
            .map_or(Fixed::ZERO, |c| c.remaining.max(Fixed::ZERO))
    }

    /// Whether a side's spell is cooling down.
    #[must_use]
    pub fn is_on_cooldown(&self, side: Side, spell: SpellId) -> bool {
        self.cooldown_remaining(side, spell) > Fixed::ZERO
    }

    /// Cast a channeled spell.
    ///
    /// Rejected if the spell is unknown or never cast, on cooldown, not
    /// channeled by the caster, or missing the target its targeting mode
    /// needs. Area spells accept a node target and aim at its position.
    pub fn cast_spell(
        &mut self,
        caster: Side,
        spell: SpellId,
        target: SpellTarget,
        sides: &mut dyn Combatants,
        ctx: &mut SpellContext<'_>,
    ) -> bool {
        let spells = ctx.spells;
        let Some(data) = spells.get(spell) else {
            return false;
        };
        if data.targeting == Targeting::None || self.is_on_cooldown(caster, spell) {
            return false;
        }

        let (caster_state, caster_network) = sides.side(caster);
        let channeled = caster_state
            .channeled_gems
            .iter()
            .any(|gem| caster_network.gem(*gem).and_then(|g| g.spell) == Some(spell));
        if !channeled {
            return false;
        }
        let bonus = caster_network.passive_bonus(PassiveStat::SpellCooldown);

        let defender = caster.opponent();
        let (_, defender_network) = sides.side(defender);
        let aim = match (data.targeting, target) {
            (Targeting::SingleNode, SpellTarget::Node(node)) => {
                Some((node, defender_network.node(node).position))
            }
            (Targeting::AoeCircle, SpellTarget::Point(point)) => Some((NodeId::Sternum, point)),
            (Targeting::AoeCircle, SpellTarget::Node(node)) => {
                Some((node, defender_network.node(node).position))
            }
            (Targeting::Immediate, _) => None,
            _ => return false,
        };

        let reduction = ((-bonus).max(Fixed::ZERO) / PERCENT)
            .min(ctx.balance.floors.spell_cooldown_reduction);
        self.set_cooldown(caster, spell, data.cooldown * (Fixed::ONE - reduction));

        let cast_id = self.next_cast_id;
        self.next_cast_id = self.next_cast_id.wrapping_add(1);
        let start = ctx.balance.staff_tip(caster);

        match (&data.effect, aim) {
            (SpellEffect::Bolt { .. }, Some((node, point))) => {
                self.projectiles.push(Projectile::new(
                    caster,
                    spell,
                    cast_id,
                    start,
                    point,
                    data.travel_speed,
                    ProjectileTarget::Node(node),
                ));
            }
            (SpellEffect::Fireball { .. }, Some((_, point))) => {
                self.projectiles.push(Projectile::new(
                    caster,
                    spell,
                    cast_id,
                    start,
                    point,
                    data.travel_speed,
                    ProjectileTarget::Area(point),
                ));
            }
            (SpellEffect::Barrage { rock_count, stagger_delay, .. }, Some((node, point))) => {
                let mut delay = Fixed::ZERO;
                for _ in 0..*rock_count {
                    self.pending_rocks.push(PendingRock {
                        owner: caster,
                        cast_id,
                        delay,
                        start,
                        node,
                        target_point: point,
                    });
                    delay += *stagger_delay;
                }
            }
            (
                SpellEffect::Choke {
                    affected_nodes,
                    stability_drain,
                    drain_duration,
                },
                _,
            ) => {
                let (state, network) = sides.side_mut(defender);
                if !mitigate(data, state, *stability_drain, *drain_duration, ctx) {
                    for node in affected_nodes {
                        disrupt_undamaged(network, *node, ctx.events);
                    }
                    element_stability(data, state, false, ctx);
                }
            }
            (
                SpellEffect::Flood {
                    flood_count,
                    stability_drain,
                    drain_duration,
                },
                Some((node, _)),
            ) => {
                let (state, network) = sides.side_mut(defender);
                if !mitigate(data, state, *stability_drain, *drain_duration, ctx) {
                    let path = find_path(node, find_nearest_root(node));
                    let flooded = std::iter::once(node)
                        .chain(path.into_iter().skip(1).take(*flood_count));
                    for target in flooded {
                        disrupt_undamaged(network, target, ctx.events);
                    }
                    element_stability(data, state, false, ctx);
                }
            }
            _ => {}
        }

        tracing::debug!(side = caster.as_str(), %spell, ?target, "Spell cast");
        ctx.events.push(CombatEvent::SpellCast {
            side: caster,
            spell,
        });
        true
    }

    fn set_cooldown(&mut self, side: Side, spell: SpellId, remaining: Fixed) {
        match self
            .cooldowns
            .iter_mut()
            .find(|c| c.side == side && c.spell == spell)
        {
            Some(cooldown) => cooldown.remaining = remaining,
            None => self.cooldowns.push(Cooldown {
                side,
                spell,
                remaining,
            }),
        }
    }

    /// Tick cooldowns, launch due rocks, move projectiles and resolve arrivals.
    pub fn update(&mut self, dt: Fixed, sides: &mut dyn Combatants, ctx: &mut SpellContext<'_>) {
        for cooldown in &mut self.cooldowns {
            cooldown.remaining -= dt;
        }
        self.cooldowns.retain(|c| c.remaining > Fixed::ZERO);

        let mut launched = Vec::new();
        self.pending_rocks.retain_mut(|rock| {
            rock.delay -= dt;
            if rock.delay > Fixed::ZERO {
                return true;
            }
            launched.push(*rock);
            false
        });
        for rock in launched {
            let speed = ctx
                .spells
                .get(SpellId::EarthBarrage)
                .map_or(Fixed::ONE, |s| s.travel_speed);
            self.projectiles.push(Projectile::new(
                rock.owner,
                SpellId::EarthBarrage,
                rock.cast_id,
                rock.start,
                rock.target_point,
                speed,
                ProjectileTarget::Node(rock.node),
            ));
        }

        let mut arrived = Vec::new();
        self.projectiles.retain_mut(|projectile| {
            projectile.update(dt);
            if projectile.arrived {
                arrived.push(projectile.clone());
                return false;
            }
            true
        });

        for projectile in arrived {
            if ctx.combat.combat_over {
                break;
            }
            self.resolve_hit(&projectile, sides, ctx);
        }

        let live: BTreeSet<u32> = self
            .projectiles
            .iter()
            .map(|p| p.cast_id)
            .chain(self.pending_rocks.iter().map(|r| r.cast_id))
            .collect();
        self.absorbed_casts.retain(|id| live.contains(id));
    }

    fn resolve_hit(
        &mut self,
        projectile: &Projectile,
        sides: &mut dyn Combatants,
        ctx: &mut SpellContext<'_>,
    ) {
        let spells = ctx.spells;
        let Some(data) = spells.get(projectile.spell) else {
            return;
        };
        let defender = projectile.owner.opponent();
        let (state, network) = sides.side_mut(defender);

        match (&data.effect, projectile.target) {
            (SpellEffect::Bolt { hp_damage }, ProjectileTarget::Node(node)) => {
                if shield::can_block(state, data) {
                    shield::absorb_hit(state, network, ctx.balance, ctx.events);
                    element_stability(data, state, true, ctx);
                    return;
                }
                network.damage_node(node, ctx.events);
                lose_hp(state, *hp_damage, ctx.events);
                element_stability(data, state, true, ctx);
                check_death(state, ctx);
            }
            (
                SpellEffect::Fireball {
                    radius,
                    hp_damage_per_node,
                },
                ProjectileTarget::Area(center),
            ) => {
                if shield::can_block(state, data) {
                    shield::absorb_hit(state, network, ctx.balance, ctx.events);
                    element_stability(data, state, true, ctx);
                    return;
                }
                let radius_sq = *radius * *radius;
                let hit: Vec<NodeId> = network
                    .nodes()
                    .filter(|n| n.position.distance_squared(center) <= radius_sq)
                    .map(|n| n.id)
                    .collect();
                for node in &hit {
                    network.damage_node(*node, ctx.events);
                }
                if !hit.is_empty() {
                    let count = i32::try_from(hit.len()).unwrap_or(i32::MAX);
                    lose_hp(state, hp_damage_per_node.saturating_mul(count), ctx.events);
                }
                element_stability(data, state, true, ctx);
                check_death(state, ctx);
            }
            (
                SpellEffect::Barrage {
                    hit_chance,
                    hp_damage_per_rock,
                    ..
                },
                ProjectileTarget::Node(node),
            ) => {
                if ctx.rng.roll() >= *hit_chance {
                    return;
                }
                if shield::can_block(state, data) && !self.absorbed_casts.contains(&projectile.cast_id) {
                    self.absorbed_casts.insert(projectile.cast_id);
                    shield::absorb_hit(state, network, ctx.balance, ctx.events);
                    element_stability(data, state, true, ctx);
                    return;
                }
                network.damage_node(node, ctx.events);
                lose_hp(state, *hp_damage_per_rock, ctx.events);
                element_stability(data, state, true, ctx);
                check_death(state, ctx);
            }
            _ => {}
        }
    }
}

/// Shield-up defenders turn choke and flood into a timed drain.
fn mitigate(
    data: &SpellData,
    state: &SideState,
    drain: Fixed,
    duration: Fixed,
    ctx: &mut SpellContext<'_>,
) -> bool {
    if !state.shield_up() {
        return false;
    }
    ctx.events.push(CombatEvent::StabilityDrain {
        side: state.side,
        amount: drain,
        duration,
    });
    let damage = spell_stability_damage(data.element, state.dominant_element, true, false, ctx.balance);
    if damage > Fixed::ZERO {
        ctx.events.push(CombatEvent::StabilityDamage {
            side: state.side,
            amount: damage,
        });
    }
    true
}

/// Elemental stability damage for a resolved hit, judged with the shield down.
fn element_stability(
    data: &SpellData,
    state: &SideState,
    is_projectile: bool,
    ctx: &mut SpellContext<'_>,
) {
    let damage = spell_stability_damage(
        data.element,
        state.dominant_element,
        false,
        is_projectile,
        ctx.balance,
    );
    if damage > Fixed::ZERO {
        ctx.events.push(CombatEvent::StabilityDamage {
            side: state.side,
            amount: damage,
        });
    }
}

fn disrupt_undamaged(network: &mut NodeNetwork, node: NodeId, events: &mut Vec<CombatEvent>) {
    if network.state(node) != NodeState::Damaged {
        network.disrupt_node(node, events);
    }
}

fn lose_hp(state: &mut SideState, amount: i32, events: &mut Vec<CombatEvent>) {
    state.hp = state.hp.saturating_sub(amount);
    events.push(CombatEvent::HpChanged {
        side: state.side,
        hp: state.hp.max(0),
    });
}

fn check_death(state: &mut SideState, ctx: &mut SpellContext<'_>) {
    if state.hp > 0 {
        return;
    }
    state.hp = 0;
    let result = CombatResult::won_by(state.side.opponent());
    if ctx.combat.finish(result) {
        ctx.events.push(CombatEvent::HpDeath { loser: state.side });
        ctx.events.push(CombatEvent::CombatEnded { result });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channeling::ChannelingSystem;
    use crate::components::{BeamSchool, Element, ShieldState};
    use crate::data::gem::{Gem, GemId};
    use crate::data::loadout::Loadout;
    use crate::math::fx;
    use crate::rng::CombatRng;

    struct Pair {
        player: (SideState, NodeNetwork),
        enemy: (SideState, NodeNetwork),
    }

    impl Combatants for Pair {
        fn side(&self, side: Side) -> (&SideState, &NodeNetwork) {
            let (state, network) = match side {
                Side::Player => &self.player,
                Side::Enemy => &self.enemy,
            };
            (state, network)
        }

        fn side_mut(&mut self, side: Side) -> (&mut SideState, &mut NodeNetwork) {
            let (state, network) = match side {
                Side::Player => &mut self.player,
                Side::Enemy => &mut self.enemy,
            };
            (state, network)
        }
    }

    fn spell_gem(spell: SpellId, balance: &BalanceConfig) -> Gem {
        let (charge, debuff) = spell.book_costs(balance);
        Gem {
            id: GemId(0),
            element: spell.element(),
            school: BeamSchool::Neutral,
            passive_stat: PassiveStat::SpellCooldown,
            passive_value: fx(-10.0),
            spell: Some(spell),
            spell_charge_time: charge,
            spell_mana_debuff: debuff,
            upgraded: false,
        }
    }

    /// Player channels `spell` from the crown; enemy is fully open with a
    /// channeled shield (raised if `shield_up`).
    fn setup(spell: SpellId, shield_up: bool) -> (Pair, BalanceConfig) {
        let balance = BalanceConfig::default();
        let mut events = Vec::new();

        let mut player_loadout = Loadout::empty(BeamSchool::Pure, Element::Fire, &balance);
        let gem = player_loadout.add_gem(spell_gem(spell, &balance));
        player_loadout.slot_gem(gem, NodeId::Crown).unwrap();
        player_loadout.all_nodes_open = true;
        let mut player_net = NodeNetwork::new(Side::Player, &balance);
        player_net.init(&player_loadout);
        let mut player = SideState::new(Side::Player, &player_loadout, &balance);
        let mut channeling = ChannelingSystem::new();
        assert!(channeling.request_channel(&mut player, &player_net, gem, &balance, &mut events));
        channeling.update(&mut player, &mut player_net, fx(1.0), &mut events);

        let mut enemy_loadout = Loadout::new(BeamSchool::Order, Element::Air, &balance);
        enemy_loadout.all_nodes_open = true;
        let shield_gem = enemy_loadout.find_spell_gem(SpellId::Shield).unwrap();
        enemy_loadout.slot_gem(shield_gem, NodeId::RightRoot).unwrap();
        let mut enemy_net = NodeNetwork::new(Side::Enemy, &balance);
        enemy_net.init(&enemy_loadout);
        let mut enemy = SideState::new(Side::Enemy, &enemy_loadout, &balance);
        let mut enemy_channeling = ChannelingSystem::new();
        enemy_channeling.request_channel(&mut enemy, &enemy_net, shield_gem, &balance, &mut events);
        enemy_channeling.update(&mut enemy, &mut enemy_net, fx(1.0), &mut events);
        if shield_up {
            shield::toggle_shield(&mut enemy, &mut events);
        }

        (
            Pair {
                player: (player, player_net),
                enemy: (enemy, enemy_net),
            },
            balance,
        )
    }

    fn run(
        caster: &mut SpellCaster,
        pair: &mut Pair,
        balance: &BalanceConfig,
        rng: &mut CombatRng,
        combat: &mut CombatState,
        seconds: f64,
    ) -> Vec<CombatEvent> {
        let spells = SpellRegistry::from_balance(balance);
        let mut events = Vec::new();
        let ticks = (seconds * 60.0).round() as usize;
        for _ in 0..ticks {
            let mut ctx = SpellContext {
                balance,
                spells: &spells,
                rng: &mut *rng,
                combat: &mut *combat,
                events: &mut events,
            };
            caster.update(fx(1.0 / 60.0), pair, &mut ctx);
        }
        events
    }

    fn cast(
        caster: &mut SpellCaster,
        pair: &mut Pair,
        balance: &BalanceConfig,
        combat: &mut CombatState,
        spell: SpellId,
        target: SpellTarget,
    ) -> (bool, Vec<CombatEvent>) {
        let spells = SpellRegistry::from_balance(balance);
        let mut rng = CombatRng::from_seed(0);
        let mut events = Vec::new();
        let mut ctx = SpellContext {
            balance,
            spells: &spells,
            rng: &mut rng,
            combat: &mut *combat,
            events: &mut events,
        };
        let ok = caster.cast_spell(Side::Player, spell, target, pair, &mut ctx);
        (ok, events)
    }

    #[test]
    fn test_cast_requires_channeled_gem_and_cooldown() {
        let (mut pair, balance) = setup(SpellId::GreyBolt, false);
        let mut combat = CombatState::new(&balance);
        let mut caster = SpellCaster::new();

        let (ok, _) = cast(&mut caster, &mut pair, &balance, &mut combat, SpellId::Fireball, SpellTarget::None);
        assert!(!ok);

        let target = SpellTarget::Node(NodeId::Crown);
        let (ok, events) = cast(&mut caster, &mut pair, &balance, &mut combat, SpellId::GreyBolt, target);
        assert!(ok);
        assert_eq!(events.last().map(CombatEvent::name), Some("spell_cast"));
        assert!(caster.is_on_cooldown(Side::Player, SpellId::GreyBolt));
        // The channeled gem's -10% cooldown passive applies.
        let remaining = caster.cooldown_remaining(Side::Player, SpellId::GreyBolt);
        assert!((remaining - fx(4.5)).abs() < fx(0.001));

        let (ok, _) = cast(&mut caster, &mut pair, &balance, &mut combat, SpellId::GreyBolt, target);
        assert!(!ok);
    }

    #[test]
    fn test_targeted_spell_needs_target() {
        let (mut pair, balance) = setup(SpellId::GreyBolt, false);
        let mut combat = CombatState::new(&balance);
        let mut caster = SpellCaster::new();
        let (ok, _) = cast(&mut caster, &mut pair, &balance, &mut combat, SpellId::GreyBolt, SpellTarget::None);
        assert!(!ok);
        assert!(!caster.is_on_cooldown(Side::Player, SpellId::GreyBolt));
    }

    #[test]
    fn test_grey_bolt_hits_node_and_hp() {
        let (mut pair, balance) = setup(SpellId::GreyBolt, false);
        let mut combat = CombatState::new(&balance);
        let mut caster = SpellCaster::new();
        let mut rng = CombatRng::from_seed(1);
        cast(&mut caster, &mut pair, &balance, &mut combat, SpellId::GreyBolt, SpellTarget::Node(NodeId::Crown));
        assert_eq!(caster.projectiles().len(), 1);

        let events = run(&mut caster, &mut pair, &balance, &mut rng, &mut combat, 4.0);
        assert!(caster.projectiles().is_empty());
        assert_eq!(pair.enemy.1.state(NodeId::Crown), NodeState::Damaged);
        assert_eq!(pair.enemy.0.hp, 27);
        // Grey bolt has no element: base stability damage.
        assert!(events.contains(&CombatEvent::StabilityDamage {
            side: Side::Enemy,
            amount: fx(10.0),
        }));
    }

    #[test]
    fn test_shield_absorbs_bolt() {
        let (mut pair, balance) = setup(SpellId::GreyBolt, true);
        let mut combat = CombatState::new(&balance);
        let mut caster = SpellCaster::new();
        let mut rng = CombatRng::from_seed(1);
        cast(&mut caster, &mut pair, &balance, &mut combat, SpellId::GreyBolt, SpellTarget::Node(NodeId::Crown));
        let events = run(&mut caster, &mut pair, &balance, &mut rng, &mut combat, 4.0);
        assert_eq!(pair.enemy.1.state(NodeId::Crown), NodeState::Open);
        assert_eq!(pair.enemy.0.hp, 30);
        assert_eq!(pair.enemy.0.shield_state, ShieldState::Recharging);
        assert!(events.contains(&CombatEvent::ShieldBroke { side: Side::Enemy }));
    }

    #[test]
    fn test_fireball_damages_area() {
        let (mut pair, balance) = setup(SpellId::Fireball, false);
        let mut combat = CombatState::new(&balance);
        let mut caster = SpellCaster::new();
        let mut rng = CombatRng::from_seed(1);
        cast(&mut caster, &mut pair, &balance, &mut combat, SpellId::Fireball, SpellTarget::Node(NodeId::Sternum));
        run(&mut caster, &mut pair, &balance, &mut rng, &mut combat, 4.0);

        let network = &pair.enemy.1;
        let center = network.node(NodeId::Sternum).position;
        let expected: Vec<NodeId> = network
            .nodes()
            .filter(|n| n.position.distance_squared(center) <= fx(1600.0))
            .map(|n| n.id)
            .collect();
        assert!(expected.len() > 1);
        for node in &expected {
            assert_eq!(network.state(*node), NodeState::Damaged);
        }
        assert_eq!(pair.enemy.0.hp, 30 - 3 * expected.len() as i32);
    }

    #[test]
    fn test_air_choke_disrupts_head() {
        let (mut pair, balance) = setup(SpellId::AirChoke, false);
        let mut combat = CombatState::new(&balance);
        let mut caster = SpellCaster::new();
        let (ok, events) = cast(&mut caster, &mut pair, &balance, &mut combat, SpellId::AirChoke, SpellTarget::None);
        assert!(ok);
        for node in [NodeId::Crown, NodeId::ThirdEye, NodeId::Throat] {
            assert_eq!(pair.enemy.1.state(node), NodeState::Dormant);
        }
        assert_eq!(pair.enemy.1.state(NodeId::Sternum), NodeState::Open);
        assert!(!events.iter().any(|e| e.name() == "stability_drain"));
    }

    #[test]
    fn test_air_choke_mitigated_by_shield() {
        let (mut pair, balance) = setup(SpellId::AirChoke, true);
        let mut combat = CombatState::new(&balance);
        let mut caster = SpellCaster::new();
        let (_, events) = cast(&mut caster, &mut pair, &balance, &mut combat, SpellId::AirChoke, SpellTarget::None);
        assert_eq!(pair.enemy.1.state(NodeId::Crown), NodeState::Open);
        assert_eq!(
            events[0],
            CombatEvent::StabilityDrain {
                side: Side::Enemy,
                amount: fx(50.0),
                duration: fx(3.0),
            }
        );
        // Air enemy vs air spell: no elemental edge, base damage.
        assert_eq!(
            events[1],
            CombatEvent::StabilityDamage {
                side: Side::Enemy,
                amount: fx(10.0),
            }
        );
    }

    #[test]
    fn test_water_beam_floods_toward_root() {
        let (mut pair, balance) = setup(SpellId::WaterBeam, false);
        let mut combat = CombatState::new(&balance);
        let mut caster = SpellCaster::new();
        let (ok, _) = cast(&mut caster, &mut pair, &balance, &mut combat, SpellId::WaterBeam, SpellTarget::Node(NodeId::Throat));
        assert!(ok);
        // throat -> sternum -> belly -> left_root; flood_count 2.
        for node in [NodeId::Throat, NodeId::Sternum, NodeId::Belly] {
            assert_eq!(pair.enemy.1.state(node), NodeState::Dormant);
        }
        assert_eq!(pair.enemy.1.state(NodeId::LeftRoot), NodeState::Open);
    }

    #[test]
    fn test_water_beam_short_path() {
        let (mut pair, balance) = setup(SpellId::WaterBeam, false);
        let mut combat = CombatState::new(&balance);
        let mut caster = SpellCaster::new();
        cast(&mut caster, &mut pair, &balance, &mut combat, SpellId::WaterBeam, SpellTarget::Node(NodeId::Belly));
        assert_eq!(pair.enemy.1.state(NodeId::Belly), NodeState::Dormant);
        assert_eq!(pair.enemy.1.state(NodeId::LeftRoot), NodeState::Dormant);
        assert_eq!(pair.enemy.1.nodes_in(NodeState::Dormant).len(), 2);
    }

    #[test]
    fn test_barrage_absorbs_at_most_one_rock() {
        let (mut pair, mut balance) = setup(SpellId::EarthBarrage, true);
        balance.spells.earth_barrage.hit_chance = Fixed::ONE;
        balance.shield.recharge_time = fx(0.05);
        balance.floors.shield_recharge = fx(0.05);
        let mut combat = CombatState::new(&balance);
        let mut caster = SpellCaster::new();
        let mut rng = CombatRng::from_seed(1);
        cast(&mut caster, &mut pair, &balance, &mut combat, SpellId::EarthBarrage, SpellTarget::Node(NodeId::Crown));
        assert_eq!(caster.pending_rocks().len(), 4);

        // The shield recharges between rocks, but only the first rock is absorbed.
        let mut events = Vec::new();
        let spells = SpellRegistry::from_balance(&balance);
        for _ in 0..240 {
            let mut ctx = SpellContext {
                balance: &balance,
                spells: &spells,
                rng: &mut rng,
                combat: &mut combat,
                events: &mut events,
            };
            caster.update(fx(1.0 / 60.0), &mut pair, &mut ctx);
            shield::update(&mut pair.enemy.0, fx(1.0 / 60.0), &mut events);
        }
        assert_eq!(events.iter().filter(|e| e.name() == "shield_broke").count(), 1);
        assert_eq!(pair.enemy.0.hp, 30 - 3 * 3);
    }

    #[test]
    fn test_hp_death_ends_combat_once() {
        let (mut pair, balance) = setup(SpellId::GreyBolt, false);
        pair.enemy.0.hp = 2;
        let mut combat = CombatState::new(&balance);
        let mut caster = SpellCaster::new();
        let mut rng = CombatRng::from_seed(1);
        cast(&mut caster, &mut pair, &balance, &mut combat, SpellId::GreyBolt, SpellTarget::Node(NodeId::Crown));
        let events = run(&mut caster, &mut pair, &balance, &mut rng, &mut combat, 4.0);
        assert_eq!(pair.enemy.0.hp, 0);
        assert!(combat.combat_over);
        assert_eq!(combat.result, Some(CombatResult::PlayerWin));
        assert_eq!(events.iter().filter(|e| e.name() == "hp_death").count(), 1);
    }
}
