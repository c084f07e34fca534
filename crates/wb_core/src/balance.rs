//! Balance configuration: every numeric tunable the combat core reads.
//!
//! The default table reproduces the shipped game. Tables can be loaded from
//! RON so designers can iterate without recompiling; fixed-point values are
//! written as plain decimals.
//!
//! # Example RON
//!
//! ```ron
//! BalanceConfig(
//!     beam: (collision_start: 50.0, push_rate: 1.0, beam_min_thickness: 4.0,
//!            beam_max_thickness: 22.0, max_mana: 11.0),
//!     // ...
//! )
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CombatError, Result};
use crate::math::{decimal_serde, fx, Fixed, Vec2Fixed};

/// Beam struggle tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeamBalance {
    /// Starting collision point (0 = enemy wins, 100 = player wins).
    #[serde(with = "decimal_serde")]
    pub collision_start: Fixed,
    /// Collision movement per point of mana difference per second.
    #[serde(with = "decimal_serde")]
    pub push_rate: Fixed,
    /// Beam thickness at zero mana (rendering).
    #[serde(with = "decimal_serde")]
    pub beam_min_thickness: Fixed,
    /// Beam thickness at `max_mana` (rendering).
    #[serde(with = "decimal_serde")]
    pub beam_max_thickness: Fixed,
    /// Mana that maps to maximum beam thickness.
    #[serde(with = "decimal_serde")]
    pub max_mana: Fixed,
}

/// School counter tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolBalance {
    /// Mana lost while the opposing beam counters this side's beam.
    #[serde(with = "decimal_serde")]
    pub counter_debuff: Fixed,
    /// Counter debuff when the countering side has every mana node active.
    #[serde(with = "decimal_serde")]
    pub counter_debuff_max: Fixed,
}

/// Beam switcher tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeamSwitchBalance {
    /// Base charge time before an attack school activates.
    #[serde(with = "decimal_serde")]
    pub charge_time: Fixed,
    /// Lock after an attack switch completes.
    #[serde(with = "decimal_serde")]
    pub lock_time: Fixed,
    /// Lock after any switch to neutral.
    #[serde(with = "decimal_serde")]
    pub neutral_lock_time: Fixed,
    /// Stability lost by a voluntary neutral switch.
    #[serde(with = "decimal_serde")]
    pub neutral_voluntary_stability: Fixed,
    /// Stability lost by a forced neutral switch.
    #[serde(with = "decimal_serde")]
    pub neutral_forced_stability: Fixed,
}

/// Element system tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementBalance {
    /// Push multiplier for the side whose element wins.
    #[serde(with = "decimal_serde")]
    pub push_multiplier: Fixed,
    /// Stability damage of a spell without elemental advantage.
    #[serde(with = "decimal_serde")]
    pub spell_stability_base: Fixed,
    /// Stability damage of a spell whose element beats the defender's.
    #[serde(with = "decimal_serde")]
    pub spell_stability_counter: Fixed,
    /// Delay before a new dominant element takes effect.
    #[serde(with = "decimal_serde")]
    pub shift_delay: Fixed,
}

/// Stability tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilityBalance {
    /// Drain per second while on the neutral beam.
    #[serde(with = "decimal_serde")]
    pub drain_rate: Fixed,
    /// Regeneration per second while on an attack beam.
    #[serde(with = "decimal_serde")]
    pub regen_rate: Fixed,
    /// Maximum (and reset) stability.
    #[serde(with = "decimal_serde")]
    pub max: Fixed,
}

/// Shield tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShieldBalance {
    /// Base recharge time after absorbing a hit.
    #[serde(with = "decimal_serde")]
    pub recharge_time: Fixed,
}

/// Channeling tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelingBalance {
    /// Delay between a channel request and the node becoming channeled.
    #[serde(with = "decimal_serde")]
    pub channel_time: Fixed,
    /// Maximum gems channeled (or pending) at once.
    pub max_channeled_spells: usize,
}

/// Node network tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeBalance {
    /// Seconds to open a dormant node.
    #[serde(with = "decimal_serde")]
    pub activation_time: Fixed,
    /// Seconds to repair a damaged node.
    #[serde(with = "decimal_serde")]
    pub repair_time: Fixed,
    /// Milliseconds for the awareness token to cross one edge.
    #[serde(with = "decimal_serde")]
    pub awareness_travel_time: Fixed,
}

/// Grey bolt: single-target projectile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoltBalance {
    /// Continuous mana upkeep while channeled.
    #[serde(with = "decimal_serde")]
    pub mana_cost: Fixed,
    /// HP lost by the defender on hit.
    pub hp_damage: i32,
    /// Seconds between casts.
    #[serde(with = "decimal_serde")]
    pub cooldown: Fixed,
    /// Pixels per second.
    #[serde(with = "decimal_serde")]
    pub travel_speed: Fixed,
    /// Spell book charge time.
    #[serde(with = "decimal_serde")]
    pub charge_time: Fixed,
    /// Mana debuff while charging in the spell book.
    #[serde(with = "decimal_serde")]
    pub mana_debuff: Fixed,
}

/// Shield gem spell row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WardBalance {
    /// Continuous mana upkeep while channeled.
    #[serde(with = "decimal_serde")]
    pub mana_cost: Fixed,
    /// Cooldown (the shield is toggled, never cast).
    #[serde(with = "decimal_serde")]
    pub cooldown: Fixed,
    /// Spell book charge time.
    #[serde(with = "decimal_serde")]
    pub charge_time: Fixed,
    /// Mana debuff while charging in the spell book.
    #[serde(with = "decimal_serde")]
    pub mana_debuff: Fixed,
}

/// Fireball: AOE projectile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireballBalance {
    /// AOE radius in pixels.
    #[serde(with = "decimal_serde")]
    pub radius: Fixed,
    /// Continuous mana upkeep while channeled.
    #[serde(with = "decimal_serde")]
    pub mana_cost: Fixed,
    /// HP lost per node inside the radius.
    pub hp_damage_per_node: i32,
    /// Seconds between casts.
    #[serde(with = "decimal_serde")]
    pub cooldown: Fixed,
    /// Pixels per second.
    #[serde(with = "decimal_serde")]
    pub travel_speed: Fixed,
    /// Spell book charge time.
    #[serde(with = "decimal_serde")]
    pub charge_time: Fixed,
    /// Mana debuff while charging in the spell book.
    #[serde(with = "decimal_serde")]
    pub mana_debuff: Fixed,
}

/// Earth barrage: staggered rocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarrageBalance {
    /// Rocks per cast.
    pub rock_count: u32,
    /// Chance each rock connects.
    #[serde(with = "decimal_serde")]
    pub hit_chance: Fixed,
    /// Continuous mana upkeep while channeled.
    #[serde(with = "decimal_serde")]
    pub mana_cost: Fixed,
    /// HP lost per connecting rock.
    pub hp_damage_per_rock: i32,
    /// Seconds between casts.
    #[serde(with = "decimal_serde")]
    pub cooldown: Fixed,
    /// Pixels per second.
    #[serde(with = "decimal_serde")]
    pub travel_speed: Fixed,
    /// Delay between consecutive rock launches.
    #[serde(with = "decimal_serde")]
    pub stagger_delay: Fixed,
    /// Spell book charge time.
    #[serde(with = "decimal_serde")]
    pub charge_time: Fixed,
    /// Mana debuff while charging in the spell book.
    #[serde(with = "decimal_serde")]
    pub mana_debuff: Fixed,
}

/// Air choke: immediate disruption of the head nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChokeBalance {
    /// Continuous mana upkeep while channeled.
    #[serde(with = "decimal_serde")]
    pub mana_cost: Fixed,
    /// Seconds between casts.
    #[serde(with = "decimal_serde")]
    pub cooldown: Fixed,
    /// Total stability drained when the shield mitigates.
    #[serde(with = "decimal_serde")]
    pub stability_drain: Fixed,
    /// Duration of the mitigated drain.
    #[serde(with = "decimal_serde")]
    pub stability_drain_duration: Fixed,
    /// Spell book charge time.
    #[serde(with = "decimal_serde")]
    pub charge_time: Fixed,
    /// Mana debuff while charging in the spell book.
    #[serde(with = "decimal_serde")]
    pub mana_debuff: Fixed,
}

/// Water beam: target plus a flood toward the nearest root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloodBalance {
    /// Continuous mana upkeep while channeled.
    #[serde(with = "decimal_serde")]
    pub mana_cost: Fixed,
    /// Seconds between casts.
    #[serde(with = "decimal_serde")]
    pub cooldown: Fixed,
    /// Extra nodes disrupted along the path to the nearest root.
    pub flood_count: usize,
    /// Total stability drained when the shield mitigates.
    #[serde(with = "decimal_serde")]
    pub stability_drain: Fixed,
    /// Duration of the mitigated drain.
    #[serde(with = "decimal_serde")]
    pub stability_drain_duration: Fixed,
    /// Spell book charge time.
    #[serde(with = "decimal_serde")]
    pub charge_time: Fixed,
    /// Mana debuff while charging in the spell book.
    #[serde(with = "decimal_serde")]
    pub mana_debuff: Fixed,
}

/// Per-spell tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellBalance {
    /// Grey bolt.
    pub grey_bolt: BoltBalance,
    /// Shield gem.
    pub shield: WardBalance,
    /// Fireball.
    pub fireball: FireballBalance,
    /// Earth barrage.
    pub earth_barrage: BarrageBalance,
    /// Air choke.
    pub air_choke: ChokeBalance,
    /// Water beam.
    pub water_beam: FloodBalance,
}

/// Hit point tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HpBalance {
    /// Player starting maximum HP.
    pub starting_max: i32,
}

/// Lower bounds applied after passive bonuses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorBalance {
    /// Minimum awareness hop time in milliseconds.
    #[serde(with = "decimal_serde")]
    pub awareness_speed: Fixed,
    /// Minimum activation time in seconds.
    #[serde(with = "decimal_serde")]
    pub activation_speed: Fixed,
    /// Minimum beam switch charge time in seconds.
    #[serde(with = "decimal_serde")]
    pub beam_switch: Fixed,
    /// Maximum fractional spell cooldown reduction.
    #[serde(with = "decimal_serde")]
    pub spell_cooldown_reduction: Fixed,
    /// Minimum repair time in seconds.
    #[serde(with = "decimal_serde")]
    pub node_repair: Fixed,
    /// Minimum shield recharge time in seconds.
    #[serde(with = "decimal_serde")]
    pub shield_recharge: Fixed,
}

/// Passive bonus magnitude granted by a gem of each stat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassiveBalance {
    /// Milliseconds per awareness hop.
    #[serde(with = "decimal_serde")]
    pub awareness_speed_bonus: Fixed,
    /// Seconds of activation time.
    #[serde(with = "decimal_serde")]
    pub activation_speed_bonus: Fixed,
    /// Seconds of beam switch charge.
    #[serde(with = "decimal_serde")]
    pub beam_switch_bonus: Fixed,
    /// Percent of spell cooldown.
    #[serde(with = "decimal_serde")]
    pub spell_cooldown_bonus: Fixed,
    /// Seconds of repair time.
    #[serde(with = "decimal_serde")]
    pub node_repair_bonus: Fixed,
    /// Seconds of shield recharge.
    #[serde(with = "decimal_serde")]
    pub shield_recharge_bonus: Fixed,
}

/// Random gem generation tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GemBalance {
    /// Spell chance for a tier-1 random gem.
    #[serde(with = "decimal_serde")]
    pub spell_chance_base: Fixed,
    /// Additional spell chance per tier above 1.
    #[serde(with = "decimal_serde")]
    pub spell_chance_per_tier: Fixed,
}

/// Enemy panic tunables (once per fight).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanicBalance {
    /// Collision distance from the losing edge that triggers panic.
    #[serde(with = "decimal_serde")]
    pub threshold: Fixed,
    /// Effective mana bonus while panicking.
    #[serde(with = "decimal_serde")]
    pub mana_bonus: Fixed,
    /// Seconds panic lasts.
    #[serde(with = "decimal_serde")]
    pub duration: Fixed,
}

/// Enemy stats for one tier (or the boss).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierBalance {
    /// Starting and maximum HP.
    pub hp: i32,
    /// Awareness hop time in milliseconds.
    #[serde(with = "decimal_serde")]
    pub awareness_speed: Fixed,
    /// Number of beam schools the enemy can use.
    pub beam_types_unlocked: usize,
    /// Seconds between beam decisions.
    #[serde(with = "decimal_serde")]
    pub reaction_time: Fixed,
    /// Whether the enemy carries a shield gem.
    pub has_shield: bool,
    /// Total gems carried.
    pub gem_count: usize,
    /// Multiplier on activation and repair times.
    #[serde(with = "decimal_serde")]
    pub activation_time_multiplier: Fixed,
    /// Open every node at combat start.
    #[serde(default)]
    pub all_nodes_open: bool,
}

/// Elite modifiers applied on top of a tier row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EliteBalance {
    /// Extra HP.
    pub hp_bonus: i32,
    /// Awareness hop time change in milliseconds.
    #[serde(with = "decimal_serde")]
    pub awareness_speed_bonus: Fixed,
    /// Extra random gems.
    pub extra_gems: usize,
}

/// Enemy AI and generation tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyBalance {
    /// Seconds between AI decision passes.
    #[serde(with = "decimal_serde")]
    pub ai_decision_interval: Fixed,
    /// Seconds between AI damage spell casts.
    #[serde(with = "decimal_serde")]
    pub spell_cast_interval: Fixed,
    /// Minimum stability before the AI channels a damage spell.
    #[serde(with = "decimal_serde")]
    pub spell_stability_threshold: Fixed,
    /// Minimum effective mana before the AI channels a damage spell.
    #[serde(with = "decimal_serde")]
    pub spell_channel_mana: Fixed,
    /// Effective mana below which the AI drops its damage spell.
    #[serde(with = "decimal_serde")]
    pub spell_unchannel_mana: Fixed,
    /// Network mana needed before the AI channels its shield.
    #[serde(with = "decimal_serde")]
    pub shield_channel_mana: Fixed,
    /// Stability above which a countered AI fights back instead of holding.
    #[serde(with = "decimal_serde")]
    pub counter_stability_threshold: Fixed,
    /// Panic behaviour.
    pub panic: PanicBalance,
    /// Rows keyed by tier (1-based).
    pub tiers: BTreeMap<u8, TierBalance>,
    /// Elite modifiers.
    pub elite: EliteBalance,
    /// Final boss row.
    pub boss: TierBalance,
}

/// Integer pixel coordinate used for arena geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    /// X pixel.
    pub x: i32,
    /// Y pixel.
    pub y: i32,
}

impl Point {
    /// Convert to a fixed-point vector.
    #[must_use]
    pub fn to_vec(self) -> Vec2Fixed {
        Vec2Fixed::from_ints(self.x, self.y)
    }
}

/// Arena geometry needed by projectiles and rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaBalance {
    /// Arena width; the enemy network is mirrored across it.
    pub width: i32,
    /// Arena height.
    pub height: i32,
    /// Player wizard position.
    pub player_position: Point,
    /// Enemy wizard position.
    pub enemy_position: Point,
    /// Staff tip relative to the player wizard (mirrored for the enemy).
    pub staff_tip_offset: Point,
    /// Vertical offset of the beam line from the arena centre.
    pub beam_y_offset: i32,
}

/// Every combat tunable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceConfig {
    /// Beam struggle.
    pub beam: BeamBalance,
    /// School counters.
    pub school: SchoolBalance,
    /// Beam switching.
    pub beam_switch: BeamSwitchBalance,
    /// Elements.
    pub element: ElementBalance,
    /// Stability.
    pub stability: StabilityBalance,
    /// Shield.
    pub shield: ShieldBalance,
    /// Channeling.
    pub channeling: ChannelingBalance,
    /// Node network.
    pub nodes: NodeBalance,
    /// Spells.
    pub spells: SpellBalance,
    /// HP.
    pub hp: HpBalance,
    /// Floors.
    pub floors: FloorBalance,
    /// Passive bonuses.
    pub passives: PassiveBalance,
    /// Random gems.
    pub gems: GemBalance,
    /// Enemies and AI.
    pub enemy: EnemyBalance,
    /// Arena geometry.
    pub arena: ArenaBalance,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        let mut tiers = BTreeMap::new();
        tiers.insert(
            1,
            TierBalance {
                hp: 20,
                awareness_speed: fx(1350.0),
                beam_types_unlocked: 1,
                reaction_time: fx(2.0),
                has_shield: false,
                gem_count: 1,
                activation_time_multiplier: fx(2.25),
                all_nodes_open: false,
            },
        );
        tiers.insert(
            2,
            TierBalance {
                hp: 25,
                awareness_speed: fx(1200.0),
                beam_types_unlocked: 2,
                reaction_time: fx(1.5),
                has_shield: true,
                gem_count: 3,
                activation_time_multiplier: fx(2.25),
                all_nodes_open: false,
            },
        );
        tiers.insert(
            3,
            TierBalance {
                hp: 30,
                awareness_speed: fx(1050.0),
                beam_types_unlocked: 3,
                reaction_time: fx(1.0),
                has_shield: true,
                gem_count: 5,
                activation_time_multiplier: fx(2.25),
                all_nodes_open: false,
            },
        );

        Self {
            beam: BeamBalance {
                collision_start: fx(50.0),
                push_rate: fx(1.0),
                beam_min_thickness: fx(4.0),
                beam_max_thickness: fx(22.0),
                max_mana: fx(11.0),
            },
            school: SchoolBalance {
                counter_debuff: fx(3.0),
                counter_debuff_max: fx(6.0),
            },
            beam_switch: BeamSwitchBalance {
                charge_time: fx(0.0),
                lock_time: fx(5.0),
                neutral_lock_time: fx(2.0),
                neutral_voluntary_stability: fx(10.0),
                neutral_forced_stability: fx(40.0),
            },
            element: ElementBalance {
                push_multiplier: fx(1.2),
                spell_stability_base: fx(10.0),
                spell_stability_counter: fx(40.0),
                shift_delay: fx(2.0),
            },
            stability: StabilityBalance {
                drain_rate: fx(12.5),
                regen_rate: fx(1.0),
                max: fx(100.0),
            },
            shield: ShieldBalance {
                recharge_time: fx(6.0),
            },
            channeling: ChannelingBalance {
                channel_time: fx(1.0),
                max_channeled_spells: 3,
            },
            nodes: NodeBalance {
                activation_time: fx(2.0),
                repair_time: fx(3.0),
                awareness_travel_time: fx(375.0),
            },
            spells: SpellBalance {
                grey_bolt: BoltBalance {
                    mana_cost: fx(1.0),
                    hp_damage: 3,
                    cooldown: fx(5.0),
                    travel_speed: fx(375.0),
                    charge_time: fx(1.5),
                    mana_debuff: fx(2.0),
                },
                shield: WardBalance {
                    mana_cost: fx(1.0),
                    cooldown: fx(10.0),
                    charge_time: fx(1.5),
                    mana_debuff: fx(2.0),
                },
                fireball: FireballBalance {
                    radius: fx(40.0),
                    mana_cost: fx(2.0),
                    hp_damage_per_node: 3,
                    cooldown: fx(15.0),
                    travel_speed: fx(312.5),
                    charge_time: fx(2.5),
                    mana_debuff: fx(3.0),
                },
                earth_barrage: BarrageBalance {
                    rock_count: 4,
                    hit_chance: fx(0.5),
                    mana_cost: fx(2.0),
                    hp_damage_per_rock: 3,
                    cooldown: fx(12.0),
                    travel_speed: fx(312.5),
                    stagger_delay: fx(0.1),
                    charge_time: fx(2.0),
                    mana_debuff: fx(2.0),
                },
                air_choke: ChokeBalance {
                    mana_cost: fx(2.0),
                    cooldown: fx(15.0),
                    stability_drain: fx(50.0),
                    stability_drain_duration: fx(3.0),
                    charge_time: fx(2.0),
                    mana_debuff: fx(2.0),
                },
                water_beam: FloodBalance {
                    mana_cost: fx(2.0),
                    cooldown: fx(15.0),
                    flood_count: 2,
                    stability_drain: fx(40.0),
                    stability_drain_duration: fx(3.0),
                    charge_time: fx(2.5),
                    mana_debuff: fx(3.0),
                },
            },
            hp: HpBalance { starting_max: 30 },
            floors: FloorBalance {
                awareness_speed: fx(100.0),
                activation_speed: fx(0.5),
                beam_switch: fx(0.5),
                spell_cooldown_reduction: fx(0.5),
                node_repair: fx(1.0),
                shield_recharge: fx(2.0),
            },
            passives: PassiveBalance {
                awareness_speed_bonus: fx(-50.0),
                activation_speed_bonus: fx(-0.25),
                beam_switch_bonus: fx(-0.5),
                spell_cooldown_bonus: fx(-10.0),
                node_repair_bonus: fx(-0.5),
                shield_recharge_bonus: fx(-2.0),
            },
            gems: GemBalance {
                spell_chance_base: fx(0.2),
                spell_chance_per_tier: fx(0.15),
            },
            enemy: EnemyBalance {
                ai_decision_interval: fx(1.0),
                spell_cast_interval: fx(12.0),
                spell_stability_threshold: fx(50.0),
                spell_channel_mana: fx(3.0),
                spell_unchannel_mana: fx(2.0),
                shield_channel_mana: fx(3.0),
                counter_stability_threshold: fx(50.0),
                panic: PanicBalance {
                    threshold: fx(25.0),
                    mana_bonus: fx(5.0),
                    duration: fx(15.0),
                },
                tiers,
                elite: EliteBalance {
                    hp_bonus: 10,
                    awareness_speed_bonus: fx(-112.0),
                    extra_gems: 1,
                },
                boss: TierBalance {
                    hp: 40,
                    awareness_speed: fx(375.0),
                    beam_types_unlocked: 3,
                    reaction_time: fx(0.5),
                    has_shield: true,
                    gem_count: 6,
                    activation_time_multiplier: fx(2.25),
                    all_nodes_open: true,
                },
            },
            arena: ArenaBalance {
                width: 960,
                height: 540,
                player_position: Point { x: 86, y: 236 },
                enemy_position: Point { x: 874, y: 236 },
                staff_tip_offset: Point { x: 44, y: -38 },
                beam_y_offset: -65,
            },
        }
    }
}

impl BalanceConfig {
    /// Parse a balance table from RON text.
    ///
    /// `origin` names the source in error messages.
    pub fn from_ron_str(text: &str, origin: &str) -> Result<Self> {
        let config: Self = ron::from_str(text).map_err(|e| CombatError::DataParseError {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a balance table from a RON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| CombatError::Io {
            path: path.display().to_string(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "Loading balance table");
        Self::from_ron_str(&text, &path.display().to_string())
    }

    /// Render this table as pretty RON.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| CombatError::InvalidState(format!("Failed to serialize balance: {e}")))
    }

    /// Tier row for an enemy tier.
    pub fn tier(&self, tier: u8) -> Result<&TierBalance> {
        self.enemy.tiers.get(&tier).ok_or(CombatError::InvalidTier(tier))
    }

    /// Check the table for values the simulation cannot run with.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("beam.push_rate", self.beam.push_rate),
            ("beam.max_mana", self.beam.max_mana),
            ("element.push_multiplier", self.element.push_multiplier),
            ("element.shift_delay", self.element.shift_delay),
            ("stability.max", self.stability.max),
            ("nodes.activation_time", self.nodes.activation_time),
            ("nodes.repair_time", self.nodes.repair_time),
            ("nodes.awareness_travel_time", self.nodes.awareness_travel_time),
            ("floors.awareness_speed", self.floors.awareness_speed),
            ("floors.activation_speed", self.floors.activation_speed),
            ("floors.node_repair", self.floors.node_repair),
            ("floors.shield_recharge", self.floors.shield_recharge),
            ("spells.grey_bolt.travel_speed", self.spells.grey_bolt.travel_speed),
            ("spells.fireball.travel_speed", self.spells.fireball.travel_speed),
            ("spells.earth_barrage.travel_speed", self.spells.earth_barrage.travel_speed),
            (
                "spells.air_choke.stability_drain_duration",
                self.spells.air_choke.stability_drain_duration,
            ),
            (
                "spells.water_beam.stability_drain_duration",
                self.spells.water_beam.stability_drain_duration,
            ),
            ("enemy.ai_decision_interval", self.enemy.ai_decision_interval),
        ];
        for (field, value) in positive {
            if value <= Fixed::ZERO {
                return Err(invalid(field, format!("must be positive, got {value}")));
            }
        }

        if self.beam.collision_start <= Fixed::ZERO || self.beam.collision_start >= fx(100.0) {
            return Err(invalid(
                "beam.collision_start",
                "must lie strictly between 0 and 100".to_string(),
            ));
        }

        let hit = self.spells.earth_barrage.hit_chance;
        if hit < Fixed::ZERO || hit > Fixed::ONE {
            return Err(invalid(
                "spells.earth_barrage.hit_chance",
                format!("must lie in [0, 1], got {hit}"),
            ));
        }

        let reduction = self.floors.spell_cooldown_reduction;
        if reduction < Fixed::ZERO || reduction >= Fixed::ONE {
            return Err(invalid(
                "floors.spell_cooldown_reduction",
                format!("must lie in [0, 1), got {reduction}"),
            ));
        }

        if self.channeling.max_channeled_spells == 0 {
            return Err(invalid(
                "channeling.max_channeled_spells",
                "must allow at least one spell".to_string(),
            ));
        }

        for tier in 1..=3 {
            let row = self.tier(tier)?;
            if row.hp <= 0 {
                return Err(invalid(&format!("enemy.tiers.{tier}.hp"), "must be positive".to_string()));
            }
            if row.beam_types_unlocked == 0 || row.beam_types_unlocked > 3 {
                return Err(invalid(
                    &format!("enemy.tiers.{tier}.beam_types_unlocked"),
                    "must be 1..=3".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Projectile origin (staff tip) for a side.
    #[must_use]
    pub fn staff_tip(&self, side: crate::components::Side) -> Vec2Fixed {
        let offset = self.arena.staff_tip_offset;
        match side {
            crate::components::Side::Player => Point {
                x: self.arena.player_position.x + offset.x,
                y: self.arena.player_position.y + offset.y,
            }
            .to_vec(),
            crate::components::Side::Enemy => Point {
                x: self.arena.enemy_position.x - offset.x,
                y: self.arena.enemy_position.y + offset.y,
            }
            .to_vec(),
        }
    }
}

fn invalid(field: &str, reason: String) -> CombatError {
    CombatError::InvalidBalance {
        field: field.to_string(),
        reason,
    }
}
