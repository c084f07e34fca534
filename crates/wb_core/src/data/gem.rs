//! Gems, the gem arena, and gem generation.
//!
//! Gems live in a [`GemArena`] keyed by stable [`GemId`]. Node slots and
//! channel lists hold ids only, so a gem has exactly one home.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::balance::{BalanceConfig, PassiveBalance};
use crate::components::{BeamSchool, Element};
use crate::data::spell::SpellId;
use crate::math::{fixed_serde, Fixed};
use crate::rng::{choose, RandomSource};

/// Stable identifier of a gem within one arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GemId(pub u32);

impl std::fmt::Display for GemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gem_{}", self.0)
    }
}

/// Stat a gem's passive bonus modifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassiveStat {
    /// Milliseconds per awareness hop.
    AwarenessSpeed,
    /// Node activation time.
    ActivationSpeed,
    /// Beam switch charge time.
    BeamSwitch,
    /// Spell cooldown percentage.
    SpellCooldown,
    /// Node repair time.
    NodeRepair,
    /// Shield recharge time.
    ShieldRecharge,
}

impl PassiveStat {
    /// Every stat.
    pub const ALL: [PassiveStat; 6] = [
        PassiveStat::AwarenessSpeed,
        PassiveStat::ActivationSpeed,
        PassiveStat::BeamSwitch,
        PassiveStat::SpellCooldown,
        PassiveStat::NodeRepair,
        PassiveStat::ShieldRecharge,
    ];

    /// Stats random gems can roll. Shield recharge only comes from crafted gems.
    pub const ROLLABLE: [PassiveStat; 5] = [
        PassiveStat::AwarenessSpeed,
        PassiveStat::ActivationSpeed,
        PassiveStat::BeamSwitch,
        PassiveStat::SpellCooldown,
        PassiveStat::NodeRepair,
    ];

    /// Standard bonus magnitude for this stat.
    #[must_use]
    pub fn base_value(self, passives: &PassiveBalance) -> Fixed {
        match self {
            PassiveStat::AwarenessSpeed => passives.awareness_speed_bonus,
            PassiveStat::ActivationSpeed => passives.activation_speed_bonus,
            PassiveStat::BeamSwitch => passives.beam_switch_bonus,
            PassiveStat::SpellCooldown => passives.spell_cooldown_bonus,
            PassiveStat::NodeRepair => passives.node_repair_bonus,
            PassiveStat::ShieldRecharge => passives.shield_recharge_bonus,
        }
    }

    /// Snake-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            PassiveStat::AwarenessSpeed => "awareness_speed",
            PassiveStat::ActivationSpeed => "activation_speed",
            PassiveStat::BeamSwitch => "beam_switch",
            PassiveStat::SpellCooldown => "spell_cooldown",
            PassiveStat::NodeRepair => "node_repair",
            PassiveStat::ShieldRecharge => "shield_recharge",
        }
    }
}

/// An immutable gem record (apart from `upgraded`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gem {
    /// Arena id.
    pub id: GemId,
    /// Element, if any. Utility gems have none.
    pub element: Option<Element>,
    /// School; channeling locks out the beam that counters it.
    pub school: BeamSchool,
    /// Stat the passive bonus applies to.
    pub passive_stat: PassiveStat,
    /// Signed bonus; negative values make things faster.
    #[serde(with = "fixed_serde")]
    pub passive_value: Fixed,
    /// Spell provided while channeled.
    pub spell: Option<SpellId>,
    /// Seconds to charge in the spell book.
    #[serde(with = "fixed_serde")]
    pub spell_charge_time: Fixed,
    /// Effective mana lost while charging in the spell book.
    #[serde(with = "fixed_serde")]
    pub spell_mana_debuff: Fixed,
    /// Set by meta-progression upgrades.
    pub upgraded: bool,
}

impl Gem {
    /// Whether channeling this gem provides a spell.
    #[must_use]
    pub const fn has_spell(&self) -> bool {
        self.spell.is_some()
    }

    /// Whether this is the shield gem.
    #[must_use]
    pub fn is_shield(&self) -> bool {
        self.spell == Some(SpellId::Shield)
    }

    /// Whether this gem carries a damage spell.
    #[must_use]
    pub fn has_damage_spell(&self) -> bool {
        self.spell.is_some_and(SpellId::is_damage)
    }
}

/// Owner of every gem a combatant carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GemArena {
    gems: BTreeMap<GemId, Gem>,
    next_id: u32,
}

impl GemArena {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a gem under a fresh id, ignoring the id it carries.
    pub fn add(&mut self, mut gem: Gem) -> GemId {
        self.next_id += 1;
        let id = GemId(self.next_id);
        gem.id = id;
        self.gems.insert(id, gem);
        id
    }

    /// Look up a gem.
    #[must_use]
    pub fn get(&self, id: GemId) -> Option<&Gem> {
        self.gems.get(&id)
    }

    /// Mutable lookup (for upgrades).
    pub fn get_mut(&mut self, id: GemId) -> Option<&mut Gem> {
        self.gems.get_mut(&id)
    }

    /// Remove a gem.
    pub fn remove(&mut self, id: GemId) -> Option<Gem> {
        self.gems.remove(&id)
    }

    /// Whether the arena holds a gem.
    #[must_use]
    pub fn contains(&self, id: GemId) -> bool {
        self.gems.contains_key(&id)
    }

    /// Gems in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Gem> {
        self.gems.values()
    }

    /// Number of gems.
    #[must_use]
    pub fn len(&self) -> usize {
        self.gems.len()
    }

    /// Whether the arena is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.gems.is_empty()
    }
}

fn blank(balance: &BalanceConfig, stat: PassiveStat) -> Gem {
    Gem {
        id: GemId(0),
        element: None,
        school: BeamSchool::Neutral,
        passive_stat: stat,
        passive_value: stat.base_value(&balance.passives),
        spell: None,
        spell_charge_time: Fixed::ZERO,
        spell_mana_debuff: Fixed::ZERO,
        upgraded: false,
    }
}

fn with_spell(mut gem: Gem, spell: SpellId, balance: &BalanceConfig) -> Gem {
    let (charge, debuff) = spell.book_costs(balance);
    gem.spell = Some(spell);
    gem.spell_charge_time = charge;
    gem.spell_mana_debuff = debuff;
    gem
}

/// The starting grey bolt gem: neutral, no element, spell cooldown passive.
pub fn create_grey_bolt(arena: &mut GemArena, balance: &BalanceConfig) -> GemId {
    let gem = with_spell(blank(balance, PassiveStat::SpellCooldown), SpellId::GreyBolt, balance);
    arena.add(gem)
}

/// The shield gem: neutral, no element, awareness speed passive.
pub fn create_shield_gem(arena: &mut GemArena, balance: &BalanceConfig) -> GemId {
    let gem = with_spell(blank(balance, PassiveStat::AwarenessSpeed), SpellId::Shield, balance);
    arena.add(gem)
}

fn random_traits(rng: &mut dyn RandomSource) -> (Element, BeamSchool, PassiveStat) {
    let element = *choose(rng, &Element::ALL).unwrap_or(&Element::Fire);
    let school = *choose(rng, &BeamSchool::ATTACK).unwrap_or(&BeamSchool::Pure);
    let stat = *choose(rng, &PassiveStat::ROLLABLE).unwrap_or(&PassiveStat::AwarenessSpeed);
    (element, school, stat)
}

/// Roll a random gem for a tier.
///
/// Spell chance grows with tier. Only pure gems receive a spell, and it is
/// always their element's spell.
pub fn generate_random_gem(
    arena: &mut GemArena,
    tier: u8,
    balance: &BalanceConfig,
    rng: &mut dyn RandomSource,
) -> GemId {
    let (element, school, stat) = random_traits(rng);
    let mut gem = blank(balance, stat);
    gem.element = Some(element);
    gem.school = school;

    let tiers_above_first = Fixed::from_num(tier.saturating_sub(1));
    let spell_chance =
        balance.gems.spell_chance_base + balance.gems.spell_chance_per_tier * tiers_above_first;
    if rng.roll() < spell_chance && school == BeamSchool::Pure {
        gem = with_spell(gem, SpellId::for_element(element), balance);
    }

    arena.add(gem)
}

/// Roll a penalty gem: random traits, inverted passive, never a spell.
pub fn generate_penalty_gem(
    arena: &mut GemArena,
    balance: &BalanceConfig,
    rng: &mut dyn RandomSource,
) -> GemId {
    let (element, school, stat) = random_traits(rng);
    let mut gem = blank(balance, stat);
    gem.element = Some(element);
    gem.school = school;
    gem.passive_value = -gem.passive_value;
    arena.add(gem)
}
