//! Spell descriptors.
//!
//! A [`SpellRegistry`] is built from the balance table once per combat and
//! hands out immutable [`SpellData`]. Resolution behaviour is a closed
//! [`SpellEffect`] enum so the caster can match on it exhaustively.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::balance::BalanceConfig;
use crate::components::{Element, NodeId};
use crate::math::Fixed;

/// Identifier of every spell in the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpellId {
    /// Single-target projectile.
    GreyBolt,
    /// Toggleable ward.
    Shield,
    /// AOE projectile.
    Fireball,
    /// Staggered rocks.
    EarthBarrage,
    /// Head node disruption.
    AirChoke,
    /// Flood toward the nearest root.
    WaterBeam,
}

impl SpellId {
    /// Every spell.
    pub const ALL: [SpellId; 6] = [
        SpellId::GreyBolt,
        SpellId::Shield,
        SpellId::Fireball,
        SpellId::EarthBarrage,
        SpellId::AirChoke,
        SpellId::WaterBeam,
    ];

    /// Elemental spell granted to pure gems of an element.
    #[must_use]
    pub const fn for_element(element: Element) -> Self {
        match element {
            Element::Fire => SpellId::Fireball,
            Element::Earth => SpellId::EarthBarrage,
            Element::Air => SpellId::AirChoke,
            Element::Water => SpellId::WaterBeam,
        }
    }

    /// Element of the spell; grey bolt and shield have none.
    #[must_use]
    pub const fn element(self) -> Option<Element> {
        match self {
            SpellId::GreyBolt | SpellId::Shield => None,
            SpellId::Fireball => Some(Element::Fire),
            SpellId::EarthBarrage => Some(Element::Earth),
            SpellId::AirChoke => Some(Element::Air),
            SpellId::WaterBeam => Some(Element::Water),
        }
    }

    /// Whether the spell is cast at the opponent.
    #[must_use]
    pub const fn is_damage(self) -> bool {
        !matches!(self, SpellId::Shield)
    }

    /// Spell book charge time and mana debuff.
    #[must_use]
    pub fn book_costs(self, balance: &BalanceConfig) -> (Fixed, Fixed) {
        let s = &balance.spells;
        match self {
            SpellId::GreyBolt => (s.grey_bolt.charge_time, s.grey_bolt.mana_debuff),
            SpellId::Shield => (s.shield.charge_time, s.shield.mana_debuff),
            SpellId::Fireball => (s.fireball.charge_time, s.fireball.mana_debuff),
            SpellId::EarthBarrage => (s.earth_barrage.charge_time, s.earth_barrage.mana_debuff),
            SpellId::AirChoke => (s.air_choke.charge_time, s.air_choke.mana_debuff),
            SpellId::WaterBeam => (s.water_beam.charge_time, s.water_beam.mana_debuff),
        }
    }

    /// Snake-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            SpellId::GreyBolt => "grey_bolt",
            SpellId::Shield => "shield",
            SpellId::Fireball => "fireball",
            SpellId::EarthBarrage => "earth_barrage",
            SpellId::AirChoke => "air_choke",
            SpellId::WaterBeam => "water_beam",
        }
    }
}

impl std::fmt::Display for SpellId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a spell picks its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Targeting {
    /// One opposing node.
    SingleNode,
    /// A point; everything within the radius is hit.
    AoeCircle,
    /// Fires without a target.
    Immediate,
    /// Never cast.
    None,
}

/// Per-spell resolution behaviour and its numbers.
#[derive(Debug, Clone, PartialEq)]
pub enum SpellEffect {
    /// Projectile that damages one node.
    Bolt {
        /// HP lost on hit.
        hp_damage: i32,
    },
    /// Projectile that damages every node inside a circle.
    Fireball {
        /// AOE radius in pixels.
        radius: Fixed,
        /// HP lost per node hit.
        hp_damage_per_node: i32,
    },
    /// Staggered rocks, each rolling to hit.
    Barrage {
        /// Rocks per cast.
        rock_count: u32,
        /// Chance each rock connects.
        hit_chance: Fixed,
        /// HP lost per connecting rock.
        hp_damage_per_rock: i32,
        /// Delay between launches.
        stagger_delay: Fixed,
    },
    /// Disrupts a fixed node set, or drains stability through a shield.
    Choke {
        /// Nodes returned to dormant.
        affected_nodes: [NodeId; 3],
        /// Total drain when mitigated.
        stability_drain: Fixed,
        /// Duration of the mitigated drain.
        drain_duration: Fixed,
    },
    /// Disrupts the target and nodes toward the nearest root.
    Flood {
        /// Extra nodes disrupted along the path.
        flood_count: usize,
        /// Total drain when mitigated.
        stability_drain: Fixed,
        /// Duration of the mitigated drain.
        drain_duration: Fixed,
    },
    /// The shield; never cast.
    Ward,
}

/// Immutable descriptor of one spell.
#[derive(Debug, Clone, PartialEq)]
pub struct SpellData {
    /// Spell id.
    pub id: SpellId,
    /// Element used for stability damage checks.
    pub element: Option<Element>,
    /// Targeting mode.
    pub targeting: Targeting,
    /// Whether shields can block it outright.
    pub is_projectile: bool,
    /// Continuous upkeep while channeled.
    pub mana_cost: Fixed,
    /// Seconds between casts before passives.
    pub cooldown: Fixed,
    /// Projectile speed in pixels per second (zero for non-projectiles).
    pub travel_speed: Fixed,
    /// Resolution behaviour.
    pub effect: SpellEffect,
}

/// Read-only lookup of spell descriptors.
#[derive(Debug, Clone, PartialEq)]
pub struct SpellRegistry {
    spells: BTreeMap<SpellId, SpellData>,
}

impl SpellRegistry {
    /// Build every spell from the balance table.
    #[must_use]
    pub fn from_balance(balance: &BalanceConfig) -> Self {
        let s = &balance.spells;
        let entries = [
            SpellData {
                id: SpellId::GreyBolt,
                element: None,
                targeting: Targeting::SingleNode,
                is_projectile: true,
                mana_cost: s.grey_bolt.mana_cost,
                cooldown: s.grey_bolt.cooldown,
                travel_speed: s.grey_bolt.travel_speed,
                effect: SpellEffect::Bolt {
                    hp_damage: s.grey_bolt.hp_damage,
                },
            },
            SpellData {
                id: SpellId::Shield,
                element: None,
                targeting: Targeting::None,
                is_projectile: false,
                mana_cost: s.shield.mana_cost,
                cooldown: s.shield.cooldown,
                travel_speed: Fixed::ZERO,
                effect: SpellEffect::Ward,
            },
            SpellData {
                id: SpellId::Fireball,
                element: Some(Element::Fire),
                targeting: Targeting::AoeCircle,
                is_projectile: true,
                mana_cost: s.fireball.mana_cost,
                cooldown: s.fireball.cooldown,
                travel_speed: s.fireball.travel_speed,
                effect: SpellEffect::Fireball {
                    radius: s.fireball.radius,
                    hp_damage_per_node: s.fireball.hp_damage_per_node,
                },
            },
            SpellData {
                id: SpellId::EarthBarrage,
                element: Some(Element::Earth),
                targeting: Targeting::SingleNode,
                is_projectile: true,
                mana_cost: s.earth_barrage.mana_cost,
                cooldown: s.earth_barrage.cooldown,
                travel_speed: s.earth_barrage.travel_speed,
                effect: SpellEffect::Barrage {
                    rock_count: s.earth_barrage.rock_count,
                    hit_chance: s.earth_barrage.hit_chance,
                    hp_damage_per_rock: s.earth_barrage.hp_damage_per_rock,
                    stagger_delay: s.earth_barrage.stagger_delay,
                },
            },
            SpellData {
                id: SpellId::AirChoke,
                element: Some(Element::Air),
                targeting: Targeting::Immediate,
                is_projectile: false,
                mana_cost: s.air_choke.mana_cost,
                cooldown: s.air_choke.cooldown,
                travel_speed: Fixed::ZERO,
                effect: SpellEffect::Choke {
                    affected_nodes: [NodeId::Crown, NodeId::ThirdEye, NodeId::Throat],
                    stability_drain: s.air_choke.stability_drain,
                    drain_duration: s.air_choke.stability_drain_duration,
                },
            },
            SpellData {
                id: SpellId::WaterBeam,
                element: Some(Element::Water),
                targeting: Targeting::SingleNode,
                is_projectile: false,
                mana_cost: s.water_beam.mana_cost,
                cooldown: s.water_beam.cooldown,
                travel_speed: Fixed::ZERO,
                effect: SpellEffect::Flood {
                    flood_count: s.water_beam.flood_count,
                    stability_drain: s.water_beam.stability_drain,
                    drain_duration: s.water_beam.stability_drain_duration,
                },
            },
        ];

        Self {
            spells: entries.into_iter().map(|data| (data.id, data)).collect(),
        }
    }

    /// Look up a spell.
    #[must_use]
    pub fn get(&self, id: SpellId) -> Option<&SpellData> {
        self.spells.get(&id)
    }

    /// Every spell in id order.
    pub fn iter(&self) -> impl Iterator<Item = &SpellData> {
        self.spells.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_has_every_spell() {
        let registry = SpellRegistry::from_balance(&BalanceConfig::default());
        for id in SpellId::ALL {
            let data = registry.get(id).unwrap();
            assert_eq!(data.id, id);
            assert_eq!(data.element, id.element());
        }
    }

    #[test]
    fn test_projectile_flags() {
        let registry = SpellRegistry::from_balance(&BalanceConfig::default());
        let projectiles: Vec<SpellId> = registry
            .iter()
            .filter(|s| s.is_projectile)
            .map(|s| s.id)
            .collect();
        assert_eq!(
            projectiles,
            vec![SpellId::GreyBolt, SpellId::Fireball, SpellId::EarthBarrage]
        );
    }

    #[test]
    fn test_air_choke_is_immediate() {
        let registry = SpellRegistry::from_balance(&BalanceConfig::default());
        let choke = registry.get(SpellId::AirChoke).unwrap();
        assert_eq!(choke.targeting, Targeting::Immediate);
        assert!(matches!(
            choke.effect,
            SpellEffect::Choke {
                affected_nodes: [NodeId::Crown, NodeId::ThirdEye, NodeId::Throat],
                ..
            }
        ));
    }
}
