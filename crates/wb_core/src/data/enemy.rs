//! Enemy generation.
//!
//! Enemies are rolled from a tier row of the balance table: random
//! attunements, a subset of beam schools, the grey bolt, an optional shield
//! gem and random gems shuffled into random slots.

use serde::{Deserialize, Serialize};

use crate::balance::{BalanceConfig, TierBalance};
use crate::components::{BeamSchool, Element, NodeId};
use crate::data::gem::{create_grey_bolt, create_shield_gem, generate_random_gem, GemArena};
use crate::data::loadout::Loadout;
use crate::error::Result;
use crate::math::{fixed_serde, Fixed};
use crate::rng::{choose, shuffle, RandomSource};

/// A generated opponent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyProfile {
    /// Combat loadout.
    pub loadout: Loadout,
    /// Tier used for AI targeting weights (boss counts as the top tier).
    pub tier: u8,
    /// Seconds between AI beam decisions.
    #[serde(with = "fixed_serde")]
    pub reaction_time: Fixed,
    /// Schools the AI may switch to; the attuned school comes first.
    pub beam_types_unlocked: Vec<BeamSchool>,
    /// Whether a shield gem was included.
    pub has_shield: bool,
    /// Elite modifiers applied.
    pub is_elite: bool,
    /// Final boss.
    pub is_boss: bool,
}

/// Roll an enemy for a tier (1-3).
pub fn generate_enemy(
    tier: u8,
    balance: &BalanceConfig,
    rng: &mut dyn RandomSource,
) -> Result<EnemyProfile> {
    let row = balance.tier(tier)?;
    Ok(from_row(row, tier, balance, rng))
}

/// Apply the elite row: more HP, faster awareness, one extra gem.
pub fn make_elite(
    mut profile: EnemyProfile,
    balance: &BalanceConfig,
    rng: &mut dyn RandomSource,
) -> EnemyProfile {
    let elite = &balance.enemy.elite;
    let loadout = &mut profile.loadout;
    loadout.hp += elite.hp_bonus;
    loadout.max_hp += elite.hp_bonus;
    loadout.awareness_speed = (loadout.awareness_speed + elite.awareness_speed_bonus)
        .max(balance.floors.awareness_speed);

    for _ in 0..elite.extra_gems {
        let gem = generate_random_gem(&mut loadout.gems, profile.tier, balance, rng);
        let mut free: Vec<NodeId> = NodeId::GEM_SLOTS
            .into_iter()
            .filter(|n| !loadout.gem_slots.contains_key(n))
            .collect();
        shuffle(rng, &mut free);
        if let Some(node) = free.first() {
            loadout.gem_slots.insert(*node, gem);
        }
    }

    profile.is_elite = true;
    profile
}

/// Roll the final boss from the boss row.
#[must_use]
pub fn generate_boss(balance: &BalanceConfig, rng: &mut dyn RandomSource) -> EnemyProfile {
    let top_tier = balance.enemy.tiers.keys().copied().max().unwrap_or(3);
    let mut profile = from_row(&balance.enemy.boss, top_tier, balance, rng);
    profile.is_boss = true;
    profile
}

fn from_row(
    row: &TierBalance,
    tier: u8,
    balance: &BalanceConfig,
    rng: &mut dyn RandomSource,
) -> EnemyProfile {
    let school = *choose(rng, &BeamSchool::ATTACK).unwrap_or(&BeamSchool::Pure);
    let element = *choose(rng, &Element::ALL).unwrap_or(&Element::Fire);

    let mut others: Vec<BeamSchool> = BeamSchool::ATTACK
        .into_iter()
        .filter(|s| *s != school)
        .collect();
    shuffle(rng, &mut others);
    let mut beam_types_unlocked = vec![school];
    beam_types_unlocked.extend(
        others
            .into_iter()
            .take(row.beam_types_unlocked.saturating_sub(1)),
    );

    let mut gems = GemArena::new();
    let mut order = vec![create_grey_bolt(&mut gems, balance)];
    if row.has_shield {
        order.push(create_shield_gem(&mut gems, balance));
    }
    let additional = row.gem_count.saturating_sub(order.len());
    for _ in 0..additional {
        order.push(generate_random_gem(&mut gems, tier, balance, rng));
    }

    let mut slots = NodeId::GEM_SLOTS.to_vec();
    shuffle(rng, &mut slots);
    let gem_slots = slots.into_iter().zip(order).collect();

    EnemyProfile {
        loadout: Loadout {
            school_attunement: school,
            element_attunement: element,
            hp: row.hp,
            max_hp: row.hp,
            gems,
            gem_slots,
            awareness_speed: row.awareness_speed,
            activation_time_multiplier: row.activation_time_multiplier,
            all_nodes_open: row.all_nodes_open,
        },
        tier,
        reaction_time: row.reaction_time,
        beam_types_unlocked,
        has_shield: row.has_shield,
        is_elite: false,
        is_boss: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::spell::SpellId;
    use crate::error::CombatError;
    use crate::rng::CombatRng;

    #[test]
    fn test_tier_rows_drive_generation() {
        let balance = BalanceConfig::default();
        let mut rng = CombatRng::from_seed(17);
        for tier in 1..=3 {
            let enemy = generate_enemy(tier, &balance, &mut rng).unwrap();
            let row = balance.tier(tier).unwrap();
            assert_eq!(enemy.loadout.hp, row.hp);
            assert_eq!(enemy.beam_types_unlocked.len(), row.beam_types_unlocked);
            assert_eq!(enemy.beam_types_unlocked[0], enemy.loadout.school_attunement);
            assert_eq!(enemy.loadout.gems.len(), row.gem_count);
            assert_eq!(enemy.loadout.gem_slots.len(), row.gem_count);
            assert!(enemy.loadout.find_spell_gem(SpellId::GreyBolt).is_some());
            assert_eq!(
                enemy.loadout.find_spell_gem(SpellId::Shield).is_some(),
                row.has_shield
            );
            enemy.loadout.validate().unwrap();
        }
    }

    #[test]
    fn test_invalid_tier() {
        let balance = BalanceConfig::default();
        let mut rng = CombatRng::from_seed(1);
        assert!(matches!(
            generate_enemy(9, &balance, &mut rng),
            Err(CombatError::InvalidTier(9))
        ));
    }

    #[test]
    fn test_elite_adds_hp_and_gem() {
        let balance = BalanceConfig::default();
        let mut rng = CombatRng::from_seed(23);
        let base = generate_enemy(2, &balance, &mut rng).unwrap();
        let gems_before = base.loadout.gems.len();
        let elite = make_elite(base, &balance, &mut rng);
        assert!(elite.is_elite);
        assert_eq!(elite.loadout.hp, 35);
        assert_eq!(elite.loadout.gems.len(), gems_before + 1);
        assert_eq!(elite.loadout.awareness_speed, crate::math::fx(1088.0));
        elite.loadout.validate().unwrap();
    }

    #[test]
    fn test_boss_opens_everything() {
        let balance = BalanceConfig::default();
        let mut rng = CombatRng::from_seed(4);
        let boss = generate_boss(&balance, &mut rng);
        assert!(boss.is_boss);
        assert!(boss.loadout.all_nodes_open);
        assert_eq!(boss.loadout.hp, 40);
        assert_eq!(boss.loadout.gems.len(), 6);
    }
}
