//! Data-driven combat content: gems, spells, loadouts and enemies.
//!
//! Everything here is plain data plus the random generators that build it.
//! Numbers come from [`BalanceConfig`](crate::balance::BalanceConfig).

pub mod enemy;
pub mod gem;
pub mod loadout;
pub mod spell;

pub use enemy::{generate_boss, generate_enemy, make_elite, EnemyProfile};
pub use gem::{
    create_grey_bolt, create_shield_gem, generate_penalty_gem, generate_random_gem, Gem,
    GemArena, GemId, PassiveStat,
};
pub use loadout::Loadout;
pub use spell::{SpellData, SpellEffect, SpellId, SpellRegistry, Targeting};
