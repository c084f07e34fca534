//! # Wizard Beams Core
//!
//! Deterministic combat simulation for Wizard Beams.
//!
//! Two wizards push a shared collision point with their beams. Each side runs
//! a node network that supplies mana, spells and passives; beam schools and
//! elements form rock-paper-scissors cycles; stability, shields and
//! channeled spells modulate the struggle.
//!
//! This crate contains **only** simulation logic:
//! - No rendering (drawing goes through the [`render::Renderer`] trait)
//! - No input polling
//! - No system randomness (everything goes through [`rng::RandomSource`])
//! - No floating-point math in the simulation (uses fixed-point)
//!
//! ## Crate Structure
//!
//! - [`components`] - Sides, nodes, schools, elements and state enums
//! - [`network`] / [`pathfinding`] - Node graph and awareness token
//! - [`channeling`], [`beam_switch`], [`element`], [`shield`], [`stability`] - Per-side systems
//! - [`spell_caster`], [`spell_book`], [`projectile`] - Spells
//! - [`beam_struggle`] - Effective mana and the collision point
//! - [`ai`] - Combat AI
//! - [`simulation`] - Tick driver, event routing and snapshots
//! - [`data`] / [`balance`] - Gems, spells, loadouts, enemies and tunables

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ai;
pub mod balance;
pub mod beam_struggle;
pub mod beam_switch;
pub mod channeling;
pub mod components;
pub mod data;
pub mod element;
pub mod error;
pub mod events;
pub mod math;
pub mod network;
pub mod pathfinding;
pub mod projectile;
pub mod render;
pub mod rng;
pub mod shield;
pub mod side;
pub mod simulation;
pub mod spell_book;
pub mod spell_caster;
pub mod stability;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::ai::{AiCommand, AiProfile, CombatAi};
    pub use crate::balance::BalanceConfig;
    pub use crate::beam_struggle::CombatState;
    pub use crate::components::*;
    pub use crate::data::{
        EnemyProfile, Gem, GemArena, GemId, Loadout, PassiveStat, SpellData, SpellId,
        SpellRegistry,
    };
    pub use crate::error::{CombatError, Result};
    pub use crate::events::{CombatEvent, EventBus, SideFilter, TickEvents};
    pub use crate::math::{fx, Fixed, Vec2Fixed};
    pub use crate::network::NodeNetwork;
    pub use crate::render::{Color, Renderer};
    pub use crate::rng::{CombatRng, RandomSource};
    pub use crate::side::SideState;
    pub use crate::simulation::{CombatSimulation, CombatSnapshot, TICK_RATE};
    pub use crate::spell_book::{SpellBook, SpellBookState};
    pub use crate::spell_caster::SpellTarget;
}
