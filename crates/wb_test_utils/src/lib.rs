//! # Wizard Beams Test Utilities
//!
//! Support code shared by the `wb_core` unit, scenario and property tests and
//! the benchmarks:
//! - [`fixtures`]: open loadouts, spell gems, seeded duels, scripted rolls
//! - [`determinism`]: replay and divergence checks over `dt` sequences
//! - [`balance`]: play fights out and tally win rates
//! - [`strategies`]: proptest generators for schools, nodes, `dt` and amounts

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod balance;
pub mod determinism;
pub mod fixtures;
pub mod strategies;

/// Re-export proptest for convenience.
pub use proptest;
