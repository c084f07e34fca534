//! Error types for combat setup and data loading.
//!
//! The tick loop itself never fails: rejected requests return `false` and
//! unknown ids are no-ops. Errors only come from configuration, IO and
//! serialization.

use thiserror::Error;

/// Result type alias using [`CombatError`].
pub type Result<T> = std::result::Result<T, CombatError>;

/// Top-level error type for the combat core.
#[derive(Debug, Error)]
pub enum CombatError {
    /// Reading a data file failed.
    #[error("Failed to read '{path}': {source}")]
    Io {
        /// Path that could not be read.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Balance table failed validation.
    #[error("Invalid balance value '{field}': {reason}")]
    InvalidBalance {
        /// Dotted field path, e.g. `spells.earth_barrage.hit_chance`.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Enemy tier with no balance row.
    #[error("Invalid enemy tier: {0}")]
    InvalidTier(u8),

    /// Slot assignment references a gem that is not in the collection.
    #[error("Unknown gem ID: {0}")]
    UnknownGem(u32),

    /// Invalid game state.
    #[error("Invalid combat state: {0}")]
    InvalidState(String),
}
