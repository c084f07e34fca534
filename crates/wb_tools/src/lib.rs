//! # Wizard Beams Development Tools
//!
//! Command-line tools for development:
//! - Balance table validation
//! - Dumping the built-in balance table as RON

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod validate;
