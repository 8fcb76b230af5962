//! # Communications interface crate.
//!
//! Provides the interface structures shared between the car and anything that drives it
//! remotely. No transport is provided here, only the data exchanged.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Command and response definitions for equipment (like the car)
pub mod eqpt;
