//! # Drive Library
//!
//! Hardware abstraction for a small Raspberry Pi car: PWM pins on a PCA9685 board, TB6612 drive
//! motors, hobby servos, a pan/tilt camera mount and the [`Vehicle`] that groups them together.
//!
//! Every layer talks to the one below through a trait, and the bus and GPIO seams use
//! `embedded-hal`, so the whole stack runs unchanged on the simulated backend in [`sim`].

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Console commands for driving the car by hand.
pub mod cli;

pub mod error;

/// Drive motors and their drivers.
pub mod motor;

/// Parameters for the drive executable.
pub mod params;

/// PWM pins and boards.
pub mod pwm;

/// Camera mount and frame sources.
pub mod sensor;

/// Angle controlled servos.
pub mod servo;

pub mod sim;

/// The vehicle and its assembly.
pub mod vehicle;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use error::DriveError;
pub use motor::{Direction, DriveMotor};
pub use params::DriveExecParams;
pub use pwm::{Pin, PinDriver, PwmBoard};
pub use sensor::{Camera, SensorMount};
pub use servo::Servo;
pub use vehicle::Vehicle;
