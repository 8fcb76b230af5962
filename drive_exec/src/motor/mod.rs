//! # Drive Motor Module
//!
//! A [`DriveMotor`] validates speed, direction and velocity demands and forwards them to a
//! [`MotorDriver`], which performs the hardware writes. All validation lives here so that drivers
//! only ever see values already known to be in range.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// [`MotorDriver`] implementation for a TB6612 H-bridge channel.
pub mod tb6612;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{fmt, str::FromStr};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::DriveError;

pub use tb6612::Tb6612;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Hardware side of a drive motor.
pub trait MotorDriver {
    /// The value corresponding to the maximum speed of the motor.
    fn max_speed(&self) -> f64;

    /// Set the speed of the motor. `speed` is already validated to lie in `[0, max_speed]`.
    fn write_speed(&mut self, speed: f64) -> Result<(), DriveError>;

    /// Set the direction the motor turns in.
    fn write_direction(&mut self, direction: Direction) -> Result<(), DriveError>;
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Direction of travel of a motor.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A drive motor with validated speed, direction and velocity.
pub struct DriveMotor {
    driver: Box<dyn MotorDriver>,

    max_speed: f64,

    speed: f64,

    direction: Direction,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Direction {
    /// +1 for forward, -1 for backward.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Forward => 1.0,
            Direction::Backward => -1.0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => write!(f, "forward"),
            Direction::Backward => write!(f, "backward"),
        }
    }
}

impl FromStr for Direction {
    type Err = DriveError;

    /// Parse a direction, ignoring case and surrounding whitespace.
    ///
    /// Accepts `f`, `fwd`, `forward`, `forwards`, `b`, `back`, `backward` and `backwards`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "f" | "fwd" | "forward" | "forwards" => Ok(Direction::Forward),
            "b" | "back" | "backward" | "backwards" => Ok(Direction::Backward),
            _ => Err(DriveError::InvalidDirection(s.to_string())),
        }
    }
}

impl DriveMotor {
    /// Create a new drive motor. The motor is stopped and set to drive forward.
    pub fn new<D: MotorDriver + 'static>(driver: D) -> Result<Self, DriveError> {
        let max_speed = driver.max_speed();

        let mut motor = Self {
            driver: Box::new(driver),
            max_speed,
            speed: 0.0,
            direction: Direction::Forward,
        };

        motor.set_velocity(0.0)?;

        Ok(motor)
    }

    pub fn max_speed(&self) -> f64 {
        self.max_speed
    }

    /// Speed of the motor, between 0 and `max_speed`.
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Set the speed of the motor without changing its direction.
    pub fn set_speed(&mut self, speed: f64) -> Result<(), DriveError> {
        DriveError::check_range("speed", speed, 0.0, self.max_speed)?;

        self.driver.write_speed(speed)?;
        self.speed = speed;

        debug!("Motor speed set to {}", speed);

        Ok(())
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Direction) -> Result<(), DriveError> {
        self.driver.write_direction(direction)?;
        self.direction = direction;

        debug!("Motor direction set to {}", direction);

        Ok(())
    }

    /// Signed speed of the motor, between `-max_speed` and `max_speed`.
    pub fn velocity(&self) -> f64 {
        self.direction.sign() * self.speed
    }

    /// Set the speed and direction of the motor from a signed value.
    ///
    /// The direction is written before the speed.
    pub fn set_velocity(&mut self, velocity: f64) -> Result<(), DriveError> {
        DriveError::check_range("velocity", velocity, -self.max_speed, self.max_speed)?;

        if velocity < 0.0 {
            self.set_direction(Direction::Backward)?;
        } else {
            self.set_direction(Direction::Forward)?;
        }

        self.set_speed(velocity.abs())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
