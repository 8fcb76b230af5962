//! # Car Equipment Interface
//!
//! Demands and data exchanged between a remote driver and the car.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Motion demand for the whole car.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct MoveDems {
    /// Signed drive speed, in the drive motors' speed units
    pub velocity: f64,

    /// Steering angle in degrees
    pub angle: f64,
}

/// Demand to move the camera mount.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct CamMoveDems {
    pub direction: CamDirection,

    /// Angle to move by in degrees
    pub amount: f64,
}

/// A raw camera frame.
///
/// The pixel data is packed row major, and `dtype` is a numpy style type string describing one
/// element (`"|u1"` for 8 bit unsigned).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CamFrame {
    pub data: Vec<u8>,

    /// Dimensions of the frame, e.g. `[height, width, channels]`
    pub shape: Vec<usize>,

    pub dtype: String,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Directions the camera mount can move in.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CamDirection {
    Up,
    Down,
    Left,
    Right,
}

/// Error returned when parsing a [`CamDirection`].
#[derive(thiserror::Error, Debug, PartialEq)]
#[error("Unknown camera direction {0:?}, expected up, down, left or right")]
pub struct ParseCamDirectionError(pub String);

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FromStr for CamDirection {
    type Err = ParseCamDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "up" | "u" => Ok(CamDirection::Up),
            "down" | "d" => Ok(CamDirection::Down),
            "left" | "l" => Ok(CamDirection::Left),
            "right" | "r" => Ok(CamDirection::Right),
            _ => Err(ParseCamDirectionError(s.to_string())),
        }
    }
}

impl fmt::Display for CamDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CamDirection::Up => "up",
            CamDirection::Down => "down",
            CamDirection::Left => "left",
            CamDirection::Right => "right",
        };
        write!(f, "{}", s)
    }
}

impl CamFrame {
    /// Number of elements the shape describes.
    pub fn num_elements(&self) -> usize {
        self.shape.iter().product()
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
