//! # Sensor Module
//!
//! Sensors such as cameras may sit on a pan/tilt mount made of two servos. The mount turns
//! directional commands into angle adjustments, and silently ignores adjustments which would take
//! either servo past its limits.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::car::{CamDirection, CamFrame};
use log::{debug, warn};

use crate::{error::DriveError, servo::Servo};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Default angle step for a directional command.
pub const DEFAULT_STEP: f64 = 10.0;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Something that can capture a frame.
pub trait FrameSource {
    fn read_frame(&mut self) -> Result<CamFrame, DriveError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A pan/tilt mount. Either axis may be absent.
#[derive(Default)]
pub struct SensorMount {
    pub pan: Option<Servo>,
    pub tilt: Option<Servo>,
}

/// A camera on a pan/tilt mount.
#[derive(Default)]
pub struct Camera {
    pub mount: SensorMount,

    source: Option<Box<dyn FrameSource>>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SensorMount {
    pub fn new(pan: Option<Servo>, tilt: Option<Servo>) -> Self {
        Self { pan, tilt }
    }

    /// Tilt up by `amount`.
    pub fn up(&mut self, amount: f64) -> Result<(), DriveError> {
        nudge(self.tilt.as_mut(), "tilt", amount)
    }

    /// Tilt down by `amount`.
    pub fn down(&mut self, amount: f64) -> Result<(), DriveError> {
        nudge(self.tilt.as_mut(), "tilt", -amount)
    }

    /// Pan left by `amount`.
    pub fn left(&mut self, amount: f64) -> Result<(), DriveError> {
        nudge(self.pan.as_mut(), "pan", -amount)
    }

    /// Pan right by `amount`.
    pub fn right(&mut self, amount: f64) -> Result<(), DriveError> {
        nudge(self.pan.as_mut(), "pan", amount)
    }

    /// Move in the given direction by `amount`.
    pub fn move_in(&mut self, direction: CamDirection, amount: f64) -> Result<(), DriveError> {
        match direction {
            CamDirection::Up => self.up(amount),
            CamDirection::Down => self.down(amount),
            CamDirection::Left => self.left(amount),
            CamDirection::Right => self.right(amount),
        }
    }
}

impl Camera {
    pub fn new(mount: SensorMount, source: Option<Box<dyn FrameSource>>) -> Self {
        Self { mount, source }
    }

    /// Capture a frame from the camera.
    pub fn read(&mut self) -> Result<CamFrame, DriveError> {
        match self.source.as_mut() {
            Some(s) => s.read_frame(),
            None => Err(DriveError::Unsupported("camera capture".into())),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Adjust a servo's angle by `delta`, ignoring the adjustment if it's out of range.
fn nudge(servo: Option<&mut Servo>, axis: &str, delta: f64) -> Result<(), DriveError> {
    let servo = match servo {
        Some(s) => s,
        None => {
            return Err(DriveError::Unsupported(format!(
                "{} angle assignment",
                axis
            )))
        }
    };

    match servo.set_angle(servo.angle() + delta) {
        Ok(()) => {
            debug!("{} moved to {}", axis, servo.angle());
            Ok(())
        }
        Err(e) if e.is_out_of_range() => {
            warn!("Ignoring {} adjustment: {}", axis, e);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
