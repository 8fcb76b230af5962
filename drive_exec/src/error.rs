//! # Drive Errors
//!
//! A single error type is shared by every layer of the actuator stack so that a failure at the bus
//! can propagate unchanged up to a vehicle-level command.

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur while commanding the actuators.
#[derive(thiserror::Error, Debug)]
pub enum DriveError {
    /// A numeric value was outside of its allowed domain. The state of the actuator is unchanged.
    #[error("{name} must be between {min} and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Cannot interpret {0:?} as a direction, expected forward/f/fwd or backward/b/back")]
    InvalidDirection(String),

    #[error("Board slot {index} was given pin {found}, pins must be supplied in order")]
    InvalidPin { index: usize, found: usize },

    #[error("There is no pin {0} on this board")]
    NoSuchPin(usize),

    #[error("Pin {0} is already bound to an actuator")]
    PinInUse(usize),

    #[error("A vehicle needs at least one {0}")]
    EmptyGroup(&'static str),

    /// An optional capability (pan, tilt, camera) was not configured.
    #[error("{0} is not supported by this vehicle")]
    Unsupported(String),

    #[error("Hardware backend unavailable: {0}")]
    HardwareUnavailable(String),

    #[error("An I2C error occured: {0}")]
    I2c(String),

    #[error("A GPIO error occured: {0}")]
    Gpio(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DriveError {
    /// Check that `value` lies in `[min, max]`, returning [`DriveError::OutOfRange`] if not.
    ///
    /// NaN is always rejected.
    pub(crate) fn check_range(
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    ) -> Result<(), DriveError> {
        if value >= min && value <= max {
            Ok(())
        } else {
            Err(DriveError::OutOfRange {
                name,
                value,
                min,
                max,
            })
        }
    }

    /// Returns true if this error is a rejected value rather than a hardware fault.
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, DriveError::OutOfRange { .. })
    }
}
