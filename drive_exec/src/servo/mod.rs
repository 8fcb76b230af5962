//! # Servo Module
//!
//! This module provides a unified servo interface which can abstract over different ways of
//! driving a positional servo. A [`Servo`] holds the mechanical angle range, the user limits and
//! the current angle, and validates every demand before handing it to an [`AngleDriver`].

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// [`AngleDriver`] implementation for servos driven directly from a PWM pin.
pub mod pwm_servo;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::DriveError;

pub use pwm_servo::{PulseRange, PwmServo};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Hardware side of a servo.
pub trait AngleDriver {
    /// Move the servo to `angle`, which is already validated against the servo's limits.
    fn write_angle(&mut self, angle: f64) -> Result<(), DriveError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Angle range, limits and initial position of a servo.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServoConfig {
    /// Initial angle
    pub angle: f64,

    pub min_angle: f64,
    pub max_angle: f64,

    /// Lower limit, defaults to `min_angle`
    pub min_limit: Option<f64>,

    /// Upper limit, defaults to `max_angle`
    pub max_limit: Option<f64>,
}

/// A positional servo.
///
/// Invariant: `min_angle <= min_limit <= angle <= max_limit <= max_angle`.
pub struct Servo {
    driver: Box<dyn AngleDriver>,

    min_angle: f64,
    max_angle: f64,

    min_limit: f64,
    max_limit: f64,

    angle: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            angle: 0.0,
            min_angle: -90.0,
            max_angle: 90.0,
            min_limit: None,
            max_limit: None,
        }
    }
}

impl Servo {
    /// Create a new servo and move it to its initial angle.
    pub fn new<D: AngleDriver + 'static>(
        driver: D,
        config: &ServoConfig,
    ) -> Result<Self, DriveError> {
        if !(config.min_angle < config.max_angle) {
            return Err(DriveError::OutOfRange {
                name: "min_angle",
                value: config.min_angle,
                min: f64::NEG_INFINITY,
                max: config.max_angle,
            });
        }

        let mut servo = Self {
            driver: Box::new(driver),
            min_angle: config.min_angle,
            max_angle: config.max_angle,
            min_limit: config.min_angle,
            max_limit: config.max_angle,
            angle: config.min_angle,
        };

        // Limits are checked against the full range only, the angle isn't set yet
        if let Some(l) = config.min_limit {
            DriveError::check_range("min_limit", l, servo.min_angle, servo.max_angle)?;
            servo.min_limit = l;
        }
        if let Some(l) = config.max_limit {
            DriveError::check_range("max_limit", l, servo.min_limit, servo.max_angle)?;
            servo.max_limit = l;
        }

        servo.set_angle(config.angle)?;

        Ok(servo)
    }

    pub fn min_angle(&self) -> f64 {
        self.min_angle
    }

    pub fn max_angle(&self) -> f64 {
        self.max_angle
    }

    pub fn min_limit(&self) -> f64 {
        self.min_limit
    }

    /// Set the lower limit of the servo, or reset it to `min_angle` with `None`.
    ///
    /// The limit must lie within `[min_angle, max_limit]` and must not exclude the current
    /// angle.
    pub fn set_min_limit(&mut self, limit: Option<f64>) -> Result<(), DriveError> {
        let limit = limit.unwrap_or(self.min_angle);

        DriveError::check_range("min_limit", limit, self.min_angle, self.max_angle)?;
        DriveError::check_range(
            "min_limit",
            limit,
            self.min_angle,
            self.max_limit.min(self.angle),
        )?;

        self.min_limit = limit;

        Ok(())
    }

    pub fn max_limit(&self) -> f64 {
        self.max_limit
    }

    /// Set the upper limit of the servo, or reset it to `max_angle` with `None`.
    ///
    /// The limit must lie within `[min_limit, max_angle]` and must not exclude the current
    /// angle.
    pub fn set_max_limit(&mut self, limit: Option<f64>) -> Result<(), DriveError> {
        let limit = limit.unwrap_or(self.max_angle);

        DriveError::check_range("max_limit", limit, self.min_angle, self.max_angle)?;
        DriveError::check_range(
            "max_limit",
            limit,
            self.min_limit.max(self.angle),
            self.max_angle,
        )?;

        self.max_limit = limit;

        Ok(())
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// Move the servo to `angle`, which must lie within the servo's limits.
    pub fn set_angle(&mut self, angle: f64) -> Result<(), DriveError> {
        DriveError::check_range("angle", angle, self.min_limit, self.max_limit)?;

        self.driver.write_angle(angle)?;
        self.angle = angle;

        debug!("Servo angle set to {}", angle);

        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::{cell::RefCell, rc::Rc};

    struct MockServo {
        writes: Rc<RefCell<Vec<f64>>>,
    }

    impl AngleDriver for MockServo {
        fn write_angle(&mut self, angle: f64) -> Result<(), DriveError> {
            self.writes.borrow_mut().push(angle);
            Ok(())
        }
    }

    fn servo(config: &ServoConfig) -> Result<(Servo, Rc<RefCell<Vec<f64>>>), DriveError> {
        let writes = Rc::new(RefCell::new(Vec::new()));
        let servo = Servo::new(
            MockServo {
                writes: writes.clone(),
            },
            config,
        )?;
        Ok((servo, writes))
    }

    fn assert_limits_contained(servo: &Servo) {
        assert!(servo.min_angle() <= servo.min_limit());
        assert!(servo.min_limit() <= servo.angle());
        assert!(servo.angle() <= servo.max_limit());
        assert!(servo.max_limit() <= servo.max_angle());
    }

    #[test]
    fn test_new_servo() {
        let (servo, writes) = servo(&ServoConfig::default()).unwrap();

        assert_eq!(servo.angle(), 0.0);
        assert_eq!(servo.min_limit(), -90.0);
        assert_eq!(servo.max_limit(), 90.0);
        assert_eq!(*writes.borrow(), vec![0.0]);
    }

    #[test]
    fn test_invalid_angle_range() {
        let config = ServoConfig {
            min_angle: 10.0,
            max_angle: 10.0,
            angle: 10.0,
            ..Default::default()
        };
        assert!(servo(&config).err().unwrap().is_out_of_range());

        let config = ServoConfig {
            min_angle: 20.0,
            max_angle: 10.0,
            angle: 15.0,
            ..Default::default()
        };
        assert!(servo(&config).err().unwrap().is_out_of_range());
    }

    #[test]
    fn test_initial_angle_outside_limits() {
        let config = ServoConfig {
            angle: -20.0,
            min_limit: Some(-10.0),
            ..Default::default()
        };
        assert!(servo(&config).err().unwrap().is_out_of_range());
    }

    #[test]
    fn test_set_angle_within_limits() {
        let config = ServoConfig {
            min_limit: Some(-60.0),
            max_limit: Some(60.0),
            ..Default::default()
        };
        let (mut servo, writes) = servo(&config).unwrap();

        servo.set_angle(60.0).unwrap();
        servo.set_angle(-60.0).unwrap();
        assert_eq!(servo.angle(), -60.0);

        assert!(servo.set_angle(61.0).unwrap_err().is_out_of_range());
        assert!(servo.set_angle(-90.0).unwrap_err().is_out_of_range());
        assert!(servo.set_angle(f64::NAN).unwrap_err().is_out_of_range());

        assert_eq!(servo.angle(), -60.0);
        assert_eq!(*writes.borrow(), vec![0.0, 60.0, -60.0]);
    }

    #[test]
    fn test_limit_assignment() {
        let (mut servo, writes) = servo(&ServoConfig::default()).unwrap();

        servo.set_min_limit(Some(-45.0)).unwrap();
        servo.set_max_limit(Some(30.0)).unwrap();
        assert_eq!(servo.min_limit(), -45.0);
        assert_eq!(servo.max_limit(), 30.0);
        assert_limits_contained(&servo);

        // Outside the full range, prior limits unchanged
        assert!(servo.set_min_limit(Some(-91.0)).unwrap_err().is_out_of_range());
        assert!(servo.set_max_limit(Some(90.5)).unwrap_err().is_out_of_range());
        assert_eq!(servo.min_limit(), -45.0);
        assert_eq!(servo.max_limit(), 30.0);

        // Crossing limits
        assert!(servo.set_min_limit(Some(40.0)).is_err());
        assert!(servo.set_max_limit(Some(-50.0)).is_err());
        assert_limits_contained(&servo);

        // Reset
        servo.set_min_limit(None).unwrap();
        servo.set_max_limit(None).unwrap();
        assert_eq!(servo.min_limit(), -90.0);
        assert_eq!(servo.max_limit(), 90.0);

        // Changing limits never moves the servo
        assert_eq!(*writes.borrow(), vec![0.0]);
    }

    #[test]
    fn test_limit_cannot_exclude_angle() {
        let (mut servo, _) = servo(&ServoConfig::default()).unwrap();
        servo.set_angle(20.0).unwrap();

        assert!(servo.set_max_limit(Some(10.0)).is_err());
        assert!(servo.set_min_limit(Some(25.0)).is_err());
        servo.set_min_limit(Some(20.0)).unwrap();
        assert_limits_contained(&servo);
    }
}
