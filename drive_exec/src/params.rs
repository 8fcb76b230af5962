//! # Drive Executable Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    pwm::pca9685::Pca9685Config,
    servo::{PulseRange, ServoConfig},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Wiring of the car.
///
/// The defaults describe the SunFounder PiCar-V.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DriveExecParams {
    /// Number of the I2C bus the PWM board is on
    pub i2c_bus: u8,

    /// PWM board options
    pub board: Pca9685Config,

    pub drive_motors: Vec<MotorParams>,

    /// Steering servos
    pub turning_motors: Vec<PwmServoParams>,

    /// Camera pan/tilt mount, `None` if the car has no camera
    pub camera: Option<CameraParams>,
}

/// A TB6612 drive motor.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MotorParams {
    /// Board pin connected to the speed input
    pub pwm_pin: usize,

    /// GPIO (BCM numbering) connected to the direction input
    pub direction_gpio: u8,

    /// Flip this if the motor turns the wrong way
    #[serde(default = "default_forward_high")]
    pub forward_high: bool,

    /// Software resolution of the speed pin, which is also the motor's maximum speed
    #[serde(default)]
    pub duty_cycle_res: Option<u16>,
}

/// A servo driven from a board pin.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PwmServoParams {
    pub pwm_pin: usize,

    #[serde(default)]
    pub duty_cycle_res: Option<u16>,

    #[serde(flatten)]
    pub pulse: PulseRange,

    #[serde(flatten)]
    pub servo: ServoConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct CameraParams {
    pub pan: Option<PwmServoParams>,
    pub tilt: Option<PwmServoParams>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum ParamsError {
    #[error("At least one drive motor is required")]
    NoDriveMotors,

    #[error("At least one turning motor is required")]
    NoTurningMotors,

    #[error("Pin {0} is not on the board ({1} pins)")]
    PinNotOnBoard(usize, usize),

    #[error("Pin {0} is assigned to more than one actuator")]
    NonUniquePin(usize),

    #[error("GPIO {0} is assigned to more than one motor")]
    NonUniqueGpio(u8),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for DriveExecParams {
    fn default() -> Self {
        Self {
            i2c_bus: 1,
            board: Pca9685Config::default(),
            drive_motors: vec![
                MotorParams {
                    pwm_pin: 5,
                    direction_gpio: 17,
                    forward_high: true,
                    duty_cycle_res: Some(4),
                },
                MotorParams {
                    pwm_pin: 4,
                    direction_gpio: 27,
                    forward_high: true,
                    duty_cycle_res: Some(4),
                },
            ],
            turning_motors: vec![PwmServoParams {
                pwm_pin: 0,
                duty_cycle_res: None,
                pulse: PulseRange::default(),
                servo: ServoConfig {
                    min_limit: Some(-60.0),
                    max_limit: Some(60.0),
                    ..Default::default()
                },
            }],
            camera: Some(CameraParams {
                pan: Some(PwmServoParams {
                    pwm_pin: 1,
                    duty_cycle_res: None,
                    pulse: PulseRange {
                        min_pulse_ms: 2.5,
                        max_pulse_ms: 0.5,
                    },
                    servo: ServoConfig::default(),
                }),
                tilt: Some(PwmServoParams {
                    pwm_pin: 2,
                    duty_cycle_res: None,
                    pulse: PulseRange::default(),
                    servo: ServoConfig {
                        angle: -8.0,
                        min_limit: Some(-10.0),
                        ..Default::default()
                    },
                }),
            }),
        }
    }
}

impl DriveExecParams {
    /// Determines if the parameters are valid.
    pub fn are_valid(&self) -> Result<(), ParamsError> {
        if self.drive_motors.is_empty() {
            return Err(ParamsError::NoDriveMotors);
        }
        if self.turning_motors.is_empty() {
            return Err(ParamsError::NoTurningMotors);
        }

        let mut pins = Vec::new();
        pins.extend(self.drive_motors.iter().map(|m| m.pwm_pin));
        pins.extend(self.turning_motors.iter().map(|s| s.pwm_pin));
        if let Some(ref c) = self.camera {
            pins.extend(c.pan.iter().chain(c.tilt.iter()).map(|s| s.pwm_pin));
        }

        for (i, &pin) in pins.iter().enumerate() {
            if pin >= self.board.num_pins {
                return Err(ParamsError::PinNotOnBoard(pin, self.board.num_pins));
            }
            if pins[..i].contains(&pin) {
                return Err(ParamsError::NonUniquePin(pin));
            }
        }

        for (i, m) in self.drive_motors.iter().enumerate() {
            if self.drive_motors[..i]
                .iter()
                .any(|o| o.direction_gpio == m.direction_gpio)
            {
                return Err(ParamsError::NonUniqueGpio(m.direction_gpio));
            }
        }

        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn default_forward_high() -> bool {
    true
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_params_valid() {
        assert_eq!(DriveExecParams::default().are_valid(), Ok(()));
    }

    #[test]
    fn test_shipped_params_match_defaults() {
        let params: DriveExecParams =
            toml::from_str(include_str!("../../params/drive_exec.toml")).unwrap();

        assert_eq!(params, DriveExecParams::default());
    }

    #[test]
    fn test_partial_params() {
        let params: DriveExecParams = toml::from_str(
            r#"
            [board]
            frequency_hz = 50.0

            [[drive_motors]]
            pwm_pin = 8
            direction_gpio = 22

            [[turning_motors]]
            pwm_pin = 9
            min_pulse_ms = 1.0
            max_pulse_ms = 2.0
            max_limit = 45.0
            "#,
        )
        .unwrap();

        assert_eq!(params.board.frequency_hz, 50.0);
        assert_eq!(params.board.duty_cycle_res, 4);
        assert!(params.drive_motors[0].forward_high);
        assert_eq!(params.drive_motors[0].duty_cycle_res, None);
        assert_eq!(params.turning_motors[0].pulse.min_pulse_ms, 1.0);
        assert_eq!(params.turning_motors[0].servo.min_angle, -90.0);
        assert_eq!(params.turning_motors[0].servo.max_limit, Some(45.0));
        assert_eq!(params.are_valid(), Ok(()));
    }

    #[test]
    fn test_invalid_params() {
        let mut params = DriveExecParams::default();
        params.turning_motors[0].pwm_pin = 5;
        assert_eq!(params.are_valid(), Err(ParamsError::NonUniquePin(5)));

        let mut params = DriveExecParams::default();
        params.drive_motors[1].pwm_pin = 16;
        assert_eq!(params.are_valid(), Err(ParamsError::PinNotOnBoard(16, 16)));

        let mut params = DriveExecParams::default();
        params.drive_motors[1].direction_gpio = 17;
        assert_eq!(params.are_valid(), Err(ParamsError::NonUniqueGpio(17)));

        let mut params = DriveExecParams::default();
        params.drive_motors.clear();
        assert_eq!(params.are_valid(), Err(ParamsError::NoDriveMotors));
    }
}
