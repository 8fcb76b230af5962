//! [`MotorDriver`] implementation for the TB6612 motor controller
//!
//! Each TB6612 channel is driven by a digital direction line and a PWM speed input. The direction
//! line polarity can be flipped with `forward_high` for motors that are wired in reverse.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt::Debug;

use embedded_hal::digital::v2::OutputPin;

use super::{Direction, MotorDriver};
use crate::{
    error::DriveError,
    pwm::{Pin, PinDriver},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A motor on one channel of a TB6612 board.
pub struct Tb6612<P, D: PinDriver> {
    direction_pin: P,

    speed_pin: Pin<D>,

    forward_high: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<P, D> Tb6612<P, D>
where
    P: OutputPin,
    P::Error: Debug,
    D: PinDriver,
{
    /// Create a new motor.
    ///
    /// The maximum speed of the motor is the software resolution of `speed_pin`. If the motor
    /// drives the wrong way, flip `forward_high`.
    pub fn new(direction_pin: P, speed_pin: Pin<D>, forward_high: bool) -> Self {
        Self {
            direction_pin,
            speed_pin,
            forward_high,
        }
    }

    pub fn speed_pin(&self) -> &Pin<D> {
        &self.speed_pin
    }
}

impl<P, D> MotorDriver for Tb6612<P, D>
where
    P: OutputPin,
    P::Error: Debug,
    D: PinDriver,
{
    fn max_speed(&self) -> f64 {
        self.speed_pin.software_resolution() as f64
    }

    fn write_speed(&mut self, speed: f64) -> Result<(), DriveError> {
        self.speed_pin.set_duty_cycle(speed)
    }

    fn write_direction(&mut self, direction: Direction) -> Result<(), DriveError> {
        let high = self.forward_high != (direction == Direction::Forward);

        let result = if high {
            self.direction_pin.set_high()
        } else {
            self.direction_pin.set_low()
        };

        result.map_err(|e| DriveError::Gpio(format!("{:?}", e)))
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        motor::DriveMotor,
        pwm::pca9685::{Pca9685, Pca9685Config},
        sim::{SimBus, SimOutputPin},
    };

    fn tb6612(forward_high: bool) -> (DriveMotor, SimOutputPin, SimBus) {
        let bus = SimBus::new();
        let mut board = Pca9685::new(bus.clone(), &Pca9685Config::default()).unwrap();
        let gpio = SimOutputPin::new(17);

        let motor = DriveMotor::new(Tb6612::new(
            gpio.clone(),
            board.take_pin(5).unwrap(),
            forward_high,
        ))
        .unwrap();

        (motor, gpio, bus)
    }

    #[test]
    fn test_write_speed_sets_pin() {
        let bus = SimBus::new();
        let mut board = Pca9685::new(bus, &Pca9685Config::default()).unwrap();
        let mut driver = Tb6612::new(SimOutputPin::new(17), board.take_pin(5).unwrap(), true);

        assert_eq!(driver.speed_pin().pin_number(), 5);
        assert_eq!(driver.speed_pin().hw_duty_cycle(), 0);

        driver.write_speed(1.0).unwrap();
        assert_eq!(driver.speed_pin().hw_duty_cycle(), 1024);
        assert_eq!(driver.speed_pin().duty_cycle(), 1.0);

        assert!(driver.write_speed(5.0).unwrap_err().is_out_of_range());
        assert_eq!(driver.speed_pin().hw_duty_cycle(), 1024);
    }

    #[test]
    fn test_max_speed_is_software_resolution() {
        let (motor, _, _) = tb6612(true);
        assert_eq!(motor.max_speed(), 4.0);
    }

    #[test]
    fn test_direction_polarity() {
        // The line level is forward_high XOR forward
        let (mut motor, gpio, _) = tb6612(true);
        assert!(!gpio.is_high());
        motor.set_velocity(-1.0).unwrap();
        assert!(gpio.is_high());

        let (mut motor, gpio, _) = tb6612(false);
        assert!(gpio.is_high());
        motor.set_velocity(-1.0).unwrap();
        assert!(!gpio.is_high());
    }

    #[test]
    fn test_speed_drives_pwm() {
        let (mut motor, _, bus) = tb6612(true);

        motor.set_velocity(-3.0).unwrap();

        // Pin 5 starts at 1280, 3/4 of the cycle is 3072 steps
        let on = 0x06 + 4 * 5;
        assert_eq!(bus.register_pair(on), 1280);
        assert_eq!(bus.register_pair(on + 2), (1280 + 3072) % 4096);
    }
}
