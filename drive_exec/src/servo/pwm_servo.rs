//! [`AngleDriver`] implementation for a hobby servo on a PWM pin
//!
//! The servo's pulse width is a linear function of its angle. The pulse is converted into a duty
//! cycle using the frequency and software resolution of the pin.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::{AngleDriver, Servo, ServoConfig};
use crate::{
    error::DriveError,
    pwm::{Pin, PinDriver},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Pulse widths, in milliseconds, at the servo's minimum and maximum angles.
///
/// `min_pulse_ms` may be larger than `max_pulse_ms` to reverse the servo.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
#[serde(default)]
pub struct PulseRange {
    pub min_pulse_ms: f64,
    pub max_pulse_ms: f64,
}

/// A servo driven directly from a PWM pin.
pub struct PwmServo<D: PinDriver> {
    pin: Pin<D>,

    /// Pulse width gradient in ms per unit angle
    slope: f64,

    /// Pulse width at zero angle in ms
    intercept: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for PulseRange {
    fn default() -> Self {
        Self {
            min_pulse_ms: 0.5,
            max_pulse_ms: 2.5,
        }
    }
}

impl<D: PinDriver> PwmServo<D> {
    /// Create the driver for a servo whose angle range is `[min_angle, max_angle]`.
    pub fn new(pin: Pin<D>, pulse: PulseRange, min_angle: f64, max_angle: f64) -> Self {
        let slope = (pulse.max_pulse_ms - pulse.min_pulse_ms) / (max_angle - min_angle);
        let intercept = pulse.min_pulse_ms - slope * min_angle;

        Self {
            pin,
            slope,
            intercept,
        }
    }

    /// Pulse width in milliseconds for the given angle.
    pub fn angle_to_pulse(&self, angle: f64) -> f64 {
        self.slope * angle + self.intercept
    }

    /// Duty cycle, in the pin's software resolution, for the given angle.
    pub fn angle_to_duty_cycle(&self, angle: f64) -> f64 {
        self.pin.software_resolution() as f64 * self.pin.frequency() * self.angle_to_pulse(angle)
            / 1000.0
    }

    pub fn pin(&self) -> &Pin<D> {
        &self.pin
    }
}

impl<D: PinDriver> AngleDriver for PwmServo<D> {
    fn write_angle(&mut self, angle: f64) -> Result<(), DriveError> {
        let duty_cycle = self.angle_to_duty_cycle(angle);
        self.pin.set_duty_cycle(duty_cycle)
    }
}

impl Servo {
    /// Create a servo driven directly from `pin`.
    pub fn pwm<D: PinDriver + 'static>(
        pin: Pin<D>,
        pulse: PulseRange,
        config: &ServoConfig,
    ) -> Result<Self, DriveError> {
        Servo::new(
            PwmServo::new(pin, pulse, config.min_angle, config.max_angle),
            config,
        )
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        pwm::pca9685::{Pca9685, Pca9685Config},
        sim::SimBus,
    };

    fn board() -> (Pca9685<SimBus>, SimBus) {
        let bus = SimBus::new();
        let board = Pca9685::new(bus.clone(), &Pca9685Config::default()).unwrap();
        (board, bus)
    }

    #[test]
    fn test_pulse_mapping() {
        let (mut board, _) = board();
        let servo = PwmServo::new(board.take_pin(0).unwrap(), PulseRange::default(), -90.0, 90.0);

        assert!((servo.slope - 2.0 / 180.0).abs() < 1e-12);
        assert!((servo.intercept - 1.5).abs() < 1e-12);
        assert!((servo.angle_to_pulse(0.0) - 1.5).abs() < 1e-12);
        assert!((servo.angle_to_pulse(-90.0) - 0.5).abs() < 1e-12);
        assert!((servo.angle_to_pulse(90.0) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_write_angle_sets_pin() {
        let (mut board, _) = board();
        let mut pin = board.take_pin(2).unwrap();
        pin.set_software_resolution(4096).unwrap();
        let mut servo = PwmServo::new(pin, PulseRange::default(), -90.0, 90.0);

        assert_eq!(servo.pin().pin_number(), 2);

        servo.write_angle(-90.0).unwrap();
        // round(4096 * 60 * 0.5 / 1000) = round(122.88)
        assert_eq!(servo.pin().hw_duty_cycle(), 123);

        servo.write_angle(0.0).unwrap();
        assert_eq!(servo.pin().hw_duty_cycle(), 369);
    }

    #[test]
    fn test_reversed_pulse_mapping() {
        let (mut board, _) = board();
        let pulse = PulseRange {
            min_pulse_ms: 2.5,
            max_pulse_ms: 0.5,
        };
        let servo = PwmServo::new(board.take_pin(1).unwrap(), pulse, -90.0, 90.0);

        assert!((servo.angle_to_pulse(-90.0) - 2.5).abs() < 1e-12);
        assert!((servo.angle_to_pulse(90.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_angle_to_duty_cycle() {
        let (mut board, bus) = board();
        let mut pin = board.take_pin(0).unwrap();
        pin.set_software_resolution(4096).unwrap();

        let mut servo = Servo::pwm(pin, PulseRange::default(), &ServoConfig::default()).unwrap();

        // 1.5 ms at 60 Hz is 9% of the cycle
        assert_eq!(bus.register_pair(0x08), 369);

        servo.set_angle(90.0).unwrap();
        // round(4096 * 60 * 2.5 / 1000) = round(614.4)
        assert_eq!(bus.register_pair(0x08), 614);
    }

    #[test]
    fn test_duty_cycle_follows_frequency() {
        let (mut board, bus) = board();
        let pin = board.take_pin(3).unwrap();
        let mut servo = Servo::pwm(pin, PulseRange::default(), &ServoConfig::default()).unwrap();

        board.set_frequency(50.0).unwrap();
        servo.set_angle(0.0).unwrap();

        // 4 * 50 * 1.5 / 1000 = 0.3 -> round(0.3 * 1024) = 307 steps after the start delay
        let on = 0x06 + 4 * 3;
        assert_eq!(bus.register_pair(on), 768);
        assert_eq!(bus.register_pair(on + 2), 768 + 307);
    }
}
