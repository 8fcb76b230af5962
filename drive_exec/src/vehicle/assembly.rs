//! # Vehicle Assembly
//!
//! Wires a PCA9685 board, TB6612 drive motors and PWM servos into a [`Vehicle`] according to the
//! drive parameters. The bus and direction lines are supplied by the caller so the same wiring
//! can run on the Pi or on the simulated backend.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt::Debug;

use embedded_hal::{
    blocking::i2c::{Write, WriteRead},
    digital::v2::OutputPin,
};
use log::info;

use super::Vehicle;
use crate::{
    error::DriveError,
    motor::{DriveMotor, Tb6612},
    params::{DriveExecParams, PwmServoParams},
    pwm::pca9685::Pca9685,
    sensor::{Camera, FrameSource, SensorMount},
    servo::Servo,
};

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Build the vehicle described by `params`.
///
/// `direction_pin` is called with the GPIO number of each drive motor's direction line.
/// `camera_source` is only used if the parameters include a camera.
pub fn assemble<I2C, E, P, F>(
    i2c: I2C,
    params: &DriveExecParams,
    mut direction_pin: F,
    camera_source: Option<Box<dyn FrameSource>>,
) -> Result<Vehicle, DriveError>
where
    I2C: Write<Error = E> + WriteRead<Error = E> + 'static,
    E: Debug,
    P: OutputPin + 'static,
    P::Error: Debug,
    F: FnMut(u8) -> Result<P, DriveError>,
{
    let mut board = Pca9685::new(i2c, &params.board)?;

    let mut drive_motors = Vec::with_capacity(params.drive_motors.len());
    for m in &params.drive_motors {
        let mut pin = board.take_pin(m.pwm_pin)?;
        if let Some(res) = m.duty_cycle_res {
            pin.set_software_resolution(res)?;
        }

        let gpio = direction_pin(m.direction_gpio)?;
        drive_motors.push(DriveMotor::new(Tb6612::new(gpio, pin, m.forward_high))?);
    }

    let mut turning_motors = Vec::with_capacity(params.turning_motors.len());
    for s in &params.turning_motors {
        turning_motors.push(pwm_servo(&mut board, s)?);
    }

    let camera = match params.camera {
        Some(ref c) => {
            let pan = c.pan.as_ref().map(|s| pwm_servo(&mut board, s)).transpose()?;
            let tilt = c.tilt.as_ref().map(|s| pwm_servo(&mut board, s)).transpose()?;
            Some(Camera::new(SensorMount::new(pan, tilt), camera_source))
        }
        None => None,
    };

    info!(
        "Assembled vehicle on PWM board {:#04x} at {} Hz",
        board.address(),
        board.frequency()
    );

    Vehicle::new(drive_motors, turning_motors, camera)
}

/// Build the vehicle on the Raspberry Pi's I2C bus and GPIO.
#[cfg(all(target_arch = "arm", target_os = "linux"))]
pub fn assemble_hardware(params: &DriveExecParams) -> Result<Vehicle, DriveError> {
    use rppal::{gpio::Gpio, i2c::I2c};

    let i2c = I2c::with_bus(params.i2c_bus).map_err(|e| {
        DriveError::HardwareUnavailable(format!("I2C bus {}: {}", params.i2c_bus, e))
    })?;
    let gpio = Gpio::new().map_err(|e| DriveError::HardwareUnavailable(format!("GPIO: {}", e)))?;

    assemble(
        i2c,
        params,
        |n| {
            gpio.get(n)
                .map(|p| p.into_output())
                .map_err(|e| DriveError::HardwareUnavailable(format!("GPIO {}: {}", n, e)))
        },
        None,
    )
}

/// Build the vehicle on the Raspberry Pi's I2C bus and GPIO.
///
/// Always fails on this target, the rppal backend is only built for ARM Linux.
#[cfg(not(all(target_arch = "arm", target_os = "linux")))]
pub fn assemble_hardware(_params: &DriveExecParams) -> Result<Vehicle, DriveError> {
    Err(DriveError::HardwareUnavailable(
        "the rppal backend is only built for ARM Linux targets".into(),
    ))
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn pwm_servo<I2C, E>(
    board: &mut Pca9685<I2C>,
    params: &PwmServoParams,
) -> Result<Servo, DriveError>
where
    I2C: Write<Error = E> + WriteRead<Error = E> + 'static,
    E: Debug,
{
    let mut pin = board.take_pin(params.pwm_pin)?;
    if let Some(res) = params.duty_cycle_res {
        pin.set_software_resolution(res)?;
    }

    Servo::pwm(pin, params.pulse, &params.servo)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim::{assemble_sim, SimBus, SimOutputPin};

    #[test]
    fn test_reused_pin_fails() {
        let mut params = DriveExecParams::default();
        params.turning_motors[0].pwm_pin = 5;

        let result = assemble(
            SimBus::new(),
            &params,
            |n| Ok(SimOutputPin::new(n)),
            None,
        );
        assert!(matches!(result, Err(DriveError::PinInUse(5))));
    }

    #[test]
    fn test_pin_resolution_applied() {
        let mut params = DriveExecParams::default();
        params.drive_motors[0].duty_cycle_res = Some(256);

        let car = assemble_sim(&params).unwrap();
        assert_eq!(car.vehicle.drive_motors()[0].max_speed(), 256.0);
        assert_eq!(car.vehicle.drive_motors()[1].max_speed(), 4.0);
    }

    #[test]
    fn test_direction_pins_requested() {
        let mut requested = Vec::new();

        assemble(
            SimBus::new(),
            &DriveExecParams::default(),
            |n| {
                requested.push(n);
                Ok(SimOutputPin::new(n))
            },
            None,
        )
        .map(|_| ())
        .unwrap();

        assert_eq!(requested, vec![17, 27]);
    }

    #[test]
    fn test_missing_gpio_fails() {
        let result = assemble(
            SimBus::new(),
            &DriveExecParams::default(),
            |n| -> Result<SimOutputPin, DriveError> {
                Err(DriveError::HardwareUnavailable(format!("GPIO {}", n)))
            },
            None,
        );
        assert!(matches!(result, Err(DriveError::HardwareUnavailable(_))));
    }

    #[cfg(not(all(target_arch = "arm", target_os = "linux")))]
    #[test]
    fn test_hardware_unavailable_off_target() {
        assert!(matches!(
            assemble_hardware(&DriveExecParams::default()),
            Err(DriveError::HardwareUnavailable(_))
        ));
    }
}
