//! # Vehicle Module
//!
//! A [`Vehicle`] drives a group of drive motors and a group of turning servos as if each group
//! were a single actuator. Every demand is broadcast to all members of a group in order.
//!
//! Broadcasts stop at the first member that fails. Members written before the failure keep their
//! new value and nothing is rolled back, so after a failed broadcast a group may be out of sync.
//! Group state is read from the first member, which is only representative while every broadcast
//! has succeeded.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Builds a [`Vehicle`] from its wiring parameters.
pub mod assembly;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::car::{CamFrame, CamMoveDems, MoveDems};
use log::{debug, info};

use crate::{
    error::DriveError,
    motor::{Direction, DriveMotor},
    sensor::Camera,
    servo::Servo,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A car with drive motors, steering servos and an optional camera.
pub struct Vehicle {
    drive_motors: Vec<DriveMotor>,

    turning_motors: Vec<Servo>,

    camera: Option<Camera>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Vehicle {
    /// Create a new vehicle, stopping it and centring the steering.
    pub fn new(
        drive_motors: Vec<DriveMotor>,
        turning_motors: Vec<Servo>,
        camera: Option<Camera>,
    ) -> Result<Self, DriveError> {
        if drive_motors.is_empty() {
            return Err(DriveError::EmptyGroup("drive motor"));
        }
        if turning_motors.is_empty() {
            return Err(DriveError::EmptyGroup("turning motor"));
        }

        let mut vehicle = Self {
            drive_motors,
            turning_motors,
            camera,
        };

        vehicle.set_velocity(0.0)?;
        vehicle.set_angle(0.0)?;

        info!(
            "Vehicle ready: {} drive motors, {} turning motors, camera: {}",
            vehicle.drive_motors.len(),
            vehicle.turning_motors.len(),
            vehicle.camera.is_some()
        );

        Ok(vehicle)
    }

    pub fn drive_motors(&self) -> &[DriveMotor] {
        &self.drive_motors
    }

    pub fn turning_motors(&self) -> &[Servo] {
        &self.turning_motors
    }

    /// Steering angle, read from the first turning motor.
    pub fn angle(&self) -> f64 {
        self.turning_motors[0].angle()
    }

    /// Set the steering angle of every turning motor.
    pub fn set_angle(&mut self, angle: f64) -> Result<(), DriveError> {
        debug!("Vehicle angle -> {}", angle);
        self.turning_motors
            .iter_mut()
            .try_for_each(|m| m.set_angle(angle))
    }

    /// Speed, read from the first drive motor.
    pub fn speed(&self) -> f64 {
        self.drive_motors[0].speed()
    }

    /// Set the speed of every drive motor without changing direction.
    pub fn set_speed(&mut self, speed: f64) -> Result<(), DriveError> {
        debug!("Vehicle speed -> {}", speed);
        self.drive_motors
            .iter_mut()
            .try_for_each(|m| m.set_speed(speed))
    }

    /// Signed speed, read from the first drive motor.
    pub fn velocity(&self) -> f64 {
        self.drive_motors[0].velocity()
    }

    /// Set the velocity of every drive motor.
    pub fn set_velocity(&mut self, velocity: f64) -> Result<(), DriveError> {
        debug!("Vehicle velocity -> {}", velocity);
        self.drive_motors
            .iter_mut()
            .try_for_each(|m| m.set_velocity(velocity))
    }

    /// Direction, read from the first drive motor.
    pub fn direction(&self) -> Direction {
        self.drive_motors[0].direction()
    }

    /// Set the direction of every drive motor.
    pub fn set_direction(&mut self, direction: Direction) -> Result<(), DriveError> {
        debug!("Vehicle direction -> {}", direction);
        self.drive_motors
            .iter_mut()
            .try_for_each(|m| m.set_direction(direction))
    }

    /// Stop all drive motors, leaving their direction unchanged.
    pub fn stop(&mut self) -> Result<(), DriveError> {
        self.set_speed(0.0)
    }

    /// Apply a motion demand: velocity first, then steering angle.
    pub fn actuate(&mut self, dems: &MoveDems) -> Result<(), DriveError> {
        self.set_velocity(dems.velocity)?;
        self.set_angle(dems.angle)
    }

    pub fn camera(&self) -> Result<&Camera, DriveError> {
        self.camera
            .as_ref()
            .ok_or_else(|| DriveError::Unsupported("camera".into()))
    }

    pub fn camera_mut(&mut self) -> Result<&mut Camera, DriveError> {
        self.camera
            .as_mut()
            .ok_or_else(|| DriveError::Unsupported("camera".into()))
    }

    /// Move the camera mount.
    pub fn move_camera(&mut self, dems: &CamMoveDems) -> Result<(), DriveError> {
        self.camera_mut()?
            .mount
            .move_in(dems.direction, dems.amount)
    }

    /// Capture a frame from the camera.
    pub fn read_camera(&mut self) -> Result<CamFrame, DriveError> {
        self.camera_mut()?.read()
    }

    /// Returns true if all members of each group hold the same value.
    pub fn in_sync(&self) -> bool {
        let v = self.velocity();
        let a = self.angle();

        self.drive_motors.iter().all(|m| m.velocity() == v)
            && self.turning_motors.iter().all(|m| m.angle() == a)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        params::DriveExecParams,
        sim::{assemble_sim, SimVehicle},
    };
    use comms_if::eqpt::car::CamDirection;

    fn car() -> SimVehicle {
        assemble_sim(&DriveExecParams::default()).unwrap()
    }

    fn assert_group_values(vehicle: &Vehicle, velocity: f64, angle: f64) {
        for m in vehicle.drive_motors() {
            assert_eq!(m.velocity(), velocity);
        }
        for m in vehicle.turning_motors() {
            assert_eq!(m.angle(), angle);
        }
    }

    #[test]
    fn test_new_vehicle_is_stopped() {
        let car = car();

        assert_eq!(car.vehicle.drive_motors().len(), 2);
        assert_eq!(car.vehicle.turning_motors().len(), 1);
        assert_group_values(&car.vehicle, 0.0, 0.0);
        assert_eq!(car.vehicle.direction(), Direction::Forward);
    }

    #[test]
    fn test_empty_groups_rejected() {
        let mut car = car();
        let motors = std::mem::take(&mut car.vehicle.drive_motors);
        let servos = std::mem::take(&mut car.vehicle.turning_motors);

        assert!(matches!(
            Vehicle::new(Vec::new(), servos, None),
            Err(DriveError::EmptyGroup(_))
        ));
        assert!(matches!(
            Vehicle::new(motors, Vec::new(), None),
            Err(DriveError::EmptyGroup(_))
        ));
    }

    #[test]
    fn test_broadcast_consistency() {
        let mut car = car();
        let v = &mut car.vehicle;

        v.set_velocity(-3.0).unwrap();
        assert!(v.in_sync());
        assert_eq!(v.velocity(), -3.0);
        assert_eq!(v.speed(), 3.0);
        assert_eq!(v.direction(), Direction::Backward);
        assert_group_values(v, -3.0, 0.0);

        v.set_angle(45.0).unwrap();
        assert_group_values(v, -3.0, 45.0);

        v.set_direction(Direction::Forward).unwrap();
        assert_group_values(v, 3.0, 45.0);

        v.set_speed(1.0).unwrap();
        assert_group_values(v, 1.0, 45.0);
        assert!(v.in_sync());
    }

    #[test]
    fn test_broadcast_drives_every_motor() {
        let mut car = car();

        car.vehicle.set_velocity(-2.0).unwrap();

        // Both direction lines flipped, both speed pins at half duty
        assert!(car.direction_pins.iter().all(|p| p.is_high()));
        for &pin in &[5usize, 4] {
            let on = 0x06 + 4 * pin as u8;
            let delay = (pin * 256) as u16;
            assert_eq!(car.bus.register_pair(on + 2), delay + 2048);
        }
    }

    #[test]
    fn test_stop_keeps_direction() {
        let mut car = car();

        car.vehicle.set_velocity(-4.0).unwrap();
        car.vehicle.stop().unwrap();

        assert_eq!(car.vehicle.speed(), 0.0);
        assert_eq!(car.vehicle.direction(), Direction::Backward);
        assert_group_values(&car.vehicle, 0.0, 0.0);
    }

    #[test]
    fn test_out_of_range_broadcast_leaves_state() {
        let mut car = car();
        car.vehicle.set_velocity(2.0).unwrap();

        // Steering limited to +/- 60 degrees
        assert!(car.vehicle.set_angle(75.0).unwrap_err().is_out_of_range());
        assert!(car.vehicle.set_velocity(5.0).unwrap_err().is_out_of_range());

        assert_group_values(&car.vehicle, 2.0, 0.0);
    }

    #[test]
    fn test_partial_broadcast_not_rolled_back() {
        let mut car = car();
        car.vehicle.set_velocity(1.0).unwrap();

        // Each speed write is 4 single byte writes, fail part way into the second motor
        car.bus.fail_after_writes(5);

        assert!(matches!(
            car.vehicle.set_speed(3.0),
            Err(DriveError::I2c(_))
        ));

        let motors = car.vehicle.drive_motors();
        assert_eq!(motors[0].speed(), 3.0);
        assert_eq!(motors[1].speed(), 1.0);
        assert!(!car.vehicle.in_sync());
    }

    #[test]
    fn test_actuate() {
        let mut car = car();

        car.vehicle
            .actuate(&MoveDems {
                velocity: -1.0,
                angle: -30.0,
            })
            .unwrap();

        assert_group_values(&car.vehicle, -1.0, -30.0);
    }

    #[test]
    fn test_camera_capability() {
        let mut car = car();

        car.vehicle
            .move_camera(&CamMoveDems {
                direction: CamDirection::Up,
                amount: 5.0,
            })
            .unwrap();
        let tilt = car.vehicle.camera().unwrap().mount.tilt.as_ref().unwrap();
        assert_eq!(tilt.angle(), -3.0);

        let frame = car.vehicle.read_camera().unwrap();
        assert_eq!(frame.num_elements(), frame.data.len());

        let mut params = DriveExecParams::default();
        params.camera = None;
        let mut car = assemble_sim(&params).unwrap();
        assert!(matches!(
            car.vehicle.read_camera(),
            Err(DriveError::Unsupported(_))
        ));
        assert!(matches!(
            car.vehicle.move_camera(&CamMoveDems {
                direction: CamDirection::Left,
                amount: 10.0
            }),
            Err(DriveError::Unsupported(_))
        ));
    }
}
