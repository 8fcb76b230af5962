//! # Console Commands
//!
//! Each line typed at the drive console is parsed into a [`Command`] and executed against a
//! [`Vehicle`]. Parsing reuses clap, through structopt, so every command gets usage and help text
//! for free.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::car::{CamDirection, CamMoveDems, MoveDems};
use log::info;
use structopt::{clap::AppSettings, StructOpt};

use crate::{error::DriveError, motor::Direction, servo::Servo, vehicle::Vehicle};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A console command.
#[derive(StructOpt, Debug, PartialEq)]
#[structopt(
    name = "drive",
    setting = AppSettings::NoBinaryName,
    global_setting = AppSettings::AllowNegativeNumbers,
    global_setting = AppSettings::DisableVersion
)]
pub enum Command {
    /// Set the signed velocity and steering angle together
    Move { velocity: f64, angle: f64 },

    /// Set the speed without changing direction
    Speed { speed: f64 },

    /// Set the direction of travel (forward/f/fwd or backward/b/back)
    Dir { direction: Direction },

    /// Set the steering angle in degrees
    Steer { angle: f64 },

    /// Stop the drive motors
    Stop,

    /// Move the camera (up, down, left or right)
    Cam {
        direction: CamDirection,

        /// Angle to move by in degrees
        #[structopt(default_value = "10")]
        amount: f64,
    },

    /// Capture a frame from the camera
    Snap,

    /// Show the state of the car
    Status,

    /// Stop the car and exit
    #[structopt(alias = "exit")]
    Quit,
}

/// Result of executing a [`Command`].
#[derive(Debug, PartialEq)]
pub enum Response {
    Done,

    /// Text to show the user
    Text(String),

    Exit,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Command {
    /// Parse a console line.
    ///
    /// Returns `Ok(None)` for a blank line. Errors, including requests for help, carry the text
    /// clap would print.
    pub fn parse_line(line: &str) -> Result<Option<Self>, structopt::clap::Error> {
        let words: Vec<&str> = line.split_whitespace().collect();

        if words.is_empty() {
            return Ok(None);
        }

        Self::from_iter_safe(words).map(Some)
    }

    /// Execute the command.
    pub fn execute(&self, vehicle: &mut Vehicle) -> Result<Response, DriveError> {
        match *self {
            Command::Move { velocity, angle } => {
                vehicle.actuate(&MoveDems { velocity, angle })?;
            }
            Command::Speed { speed } => vehicle.set_speed(speed)?,
            Command::Dir { direction } => vehicle.set_direction(direction)?,
            Command::Steer { angle } => vehicle.set_angle(angle)?,
            Command::Stop => vehicle.stop()?,
            Command::Cam { direction, amount } => {
                vehicle.move_camera(&CamMoveDems { direction, amount })?;
            }
            Command::Snap => {
                let frame = vehicle.read_camera()?;
                info!("Captured {:?} {} frame", frame.shape, frame.dtype);
                return Ok(Response::Text(format!(
                    "Captured frame {:?} ({} bytes)",
                    frame.shape,
                    frame.data.len()
                )));
            }
            Command::Status => return Ok(Response::Text(status(vehicle))),
            Command::Quit => return Ok(Response::Exit),
        }

        Ok(Response::Done)
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Describe the current state of the vehicle.
pub fn status(vehicle: &Vehicle) -> String {
    let mut s = format!(
        "velocity: {} ({}, speed {})\nangle: {}",
        vehicle.velocity(),
        vehicle.direction(),
        vehicle.speed(),
        vehicle.angle()
    );

    if let Ok(cam) = vehicle.camera() {
        let axis = |servo: &Option<Servo>| match servo {
            Some(s) => format!("{}", s.angle()),
            None => "-".to_string(),
        };
        s.push_str(&format!(
            "\ncamera: pan {}, tilt {}",
            axis(&cam.mount.pan),
            axis(&cam.mount.tilt)
        ));
    }

    if !vehicle.in_sync() {
        s.push_str("\nWARNING: motors out of sync, a previous command failed part way");
    }

    s
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
