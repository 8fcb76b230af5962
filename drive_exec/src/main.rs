//! # Drive Executable
//!
//! Interactive console for driving the car by hand. Commands are read from a line editor and
//! applied to the vehicle immediately. Type `help` for the list of commands.
//!
//! The car is stopped when the console exits.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Result};
use log::{error, info, warn};
use rustyline::{error::ReadlineError, DefaultEditor};
use std::path::PathBuf;
use structopt::StructOpt;

// Internal
use drive_lib::{
    cli::{Command, Response},
    params::DriveExecParams,
    sim,
    vehicle::{assembly, Vehicle},
};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

const PROMPT: &str = "drive $ ";

/// History file, relative to the software root.
const HISTORY_FILE: &str = "drive_history.txt";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(StructOpt, Debug)]
#[structopt(name = "drive_exec", about = "Drive the car from the command line")]
struct Opts {
    /// Run on simulated hardware
    #[structopt(long)]
    sim: bool,

    /// Parameter file to use instead of params/drive_exec.toml
    #[structopt(long, parse(from_os_str))]
    params: Option<PathBuf>,

    /// Minimum log level (info, debug or trace)
    #[structopt(long, default_value = "info")]
    log_level: LevelFilter,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("drive_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(opts.log_level, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("PiDrive Drive Executable\n");
    info!("Running on: {}", host::platform());
    info!("Session directory: {:?}\n", session.session_root);

    info!("Initialising...");

    // ---- LOAD PARAMETERS ----

    let params: DriveExecParams = match opts.params {
        Some(ref p) => util::params::load_file(p)
            .wrap_err_with(|| format!("Failed to load parameters from {:?}", p))?,
        None => util::params::load("drive_exec.toml").wrap_err("Failed to load parameters")?,
    };
    params.are_valid().wrap_err("Invalid parameters")?;

    info!("Parameters loaded");

    // ---- VEHICLE INITIALISATION ----

    let mut vehicle = if opts.sim {
        info!("Using simulated hardware");
        sim::assemble_sim(&params)
            .wrap_err("Failed to assemble the simulated vehicle")?
            .vehicle
    } else {
        assembly::assemble_hardware(&params).wrap_err("Failed to assemble the vehicle")?
    };

    info!("Initialisation complete, entering console");

    // ---- MAIN LOOP ----

    let result = console(&mut vehicle);

    // Always try to leave the car stationary
    match vehicle.stop() {
        Ok(_) => info!("Vehicle stopped"),
        Err(e) => error!("Failed to stop the vehicle: {}", e),
    }

    result
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn console(vehicle: &mut Vehicle) -> Result<()> {
    let mut rl = DefaultEditor::new().wrap_err("Failed to create the line editor")?;

    let history_path = host::get_pidrive_root()
        .map(|p| p.join(HISTORY_FILE))
        .wrap_err("Failed to find the history file")?;
    if rl.load_history(&history_path).is_err() {
        info!("No command history found");
    }

    loop {
        let line = match rl.readline(PROMPT) {
            Ok(l) => l,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).wrap_err("Failed to read from the console"),
        };

        if let Err(e) = rl.add_history_entry(line.as_str()) {
            warn!("Couldn't add line to history: {}", e);
        }

        let cmd = match Command::parse_line(&line) {
            Ok(Some(c)) => c,
            Ok(None) => continue,
            // Includes help requests
            Err(e) => {
                println!("{}", e.message);
                continue;
            }
        };

        match cmd.execute(vehicle) {
            Ok(Response::Done) => (),
            Ok(Response::Text(t)) => println!("{}", t),
            Ok(Response::Exit) => break,
            Err(e) => {
                error!("{:?} failed: {}", cmd, e);
                if !vehicle.in_sync() {
                    warn!("Motors are out of sync, reissue the command to recover");
                }
            }
        }
    }

    if let Err(e) = rl.save_history(&history_path) {
        warn!("Couldn't save command history: {}", e);
    }

    Ok(())
}
