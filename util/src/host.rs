//! Host platform utility functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{env, path::PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Environment variable holding the software root directory.
pub const ROOT_ENV_VAR: &str = "PIDRIVE_ROOT";

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum HostError {
    #[error("The software root environment variable ({}) is not set", ROOT_ENV_VAR)]
    RootNotSet,

    #[error("The software root {0:?} is not a directory")]
    RootNotDir(PathBuf),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the software root directory, which holds the `params` and `sessions` directories.
pub fn get_pidrive_root() -> Result<PathBuf, HostError> {
    let root = env::var_os(ROOT_ENV_VAR)
        .map(PathBuf::from)
        .ok_or(HostError::RootNotSet)?;

    if root.is_dir() {
        Ok(root)
    } else {
        Err(HostError::RootNotDir(root))
    }
}

/// Short description of the platform this executable was built for.
pub fn platform() -> String {
    format!("{} {}", env::consts::OS, env::consts::ARCH)
}
