//! Generic parameters functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::de::DeserializeOwned;
use std::fs::read_to_string;
use std::path::Path;
use thiserror::Error;
use toml;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// An error that occurs during loading of a parameter file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Cannot find the software root: {0}")]
    RootNotFound(crate::host::HostError),

    #[error("Cannot load the parmeter file: {0}")]
    FileLoadError(std::io::Error),

    #[error("Cannot read the parameter file: {0}")]
    DeserialiseError(toml::de::Error),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Load a parameter file
///
/// The file path is relative to the `params` directory of the software root
pub fn load<P>(param_file_path: &str) -> Result<P, LoadError>
where
    P: DeserializeOwned,
{
    // Get the params dir
    let mut path = crate::host::get_pidrive_root().map_err(LoadError::RootNotFound)?;
    path.push("params");
    path.push(param_file_path);

    load_file(path)
}

/// Load a parameter file from an explicit path
pub fn load_file<P, F>(path: F) -> Result<P, LoadError>
where
    P: DeserializeOwned,
    F: AsRef<Path>,
{
    // Load the file into a string
    let params_str = read_to_string(path).map_err(LoadError::FileLoadError)?;

    // Parse the string into the parameter struct
    toml::from_str(params_str.as_str()).map_err(LoadError::DeserialiseError)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, Debug, PartialEq)]
    struct TestParams {
        name: String,
        rate_hz: f64,
    }

    #[test]
    fn test_load_file() {
        let path = std::env::temp_dir().join("util_params_test_load_file.toml");
        std::fs::write(&path, "name = \"car\"\nrate_hz = 50.0\n").unwrap();

        let params: TestParams = load_file(&path).unwrap();
        assert_eq!(
            params,
            TestParams {
                name: "car".into(),
                rate_hz: 50.0
            }
        );

        std::fs::write(&path, "name = 3\n").unwrap();
        assert!(matches!(
            load_file::<TestParams, _>(&path),
            Err(LoadError::DeserialiseError(_))
        ));

        std::fs::remove_file(&path).unwrap();
        assert!(matches!(
            load_file::<TestParams, _>(&path),
            Err(LoadError::FileLoadError(_))
        ));
    }
}
