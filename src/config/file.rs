//! Configuration file loading.

use crate::config::Settings;
use crate::error::{Error, Result};
use std::path::Path;

/// Load configuration from a TOML file.
///
/// Returns default settings if the file does not exist.
pub fn load_config_file(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| Error::ConfigParse {
        path: path.to_path_buf(),
        source: Box::new(e),
    })
}

/// Load configuration from the default platform-specific path.
///
/// Returns default settings if no config file exists.
pub fn load_default_config() -> Result<Settings> {
    super::config_file_path()
        .map_or_else(|_| Ok(Settings::default()), |path| load_config_file(&path))
}
