pub mod check;
pub mod extract;
pub mod generate;

use std::path::Path;

use anyhow::{bail, Result};

use vidmaker::VidmakerConfig;

/// Load `path` if given (it must exist), else the default config file.
pub fn load_config(path: Option<&Path>) -> Result<VidmakerConfig> {
    match path {
        Some(path) if !path.exists() => bail!("config file not found: {}", path.display()),
        Some(path) => VidmakerConfig::load_from(path),
        None => VidmakerConfig::load(),
    }
}
