//! Command implementations.

mod info;
mod reassemble;
mod simulate;
mod validate;

use std::path::Path;

use contracts::WalkerConfig;

use crate::error::{CliError, Result};

pub use info::run_info;
pub use reassemble::run_reassemble;
pub use simulate::run_simulate;
pub use validate::run_validate;

/// Load and validate a config file
fn load_config(path: &Path) -> Result<WalkerConfig> {
    if !path.exists() {
        return Err(CliError::config_not_found(path));
    }
    Ok(config_loader::ConfigLoader::load_from_path(path)?)
}
