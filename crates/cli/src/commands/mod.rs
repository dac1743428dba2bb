pub mod compile;
pub mod config_cmd;
pub mod count;
pub mod formats;

use std::io::Read;
use std::path::Path;

use serene_config::{ConfigError, EngineConfig};

/// Load engine config from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig, ConfigError> {
    match path {
        Some(path) => {
            let mut config = EngineConfig::load_from(path)?;
            config.apply_env_overrides(|key| std::env::var(key).ok())?;
            Ok(config)
        }
        None => EngineConfig::load(),
    }
}

/// Read a whole file, or stdin for `-`.
pub fn read_input(input: &str) -> std::io::Result<String> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(input)
    }
}
