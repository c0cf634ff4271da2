use crate::shared::errors::AppError;
use crate::shared::types::BotConfig;
use std::fs;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a toml file
    pub fn load_config(path: &str) -> Result<BotConfig, AppError> {
        let config_content = fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config file: {}", e)))?;

        let config: BotConfig = toml::from_str(&config_content)
            .map_err(|e| AppError::Config(format!("Failed to parse config file: {}", e)))?;

        Ok(config)
    }
}
