//! Configuration validation utilities.
//!
//! Log levels, formats and access modes are closed enums, so unknown values
//! are already rejected while extracting. What remains are the checks serde
//! cannot express.

use std::collections::HashSet;

use super::error::{ConfigError, ConfigResult};
use super::schema::{BotSection, CourierConfig, EngineSection, LoggingConfig, LogOutput, PluginsSection};

/// Validates the entire configuration.
pub fn validate_config(config: &CourierConfig) -> ConfigResult<()> {
    validate_logging(&config.logging)?;
    validate_bot(&config.bot)?;
    validate_engine(&config.engine)?;
    validate_plugins(&config.plugins)?;
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.filters.keys().any(|module| module.trim().is_empty()) {
        return Err(ConfigError::validation("Log filter module names must not be empty"));
    }
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }
    Ok(())
}

fn validate_bot(bot: &BotSection) -> ConfigResult<()> {
    if let Some(username) = &bot.username {
        let username = username.trim_start_matches('@');
        if username.is_empty() || username.chars().any(char::is_whitespace) {
            return Err(ConfigError::validation(format!(
                "Invalid bot username: {:?}",
                bot.username.as_deref().unwrap_or_default()
            )));
        }
    }
    if let Some(id) = bot.superusers.iter().find(|id| **id <= 0) {
        return Err(ConfigError::validation(format!(
            "Superuser ids must be positive user ids, got {id}"
        )));
    }
    Ok(())
}

fn validate_engine(engine: &EngineSection) -> ConfigResult<()> {
    if engine.cooldown_capacity == 0 {
        return Err(ConfigError::validation("engine.cooldown_capacity must be greater than 0"));
    }
    Ok(())
}

fn validate_plugins(plugins: &PluginsSection) -> ConfigResult<()> {
    let mut seen = HashSet::new();
    for name in &plugins.disabled {
        if name.trim().is_empty() {
            return Err(ConfigError::validation("Disabled plugin names must not be empty"));
        }
        if !seen.insert(name.as_str()) {
            return Err(ConfigError::validation(format!("Plugin {name} is listed twice in plugins.disabled")));
        }
    }
    Ok(())
}
