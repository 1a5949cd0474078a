//! Configuration module for the Courier runtime.
//!
//! Configuration is layered with figment: built-in defaults, then files,
//! then `COURIER_*` environment variables, then programmatic overrides.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    AccessMode, BotSection, CourierConfig, EngineSection, LogFormat, LogLevel, LogOutput, LoggingConfig,
    PluginsSection, SpanEventConfig,
};
pub use validation::validate_config;
