//! Configuration schema definitions.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use courier_core::UserId;
use courier_framework::AccessPolicy;
use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CourierConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub bot: BotSection,

    #[serde(default)]
    pub engine: EngineSection,

    #[serde(default)]
    pub plugins: PluginsSection,
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Line format of log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    #[cfg(feature = "json-log")]
    Json,
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Target file when `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Per-module levels, e.g. `courier_framework = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,

    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line.
    #[serde(default)]
    pub file_location: bool,

    #[serde(default)]
    pub span_events: SpanEventConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            file_path: None,
            filters: HashMap::new(),
            thread_ids: false,
            file_location: false,
            span_events: SpanEventConfig::default(),
        }
    }
}

// =============================================================================
// Bot
// =============================================================================

/// Identity overrides and privileged users.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BotSection {
    /// Replaces the username reported by the transport when binding triggers.
    #[serde(default)]
    pub username: Option<String>,

    /// Users that pass admin checks and the allow-list everywhere.
    #[serde(default)]
    pub superusers: Vec<i64>,
}

impl BotSection {
    pub fn superuser_ids(&self) -> impl Iterator<Item = UserId> + '_ {
        self.superusers.iter().copied().map(UserId)
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Who may talk to the bot at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AccessMode {
    #[default]
    Open,
    AllowListed,
}

impl From<AccessMode> for AccessPolicy {
    fn from(mode: AccessMode) -> Self {
        match mode {
            AccessMode::Open => AccessPolicy::Open,
            AccessMode::AllowListed => AccessPolicy::AllowListed,
        }
    }
}

/// Dispatcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSection {
    #[serde(default)]
    pub access: AccessMode,

    /// Tracked cooldown keys before stale ones are pruned.
    #[serde(default = "default_cooldown_capacity")]
    pub cooldown_capacity: usize,

    /// How long in-flight handlers may run after shutdown starts.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl EngineSection {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            access: AccessMode::Open,
            cooldown_capacity: default_cooldown_capacity(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

fn default_cooldown_capacity() -> usize {
    10_000
}

fn default_shutdown_grace_secs() -> u64 {
    10
}

// =============================================================================
// Plugins
// =============================================================================

/// Initial plugin switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginsSection {
    /// Global state of plugins the persistence has never seen.
    #[serde(default = "default_enabled")]
    pub enabled_by_default: bool,

    /// Plugins switched off at start.
    #[serde(default)]
    pub disabled: Vec<String>,
}

impl Default for PluginsSection {
    fn default() -> Self {
        Self {
            enabled_by_default: default_enabled(),
            disabled: Vec::new(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_permissive() {
        let config = CourierConfig::default();
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.engine.access, AccessMode::Open);
        assert_eq!(config.engine.cooldown_capacity, 10_000);
        assert!(config.plugins.enabled_by_default);
        assert!(config.bot.superusers.is_empty());
    }

    #[test]
    fn access_mode_maps_to_policy() {
        assert_eq!(AccessPolicy::from(AccessMode::AllowListed), AccessPolicy::AllowListed);
        assert_eq!(AccessPolicy::from(AccessMode::Open), AccessPolicy::Open);
    }
}
