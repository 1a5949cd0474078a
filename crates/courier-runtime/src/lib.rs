//! Courier Runtime - process-level orchestration for the Courier engine.
//!
//! This crate provides:
//! - Configuration loading and validation (`ConfigLoader`, `CourierConfig`)
//! - Logging initialisation (`LoggingBuilder`, `init_from_config`)
//! - `CourierRuntime`, which binds an [`Engine`](courier_framework::Engine)
//!   to a transport and runs one task per incoming event
//!
//! ```ignore
//! use courier_runtime::{CourierRuntime, config::ConfigLoader, logging};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::new().load()?;
//!     logging::init_from_config(&config.logging);
//!
//!     let mut runtime = CourierRuntime::from_config(config);
//!     runtime.register_plugin(QuotesPlugin::default())?;
//!
//!     let (transport, events) = connect().await?;
//!     runtime.run(transport, events).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{
    AccessMode, BotSection, ConfigError, ConfigLoader, ConfigResult, CourierConfig, EngineSection, LogFormat,
    LogLevel, LogOutput, LoggingConfig, PluginsSection, SpanEventConfig,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{CourierRuntime, RuntimeBuilder};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, event, info, instrument, span, trace, warn};
}
