//! Runtime error types.

use courier_core::TransportError;
use courier_framework::EngineError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Loading or validating configuration failed.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The engine could not be built.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Plugin registration was rejected.
    #[error("Plugin registration failed: {0}")]
    Registry(#[from] courier_framework::RegistryError),

    /// The transport failed during start-up.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
