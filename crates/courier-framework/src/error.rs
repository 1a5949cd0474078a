//! Error types for the Courier framework.

use courier_core::{ChatId, PersistenceError, TransportError};
use thiserror::Error;

/// Errors raised while registering plugins.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// A plugin with the same name is already registered.
    #[error("plugin '{0}' is already registered")]
    DuplicateName(String),

    /// Plugin names must be non-empty.
    #[error("plugin name must not be empty")]
    EmptyName,

    /// No plugin carries the requested name.
    #[error("plugin '{0}' is not registered")]
    NotFound(String),
}

/// A trigger template that does not compile.
#[derive(Debug, Clone, Error)]
#[error("invalid trigger '{pattern}' in plugin '{plugin}': {source}")]
pub struct TriggerError {
    /// Plugin that declared the trigger.
    pub plugin: String,
    /// The pattern after the bot username was substituted.
    pub pattern: String,
    #[source]
    pub source: regex::Error,
}

/// Errors that prevent an [`Engine`](crate::Engine) from being built.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Trigger(#[from] TriggerError),

    /// The bot identity could not be resolved.
    #[error("failed to resolve bot identity: {0}")]
    Identity(#[source] TransportError),

    /// No transport was supplied to the builder.
    #[error("engine requires a transport")]
    MissingTransport,
}

/// Outcome of an administrative enable/disable request that changed nothing.
#[derive(Debug, Clone, Error)]
pub enum EnablementError {
    #[error("plugin '{0}' does not exist")]
    NotFound(String),

    #[error("plugin '{0}' is already enabled")]
    AlreadyEnabled(String),

    #[error("plugin '{0}' is already disabled")]
    AlreadyDisabled(String),

    #[error("plugin '{0}' cannot be disabled")]
    Protected(String),

    /// Per-chat switches only apply to multi-user chats.
    #[error("chat {0} is not a group chat")]
    NotAGroup(ChatId),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Reasons an allow-list change was refused.
#[derive(Debug, Clone, Error)]
pub enum AllowError {
    /// Bots never go on the allow-list.
    #[error("bots cannot be allowed")]
    BotUser,

    /// Nothing to allow: not a reply and not a group chat.
    #[error("no user or chat to act on")]
    NoTarget,

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Result type for enablement mutations.
pub type EnablementResult<T> = Result<T, EnablementError>;
