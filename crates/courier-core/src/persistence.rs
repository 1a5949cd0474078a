//! Persistence collaborators consulted by the engine.
//!
//! Both traits are deliberately narrow so they can be backed by a database,
//! a file, or an in-memory map.

use async_trait::async_trait;

use crate::error::PersistenceResult;
use crate::event::{ChatId, UserId};

/// Durable record of which plugins are switched on.
///
/// Implementations decide what a plugin that was never written reports from
/// [`is_enabled`](Self::is_enabled).
#[async_trait]
pub trait EnablementPersistence: Send + Sync {
    /// Whether the plugin is globally enabled.
    async fn is_enabled(&self, plugin: &str) -> PersistenceResult<bool>;

    /// Records the global state of a plugin.
    async fn set_enabled(&self, plugin: &str, enabled: bool) -> PersistenceResult<()>;

    /// Whether the plugin is disabled in one chat.
    async fn is_disabled_for_chat(&self, chat: ChatId, plugin: &str) -> PersistenceResult<bool>;

    /// Records the per-chat state of a plugin.
    async fn set_disabled_for_chat(&self, chat: ChatId, plugin: &str, disabled: bool) -> PersistenceResult<()>;
}

/// Users and chats permitted to use restricted features.
#[async_trait]
pub trait AllowList: Send + Sync {
    async fn is_user_allowed(&self, user: UserId) -> PersistenceResult<bool>;

    async fn is_chat_allowed(&self, chat: ChatId) -> PersistenceResult<bool>;

    async fn set_user_allowed(&self, user: UserId, allowed: bool) -> PersistenceResult<()>;

    async fn set_chat_allowed(&self, chat: ChatId, allowed: bool) -> PersistenceResult<()>;
}
