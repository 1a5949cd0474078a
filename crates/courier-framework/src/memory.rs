//! In-memory persistence backends.
//!
//! Suitable for tests, demos, and deployments that rebuild their state from
//! configuration on every start.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use courier_core::{AllowList, ChatId, EnablementPersistence, PersistenceResult, UserId};
use parking_lot::RwLock;

/// Plugin switches kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryEnablement {
    enabled_by_default: bool,
    global: RwLock<HashMap<String, bool>>,
    disabled_in_chat: RwLock<HashSet<(ChatId, String)>>,
}

impl InMemoryEnablement {
    /// Creates a backend where plugins never written report `enabled_by_default`.
    pub fn new(enabled_by_default: bool) -> Self {
        Self {
            enabled_by_default,
            ..Self::default()
        }
    }

    /// Seeds the global state of a plugin.
    pub fn with_plugin(self, plugin: impl Into<String>, enabled: bool) -> Self {
        self.global.write().insert(plugin.into(), enabled);
        self
    }
}

#[async_trait]
impl EnablementPersistence for InMemoryEnablement {
    async fn is_enabled(&self, plugin: &str) -> PersistenceResult<bool> {
        Ok(self.global.read().get(plugin).copied().unwrap_or(self.enabled_by_default))
    }

    async fn set_enabled(&self, plugin: &str, enabled: bool) -> PersistenceResult<()> {
        self.global.write().insert(plugin.to_string(), enabled);
        Ok(())
    }

    async fn is_disabled_for_chat(&self, chat: ChatId, plugin: &str) -> PersistenceResult<bool> {
        Ok(self.disabled_in_chat.read().contains(&(chat, plugin.to_string())))
    }

    async fn set_disabled_for_chat(&self, chat: ChatId, plugin: &str, disabled: bool) -> PersistenceResult<()> {
        let mut set = self.disabled_in_chat.write();
        if disabled {
            set.insert((chat, plugin.to_string()));
        } else {
            set.remove(&(chat, plugin.to_string()));
        }
        Ok(())
    }
}

/// Allow-list kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryAllowList {
    users: RwLock<HashSet<UserId>>,
    chats: RwLock<HashSet<ChatId>>,
}

impl InMemoryAllowList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(self, users: impl IntoIterator<Item = UserId>) -> Self {
        self.users.write().extend(users);
        self
    }

    pub fn with_chats(self, chats: impl IntoIterator<Item = ChatId>) -> Self {
        self.chats.write().extend(chats);
        self
    }
}

#[async_trait]
impl AllowList for InMemoryAllowList {
    async fn is_user_allowed(&self, user: UserId) -> PersistenceResult<bool> {
        Ok(self.users.read().contains(&user))
    }

    async fn is_chat_allowed(&self, chat: ChatId) -> PersistenceResult<bool> {
        Ok(self.chats.read().contains(&chat))
    }

    async fn set_user_allowed(&self, user: UserId, allowed: bool) -> PersistenceResult<()> {
        let mut users = self.users.write();
        if allowed {
            users.insert(user);
        } else {
            users.remove(&user);
        }
        Ok(())
    }

    async fn set_chat_allowed(&self, chat: ChatId, allowed: bool) -> PersistenceResult<()> {
        let mut chats = self.chats.write();
        if allowed {
            chats.insert(chat);
        } else {
            chats.remove(&chat);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_ok, block_on};

    use super::*;

    #[test]
    fn unknown_plugins_use_the_default() {
        let store = InMemoryEnablement::new(true).with_plugin("quotes", false);
        assert!(assert_ok!(block_on(store.is_enabled("weather"))));
        assert!(!assert_ok!(block_on(store.is_enabled("quotes"))));
    }

    #[test]
    fn chat_switches_round_trip() {
        let store = InMemoryEnablement::new(true);
        block_on(async {
            assert_ok!(store.set_disabled_for_chat(ChatId(-1), "quotes", true).await);
            assert!(assert_ok!(store.is_disabled_for_chat(ChatId(-1), "quotes").await));
            assert!(!assert_ok!(store.is_disabled_for_chat(ChatId(-2), "quotes").await));
            assert_ok!(store.set_disabled_for_chat(ChatId(-1), "quotes", false).await);
            assert!(!assert_ok!(store.is_disabled_for_chat(ChatId(-1), "quotes").await));
        });
    }

    #[test]
    fn allow_list_tracks_users_and_chats() {
        let list = InMemoryAllowList::new().with_users([UserId(1)]);
        block_on(async {
            assert!(assert_ok!(list.is_user_allowed(UserId(1)).await));
            assert_ok!(list.set_user_allowed(UserId(1), false).await);
            assert!(!assert_ok!(list.is_user_allowed(UserId(1)).await));
            assert_ok!(list.set_chat_allowed(ChatId(-5), true).await);
            assert!(assert_ok!(list.is_chat_allowed(ChatId(-5)).await));
        });
    }
}
