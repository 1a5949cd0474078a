//! Global and per-chat plugin switches.
//!
//! [`EnablementStore`] is a write-through cache in front of an
//! [`EnablementPersistence`] backend. Reads are served from memory once a
//! key has been loaded; writes go to persistence first and only update the
//! cache when persistence accepted them.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use courier_core::{Chat, ChatId, EnablementPersistence, PersistenceResult};
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::{EnablementError, EnablementResult};

/// Cached view of which plugins are switched on, globally and per chat.
pub struct EnablementStore {
    persistence: Arc<dyn EnablementPersistence>,
    known: RwLock<HashSet<String>>,
    protected: RwLock<HashSet<String>>,
    global: RwLock<HashMap<String, bool>>,
    disabled_in_chat: RwLock<HashMap<(ChatId, String), bool>>,
    writes: Mutex<()>,
}

impl EnablementStore {
    pub fn new(persistence: Arc<dyn EnablementPersistence>) -> Self {
        Self {
            persistence,
            known: RwLock::new(HashSet::new()),
            protected: RwLock::new(HashSet::new()),
            global: RwLock::new(HashMap::new()),
            disabled_in_chat: RwLock::new(HashMap::new()),
            writes: Mutex::new(()),
        }
    }

    /// Makes a plugin name known to administrative commands.
    pub fn register(&self, plugin: &str) {
        self.known.write().insert(plugin.to_string());
    }

    /// Marks a plugin as always enabled. Protected plugins refuse to be
    /// disabled, globally or per chat.
    pub fn protect(&self, plugin: &str) {
        self.protected.write().insert(plugin.to_string());
    }

    pub fn is_known(&self, plugin: &str) -> bool {
        self.known.read().contains(plugin)
    }

    pub fn is_protected(&self, plugin: &str) -> bool {
        self.protected.read().contains(plugin)
    }

    /// Known plugin names in sorted order.
    pub fn plugins(&self) -> Vec<String> {
        let mut names: Vec<String> = self.known.read().iter().cloned().collect();
        names.sort();
        names
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Whether the plugin is globally enabled. Lookup failures report
    /// `false`.
    pub async fn is_enabled(&self, plugin: &str) -> bool {
        match self.load_enabled(plugin).await {
            Ok(enabled) => enabled,
            Err(e) => {
                warn!(plugin = %plugin, error = %e, "Failed to load plugin state, treating as disabled");
                false
            }
        }
    }

    /// Whether the plugin is switched off in one chat. Lookup failures
    /// report `true`.
    pub async fn is_disabled_for_chat(&self, chat: ChatId, plugin: &str) -> bool {
        match self.load_disabled_for_chat(chat, plugin).await {
            Ok(disabled) => disabled,
            Err(e) => {
                warn!(plugin = %plugin, chat_id = %chat, error = %e, "Failed to load chat plugin state, treating as disabled");
                true
            }
        }
    }

    /// Combines the global switch with the chat switch.
    ///
    /// Private chats and events without a chat only consult the global
    /// switch.
    pub async fn is_effectively_enabled(&self, chat: Option<&Chat>, plugin: &str) -> bool {
        if !self.is_enabled(plugin).await {
            return false;
        }
        match chat {
            Some(chat) if chat.is_multi_user() => !self.is_disabled_for_chat(chat.id, plugin).await,
            _ => true,
        }
    }

    async fn load_enabled(&self, plugin: &str) -> PersistenceResult<bool> {
        if self.is_protected(plugin) {
            return Ok(true);
        }
        if let Some(enabled) = self.global.read().get(plugin) {
            return Ok(*enabled);
        }
        let enabled = self.persistence.is_enabled(plugin).await?;
        Ok(*self.global.write().entry(plugin.to_string()).or_insert(enabled))
    }

    async fn load_disabled_for_chat(&self, chat: ChatId, plugin: &str) -> PersistenceResult<bool> {
        if self.is_protected(plugin) {
            return Ok(false);
        }
        let key = (chat, plugin.to_string());
        if let Some(disabled) = self.disabled_in_chat.read().get(&key) {
            return Ok(*disabled);
        }
        let disabled = self.persistence.is_disabled_for_chat(chat, plugin).await?;
        Ok(*self.disabled_in_chat.write().entry(key).or_insert(disabled))
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Switches a plugin on everywhere.
    pub async fn enable(&self, plugin: &str) -> EnablementResult<()> {
        let _guard = self.writes.lock().await;
        self.ensure_known(plugin)?;
        if self.load_enabled(plugin).await? {
            return Err(EnablementError::AlreadyEnabled(plugin.to_string()));
        }
        self.persistence.set_enabled(plugin, true).await?;
        self.global.write().insert(plugin.to_string(), true);
        info!(plugin = %plugin, "Plugin enabled");
        Ok(())
    }

    /// Switches a plugin off everywhere.
    pub async fn disable(&self, plugin: &str) -> EnablementResult<()> {
        let _guard = self.writes.lock().await;
        self.ensure_mutable(plugin)?;
        if !self.load_enabled(plugin).await? {
            return Err(EnablementError::AlreadyDisabled(plugin.to_string()));
        }
        self.persistence.set_enabled(plugin, false).await?;
        self.global.write().insert(plugin.to_string(), false);
        info!(plugin = %plugin, "Plugin disabled");
        Ok(())
    }

    /// Lifts a chat-level switch-off.
    pub async fn enable_for_chat(&self, chat: &Chat, plugin: &str) -> EnablementResult<()> {
        let _guard = self.writes.lock().await;
        self.ensure_known(plugin)?;
        ensure_group(chat)?;
        if !self.load_disabled_for_chat(chat.id, plugin).await? {
            return Err(EnablementError::AlreadyEnabled(plugin.to_string()));
        }
        self.persistence.set_disabled_for_chat(chat.id, plugin, false).await?;
        self.disabled_in_chat.write().insert((chat.id, plugin.to_string()), false);
        info!(plugin = %plugin, chat_id = %chat.id, "Plugin enabled for chat");
        Ok(())
    }

    /// Switches a plugin off in one chat.
    pub async fn disable_for_chat(&self, chat: &Chat, plugin: &str) -> EnablementResult<()> {
        let _guard = self.writes.lock().await;
        self.ensure_mutable(plugin)?;
        ensure_group(chat)?;
        if self.load_disabled_for_chat(chat.id, plugin).await? {
            return Err(EnablementError::AlreadyDisabled(plugin.to_string()));
        }
        self.persistence.set_disabled_for_chat(chat.id, plugin, true).await?;
        self.disabled_in_chat.write().insert((chat.id, plugin.to_string()), true);
        info!(plugin = %plugin, chat_id = %chat.id, "Plugin disabled for chat");
        Ok(())
    }

    fn ensure_known(&self, plugin: &str) -> EnablementResult<()> {
        if self.is_known(plugin) {
            Ok(())
        } else {
            Err(EnablementError::NotFound(plugin.to_string()))
        }
    }

    fn ensure_mutable(&self, plugin: &str) -> EnablementResult<()> {
        self.ensure_known(plugin)?;
        if self.is_protected(plugin) {
            return Err(EnablementError::Protected(plugin.to_string()));
        }
        Ok(())
    }
}

fn ensure_group(chat: &Chat) -> EnablementResult<()> {
    if chat.is_multi_user() {
        Ok(())
    } else {
        Err(EnablementError::NotAGroup(chat.id))
    }
}
