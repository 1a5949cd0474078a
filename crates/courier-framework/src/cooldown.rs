//! Per-handler rate limiting.
//!
//! A handler may carry a minimum interval between invocations. The interval
//! is tracked per handler and per scope (the chat, the user, or both), so a
//! busy group does not throttle a quiet one.
//!
//! Time is always supplied by the caller. The limiter never reads the clock,
//! which keeps it deterministic under test.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use courier_core::{ChatId, Event, UserId};
use parking_lot::{Mutex, RwLock};

/// Default number of tracked keys before stale entries are pruned.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Identifies one handler of one plugin.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerId {
    pub plugin: Arc<str>,
    pub index: usize,
}

impl HandlerId {
    pub fn new(plugin: impl Into<Arc<str>>, index: usize) -> Self {
        Self {
            plugin: plugin.into(),
            index,
        }
    }
}

/// What a cooldown is counted against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CooldownScope {
    /// One window per chat.
    #[default]
    Chat,
    /// One window per user, across chats.
    User,
    /// One window per user in each chat.
    ChatUser,
}

/// A handler's cooldown configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cooldown {
    pub interval: Duration,
    pub scope: CooldownScope,
}

impl Cooldown {
    pub fn per_chat(interval: Duration) -> Self {
        Self {
            interval,
            scope: CooldownScope::Chat,
        }
    }

    pub fn per_user(interval: Duration) -> Self {
        Self {
            interval,
            scope: CooldownScope::User,
        }
    }

    /// Derives the scope key for an event.
    pub fn scope_key(&self, event: &Event) -> ScopeKey {
        let chat = event.chat_id();
        let user = event.sender_id();
        match self.scope {
            CooldownScope::Chat => ScopeKey { chat, user: None },
            CooldownScope::User => ScopeKey { chat: None, user },
            CooldownScope::ChatUser => ScopeKey { chat, user },
        }
    }
}

/// The chat and/or user a cooldown window belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeKey {
    pub chat: Option<ChatId>,
    pub user: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CooldownKey {
    handler: HandlerId,
    scope: ScopeKey,
}

#[derive(Debug)]
struct Window {
    last: Instant,
    interval: Duration,
}

impl Window {
    fn admit(&mut self, interval: Duration, now: Instant) -> bool {
        if now.saturating_duration_since(self.last) < interval {
            return false;
        }
        self.last = now;
        self.interval = interval;
        true
    }

    fn is_stale(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last) >= self.interval
    }
}

/// Tracks the last accepted invocation per handler and scope.
///
/// Lookups of existing keys share a read lock and serialize on the key's own
/// mutex. Only the first invocation for a key takes the write lock.
#[derive(Debug)]
pub struct CooldownLimiter {
    windows: RwLock<HashMap<CooldownKey, Mutex<Window>>>,
    capacity: usize,
}

impl Default for CooldownLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl CooldownLimiter {
    pub fn new(capacity: usize) -> Self {
        Self {
            windows: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Records an invocation if the window allows it.
    ///
    /// Returns `true` and stamps `now` when no earlier invocation for the same
    /// handler and scope is within `interval`. A rejected attempt leaves the
    /// window untouched. Without an interval every attempt is accepted.
    pub fn try_acquire(&self, handler: &HandlerId, scope: ScopeKey, interval: Option<Duration>, now: Instant) -> bool {
        let Some(interval) = interval.filter(|i| !i.is_zero()) else {
            return true;
        };
        let key = CooldownKey {
            handler: handler.clone(),
            scope,
        };

        {
            let windows = self.windows.read();
            if let Some(window) = windows.get(&key) {
                return window.lock().admit(interval, now);
            }
        }

        let mut windows = self.windows.write();
        if let Some(window) = windows.get_mut(&key) {
            return window.get_mut().admit(interval, now);
        }
        if windows.len() >= self.capacity {
            windows.retain(|_, window| !window.get_mut().is_stale(now));
        }
        windows.insert(key, Mutex::new(Window { last: now, interval }));
        true
    }

    /// Number of tracked windows.
    pub fn len(&self) -> usize {
        self.windows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.read().is_empty()
    }
}
