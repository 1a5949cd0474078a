//! Permission checks applied before a handler runs.
//!
//! Checks come in two groups. [`PermissionGate::in_scope`] only looks at
//! the event and is evaluated before the trigger. [`PermissionGate::allow`]
//! may call the transport or the allow-list and is evaluated after the
//! trigger matched, so unrelated messages never cost a network round trip.
//!
//! Every lookup failure denies.

use std::collections::HashSet;
use std::sync::Arc;

use courier_core::{AllowList, Chat, Event, EventKind, Transport, UserId};
use tracing::warn;
use uuid::Uuid;

use crate::handler::{Handler, HandlerKind};

/// Who may use the bot at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AccessPolicy {
    /// Everyone.
    #[default]
    Open,
    /// Only allow-listed users, members of allow-listed chats, and superusers.
    AllowListed,
}

/// Decides whether an event may reach a handler.
pub struct PermissionGate {
    transport: Arc<dyn Transport>,
    allow_list: Arc<dyn AllowList>,
    superusers: HashSet<UserId>,
    access: AccessPolicy,
}

impl PermissionGate {
    pub fn new(transport: Arc<dyn Transport>, allow_list: Arc<dyn AllowList>) -> Self {
        Self {
            transport,
            allow_list,
            superusers: HashSet::new(),
            access: AccessPolicy::Open,
        }
    }

    /// Users that pass every administrative and allow-list check.
    pub fn with_superusers(mut self, superusers: impl IntoIterator<Item = UserId>) -> Self {
        self.superusers.extend(superusers);
        self
    }

    pub fn with_access(mut self, access: AccessPolicy) -> Self {
        self.access = access;
        self
    }

    pub fn access(&self) -> AccessPolicy {
        self.access
    }

    pub fn is_superuser(&self, user: UserId) -> bool {
        self.superusers.contains(&user)
    }

    /// Checks that need nothing but the event.
    pub fn in_scope(&self, handler: &Handler, event: &Event) -> bool {
        !handler.is_group_only() || event.in_multi_user_chat()
    }

    /// Full check: scope, superuser and administrator status, allow-list.
    pub async fn allow(&self, handler: &Handler, event: &Event) -> bool {
        if !self.in_scope(handler, event) {
            return false;
        }
        let Some(sender) = event.sender_id() else {
            return !handler.is_admin_only() && !handler.is_superuser_only() && !self.needs_allow_list(handler);
        };
        if handler.is_superuser_only() && !self.is_superuser(sender) {
            return false;
        }
        if handler.is_admin_only() && !self.is_admin(event.chat.as_ref(), sender).await {
            return false;
        }
        if self.needs_allow_list(handler) {
            return self.is_user_allowed(sender).await;
        }
        true
    }

    /// Applies the access policy to an event before any handler is considered.
    ///
    /// Inline queries are exempt here; their handlers carry their own
    /// allow-list flag.
    pub async fn admits_event(&self, event: &Event) -> bool {
        if self.access == AccessPolicy::Open || event.kind() == Some(EventKind::InlineQuery) {
            return true;
        }
        let Some(sender) = event.sender_id() else {
            return false;
        };
        if self.is_user_allowed(sender).await {
            return true;
        }
        match &event.chat {
            Some(chat) if chat.is_multi_user() => self.is_chat_allowed(chat).await,
            _ => false,
        }
    }

    /// Whether `user` administers `chat`.
    ///
    /// Superusers always do. Outside multi-user chats there is nobody to ask,
    /// so only superusers qualify.
    pub async fn is_admin(&self, chat: Option<&Chat>, user: UserId) -> bool {
        if self.is_superuser(user) {
            return true;
        }
        let Some(chat) = chat.filter(|c| c.is_multi_user()) else {
            return false;
        };
        match self.transport.chat_administrators(chat.id).await {
            Ok(admins) => admins.iter().any(|m| m.user == user && m.role.is_admin()),
            Err(e) => {
                warn!(
                    correlation_id = %Uuid::new_v4(),
                    chat_id = %chat.id,
                    user_id = %user,
                    error = %e,
                    "Failed to resolve chat administrators, denying"
                );
                false
            }
        }
    }

    /// Whether `user` is a superuser or on the allow-list.
    pub async fn is_user_allowed(&self, user: UserId) -> bool {
        if self.is_superuser(user) {
            return true;
        }
        match self.allow_list.is_user_allowed(user).await {
            Ok(allowed) => allowed,
            Err(e) => {
                warn!(
                    correlation_id = %Uuid::new_v4(),
                    user_id = %user,
                    error = %e,
                    "Allow-list lookup failed, denying"
                );
                false
            }
        }
    }

    async fn is_chat_allowed(&self, chat: &Chat) -> bool {
        match self.allow_list.is_chat_allowed(chat.id).await {
            Ok(allowed) => allowed,
            Err(e) => {
                warn!(
                    correlation_id = %Uuid::new_v4(),
                    chat_id = %chat.id,
                    error = %e,
                    "Allow-list lookup failed, denying"
                );
                false
            }
        }
    }

    fn needs_allow_list(&self, handler: &Handler) -> bool {
        matches!(handler.kind(), HandlerKind::Inline { everyone: false })
    }
}
