//! The outbound side of a messaging platform.
//!
//! The engine never talks to a platform directly. Everything it needs, from
//! replying to a message to resolving chat administrators, goes through the
//! [`Transport`] trait. Concrete transports (a Bot API client, a console
//! simulator, a test double) implement it.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TransportResult;
use crate::event::{ChatId, Event, EventPayload, MessageRef, UserId};
use crate::identity::{BotCommand, BotIdentity};

// =============================================================================
// Outgoing message options
// =============================================================================

/// How the platform should interpret markup in outgoing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseMode {
    Html,
    Markdown,
}

/// A button attached below an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub text: String,
    /// Data delivered back as a callback query when pressed.
    pub callback_data: String,
}

impl Button {
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}

/// Options for sending a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendOptions {
    pub parse_mode: Option<ParseMode>,
    pub disable_preview: bool,
    pub silent: bool,
    /// Rows of buttons.
    pub buttons: Vec<Vec<Button>>,
}

impl SendOptions {
    pub fn html() -> Self {
        Self {
            parse_mode: Some(ParseMode::Html),
            ..Self::default()
        }
    }

    /// Appends a row with a single button.
    pub fn with_button(mut self, button: Button) -> Self {
        self.buttons.push(vec![button]);
        self
    }

    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }
}

/// Answer to a button press.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackAnswer {
    /// Notification text shown to the presser. Empty answers only stop the
    /// client's loading indicator.
    pub text: Option<String>,
    /// Show the text as a modal alert instead of a toast.
    pub show_alert: bool,
}

impl CallbackAnswer {
    pub fn toast(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            show_alert: false,
        }
    }

    pub fn alert(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            show_alert: true,
        }
    }
}

/// A single inline query result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineResult {
    pub id: String,
    pub title: String,
    pub text: String,
}

// =============================================================================
// Chat membership
// =============================================================================

/// A member's role in a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Banned,
}

impl ChatRole {
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Creator | Self::Administrator)
    }
}

/// A user together with their role in a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMember {
    pub user: UserId,
    pub role: ChatRole,
}

// =============================================================================
// Transport
// =============================================================================

/// Outbound operations the engine and handlers perform on a platform.
///
/// Implementations must be safe to share across tasks; the engine holds a
/// single `Arc<dyn Transport>` and calls it from every in-flight event.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetches the bot's own identity.
    async fn identity(&self) -> TransportResult<BotIdentity>;

    /// Sends a new message to a chat.
    async fn send_message(&self, chat: ChatId, text: &str, options: &SendOptions) -> TransportResult<MessageRef>;

    /// Sends a message as a reply to another message.
    async fn reply(&self, target: MessageRef, text: &str, options: &SendOptions) -> TransportResult<MessageRef>;

    /// Deletes a message.
    async fn delete_message(&self, target: MessageRef) -> TransportResult<()>;

    /// Removes the buttons attached to a message.
    async fn remove_buttons(&self, target: MessageRef) -> TransportResult<()>;

    /// Answers a button press.
    async fn answer_callback(&self, query_id: &str, answer: &CallbackAnswer) -> TransportResult<()>;

    /// Answers an inline query.
    async fn answer_inline(&self, query_id: &str, results: &[InlineResult]) -> TransportResult<()>;

    /// Lists the administrators of a chat.
    async fn chat_administrators(&self, chat: ChatId) -> TransportResult<Vec<ChatMember>>;

    /// Counts the members of a chat.
    async fn member_count(&self, chat: ChatId) -> TransportResult<u64>;

    /// Publishes the command menu. Transports without a menu keep the default.
    async fn set_commands(&self, _commands: &[BotCommand]) -> TransportResult<()> {
        Ok(())
    }

    /// Acknowledges an event no handler took.
    ///
    /// Button presses and inline queries leave a loading indicator on the
    /// client until answered, so the default answers them with nothing.
    async fn acknowledge(&self, event: &Event) -> TransportResult<()> {
        match &event.payload {
            EventPayload::CallbackQuery(query) => self.answer_callback(&query.id, &CallbackAnswer::default()).await,
            EventPayload::InlineQuery(query) => self.answer_inline(&query.id, &[]).await,
            _ => Ok(()),
        }
    }
}

/// A shared transport handle.
pub type BoxedTransport = Arc<dyn Transport>;
