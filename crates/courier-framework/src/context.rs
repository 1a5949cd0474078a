//! The context handed to handler callbacks.
//!
//! One [`HandlerContext`] is created for each handler invocation. It bundles
//! the event, the trigger captures, the bot identity and the transport, and
//! carries a correlation id that ties every log line of the invocation
//! together.

use std::fmt;
use std::sync::Arc;

use courier_core::{
    BotIdentity, CallbackAnswer, Chat, Event, EventPayload, InlineResult, MessageRef, SendOptions, Sender, Transport,
    TransportError, TransportResult,
};
use uuid::Uuid;

use crate::trigger::Matches;

/// Everything a handler callback may use.
pub struct HandlerContext {
    event: Arc<Event>,
    matches: Matches,
    transport: Arc<dyn Transport>,
    bot: Arc<BotIdentity>,
    plugin: Arc<str>,
    correlation_id: Uuid,
}

impl HandlerContext {
    /// Creates a context with a fresh correlation id.
    pub fn new(
        event: Arc<Event>,
        matches: Matches,
        transport: Arc<dyn Transport>,
        bot: Arc<BotIdentity>,
        plugin: Arc<str>,
    ) -> Self {
        Self {
            event,
            matches,
            transport,
            bot,
            plugin,
            correlation_id: Uuid::new_v4(),
        }
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Captures of the trigger that selected this handler.
    pub fn matches(&self) -> &Matches {
        &self.matches
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn bot(&self) -> &BotIdentity {
        &self.bot
    }

    /// Name of the plugin that owns the handler.
    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    pub fn chat(&self) -> Option<&Chat> {
        self.event.chat.as_ref()
    }

    pub fn sender(&self) -> Option<&Sender> {
        self.event.sender.as_ref()
    }

    /// A user-facing failure message carrying the correlation id, so reports
    /// can be matched against the logs.
    pub fn failure_notice(&self) -> String {
        format!("Something went wrong. Reference: {}", self.correlation_id)
    }

    /// Replies to the triggering message with plain text.
    pub async fn reply(&self, text: &str) -> TransportResult<MessageRef> {
        self.reply_with(text, &SendOptions::default()).await
    }

    /// Replies to the triggering message.
    ///
    /// Falls back to a plain message in the chat when the event carries no
    /// reply target.
    pub async fn reply_with(&self, text: &str, options: &SendOptions) -> TransportResult<MessageRef> {
        if let Some(target) = self.event.reply_target() {
            return self.transport.reply(target, text, options).await;
        }
        self.send_with(text, options).await
    }

    /// Sends a new message to the event's chat.
    pub async fn send_with(&self, text: &str, options: &SendOptions) -> TransportResult<MessageRef> {
        let chat = self.event.chat_id().ok_or(TransportError::Unsupported("send without chat"))?;
        self.transport.send_message(chat, text, options).await
    }

    /// Answers the button press that triggered this handler.
    pub async fn answer(&self, answer: &CallbackAnswer) -> TransportResult<()> {
        match &self.event.payload {
            EventPayload::CallbackQuery(query) => self.transport.answer_callback(&query.id, answer).await,
            _ => Err(TransportError::Unsupported("answer outside callback")),
        }
    }

    /// Answers the inline query that triggered this handler.
    pub async fn answer_inline(&self, results: &[InlineResult]) -> TransportResult<()> {
        match &self.event.payload {
            EventPayload::InlineQuery(query) => self.transport.answer_inline(&query.id, results).await,
            _ => Err(TransportError::Unsupported("inline answer outside inline query")),
        }
    }
}

impl fmt::Debug for HandlerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerContext")
            .field("plugin", &self.plugin)
            .field("update_id", &self.event.update_id)
            .field("correlation_id", &self.correlation_id)
            .finish_non_exhaustive()
    }
}
