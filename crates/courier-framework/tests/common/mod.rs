#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use courier_core::{
    BotCommand, BotIdentity, CallbackAnswer, Chat, ChatId, ChatMember, ChatRole, Event, InlineResult, MessageRef,
    SendOptions, Sender, Transport, TransportError, TransportResult, UserId,
};
use courier_framework::{Callback, HandlerSpec, Plugin, callback};
use parking_lot::Mutex;

pub const BOT: &str = "courier_bot";
pub const ADMIN: i64 = 1;
pub const MEMBER: i64 = 2;
pub const GROUP: i64 = 123;
pub const OTHER_GROUP: i64 = 456;

pub fn bot() -> BotIdentity {
    BotIdentity::new(999, BOT)
}

pub fn group(id: i64) -> Chat {
    Chat::group(id, format!("group {id}"))
}

pub fn user(id: i64) -> Sender {
    Sender::user(id, format!("user {id}"))
}

pub fn message(chat: Chat, sender: i64, text: &str) -> Arc<Event> {
    Arc::new(Event::message(1, chat, user(sender), 10, text))
}

// =============================================================================
// RecordingTransport
// =============================================================================

/// What the transport was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Send { chat: ChatId, text: String },
    Reply { target: MessageRef, text: String },
    Delete(MessageRef),
    RemoveButtons(MessageRef),
    AnswerCallback { id: String, text: Option<String> },
    AnswerInline { id: String, results: usize },
    SetCommands(Vec<BotCommand>),
}

#[derive(Default)]
pub struct RecordingTransport {
    pub outbound: Mutex<Vec<Outbound>>,
    admins: Mutex<HashMap<ChatId, Vec<ChatMember>>>,
    fail_admin_lookup: Mutex<bool>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        let transport = Self::default();
        transport.set_admin(GROUP, ADMIN);
        transport.set_admin(OTHER_GROUP, ADMIN);
        Arc::new(transport)
    }

    pub fn set_admin(&self, chat: i64, user: i64) {
        self.admins.lock().entry(ChatId(chat)).or_default().push(ChatMember {
            user: UserId(user),
            role: ChatRole::Administrator,
        });
    }

    pub fn fail_admin_lookup(&self) {
        *self.fail_admin_lookup.lock() = true;
    }

    pub fn outbound(&self) -> Vec<Outbound> {
        self.outbound.lock().clone()
    }

    /// Texts of every reply and message, in order.
    pub fn texts(&self) -> Vec<String> {
        self.outbound
            .lock()
            .iter()
            .filter_map(|o| match o {
                Outbound::Send { text, .. } | Outbound::Reply { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, outbound: Outbound) {
        self.outbound.lock().push(outbound);
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn identity(&self) -> TransportResult<BotIdentity> {
        Ok(bot())
    }

    async fn send_message(&self, chat: ChatId, text: &str, _options: &SendOptions) -> TransportResult<MessageRef> {
        self.record(Outbound::Send {
            chat,
            text: text.to_string(),
        });
        Ok(MessageRef {
            chat_id: chat,
            message_id: 1000,
        })
    }

    async fn reply(&self, target: MessageRef, text: &str, _options: &SendOptions) -> TransportResult<MessageRef> {
        self.record(Outbound::Reply {
            target,
            text: text.to_string(),
        });
        Ok(MessageRef {
            chat_id: target.chat_id,
            message_id: 1001,
        })
    }

    async fn delete_message(&self, target: MessageRef) -> TransportResult<()> {
        self.record(Outbound::Delete(target));
        Ok(())
    }

    async fn remove_buttons(&self, target: MessageRef) -> TransportResult<()> {
        self.record(Outbound::RemoveButtons(target));
        Ok(())
    }

    async fn answer_callback(&self, query_id: &str, answer: &CallbackAnswer) -> TransportResult<()> {
        self.record(Outbound::AnswerCallback {
            id: query_id.to_string(),
            text: answer.text.clone(),
        });
        Ok(())
    }

    async fn answer_inline(&self, query_id: &str, results: &[InlineResult]) -> TransportResult<()> {
        self.record(Outbound::AnswerInline {
            id: query_id.to_string(),
            results: results.len(),
        });
        Ok(())
    }

    async fn chat_administrators(&self, chat: ChatId) -> TransportResult<Vec<ChatMember>> {
        if *self.fail_admin_lookup.lock() {
            return Err(TransportError::Timeout);
        }
        Ok(self.admins.lock().get(&chat).cloned().unwrap_or_default())
    }

    async fn member_count(&self, _chat: ChatId) -> TransportResult<u64> {
        Ok(3)
    }

    async fn set_commands(&self, commands: &[BotCommand]) -> TransportResult<()> {
        self.record(Outbound::SetCommands(commands.to_vec()));
        Ok(())
    }
}

// =============================================================================
// Test plugins
// =============================================================================

/// Records which callbacks ran and with which captures.
#[derive(Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<(String, Vec<String>)>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A callback that records `label` and the positional captures.
    pub fn callback(&self, label: &str) -> Callback {
        let calls = Arc::clone(&self.calls);
        let label = label.to_string();
        callback(move |ctx| {
            let calls = Arc::clone(&calls);
            let label = label.clone();
            async move {
                let matches = ctx.matches();
                let groups = (0..matches.len())
                    .filter_map(|i| matches.get(i).map(str::to_string))
                    .collect();
                calls.lock().push((label, groups));
            }
        })
    }

    pub fn labels(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(label, _)| label.clone()).collect()
    }

    pub fn groups(&self, call: usize) -> Vec<String> {
        self.calls.lock()[call].1.clone()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().len()
    }
}

/// A plugin assembled from ready-made handler specs.
pub struct TestPlugin {
    name: String,
    commands: Vec<BotCommand>,
    specs: Mutex<Vec<HandlerSpec>>,
}

impl TestPlugin {
    pub fn new(name: &str, specs: Vec<HandlerSpec>) -> Self {
        Self {
            name: name.to_string(),
            commands: Vec::new(),
            specs: Mutex::new(specs),
        }
    }

    pub fn with_command(mut self, command: &str) -> Self {
        self.commands.push(BotCommand::new(command, format!("{command} description")));
        self
    }
}

impl Plugin for TestPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn commands(&self) -> Vec<BotCommand> {
        self.commands.clone()
    }

    fn handlers(self: Arc<Self>) -> Vec<HandlerSpec> {
        std::mem::take(&mut *self.specs.lock())
    }
}
