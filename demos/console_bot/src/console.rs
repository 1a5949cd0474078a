//! A transport that reads events from stdin and prints replies to stdout.
//!
//! Input lines:
//!
//! | Line             | Event                                        |
//! |------------------|----------------------------------------------|
//! | `text`           | message from the current user                |
//! | `~text`          | edit of the user's previous message          |
//! | `>text`          | message replying to the bot's last message   |
//! | `!data`          | press of a button on the bot's last message  |
//! | `?query`         | inline query                                 |
//! | `#kind [caption]`| media message, e.g. `#photo` or `#location`  |
//! | `:as <user id>`  | switch the current user                      |
//! | `:private`       | talk to the bot privately                    |
//! | `:group`         | talk in the group chat                       |

use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use courier::core::{
    BotCommand, BotIdentity, CallbackAnswer, Chat, ChatId, ChatMember, ChatRole, Event, InlineResult, MediaKind,
    MessageRef, QuotedMessage, SendOptions, Sender, Transport, TransportResult, UserId,
};
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};

pub struct ConsoleTransport {
    bot: BotIdentity,
    admins: HashSet<UserId>,
    next_message_id: AtomicI64,
    last_sent: Mutex<Option<(MessageRef, String)>>,
}

impl ConsoleTransport {
    pub fn new(bot: BotIdentity, admins: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            bot,
            admins: admins.into_iter().collect(),
            next_message_id: AtomicI64::new(1),
            last_sent: Mutex::new(None),
        }
    }

    fn next_id(&self) -> i64 {
        self.next_message_id.fetch_add(1, Ordering::Relaxed)
    }

    fn print(&self, chat: ChatId, text: &str, options: &SendOptions) -> MessageRef {
        let target = MessageRef {
            chat_id: chat,
            message_id: self.next_id(),
        };
        println!("[{chat}] @{}: {text}", self.bot.username);
        for row in &options.buttons {
            let labels: Vec<String> = row.iter().map(|b| format!("[{}] (!{})", b.text, b.callback_data)).collect();
            println!("    {}", labels.join("  "));
        }
        *self.last_sent.lock() = Some((target, text.to_string()));
        target
    }

    fn last_sent(&self) -> Option<(MessageRef, String)> {
        self.last_sent.lock().clone()
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    async fn identity(&self) -> TransportResult<BotIdentity> {
        Ok(self.bot.clone())
    }

    async fn send_message(&self, chat: ChatId, text: &str, options: &SendOptions) -> TransportResult<MessageRef> {
        Ok(self.print(chat, text, options))
    }

    async fn reply(&self, target: MessageRef, text: &str, options: &SendOptions) -> TransportResult<MessageRef> {
        print!("(re #{}) ", target.message_id);
        Ok(self.print(target.chat_id, text, options))
    }

    async fn delete_message(&self, target: MessageRef) -> TransportResult<()> {
        println!("    (message #{} deleted)", target.message_id);
        Ok(())
    }

    async fn remove_buttons(&self, target: MessageRef) -> TransportResult<()> {
        println!("    (buttons removed from #{})", target.message_id);
        Ok(())
    }

    async fn answer_callback(&self, query_id: &str, answer: &CallbackAnswer) -> TransportResult<()> {
        match &answer.text {
            Some(text) => println!("    (answer to {query_id}: {text})"),
            None => debug!(query_id, "Callback acknowledged"),
        }
        Ok(())
    }

    async fn answer_inline(&self, query_id: &str, results: &[InlineResult]) -> TransportResult<()> {
        println!("    (inline {query_id}: {} results)", results.len());
        for result in results {
            println!("      - {}: {}", result.title, result.text);
        }
        Ok(())
    }

    async fn chat_administrators(&self, _chat: ChatId) -> TransportResult<Vec<ChatMember>> {
        Ok(self
            .admins
            .iter()
            .map(|&user| ChatMember {
                user,
                role: ChatRole::Administrator,
            })
            .collect())
    }

    async fn member_count(&self, _chat: ChatId) -> TransportResult<u64> {
        Ok(self.admins.len() as u64 + 1)
    }

    async fn set_commands(&self, commands: &[BotCommand]) -> TransportResult<()> {
        let menu: Vec<String> = commands.iter().map(|c| format!("/{} - {}", c.command, c.description)).collect();
        info!(commands = ?menu, "Command menu");
        Ok(())
    }
}

/// Where and as whom console input is sent.
pub struct Session {
    group: Chat,
    private: bool,
    user: i64,
    update_id: u64,
    last_message: Option<i64>,
}

impl Session {
    pub fn new(group: Chat, user: i64) -> Self {
        Self {
            group,
            private: false,
            user,
            update_id: 0,
            last_message: None,
        }
    }

    fn chat(&self) -> Chat {
        if self.private {
            Chat::private(self.user)
        } else {
            self.group.clone()
        }
    }

    fn sender(&self) -> Sender {
        Sender::user(self.user, format!("user {}", self.user))
    }

    fn next_update(&mut self) -> u64 {
        self.update_id += 1;
        self.update_id
    }

    /// Turns one input line into an event, or applies a session command.
    pub fn parse(&mut self, line: &str, transport: &ConsoleTransport) -> Option<Event> {
        let line = line.trim_end();
        if let Some(command) = line.strip_prefix(':') {
            self.apply(command);
            return None;
        }

        let update_id = self.next_update();
        let (chat, sender) = (self.chat(), self.sender());

        if let Some(data) = line.strip_prefix('!') {
            let message = transport.last_sent().map(|(target, _)| target);
            return Some(Event::callback_query(
                update_id,
                chat,
                sender,
                format!("cb-{update_id}"),
                data,
                message,
            ));
        }
        if let Some(query) = line.strip_prefix('?') {
            return Some(Event::inline_query(update_id, sender, format!("iq-{update_id}"), query));
        }
        if let Some(text) = line.strip_prefix('~') {
            let message_id = self.last_message?;
            return Some(Event::edited_message(update_id, chat, sender, message_id, text));
        }

        if let Some(rest) = line.strip_prefix('#') {
            let (name, caption) = rest.split_once(' ').unwrap_or((rest, ""));
            let Some(kind) = media_kind(name) else {
                println!("    (unknown media kind {name})");
                return None;
            };
            let message_id = transport.next_id();
            self.last_message = Some(message_id);
            let event = Event::media(update_id, chat, sender, message_id, kind);
            return Some(if caption.is_empty() { event } else { event.with_caption(caption) });
        }

        let message_id = transport.next_id();
        self.last_message = Some(message_id);
        if let Some(text) = line.strip_prefix('>') {
            let event = Event::message(update_id, chat, sender, message_id, text);
            return Some(match transport.last_sent() {
                Some((target, body)) => event.replying_to(QuotedMessage {
                    message_id: target.message_id,
                    sender: Some(Sender::user(transport.bot.id.0, transport.bot.username.clone()).bot()),
                    text: Some(body),
                    caption: None,
                }),
                None => event,
            });
        }
        Some(Event::message(update_id, chat, sender, message_id, line))
    }

    fn apply(&mut self, command: &str) {
        let mut parts = command.split_whitespace();
        match (parts.next(), parts.next().map(str::parse::<i64>)) {
            (Some("as"), Some(Ok(user))) => {
                self.user = user;
                println!("    (now user {user})");
            }
            (Some("private"), _) => {
                self.private = true;
                println!("    (private chat)");
            }
            (Some("group"), _) => {
                self.private = false;
                println!("    (group chat {})", self.group.id);
            }
            _ => println!("    (unknown command :{command})"),
        }
    }
}

/// Feeds stdin lines into the engine until EOF.
pub async fn read_events(transport: std::sync::Arc<ConsoleTransport>, mut session: Session, events: mpsc::Sender<Event>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => continue,
            Ok(Some(line)) => {
                let Some(event) = session.parse(&line, &transport) else {
                    continue;
                };
                if events.send(event).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read stdin");
                break;
            }
        }
    }
    info!("Input closed");
}

fn media_kind(name: &str) -> Option<MediaKind> {
    let kind = match name {
        "photo" => MediaKind::Photo,
        "document" => MediaKind::Document,
        "voice" => MediaKind::Voice,
        "audio" => MediaKind::Audio,
        "video" => MediaKind::Video,
        "sticker" => MediaKind::Sticker,
        "location" => MediaKind::Location,
        "venue" => MediaKind::Venue,
        _ => return None,
    };
    Some(kind)
}
