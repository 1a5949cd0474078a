//! Normalized inbound events.
//!
//! A transport converts whatever the platform delivers into an [`Event`]:
//! the chat it happened in, who sent it, and a typed [`EventPayload`]. The
//! engine only ever looks at this shape.

use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// Identifiers
// =============================================================================

/// Platform identifier of a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

/// Platform identifier of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Chat and sender
// =============================================================================

/// The kind of conversation an event happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    /// One-to-one conversation with the bot.
    Private,
    /// Regular group.
    Group,
    /// Large group.
    Supergroup,
    /// Broadcast channel.
    Channel,
}

impl ChatKind {
    /// Returns `true` for groups and supergroups. Channels do not count.
    pub fn is_multi_user(self) -> bool {
        matches!(self, Self::Group | Self::Supergroup)
    }
}

/// A chat as seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub kind: ChatKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Chat {
    /// A private chat. Platforms reuse the user id as the chat id.
    pub fn private(id: i64) -> Self {
        Self {
            id: ChatId(id),
            kind: ChatKind::Private,
            title: None,
        }
    }

    /// A multi-user group chat.
    pub fn group(id: i64, title: impl Into<String>) -> Self {
        Self {
            id: ChatId(id),
            kind: ChatKind::Supergroup,
            title: Some(title.into()),
        }
    }

    pub fn is_multi_user(&self) -> bool {
        self.kind.is_multi_user()
    }
}

/// The user who caused an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub id: UserId,
    #[serde(default)]
    pub is_bot: bool,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl Sender {
    pub fn user(id: i64, display_name: impl Into<String>) -> Self {
        Self {
            id: UserId(id),
            is_bot: false,
            display_name: display_name.into(),
            username: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn bot(mut self) -> Self {
        self.is_bot = true;
        self
    }
}

/// Address of a single message, used as a reply or deletion target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: i64,
}

// =============================================================================
// Payloads
// =============================================================================

/// A message the current message replies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotedMessage {
    pub message_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<Sender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl QuotedMessage {
    /// Text of the quoted message, falling back to its caption.
    pub fn body(&self) -> Option<&str> {
        non_empty(self.text.as_deref()).or_else(|| non_empty(self.caption.as_deref()))
    }
}

/// Non-text content carried by a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Document,
    Voice,
    Audio,
    Video,
    VideoNote,
    Animation,
    Sticker,
    Location,
    Venue,
}

impl MediaKind {
    /// Returns `true` for uploaded files. Locations and venues are not files.
    pub fn is_file(self) -> bool {
        !matches!(self, Self::Location | Self::Venue)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Document => "document",
            Self::Voice => "voice",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::VideoNote => "video_note",
            Self::Animation => "animation",
            Self::Sticker => "sticker",
            Self::Location => "location",
            Self::Venue => "venue",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A marked-up span of a message, such as a mention or a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEntity {
    /// Platform name of the entity type, e.g. `mention` or `url`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Start of the span, in the platform's units.
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub length: usize,
}

impl MessageEntity {
    pub fn new(kind: impl Into<String>, offset: usize, length: usize) -> Self {
        Self {
            kind: kind.into(),
            offset,
            length,
        }
    }
}

/// Body of a new or edited message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageData {
    pub message_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaKind>,
    /// Entities of the text, or of the caption when the message has one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<MessageEntity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<Box<QuotedMessage>>,
}

impl MessageData {
    /// Whether the message carries media or entities.
    pub fn has_non_text_content(&self) -> bool {
        self.media.is_some() || !self.entities.is_empty()
    }

    pub fn has_entity(&self, kind: &str) -> bool {
        self.entities.iter().any(|entity| entity.kind == kind)
    }
}

/// A button press on a previously sent message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackQueryData {
    /// Query id used to answer the press.
    pub id: String,
    /// Opaque data attached to the pressed button.
    #[serde(default)]
    pub data: String,
    /// The message carrying the pressed button, if still accessible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<MessageRef>,
}

/// Text typed after the bot's handle in any chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineQueryData {
    pub id: String,
    #[serde(default)]
    pub query: String,
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    Message(MessageData),
    EditedMessage(MessageData),
    CallbackQuery(CallbackQueryData),
    InlineQuery(InlineQueryData),
    /// Anything the engine does not route, kept by name for logging.
    Unsupported { name: String },
}

/// Classification used to select handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Message,
    EditedMessage,
    CallbackQuery,
    InlineQuery,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::EditedMessage => "edited_message",
            Self::CallbackQuery => "callback_query",
            Self::InlineQuery => "inline_query",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Event
// =============================================================================

/// A normalized inbound event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic update number assigned by the platform.
    pub update_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat: Option<Chat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<Sender>,
    pub payload: EventPayload,
}

impl Event {
    /// A new text message.
    pub fn message(update_id: u64, chat: Chat, sender: Sender, message_id: i64, text: impl Into<String>) -> Self {
        Self {
            update_id,
            chat: Some(chat),
            sender: Some(sender),
            payload: EventPayload::Message(MessageData {
                message_id,
                text: Some(text.into()),
                caption: None,
                media: None,
                entities: Vec::new(),
                reply_to: None,
            }),
        }
    }

    /// A new message carrying media and no text.
    pub fn media(update_id: u64, chat: Chat, sender: Sender, message_id: i64, media: MediaKind) -> Self {
        Self {
            update_id,
            chat: Some(chat),
            sender: Some(sender),
            payload: EventPayload::Message(MessageData {
                message_id,
                text: None,
                caption: None,
                media: Some(media),
                entities: Vec::new(),
                reply_to: None,
            }),
        }
    }

    /// An edit of an earlier text message.
    pub fn edited_message(
        update_id: u64,
        chat: Chat,
        sender: Sender,
        message_id: i64,
        text: impl Into<String>,
    ) -> Self {
        let mut event = Self::message(update_id, chat, sender, message_id, text);
        if let EventPayload::Message(data) = event.payload {
            event.payload = EventPayload::EditedMessage(data);
        }
        event
    }

    /// A button press.
    pub fn callback_query(
        update_id: u64,
        chat: Chat,
        sender: Sender,
        id: impl Into<String>,
        data: impl Into<String>,
        message: Option<MessageRef>,
    ) -> Self {
        Self {
            update_id,
            chat: Some(chat),
            sender: Some(sender),
            payload: EventPayload::CallbackQuery(CallbackQueryData {
                id: id.into(),
                data: data.into(),
                message,
            }),
        }
    }

    /// An inline query. Inline queries carry no chat.
    pub fn inline_query(update_id: u64, sender: Sender, id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            update_id,
            chat: None,
            sender: Some(sender),
            payload: EventPayload::InlineQuery(InlineQueryData {
                id: id.into(),
                query: query.into(),
            }),
        }
    }

    /// Attaches a replied-to message to a message payload.
    pub fn replying_to(mut self, quoted: QuotedMessage) -> Self {
        if let EventPayload::Message(data) | EventPayload::EditedMessage(data) = &mut self.payload {
            data.reply_to = Some(Box::new(quoted));
        }
        self
    }

    /// Sets the caption of a message payload.
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        if let EventPayload::Message(data) | EventPayload::EditedMessage(data) = &mut self.payload {
            data.caption = Some(caption.into());
        }
        self
    }

    /// Adds an entity to a message payload.
    pub fn with_entity(mut self, entity: MessageEntity) -> Self {
        if let EventPayload::Message(data) | EventPayload::EditedMessage(data) = &mut self.payload {
            data.entities.push(entity);
        }
        self
    }

    /// Returns the routing kind, or `None` for unsupported payloads.
    pub fn kind(&self) -> Option<EventKind> {
        match &self.payload {
            EventPayload::Message(_) => Some(EventKind::Message),
            EventPayload::EditedMessage(_) => Some(EventKind::EditedMessage),
            EventPayload::CallbackQuery(_) => Some(EventKind::CallbackQuery),
            EventPayload::InlineQuery(_) => Some(EventKind::InlineQuery),
            EventPayload::Unsupported { .. } => None,
        }
    }

    /// The string triggers are matched against.
    ///
    /// Messages use their caption when one is present, otherwise their text.
    /// Callbacks use the button data and inline queries the typed query.
    /// Empty strings are reported as `None`.
    pub fn subject(&self) -> Option<&str> {
        match &self.payload {
            EventPayload::Message(data) | EventPayload::EditedMessage(data) => {
                non_empty(data.caption.as_deref()).or_else(|| non_empty(data.text.as_deref()))
            }
            EventPayload::CallbackQuery(data) => non_empty(Some(&data.data)),
            EventPayload::InlineQuery(data) => non_empty(Some(&data.query)),
            EventPayload::Unsupported { .. } => None,
        }
    }

    /// The message data of a new or edited message.
    pub fn message_data(&self) -> Option<&MessageData> {
        match &self.payload {
            EventPayload::Message(data) | EventPayload::EditedMessage(data) => Some(data),
            _ => None,
        }
    }

    /// The message this event should be answered under, if any.
    pub fn reply_target(&self) -> Option<MessageRef> {
        match &self.payload {
            EventPayload::Message(data) | EventPayload::EditedMessage(data) => {
                self.chat.as_ref().map(|chat| MessageRef {
                    chat_id: chat.id,
                    message_id: data.message_id,
                })
            }
            EventPayload::CallbackQuery(data) => data.message,
            _ => None,
        }
    }

    /// The message the sender replied to, for message events.
    pub fn quoted(&self) -> Option<&QuotedMessage> {
        self.message_data().and_then(|data| data.reply_to.as_deref())
    }

    pub fn chat_id(&self) -> Option<ChatId> {
        self.chat.as_ref().map(|chat| chat.id)
    }

    pub fn sender_id(&self) -> Option<UserId> {
        self.sender.as_ref().map(|sender| sender.id)
    }

    /// Returns `true` when the event happened in a multi-user chat.
    pub fn in_multi_user_chat(&self) -> bool {
        self.chat.as_ref().is_some_and(Chat::is_multi_user)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}
