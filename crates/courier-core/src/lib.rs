//! # Courier Core
//!
//! Foundation types shared by every layer of the Courier bot engine.
//!
//! This crate owns no behaviour of its own. It defines:
//!
//! - **Event model**: the normalized [`Event`] a transport hands to the engine,
//!   together with its [`EventKind`] classification and chat/sender identity.
//! - **Collaborator interfaces**: the narrow traits the engine calls into
//!   ([`Transport`], [`EnablementPersistence`], [`AllowList`]).
//! - **Errors**: [`TransportError`] and [`PersistenceError`].
//!
//! ```text
//! ┌─────────────┐  Event   ┌──────────┐  callback  ┌──────────┐
//! │  Transport  │─────────▶│  Engine  │───────────▶│  Plugin  │
//! │ (platform)  │◀─────────│ (router) │            │ handler  │
//! └─────────────┘  reply   └──────────┘            └──────────┘
//! ```

pub mod error;
pub mod event;
pub mod identity;
pub mod persistence;
pub mod transport;

pub use error::{PersistenceError, PersistenceResult, TransportError, TransportResult};
pub use event::{
    CallbackQueryData, Chat, ChatId, ChatKind, Event, EventKind, EventPayload, InlineQueryData,
    MediaKind, MessageData, MessageEntity, MessageRef, QuotedMessage, Sender, UserId,
};
pub use identity::{BotCommand, BotIdentity};
pub use persistence::{AllowList, EnablementPersistence};
pub use transport::{
    BoxedTransport, Button, CallbackAnswer, ChatMember, ChatRole, InlineResult, ParseMode,
    SendOptions, Transport,
};
