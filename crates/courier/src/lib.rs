//! # Courier
//!
//! A chat-bot engine that routes incoming events to plugin handlers and
//! enforces who may trigger what, where and how often.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌─────────────────────────────────────────────┐   ┌──────────┐
//! │ Transport │──▶│ Engine                                      │──▶│ Handler  │
//! │ (events)  │   │  enablement ▶ scope ▶ trigger ▶ admin ▶ rate │   │ callback │
//! └───────────┘   └─────────────────────────────────────────────┘   └──────────┘
//!       ▲                                                                │
//!       └──────────────────────── replies ───────────────────────────────┘
//! ```
//!
//! - **Runtime**: configuration, logging and the event loop
//! - **Engine**: picks the first authorised, matching handler per event
//! - **Plugins**: named units of handlers, switchable globally or per chat
//! - **Transport**: whatever speaks to the chat platform
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use courier::prelude::*;
//!
//! struct Ping;
//!
//! impl Plugin for Ping {
//!     fn name(&self) -> &str {
//!         "ping"
//!     }
//!
//!     fn handlers(self: Arc<Self>) -> Vec<HandlerSpec> {
//!         vec![HandlerSpec::command(
//!             r"(?i)^/ping(?:@{bot})?$",
//!             callback(|_ctx| async { "pong".to_string() }),
//!         )]
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut runtime = CourierRuntime::builder().build()?;
//!     logging::init_from_config(&runtime.config().logging);
//!     runtime.register_plugin(Ping)?;
//!     runtime.run(transport, events).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `builtin-plugins` *(default)*: the `manager` and `allow` plugins
//! - `toml-config` *(default)* / `yaml-config`: configuration file formats
//! - `json-log`: JSON log lines

pub use courier_core as core;
pub use courier_framework as framework;
pub use courier_runtime as runtime;

pub use courier_runtime::{config, logging};

/// Everything a plugin or a bot binary usually needs.
///
/// ```rust,ignore
/// use courier::prelude::*;
/// ```
pub mod prelude {
    pub use std::sync::Arc;

    // Runtime
    pub use courier_runtime::{CourierConfig, CourierRuntime, RuntimeError, logging};

    // Plugins and handlers
    pub use courier_framework::{
        BoxError, Cooldown, CooldownScope, HandlerContext, HandlerSpec, Matches, MessageFilter, Plugin, callback,
    };

    // Engine-level types for embedding without the runtime
    pub use courier_framework::{DispatchOutcome, EnablementStore, Engine};

    #[cfg(feature = "builtin-plugins")]
    pub use courier_framework::{AllowPlugin, ManagerPlugin};

    // Event model and transport
    pub use courier_core::{
        AllowList, BotCommand, BotIdentity, Button, CallbackAnswer, Chat, ChatId, ChatKind, EnablementPersistence,
        Event, EventKind, InlineResult, MediaKind, MessageEntity, MessageRef, SendOptions, Sender, Transport,
        TransportError, UserId,
    };
}
