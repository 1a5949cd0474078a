//! Plugin system.
//!
//! A plugin is a named group of handlers together with the commands it
//! advertises in the client menu:
//!
//! ```rust,ignore
//! struct Ping;
//!
//! impl Plugin for Ping {
//!     fn name(&self) -> &str {
//!         "ping"
//!     }
//!
//!     fn commands(&self) -> Vec<BotCommand> {
//!         vec![BotCommand::new("ping", "Check that the bot is alive")]
//!     }
//!
//!     fn handlers(self: Arc<Self>) -> Vec<HandlerSpec> {
//!         vec![HandlerSpec::command(
//!             r"(?i)^/ping(?:@{bot})?$",
//!             callback(|_ctx| async { "pong".to_string() }),
//!         )]
//!     }
//! }
//! ```
//!
//! Plugins are registered with a [`PluginRegistry`] in the order they should
//! be consulted. The first plugin whose handler accepts an event wins.

#[cfg(feature = "builtin")]
pub mod builtin;
pub mod registry;

use std::sync::Arc;

use courier_core::BotCommand;

use crate::handler::HandlerSpec;

pub use registry::PluginRegistry;

/// A named group of handlers.
pub trait Plugin: Send + Sync + 'static {
    /// Unique, stable name used for enablement and logging.
    fn name(&self) -> &str;

    /// Commands shown in the client menu while the plugin is enabled.
    fn commands(&self) -> Vec<BotCommand> {
        Vec::new()
    }

    /// Declares the plugin's handlers in evaluation order.
    ///
    /// Called once when the engine is built. Callbacks usually capture a clone
    /// of `self` to reach plugin state.
    fn handlers(self: Arc<Self>) -> Vec<HandlerSpec>;

    /// Protected plugins are always enabled and cannot be switched off.
    fn is_protected(&self) -> bool {
        false
    }
}

/// A shared plugin handle.
pub type BoxedPlugin = Arc<dyn Plugin>;
