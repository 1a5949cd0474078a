//! # Courier Framework
//!
//! Routing and policy for the Courier bot engine.
//!
//! This layer provides:
//! - [`Trigger`] matching on text patterns (with the bot username bound in),
//!   media kinds and message entities
//! - [`HandlerSpec`]/[`Handler`] for commands, button presses and inline queries
//! - [`Plugin`] and [`PluginRegistry`] for grouping handlers
//! - [`PermissionGate`], [`CooldownLimiter`] and [`EnablementStore`] policies
//! - [`Engine`], which routes each event to at most one handler
//!
//! Built-in `manager` and `allow` plugins live behind the `builtin` feature.

pub mod context;
pub mod cooldown;
pub mod enablement;
pub mod engine;
pub mod error;
pub mod handler;
pub mod memory;
pub mod permission;
pub mod plugin;
pub mod trigger;

pub use context::HandlerContext;
pub use cooldown::{Cooldown, CooldownLimiter, CooldownScope, HandlerId, ScopeKey};
pub use enablement::EnablementStore;
pub use engine::{DispatchOutcome, Engine, EngineBuilder};
pub use error::{AllowError, EnablementError, EnablementResult, EngineError, RegistryError, TriggerError};
pub use handler::{Callback, Handler, HandlerKind, HandlerResponse, HandlerService, HandlerSpec, callback};
pub use memory::{InMemoryAllowList, InMemoryEnablement};
pub use permission::{AccessPolicy, PermissionGate};
pub use plugin::{BoxedPlugin, Plugin, PluginRegistry};
pub use trigger::{BOT_PLACEHOLDER, Matches, MessageFilter, Trigger, TriggerTemplate};

#[cfg(feature = "builtin")]
pub use plugin::builtin::{AllowPlugin, ManagerPlugin};

pub use tower::BoxError;
