//! The event router.
//!
//! [`Engine`] owns the bound plugins and every policy component. For each
//! event it:
//!
//! 1. Classifies the event and checks it carries text, media or entities.
//! 2. Applies the access policy.
//! 3. Walks plugins in registration order, skipping disabled ones.
//! 4. Walks each plugin's handlers for the event kind and runs the scope
//!    check, the trigger, the permission check and the cooldown, in that
//!    order.
//! 5. Invokes the first handler that passes everything.
//!
//! At most one handler runs per event.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use courier_core::{
    AllowList, BotCommand, BotIdentity, Chat, EnablementPersistence, Event, EventKind, MessageData, Transport,
    TransportResult, UserId,
};
use futures::FutureExt;
use tracing::{Instrument, debug, debug_span, error, trace, warn};

use crate::context::HandlerContext;
use crate::cooldown::{CooldownLimiter, DEFAULT_CAPACITY, HandlerId};
use crate::enablement::EnablementStore;
use crate::error::{EngineError, RegistryError};
use crate::handler::{Handler, HandlerKind};
use crate::memory::{InMemoryAllowList, InMemoryEnablement};
use crate::permission::{AccessPolicy, PermissionGate};
use crate::plugin::{Plugin, PluginRegistry};
use crate::trigger::Matches;

// =============================================================================
// DispatchOutcome
// =============================================================================

/// What happened to a dispatched event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The payload kind is not routed.
    Unsupported,
    /// The event carried nothing to match against.
    Empty,
    /// The access policy rejected the sender.
    Denied,
    /// No handler accepted the event.
    Unhandled,
    /// A handler ran.
    Handled {
        plugin: Arc<str>,
        handler: usize,
        /// The handler returned an error or panicked.
        failed: bool,
    },
}

impl DispatchOutcome {
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handled { .. })
    }
}

// =============================================================================
// EngineBuilder
// =============================================================================

/// Collects plugins and collaborators for an [`Engine`].
pub struct EngineBuilder {
    registry: PluginRegistry,
    transport: Option<Arc<dyn Transport>>,
    enablement: Option<Arc<EnablementStore>>,
    allow_list: Option<Arc<dyn AllowList>>,
    superusers: Vec<UserId>,
    access: AccessPolicy,
    cooldown_capacity: usize,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            registry: PluginRegistry::new(),
            transport: None,
            enablement: None,
            allow_list: None,
            superusers: Vec::new(),
            access: AccessPolicy::Open,
            cooldown_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Shares an enablement store, typically with the manager plugin.
    pub fn enablement(mut self, store: Arc<EnablementStore>) -> Self {
        self.enablement = Some(store);
        self
    }

    /// Uses a persistence backend for a store owned by the engine.
    pub fn enablement_persistence(self, persistence: Arc<dyn EnablementPersistence>) -> Self {
        self.enablement(Arc::new(EnablementStore::new(persistence)))
    }

    pub fn allow_list(mut self, allow_list: Arc<dyn AllowList>) -> Self {
        self.allow_list = Some(allow_list);
        self
    }

    pub fn superusers(mut self, users: impl IntoIterator<Item = UserId>) -> Self {
        self.superusers.extend(users);
        self
    }

    pub fn access(mut self, access: AccessPolicy) -> Self {
        self.access = access;
        self
    }

    pub fn cooldown_capacity(mut self, capacity: usize) -> Self {
        self.cooldown_capacity = capacity;
        self
    }

    /// Appends a plugin.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) -> Result<(), RegistryError> {
        self.registry.register(plugin)
    }

    /// Appends a plugin (builder form).
    pub fn with_plugin(mut self, plugin: impl Plugin) -> Result<Self, RegistryError> {
        self.registry.register(Arc::new(plugin))?;
        Ok(self)
    }

    /// Replaces the registry wholesale.
    pub fn registry(mut self, registry: PluginRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Binds every trigger to the bot's username.
    ///
    /// Fails on the first trigger that does not compile.
    pub fn build(self, bot: BotIdentity) -> Result<Engine, EngineError> {
        let transport = self.transport.ok_or(EngineError::MissingTransport)?;
        let enablement = self
            .enablement
            .unwrap_or_else(|| Arc::new(EnablementStore::new(Arc::new(InMemoryEnablement::new(true)))));
        let allow_list = self
            .allow_list
            .unwrap_or_else(|| Arc::new(InMemoryAllowList::new()));

        let mut plugins = Vec::with_capacity(self.registry.len());
        for plugin in self.registry.iter() {
            let name: Arc<str> = Arc::from(plugin.name());
            enablement.register(&name);
            if plugin.is_protected() {
                enablement.protect(&name);
            }
            let handlers = Arc::clone(plugin)
                .handlers()
                .into_iter()
                .enumerate()
                .map(|(index, spec)| spec.bind(HandlerId::new(Arc::clone(&name), index), &bot.username))
                .collect::<Result<Vec<_>, _>>()?;
            debug!(plugin = %name, handlers = handlers.len(), "Plugin bound");
            plugins.push(BoundPlugin {
                plugin: Arc::clone(plugin),
                name,
                handlers,
            });
        }

        let gate = PermissionGate::new(Arc::clone(&transport), allow_list)
            .with_superusers(self.superusers)
            .with_access(self.access);

        Ok(Engine {
            bot: Arc::new(bot),
            plugins,
            transport,
            enablement,
            gate,
            cooldowns: CooldownLimiter::new(self.cooldown_capacity),
        })
    }
}

// =============================================================================
// Engine
// =============================================================================

struct BoundPlugin {
    plugin: Arc<dyn Plugin>,
    name: Arc<str>,
    handlers: Vec<Handler>,
}

impl BoundPlugin {
    fn handles(&self, kind: EventKind) -> bool {
        self.handlers.iter().any(|h| h.accepts(kind))
    }
}

/// Routes events to plugin handlers.
pub struct Engine {
    bot: Arc<BotIdentity>,
    plugins: Vec<BoundPlugin>,
    transport: Arc<dyn Transport>,
    enablement: Arc<EnablementStore>,
    gate: PermissionGate,
    cooldowns: CooldownLimiter,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn bot(&self) -> &BotIdentity {
        &self.bot
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn enablement(&self) -> &Arc<EnablementStore> {
        &self.enablement
    }

    pub fn permissions(&self) -> &PermissionGate {
        &self.gate
    }

    /// Plugin names in registration order.
    pub fn plugin_names(&self) -> impl Iterator<Item = &str> {
        self.plugins.iter().map(|p| &*p.name)
    }

    /// Handlers of one plugin, in declaration order.
    pub fn handlers(&self, plugin: &str) -> Option<&[Handler]> {
        self.plugins.iter().find(|p| &*p.name == plugin).map(|p| p.handlers.as_slice())
    }

    /// Commands of every plugin enabled in `chat`, in registration order.
    pub async fn command_menu(&self, chat: Option<&Chat>) -> Vec<BotCommand> {
        let mut menu = Vec::new();
        for plugin in &self.plugins {
            if self.enablement.is_effectively_enabled(chat, &plugin.name).await {
                menu.extend(plugin.plugin.commands());
            }
        }
        menu
    }

    /// Publishes the global command menu through the transport.
    pub async fn publish_commands(&self) -> TransportResult<()> {
        let menu = self.command_menu(None).await;
        debug!(commands = menu.len(), "Publishing command menu");
        self.transport.set_commands(&menu).await
    }

    /// Routes one event and runs at most one handler.
    pub async fn dispatch(&self, event: Arc<Event>) -> DispatchOutcome {
        let Some(kind) = event.kind() else {
            trace!(update_id = event.update_id, "Ignoring unsupported event");
            return DispatchOutcome::Unsupported;
        };
        let span = debug_span!(
            "dispatch",
            update_id = event.update_id,
            event_kind = %kind,
            chat_id = ?event.chat_id().map(|c| c.0),
            user_id = ?event.sender_id().map(|u| u.0),
        );
        self.route(kind, event).instrument(span).await
    }

    async fn route(&self, kind: EventKind, event: Arc<Event>) -> DispatchOutcome {
        if event.subject().is_none() && !event.message_data().is_some_and(MessageData::has_non_text_content) {
            debug!("Event carries nothing to match");
            return DispatchOutcome::Empty;
        }
        if !self.gate.admits_event(&event).await {
            debug!("Sender is not allowed to use the bot");
            return DispatchOutcome::Denied;
        }

        for plugin in &self.plugins {
            if !plugin.handles(kind) {
                continue;
            }
            if !self.enablement.is_effectively_enabled(event.chat.as_ref(), &plugin.name).await {
                trace!(plugin = %plugin.name, "Plugin disabled here");
                continue;
            }

            for handler in plugin.handlers.iter().filter(|h| h.accepts(kind)) {
                if !self.gate.in_scope(handler, &event) {
                    continue;
                }
                let Some(matches) = handler.trigger().matches(&event) else {
                    continue;
                };
                if !self.gate.allow(handler, &event).await {
                    debug!(plugin = %plugin.name, trigger = %handler.trigger(), "Permission denied");
                    continue;
                }
                if !self.try_cooldown(handler, &event) {
                    debug!(plugin = %plugin.name, trigger = %handler.trigger(), "Handler cooling down");
                    continue;
                }

                let failed = self.invoke(plugin, handler, Arc::clone(&event), matches).await;
                return DispatchOutcome::Handled {
                    plugin: Arc::clone(&plugin.name),
                    handler: handler.id().index,
                    failed,
                };
            }
        }

        trace!("No handler accepted the event");
        DispatchOutcome::Unhandled
    }

    fn try_cooldown(&self, handler: &Handler, event: &Event) -> bool {
        let Some(cooldown) = handler.cooldown() else {
            return true;
        };
        self.cooldowns
            .try_acquire(handler.id(), cooldown.scope_key(event), Some(cooldown.interval), Instant::now())
    }

    /// Runs the handler, isolating errors and panics. Returns `true` on
    /// failure.
    async fn invoke(&self, plugin: &BoundPlugin, handler: &Handler, event: Arc<Event>, matches: Matches) -> bool {
        if let HandlerKind::Callback { remove_buttons: true } = handler.kind()
            && let Some(target) = event.reply_target()
            && let Err(e) = self.transport.remove_buttons(target).await
        {
            warn!(plugin = %plugin.name, error = %e, "Failed to remove buttons");
        }

        let chat_id = event.chat_id().map(|c| c.0);
        let ctx = Arc::new(HandlerContext::new(
            event,
            matches,
            Arc::clone(&self.transport),
            Arc::clone(&self.bot),
            Arc::clone(&plugin.name),
        ));
        let correlation_id = ctx.correlation_id();
        debug!(plugin = %plugin.name, trigger = %handler.trigger(), %correlation_id, "Invoking handler");

        match AssertUnwindSafe(handler.invoke(ctx)).catch_unwind().await {
            Ok(Ok(())) => false,
            Ok(Err(e)) => {
                error!(
                    %correlation_id,
                    plugin = %plugin.name,
                    chat_id = ?chat_id,
                    trigger = %handler.trigger(),
                    error = %e,
                    "Handler failed"
                );
                true
            }
            Err(panic) => {
                error!(
                    %correlation_id,
                    plugin = %plugin.name,
                    chat_id = ?chat_id,
                    trigger = %handler.trigger(),
                    panic = %panic_message(panic.as_ref()),
                    "Handler panicked"
                );
                true
            }
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("bot", &self.bot.username)
            .field("plugins", &self.plugins.iter().map(|p| &*p.name).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic"
    }
}
