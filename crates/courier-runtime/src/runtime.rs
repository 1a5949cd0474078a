//! The Courier runtime: binds an engine to a transport and pumps events.
//!
//! Each incoming event is dispatched on its own task, tracked so shutdown can
//! wait for in-flight handlers up to `engine.shutdown_grace_secs`.

use std::future::Future;
use std::sync::Arc;

use courier_core::{AllowList, EnablementPersistence, Event, EventKind, Transport};
use courier_framework::{
    EnablementError, EnablementStore, Engine, InMemoryAllowList, InMemoryEnablement, Plugin, PluginRegistry,
};
use tokio::signal;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigLoader, ConfigResult, CourierConfig};
use crate::error::RuntimeResult;

/// Process-level owner of plugins, collaborators and the event loop.
///
/// # Example
///
/// ```rust,ignore
/// let mut runtime = CourierRuntime::builder().profile("production").build()?;
/// runtime.register_builtin_plugins()?;
/// runtime.register_plugin(QuotesPlugin::new(store))?;
/// runtime.run(transport, events).await?;
/// ```
pub struct CourierRuntime {
    config: CourierConfig,
    registry: PluginRegistry,
    enablement: Arc<EnablementStore>,
    allow_list: Arc<dyn AllowList>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl CourierRuntime {
    /// A runtime with default configuration and in-memory collaborators.
    pub fn new() -> Self {
        Self::from_config(CourierConfig::default())
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    pub fn from_config(config: CourierConfig) -> Self {
        let enablement = InMemoryEnablement::new(config.plugins.enabled_by_default);
        Self {
            registry: PluginRegistry::new(),
            enablement: Arc::new(EnablementStore::new(Arc::new(enablement))),
            allow_list: Arc::new(InMemoryAllowList::new()),
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
            config,
        }
    }

    pub fn config(&self) -> &CourierConfig {
        &self.config
    }

    /// Replaces the enablement backend.
    ///
    /// Plugins that share the store (the manager plugin) must be registered
    /// after this call.
    pub fn with_enablement_persistence(mut self, persistence: Arc<dyn EnablementPersistence>) -> Self {
        self.enablement = Arc::new(EnablementStore::new(persistence));
        self
    }

    /// Replaces the allow-list backend. Same ordering rule as
    /// [`with_enablement_persistence`](Self::with_enablement_persistence).
    pub fn with_allow_list(mut self, allow_list: Arc<dyn AllowList>) -> Self {
        self.allow_list = allow_list;
        self
    }

    pub fn enablement(&self) -> &Arc<EnablementStore> {
        &self.enablement
    }

    pub fn allow_list(&self) -> &Arc<dyn AllowList> {
        &self.allow_list
    }

    /// Appends a plugin. Registration order is dispatch priority.
    pub fn register_plugin(&mut self, plugin: impl Plugin) -> RuntimeResult<()> {
        self.register(Arc::new(plugin))
    }

    pub fn register(&mut self, plugin: Arc<dyn Plugin>) -> RuntimeResult<()> {
        self.registry.register(plugin)?;
        Ok(())
    }

    /// Registers the `manager` and `allow` plugins ahead of feature plugins.
    #[cfg(feature = "builtin")]
    pub fn register_builtin_plugins(&mut self) -> RuntimeResult<()> {
        use courier_framework::{AllowPlugin, ManagerPlugin};

        self.register_plugin(ManagerPlugin::new(Arc::clone(&self.enablement)))?;
        self.register_plugin(AllowPlugin::new(Arc::clone(&self.allow_list)))
    }

    /// Cancelling this token stops [`run`](Self::run) like a signal would.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Resolves the bot identity and binds every plugin to it.
    ///
    /// Consumes the registered plugins; a runtime starts once.
    pub async fn start(&mut self, transport: Arc<dyn Transport>) -> RuntimeResult<Arc<Engine>> {
        let mut identity = transport.identity().await?;
        if let Some(username) = &self.config.bot.username {
            identity.username = username.trim_start_matches('@').to_string();
        }
        info!(bot = %identity.username, bot_id = %identity.id, "Bot identity resolved");

        let registry = std::mem::take(&mut self.registry);
        let engine = Engine::builder()
            .transport(Arc::clone(&transport))
            .enablement(Arc::clone(&self.enablement))
            .allow_list(Arc::clone(&self.allow_list))
            .superusers(self.config.bot.superuser_ids())
            .access(self.config.engine.access.into())
            .cooldown_capacity(self.config.engine.cooldown_capacity)
            .registry(registry)
            .build(identity)?;

        self.apply_disabled_plugins().await;

        if let Err(e) = engine.publish_commands().await {
            warn!(error = %e, "Failed to publish command menu");
        }

        info!(plugins = ?engine.plugin_names().collect::<Vec<_>>(), "Engine started");
        Ok(Arc::new(engine))
    }

    async fn apply_disabled_plugins(&self) {
        for name in &self.config.plugins.disabled {
            match self.enablement.disable(name).await {
                Ok(()) | Err(EnablementError::AlreadyDisabled(_)) => {}
                Err(EnablementError::NotFound(_)) => {
                    warn!(plugin = %name, "Configured to be disabled but not registered");
                }
                Err(e) => warn!(plugin = %name, error = %e, "Failed to disable plugin at start"),
            }
        }
    }

    /// Runs until Ctrl+C, SIGTERM, the shutdown token, or the end of the
    /// event stream.
    pub async fn run(self, transport: Arc<dyn Transport>, events: mpsc::Receiver<Event>) -> RuntimeResult<()> {
        self.run_until(transport, events, wait_for_shutdown()).await
    }

    /// Runs until `shutdown` resolves or the event stream ends.
    pub async fn run_until<F>(
        mut self,
        transport: Arc<dyn Transport>,
        mut events: mpsc::Receiver<Event>,
        shutdown: F,
    ) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let engine = self.start(transport).await?;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
                () = self.shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => self.spawn_dispatch(&engine, event),
                    None => {
                        info!("Event stream closed");
                        break;
                    }
                },
            }
        }

        self.drain().await;
        Ok(())
    }

    fn spawn_dispatch(&self, engine: &Arc<Engine>, event: Event) {
        let engine = Arc::clone(engine);
        let event = Arc::new(event);
        self.tracker.spawn(async move {
            let outcome = engine.dispatch(Arc::clone(&event)).await;
            debug!(update_id = event.update_id, ?outcome, "Event dispatched");
            if outcome.is_handled() || !needs_acknowledgement(&event) {
                return;
            }
            if let Err(e) = engine.transport().acknowledge(&event).await {
                warn!(update_id = event.update_id, error = %e, "Failed to acknowledge event");
            }
        });
    }

    async fn drain(&self) {
        self.tracker.close();
        let grace = self.config.engine.shutdown_grace();
        let in_flight = self.tracker.len();
        if in_flight > 0 {
            info!(in_flight, grace_secs = grace.as_secs(), "Waiting for in-flight handlers");
        }
        if timeout(grace, self.tracker.wait()).await.is_err() {
            error!(remaining = self.tracker.len(), "Handlers still running after shutdown grace period");
        }
        self.shutdown.cancel();
        info!("Runtime stopped");
    }
}

impl Default for CourierRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CourierRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CourierRuntime")
            .field("registry", &self.registry)
            .field("in_flight", &self.tracker.len())
            .finish_non_exhaustive()
    }
}

fn needs_acknowledgement(event: &Event) -> bool {
    matches!(event.kind(), Some(EventKind::CallbackQuery | EventKind::InlineQuery))
}

/// Waits for Ctrl+C or SIGTERM.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => info!("Received Ctrl+C"),
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                }
            }
            Err(e) => {
                warn!(error = %e, "Cannot listen for SIGTERM, waiting for Ctrl+C only");
                ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c().await;
}

async fn ctrl_c() {
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Loads configuration and builds a [`CourierRuntime`].
#[derive(Default)]
pub struct RuntimeBuilder {
    loader: ConfigLoader,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.loader = self.loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.loader = self.loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.loader = self.loader.search_path(path);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.loader = self.loader.without_env();
        self
    }

    pub fn merge(mut self, config: CourierConfig) -> Self {
        self.loader = self.loader.merge(config);
        self
    }

    pub fn build(self) -> ConfigResult<CourierRuntime> {
        Ok(CourierRuntime::from_config(self.loader.load()?))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use courier_core::{
        BotCommand, BotIdentity, CallbackAnswer, Chat, ChatId, ChatMember, InlineResult, MessageRef, SendOptions,
        Sender, TransportResult,
    };
    use courier_framework::{HandlerContext, HandlerSpec, callback};
    use parking_lot::Mutex;

    use super::*;
    use crate::config::AccessMode;

    #[derive(Default)]
    struct MockTransport {
        replies: Mutex<Vec<String>>,
        acknowledged: Mutex<Vec<String>>,
        menu: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn identity(&self) -> TransportResult<BotIdentity> {
            Ok(BotIdentity::new(99, "reported_bot"))
        }

        async fn send_message(&self, chat: ChatId, text: &str, _: &SendOptions) -> TransportResult<MessageRef> {
            self.replies.lock().push(text.to_string());
            Ok(MessageRef { chat_id: chat, message_id: 1 })
        }

        async fn reply(&self, target: MessageRef, text: &str, _: &SendOptions) -> TransportResult<MessageRef> {
            self.replies.lock().push(text.to_string());
            Ok(target)
        }

        async fn delete_message(&self, _: MessageRef) -> TransportResult<()> {
            Ok(())
        }

        async fn remove_buttons(&self, _: MessageRef) -> TransportResult<()> {
            Ok(())
        }

        async fn answer_callback(&self, id: &str, _: &CallbackAnswer) -> TransportResult<()> {
            self.acknowledged.lock().push(id.to_string());
            Ok(())
        }

        async fn answer_inline(&self, id: &str, _: &[InlineResult]) -> TransportResult<()> {
            self.acknowledged.lock().push(id.to_string());
            Ok(())
        }

        async fn chat_administrators(&self, _: ChatId) -> TransportResult<Vec<ChatMember>> {
            Ok(Vec::new())
        }

        async fn member_count(&self, _: ChatId) -> TransportResult<u64> {
            Ok(3)
        }

        async fn set_commands(&self, commands: &[BotCommand]) -> TransportResult<()> {
            *self.menu.lock() = commands.iter().map(|c| c.command.clone()).collect();
            Ok(())
        }
    }

    struct PingPlugin;

    impl Plugin for PingPlugin {
        fn name(&self) -> &str {
            "ping"
        }

        fn commands(&self) -> Vec<BotCommand> {
            vec![BotCommand::new("ping", "Answers pong")]
        }

        fn handlers(self: Arc<Self>) -> Vec<HandlerSpec> {
            vec![HandlerSpec::command(
                r"^/ping(?:@{bot})?$",
                callback(|_ctx: Arc<HandlerContext>| async { "pong".to_string() }),
            )]
        }
    }

    fn ping(update_id: u64, text: &str) -> Event {
        Event::message(update_id, Chat::group(-5, "g"), Sender::user(1, "u"), 10, text)
    }

    async fn run_with(config: CourierConfig, events: Vec<Event>) -> Arc<MockTransport> {
        let transport = Arc::new(MockTransport::default());
        let mut runtime = CourierRuntime::from_config(config);
        runtime.register_plugin(PingPlugin).unwrap();

        let (tx, rx) = mpsc::channel(8);
        for event in events {
            tx.send(event).await.unwrap();
        }
        drop(tx);

        runtime
            .run_until(transport.clone(), rx, std::future::pending())
            .await
            .unwrap();
        transport
    }

    #[tokio::test]
    async fn dispatches_until_the_stream_ends() {
        let transport = run_with(
            CourierConfig::default(),
            vec![ping(1, "/ping"), ping(2, "/ping@reported_bot"), ping(3, "hello")],
        )
        .await;

        assert_eq!(*transport.replies.lock(), ["pong", "pong"]);
        assert_eq!(*transport.menu.lock(), ["ping"]);
    }

    #[tokio::test]
    async fn username_override_rebinds_triggers() {
        let mut config = CourierConfig::default();
        config.bot.username = Some("@renamed_bot".into());

        let transport = run_with(
            config,
            vec![ping(1, "/ping@reported_bot"), ping(2, "/ping@renamed_bot")],
        )
        .await;

        assert_eq!(*transport.replies.lock(), ["pong"]);
    }

    #[tokio::test]
    async fn unhandled_callbacks_and_inline_queries_are_acknowledged() {
        let events = vec![
            Event::callback_query(1, Chat::group(-5, "g"), Sender::user(1, "u"), "cb-1", "nothing", None),
            Event::inline_query(2, Sender::user(1, "u"), "iq-1", ""),
            ping(3, "/ping"),
        ];
        let transport = run_with(CourierConfig::default(), events).await;

        let mut acknowledged = transport.acknowledged.lock().clone();
        acknowledged.sort();
        assert_eq!(acknowledged, ["cb-1", "iq-1"]);
    }

    #[tokio::test]
    async fn configured_plugins_start_disabled() {
        let mut config = CourierConfig::default();
        config.plugins.disabled = vec!["ping".into(), "missing".into()];

        let transport = run_with(config, vec![ping(1, "/ping")]).await;

        assert!(transport.replies.lock().is_empty());
        assert!(transport.menu.lock().is_empty());
    }

    #[tokio::test]
    async fn allow_listed_access_drops_strangers() {
        let mut config = CourierConfig::default();
        config.engine.access = AccessMode::AllowListed;

        let transport = run_with(config, vec![ping(1, "/ping")]).await;

        assert!(transport.replies.lock().is_empty());
    }

    #[tokio::test]
    async fn shutdown_token_stops_the_loop() {
        let transport = Arc::new(MockTransport::default());
        let runtime = CourierRuntime::new();
        let token = runtime.shutdown_token();
        let (_tx, rx) = mpsc::channel::<Event>(1);

        let handle = tokio::spawn(runtime.run_until(transport, rx, std::future::pending()));
        token.cancel();

        let result = tokio::time::timeout(Duration::from_secs(5), handle).await;
        assert!(matches!(result, Ok(Ok(Ok(())))));
    }

    #[tokio::test]
    async fn duplicate_plugins_are_rejected() {
        let mut runtime = CourierRuntime::new();
        runtime.register_plugin(PingPlugin).unwrap();
        assert!(runtime.register_plugin(PingPlugin).is_err());
    }
}
