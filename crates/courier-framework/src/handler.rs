//! Handlers: a trigger, a scope, and a callback.
//!
//! A plugin declares its handlers as [`HandlerSpec`]s whose triggers are
//! still templates. When the engine is built each spec is bound to the bot's
//! username and becomes a [`Handler`].
//!
//! Callbacks are tower services over `Arc<HandlerContext>`. The usual way to
//! build one is [`callback`], which accepts any async closure whose output
//! implements [`HandlerResponse`]:
//!
//! ```rust,ignore
//! HandlerSpec::command(r"(?i)^/ping(?:@{bot})?$", callback(|_ctx| async { "pong".to_string() }))
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use courier_core::EventKind;
use futures::FutureExt;
use futures::future::BoxFuture;
use tower::util::BoxCloneSyncService;
use tower::{BoxError, Service, ServiceExt};

use crate::context::HandlerContext;
use crate::cooldown::{Cooldown, HandlerId};
use crate::error::TriggerError;
use crate::trigger::{MessageFilter, Trigger, TriggerTemplate};

/// A type-erased handler callback.
pub type Callback = BoxCloneSyncService<Arc<HandlerContext>, (), BoxError>;

// ============================================================================
// HandlerResponse
// ============================================================================

/// Values a handler closure may return.
#[async_trait]
pub trait HandlerResponse: Send + 'static {
    /// Performs the side effects implied by the value.
    async fn respond(self, ctx: &HandlerContext) -> Result<(), BoxError>;
}

#[async_trait]
impl HandlerResponse for () {
    async fn respond(self, _ctx: &HandlerContext) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Replies to the triggering message with the text.
#[async_trait]
impl HandlerResponse for String {
    async fn respond(self, ctx: &HandlerContext) -> Result<(), BoxError> {
        ctx.reply(&self).await?;
        Ok(())
    }
}

#[async_trait]
impl<T: HandlerResponse> HandlerResponse for Option<T> {
    async fn respond(self, ctx: &HandlerContext) -> Result<(), BoxError> {
        match self {
            Some(inner) => inner.respond(ctx).await,
            None => Ok(()),
        }
    }
}

/// Errors are passed up to the engine, which logs them.
#[async_trait]
impl<T, E> HandlerResponse for Result<T, E>
where
    T: HandlerResponse,
    E: Into<BoxError> + Send + 'static,
{
    async fn respond(self, ctx: &HandlerContext) -> Result<(), BoxError> {
        match self {
            Ok(inner) => inner.respond(ctx).await,
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// HandlerService
// ============================================================================

/// A tower [`Service`] that calls an async closure.
#[derive(Clone)]
pub struct HandlerService<F> {
    handler: F,
}

impl<F> HandlerService<F> {
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

impl<F, Fut, R> Service<Arc<HandlerContext>> for HandlerService<F>
where
    F: Fn(Arc<HandlerContext>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: HandlerResponse,
{
    type Response = ();
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<(), BoxError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, ctx: Arc<HandlerContext>) -> Self::Future {
        let handler = self.handler.clone();
        async move {
            let response = handler(Arc::clone(&ctx)).await;
            response.respond(&ctx).await
        }
        .boxed()
    }
}

/// Boxes an async closure into a [`Callback`].
pub fn callback<F, Fut, R>(handler: F) -> Callback
where
    F: Fn(Arc<HandlerContext>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: HandlerResponse,
{
    BoxCloneSyncService::new(HandlerService::new(handler))
}

// ============================================================================
// Handler kinds
// ============================================================================

/// The event kind a handler answers, with the flags specific to that kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// Text commands in messages.
    Command {
        /// Only run in multi-user chats.
        group_only: bool,
        /// Also run on edits of earlier messages.
        handle_edits: bool,
    },
    /// Button presses.
    Callback {
        /// Strip the buttons from the pressed message before running.
        remove_buttons: bool,
    },
    /// Inline queries.
    Inline {
        /// Skip the allow-list check.
        everyone: bool,
    },
}

impl HandlerKind {
    /// Whether a handler of this kind is a candidate for `kind`.
    pub fn accepts(&self, kind: EventKind) -> bool {
        match (self, kind) {
            (Self::Command { .. }, EventKind::Message) => true,
            (Self::Command { handle_edits, .. }, EventKind::EditedMessage) => *handle_edits,
            (Self::Callback { .. }, EventKind::CallbackQuery) => true,
            (Self::Inline { .. }, EventKind::InlineQuery) => true,
            _ => false,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Command { .. } => "command",
            Self::Callback { .. } => "callback",
            Self::Inline { .. } => "inline",
        }
    }
}

// ============================================================================
// HandlerSpec
// ============================================================================

/// An unbound handler as declared by a plugin.
pub struct HandlerSpec {
    kind: HandlerKind,
    template: TriggerTemplate,
    admin_only: bool,
    superuser_only: bool,
    cooldown: Option<Cooldown>,
    callback: Callback,
}

impl HandlerSpec {
    fn new(kind: HandlerKind, template: impl Into<TriggerTemplate>, callback: Callback) -> Self {
        Self {
            kind,
            template: template.into(),
            admin_only: false,
            superuser_only: false,
            cooldown: None,
            callback,
        }
    }

    /// A command handler for new messages.
    pub fn command(template: impl Into<String>, callback: Callback) -> Self {
        Self::new(Self::COMMAND, TriggerTemplate::Pattern(template.into()), callback)
    }

    /// A command handler for messages whose content passes `filter`.
    pub fn message(filter: MessageFilter, callback: Callback) -> Self {
        Self::new(Self::COMMAND, TriggerTemplate::Message(filter), callback)
    }

    /// A command handler for messages containing an entity of type `kind`.
    pub fn entity(kind: impl Into<String>, callback: Callback) -> Self {
        Self::new(Self::COMMAND, TriggerTemplate::Entity(kind.into()), callback)
    }

    const COMMAND: HandlerKind = HandlerKind::Command {
        group_only: false,
        handle_edits: false,
    };

    /// A handler for button presses.
    pub fn callback_query(template: impl Into<String>, callback: Callback) -> Self {
        Self::new(
            HandlerKind::Callback { remove_buttons: false },
            TriggerTemplate::Pattern(template.into()),
            callback,
        )
    }

    /// A handler for inline queries.
    pub fn inline(template: impl Into<String>, callback: Callback) -> Self {
        Self::new(
            HandlerKind::Inline { everyone: false },
            TriggerTemplate::Pattern(template.into()),
            callback,
        )
    }

    /// Restricts the handler to chat administrators.
    pub fn admin_only(mut self) -> Self {
        self.admin_only = true;
        self
    }

    /// Restricts the handler to the bot's superusers.
    ///
    /// Chat administrators do not qualify. Use this for commands whose effect
    /// reaches beyond the chat they are sent in.
    pub fn superuser_only(mut self) -> Self {
        self.superuser_only = true;
        self
    }

    /// Restricts a command to multi-user chats.
    pub fn group_only(mut self) -> Self {
        if let HandlerKind::Command { group_only, .. } = &mut self.kind {
            *group_only = true;
        }
        self
    }

    /// Lets a command also run on edited messages.
    pub fn handle_edits(mut self) -> Self {
        if let HandlerKind::Command { handle_edits, .. } = &mut self.kind {
            *handle_edits = true;
        }
        self
    }

    /// Removes the buttons of the pressed message before the callback runs.
    pub fn remove_buttons(mut self) -> Self {
        if let HandlerKind::Callback { remove_buttons } = &mut self.kind {
            *remove_buttons = true;
        }
        self
    }

    /// Opens an inline handler to users outside the allow-list.
    pub fn for_everyone(mut self) -> Self {
        if let HandlerKind::Inline { everyone } = &mut self.kind {
            *everyone = true;
        }
        self
    }

    /// Sets a per-chat cooldown.
    pub fn cooldown(self, interval: Duration) -> Self {
        self.with_cooldown(Cooldown::per_chat(interval))
    }

    pub fn with_cooldown(mut self, cooldown: Cooldown) -> Self {
        self.cooldown = Some(cooldown);
        self
    }

    pub fn kind(&self) -> HandlerKind {
        self.kind
    }

    pub fn template(&self) -> &TriggerTemplate {
        &self.template
    }

    /// Binds the template to the bot username and compiles it.
    pub fn bind(self, id: HandlerId, username: &str) -> Result<Handler, TriggerError> {
        let trigger = self.template.bind(&id.plugin, username)?;
        Ok(Handler {
            id,
            kind: self.kind,
            trigger,
            admin_only: self.admin_only,
            superuser_only: self.superuser_only,
            cooldown: self.cooldown,
            callback: self.callback,
        })
    }
}

impl fmt::Debug for HandlerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerSpec")
            .field("kind", &self.kind)
            .field("template", &self.template)
            .field("admin_only", &self.admin_only)
            .field("superuser_only", &self.superuser_only)
            .field("cooldown", &self.cooldown)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Handler
// ============================================================================

/// A bound handler, ready to be matched against events.
pub struct Handler {
    id: HandlerId,
    kind: HandlerKind,
    trigger: Trigger,
    admin_only: bool,
    superuser_only: bool,
    cooldown: Option<Cooldown>,
    callback: Callback,
}

impl Handler {
    pub fn id(&self) -> &HandlerId {
        &self.id
    }

    pub fn kind(&self) -> HandlerKind {
        self.kind
    }

    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    pub fn is_admin_only(&self) -> bool {
        self.admin_only
    }

    pub fn is_superuser_only(&self) -> bool {
        self.superuser_only
    }

    pub fn is_group_only(&self) -> bool {
        matches!(self.kind, HandlerKind::Command { group_only: true, .. })
    }

    pub fn cooldown(&self) -> Option<&Cooldown> {
        self.cooldown.as_ref()
    }

    /// Whether this handler is a candidate for events of `kind`.
    pub fn accepts(&self, kind: EventKind) -> bool {
        self.kind.accepts(kind)
    }

    /// Runs the callback to completion.
    pub async fn invoke(&self, ctx: Arc<HandlerContext>) -> Result<(), BoxError> {
        self.callback.clone().oneshot(ctx).await
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("trigger", &format_args!("{}", self.trigger))
            .field("admin_only", &self.admin_only)
            .field("superuser_only", &self.superuser_only)
            .field("cooldown", &self.cooldown)
            .finish_non_exhaustive()
    }
}
