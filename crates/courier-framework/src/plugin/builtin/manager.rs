//! Plugin switches.
//!
//! Global switches and the plugin list are reserved to superusers. Chat
//! administrators may only switch plugins for their own chat.

use std::sync::Arc;

use courier_core::BotCommand;
use tower::BoxError;

use crate::context::HandlerContext;
use crate::enablement::EnablementStore;
use crate::error::EnablementError;
use crate::handler::{HandlerSpec, callback};
use crate::plugin::Plugin;

#[derive(Debug, Clone, Copy)]
enum Action {
    Enable,
    Disable,
}

#[derive(Debug, Clone, Copy)]
enum Reach {
    Everywhere,
    ThisChat,
}

/// Enables and disables plugins, globally or for the current chat.
///
/// The manager is protected: it cannot switch itself off.
pub struct ManagerPlugin {
    store: Arc<EnablementStore>,
}

impl ManagerPlugin {
    pub const NAME: &'static str = "manager";

    pub fn new(store: Arc<EnablementStore>) -> Self {
        Self { store }
    }

    fn switch(self: &Arc<Self>, command: &str, action: Action, reach: Reach) -> HandlerSpec {
        let this = Arc::clone(self);
        let spec = HandlerSpec::command(
            format!(r"(?i)^/{command}(?:@{{bot}})?\s+(?P<plugin>\S+)$"),
            callback(move |ctx| {
                let this = Arc::clone(&this);
                async move { this.apply(&ctx, action, reach).await }
            }),
        );
        match reach {
            Reach::Everywhere => spec.superuser_only(),
            Reach::ThisChat => spec.admin_only().group_only(),
        }
    }

    async fn apply(&self, ctx: &HandlerContext, action: Action, reach: Reach) -> Result<String, BoxError> {
        let plugin = ctx.matches().name("plugin").unwrap_or_default();
        let result = match (reach, ctx.chat()) {
            (Reach::Everywhere, _) => match action {
                Action::Enable => self.store.enable(plugin).await,
                Action::Disable => self.store.disable(plugin).await,
            },
            (Reach::ThisChat, Some(chat)) => match action {
                Action::Enable => self.store.enable_for_chat(chat, plugin).await,
                Action::Disable => self.store.disable_for_chat(chat, plugin).await,
            },
            (Reach::ThisChat, None) => return Ok("This command only works in groups.".to_string()),
        };

        let reply = match (result, reach) {
            (Ok(()), Reach::Everywhere) => match action {
                Action::Enable => format!("Plugin {plugin} enabled."),
                Action::Disable => format!("Plugin {plugin} disabled."),
            },
            (Ok(()), Reach::ThisChat) => match action {
                Action::Enable => format!("Plugin {plugin} enabled for this chat."),
                Action::Disable => format!("Plugin {plugin} disabled for this chat."),
            },
            (Err(EnablementError::AlreadyEnabled(_)), _) => format!("Plugin {plugin} is already enabled."),
            (Err(EnablementError::AlreadyDisabled(_)), _) => format!("Plugin {plugin} is already disabled."),
            (Err(EnablementError::NotFound(_)), _) => format!("Plugin {plugin} does not exist."),
            (Err(EnablementError::Protected(_)), _) => format!("Plugin {plugin} cannot be disabled."),
            (Err(EnablementError::NotAGroup(_)), _) => "This command only works in groups.".to_string(),
            (Err(e @ EnablementError::Persistence(_)), _) => {
                ctx.reply(&ctx.failure_notice()).await?;
                return Err(e.into());
            }
        };
        Ok(reply)
    }

    async fn list(&self, ctx: &HandlerContext) -> String {
        let group = ctx.chat().filter(|chat| chat.is_multi_user());
        let mut lines = Vec::new();
        for name in self.store.plugins() {
            let state = if !self.store.is_enabled(&name).await {
                "off"
            } else if let Some(chat) = group
                && self.store.is_disabled_for_chat(chat.id, &name).await
            {
                "off here"
            } else {
                "on"
            };
            lines.push(format!("{name}: {state}"));
        }
        lines.join("\n")
    }
}

impl Plugin for ManagerPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn commands(&self) -> Vec<BotCommand> {
        // Administrative commands stay out of the public menu.
        Vec::new()
    }

    fn handlers(self: Arc<Self>) -> Vec<HandlerSpec> {
        let this = Arc::clone(&self);
        vec![
            self.switch("enable", Action::Enable, Reach::Everywhere),
            self.switch("disable", Action::Disable, Reach::Everywhere),
            self.switch("enable_chat", Action::Enable, Reach::ThisChat),
            self.switch("disable_chat", Action::Disable, Reach::ThisChat),
            HandlerSpec::command(
                r"(?i)^/plugins(?:@{bot})?$",
                callback(move |ctx| {
                    let this = Arc::clone(&this);
                    async move { this.list(&ctx).await }
                }),
            )
            .superuser_only(),
        ]
    }

    fn is_protected(&self) -> bool {
        true
    }
}
