//! Allow-list maintenance for superusers.
//!
//! `/allow` and `/deny` act on the author of the replied-to message. Without
//! a reply they act on the current group.

use std::sync::Arc;

use courier_core::{AllowList, BotCommand, Chat, Sender};
use tower::BoxError;
use tracing::info;

use crate::context::HandlerContext;
use crate::error::AllowError;
use crate::handler::{HandlerSpec, callback};
use crate::plugin::Plugin;

enum Target<'a> {
    User(&'a Sender),
    Chat(&'a Chat),
}

fn target(ctx: &HandlerContext) -> Result<Target<'_>, AllowError> {
    if let Some(quoted) = ctx.event().quoted() {
        let sender = quoted.sender.as_ref().ok_or(AllowError::NoTarget)?;
        if sender.is_bot {
            return Err(AllowError::BotUser);
        }
        return Ok(Target::User(sender));
    }
    match ctx.chat() {
        Some(chat) if chat.is_multi_user() => Ok(Target::Chat(chat)),
        _ => Err(AllowError::NoTarget),
    }
}

/// Adds users and chats to the allow-list and removes them again.
pub struct AllowPlugin {
    allow_list: Arc<dyn AllowList>,
}

impl AllowPlugin {
    pub const NAME: &'static str = "allow";

    pub fn new(allow_list: Arc<dyn AllowList>) -> Self {
        Self { allow_list }
    }

    async fn apply(&self, ctx: &HandlerContext, allow: bool) -> Result<String, BoxError> {
        let target = match target(ctx) {
            Ok(target) => target,
            Err(AllowError::BotUser) => return Ok("Bots cannot be put on the allow-list.".to_string()),
            Err(e) => return Ok(format!("Nothing to do: {e}.")),
        };
        match target {
            Target::User(user) => self.apply_user(ctx, user, allow).await,
            Target::Chat(chat) => self.apply_chat(ctx, chat, allow).await,
        }
    }

    async fn apply_user(&self, ctx: &HandlerContext, user: &Sender, allow: bool) -> Result<String, BoxError> {
        let name = &user.display_name;
        if self.allow_list.is_user_allowed(user.id).await.map_err(AllowError::from)? == allow {
            return Ok(if allow {
                format!("{name} may already use the bot everywhere.")
            } else {
                format!("{name} is not on the allow-list.")
            });
        }
        if let Err(e) = self.allow_list.set_user_allowed(user.id, allow).await {
            ctx.reply(&ctx.failure_notice()).await?;
            return Err(AllowError::from(e).into());
        }
        info!(user_id = %user.id, allowed = allow, "Allow-list updated");
        Ok(if allow {
            format!("{name} may now use the bot everywhere.")
        } else {
            format!("{name} may no longer use the bot everywhere.")
        })
    }

    async fn apply_chat(&self, ctx: &HandlerContext, chat: &Chat, allow: bool) -> Result<String, BoxError> {
        if self.allow_list.is_chat_allowed(chat.id).await.map_err(AllowError::from)? == allow {
            return Ok(if allow {
                "This chat may already use the bot.".to_string()
            } else {
                "This chat is not on the allow-list.".to_string()
            });
        }
        if let Err(e) = self.allow_list.set_chat_allowed(chat.id, allow).await {
            ctx.reply(&ctx.failure_notice()).await?;
            return Err(AllowError::from(e).into());
        }
        info!(chat_id = %chat.id, allowed = allow, "Allow-list updated");
        Ok(if allow {
            "This chat may now use the bot.".to_string()
        } else {
            "This chat may no longer use the bot.".to_string()
        })
    }

    fn command(self: &Arc<Self>, command: &str, allow: bool) -> HandlerSpec {
        let this = Arc::clone(self);
        HandlerSpec::command(
            format!(r"(?i)^/{command}(?:@{{bot}})?$"),
            callback(move |ctx| {
                let this = Arc::clone(&this);
                async move { this.apply(&ctx, allow).await }
            }),
        )
        .superuser_only()
        .group_only()
    }
}

impl Plugin for AllowPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn commands(&self) -> Vec<BotCommand> {
        Vec::new()
    }

    fn handlers(self: Arc<Self>) -> Vec<HandlerSpec> {
        vec![self.command("allow", true), self.command("deny", false)]
    }
}
