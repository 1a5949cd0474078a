//! Per-chat quote collection with an "again" button.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use courier::prelude::*;
use parking_lot::RwLock;
use rand::seq::IndexedRandom;
use tracing::info;

const AGAIN: &str = "quotes_again";

/// Quotes saved per chat, in insertion order.
#[derive(Debug, Default)]
pub struct QuoteStore {
    quotes: RwLock<HashMap<ChatId, Vec<String>>>,
}

impl QuoteStore {
    pub fn random(&self, chat: ChatId) -> Option<String> {
        let quotes = self.quotes.read();
        quotes.get(&chat)?.choose(&mut rand::rng()).cloned()
    }

    /// Returns `false` when the chat already has this quote.
    pub fn save(&self, chat: ChatId, quote: &str) -> bool {
        let mut quotes = self.quotes.write();
        let list = quotes.entry(chat).or_default();
        if list.iter().any(|q| q == quote) {
            return false;
        }
        list.push(quote.to_string());
        true
    }

    /// Returns `false` when the quote was not found.
    pub fn delete(&self, chat: ChatId, quote: &str) -> bool {
        let mut quotes = self.quotes.write();
        let Some(list) = quotes.get_mut(&chat) else {
            return false;
        };
        let before = list.len();
        list.retain(|q| q != quote);
        list.len() != before
    }

    pub fn count(&self, chat: ChatId) -> usize {
        self.quotes.read().get(&chat).map_or(0, Vec::len)
    }
}

pub struct QuotesPlugin {
    store: Arc<QuoteStore>,
}

impl QuotesPlugin {
    pub fn new(store: Arc<QuoteStore>) -> Self {
        Self { store }
    }

    async fn show(&self, ctx: &HandlerContext) -> Result<(), BoxError> {
        let Some(chat) = ctx.chat() else {
            return Ok(());
        };
        if ctx.event().kind() == Some(EventKind::CallbackQuery) {
            ctx.answer(&CallbackAnswer::default()).await?;
        }
        match self.store.random(chat.id) {
            Some(quote) => {
                let options = SendOptions {
                    disable_preview: true,
                    ..SendOptions::default()
                }
                .silent()
                .with_button(Button::new("Again", AGAIN));
                ctx.send_with(&quote, &options).await?;
            }
            None => {
                ctx.reply("No quotes saved yet! Add some with /addquote QUOTE.").await?;
            }
        }
        Ok(())
    }

    fn add(&self, ctx: &HandlerContext) -> Option<String> {
        let chat = ctx.chat()?;
        let text = ctx.matches().get(1)?;
        let quote = match ctx.event().quoted() {
            Some(quoted) if !quoted.sender.as_ref().is_some_and(|s| s.is_bot) => match quoted.body() {
                Some(body) => format!("\"{body}\" —{text}"),
                None => text.to_string(),
            },
            _ => text.to_string(),
        };

        let reply = if self.store.save(chat.id, &quote) {
            info!(chat_id = %chat.id, quotes = self.store.count(chat.id), "Quote saved");
            "Saved!"
        } else {
            "That quote already exists!"
        };
        Some(reply.to_string())
    }

    fn delete(&self, ctx: &HandlerContext) -> Option<String> {
        let chat = ctx.chat()?;
        let quote = match ctx.matches().get(1) {
            Some(quote) => quote.to_string(),
            None => strip_add_command(ctx.event().quoted()?.text.as_deref()?).to_string(),
        };
        let reply = if self.store.delete(chat.id, &quote) {
            "Quote deleted!"
        } else {
            "Quote not found!"
        };
        Some(reply.to_string())
    }
}

/// A quote replied to with `/delquote` may be the `/addquote` message itself.
fn strip_add_command(text: &str) -> &str {
    match text.split_once(' ') {
        Some((command, rest)) if command.to_lowercase().starts_with("/addquote") => rest,
        _ => text,
    }
}

impl Plugin for QuotesPlugin {
    fn name(&self) -> &str {
        "quotes"
    }

    fn commands(&self) -> Vec<BotCommand> {
        vec![
            BotCommand::new("quote", "Show a random quote"),
            BotCommand::new("addquote", "<quote> - Save a quote"),
        ]
    }

    fn handlers(self: Arc<Self>) -> Vec<HandlerSpec> {
        let show = {
            let this = Arc::clone(&self);
            callback(move |ctx| {
                let this = Arc::clone(&this);
                async move { this.show(&ctx).await }
            })
        };
        let add = {
            let this = Arc::clone(&self);
            callback(move |ctx| {
                let this = Arc::clone(&this);
                async move { this.add(&ctx) }
            })
        };
        let delete = {
            let this = Arc::clone(&self);
            callback(move |ctx| {
                let this = Arc::clone(&this);
                async move { this.delete(&ctx) }
            })
        };

        vec![
            HandlerSpec::command(r"(?i)^/quote(?:@{bot})?$", show.clone()).group_only(),
            HandlerSpec::command(r"(?i)^/addquote(?:@{bot})? ([\s\S]+)$", add.clone()).group_only(),
            HandlerSpec::command(r"(?i)^/save(?:@{bot})? ([\s\S]+)$", add).group_only(),
            HandlerSpec::command(r"(?i)^/delquote(?:@{bot})?$", delete.clone()).group_only(),
            HandlerSpec::command(r"(?i)^/delquote(?:@{bot})? ([\s\S]+)$", delete).group_only(),
            HandlerSpec::callback_query(format!("^{AGAIN}$"), show)
                .remove_buttons()
                .cooldown(Duration::from_secs(2)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_rejects_duplicates_and_unknown_deletes() {
        let store = QuoteStore::default();
        let chat = ChatId(-1);

        assert!(store.random(chat).is_none());
        assert!(store.save(chat, "hello"));
        assert!(!store.save(chat, "hello"));
        assert_eq!(store.random(chat).as_deref(), Some("hello"));
        assert!(store.random(ChatId(-2)).is_none());

        assert!(!store.delete(chat, "bye"));
        assert!(store.delete(chat, "hello"));
        assert_eq!(store.count(chat), 0);
    }

    #[test]
    fn delete_by_reply_strips_the_add_command() {
        assert_eq!(strip_add_command("/addquote@bot be kind"), "be kind");
        assert_eq!(strip_add_command("/AddQuote be kind"), "be kind");
        assert_eq!(strip_add_command("be kind"), "be kind");
    }
}
