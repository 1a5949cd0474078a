//! Console Bot
//!
//! Runs the Courier engine against stdin/stdout so plugins can be tried
//! without a chat platform. See [`console`] for the input syntax.
//!
//! ```bash
//! COURIER_BOT__SUPERUSERS=[1] COURIER_LOGGING__OUTPUT=stderr cargo run -p console-bot -- --admin 2
//! ```
//!
//! Then, as superuser 1 in the group (switch to the group admin with `:as 2`,
//! who may only use `/disable_chat` and `/enable_chat`):
//!
//! ```text
//! /addquote be kind
//! /quote
//! !quotes_again
//! /disable_chat quotes
//! /plugins
//! ```

mod console;
mod quotes;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use courier::prelude::*;
use tokio::sync::mpsc;
use tracing::info;

use crate::console::{ConsoleTransport, Session};
use crate::quotes::{QuoteStore, QuotesPlugin};

#[derive(Debug, Parser)]
#[command(version, about = "Talk to a Courier bot from the terminal")]
struct Args {
    /// Configuration file (default: search for courier.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile
    #[arg(short, long)]
    profile: Option<String>,

    /// Username the bot reports for itself
    #[arg(long, default_value = "console_bot")]
    username: String,

    /// User id to start typing as
    #[arg(short, long, default_value_t = 1)]
    user: i64,

    /// Administrators of the group chat (repeatable)
    #[arg(long = "admin")]
    admins: Vec<i64>,

    /// Id of the simulated group chat
    #[arg(long, default_value_t = -1000, allow_hyphen_values = true)]
    group: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = CourierRuntime::builder();
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = &args.profile {
        builder = builder.profile(profile);
    }
    let mut runtime = builder.build().context("Failed to load configuration")?;
    logging::init_from_config(&runtime.config().logging);

    runtime.register_builtin_plugins()?;
    runtime.register_plugin(QuotesPlugin::new(Arc::new(QuoteStore::default())))?;

    let transport = Arc::new(ConsoleTransport::new(
        BotIdentity::new(42, args.username),
        args.admins.iter().copied().map(UserId),
    ));
    let session = Session::new(Chat::group(args.group, "console"), args.user);

    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(console::read_events(Arc::clone(&transport), session, tx));

    info!(group = args.group, user = args.user, "Console bot ready, type a message");
    runtime.run(transport, rx).await?;
    Ok(())
}
