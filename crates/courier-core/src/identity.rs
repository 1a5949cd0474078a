//! Who the bot is and what it advertises.

use serde::{Deserialize, Serialize};

use crate::event::UserId;

/// The bot's own identity, fetched from the platform at startup.
///
/// The username is substituted into trigger templates so that commands
/// addressed to this bot (`/quote@my_bot`) match while commands addressed to
/// other bots do not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotIdentity {
    pub id: UserId,
    pub username: String,
}

impl BotIdentity {
    pub fn new(id: i64, username: impl Into<String>) -> Self {
        Self {
            id: UserId(id),
            username: username.into(),
        }
    }
}

/// One entry of the command menu shown by the platform client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotCommand {
    /// Command name without the leading slash.
    pub command: String,
    pub description: String,
}

impl BotCommand {
    pub fn new(command: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            description: description.into(),
        }
    }
}
