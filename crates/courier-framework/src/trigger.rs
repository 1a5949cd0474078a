//! Trigger patterns and their captures.
//!
//! Most plugins declare triggers as regular-expression templates in which the
//! token [`BOT_PLACEHOLDER`] stands for the bot's username. Templates are
//! bound once, when the engine is built, so matching is a single regex
//! evaluation per handler.
//!
//! Command handlers may instead trigger on what a message carries rather
//! than what it says: a kind of media ([`MessageFilter`]) or an entity type
//! such as `mention` or `url`.

use std::collections::HashMap;
use std::fmt;

use courier_core::{Event, MediaKind, MessageData};
use regex::Regex;

use crate::error::TriggerError;

/// Token replaced by the escaped bot username when a template is bound.
pub const BOT_PLACEHOLDER: &str = "{bot}";

/// Content conditions on a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageFilter {
    /// Messages carrying this kind of media.
    Media(MediaKind),
    /// Messages carrying any uploaded file.
    AnyMedia,
    /// Every message, text or not.
    AnyMessage,
}

impl MessageFilter {
    pub fn accepts(self, data: &MessageData) -> bool {
        match self {
            Self::Media(kind) => data.media == Some(kind),
            Self::AnyMedia => data.media.is_some_and(MediaKind::is_file),
            Self::AnyMessage => true,
        }
    }
}

impl fmt::Display for MessageFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Media(kind) => write!(f, "<{kind}>"),
            Self::AnyMedia => f.write_str("<any media>"),
            Self::AnyMessage => f.write_str("<any message>"),
        }
    }
}

/// A trigger as declared by a plugin, before the bot username is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerTemplate {
    /// A regular expression, possibly containing [`BOT_PLACEHOLDER`].
    Pattern(String),
    Message(MessageFilter),
    /// An entity type name, e.g. `mention`.
    Entity(String),
}

impl TriggerTemplate {
    /// Binds the template to `username`.
    pub fn bind(&self, plugin: &str, username: &str) -> Result<Trigger, TriggerError> {
        match self {
            Self::Pattern(template) => Trigger::bind(plugin, template, username),
            Self::Message(filter) => Ok(Trigger::Message(*filter)),
            Self::Entity(kind) => Ok(Trigger::Entity(kind.clone())),
        }
    }
}

impl From<String> for TriggerTemplate {
    fn from(pattern: String) -> Self {
        Self::Pattern(pattern)
    }
}

impl From<&str> for TriggerTemplate {
    fn from(pattern: &str) -> Self {
        Self::Pattern(pattern.to_string())
    }
}

/// A compiled trigger.
#[derive(Debug, Clone)]
pub enum Trigger {
    Pattern(Regex),
    Message(MessageFilter),
    Entity(String),
}

impl Trigger {
    /// Binds the pattern `template` to `username` and compiles it.
    pub fn bind(plugin: &str, template: &str, username: &str) -> Result<Self, TriggerError> {
        let pattern = template.replace(BOT_PLACEHOLDER, &regex::escape(username));
        Regex::new(&pattern)
            .map(Self::Pattern)
            .map_err(|source| TriggerError {
                plugin: plugin.to_string(),
                pattern,
                source,
            })
    }

    /// Matches an event, returning its captures on success.
    ///
    /// Content and entity triggers only match messages. Their captures hold
    /// the message text (or caption) as the whole match.
    pub fn matches(&self, event: &Event) -> Option<Matches> {
        match self {
            Self::Pattern(_) => self.captures(event.subject()?),
            Self::Message(filter) => event
                .message_data()
                .filter(|data| filter.accepts(data))
                .map(|_| Matches::whole(event.subject())),
            Self::Entity(kind) => event
                .message_data()
                .filter(|data| data.has_entity(kind))
                .map(|_| Matches::whole(event.subject())),
        }
    }

    /// Matches text against a pattern trigger. Other triggers never match
    /// plain text.
    pub fn captures(&self, subject: &str) -> Option<Matches> {
        let Self::Pattern(regex) = self else {
            return None;
        };
        let caps = regex.captures(subject)?;
        let groups = caps
            .iter()
            .map(|group| group.map_or_else(String::new, |m| m.as_str().to_string()))
            .collect();
        let named = regex
            .capture_names()
            .flatten()
            .filter_map(|name| caps.name(name).map(|m| (name.to_string(), m.as_str().to_string())))
            .collect();
        Some(Matches { groups, named })
    }

    pub fn is_match(&self, subject: &str) -> bool {
        matches!(self, Self::Pattern(regex) if regex.is_match(subject))
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern(regex) => f.write_str(regex.as_str()),
            Self::Message(filter) => fmt::Display::fmt(filter, f),
            Self::Entity(kind) => write!(f, "<{kind} entity>"),
        }
    }
}

/// Captures produced by a successful trigger match.
///
/// Index 0 is the whole match. Groups that did not participate in the match
/// read as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Matches {
    groups: Vec<String>,
    named: HashMap<String, String>,
}

impl Matches {
    fn whole(subject: Option<&str>) -> Self {
        Self {
            groups: vec![subject.unwrap_or_default().to_string()],
            named: HashMap::new(),
        }
    }

    /// The entire matched text.
    pub fn full(&self) -> &str {
        self.get(0).unwrap_or_default()
    }

    /// A positional capture group, `None` past the last group.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.groups.get(index).map(String::as_str)
    }

    /// A named capture group.
    pub fn name(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }

    /// Number of groups, including the whole match.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
