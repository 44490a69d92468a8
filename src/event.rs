//! Google Chat event payloads.
//!
//! Only the handful of fields the relay reads are modelled. Everything is
//! optional: membership changes and other event types arrive without a
//! message, and they must be filtered rather than rejected. A field of the
//! wrong JSON type reads as absent for the same reason.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use crate::google_chat::is_space_name;

/// Sender type Google Chat uses for app-authored messages.
const BOT_SENDER: &str = "BOT";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundEvent {
    #[serde(default, deserialize_with = "lenient")]
    pub message: Option<EventMessage>,
    #[serde(default, deserialize_with = "lenient")]
    pub space: Option<Space>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventMessage {
    #[serde(default, deserialize_with = "lenient")]
    pub sender: Option<Sender>,
    #[serde(default, deserialize_with = "lenient")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Sender {
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Space {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// What to do with an inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Triage<'a> {
    /// Authored by a bot; answering would risk a reply loop.
    FromBot,
    /// No text or no usable space name, e.g. a member being added.
    NotActionable,
    Actionable { text: &'a str, space: &'a str },
}

impl InboundEvent {
    /// Read an event from any JSON body. Anything that is not an object
    /// becomes an empty event, which triages as not actionable.
    pub fn from_value(value: serde_json::Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }

    pub fn sender_kind(&self) -> Option<&str> {
        self.message
            .as_ref()
            .and_then(|m| m.sender.as_ref())
            .and_then(|s| s.kind.as_deref())
    }

    pub fn text(&self) -> Option<&str> {
        self.message.as_ref().and_then(|m| m.text.as_deref())
    }

    pub fn space_name(&self) -> Option<&str> {
        self.space.as_ref().and_then(|s| s.name.as_deref())
    }

    /// The bot check runs first so bot messages are never forwarded, even
    /// when they are otherwise well-formed. The space name ends up in
    /// outbound URLs, so only plain `spaces/<id>` names are actionable.
    pub fn triage(&self) -> Triage<'_> {
        if self.sender_kind() == Some(BOT_SENDER) {
            return Triage::FromBot;
        }

        match (self.text(), self.space_name()) {
            (Some(text), Some(space)) if !text.is_empty() && is_space_name(space) => {
                Triage::Actionable { text, space }
            }
            _ => Triage::NotActionable,
        }
    }
}

/// Conversation key for the backend: the last path segment of the space name
/// (`spaces/AAAA` -> `AAAA`). Stable for a space, so the backend keeps context
/// across messages.
pub fn conversation_id(space_name: &str) -> &str {
    space_name.rsplit('/').next().unwrap_or(space_name)
}

/// First `max_chars` characters, for log lines.
pub fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
