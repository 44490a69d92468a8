//! The relay flow: filter the event, ask the backend, post the answer back.

use tracing::{error, info, warn};

use crate::botpress;
use crate::event::{self, InboundEvent, Triage};
use crate::google_chat::{self, ChatClient};

/// Sent when the backend answered but produced no text item, or could not be
/// reached at all.
pub const DEFAULT_REPLY: &str = "Desculpe, não consegui processar sua solicitação.";
/// Sent when the backend answered with a non-success status.
pub const BACKEND_ERROR_REPLY: &str =
    "Ocorreu um erro ao me comunicar com o assistente. Tente novamente.";

pub const STATUS_IGNORED_BOT: &str = "ignorado, mensagem de bot";
pub const STATUS_IGNORED_EVENT: &str = "evento ignorado";
pub const STATUS_DELIVERED: &str = "respondido com sucesso";

/// Terminal states of a handled event, other than a failed delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    IgnoredBot,
    IgnoredEvent,
    Delivered,
}

impl Outcome {
    pub fn status(&self) -> &'static str {
        match self {
            Outcome::IgnoredBot => STATUS_IGNORED_BOT,
            Outcome::IgnoredEvent => STATUS_IGNORED_EVENT,
            Outcome::Delivered => STATUS_DELIVERED,
        }
    }
}

/// The reply could not be posted back to the space.
#[derive(Debug, thiserror::Error)]
#[error("failed to deliver reply to {space}: {source}")]
pub struct DeliveryError {
    pub space: String,
    #[source]
    pub source: google_chat::Error,
}

pub struct Relay {
    botpress: botpress::Client,
    chat: ChatClient,
}

impl Relay {
    pub fn new(botpress: botpress::Client, chat: ChatClient) -> Self {
        Self { botpress, chat }
    }

    /// Handle one event. At most one message is posted per event.
    pub async fn handle(&self, event: &InboundEvent) -> Result<Outcome, DeliveryError> {
        let (text, space) = match event.triage() {
            Triage::FromBot => {
                info!("Ignoring bot-authored message in {:?}", event.space_name());
                return Ok(Outcome::IgnoredBot);
            }
            Triage::NotActionable => {
                info!(
                    "Ignoring event without text or valid space (space {:?})",
                    event.space_name()
                );
                return Ok(Outcome::IgnoredEvent);
            }
            Triage::Actionable { text, space } => (text, space),
        };

        let conversation_id = event::conversation_id(space);
        info!(
            "📨 Message in {} (conversation {}): \"{}\"",
            space,
            conversation_id,
            event::preview(text, 100)
        );

        let reply = self.reply_for(conversation_id, text).await;

        match self.chat.create_message(space, &reply).await {
            Ok(name) => {
                info!("📤 Replied in {} ({:?})", space, name);
                Ok(Outcome::Delivered)
            }
            Err(e) => {
                error!("Failed to post reply to Google Chat in {}: {}", space, e);
                Err(DeliveryError {
                    space: space.to_string(),
                    source: e,
                })
            }
        }
    }

    /// Ask the backend for a reply. Never fails: backend problems turn into
    /// a fallback text so the user still hears back.
    pub async fn reply_for(&self, conversation_id: &str, text: &str) -> String {
        match self.botpress.converse(conversation_id, text).await {
            Ok(response) => match response.first_text() {
                Some(reply) => reply.to_string(),
                None => {
                    warn!(
                        "Backend returned no text response for conversation {} ({} items)",
                        conversation_id,
                        response.responses.len()
                    );
                    DEFAULT_REPLY.to_string()
                }
            },
            Err(botpress::Error::Status { status, body }) => {
                warn!("Botpress API error: {} - {}", status, body);
                BACKEND_ERROR_REPLY.to_string()
            }
            Err(e) => {
                warn!("Unexpected error contacting Botpress: {}", e);
                DEFAULT_REPLY.to_string()
            }
        }
    }
}
