//! Google Chat REST client authenticated with a service account.

pub mod auth;
pub mod client;

pub use auth::{ServiceAccountAuth, ServiceAccountKey};
pub use client::ChatClient;

/// OAuth scope for posting as a Chat app.
pub const CHAT_BOT_SCOPE: &str = "https://www.googleapis.com/auth/chat.bot";

/// Whether `name` is a space resource name: `spaces/` followed by a single
/// non-empty id of ASCII letters, digits, `_` or `-`.
pub fn is_space_name(name: &str) -> bool {
    name.strip_prefix("spaces/").is_some_and(|id| {
        !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    })
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Chat API error {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("token exchange failed: {0}")]
    Token(String),
    #[error("invalid service account key: {0}")]
    InvalidKey(String),
    #[error("JWT signing failed")]
    Signing,
    #[error("not a space resource name: {0:?}")]
    InvalidSpace(String),
    #[error("invalid API base URL: {0}")]
    InvalidBaseUrl(String),
}
