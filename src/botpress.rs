use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Client for the Botpress Cloud converse endpoint.
pub struct Client {
    base_url: Url,
    bot_id: String,
    token: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct ConverseRequest<'a> {
    text: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConverseResponse {
    #[serde(default)]
    pub responses: Vec<ResponseItem>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseItem {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub text: Option<String>,
}

impl ConverseResponse {
    /// The first `text` item decides the reply. `None` if there is no such
    /// item, or if it carries no text.
    pub fn first_text(&self) -> Option<&str> {
        self.responses
            .iter()
            .find(|item| item.kind.as_deref() == Some("text"))
            .and_then(|item| item.text.as_deref())
    }
}

impl Client {
    pub fn new(
        base_url: String,
        bot_id: String,
        token: String,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let base_url = Url::parse(&base_url)
            .map_err(|e| Error::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidBaseUrl(base_url.to_string()));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            base_url,
            bot_id,
            token,
            http,
        })
    }

    /// Ids are pushed as single path segments, so `/`, `?` or `#` in them
    /// are percent-encoded rather than changing the endpoint.
    fn converse_url(&self, conversation_id: &str) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["v1", "bots", self.bot_id.as_str(), "converse", conversation_id]);
        Ok(url)
    }

    /// Send a user message into `conversation_id` and return the bot's responses.
    pub async fn converse(
        &self,
        conversation_id: &str,
        text: &str,
    ) -> Result<ConverseResponse, Error> {
        let response = self
            .http
            .post(self.converse_url(conversation_id)?)
            .bearer_auth(&self.token)
            .json(&ConverseRequest { text, kind: "text" })
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport failure: connect, timeout, TLS.
    #[error("HTTP error: {0}")]
    Http(String),
    /// The backend answered with a non-2xx status.
    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("invalid API base URL: {0}")]
    InvalidBaseUrl(String),
}
