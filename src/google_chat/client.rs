//! Posting messages into Google Chat spaces.

use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{CHAT_BOT_SCOPE, Error, ServiceAccountAuth, ServiceAccountKey, is_space_name};

#[derive(Serialize)]
struct CreateMessageRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct CreatedMessage {
    name: Option<String>,
}

/// Google Chat API client.
pub struct ChatClient {
    base_url: Url,
    http: reqwest::Client,
    auth: ServiceAccountAuth,
}

impl ChatClient {
    pub fn new(base_url: String, key: &ServiceAccountKey, timeout: Duration) -> Result<Self, Error> {
        let base_url = Url::parse(&base_url)
            .map_err(|e| Error::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidBaseUrl(base_url.to_string()));
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let auth = ServiceAccountAuth::new(key, CHAT_BOT_SCOPE, http.clone())?;
        info!("Google Chat client ready for {}", auth.client_email());

        Ok(Self {
            base_url,
            http,
            auth,
        })
    }

    /// `{base}/v1/spaces/{id}/messages`, or an error if `space` is not a
    /// plain space resource name.
    fn messages_url(&self, space: &str) -> Result<Url, Error> {
        if !is_space_name(space) {
            return Err(Error::InvalidSpace(space.to_string()));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push("v1")
            .extend(space.split('/'))
            .push("messages");
        Ok(url)
    }

    /// Create a text message in `space` (e.g. `spaces/AAAA`).
    ///
    /// Returns the resource name of the created message when the API reports one.
    pub async fn create_message(&self, space: &str, text: &str) -> Result<Option<String>, Error> {
        let url = self.messages_url(space)?;
        let token = self.auth.access_token().await?;

        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&CreateMessageRequest { text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status { status, body });
        }

        // The message is already posted; an odd body shouldn't turn that into a failure.
        let name = response
            .json::<CreatedMessage>()
            .await
            .ok()
            .and_then(|m| m.name);
        debug!("Created message {:?} in {}", name, space);

        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FIXTURE: &str = include_str!("../../tests/fixtures/service_account.json");

    async fn mount_token(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.chat",
                "expires_in": 3600
            })))
            .mount(server)
            .await;
    }

    fn client_for(server: &MockServer) -> ChatClient {
        let mut key: ServiceAccountKey = serde_json::from_str(FIXTURE).unwrap();
        key.token_uri = format!("{}/token", server.uri());
        ChatClient::new(server.uri(), &key, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_create_message() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("POST"))
            .and(path("/v1/spaces/AAAA/messages"))
            .and(header("authorization", "Bearer ya29.chat"))
            .and(body_json(serde_json::json!({ "text": "olá" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "spaces/AAAA/messages/BBBB.BBBB",
                "text": "olá"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let name = client_for(&server)
            .create_message("spaces/AAAA", "olá")
            .await
            .unwrap();
        assert_eq!(name.as_deref(), Some("spaces/AAAA/messages/BBBB.BBBB"));
    }

    #[tokio::test]
    async fn test_create_message_tolerates_empty_body() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("POST"))
            .and(path("/v1/spaces/AAAA/messages"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let name = client_for(&server)
            .create_message("spaces/AAAA", "hi")
            .await
            .unwrap();
        assert!(name.is_none());
    }

    #[tokio::test]
    async fn test_create_message_api_error() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("POST"))
            .and(path("/v1/spaces/AAAA/messages"))
            .respond_with(ResponseTemplate::new(403).set_body_string("PERMISSION_DENIED"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .create_message("spaces/AAAA", "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Status { .. }));
        assert!(err.to_string().contains("403"));
        assert!(err.to_string().contains("PERMISSION_DENIED"));
    }

    #[test]
    fn test_messages_url() {
        let key: ServiceAccountKey = serde_json::from_str(FIXTURE).unwrap();
        let client =
            ChatClient::new("https://chat.example.com/".into(), &key, Duration::from_secs(5))
                .unwrap();
        assert_eq!(
            client.messages_url("spaces/AAAA").unwrap().as_str(),
            "https://chat.example.com/v1/spaces/AAAA/messages"
        );
    }

    #[tokio::test]
    async fn test_malformed_space_is_rejected_before_any_call() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        for space in ["spaces/room?x=1", "spaces/..", "spaces/AAAA/messages/x", "users/1"] {
            let err = client.create_message(space, "hi").await.unwrap_err();
            assert!(matches!(err, Error::InvalidSpace(_)), "{space}: {err}");
        }
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let key: ServiceAccountKey = serde_json::from_str(FIXTURE).unwrap();
        let result = ChatClient::new("not a url".into(), &key, Duration::from_secs(5));
        assert!(matches!(result, Err(Error::InvalidBaseUrl(_))));
    }

    #[tokio::test]
    async fn test_token_failure_skips_post() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/spaces/AAAA/messages"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .create_message("spaces/AAAA", "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Token(_)));
    }
}
