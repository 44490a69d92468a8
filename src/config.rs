use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::google_chat::ServiceAccountKey;

const DEFAULT_BOTPRESS_API_URL: &str = "https://api.botpress.cloud";
const DEFAULT_GOOGLE_CHAT_API_URL: &str = "https://chat.googleapis.com";
const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8000";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is unset or empty.
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    /// An environment variable is set but unusable.
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
    /// Failed to read the service account key file.
    #[error("failed to read service account file '{}': {source}", path.display())]
    ReadCredentials {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Service account JSON is malformed.
    #[error("failed to parse service account credentials: {0}")]
    ParseCredentials(#[from] serde_json::Error),
}

/// Where the service account key comes from. Both variants load the same
/// credential, they differ only in deployment convenience.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    File(PathBuf),
    Inline(String),
}

pub struct Config {
    pub bot_id: String,
    /// Bearer token for the converse endpoint.
    pub botpress_token: String,
    pub credential_source: CredentialSource,
    pub service_account: ServiceAccountKey,
    pub botpress_api_url: String,
    pub google_chat_api_url: String,
    pub bind_address: SocketAddr,
    /// Applied to every outbound HTTP call.
    pub request_timeout: Duration,
    /// When set, logs are also appended to a file in this directory.
    pub log_dir: Option<PathBuf>,
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let bot_id = require("BOTPRESS_BOT_ID")?;
        let botpress_token = require("BOTPRESS_WEBHOOK_TOKEN")?;

        // Inline JSON wins when both are present.
        let credential_source = match (
            get("GOOGLE_SERVICE_ACCOUNT_JSON"),
            get("GOOGLE_SERVICE_ACCOUNT_FILE"),
        ) {
            (Some(json), _) => CredentialSource::Inline(json),
            (None, Some(path)) => CredentialSource::File(PathBuf::from(path)),
            (None, None) => return Err(ConfigError::Missing("GOOGLE_SERVICE_ACCOUNT_FILE")),
        };
        let service_account = load_service_account(&credential_source)?;

        let botpress_api_url = get("BOTPRESS_API_URL")
            .unwrap_or_else(|| DEFAULT_BOTPRESS_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let google_chat_api_url = get("GOOGLE_CHAT_API_URL")
            .unwrap_or_else(|| DEFAULT_GOOGLE_CHAT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let bind_raw = get("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
        let bind_address = bind_raw.parse().map_err(|e| ConfigError::Invalid {
            var: "BIND_ADDRESS",
            reason: format!("'{bind_raw}': {e}"),
        })?;

        let request_timeout = match get("REQUEST_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                Ok(_) => {
                    return Err(ConfigError::Invalid {
                        var: "REQUEST_TIMEOUT_SECS",
                        reason: "must be greater than zero".into(),
                    });
                }
                Err(e) => {
                    return Err(ConfigError::Invalid {
                        var: "REQUEST_TIMEOUT_SECS",
                        reason: format!("'{raw}': {e}"),
                    });
                }
            },
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        Ok(Self {
            bot_id,
            botpress_token,
            credential_source,
            service_account,
            botpress_api_url,
            google_chat_api_url,
            bind_address,
            request_timeout,
            log_dir: get("LOG_DIR").map(PathBuf::from),
        })
    }
}

fn load_service_account(source: &CredentialSource) -> Result<ServiceAccountKey, ConfigError> {
    let content = match source {
        CredentialSource::Inline(json) => json.clone(),
        CredentialSource::File(path) => {
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadCredentials {
                path: path.clone(),
                source: e,
            })?
        }
    };
    Ok(serde_json::from_str(&content)?)
}
