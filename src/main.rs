use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;

use chat_relay::botpress::Client as BotpressClient;
use chat_relay::config::{Config, CredentialSource};
use chat_relay::google_chat::ChatClient;
use chat_relay::relay::Relay;
use chat_relay::server::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is normal in production.
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("configuration is incomplete")?;
    let _guard = init_logging(config.log_dir.as_deref())?;

    info!("🚀 Starting chat-relay...");
    info!("Botpress bot: {}", config.bot_id);
    match &config.credential_source {
        CredentialSource::File(path) => {
            info!("Service account loaded from {}", path.display())
        }
        CredentialSource::Inline(_) => info!("Service account loaded from inline JSON"),
    }

    let botpress = BotpressClient::new(
        config.botpress_api_url.clone(),
        config.bot_id.clone(),
        config.botpress_token.clone(),
        config.request_timeout,
    )
    .context("failed to build Botpress client")?;
    let chat = ChatClient::new(
        config.google_chat_api_url.clone(),
        &config.service_account,
        config.request_timeout,
    )
    .context("failed to build Google Chat client")?;

    let state = Arc::new(AppState {
        relay: Relay::new(botpress, chat),
    });
    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address))?;
    info!("Listening on {}", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(server::shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

/// Stdout always; a non-blocking file writer too when `log_dir` is set.
/// The returned guard must live as long as the process.
fn init_logging(log_dir: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = || {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into())
    };

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log dir {}", dir.display()))?;
            let log_file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join("chat-relay.log"))
                .context("failed to open log file")?;
            let (non_blocking, guard) = tracing_appender::non_blocking(log_file);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(filter()),
        )
        .with(file_layer)
        .init();

    Ok(guard)
}
