//! HTTP surface: the webhook endpoint Google Chat calls, plus a health probe.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tracing::debug;

use crate::event::InboundEvent;
use crate::relay::{DeliveryError, Relay};

/// Shown to Google Chat when the reply could not be posted.
pub const DELIVERY_FAILED_DETAIL: &str = "Falha ao responder no Google Chat";

/// Shared, read-only after startup.
pub struct AppState {
    pub relay: Relay,
}

#[derive(Serialize)]
struct StatusBody {
    status: &'static str,
}

#[derive(Serialize)]
struct ErrorBody {
    detail: &'static str,
}

impl IntoResponse for DeliveryError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody {
                detail: DELIVERY_FAILED_DETAIL,
            }),
        )
            .into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/chat/message", post(on_message))
        .route("/health", get(health))
        .with_state(state)
}

async fn on_message(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<StatusBody>, DeliveryError> {
    debug!("Received from Google Chat: {}", body);
    let event = InboundEvent::from_value(body);
    let outcome = state.relay.handle(&event).await?;
    Ok(Json(StatusBody {
        status: outcome.status(),
    }))
}

async fn health() -> Json<StatusBody> {
    Json(StatusBody { status: "ok" })
}

/// Resolves on Ctrl+C or SIGTERM, whichever comes first.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Received shutdown signal");
}
