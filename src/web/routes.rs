use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use super::AppState;
use crate::config::Config;

pub const WEBHOOK_PATH: &str = "/update-topic-content";

pub const WEBHOOK_ERROR_CODE: &str = "discourse_webhook_error";

/// Error body returned by the webhook route.
#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookErrorBody {
    pub code: String,
    pub message: String,
}

/// Create the router. The webhook route exists only when enabled.
pub fn router(config: &Config) -> Router<AppState> {
    let router = Router::new().route("/healthz", get(health));

    if config.use_discourse_webhook {
        router.route(WEBHOOK_PATH, post(update_topic_content))
    } else {
        router
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn update_topic_content(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(e) = state.verifier.verify(&headers, &body) {
        warn!(error = %e, "Rejected Discourse webhook");
        return webhook_error(
            StatusCode::UNAUTHORIZED,
            "Unable to process Discourse webhook.",
        );
    }

    match state.sync.handle(&body).await {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => {
            error!("Failed to sync topic content: {e:#}");
            webhook_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Unable to update topic content.",
            )
        }
    }
}

fn webhook_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(WebhookErrorBody {
            code: WEBHOOK_ERROR_CODE.to_string(),
            message: message.to_string(),
        }),
    )
        .into_response()
}
