mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::db::Database;
use crate::sync::{SyncHooks, TopicSyncHandler};
use crate::webhook::{HmacSha256Verifier, WebhookVerifier};

pub use routes::{WebhookErrorBody, WEBHOOK_ERROR_CODE, WEBHOOK_PATH};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sync: Arc<TopicSyncHandler<Database>>,
    pub verifier: Arc<dyn WebhookVerifier>,
}

impl AppState {
    /// Build state using Discourse's HMAC signature check.
    #[must_use]
    pub fn new(config: Config, db: Database, hooks: SyncHooks) -> Self {
        let verifier = HmacSha256Verifier::new(config.webhook_secret.clone());
        Self::with_verifier(config, db, hooks, Arc::new(verifier))
    }

    #[must_use]
    pub fn with_verifier(
        config: Config,
        db: Database,
        hooks: SyncHooks,
        verifier: Arc<dyn WebhookVerifier>,
    ) -> Self {
        let sync = TopicSyncHandler::new(db, config.sync_settings(), hooks);
        Self {
            config: Arc::new(config),
            sync: Arc::new(sync),
            verifier,
        }
    }
}

/// Start the web server.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn serve(config: Config, db: Database, hooks: SyncHooks) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.web_host, config.web_port)
        .parse()
        .context("Invalid web server address")?;

    let app = create_app(AppState::new(config, db, hooks));

    info!(addr = %addr, "Starting HTTP web server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind web server")?;

    axum::serve(listener, app)
        .await
        .context("Web server error")?;

    Ok(())
}

/// Create the main application router.
pub fn create_app(state: AppState) -> Router {
    if state.config.use_discourse_webhook {
        info!(path = WEBHOOK_PATH, "Discourse webhook enabled");
    } else {
        info!("Discourse webhook disabled");
    }

    Router::new()
        .merge(routes::router(&state.config))
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
