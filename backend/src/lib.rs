pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod routes;
pub mod store;
pub mod sync;
pub mod tasks;
pub mod test_util;

pub use crate::config::Config;
pub use error::WebhookError;
pub use models::user::{NewUser, UserRecord};
pub use models::webhook::WebhookAck;
pub use store::{SqliteUserStore, StoreError, StoreHandle, UserRepository};
pub use sync::{upsert_if_absent, UpsertOutcome};
pub use tasks::TaskRunner;

use axum::{middleware, Router};
use tower_http::trace::TraceLayer;
use user_sync_common::WebhookVerifier;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    /// Signature verifier; `None` when no usable secret is configured.
    pub verifier: Option<WebhookVerifier>,
    /// User store, ready or disconnected.
    pub store: StoreHandle,
    /// Runner for post-response background work.
    pub tasks: TaskRunner,
}

impl AppState {
    pub fn new(config: Config, store: StoreHandle) -> Self {
        let verifier = build_verifier(&config);
        Self {
            config,
            verifier,
            store,
            tasks: TaskRunner::new(),
        }
    }
}

fn build_verifier(config: &Config) -> Option<WebhookVerifier> {
    let Some(secret) = config.webhook.secret.as_deref() else {
        tracing::warn!("No webhook secret configured, all deliveries will be rejected");
        return None;
    };

    match WebhookVerifier::new(secret) {
        Ok(verifier) => Some(verifier.with_tolerance(config.webhook.tolerance_secs)),
        Err(e) => {
            tracing::error!(
                error = %e,
                "Webhook secret is unusable, all deliveries will be rejected"
            );
            None
        }
    }
}

/// Build the service router.
pub fn build_router(state: std::sync::Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::webhooks::router(state.clone()))
        .merge(routes::health::router(state))
        .layer(middleware::from_fn(logging::request_logger))
        .layer(TraceLayer::new_for_http())
}
