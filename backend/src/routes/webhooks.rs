use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use user_sync_common::{EventKind, WebhookEvent};

use crate::error::WebhookError;
use crate::models::user::NewUser;
use crate::models::webhook::WebhookAck;
use crate::sync::upsert_if_absent;
use crate::AppState;

pub const WEBHOOK_PATH: &str = "/api/webhooks";

/// POST /api/webhooks - signed identity-provider deliveries
///
/// The body is taken as raw bytes: the signature covers the exact bytes the
/// sender produced, so nothing is parsed before verification.
async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, WebhookError> {
    let verifier = state
        .verifier
        .as_ref()
        .ok_or(WebhookError::SecretNotConfigured)?;
    let event = verifier.verify(&body, &headers)?;

    dispatch(&state, &event);

    Ok(Json(WebhookAck::received()))
}

/// Hand the event's follow-up work to the task runner without awaiting it.
fn dispatch(state: &AppState, event: &WebhookEvent) {
    match event.kind() {
        EventKind::UserCreated => {
            let Some(clerk_user_id) = event.subject_id() else {
                tracing::warn!("user.created event without a subject id, skipping");
                return;
            };

            tracing::info!(
                clerk_user_id,
                first_name = ?event.first_name(),
                last_name = ?event.last_name(),
                "User received"
            );

            let user =
                NewUser::from_event_fields(clerk_user_id, event.first_name(), event.last_name());
            let store = state.store.clone();
            state.tasks.spawn("upsert_user", async move {
                upsert_if_absent(&store, user).await;
            });
        }
        EventKind::Other(event_type) => {
            tracing::debug!(event_type = %event_type, "Ignoring unhandled webhook event");
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(WEBHOOK_PATH, post(handle_webhook))
        .with_state(state)
}
