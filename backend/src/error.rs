//! Error types for the webhook endpoint.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use user_sync_common::VerificationError;

use crate::models::webhook::WebhookAck;

/// Errors surfaced to the webhook sender. All of them map to `400`.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Webhook secret is not configured")]
    SecretNotConfigured,

    #[error(transparent)]
    Verification(#[from] VerificationError),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self, "Webhook verification failed");

        let body = Json(WebhookAck::rejected(self.to_string()));
        (StatusCode::BAD_REQUEST, body).into_response()
    }
}
