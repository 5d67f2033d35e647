pub mod gated_store;

pub use gated_store::GatedStore;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request};
use chrono::Utc;
use user_sync_common::WebhookVerifier;

use crate::config::{Config, DatabaseConfig, WebhookConfig};
use crate::routes::webhooks::WEBHOOK_PATH;
use crate::store::{SqliteUserStore, StoreHandle};
use crate::AppState;

pub const TEST_SECRET: &str = "whsec_test";

pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 7000,
        database: DatabaseConfig {
            url: Some(":memory:".to_string()),
        },
        webhook: WebhookConfig {
            secret: Some(TEST_SECRET.to_string()),
            ..WebhookConfig::default()
        },
        ..Config::default()
    }
}

/// State backed by a fresh in-memory store.
pub fn create_test_state() -> Arc<AppState> {
    let store = SqliteUserStore::open(":memory:").unwrap();
    create_test_state_with_store(StoreHandle::ready(Arc::new(store)))
}

pub fn create_test_state_with_store(store: StoreHandle) -> Arc<AppState> {
    Arc::new(AppState::new(test_config(), store))
}

/// Signature headers for `payload` signed with `secret` at the current time.
pub fn sign_payload(secret: &str, msg_id: &str, payload: &str) -> (String, String) {
    let verifier = WebhookVerifier::new(secret).unwrap();
    let timestamp = Utc::now().timestamp();
    let signature = verifier.sign(msg_id, timestamp, payload.as_bytes()).unwrap();
    (timestamp.to_string(), signature)
}

/// A webhook delivery signed with [`TEST_SECRET`].
pub fn signed_webhook_request(payload: &str) -> Request<Body> {
    let (timestamp, signature) = sign_payload(TEST_SECRET, "msg_test", payload);
    webhook_request(payload, Some(("msg_test", &timestamp, &signature)))
}

/// A webhook delivery with explicit (or no) signature headers.
pub fn webhook_request(payload: &str, signature: Option<(&str, &str, &str)>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(WEBHOOK_PATH)
        .header(header::CONTENT_TYPE, "application/json");

    if let Some((msg_id, timestamp, signature)) = signature {
        builder = builder
            .header("svix-id", msg_id)
            .header("svix-timestamp", timestamp)
            .header("svix-signature", signature);
    }

    builder.body(Body::from(payload.to_string())).unwrap()
}

/// `user.created` payload for `id` with optional names.
pub fn user_created_payload(id: &str, first_name: Option<&str>, last_name: Option<&str>) -> String {
    serde_json::json!({
        "object": "event",
        "type": "user.created",
        "data": {
            "id": id,
            "first_name": first_name,
            "last_name": last_name,
        }
    })
    .to_string()
}
