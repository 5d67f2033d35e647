use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use axum::response::{IntoResponse, Response};
use axum::http::{header, StatusCode};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    database: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    users: Option<u64>,
}

fn database_status(state: &AppState) -> &'static str {
    if state.store.is_ready() {
        "connected"
    } else {
        "disconnected"
    }
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let users = match state.store.get() {
        Some(repository) => repository.count_users().await.ok(),
        None => None,
    };

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        database: database_status(&state),
        users,
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    let version = env!("CARGO_PKG_VERSION");
    let connected = u8::from(state.store.is_ready());
    let body = format!(
        "# HELP user_sync_up Whether the service is up\n\
         # TYPE user_sync_up gauge\n\
         user_sync_up 1\n\
         # HELP user_sync_database_connected Whether the user store is connected\n\
         # TYPE user_sync_database_connected gauge\n\
         user_sync_database_connected {}\n\
         # HELP user_sync_background_tasks Background tasks still running\n\
         # TYPE user_sync_background_tasks gauge\n\
         user_sync_background_tasks {}\n\
         # HELP user_sync_info Service information\n\
         # TYPE user_sync_info gauge\n\
         user_sync_info{{version=\"{}\"}} 1\n",
        connected,
        state.tasks.in_flight(),
        version
    );
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(state)
}
