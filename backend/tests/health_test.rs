use axum::body::Body;
use http::{Request, StatusCode};
use tower::ServiceExt;

use user_sync_backend::test_util::{create_test_state, create_test_state_with_store};
use user_sync_backend::{build_router, StoreHandle};

async fn get(app: axum::Router, uri: &str) -> (StatusCode, String) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_health_reports_connected_store() {
    let app = build_router(create_test_state());

    let (status, body) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["database"], "connected");
    assert_eq!(json["users"], 0);
}

#[tokio::test]
async fn test_health_reports_disconnected_store() {
    let app = build_router(create_test_state_with_store(StoreHandle::disconnected()));

    let (status, body) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["database"], "disconnected");
    assert!(json.get("users").is_none());
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = build_router(create_test_state());

    let (status, body) = get(app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("user_sync_up 1"));
    assert!(body.contains("user_sync_database_connected 1"));
}

#[tokio::test]
async fn test_webhook_route_only_accepts_post() {
    let app = build_router(create_test_state());

    let (status, _) = get(app, "/api/webhooks").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let app = build_router(create_test_state());

    let (status, _) = get(app, "/nonexistent").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
