//! JSON over HTTP listener

use super::ServiceConfig;
use crate::types::{LogPayload, LogReply};
use crate::{GatewayError, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Serves `POST /log` and the `/ping` heartbeat
pub struct HttpListener {
    service: ServiceConfig,
}

impl HttpListener {
    /// Create a listener bound to the shared service state
    pub fn new(service: ServiceConfig) -> Self {
        Self { service }
    }

    /// Routes of the HTTP listener
    pub fn router(&self) -> Router {
        Router::new()
            .route("/log", post(handle_write_log))
            .route("/ping", get(handle_ping))
            .with_state(self.service.clone())
    }

    /// Serve requests on an already bound socket until `shutdown` is cancelled.
    ///
    /// Once cancelled, no new connection is accepted and each open connection
    /// is closed after its current request.
    pub async fn serve(self, listener: TcpListener, shutdown: CancellationToken) -> Result<()> {
        info!("HTTP listener started on {}", listener.local_addr()?);
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
            .map_err(|e| GatewayError::Listener(format!("http: {}", e)))?;
        info!("HTTP listener stopped");
        Ok(())
    }
}

async fn handle_write_log(
    State(service): State<ServiceConfig>,
    payload: std::result::Result<Json<LogPayload>, JsonRejection>,
) -> (StatusCode, Json<LogReply>) {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!("Rejected malformed log request: {}", rejection.body_text());
            let reply = LogReply::failed(rejection.body_text());
            return (rejection.status(), Json(reply));
        }
    };

    match service.submit(payload.into(), "http").await {
        Ok(()) => (StatusCode::OK, Json(LogReply::logged())),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(LogReply::failed(e.to_string())),
        ),
    }
}

async fn handle_ping() -> &'static str {
    "."
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::testing::FailingStore;
    use crate::storage::MemoryStore;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn json_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/log")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_logged_on_success() {
        let store = Arc::new(MemoryStore::new());
        let router = HttpListener::new(ServiceConfig::new(store.clone())).router();

        let request = json_request(r#"{"name":"auth","data":"login-ok"}"#);
        let (status, body) = send(router, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"result": "logged"}));
        let records = store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "auth");
        assert_eq!(records[0].data, "login-ok");
    }

    #[tokio::test]
    async fn test_failed_on_storage_error() {
        let store = Arc::new(FailingStore::default());
        let router = HttpListener::new(ServiceConfig::new(store.clone())).router();

        let request = json_request(r#"{"name":"auth","data":"login-ok"}"#);
        let (status, body) = send(router, request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["result"], "failed");
        let reason = body["error"].as_str().unwrap();
        assert!(reason.contains("storage unavailable"));
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn test_malformed_body_never_reaches_storage() {
        let store = Arc::new(FailingStore::default());
        let router = HttpListener::new(ServiceConfig::new(store.clone())).router();

        for body in ["not json", r#"{"name":"a"}"#, r#"{"name":1,"data":2}"#] {
            let (status, reply) = send(router.clone(), json_request(body)).await;
            assert!(status.is_client_error(), "{} gave {}", body, status);
            assert_eq!(reply["result"], "failed");
        }

        let no_content_type = Request::builder()
            .method("POST")
            .uri("/log")
            .body(Body::from(r#"{"name":"a","data":"b"}"#))
            .unwrap();
        let (status, _) = send(router, no_content_type).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_ping() {
        let service = ServiceConfig::new(Arc::new(MemoryStore::new()));
        let router = HttpListener::new(service).router();
        let request = Request::builder().uri("/ping").body(Body::empty()).unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b".");
    }
}
