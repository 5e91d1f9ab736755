//! Lifecycle API handlers: health and the authenticated shutdown endpoint.
//!
//! Method checks live inside the handlers so a wrong method yields 400, and
//! error bodies carry the plain-text status reason. Both routes are
//! registered with `any()` for that reason.

use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use serde::Serialize;

use crate::lifecycle::ShutdownTrigger;

/// State shared with the lifecycle API handlers.
#[derive(Clone)]
pub struct AppState {
    /// Set once when serving begins; health reads it to compute uptime.
    pub started: Arc<OnceLock<Instant>>,
    /// Resolved shutdown credential. Empty disables the endpoint entirely.
    pub shutdown_key: Arc<str>,
    /// Sender half of the shutdown channel.
    pub trigger: ShutdownTrigger,
}

#[derive(Serialize)]
struct HealthResponse {
    uptime: String,
}

#[derive(Serialize)]
struct ShutdownResponse {
    status: &'static str,
}

/// Build a router with the lifecycle routes mounted:
/// `GET /api/health` and `POST /api/shutdown/{key}`.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", any(health))
        .route("/api/shutdown/{key}", any(shutdown))
        .with_state(state)
}

/// Naive health check: reports elapsed time since the server started.
async fn health(method: Method, State(state): State<AppState>) -> Response {
    if method != Method::GET {
        return status_text(StatusCode::BAD_REQUEST);
    }

    let uptime = match state.started.get() {
        Some(started) => format!("{:?}", started.elapsed()),
        None => format!("{:?}", Duration::ZERO),
    };

    Json(HealthResponse { uptime }).into_response()
}

/// Authenticated shutdown: responds first, then queues the trigger.
async fn shutdown(
    method: Method,
    Path(key): Path<String>,
    State(state): State<AppState>,
) -> Response {
    if method != Method::POST {
        return status_text(StatusCode::BAD_REQUEST);
    }
    if state.shutdown_key.is_empty() {
        // Fail closed: a cleared key must never mean "any key accepted".
        return status_text(StatusCode::INTERNAL_SERVER_ERROR);
    }
    if key != state.shutdown_key.as_ref() {
        return status_text(StatusCode::UNAUTHORIZED);
    }

    // Queue the trigger from a separate task so this response is on the wire
    // before the drain begins; the drain then keeps the connection alive
    // until the response is delivered.
    let trigger = state.trigger.clone();
    tokio::spawn(async move {
        trigger.trigger();
    });

    (
        StatusCode::ACCEPTED,
        Json(ShutdownResponse {
            status: "server shutting down",
        }),
    )
        .into_response()
}

fn status_text(status: StatusCode) -> Response {
    (status, status.canonical_reason().unwrap_or_default()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use tower::ServiceExt;

    use crate::lifecycle::{ShutdownCoordinator, ShutdownSignal};

    fn test_router(key: &str) -> (Router, ShutdownCoordinator) {
        let coordinator = ShutdownCoordinator::new().unwrap();
        let state = AppState {
            started: Arc::new(OnceLock::new()),
            shutdown_key: Arc::from(key),
            trigger: coordinator.trigger(),
        };
        (api_router(state), coordinator)
    }

    fn request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    /// Parse the debug-formatted duration the health payload carries
    /// (e.g. "25.04ms", "1.2s").
    fn parse_duration(text: &str) -> Duration {
        let (digits, scale) = if let Some(v) = text.strip_suffix("ns") {
            (v, 1e-9)
        } else if let Some(v) = text.strip_suffix("µs") {
            (v, 1e-6)
        } else if let Some(v) = text.strip_suffix("ms") {
            (v, 1e-3)
        } else if let Some(v) = text.strip_suffix('s') {
            (v, 1.0)
        } else {
            panic!("unrecognized duration: {}", text)
        };
        Duration::from_secs_f64(digits.parse::<f64>().unwrap() * scale)
    }

    #[tokio::test]
    async fn test_health_get_returns_uptime() {
        let coordinator = ShutdownCoordinator::new().unwrap();
        let started = Arc::new(OnceLock::new());
        let _ = started.set(Instant::now());
        let router = api_router(AppState {
            started,
            shutdown_key: Arc::from("test-key"),
            trigger: coordinator.trigger(),
        });

        tokio::time::sleep(Duration::from_millis(25)).await;

        let response = router
            .oneshot(request(Method::GET, "/api/health"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let json = json_body(response).await;
        let uptime = json["uptime"].as_str().expect("uptime field missing");
        assert!(!uptime.is_empty());
        assert_ne!(uptime, "0ns");
    }

    #[tokio::test]
    async fn test_health_before_start_reports_zero() {
        let (router, _coordinator) = test_router("test-key");

        let response = router
            .oneshot(request(Method::GET, "/api/health"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["uptime"], "0ns");
    }

    #[tokio::test]
    async fn test_health_uptime_is_monotonic_across_calls() {
        let coordinator = ShutdownCoordinator::new().unwrap();
        let started = Arc::new(OnceLock::new());
        let _ = started.set(Instant::now());
        let router = api_router(AppState {
            started,
            shutdown_key: Arc::from("test-key"),
            trigger: coordinator.trigger(),
        });

        let mut previous = Duration::ZERO;
        for _ in 0..5 {
            let response = router
                .clone()
                .oneshot(request(Method::GET, "/api/health"))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let json = json_body(response).await;
            let uptime =
                parse_duration(json["uptime"].as_str().expect("uptime field missing"));
            assert!(
                uptime >= previous,
                "uptime went backwards: {:?} after {:?}",
                uptime,
                previous
            );
            previous = uptime;
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn test_health_wrong_method_returns_400() {
        let (router, _coordinator) = test_router("test-key");

        let response = router
            .oneshot(request(Method::POST, "/api/health"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"Bad Request");
    }

    #[tokio::test]
    async fn test_shutdown_with_correct_key_returns_202_and_queues_signal() {
        let (router, mut coordinator) = test_router("test-key");

        let response = router
            .oneshot(request(Method::POST, "/api/shutdown/test-key"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let json = json_body(response).await;
        assert_eq!(json["status"], "server shutting down");

        // The trigger is queued from a spawned task after the response.
        let signal = tokio::time::timeout(Duration::from_secs(1), coordinator.wait())
            .await
            .expect("no shutdown signal queued");
        assert_eq!(signal, ShutdownSignal::Interrupt);
    }

    #[tokio::test]
    async fn test_shutdown_with_wrong_key_returns_401_and_no_signal() {
        let (router, mut coordinator) = test_router("test-key");

        let response = router
            .oneshot(request(Method::POST, "/api/shutdown/wrong-key"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let waited =
            tokio::time::timeout(Duration::from_millis(100), coordinator.wait()).await;
        assert!(waited.is_err(), "no signal should have been queued");
    }

    #[tokio::test]
    async fn test_shutdown_wrong_method_returns_400() {
        let (router, _coordinator) = test_router("test-key");

        let response = router
            .oneshot(request(Method::GET, "/api/shutdown/test-key"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_shutdown_without_key_fails_closed() {
        let (router, mut coordinator) = test_router("");

        let response = router
            .oneshot(request(Method::POST, "/api/shutdown/any-key"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let waited =
            tokio::time::timeout(Duration::from_millis(100), coordinator.wait()).await;
        assert!(waited.is_err(), "no signal should have been queued");
    }
}
