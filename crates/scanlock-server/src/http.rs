//! HTTP request handlers
//!
//! Three endpoints drive the handshake: `/qrCode` issues and registers a
//! token, `/isAuthenticated` is the browser's long-poll on that token, and
//! `/authenticate` is where the signing device posts its approval.

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bytes::Bytes;
use futures::channel::mpsc;
use scanlock_core::{AuthRequest, LoginEvent, LoginStatus, QrCodeResponse};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, warn};

use crate::state::AppState;

/// Create the main application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Login handshake
        .route("/qrCode", get(qr_code_handler))
        .route("/isAuthenticated", get(is_authenticated_handler))
        .route("/authenticate", post(authenticate_handler))
        // Server info
        .route("/api/info", get(server_info_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Query parameters carrying the login token
#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    token: String,
}

/// Issue a QR code for a login token
///
/// Renders the token as a PNG QR image and registers it for a future
/// authentication. The image travels base64-encoded inside JSON.
async fn qr_code_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<QrCodeResponse>, (StatusCode, String)> {
    if query.token.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "missing token".to_string()));
    }

    let png = crate::qr::generate_png(&query.token, state.config.qr_size)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    state.registry.register(&query.token).await;
    debug!("Issued QR code for token {}", query.token);

    Ok(Json(QrCodeResponse {
        qr_code: BASE64.encode(png),
    }))
}

/// Long-poll for the login outcome of a token
///
/// Streams an immediate `{"login":"waiting"}` line, then suspends until the
/// device's approval arrives or the poll timeout elapses, emitting exactly
/// one `success` or `timeout` line. The token is removed afterwards either
/// way, except by a poll that a newer subscriber replaced - the entry then
/// belongs to the replacement. The wait runs in its own task so a client
/// that disconnects cannot leak the entry past the timeout.
async fn is_authenticated_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TokenQuery>,
) -> Response {
    let token = query.token;
    if token.is_empty() {
        return StatusCode::BAD_REQUEST.into_response();
    }
    if !state.registry.is_valid(&token).await {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let handle = match state.registry.subscribe(&token).await {
        Ok(handle) => handle,
        Err(_) => return StatusCode::UNAUTHORIZED.into_response(),
    };

    let (tx, rx) = mpsc::unbounded::<Result<Bytes, Infallible>>();
    let _ = tx.unbounded_send(Ok(Bytes::from(
        LoginEvent::new(LoginStatus::Waiting).to_line(),
    )));

    let timeout = state.config.poll_timeout();
    let registry = Arc::clone(&state.registry);
    tokio::spawn(async move {
        let outcome = handle.wait(timeout).await;
        // release the entry exactly once, notified or not; a superseded
        // wait must leave the token to the subscriber that replaced it
        if outcome != scanlock_auth::WaitOutcome::Replaced {
            registry.remove(&token).await;
        }

        let status = match outcome {
            scanlock_auth::WaitOutcome::Notified => LoginStatus::Success,
            _ => LoginStatus::Timeout,
        };
        debug!("Long-poll for token {} finished: {:?}", token, status);
        let _ = tx.unbounded_send(Ok(Bytes::from(LoginEvent::new(status).to_line())));
    });

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/json; charset=UTF-8"),
            (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
            (header::PRAGMA, "no-cache"),
            (header::EXPIRES, "0"),
        ],
        Body::from_stream(rx),
    )
        .into_response()
}

/// Accept a signed login approval from a device
///
/// Any verification failure maps to one generic 401 so a caller cannot
/// probe whether the device, encoding, or signature was at fault. A valid
/// signature whose token has no waiter yet yields 500; the device may
/// retry once the browser's poll has attached.
async fn authenticate_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AuthRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    if let Err(e) = state.verifier.verify(&request) {
        warn!("Rejected authenticate from device {}: {}", request.device_id, e);
        return Err((StatusCode::UNAUTHORIZED, "unauthorized".to_string()));
    }

    state
        .registry
        .notify(&request.message)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(StatusCode::OK)
}

/// Server information response
#[derive(Debug, Serialize)]
pub struct ServerInfo {
    /// Server version
    pub version: String,
    /// Number of tokens currently live
    pub active_tokens: usize,
    /// Number of devices trusted to approve logins
    pub known_devices: usize,
    /// Long-poll wait bound in seconds
    pub poll_timeout_secs: u64,
}

/// Get server information
async fn server_info_handler(State(state): State<Arc<AppState>>) -> Json<ServerInfo> {
    Json(ServerInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_tokens: state.registry.active_tokens().await,
        known_devices: state.verifier.device_count(),
        poll_timeout_secs: state.config.poll_timeout_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use ed25519_dalek::{Signer, SigningKey};
    use http_body_util::BodyExt;
    use scanlock_auth::{Device, DeviceDirectory, TokenRegistry, Verifier};
    use scanlock_core::Config;
    use std::time::Duration;
    use tower::ServiceExt;

    fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[42u8; 32])
    }

    fn test_state() -> Arc<AppState> {
        let config = Config::new().with_poll_timeout_secs(1).with_qr_size(64);
        let registry = Arc::new(TokenRegistry::new(config.token_ttl()));
        let mut directory = DeviceDirectory::new();
        directory.add(Device {
            id: "D1".into(),
            name: "Test Phone".into(),
            public_key: signing_key().verifying_key(),
        });
        let verifier = Verifier::new(Arc::new(directory));
        Arc::new(AppState::new(config, registry, verifier))
    }

    fn auth_body(device_id: &str, token: &str) -> String {
        let signature = signing_key().sign(token.as_bytes());
        serde_json::to_string(&AuthRequest {
            device_id: device_id.into(),
            message: token.into(),
            signature: BASE64.encode(signature.to_bytes()),
        })
        .unwrap()
    }

    async fn send_get(router: Router, uri: &str) -> Response {
        router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn post_auth(router: Router, body: String) -> Response {
        router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/authenticate")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_qr_code_issues_and_registers() {
        let state = test_state();
        let router = create_router(Arc::clone(&state));

        let response = send_get(router, "/qrCode?token=T1").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_string(response).await;
        let parsed: QrCodeResponse = serde_json::from_str(&body).unwrap();
        let png = BASE64.decode(parsed.qr_code).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");

        assert!(state.registry.is_valid("T1").await);
    }

    #[tokio::test]
    async fn test_qr_code_requires_token() {
        let router = create_router(test_state());
        let response = send_get(router.clone(), "/qrCode").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let response = send_get(router, "/qrCode?token=").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_poll_unknown_token_is_unauthorized() {
        let router = create_router(test_state());
        let response = send_get(router, "/isAuthenticated?token=never-issued").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_authenticate_bad_signature_is_unauthorized() {
        let state = test_state();
        let router = create_router(Arc::clone(&state));
        state.registry.register("T1").await;

        let mut request: AuthRequest =
            serde_json::from_str(&auth_body("D1", "T1")).unwrap();
        let mut raw = BASE64.decode(&request.signature).unwrap();
        raw[3] ^= 0x80;
        request.signature = BASE64.encode(raw);
        let response = post_auth(router, serde_json::to_string(&request).unwrap()).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_authenticate_unknown_device_is_unauthorized() {
        let state = test_state();
        let router = create_router(Arc::clone(&state));
        state.registry.register("T1").await;

        let response = post_auth(router, auth_body("D9", "T1")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_authenticate_without_waiter_is_server_error() {
        let state = test_state();
        let router = create_router(Arc::clone(&state));
        state.registry.register("T1").await;

        // valid signature, but the browser's poll has not attached yet
        let response = post_auth(router, auth_body("D1", "T1")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_login_roundtrip_succeeds() {
        let state = test_state();
        let router = create_router(Arc::clone(&state));

        let response = send_get(router.clone(), "/qrCode?token=T1").await;
        assert_eq!(response.status(), StatusCode::OK);

        let poll = send_get(router.clone(), "/isAuthenticated?token=T1").await;
        assert_eq!(poll.status(), StatusCode::OK);

        // give the poll task a moment to install its waiter, then approve
        let approve = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            post_auth(router, auth_body("D1", "T1")).await
        });

        let body = body_string(poll).await;
        assert!(body.contains("{\"login\":\"waiting\"}"));
        assert!(body.contains("{\"login\":\"success\"}"));

        let approve = approve.await.unwrap();
        assert_eq!(approve.status(), StatusCode::OK);

        // token consumed
        assert!(!state.registry.is_valid("T1").await);
        let router = create_router(Arc::clone(&state));
        let response = send_get(router, "/isAuthenticated?token=T1").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_replaced_poll_leaves_token_to_newest_subscriber() {
        let state = test_state();
        let router = create_router(Arc::clone(&state));
        state.registry.register("T1").await;

        let first = send_get(router.clone(), "/isAuthenticated?token=T1").await;
        assert_eq!(first.status(), StatusCode::OK);
        let second = send_get(router.clone(), "/isAuthenticated?token=T1").await;
        assert_eq!(second.status(), StatusCode::OK);

        // the superseded poll ends promptly but must not take the token
        // out from under the subscriber that replaced it
        let first_body = body_string(first).await;
        assert!(first_body.contains("{\"login\":\"timeout\"}"));
        assert!(state.registry.is_valid("T1").await);

        let approve = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            post_auth(router, auth_body("D1", "T1")).await
        });

        let second_body = body_string(second).await;
        assert!(second_body.contains("{\"login\":\"success\"}"));
        assert_eq!(approve.await.unwrap().status(), StatusCode::OK);
        assert!(!state.registry.is_valid("T1").await);
    }

    #[tokio::test]
    async fn test_login_poll_times_out() {
        let state = test_state();
        let router = create_router(Arc::clone(&state));
        state.registry.register("T2").await;

        let started = std::time::Instant::now();
        let poll = send_get(router, "/isAuthenticated?token=T2").await;
        assert_eq!(poll.status(), StatusCode::OK);

        let body = body_string(poll).await;
        assert!(body.contains("{\"login\":\"waiting\"}"));
        assert!(body.contains("{\"login\":\"timeout\"}"));

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(900), "finished too early: {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(5), "finished too late: {:?}", elapsed);

        assert!(!state.registry.is_valid("T2").await);
    }

    #[tokio::test]
    async fn test_server_info() {
        let state = test_state();
        let router = create_router(Arc::clone(&state));
        state.registry.register("T1").await;

        let response = send_get(router, "/api/info").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        let info: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(info["active_tokens"], 1);
        assert_eq!(info["known_devices"], 1);
        assert_eq!(info["poll_timeout_secs"], 1);
    }
}
