use crate::features::interaction::controller::InteractionController;
use crate::features::observability::controller::ObservabilityController;
use crate::shared::error::{BotError, TransportError};
use crate::shared::signature::{SignatureVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use crate::shared::types::InteractionEvent;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use fleetbot_core::ErrorResponse;
use fleetbot_proto::{ConversionError, Interaction, InteractionResponse};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct BotServer {
    verifier: SignatureVerifier,
    interactions: Arc<InteractionController>,
    metrics: Arc<ObservabilityController>,
}

impl BotServer {
    pub fn new(
        verifier: SignatureVerifier,
        interactions: Arc<InteractionController>,
        metrics: Arc<ObservabilityController>,
    ) -> Self {
        Self {
            verifier,
            interactions,
            metrics,
        }
    }

    pub fn router(self) -> Router {
        Router::new()
            .route("/interactions", post(handle_interaction))
            .route("/metrics", get(render_metrics))
            .route("/healthz", get(healthz))
            .layer(TraceLayer::new_for_http())
            .with_state(self)
    }
}

fn error_response(status: StatusCode, error: BotError) -> Response {
    let body: ErrorResponse = error.into();
    (status, Json(body)).into_response()
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, TransportError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| TransportError::InvalidSignature(format!("missing {name} header")))
}

async fn handle_interaction(
    State(server): State<BotServer>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let verified = header_value(&headers, SIGNATURE_HEADER).and_then(|signature| {
        let timestamp = header_value(&headers, TIMESTAMP_HEADER)?;
        server.verifier.verify(signature, timestamp, &body)
    });
    if let Err(error) = verified {
        warn!(error = %error, "Rejected interaction signature");
        return error_response(StatusCode::UNAUTHORIZED, error.into());
    }

    let interaction: Interaction = match serde_json::from_slice(&body) {
        Ok(interaction) => interaction,
        Err(e) => {
            let error = TransportError::MalformedPayload(e.to_string());
            warn!(error = %error, "Rejected malformed interaction");
            return error_response(StatusCode::BAD_REQUEST, error.into());
        }
    };

    let reply = match InteractionEvent::try_from(interaction) {
        Ok(event) => server.interactions.handle(event).await,
        Err(ConversionError::Ping) => {
            debug!("Answered ping");
            return Json(InteractionResponse::pong()).into_response();
        }
        Err(e) => server.interactions.unsupported(&e.to_string()),
    };

    Json(InteractionResponse::from(reply)).into_response()
}

async fn render_metrics(State(server): State<BotServer>) -> Response {
    match server.metrics.render_metrics() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, BotError::StorageError(e)),
    }
}

async fn healthz() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::authorization::service::AuthorizationGate;
    use crate::features::instance_directory::repo::{
        AccessRule, InMemoryFleetRepository, RawInstance,
    };
    use crate::features::instance_directory::service::InstanceDirectoryService;
    use crate::features::interaction::repo::InMemorySessionRepository;
    use crate::features::interaction::service::InteractionService;
    use crate::features::lifecycle::service::LifecycleService;
    use crate::shared::signature::test_support::TestSigner;
    use crate::shared::types::InstanceStatus;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::Utc;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        signer: TestSigner,
        fleet: InMemoryFleetRepository,
    }

    fn create_test_app() -> TestApp {
        let signer = TestSigner::generate();
        let fleet = InMemoryFleetRepository::new()
            .with_reservation(vec![RawInstance::new("i-a", InstanceStatus::Stopped)
                .with_tag("Name", "alpha")
                .with_security_group("sg-1")])
            .with_access_rule(AccessRule::ingress("sg-1", 25565));

        let repo = Arc::new(fleet.clone());
        let metrics = ObservabilityController::build().unwrap();
        let service = InteractionService::new(
            Arc::new(InstanceDirectoryService::new(repo.clone())),
            Arc::new(LifecycleService::new(repo)),
            AuthorizationGate::new("chan-ops", "role-admin"),
            Arc::new(InMemorySessionRepository::new(Duration::from_secs(900))),
            metrics.clone(),
        );
        let controller = Arc::new(InteractionController::new(Arc::new(service), metrics.clone()));
        let router = BotServer::new(SignatureVerifier::new(signer.public_key()), controller, metrics)
            .router();

        TestApp {
            router,
            signer,
            fleet,
        }
    }

    fn signed_request(signer: &TestSigner, body: &[u8]) -> Request<Body> {
        signed_request_at(signer, body, &Utc::now().timestamp().to_string())
    }

    fn signed_request_at(signer: &TestSigner, body: &[u8], timestamp: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/interactions")
            .header("content-type", "application/json")
            .header(SIGNATURE_HEADER, signer.sign(timestamp, body))
            .header(TIMESTAMP_HEADER, timestamp)
            .body(Body::from(body.to_vec()))
            .unwrap()
    }

    async fn send(app: &TestApp, payload: Value) -> (StatusCode, Value) {
        let body = serde_json::to_vec(&payload).unwrap();
        let response = app
            .router
            .clone()
            .oneshot(signed_request(&app.signer, &body))
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn command_payload(id: &str, channel: &str) -> Value {
        json!({
            "id": id,
            "application_id": "app-1",
            "type": 2,
            "channel_id": channel,
            "token": "tok",
            "member": { "user": { "id": "user-1" }, "roles": ["role-admin"] },
            "data": { "id": "cmd-1", "name": "server", "type": 1 }
        })
    }

    fn component_payload(custom_id: &str, values: &[&str]) -> Value {
        let component_type = if values.is_empty() { 2 } else { 3 };
        json!({
            "id": "9000",
            "application_id": "app-1",
            "type": 3,
            "channel_id": "chan-ops",
            "token": "tok",
            "member": { "user": { "id": "user-1" }, "roles": ["role-admin"] },
            "data": {
                "custom_id": custom_id,
                "component_type": component_type,
                "values": values
            }
        })
    }

    #[tokio::test]
    async fn test_ping_answered_with_pong() {
        let app = create_test_app();
        let (status, body) = send(&app, json!({ "id": "1", "type": 1 })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "type": 1 }));
    }

    #[tokio::test]
    async fn test_bad_signature_is_unauthorized() {
        let app = create_test_app();
        let body = br#"{"id":"1","type":1}"#;
        let mut request = signed_request(&app.signer, body);
        request
            .headers_mut()
            .insert(TIMESTAMP_HEADER, "1700000001".parse().unwrap());

        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let error: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(error["error_code"], "INVALID_SIGNATURE");
    }

    #[tokio::test]
    async fn test_replayed_interaction_is_unauthorized() {
        let app = create_test_app();
        let body = serde_json::to_vec(&command_payload("5003", "chan-ops")).unwrap();
        let request = signed_request_at(&app.signer, &body, "1700000000");

        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let error: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(error["error_code"], "STALE_TIMESTAMP");
        assert_eq!(app.fleet.describe_calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_signature_headers_is_unauthorized() {
        let app = create_test_app();
        let request = Request::builder()
            .method("POST")
            .uri("/interactions")
            .body(Body::from(r#"{"id":"1","type":1}"#))
            .unwrap();

        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let app = create_test_app();
        let response = app
            .router
            .clone()
            .oneshot(signed_request(&app.signer, b"not json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_full_flow_over_http() {
        let app = create_test_app();

        let (status, body) = send(&app, command_payload("5000", "chan-ops")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["type"], 4);
        assert_eq!(body["data"]["flags"], 64);
        assert_eq!(
            body["data"]["content"],
            "Please select a server to change its state"
        );
        let menu = &body["data"]["components"][0]["components"][0];
        assert_eq!(menu["custom_id"], "select-minecraft-server:5000");
        assert_eq!(menu["options"][0]["value"], "i-a");

        let (_, body) = send(&app, component_payload("select-minecraft-server:5000", &["i-a"])).await;
        assert_eq!(body["data"]["content"], "Start or stop the server alpha?");
        let buttons = &body["data"]["components"][0]["components"];
        assert_eq!(buttons[0]["custom_id"], "start-server:5000");

        let (_, body) = send(&app, component_payload("start-server:5000", &[])).await;
        assert_eq!(body["data"]["content"], "Started server alpha");
        assert_eq!(app.fleet.control_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_wrong_channel_gets_rejection_reply() {
        let app = create_test_app();
        let (status, body) = send(&app, command_payload("5001", "chan-general")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["content"], "Unable to run command in this channel");
        assert_eq!(app.fleet.describe_calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_component_gets_unsupported_reply() {
        let app = create_test_app();
        let (status, body) = send(&app, component_payload("legacy-button", &[])).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["content"], "This interaction is not supported");
        assert_eq!(body["data"]["flags"], 64);
    }

    #[tokio::test]
    async fn test_unknown_command_gets_unsupported_reply() {
        let app = create_test_app();
        let mut payload = command_payload("5004", "chan-ops");
        payload["data"]["name"] = json!("legacy-status");

        let (status, body) = send(&app, payload).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["content"], "This interaction is not supported");
        assert_eq!(app.fleet.describe_calls(), 0);
    }

    #[tokio::test]
    async fn test_metrics_and_health_endpoints() {
        let app = create_test_app();
        send(&app, command_payload("5002", "chan-ops")).await;

        let response = app
            .router
            .clone()
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("fleetbot_interaction_total"));

        let response = app
            .router
            .clone()
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
