//! Axum handlers for the chat API.
//!
//! Each handler receives [`AxumState`] via [`axum::extract::State`] and
//! returns an axum [`Response`].

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::intent::Category;

use super::AxumState;

// ── Request types ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct MessageRequest {
    message: String,
    #[serde(default)]
    quick_reply: bool,
    #[serde(default)]
    session_id: Option<String>,
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Build a JSON error response body.
fn json_error(code: &str, msg: impl std::fmt::Display) -> Json<serde_json::Value> {
    Json(json!({ "error": code, "message": format!("{msg}") }))
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// GET /api/health
pub(super) async fn health(State(state): State<AxumState>) -> Response {
    let engine = state.comms.engine();
    let body = json!({
        "status": "ok",
        "owner": engine.knowledge().owner.name,
        "remote": engine.remote_configured(),
        "relay": state.relay.is_some(),
        "sessions": state.comms.session_count(),
    });
    (StatusCode::OK, Json(body)).into_response()
}

/// GET /api/quick-replies
pub(super) async fn quick_replies() -> Response {
    let items: Vec<serde_json::Value> = Category::QUICK_REPLIES
        .iter()
        .map(|c| json!({ "id": c.id(), "label": c.label() }))
        .collect();
    (StatusCode::OK, Json(items)).into_response()
}

/// POST /api/message
pub(super) async fn message(
    State(state): State<AxumState>,
    Json(req): Json<MessageRequest>,
) -> Response {
    let session_id = match req.session_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        None => None,
        Some(raw) => match Uuid::parse_str(raw) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(channel_id = %state.channel_id, "bad session id {raw:?}: {e}");
                return (StatusCode::BAD_REQUEST, json_error("bad_session_id", e)).into_response();
            }
        },
    };

    let (session_id, outcome) = state
        .comms
        .send_message(&state.channel_id, session_id, &req.message, req.quick_reply)
        .await;
    debug!(channel_id = %state.channel_id, %session_id, source = ?outcome.source, "message answered");

    let body = json!({
        "session_id": session_id,
        "reply": outcome.text,
        "source": outcome.source,
    });
    (StatusCode::OK, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    use super::super::{AxumState, build_router};
    use super::*;
    use crate::chat::ChatEngine;
    use crate::knowledge::KnowledgeBase;
    use crate::subsystems::comms::CommsState;

    fn router() -> axum::Router {
        let engine = Arc::new(ChatEngine::new(Arc::new(KnowledgeBase::test_default()), None));
        let (tx, _rx) = mpsc::channel(8);
        build_router(AxumState {
            channel_id: Arc::from("test"),
            comms: Arc::new(CommsState::new(engine, tx)),
            relay: None,
        })
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), 1 << 20).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_local_mode() {
        let resp = router()
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["remote"], false);
        assert_eq!(json["owner"], "Ada Example");
    }

    #[tokio::test]
    async fn quick_replies_listed_in_order() {
        let resp = router()
            .oneshot(Request::get("/api/quick-replies").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(resp).await;
        let ids: Vec<&str> = json.as_array().unwrap().iter().map(|v| v["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["work", "about", "skills", "contact"]);
    }

    #[tokio::test]
    async fn message_answers_and_assigns_session() {
        let resp = router()
            .oneshot(post_json("/api/message", json!({ "message": "lane detection" })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert!(json["reply"].as_str().unwrap().contains("Lane Detection System"));
        assert_eq!(json["source"], "local");
        assert!(Uuid::parse_str(json["session_id"].as_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn message_quick_reply() {
        let resp = router()
            .oneshot(post_json("/api/message", json!({ "message": "contact", "quick_reply": true })))
            .await
            .unwrap();
        let json = body_json(resp).await;
        assert!(json["reply"].as_str().unwrap().contains("mailto:ada@example.com"));
    }

    #[tokio::test]
    async fn bad_session_id_rejected() {
        let resp = router()
            .oneshot(post_json("/api/message", json!({ "message": "hi", "session_id": "nope" })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], "bad_session_id");
    }

    #[tokio::test]
    async fn relay_route_absent_without_upstream() {
        let resp = router()
            .oneshot(post_json("/api/chat", json!({})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
