//! JSON API routes for the chat surface.
//!
//! - `POST   /api/chat`                — process one message for a session
//! - `GET    /api/session/{session_id}` — session summary or 404
//! - `DELETE /api/session/{session_id}` — idempotent removal
//! - `GET    /api/stats`               — registry counters

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use uuid::Uuid;

use autostream_agent::TurnRuntime;
use autostream_core::{
    ChannelAnalysis, Intent, InterfaceError, PublicState, SessionRecord, SessionSummary,
};
use autostream_memory::{SessionLocks, SessionStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SessionStore>,
    pub locks: Arc<SessionLocks>,
    pub runtime: Arc<TurnRuntime>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub intent: Intent,
    pub state: PublicState,
    pub ui_components: UiComponents,
}

/// Frontend hints derived from the post-turn record; keys only appear when
/// they carry a signal.
#[derive(Debug, Default, Serialize)]
pub struct UiComponents {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub show_pricing_cards: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub show_plan_comparison: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub show_youtube_permission: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube_channel: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub show_confirmation: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub show_success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube_analysis: Option<ChannelAnalysis>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct AckBody {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_sessions: usize,
    pub max_sessions: usize,
    pub oldest_session: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/session/{session_id}", get(get_session).delete(delete_session))
        .route("/api/stats", get(get_stats))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ErrorBody>)> {
    let correlation_id = Uuid::new_v4().to_string();

    if request.message.trim().is_empty() {
        return Err(error_response(InterfaceError::BadRequest {
            message: "message must not be empty".to_string(),
            correlation_id,
        }));
    }

    // The stripe is held for the whole read-modify-write so two concurrent
    // turns for the same session never interleave; other sessions proceed.
    let _turn_guard = state.locks.for_session(&request.session_id).lock().await;

    let record = state.store.get_or_create(&request.session_id);
    let (mut record, outcome) = match state.runtime.run_turn(record, &request.message).await {
        Ok(result) => result,
        Err(application_error) => {
            error!(
                event_name = "server.chat.turn_failed",
                session_id = %request.session_id,
                correlation_id = %correlation_id,
                error = %application_error,
                "turn orchestration failed"
            );
            return Err(error_response(application_error.into_interface(correlation_id)));
        }
    };

    let ui_components = build_ui_components(&mut record, outcome.intent);
    state.store.update(&request.session_id, record.clone());

    info!(
        event_name = "server.chat.turn_completed",
        session_id = %request.session_id,
        correlation_id = %correlation_id,
        intent = %outcome.intent,
        phase = %record.phase,
        captured_now = outcome.captured_now,
        "chat turn completed"
    );

    Ok(Json(ChatResponse {
        reply: outcome.reply,
        intent: outcome.intent,
        state: record.public_state(),
        ui_components,
    }))
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionSummary>, (StatusCode, Json<ErrorBody>)> {
    match state.store.get(&session_id) {
        Some(record) => Ok(Json(record.summary())),
        None => Err(error_response(InterfaceError::NotFound {
            message: format!("session `{session_id}` unknown or expired"),
            correlation_id: Uuid::new_v4().to_string(),
        })),
    }
}

async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Json<AckBody> {
    state.store.delete(&session_id);
    Json(AckBody { message: format!("Session {session_id} deleted") })
}

async fn get_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.store.stats();
    Json(StatsResponse {
        total_sessions: stats.total_sessions,
        max_sessions: stats.max_sessions,
        oldest_session: stats.oldest_session,
    })
}

fn build_ui_components(record: &mut SessionRecord, intent: Intent) -> UiComponents {
    let mut components = UiComponents {
        show_pricing_cards: intent == Intent::Pricing && record.selected_plan.is_none(),
        show_plan_comparison: record.selected_plan.as_deref() == Some("basic"),
        show_confirmation: record.name.is_some()
            && record.email.is_some()
            && record.platform.is_some()
            && !record.lead_captured,
        show_success: record.lead_captured,
        youtube_analysis: record.channel_analysis.clone(),
        ..UiComponents::default()
    };

    // Ask for channel permission once per session, then latch.
    if let Some(channel_link) = &record.channel_link {
        if !record.channel_permission_asked {
            components.show_youtube_permission = true;
            components.youtube_channel = Some(channel_link.clone());
            record.channel_permission_asked = true;
        }
    }

    components
}

fn error_response(interface_error: InterfaceError) -> (StatusCode, Json<ErrorBody>) {
    let status = match &interface_error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorBody { error: interface_error.user_message().to_string() }))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use anyhow::Result;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use autostream_agent::{
        ContextRetriever, HandleChannelLookup, LlmClient, TracingLeadSink, TurnRuntime,
    };
    use autostream_memory::{SessionLocks, SessionStore};

    use super::{router, AppState};

    struct CannedLlm {
        replies: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmClient for CannedLlm {
        async fn complete(&self, _system_prompt: &str, _user_message: &str) -> Result<String> {
            let mut replies = self.replies.lock().expect("reply lock");
            Ok(if replies.is_empty() { "Hello! INTENT: greeting".to_string() } else {
                replies.remove(0)
            })
        }
    }

    struct NoContext;

    #[async_trait]
    impl ContextRetriever for NoContext {
        async fn retrieve(&self, _query: &str, _top_k: usize) -> Vec<String> {
            Vec::new()
        }
    }

    fn test_state(replies: Vec<&str>) -> AppState {
        let llm = Arc::new(CannedLlm {
            replies: Mutex::new(replies.into_iter().map(str::to_string).collect()),
        });
        let runtime = TurnRuntime::new(
            llm,
            Arc::new(NoContext),
            Arc::new(HandleChannelLookup),
            Arc::new(TracingLeadSink),
            3,
        );
        AppState {
            store: Arc::new(SessionStore::new(10, Duration::from_secs(3600), 6)),
            locks: Arc::new(SessionLocks::default()),
            runtime: Arc::new(runtime),
        }
    }

    fn chat_request(session_id: &str, message: &str) -> Request<Body> {
        let body = serde_json::json!({ "session_id": session_id, "message": message });
        Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request builds")
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body bytes");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn chat_round_trip_returns_reply_intent_and_state() {
        let app = router(test_state(vec!["Welcome aboard! INTENT: greeting"]));

        let response =
            app.oneshot(chat_request("s-http", "Hi there")).await.expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["reply"], "Welcome aboard!");
        assert_eq!(body["intent"], "greeting");
        assert_eq!(body["state"]["conversation_state"], "DISCOVERY");
        assert_eq!(body["state"]["turn_count"], 1);
        assert_eq!(body["state"]["lead_captured"], false);
    }

    #[tokio::test]
    async fn empty_message_is_rejected_with_400() {
        let app = router(test_state(Vec::new()));

        let response =
            app.oneshot(chat_request("s-http", "   ")).await.expect("router responds");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_body(response).await;
        assert!(body["error"].as_str().expect("error string").contains("could not be processed"));
    }

    #[tokio::test]
    async fn unknown_session_summary_is_404() {
        let app = router(test_state(Vec::new()));

        let request = Request::builder()
            .uri("/api/session/never-seen")
            .body(Body::empty())
            .expect("request builds");
        let response = app.oneshot(request).await.expect("router responds");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Session not found");
    }

    #[tokio::test]
    async fn session_summary_round_trip_after_chat() {
        let state = test_state(vec!["Hi Sarah! INTENT: greeting"]);
        let app = router(state);

        let response = app
            .clone()
            .oneshot(chat_request("s-summary", "my name is sarah"))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);

        let request = Request::builder()
            .uri("/api/session/s-summary")
            .body(Body::empty())
            .expect("request builds");
        let response = app.oneshot(request).await.expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["session_id"], "s-summary");
        assert_eq!(body["name"], "Sarah");
        assert_eq!(body["message_count"], 2);
    }

    #[tokio::test]
    async fn delete_is_idempotent_over_http() {
        let state = test_state(Vec::new());
        let app = router(state);

        for _ in 0..2 {
            let request = Request::builder()
                .method("DELETE")
                .uri("/api/session/s-del")
                .body(Body::empty())
                .expect("request builds");
            let response = app.clone().oneshot(request).await.expect("router responds");
            assert_eq!(response.status(), StatusCode::OK);

            let body = json_body(response).await;
            assert_eq!(body["message"], "Session s-del deleted");
        }
    }

    #[tokio::test]
    async fn stats_reports_registry_counters() {
        let state = test_state(vec![
            "Hello! INTENT: greeting",
            "Hello again! INTENT: greeting",
        ]);
        let app = router(state);

        for session in ["s-one", "s-two"] {
            let response = app
                .clone()
                .oneshot(chat_request(session, "hello"))
                .await
                .expect("router responds");
            assert_eq!(response.status(), StatusCode::OK);
        }

        let request =
            Request::builder().uri("/api/stats").body(Body::empty()).expect("request builds");
        let response = app.oneshot(request).await.expect("router responds");

        let body = json_body(response).await;
        assert_eq!(body["total_sessions"], 2);
        assert_eq!(body["max_sessions"], 10);
        assert_eq!(body["oldest_session"], "s-one");
    }

    #[tokio::test]
    async fn youtube_permission_hint_appears_exactly_once() {
        let state = test_state(vec![
            "Nice channel! INTENT: info",
            "Anything else? INTENT: info",
        ]);
        let app = router(state);

        let response = app
            .clone()
            .oneshot(chat_request("s-ui", "my channel is youtube.com/@sarahedits"))
            .await
            .expect("router responds");
        let body = json_body(response).await;
        assert_eq!(body["ui_components"]["show_youtube_permission"], true);
        assert_eq!(body["ui_components"]["youtube_channel"], "youtube.com/@sarahedits");
        assert!(body["ui_components"]["youtube_analysis"].is_object());

        let response = app
            .oneshot(chat_request("s-ui", "so what do you think?"))
            .await
            .expect("router responds");
        let body = json_body(response).await;
        assert!(
            body["ui_components"].get("show_youtube_permission").is_none(),
            "permission hint must not repeat: {body}"
        );
    }
}
