//! Therapy service routes: emotion detection, emotion-aware chat, and
//! per-session emotion history.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use careline_core::{ChatRole, EmotionLabel, EmotionObservation};

use crate::connection::ws_handler;
use crate::error::ApiError;
use crate::state::AppState;

/// Number of recent emotion labels fed into the therapist prompt.
pub(crate) const RECENT_EMOTION_WINDOW: usize = 5;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/detect-emotion", post(detect_emotion))
        .route("/chat", post(chat))
        .route("/update-mood", post(update_mood))
        .route("/session/{session_id}/emotions", get(session_emotions))
        .route("/ws/{session_id}", get(ws_handler))
        .with_state(state)
}

/// Decode a client image payload, stripping an optional `data:` URL prefix.
pub(crate) fn decode_image_payload(data: &str) -> Option<Vec<u8>> {
    let encoded = if data.starts_with("data:") {
        data.split_once(',').map(|(_, rest)| rest)?
    } else {
        data
    };
    base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()
}

/// Detect, record, and return the emotion for one frame. Undecodable
/// payloads degrade to the no-face sentinel rather than failing the request.
pub(crate) async fn observe_frame(state: &AppState, session_id: &str, image_data: &str) -> (EmotionLabel, f32) {
    let (emotion, confidence) = match decode_image_payload(image_data) {
        Some(bytes) => state.pipeline.detect_emotion(&bytes),
        None => {
            debug!(session_id, "Image payload was not valid base64");
            (EmotionLabel::NoFace, 0.0)
        }
    };
    state.store.record_emotion(session_id, emotion, confidence).await;
    (emotion, confidence)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "Careline therapy service is running", "status": "healthy" }))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let connections = state.connections.read().await.len();
    Json(json!({
        "status": "healthy",
        "services": {
            "vision": true,
            "groq_ai": state.therapist.has_client(),
        },
        "connections": connections,
    }))
}

#[derive(Deserialize)]
struct DetectEmotionRequest {
    image_data: String,
    session_id: String,
}

#[derive(Serialize)]
struct DetectEmotionResponse {
    emotion: EmotionLabel,
    confidence: f32,
    session_id: String,
}

async fn detect_emotion(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DetectEmotionRequest>,
) -> Json<DetectEmotionResponse> {
    let (emotion, confidence) = observe_frame(&state, &request.session_id, &request.image_data).await;
    Json(DetectEmotionResponse {
        emotion,
        confidence,
        session_id: request.session_id,
    })
}

#[derive(Deserialize)]
struct TherapyChatRequest {
    message: String,
    session_id: String,
    #[serde(default)]
    mood: Option<String>,
}

#[derive(Serialize)]
struct TherapyChatResponse {
    response: String,
    session_id: String,
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TherapyChatRequest>,
) -> Json<TherapyChatResponse> {
    // Mood precedence: explicit request value, then the stored current
    // observation, then neutral.
    let mood = request
        .mood
        .as_deref()
        .filter(|m| !m.is_empty())
        .and_then(EmotionLabel::parse)
        .or(state
            .store
            .current_emotion(&request.session_id)
            .await
            .map(|obs| obs.emotion))
        .unwrap_or(EmotionLabel::Neutral);

    let recent = state
        .store
        .recent_emotions(&request.session_id, RECENT_EMOTION_WINDOW)
        .await;

    let response = state.therapist.reply(&request.message, mood, &recent).await;

    state
        .store
        .record_turn(&request.session_id, ChatRole::Patient, &request.message)
        .await;
    state
        .store
        .record_turn(&request.session_id, ChatRole::Assistant, &response)
        .await;

    info!(session_id = %request.session_id, %mood, "Chat turn completed");
    Json(TherapyChatResponse {
        response,
        session_id: request.session_id,
    })
}

#[derive(Deserialize)]
struct UpdateMoodRequest {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    mood: Option<String>,
}

async fn update_mood(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UpdateMoodRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (session_id, mood) = match (request.session_id, request.mood) {
        (Some(s), Some(m)) if !s.is_empty() && !m.is_empty() => (s, m),
        _ => return Err(ApiError::bad_request("session_id and mood are required")),
    };

    let Some(emotion) = EmotionLabel::parse(&mood) else {
        return Err(ApiError::bad_request(format!("Unknown mood label: {mood}")));
    };

    state.store.record_emotion(&session_id, emotion, 1.0).await;
    Ok(Json(json!({ "status": "success", "message": "Mood updated successfully" })))
}

#[derive(Serialize)]
struct EmotionHistoryResponse {
    session_id: String,
    emotions: Vec<EmotionObservation>,
    current_emotion: Option<EmotionObservation>,
}

async fn session_emotions(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Json<EmotionHistoryResponse> {
    let emotions = state.store.emotions(&session_id).await;
    let current_emotion = state.store.current_emotion(&session_id).await;
    Json(EmotionHistoryResponse {
        session_id,
        emotions,
        current_emotion,
    })
}
