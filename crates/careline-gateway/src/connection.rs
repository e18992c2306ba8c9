//! WebSocket session lifecycle for the therapy service.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use careline_core::{ChatRole, EmotionLabel};

use crate::state::AppState;
use crate::therapy::{RECENT_EMOTION_WINDOW, observe_frame};

/// Client -> server frames. Unknown types are ignored rather than closing
/// the connection.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WsInbound {
    EmotionDetection { image_data: String },
    Chat { message: String },
    #[serde(other)]
    Unknown,
}

/// Server -> client frames.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WsOutbound {
    EmotionDetected { emotion: EmotionLabel, confidence: f32 },
    ChatResponse { response: String },
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(session_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_session(state, session_id, socket))
}

async fn handle_ws_session(state: Arc<AppState>, session_id: String, mut ws: WebSocket) {
    let conn_id = Uuid::new_v4().to_string();
    info!(%session_id, %conn_id, "WebSocket session opened");

    {
        let mut connections = state.connections.write().await;
        connections.insert(session_id.clone(), conn_id.clone());
    }

    while let Some(msg) = ws.recv().await {
        let msg = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(err) => {
                debug!(%session_id, error = %err, "WebSocket read error");
                break;
            }
        };

        let inbound: WsInbound = match serde_json::from_str(&msg) {
            Ok(frame) => frame,
            Err(err) => {
                debug!(%session_id, error = %err, "Unparseable WS frame ignored");
                continue;
            }
        };

        let outbound = match inbound {
            WsInbound::EmotionDetection { image_data } => {
                let (emotion, confidence) = observe_frame(&state, &session_id, &image_data).await;
                Some(WsOutbound::EmotionDetected { emotion, confidence })
            }
            WsInbound::Chat { message } => {
                let mood = state
                    .store
                    .current_emotion(&session_id)
                    .await
                    .map(|obs| obs.emotion)
                    .unwrap_or(EmotionLabel::Neutral);
                let recent = state
                    .store
                    .recent_emotions(&session_id, RECENT_EMOTION_WINDOW)
                    .await;

                let response = state.therapist.reply(&message, mood, &recent).await;
                state
                    .store
                    .record_turn(&session_id, ChatRole::Patient, &message)
                    .await;
                state
                    .store
                    .record_turn(&session_id, ChatRole::Assistant, &response)
                    .await;

                Some(WsOutbound::ChatResponse { response })
            }
            WsInbound::Unknown => {
                debug!(%session_id, "Unknown WS frame type ignored");
                None
            }
        };

        if let Some(frame) = outbound {
            let text = match serde_json::to_string(&frame) {
                Ok(text) => text,
                Err(err) => {
                    warn!(%session_id, error = %err, "WS frame serialization failed");
                    continue;
                }
            };
            if ws.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    }

    // Only drop the registry entry if it still belongs to this connection;
    // the client may have reconnected under the same session id.
    {
        let mut connections = state.connections.write().await;
        if connections.get(&session_id) == Some(&conn_id) {
            connections.remove(&session_id);
        }
    }
    info!(%session_id, %conn_id, "WebSocket session closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_frame_parsing() {
        let frame: WsInbound =
            serde_json::from_str(r#"{"type":"emotion_detection","image_data":"abcd"}"#).unwrap();
        assert!(matches!(frame, WsInbound::EmotionDetection { .. }));

        let frame: WsInbound = serde_json::from_str(r#"{"type":"chat","message":"hi"}"#).unwrap();
        assert!(matches!(frame, WsInbound::Chat { .. }));

        let frame: WsInbound = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(frame, WsInbound::Unknown));
    }

    #[test]
    fn test_outbound_frames_are_tagged() {
        let frame = WsOutbound::EmotionDetected {
            emotion: EmotionLabel::Happy,
            confidence: 0.7,
        };
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["type"], "emotion_detected");
        assert_eq!(value["emotion"], "Happy");

        let frame = WsOutbound::ChatResponse {
            response: "hello".into(),
        };
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["type"], "chat_response");
        assert_eq!(value["response"], "hello");
    }
}
