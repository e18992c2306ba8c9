//! Session model: in-memory, per-conversation state keyed by a
//! client-supplied identifier.
//!
//! Sessions live only in process memory and are gone on restart. The store
//! is an explicit object with a single store-level `RwLock` as its
//! concurrency discipline; histories are append-only and ordered by arrival.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::emotion::EmotionLabel;

/// A single emotion reading appended to a session. Never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionObservation {
    pub emotion: EmotionLabel,
    pub confidence: f32,
    pub timestamp: DateTime<Utc>,
}

impl EmotionObservation {
    pub fn now(emotion: EmotionLabel, confidence: f32) -> Self {
        Self {
            emotion,
            confidence,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    Patient,
    Assistant,
}

/// One conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

/// Per-conversation state. Created on first touch of an unseen identifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    pub emotions: Vec<EmotionObservation>,
    pub turns: Vec<ChatTurn>,
    pub current: Option<EmotionObservation>,
}

/// In-memory session store.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Append an emotion observation and make it the session's current one.
    pub async fn record_emotion(&self, session_id: &str, emotion: EmotionLabel, confidence: f32) {
        let obs = EmotionObservation::now(emotion, confidence);
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(session_id.to_string()).or_default();
        session.emotions.push(obs.clone());
        session.current = Some(obs);
        debug!(session_id, %emotion, confidence, "Recorded emotion");
    }

    /// Append a conversation turn.
    pub async fn record_turn(&self, session_id: &str, role: ChatRole, content: impl Into<String>) {
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(session_id.to_string()).or_default();
        session.turns.push(ChatTurn {
            role,
            content: content.into(),
        });
    }

    /// The most recent observation, if any.
    pub async fn current_emotion(&self, session_id: &str) -> Option<EmotionObservation> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).and_then(|s| s.current.clone())
    }

    /// Up to the last `n` emotion labels, oldest first.
    pub async fn recent_emotions(&self, session_id: &str, n: usize) -> Vec<EmotionLabel> {
        let sessions = self.sessions.read().await;
        let Some(session) = sessions.get(session_id) else {
            return Vec::new();
        };
        let start = session.emotions.len().saturating_sub(n);
        session.emotions[start..].iter().map(|o| o.emotion).collect()
    }

    /// Full emotion history snapshot, ordered by arrival.
    pub async fn emotions(&self, session_id: &str) -> Vec<EmotionObservation> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .map(|s| s.emotions.clone())
            .unwrap_or_default()
    }

    /// Full conversation history snapshot.
    pub async fn history(&self, session_id: &str) -> Vec<ChatTurn> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .map(|s| s.turns.clone())
            .unwrap_or_default()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unseen_session_created_on_first_record() {
        let store = SessionStore::new();
        assert_eq!(store.session_count().await, 0);

        store.record_emotion("s1", EmotionLabel::Happy, 0.7).await;
        assert_eq!(store.session_count().await, 1);
        assert_eq!(
            store.current_emotion("s1").await.unwrap().emotion,
            EmotionLabel::Happy
        );
    }

    #[tokio::test]
    async fn test_emotion_history_append_only_ordered() {
        let store = SessionStore::new();
        let labels = [
            EmotionLabel::Neutral,
            EmotionLabel::Sad,
            EmotionLabel::Happy,
            EmotionLabel::Angry,
        ];
        for label in labels {
            store.record_emotion("s1", label, 0.5).await;
        }

        let history = store.emotions("s1").await;
        assert_eq!(history.len(), 4);
        let seen: Vec<EmotionLabel> = history.iter().map(|o| o.emotion).collect();
        assert_eq!(seen, labels);
        // timestamps never go backwards
        for pair in history.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
    }

    #[tokio::test]
    async fn test_recent_emotions_window() {
        let store = SessionStore::new();
        for _ in 0..3 {
            store.record_emotion("s1", EmotionLabel::Neutral, 0.5).await;
        }
        for _ in 0..4 {
            store.record_emotion("s1", EmotionLabel::Sad, 0.6).await;
        }

        let recent = store.recent_emotions("s1", 5).await;
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0], EmotionLabel::Neutral);
        assert!(recent[1..].iter().all(|l| *l == EmotionLabel::Sad));

        // Unknown session yields an empty window, not an error.
        assert!(store.recent_emotions("nope", 5).await.is_empty());
    }

    #[tokio::test]
    async fn test_turns_recorded_in_order() {
        let store = SessionStore::new();
        store.record_turn("s1", ChatRole::Patient, "hello").await;
        store.record_turn("s1", ChatRole::Assistant, "hi there").await;

        let turns = store.history("s1").await;
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, ChatRole::Patient);
        assert_eq!(turns[1].role, ChatRole::Assistant);
    }
}
