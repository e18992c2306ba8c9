//! Shared service state.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use careline_composer::{ClinicComposer, TherapistComposer};
use careline_core::SessionStore;
use careline_core::config::Config;
use careline_media::TtsEngine;
use careline_providers::{DEFAULT_STT_MODEL, GroqClient};
use careline_vision::EmotionPipeline;

/// Shared state for both services, accessible from every handler.
pub struct AppState {
    pub config: Arc<Config>,
    pub store: SessionStore,
    pub pipeline: EmotionPipeline,
    pub therapist: TherapistComposer,
    pub clinic: ClinicComposer,
    pub tts: TtsEngine,
    pub groq: Option<Arc<GroqClient>>,
    pub stt_model: String,
    /// session_id -> connection id for live WebSocket clients.
    pub connections: RwLock<HashMap<String, String>>,
}

impl AppState {
    pub fn from_config(config: Arc<Config>) -> Self {
        let groq_cfg = config.groq.clone().unwrap_or_default();
        let groq = GroqClient::from_config(&groq_cfg).map(Arc::new);

        Self {
            therapist: TherapistComposer::from_config(&config),
            clinic: ClinicComposer::from_config(&config),
            tts: TtsEngine::new(config.audio_dir()),
            stt_model: groq_cfg
                .stt_model
                .unwrap_or_else(|| DEFAULT_STT_MODEL.into()),
            store: SessionStore::new(),
            pipeline: EmotionPipeline::new(),
            groq,
            connections: RwLock::new(HashMap::new()),
            config,
        }
    }
}
