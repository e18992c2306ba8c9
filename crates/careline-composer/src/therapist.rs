//! Emotion-aware therapist replies.

use std::sync::Arc;

use tracing::{info, warn};

use careline_core::EmotionLabel;
use careline_core::config::Config;
use careline_providers::{ChatRequest, DEFAULT_CHAT_MODEL, GroqClient, system_message, user_message};

use crate::guidance::{FALLBACK_REPLY, GuidanceTable, UNAVAILABLE_REPLY};
use crate::prompt::{DEFAULT_PERSONA, therapist_system_prompt, therapist_user_prompt};

pub struct TherapistComposer {
    client: Option<Arc<GroqClient>>,
    model: String,
    persona: String,
    guidance: GuidanceTable,
}

impl TherapistComposer {
    pub fn from_config(config: &Config) -> Self {
        let groq = config.groq.clone().unwrap_or_default();
        let client = GroqClient::from_config(&groq).map(Arc::new);
        if client.is_none() {
            warn!("No Groq API key configured, therapist replies will degrade");
        }

        let prompts = config.prompts.clone().unwrap_or_default();
        Self {
            client,
            model: groq.chat_model.unwrap_or_else(|| DEFAULT_CHAT_MODEL.into()),
            persona: prompts.persona.unwrap_or_else(|| DEFAULT_PERSONA.into()),
            guidance: GuidanceTable::with_overrides(&prompts.guidance),
        }
    }

    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    /// Compose a reply to `message` given the patient's current emotion and
    /// up to five recent labels. Never fails: remote errors degrade to a
    /// canned reply so the conversation keeps moving.
    pub async fn reply(
        &self,
        message: &str,
        emotion: EmotionLabel,
        recent: &[EmotionLabel],
    ) -> String {
        let Some(client) = &self.client else {
            return UNAVAILABLE_REPLY.to_string();
        };

        let system = therapist_system_prompt(&self.persona, self.guidance.lookup(emotion), emotion);
        let user = therapist_user_prompt(message, emotion, recent);

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![system_message(&system), user_message(&user)],
            max_tokens: 200,
            temperature: Some(0.8),
            top_p: Some(0.9),
        };

        match client.chat(&request).await {
            Ok(reply) => {
                info!(%emotion, chars = reply.len(), "Therapist reply composed");
                reply
            }
            Err(err) => {
                warn!(%emotion, error = %err, "Therapist completion failed, using fallback");
                FALLBACK_REPLY.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use careline_core::config::GroqConfig;

    fn unreachable_composer() -> TherapistComposer {
        let config = Config {
            groq: Some(GroqConfig {
                api_key: Some("test-key".into()),
                base_url: Some("http://127.0.0.1:1".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        TherapistComposer::from_config(&config)
    }

    #[tokio::test]
    async fn test_remote_failure_returns_fallback_literal() {
        let composer = unreachable_composer();
        assert!(composer.has_client());
        let reply = composer.reply("hello", EmotionLabel::Sad, &[]).await;
        assert_eq!(reply, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn test_missing_client_returns_unavailable() {
        let config = Config {
            groq: Some(GroqConfig {
                api_key_env: Some("CARELINE_TEST_NO_SUCH_KEY".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let composer = TherapistComposer::from_config(&config);
        if !composer.has_client() {
            let reply = composer.reply("hello", EmotionLabel::Neutral, &[]).await;
            assert_eq!(reply, UNAVAILABLE_REPLY);
        }
    }
}
