//! Medical assistant replies and image analysis for the clinic service.

use std::sync::Arc;

use tracing::info;

use careline_core::config::Config;
use careline_core::{ChatTurn, Result};
use careline_providers::{
    ChatRequest, DEFAULT_CHAT_MODEL, DEFAULT_VISION_MODEL, GroqClient, system_message,
    user_message, user_message_with_image,
};

use crate::prompt::{CLINIC_SYSTEM_PROMPT, combined_image_prompt, conversation_context, medical_query_prompt};

pub struct ClinicComposer {
    client: Option<Arc<GroqClient>>,
    chat_model: String,
    vision_model: String,
}

impl ClinicComposer {
    pub fn from_config(config: &Config) -> Self {
        let groq = config.groq.clone().unwrap_or_default();
        let client = GroqClient::from_config(&groq).map(Arc::new);
        Self {
            client,
            chat_model: groq.chat_model.unwrap_or_else(|| DEFAULT_CHAT_MODEL.into()),
            vision_model: groq
                .vision_model
                .unwrap_or_else(|| DEFAULT_VISION_MODEL.into()),
        }
    }

    pub fn client(&self) -> Result<&Arc<GroqClient>> {
        self.client
            .as_ref()
            .ok_or_else(|| careline_core::CarelineError::Config("GROQ_API_KEY not configured".into()))
    }

    /// Answer a medical query grounded in recent conversation turns. Unlike
    /// the therapist, remote failures propagate so the edge can report them.
    pub async fn medical_reply(&self, query: &str, turns: &[ChatTurn]) -> Result<String> {
        let client = self.client()?;
        let context = conversation_context(turns);
        let prompt = medical_query_prompt(&context, query);

        let request = ChatRequest {
            model: self.chat_model.clone(),
            messages: vec![system_message(CLINIC_SYSTEM_PROMPT), user_message(&prompt)],
            max_tokens: 500,
            temperature: Some(0.7),
            top_p: None,
        };

        let reply = client.chat(&request).await?;
        info!(chars = reply.len(), "Medical reply composed");
        Ok(reply)
    }

    /// Analyze a base64-encoded image with the vision model.
    pub async fn analyze_image(
        &self,
        query: &str,
        media_type: &str,
        base64_image: &str,
        model: Option<&str>,
    ) -> Result<String> {
        let client = self.client()?;
        let model = model.unwrap_or(&self.vision_model);

        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![user_message_with_image(query, media_type, base64_image)],
            max_tokens: 500,
            temperature: None,
            top_p: None,
        };

        let analysis = client.chat(&request).await?;
        info!(model, chars = analysis.len(), "Image analysis composed");
        Ok(analysis)
    }

    /// Analyze an image while answering the patient's specific question,
    /// with conversation context woven into the prompt.
    pub async fn analyze_image_with_question(
        &self,
        question: &str,
        media_type: &str,
        base64_image: &str,
        turns: &[ChatTurn],
    ) -> Result<String> {
        let context = conversation_context(turns);
        let prompt = combined_image_prompt(&context, question);
        self.analyze_image(&prompt, media_type, base64_image, None)
            .await
    }

    pub fn chat_model(&self) -> &str {
        &self.chat_model
    }

    pub fn vision_model(&self) -> &str {
        &self.vision_model
    }
}
