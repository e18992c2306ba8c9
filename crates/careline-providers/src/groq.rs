//! Groq client: single-shot chat completions via `/chat/completions` and
//! Whisper transcription via `/audio/transcriptions`.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use careline_core::config::GroqConfig;

const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

pub const DEFAULT_CHAT_MODEL: &str = "llama-3.1-8b-instant";
pub const DEFAULT_VISION_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";
pub const DEFAULT_STT_MODEL: &str = "whisper-large-v3";

pub struct GroqClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

/// A single non-streaming completion request with fixed sampling parameters.
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<serde_json::Value>,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Build a system message.
pub fn system_message(text: &str) -> serde_json::Value {
    json!({ "role": "system", "content": text })
}

/// Build a plain-text user message.
pub fn user_message(text: &str) -> serde_json::Value {
    json!({ "role": "user", "content": text })
}

/// Build a multimodal user message carrying an inline base64 image as a
/// data-URI `image_url` part.
pub fn user_message_with_image(text: &str, media_type: &str, base64_data: &str) -> serde_json::Value {
    json!({
        "role": "user",
        "content": [
            { "type": "text", "text": text },
            {
                "type": "image_url",
                "image_url": { "url": format!("data:{media_type};base64,{base64_data}") }
            }
        ]
    })
}

impl GroqClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, GROQ_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Build a client from config. `None` when no API key is resolvable;
    /// callers decide whether that degrades or is a hard config error.
    pub fn from_config(config: &GroqConfig) -> Option<Self> {
        let api_key = config.resolve_api_key()?;
        let base_url = config.base_url.as_deref().unwrap_or(GROQ_BASE_URL);
        Some(Self::with_base_url(api_key, base_url))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Single-shot chat completion. Returns the first choice's content.
    pub async fn chat(&self, request: &ChatRequest) -> anyhow::Result<String> {
        debug!(model = %request.model, messages = request.messages.len(), "Groq chat completion");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Groq API error {status}: {body}");
        }

        let body: ChatCompletionResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow::anyhow!("Groq response contained no choices"))?;

        Ok(content)
    }

    /// Transcribe audio bytes with Whisper (`response_format=text`).
    pub async fn transcribe(
        &self,
        audio: Vec<u8>,
        file_name: &str,
        model: &str,
        language: Option<&str>,
    ) -> anyhow::Result<String> {
        let file_part = reqwest::multipart::Part::bytes(audio)
            .file_name(file_name.to_string())
            .mime_str("application/octet-stream")?;

        let mut form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("model", model.to_string())
            .text("response_format", "text");

        if let Some(lang) = language {
            form = form.text("language", lang.to_string());
        }

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .header("authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Transcription API error {status}: {body}");
        }

        let transcript = response.text().await?;
        let transcript = transcript.trim().to_string();

        debug!(model, file = file_name, chars = transcript.len(), "Audio transcribed");
        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = GroqClient::with_base_url("key", "https://proxy.example.com/");
        assert_eq!(client.base_url(), "https://proxy.example.com");
    }

    #[test]
    fn test_from_config_without_key() {
        let config = GroqConfig {
            api_key_env: Some("CARELINE_TEST_NO_SUCH_KEY".into()),
            ..Default::default()
        };
        // No direct key and the env var is unset: GROQ_API_KEY may be set in
        // the environment, so only assert when it is not.
        if std::env::var("GROQ_API_KEY").is_err() {
            assert!(GroqClient::from_config(&config).is_none());
        }
    }

    #[test]
    fn test_chat_request_serialization_skips_unset_sampling() {
        let req = ChatRequest {
            model: DEFAULT_CHAT_MODEL.into(),
            messages: vec![user_message("hi")],
            max_tokens: 200,
            temperature: None,
            top_p: None,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["model"], DEFAULT_CHAT_MODEL);
        assert_eq!(value["max_tokens"], 200);
        assert!(value.get("temperature").is_none());
        assert!(value.get("top_p").is_none());
    }

    #[test]
    fn test_user_message_with_image_is_data_uri() {
        let msg = user_message_with_image("What is this?", "image/jpeg", "aWtlcG5n");
        assert_eq!(msg["role"], "user");
        let parts = msg["content"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["type"], "image_url");
        let url = parts[1]["image_url"]["url"].as_str().unwrap();
        assert!(url.starts_with("data:image/jpeg;base64,"));
        assert!(url.ends_with("aWtlcG5n"));
    }

    #[test]
    fn test_response_deserialization() {
        let raw = r#"{"id":"chatcmpl-1","choices":[{"index":0,"message":{"role":"assistant","content":"Hello there."}}]}"#;
        let resp: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            resp.choices[0].message.content.as_deref(),
            Some("Hello there.")
        );
    }

    #[tokio::test]
    async fn test_chat_unreachable_host_is_error() {
        let client = GroqClient::with_base_url("key", "http://127.0.0.1:1");
        let req = ChatRequest {
            model: DEFAULT_CHAT_MODEL.into(),
            messages: vec![user_message("hi")],
            max_tokens: 16,
            temperature: None,
            top_p: None,
        };
        assert!(client.chat(&req).await.is_err());
    }
}
