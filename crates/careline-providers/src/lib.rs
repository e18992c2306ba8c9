//! Hosted model clients: Groq chat completions (text + vision) and
//! Whisper transcription over the OpenAI-compatible API.

pub mod groq;

pub use groq::{
    system_message, user_message, user_message_with_image, ChatRequest, GroqClient,
    DEFAULT_CHAT_MODEL, DEFAULT_STT_MODEL, DEFAULT_VISION_MODEL,
};
