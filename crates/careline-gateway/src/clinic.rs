//! Clinic service routes: image analysis, transcription, combined
//! voice-and-vision analysis, speech synthesis, and medical chat.

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use careline_core::{ChatRole, ChatTurn};
use careline_composer::prompt::IMAGE_ONLY_QUERY;

use crate::error::ApiError;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/analyze-image", post(analyze_image))
        .route("/transcribe-audio", post(transcribe_audio))
        .route("/analyze-combined", post(analyze_combined))
        .route("/text-to-speech", post(text_to_speech))
        .route("/audio/{filename}", get(serve_audio))
        .route("/analyze-text", post(analyze_text))
        .route("/analyze", post(analyze))
        .route("/chat", post(chat))
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "Careline clinic service is running", "status": "healthy" }))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "services": {
            "groq_ai": state.groq.is_some(),
            "tts": true,
        },
    }))
}

/// One uploaded file: raw bytes plus the declared content type.
struct Upload {
    bytes: Vec<u8>,
    content_type: String,
    file_name: String,
}

/// Collected multipart fields for the clinic endpoints.
#[derive(Default)]
struct ClinicForm {
    image: Option<Upload>,
    audio: Option<Upload>,
    query: Option<String>,
    model: Option<String>,
}

impl ClinicForm {
    async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| ApiError::bad_request(format!("Invalid multipart body: {err}")))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "file" | "image_file" => {
                    let content_type = field.content_type().unwrap_or_default().to_string();
                    let file_name = field.file_name().unwrap_or("upload").to_string();
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|err| ApiError::bad_request(format!("Failed to read {name}: {err}")))?
                        .to_vec();
                    let upload = Upload { bytes, content_type, file_name };
                    // /transcribe-audio posts its audio under "file" too
                    if name == "image_file" || upload.content_type.starts_with("image/") {
                        form.image = Some(upload);
                    } else {
                        form.audio = Some(upload);
                    }
                }
                "audio_file" => {
                    let content_type = field.content_type().unwrap_or_default().to_string();
                    let file_name = field.file_name().unwrap_or("upload").to_string();
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|err| ApiError::bad_request(format!("Failed to read {name}: {err}")))?
                        .to_vec();
                    form.audio = Some(Upload { bytes, content_type, file_name });
                }
                "query" => {
                    form.query = Some(field.text().await.unwrap_or_default());
                }
                "model" => {
                    form.model = Some(field.text().await.unwrap_or_default());
                }
                _ => {}
            }
        }
        Ok(form)
    }

    fn require_image(&self) -> Result<&Upload, ApiError> {
        let image = self
            .image
            .as_ref()
            .ok_or_else(|| ApiError::bad_request("Missing image file"))?;
        if !image.content_type.starts_with("image/") {
            return Err(ApiError::bad_request("File must be an image"));
        }
        Ok(image)
    }

    fn require_audio(&self) -> Result<&Upload, ApiError> {
        let audio = self
            .audio
            .as_ref()
            .ok_or_else(|| ApiError::bad_request("Missing audio file"))?;
        if !audio.content_type.starts_with("audio/") {
            return Err(ApiError::bad_request("File must be an audio file"));
        }
        Ok(audio)
    }
}

fn encode_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

#[derive(Serialize)]
struct ImageAnalysisResponse {
    success: bool,
    analysis: String,
    model_used: String,
}

async fn analyze_image(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<ImageAnalysisResponse>, ApiError> {
    let form = ClinicForm::from_multipart(multipart).await?;
    let image = form.require_image()?;
    let query = form
        .query
        .as_deref()
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::bad_request("query is required"))?;

    let analysis = state
        .clinic
        .analyze_image(
            query,
            &image.content_type,
            &encode_base64(&image.bytes),
            form.model.as_deref().filter(|m| !m.is_empty()),
        )
        .await?;

    let model_used = form
        .model
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| state.clinic.vision_model().to_string());
    Ok(Json(ImageAnalysisResponse { success: true, analysis, model_used }))
}

#[derive(Serialize)]
struct TranscriptionResponse {
    success: bool,
    transcription: String,
}

async fn transcribe_audio(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<TranscriptionResponse>, ApiError> {
    let form = ClinicForm::from_multipart(multipart).await?;
    let audio = form.require_audio()?;

    let groq = state
        .groq
        .as_ref()
        .ok_or_else(|| ApiError::internal("GROQ_API_KEY not configured"))?;

    let transcription = groq
        .transcribe(audio.bytes.clone(), &audio.file_name, &state.stt_model, None)
        .await
        .map_err(|err| ApiError::internal(format!("Error transcribing audio: {err}")))?;

    Ok(Json(TranscriptionResponse { success: true, transcription }))
}

#[derive(Serialize)]
struct CombinedResponse {
    success: bool,
    transcription: String,
    analysis: String,
    audio_response: Option<String>,
}

/// Transcribe the patient's voice note, fold it into the image query, and
/// speak the analysis back.
async fn analyze_combined(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<CombinedResponse>, ApiError> {
    let form = ClinicForm::from_multipart(multipart).await?;
    let image = form.require_image()?;
    let audio = form.require_audio()?;

    let groq = state
        .groq
        .as_ref()
        .ok_or_else(|| ApiError::internal("GROQ_API_KEY not configured"))?;

    let transcription = groq
        .transcribe(audio.bytes.clone(), &audio.file_name, &state.stt_model, None)
        .await
        .map_err(|err| ApiError::internal(format!("Error transcribing audio: {err}")))?;

    let base_query = form
        .query
        .as_deref()
        .filter(|q| !q.is_empty())
        .unwrap_or("What do you see in this image?");
    let query = format!("{base_query} {transcription}");

    let analysis = state
        .clinic
        .analyze_image(
            &query,
            &image.content_type,
            &encode_base64(&image.bytes),
            form.model.as_deref().filter(|m| !m.is_empty()),
        )
        .await?;

    // Voice reply is best-effort: the text analysis is still useful when
    // synthesis fails.
    let audio_response = match state
        .tts
        .speak(&analysis, &state.config.tts_lang(), state.config.tts_speed())
        .await
    {
        Ok(path) => path
            .file_name()
            .and_then(|name| name.to_str())
            .map(String::from),
        Err(err) => {
            warn!(error = %err, "Speech synthesis failed for combined analysis");
            None
        }
    };

    Ok(Json(CombinedResponse { success: true, transcription, analysis, audio_response }))
}

fn default_tts_lang() -> String {
    "en".to_string()
}

fn default_tts_speed() -> f32 {
    1.67
}

#[derive(Deserialize)]
struct TextToSpeechRequest {
    text: String,
    #[serde(default = "default_tts_lang")]
    lang: String,
    #[serde(default = "default_tts_speed")]
    speed: f32,
}

async fn text_to_speech(
    State(state): State<Arc<AppState>>,
    Form(request): Form<TextToSpeechRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if request.text.is_empty() {
        return Err(ApiError::bad_request("text is required"));
    }

    let path = state
        .tts
        .speak(&request.text, &request.lang, request.speed)
        .await
        .map_err(|err| ApiError::internal(format!("Error converting text to speech: {err}")))?;

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| ApiError::internal("Failed to generate audio file"))?;

    info!(file = file_name, lang = %request.lang, speed = request.speed, "Speech generated");
    Ok(Json(json!({
        "success": true,
        "audio_file": file_name,
        "message": "Text converted to speech successfully",
    })))
}

async fn serve_audio(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    // Generated files live in one flat directory; anything that looks like a
    // path is rejected.
    if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
        return Err(ApiError::bad_request("Invalid filename"));
    }

    let path = state.config.audio_dir().join(&filename);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| ApiError::not_found("Audio file not found"))?;

    let mime = mime_guess::from_path(&filename)
        .first_or_octet_stream()
        .to_string();

    Ok((
        [
            (header::CONTENT_TYPE, mime),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename={filename}"),
            ),
        ],
        bytes,
    ))
}

#[derive(Deserialize)]
struct AnalyzeTextRequest {
    query: String,
}

/// Text-only medical analysis, no conversation context.
async fn analyze_text(
    State(state): State<Arc<AppState>>,
    Form(request): Form<AnalyzeTextRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if request.query.is_empty() {
        return Err(ApiError::bad_request("query is required"));
    }

    let analysis = state.clinic.medical_reply(&request.query, &[]).await?;

    Ok(Json(json!({
        "success": true,
        "analysis": analysis,
        "query": request.query,
        "model_used": state.clinic.chat_model(),
    })))
}

#[derive(Deserialize)]
struct HistoryMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct AnalyzeRequest {
    #[serde(default)]
    text_input: Option<String>,
    #[serde(default)]
    image_file: Option<String>,
    #[serde(default)]
    audio_file: Option<String>,
    #[serde(default)]
    conversation_history: Vec<HistoryMessage>,
}

fn history_turns(history: &[HistoryMessage]) -> Vec<ChatTurn> {
    history
        .iter()
        .filter_map(|msg| {
            let role = match msg.kind.as_str() {
                "user" => ChatRole::Patient,
                "doctor" => ChatRole::Assistant,
                _ => return None,
            };
            Some(ChatTurn { role, content: msg.content.clone() })
        })
        .collect()
}

/// Unified analysis endpoint: dispatches on which inputs are present.
async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let turns = history_turns(&request.conversation_history);
    let text = request.text_input.as_deref().filter(|t| !t.is_empty());
    let image = request.image_file.as_deref().filter(|i| !i.is_empty());
    let audio = request.audio_file.as_deref().filter(|a| !a.is_empty());

    let data = match (text, image, audio) {
        (Some(text), None, None) => {
            let analysis = state.clinic.medical_reply(text, &turns).await?;
            json!({
                "analysis": analysis,
                "input_type": "text",
                "query": text,
                "model_used": state.clinic.chat_model(),
            })
        }
        (None, Some(image), None) => {
            let analysis = state
                .clinic
                .analyze_image(IMAGE_ONLY_QUERY, "image/jpeg", image, None)
                .await?;
            json!({
                "analysis": analysis,
                "input_type": "image",
                "query": IMAGE_ONLY_QUERY,
                "model_used": state.clinic.vision_model(),
            })
        }
        (None, None, Some(_)) => json!({
            "analysis": "Audio analysis feature is currently being developed. \
                 Please try asking a text-based medical question instead.",
            "input_type": "audio",
            "model_used": "not_implemented",
        }),
        (Some(text), Some(image), _) => {
            let analysis = state
                .clinic
                .analyze_image_with_question(text, "image/jpeg", image, &turns)
                .await?;
            json!({
                "analysis": analysis,
                "input_type": "combined",
                "query": text,
                "model_used": state.clinic.vision_model(),
            })
        }
        _ => {
            return Err(ApiError::bad_request(
                "Provide text_input, image_file, or both",
            ));
        }
    };

    Ok(Json(json!({ "success": true, "data": data })))
}

#[derive(Deserialize)]
struct ClinicChatRequest {
    message: String,
    #[serde(default)]
    session_id: Option<String>,
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Form(request): Form<ClinicChatRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let turns = match &request.session_id {
        Some(id) => state.store.history(id).await,
        None => Vec::new(),
    };

    let response = state.clinic.medical_reply(&request.message, &turns).await?;

    if let Some(id) = &request.session_id {
        state.store.record_turn(id, ChatRole::Patient, &request.message).await;
        state.store.record_turn(id, ChatRole::Assistant, &response).await;
    }

    Ok(Json(json!({
        "success": true,
        "response": response,
        "session_id": request.session_id,
    })))
}
