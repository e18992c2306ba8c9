//! Speech synthesis via the hosted Google Translate TTS endpoint.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::speed::apply_speed;

const TRANSLATE_TTS_URL: &str = "https://translate.google.com/translate_tts";

pub struct TtsEngine {
    base_url: String,
    audio_dir: PathBuf,
    client: reqwest::Client,
}

/// Generate a unique temp filename for a synthesis run.
fn temp_filename(dir: &Path) -> PathBuf {
    let ts = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let id = uuid::Uuid::new_v4().simple().to_string();
    dir.join(format!("tts_{ts}_{}_tmp.mp3", &id[..8]))
}

impl TtsEngine {
    pub fn new(audio_dir: PathBuf) -> Self {
        Self::with_base_url(audio_dir, TRANSLATE_TTS_URL)
    }

    pub fn with_base_url(audio_dir: PathBuf, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            audio_dir,
            client: reqwest::Client::new(),
        }
    }

    pub fn audio_dir(&self) -> &Path {
        &self.audio_dir
    }

    /// Synthesize `text` to a temporary MP3 and return its path.
    async fn synthesize(&self, text: &str, lang: &str) -> anyhow::Result<PathBuf> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", lang),
                ("total", "1"),
                ("idx", "0"),
                ("textlen", &text.len().to_string()),
                ("q", text),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            anyhow::bail!("TTS API error {status}");
        }

        let bytes = resp.bytes().await?;
        tokio::fs::create_dir_all(&self.audio_dir).await?;
        let temp_path = temp_filename(&self.audio_dir);
        tokio::fs::write(&temp_path, &bytes).await?;

        Ok(temp_path)
    }

    /// Synthesize speech and apply the playback-speed multiplier. Returns
    /// the final audio file path.
    pub async fn speak(&self, text: &str, lang: &str, speed: f32) -> anyhow::Result<PathBuf> {
        let temp_path = self.synthesize(text, lang).await?;
        let output = apply_speed(&temp_path, speed)?;

        info!(
            path = %output.display(),
            lang,
            speed,
            chars = text.len(),
            "Speech synthesized"
        );
        Ok(output)
    }
}
