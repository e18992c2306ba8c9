//! Configuration loading and validation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level Careline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groq: Option<GroqConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tts: Option<TtsConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompts: Option<PromptsConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

/// Hosted model provider (Groq, OpenAI-compatible API).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroqConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vision_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stt_model: Option<String>,
}

impl GroqConfig {
    /// Resolve the API key: `api_key` field first, then the configured env
    /// var, then `GROQ_API_KEY`.
    pub fn resolve_api_key(&self) -> Option<String> {
        resolve_secret_field(&self.api_key, &self.api_key_env).or_else(|| {
            std::env::var("GROQ_API_KEY").ok().filter(|v| !v.is_empty())
        })
    }
}

/// Speech synthesis configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TtsConfig {
    /// Default language code (e.g. "en", "hi").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,

    /// Default playback speed multiplier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,

    /// Directory for generated audio files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,

    #[serde(default = "default_therapy_port")]
    pub therapy_port: u16,

    #[serde(default = "default_clinic_port")]
    pub clinic_port: u16,
}

fn default_therapy_port() -> u16 {
    8001
}

fn default_clinic_port() -> u16 {
    8000
}

/// Prompt templates are configuration data, not code: every template the
/// composer uses has a compiled-in default and can be overridden here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptsConfig {
    /// Therapist persona line prepended to the system prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,

    /// Per-emotion guidance overrides, keyed by lowercase label.
    #[serde(default, skip_serializing_if = "std::collections::HashMap::is_empty")]
    pub guidance: std::collections::HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log format: "plain" (default) or "json".
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Log level override (trace/debug/info/warn/error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

fn default_log_format() -> String {
    "plain".into()
}

/// Resolve a secret: check the direct value first, then the env-var reference.
pub fn resolve_secret_field(direct: &Option<String>, env_var: &Option<String>) -> Option<String> {
    if let Some(val) = direct {
        if !val.is_empty() {
            return Some(val.clone());
        }
    }
    if let Some(env) = env_var {
        if let Ok(val) = std::env::var(env) {
            if !val.is_empty() {
                return Some(val);
            }
        }
    }
    None
}

/// Substitute `${ENV_VAR}` patterns in a string with their environment variable values.
fn substitute_env_vars(input: &str) -> String {
    let re = regex::Regex::new(r"\$\{([^}]+)\}").unwrap();
    re.replace_all(input, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_default()
    })
    .into_owned()
}

impl Config {
    /// Load config from a JSON5 file, substituting `${ENV_VAR}` references.
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(crate::error::CarelineError::Io)?;
        let substituted = substitute_env_vars(&raw);

        let config: Config = json5::from_str(&substituted)
            .map_err(|e| crate::error::CarelineError::Config(e.to_string()))?;

        Ok(config)
    }

    /// Default config file location: `~/.careline/config.json`.
    pub fn config_path() -> PathBuf {
        data_dir().join("config.json")
    }

    pub fn bind_addr(&self) -> String {
        self.server
            .as_ref()
            .and_then(|s| s.bind.clone())
            .unwrap_or_else(|| "0.0.0.0".to_string())
    }

    pub fn therapy_port(&self) -> u16 {
        self.server
            .as_ref()
            .map(|s| s.therapy_port)
            .unwrap_or_else(default_therapy_port)
    }

    pub fn clinic_port(&self) -> u16 {
        self.server
            .as_ref()
            .map(|s| s.clinic_port)
            .unwrap_or_else(default_clinic_port)
    }

    pub fn tts_lang(&self) -> String {
        self.tts
            .as_ref()
            .and_then(|t| t.lang.clone())
            .unwrap_or_else(|| "en".to_string())
    }

    pub fn tts_speed(&self) -> f32 {
        self.tts.as_ref().and_then(|t| t.speed).unwrap_or(1.0)
    }

    /// Directory for generated audio: configured, or `~/.careline/audio/`.
    pub fn audio_dir(&self) -> PathBuf {
        self.tts
            .as_ref()
            .and_then(|t| t.audio_dir.as_ref())
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir().join("audio"))
    }
}

/// Base directory for Careline data: `~/.careline/`
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".careline")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.therapy_port(), 8001);
        assert_eq!(config.clinic_port(), 8000);
        assert_eq!(config.tts_lang(), "en");
        assert_eq!(config.tts_speed(), 1.0);
        assert_eq!(config.bind_addr(), "0.0.0.0");
    }

    #[test]
    fn test_json5_parse() {
        let raw = r#"{
            // comments are fine
            groq: { chat_model: "llama-3.1-8b-instant" },
            server: { therapy_port: 9001, clinic_port: 9000 },
            tts: { lang: "hi", speed: 1.67 },
        }"#;
        let config: Config = json5::from_str(raw).unwrap();
        assert_eq!(config.therapy_port(), 9001);
        assert_eq!(config.tts_lang(), "hi");
        assert_eq!(
            config.groq.unwrap().chat_model.as_deref(),
            Some("llama-3.1-8b-instant")
        );
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("nope.json")).unwrap();
        assert!(config.groq.is_none());
    }

    #[test]
    fn test_resolve_secret_prefers_direct() {
        let direct = Some("sk-direct".to_string());
        let env = Some("CARELINE_TEST_UNSET_VAR".to_string());
        assert_eq!(
            resolve_secret_field(&direct, &env).as_deref(),
            Some("sk-direct")
        );
        assert_eq!(resolve_secret_field(&None, &env), None);
    }

    #[test]
    fn test_prompt_overrides_parse() {
        let raw = r#"{ prompts: { persona: "You are Dr. Lane.", guidance: { sad: "Be gentle." } } }"#;
        let config: Config = json5::from_str(raw).unwrap();
        let prompts = config.prompts.unwrap();
        assert_eq!(prompts.persona.as_deref(), Some("You are Dr. Lane."));
        assert_eq!(prompts.guidance.get("sad").map(String::as_str), Some("Be gentle."));
    }
}
