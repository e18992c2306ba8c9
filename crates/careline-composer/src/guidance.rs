//! Emotion-specific guidance injected into the therapist system prompt.

use std::collections::HashMap;

use careline_core::EmotionLabel;

/// Returned verbatim when the remote completion fails mid-conversation.
pub const FALLBACK_REPLY: &str =
    "I'm here to listen and help. Could you tell me more about what you're experiencing?";

/// Returned verbatim when no chat client is configured at all.
pub const UNAVAILABLE_REPLY: &str =
    "I'm sorry, the AI service is currently unavailable. Please try again later.";

const BUILTIN_GUIDANCE: &[(&str, &str)] = &[
    (
        "happy",
        "The patient appears to be in a positive mood. Acknowledge their happiness, encourage them to share what's going well, and help them build on this positive energy.",
    ),
    (
        "sad",
        "The patient seems to be feeling down or sad. Be extra gentle and empathetic, validate their feelings, and offer comfort and support.",
    ),
    (
        "angry",
        "The patient appears frustrated or angry. Stay calm and non-judgmental, help them process their feelings, and guide them toward constructive solutions.",
    ),
    (
        "neutral",
        "The patient seems calm and neutral. Be warm and inviting, ask open-ended questions to understand their current state, and provide general support.",
    ),
    (
        "surprised",
        "The patient seems surprised or alert. Be reassuring, help them process what might have surprised them, and provide stability.",
    ),
    (
        "fearful",
        "The patient appears anxious or fearful. Be very gentle and reassuring, validate their concerns, and help them feel safe.",
    ),
    (
        "disgusted",
        "The patient seems to be experiencing disgust or strong negative feelings. Be understanding and help them process these feelings constructively.",
    ),
];

/// Lowercase-keyed emotion guidance, config-overridable per label. Unknown
/// labels resolve to the neutral entry.
pub struct GuidanceTable {
    entries: HashMap<String, String>,
}

impl Default for GuidanceTable {
    fn default() -> Self {
        let entries = BUILTIN_GUIDANCE
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self { entries }
    }
}

impl GuidanceTable {
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Self {
        let mut table = Self::default();
        for (label, text) in overrides {
            table.entries.insert(label.to_lowercase(), text.clone());
        }
        table
    }

    pub fn lookup(&self, emotion: EmotionLabel) -> &str {
        self.lookup_str(emotion.as_str())
    }

    pub fn lookup_str(&self, label: &str) -> &str {
        self.entries
            .get(&label.to_lowercase())
            .or_else(|| self.entries.get("neutral"))
            .map(String::as_str)
            .unwrap_or_default()
    }
}
