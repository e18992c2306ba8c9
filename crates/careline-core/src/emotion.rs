//! The fixed emotion vocabulary shared by perception, composition, and the API.

use serde::{Deserialize, Serialize};

/// Emotion label produced by the perception pipeline.
///
/// The wire form matches what clients already expect from the original
/// services: capitalized labels, with the no-detection sentinel spelled
/// `"No Face"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmotionLabel {
    Happy,
    Sad,
    Angry,
    Neutral,
    Surprised,
    Fearful,
    Disgusted,
    #[serde(rename = "No Face")]
    NoFace,
}

impl EmotionLabel {
    /// Wire/display form of the label.
    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionLabel::Happy => "Happy",
            EmotionLabel::Sad => "Sad",
            EmotionLabel::Angry => "Angry",
            EmotionLabel::Neutral => "Neutral",
            EmotionLabel::Surprised => "Surprised",
            EmotionLabel::Fearful => "Fearful",
            EmotionLabel::Disgusted => "Disgusted",
            EmotionLabel::NoFace => "No Face",
        }
    }

    /// Case-insensitive parse. Accepts a few legacy spellings ("fear",
    /// "surprise", "no-face") seen in client payloads. Unknown strings are
    /// `None`; callers resolve those to neutral guidance downstream.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "happy" => Some(EmotionLabel::Happy),
            "sad" => Some(EmotionLabel::Sad),
            "angry" | "anger" => Some(EmotionLabel::Angry),
            "neutral" => Some(EmotionLabel::Neutral),
            "surprised" | "surprise" => Some(EmotionLabel::Surprised),
            "fearful" | "fear" => Some(EmotionLabel::Fearful),
            "disgusted" | "disgust" => Some(EmotionLabel::Disgusted),
            "no face" | "no-face" | "no_face" => Some(EmotionLabel::NoFace),
            _ => None,
        }
    }
}

impl std::fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_form_roundtrip() {
        let json = serde_json::to_string(&EmotionLabel::NoFace).unwrap();
        assert_eq!(json, "\"No Face\"");
        let back: EmotionLabel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, EmotionLabel::NoFace);

        assert_eq!(
            serde_json::to_string(&EmotionLabel::Happy).unwrap(),
            "\"Happy\""
        );
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!(EmotionLabel::parse("HAPPY"), Some(EmotionLabel::Happy));
        assert_eq!(EmotionLabel::parse("Surprise"), Some(EmotionLabel::Surprised));
        assert_eq!(EmotionLabel::parse("no-face"), Some(EmotionLabel::NoFace));
        assert_eq!(EmotionLabel::parse("ecstatic"), None);
    }
}
