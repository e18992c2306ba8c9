//! Media pipeline: hosted speech synthesis and playback-speed adjustment.

pub mod speed;
pub mod tts;

pub use speed::apply_speed;
pub use tts::TtsEngine;
