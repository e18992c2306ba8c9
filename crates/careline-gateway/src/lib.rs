//! HTTP/WebSocket edge for the two Careline services.
//!
//! The therapy service pairs webcam emotion detection with an emotion-aware
//! chat loop; the clinic service handles medical image analysis, voice
//! transcription, and spoken replies.

pub mod clinic;
pub mod connection;
pub mod error;
pub mod server;
pub mod state;
pub mod therapy;

pub use server::{start_clinic, start_therapy};
pub use state::AppState;
