//! Core types, configuration, errors, and session state for Careline.

pub mod config;
pub mod emotion;
pub mod error;
pub mod session;

pub use emotion::EmotionLabel;
pub use error::{CarelineError, Result};
pub use session::{ChatRole, ChatTurn, EmotionObservation, Session, SessionStore};
