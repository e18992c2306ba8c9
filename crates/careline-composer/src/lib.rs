//! Reply composition: prompt templates, emotion guidance, and the two
//! service-facing composers (therapist and clinic).

pub mod clinic;
pub mod guidance;
pub mod prompt;
pub mod therapist;

pub use clinic::ClinicComposer;
pub use guidance::{FALLBACK_REPLY, GuidanceTable, UNAVAILABLE_REPLY};
pub use therapist::TherapistComposer;
