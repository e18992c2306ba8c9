//! Prompt templates for both services.

use careline_core::{ChatRole, ChatTurn, EmotionLabel};

pub const DEFAULT_PERSONA: &str = "You are a compassionate AI therapist named FIDO.";

pub const CLINIC_SYSTEM_PROMPT: &str = "You are a helpful AI medical assistant that provides \
general health information and guidance. Always be empathetic and supportive.";

/// Default query when an image arrives without an accompanying question.
pub const IMAGE_ONLY_QUERY: &str = "Please analyze this medical image. Look for any visible \
symptoms, conditions, or abnormalities. Provide a professional medical assessment while noting \
that this is for informational purposes only and should not replace professional medical \
diagnosis.";

const CONTEXT_TURN_LIMIT: usize = 6;
const ASSISTANT_TRUNCATE_CHARS: usize = 200;

pub fn therapist_system_prompt(persona: &str, guidance: &str, emotion: EmotionLabel) -> String {
    format!(
        "{persona}\n\
         EMOTION-SPECIFIC GUIDANCE: {guidance}\n\
         IMPORTANT: Your response MUST reflect the patient's current emotion ({emotion}). \
         Adapt your tone, approach, and suggestions accordingly.\n\
         Guidelines:\n\
         1. Acknowledge their current emotional state specifically\n\
         2. Provide emotion-appropriate support and advice\n\
         3. Ask thoughtful follow-up questions relevant to their mood\n\
         4. Maintain a professional yet warm tone\n\
         5. Keep responses concise but meaningful (2-3 sentences)\n\
         Current patient emotion: {emotion}"
    )
}

pub fn therapist_user_prompt(message: &str, emotion: EmotionLabel, recent: &[EmotionLabel]) -> String {
    let recent = if recent.is_empty() {
        "None".to_string()
    } else {
        recent
            .iter()
            .map(|e| e.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "Patient message: \"{message}\"\n\
         Patient's current emotional state: {emotion}\n\
         Recent emotions: {recent}\n\
         Respond as FIDO, acknowledging their {emotion} mood and providing appropriate support."
    )
}

/// Render the last few turns as a context preamble. Assistant turns are
/// truncated so one long reply cannot crowd out the rest of the window.
pub fn conversation_context(turns: &[ChatTurn]) -> String {
    if turns.is_empty() {
        return String::new();
    }

    let start = turns.len().saturating_sub(CONTEXT_TURN_LIMIT);
    let mut context = String::from("Previous conversation context:\n");
    for turn in &turns[start..] {
        match turn.role {
            ChatRole::Patient => {
                context.push_str(&format!("Patient: {}\n", turn.content));
            }
            ChatRole::Assistant => {
                let content = truncate_chars(&turn.content, ASSISTANT_TRUNCATE_CHARS);
                context.push_str(&format!("Doctor: {content}...\n"));
            }
        }
    }
    context.push_str("\nCurrent conversation:\n");
    context
}

fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn medical_query_prompt(context: &str, query: &str) -> String {
    format!(
        "{context}You are a professional AI medical assistant. Please provide helpful, accurate \
         medical information about the following query: \"{query}\"\n\n\
         Guidelines:\n\
         - Provide clear, concise medical information\n\
         - Include general symptoms, causes, and treatment options when appropriate\n\
         - Always recommend consulting a healthcare professional for proper diagnosis\n\
         - Keep responses informative but not overly technical\n\
         - Focus on general health information and common conditions\n\
         - Do not provide specific medical diagnoses or prescriptions\n\
         - Be empathetic and supportive in your responses\n\
         - If the patient is asking a follow-up question, reference the previous conversation context\n\n\
         Query: {query}\n\n\
         Please provide a helpful response:"
    )
}

pub fn combined_image_prompt(context: &str, question: &str) -> String {
    format!(
        "{context}Please analyze this medical image and answer the patient's specific question: \
         \"{question}\"\n\n\
         Instructions:\n\
         1. First, analyze what you see in the image\n\
         2. Then, specifically address the patient's question about the image\n\
         3. Provide helpful, accurate medical information related to their question\n\
         4. Include appropriate disclaimers about consulting healthcare professionals\n\
         5. Be empathetic and supportive in your response"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(role: ChatRole, content: &str) -> ChatTurn {
        ChatTurn {
            role,
            content: content.to_string(),
        }
    }

    #[test]
    fn test_system_prompt_embeds_guidance_and_emotion() {
        let prompt = therapist_system_prompt(DEFAULT_PERSONA, "Be gentle.", EmotionLabel::Sad);
        assert!(prompt.starts_with(DEFAULT_PERSONA));
        assert!(prompt.contains("Be gentle."));
        assert!(prompt.contains("Current patient emotion: Sad"));
    }

    #[test]
    fn test_user_prompt_lists_recent_emotions() {
        let prompt = therapist_user_prompt(
            "I had a rough day",
            EmotionLabel::Angry,
            &[EmotionLabel::Neutral, EmotionLabel::Angry],
        );
        assert!(prompt.contains("Recent emotions: Neutral, Angry"));
        assert!(prompt.contains("their Angry mood"));
    }

    #[test]
    fn test_user_prompt_without_history() {
        let prompt = therapist_user_prompt("hi", EmotionLabel::Neutral, &[]);
        assert!(prompt.contains("Recent emotions: None"));
    }

    #[test]
    fn test_context_empty_without_turns() {
        assert_eq!(conversation_context(&[]), "");
    }

    #[test]
    fn test_context_keeps_last_six_turns() {
        let turns: Vec<ChatTurn> = (0..8)
            .map(|i| turn(ChatRole::Patient, &format!("message {i}")))
            .collect();
        let context = conversation_context(&turns);
        assert!(!context.contains("message 1"));
        assert!(context.contains("message 2"));
        assert!(context.contains("message 7"));
    }

    #[test]
    fn test_context_truncates_assistant_turns() {
        let long_reply = "x".repeat(500);
        let turns = vec![turn(ChatRole::Assistant, &long_reply)];
        let context = conversation_context(&turns);
        assert!(context.contains(&format!("Doctor: {}...", "x".repeat(200))));
        assert!(!context.contains(&"x".repeat(201)));
    }
}
