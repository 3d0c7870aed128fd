//! Prompt augmentation: normalize, terminate the opening sentence, append guidance.
//!
//! [`improve`] is pure and deterministic. Running it on its own output appends no
//! further guidance, so previews and submissions can re-derive text freely.

mod inject;
mod json_template;
mod normalize;

pub use inject::{inject, Fragment};
pub use json_template::{build_template, escape_json_string, TemplateInstruction, TEMPLATE_PREAMBLE};
pub use normalize::normalize;

use crate::config::{Settings, VoiceMode};

pub const JSON_ONLY_INSTRUCTION: &str = "Return only valid JSON with fields `context`, `analysis`, `steps`, and `answer`. Use double quotes and omit trailing commentary.";
pub const STEP_BY_STEP_INSTRUCTION: &str =
    "Provide the answer step-by-step with concise reasoning.";
pub const TAKEAWAYS_INSTRUCTION: &str = "Highlight the most important takeaways at the end.";
pub const NATURAL_VOICE_INSTRUCTION: &str = "Use a warm, collaborative tone grounded in current UX and linguistics research on AI giveaways. Avoid mirrored sentence rhythm, stock transitions like 'Overall' or 'In conclusion', and stacked adjective clusters. Do not use the rule of three or em dashes; vary cadence naturally.";
pub const AI_VOICE_INSTRUCTION: &str = "Adopt a precise, analytical AI voice with succinct sentences and explicitly numbered logic.";

const SENTENCE_TERMINATORS: [char; 4] = ['.', '?', '!', ':'];

enum Guidance {
    Fixed(&'static str),
    Template(TemplateInstruction),
}

impl Fragment for Guidance {
    fn text(&self) -> &str {
        match self {
            Self::Fixed(text) => text,
            Self::Template(template) => template.text(),
        }
    }

    fn marker(&self) -> &str {
        match self {
            Self::Fixed(text) => text,
            Self::Template(template) => template.marker(),
        }
    }
}

fn voice_instruction(mode: VoiceMode) -> Option<&'static str> {
    match mode {
        VoiceMode::Off => None,
        VoiceMode::Natural => Some(NATURAL_VOICE_INSTRUCTION),
        VoiceMode::Ai => Some(AI_VOICE_INSTRUCTION),
    }
}

fn guidance_for(original: &str, settings: &Settings) -> Vec<Guidance> {
    if settings.json_prompting {
        return vec![
            Guidance::Fixed(JSON_ONLY_INSTRUCTION),
            Guidance::Template(TemplateInstruction::for_prompt(original)),
        ];
    }
    let mut guidance = vec![
        Guidance::Fixed(STEP_BY_STEP_INSTRUCTION),
        Guidance::Fixed(TAKEAWAYS_INSTRUCTION),
    ];
    if let Some(voice) = voice_instruction(settings.voice_mode) {
        guidance.push(Guidance::Fixed(voice));
    }
    guidance
}

/// Append `.` to the first line when it does not already end a sentence.
fn terminate_first_line(text: &str) -> String {
    let (first, rest) = match text.find('\n') {
        Some(idx) => text.split_at(idx),
        None => (text, ""),
    };
    if first.is_empty() || first.ends_with(SENTENCE_TERMINATORS) {
        return text.to_string();
    }
    format!("{first}.{rest}")
}

/// Produce the improved prompt for `original` under `settings`.
///
/// Blank input is returned unchanged.
#[must_use]
pub fn improve(original: &str, settings: &Settings) -> String {
    if original.trim().is_empty() {
        return original.to_string();
    }
    let body = terminate_first_line(&normalize(original));
    inject(&body, &guidance_for(original, settings))
}
