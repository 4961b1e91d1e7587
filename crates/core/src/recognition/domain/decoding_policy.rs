use crate::shared::constants::{ANTI_SINGING_PROMPT, DEFAULT_BEAM_SIZE, HIGH_ACCURACY_BEAM_SIZE};

use super::decoding_config::{DecodingConfig, StrictnessMode};
use super::model_size::ModelSize;

/// Language selections offered to users, mapped to ISO codes.
const LANGUAGE_TABLE: &[(&str, &str)] = &[
    ("english", "en"),
    ("korean", "ko"),
    ("japanese", "ja"),
    ("chinese", "zh"),
];

/// User-level choices for a run, before policy is applied.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodingChoices {
    pub model_size: ModelSize,
    /// "Auto", a language name from the selection table, or its ISO code.
    pub language: String,
    pub prompt_hint: String,
    pub vad_enabled: bool,
    pub suppress_singing: bool,
    pub high_accuracy: bool,
    pub strict_mode: bool,
}

impl Default for DecodingChoices {
    fn default() -> Self {
        Self {
            model_size: ModelSize::Medium,
            language: "Auto".to_string(),
            prompt_hint: String::new(),
            vad_enabled: true,
            suppress_singing: false,
            high_accuracy: false,
            strict_mode: true,
        }
    }
}

/// Turns [`DecodingChoices`] into a [`DecodingConfig`].
///
/// Encodes the tuned anti-hallucination defaults: beam width, language
/// forcing, the anti-singing prompt and the strictness threshold pair.
pub struct DecodingPolicy;

impl DecodingPolicy {
    pub fn build(choices: &DecodingChoices) -> DecodingConfig {
        let beam_size = if choices.high_accuracy {
            HIGH_ACCURACY_BEAM_SIZE
        } else {
            DEFAULT_BEAM_SIZE
        };

        let strictness = if choices.strict_mode {
            StrictnessMode::Strict
        } else {
            StrictnessMode::Permissive
        };

        DecodingConfig::new(
            choices.model_size,
            language_code(&choices.language).map(str::to_string),
            beam_size,
            build_prompt(&choices.prompt_hint, choices.suppress_singing),
            choices.vad_enabled,
            strictness,
        )
    }
}

/// ISO code for a language selection; `None` means auto-detect.
///
/// Unrecognized selections fall back to auto-detection.
pub fn language_code(selection: &str) -> Option<&'static str> {
    let wanted = selection.trim().to_ascii_lowercase();
    if wanted.is_empty() || wanted == "auto" {
        return None;
    }
    let code = LANGUAGE_TABLE
        .iter()
        .find(|(name, code)| *name == wanted || *code == wanted)
        .map(|(_, code)| *code);
    if code.is_none() {
        log::warn!("Unrecognized language '{selection}', falling back to auto-detection");
    }
    code
}

/// Initial prompt for the recognizer, or `None` when it would be empty.
pub fn build_prompt(hint: &str, suppress_singing: bool) -> Option<String> {
    let hint = hint.trim();
    let prompt = if suppress_singing {
        format!("{ANTI_SINGING_PROMPT} {hint}").trim().to_string()
    } else {
        hint.to_string()
    };
    if prompt.is_empty() {
        None
    } else {
        Some(prompt)
    }
}
