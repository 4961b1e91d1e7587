use super::model_size::ModelSize;

/// A recognizer threshold: left at the engine default, set explicitly, or
/// switched off so it never rejects anything.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Threshold {
    EngineDefault,
    Value(f32),
    Disabled,
}

/// The decoding thresholds that travel together for a strictness mode.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrictnessThresholds {
    pub condition_on_previous_text: bool,
    pub no_speech_threshold: f32,
    pub compression_ratio_threshold: Threshold,
    pub log_prob_threshold: Threshold,
}

/// Trade-off between suppressing hallucinated/looping output and keeping
/// genuine but mumbled speech.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum StrictnessMode {
    /// No cross-segment conditioning; repetitive output is penalized.
    #[default]
    Strict,
    /// Conditioning on; silence is hard to trigger and low-confidence text is kept.
    Permissive,
}

impl StrictnessMode {
    /// The full threshold set for this mode. Thresholds are only ever
    /// obtained here, never overridden one at a time.
    pub fn thresholds(self) -> StrictnessThresholds {
        match self {
            StrictnessMode::Strict => StrictnessThresholds {
                condition_on_previous_text: false,
                no_speech_threshold: 0.6,
                compression_ratio_threshold: Threshold::Value(2.4),
                log_prob_threshold: Threshold::EngineDefault,
            },
            StrictnessMode::Permissive => StrictnessThresholds {
                condition_on_previous_text: true,
                no_speech_threshold: 0.95,
                compression_ratio_threshold: Threshold::EngineDefault,
                log_prob_threshold: Threshold::Disabled,
            },
        }
    }
}

/// Immutable recognizer parameters for one run.
///
/// Built by [`DecodingPolicy`](super::decoding_policy::DecodingPolicy);
/// fields are private so a config cannot be edited after construction.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodingConfig {
    model_size: ModelSize,
    language_hint: Option<String>,
    beam_size: u32,
    initial_prompt: Option<String>,
    vad_filter: bool,
    strictness: StrictnessMode,
}

impl DecodingConfig {
    pub(crate) fn new(
        model_size: ModelSize,
        language_hint: Option<String>,
        beam_size: u32,
        initial_prompt: Option<String>,
        vad_filter: bool,
        strictness: StrictnessMode,
    ) -> Self {
        Self {
            model_size,
            language_hint,
            beam_size: beam_size.max(1),
            initial_prompt,
            vad_filter,
            strictness,
        }
    }

    pub fn model_size(&self) -> ModelSize {
        self.model_size
    }

    /// ISO code to force, or `None` to let the recognizer detect the language.
    pub fn language_hint(&self) -> Option<&str> {
        self.language_hint.as_deref()
    }

    pub fn beam_size(&self) -> u32 {
        self.beam_size
    }

    /// Never `Some("")`: an empty prompt is represented as absent.
    pub fn initial_prompt(&self) -> Option<&str> {
        self.initial_prompt.as_deref()
    }

    pub fn vad_filter(&self) -> bool {
        self.vad_filter
    }

    pub fn strictness(&self) -> StrictnessMode {
        self.strictness
    }

    pub fn thresholds(&self) -> StrictnessThresholds {
        self.strictness.thresholds()
    }
}
