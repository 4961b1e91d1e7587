use std::path::{Path, PathBuf};

use thiserror::Error;

use super::decoding_config::DecodingConfig;
use super::segment::{LanguageDetection, Segment};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranscriptionError {
    #[error("could not decode audio from {path}: {message}")]
    Decode { path: PathBuf, message: String },
    #[error("{0} has no audio track")]
    NoAudioTrack(PathBuf),
    #[error("recognizer failed: {0}")]
    Recognizer(String),
    #[error("recognizer broke its segment contract: {0}")]
    ContractViolation(String),
    #[error("recognizer stopped before finishing")]
    Disconnected,
}

/// What a running recognizer reports, in order of production.
#[derive(Clone, Debug, PartialEq)]
pub enum RecognizerEvent {
    LanguageDetected(LanguageDetection),
    Segment(Segment),
}

/// Lazy, single-pass stream of recognizer output.
///
/// Each `next()` may block for as long as the recognizer needs to produce
/// the next event. After an `Err` the stream yields nothing further.
pub type RecognizerStream =
    Box<dyn Iterator<Item = Result<RecognizerEvent, TranscriptionError>> + Send>;

/// Domain interface for speech-to-text engines.
///
/// Implementations are loaded once per model/device and reused across runs.
pub trait SpeechRecognizer: Send + Sync {
    /// Begin recognizing `media`. Work happens as the returned stream is consumed.
    fn start(
        &self,
        media: &Path,
        config: &DecodingConfig,
    ) -> Result<RecognizerStream, TranscriptionError>;
}
