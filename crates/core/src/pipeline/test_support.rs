//! Stub implementations of the domain traits shared by pipeline tests.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::media::domain::duration_probe::DurationProbe;
use crate::media::domain::media_duration::MediaDuration;
use crate::recognition::domain::decoding_config::DecodingConfig;
use crate::recognition::domain::engine_loader::{EngineKey, EngineLoadError, EngineLoader};
use crate::recognition::domain::speech_recognizer::{
    RecognizerEvent, RecognizerStream, SpeechRecognizer, TranscriptionError,
};

type Script = Vec<Result<RecognizerEvent, TranscriptionError>>;

/// Replays a fixed event script for every `start`.
pub struct ScriptedRecognizer {
    script: Script,
    start_error: Option<TranscriptionError>,
    cancel_after: Option<(usize, Arc<AtomicBool>)>,
    seen_media: Arc<Mutex<Vec<PathBuf>>>,
    seen_configs: Arc<Mutex<Vec<DecodingConfig>>>,
}

impl ScriptedRecognizer {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            start_error: None,
            cancel_after: None,
            seen_media: Arc::new(Mutex::new(Vec::new())),
            seen_configs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing_to_start(error: TranscriptionError) -> Self {
        let mut recognizer = Self::new(Vec::new());
        recognizer.start_error = Some(error);
        recognizer
    }

    /// Raise `flag` once `events` events have been consumed.
    pub fn cancelling_after(mut self, events: usize, flag: Arc<AtomicBool>) -> Self {
        self.cancel_after = Some((events, flag));
        self
    }

    pub fn seen_media(&self) -> Arc<Mutex<Vec<PathBuf>>> {
        self.seen_media.clone()
    }

    pub fn seen_configs(&self) -> Arc<Mutex<Vec<DecodingConfig>>> {
        self.seen_configs.clone()
    }
}

impl SpeechRecognizer for ScriptedRecognizer {
    fn start(
        &self,
        media: &Path,
        config: &DecodingConfig,
    ) -> Result<RecognizerStream, TranscriptionError> {
        self.seen_media.lock().unwrap().push(media.to_path_buf());
        self.seen_configs.lock().unwrap().push(config.clone());
        if let Some(ref e) = self.start_error {
            return Err(e.clone());
        }

        let cancel_after = self.cancel_after.clone();
        let consumed = AtomicUsize::new(0);
        let events = self.script.clone().into_iter().inspect(move |_| {
            let n = consumed.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some((after, flag)) = &cancel_after {
                if n >= *after {
                    flag.store(true, Ordering::SeqCst);
                }
            }
        });
        Ok(Box::new(events))
    }
}

pub struct StubProbe(pub MediaDuration);

impl DurationProbe for StubProbe {
    fn probe(&self, _path: &Path) -> MediaDuration {
        self.0
    }
}

/// Hands out one shared recognizer for every key.
pub struct StubLoader {
    pub recognizer: Arc<dyn SpeechRecognizer>,
    pub fail: bool,
}

impl EngineLoader for StubLoader {
    fn load(&self, key: EngineKey) -> Result<Arc<dyn SpeechRecognizer>, EngineLoadError> {
        if self.fail {
            return Err(EngineLoadError::Init {
                key,
                message: "no device memory".to_string(),
            });
        }
        Ok(self.recognizer.clone())
    }
}
