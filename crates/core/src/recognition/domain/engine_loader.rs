use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::shared::model_resolver::ModelResolveError;

use super::device_profile::DeviceProfile;
use super::model_size::ModelSize;
use super::speech_recognizer::SpeechRecognizer;

/// Identifies one loaded engine instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EngineKey {
    pub model_size: ModelSize,
    pub device: DeviceProfile,
}

impl EngineKey {
    pub fn new(model_size: ModelSize, device: DeviceProfile) -> Self {
        Self { model_size, device }
    }
}

impl std::fmt::Display for EngineKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} on {}", self.model_size, self.device)
    }
}

#[derive(Error, Debug)]
pub enum EngineLoadError {
    #[error("could not resolve weights for {key}: {source}")]
    Resolve {
        key: EngineKey,
        #[source]
        source: ModelResolveError,
    },
    #[error("failed to initialize {key}: {message}")]
    Init { key: EngineKey, message: String },
    #[error("model path is not valid UTF-8: {0}")]
    InvalidPath(PathBuf),
}

/// Domain interface for turning an [`EngineKey`] into a ready recognizer.
///
/// Loading may download weights and allocate device memory, so callers go
/// through [`EngineCache`](crate::recognition::engine_cache::EngineCache).
pub trait EngineLoader: Send + Sync {
    fn load(&self, key: EngineKey) -> Result<Arc<dyn SpeechRecognizer>, EngineLoadError>;
}
