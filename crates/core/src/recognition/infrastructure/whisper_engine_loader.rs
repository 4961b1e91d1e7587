use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use whisper_rs::{WhisperContext, WhisperContextParameters};

use crate::media::domain::audio_reader::AudioReader;
use crate::media::infrastructure::ffmpeg_audio_reader::FfmpegAudioReader;
use crate::recognition::domain::device_profile::{DeviceClass, Precision};
use crate::recognition::domain::engine_loader::{EngineKey, EngineLoadError, EngineLoader};
use crate::recognition::domain::model_size::ModelSize;
use crate::recognition::domain::speech_recognizer::SpeechRecognizer;
use crate::shared::constants::{
    MAX_DECODE_THREADS, VAD_MODEL_NAME, VAD_MODEL_URL, WHISPER_MODEL_BASE_URL,
};
use crate::shared::model_resolver::{self, ModelResolveError, ProgressFn};

use super::whisper_recognizer::WhisperRecognizer;

/// Download progress callback: `(file_name, bytes_downloaded, total_bytes)`.
pub type DownloadProgressFn = Arc<dyn Fn(&str, u64, u64) + Send + Sync>;

/// Where weight files are looked up and downloaded to.
#[derive(Clone, Default)]
struct ModelFetcher {
    models_dir: Option<PathBuf>,
    bundled_dir: Option<PathBuf>,
    on_download: Option<DownloadProgressFn>,
}

impl ModelFetcher {
    fn fetch(&self, name: &str, url: &str) -> Result<PathBuf, ModelResolveError> {
        let progress: Option<ProgressFn> = self.on_download.clone().map(|cb| {
            let name = name.to_string();
            Box::new(move |downloaded, total| cb(&name, downloaded, total)) as ProgressFn
        });
        match self.models_dir {
            Some(ref dir) => {
                model_resolver::resolve_in(dir, name, url, self.bundled_dir.as_deref(), progress)
            }
            None => model_resolver::resolve(name, url, self.bundled_dir.as_deref(), progress),
        }
    }
}

/// Silero VAD weights, fetched the first time a run asks for VAD.
///
/// A successful fetch is kept for the life of the engine; a failed one is
/// retried by the next run that wants VAD.
pub struct VadModel {
    fetcher: ModelFetcher,
    resolved: Mutex<Option<PathBuf>>,
}

impl VadModel {
    fn new(fetcher: ModelFetcher) -> Self {
        Self {
            fetcher,
            resolved: Mutex::new(None),
        }
    }

    /// Path to the VAD weights, or `None` if they could not be fetched.
    pub fn resolve(&self) -> Option<PathBuf> {
        let mut resolved = self.resolved.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(ref path) = *resolved {
            return Some(path.clone());
        }
        match self.fetcher.fetch(VAD_MODEL_NAME, VAD_MODEL_URL) {
            Ok(path) => {
                *resolved = Some(path.clone());
                Some(path)
            }
            Err(e) => {
                log::warn!("VAD model unavailable: {e}");
                None
            }
        }
    }
}

/// Loads whisper.cpp engines, fetching ggml weights on first use.
pub struct WhisperEngineLoader {
    fetcher: ModelFetcher,
    audio_reader: Arc<dyn AudioReader>,
    threads: usize,
}

impl WhisperEngineLoader {
    pub fn new() -> Self {
        Self {
            fetcher: ModelFetcher::default(),
            audio_reader: Arc::new(FfmpegAudioReader),
            threads: default_threads(),
        }
    }

    /// Store and look up weights in `dir` instead of the platform cache.
    pub fn with_models_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fetcher.models_dir = Some(dir.into());
        self
    }

    /// Also look for pre-packaged weights in `dir` before downloading.
    pub fn with_bundled_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fetcher.bundled_dir = Some(dir.into());
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn with_download_progress(mut self, on_download: DownloadProgressFn) -> Self {
        self.fetcher.on_download = Some(on_download);
        self
    }

    /// Make sure the weights for `size` at `precision` are on disk.
    pub fn prefetch(&self, size: ModelSize, precision: Precision) -> Result<PathBuf, ModelResolveError> {
        let name = weights_file_name(size, precision);
        self.fetcher.fetch(&name, &weights_url(&name))
    }

    pub fn prefetch_vad(&self) -> Result<PathBuf, ModelResolveError> {
        self.fetcher.fetch(VAD_MODEL_NAME, VAD_MODEL_URL)
    }
}

impl Default for WhisperEngineLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineLoader for WhisperEngineLoader {
    fn load(&self, key: EngineKey) -> Result<Arc<dyn SpeechRecognizer>, EngineLoadError> {
        let weights = self
            .prefetch(key.model_size, key.device.precision)
            .map_err(|source| EngineLoadError::Resolve { key, source })?;
        let weights_str = weights
            .to_str()
            .ok_or_else(|| EngineLoadError::InvalidPath(weights.clone()))?;

        let mut params = WhisperContextParameters::default();
        params.use_gpu(key.device.device == DeviceClass::Gpu);

        log::info!("Loading {} on {}", weights.display(), key.device);
        let context = WhisperContext::new_with_params(weights_str, params).map_err(|e| {
            EngineLoadError::Init {
                key,
                message: e.to_string(),
            }
        })?;

        Ok(Arc::new(WhisperRecognizer::new(
            context,
            self.audio_reader.clone(),
            Arc::new(VadModel::new(self.fetcher.clone())),
            self.threads,
        )))
    }
}

/// ggml weight file for a model size at a given precision.
///
/// Int8 uses the 8-bit quantized checkpoints; large-v3 is only published
/// with 5-bit quantization.
pub fn weights_file_name(size: ModelSize, precision: Precision) -> String {
    match (size, precision) {
        (_, Precision::Float16) => format!("ggml-{size}.bin"),
        (ModelSize::LargeV3, Precision::Int8) => format!("ggml-{size}-q5_0.bin"),
        (_, Precision::Int8) => format!("ggml-{size}-q8_0.bin"),
    }
}

pub fn weights_url(file_name: &str) -> String {
    format!("{WHISPER_MODEL_BASE_URL}/{file_name}")
}

fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(MAX_DECODE_THREADS)
}
