use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use crossbeam_channel::{Receiver, Sender};
use whisper_rs::{
    FullParams, SamplingStrategy, SegmentCallbackData, WhisperContext, WhisperState,
};

use crate::media::domain::audio_reader::AudioReader;
use crate::recognition::domain::decoding_config::{DecodingConfig, StrictnessThresholds, Threshold};
use crate::recognition::domain::segment::{LanguageDetection, Segment};
use crate::recognition::domain::speech_recognizer::{
    RecognizerEvent, RecognizerStream, SpeechRecognizer, TranscriptionError,
};
use crate::shared::constants::WHISPER_SAMPLE_RATE;

use super::whisper_engine_loader::VadModel;

/// Segments are handed over one at a time so decoding is paced by the consumer.
const SEGMENT_CHANNEL_CAPACITY: usize = 1;

/// Speech recognizer backed by whisper.cpp via whisper-rs.
///
/// Each `start` decodes the media's audio with the configured reader and
/// runs inference on a dedicated thread. Segments stream out through
/// whisper's new-segment callback as soon as they are decoded. Runs on one
/// instance are serialized.
pub struct WhisperRecognizer {
    context: Arc<WhisperContext>,
    run_lock: Arc<Mutex<()>>,
    audio_reader: Arc<dyn AudioReader>,
    vad_model: Arc<VadModel>,
    threads: usize,
}

impl WhisperRecognizer {
    pub fn new(
        context: WhisperContext,
        audio_reader: Arc<dyn AudioReader>,
        vad_model: Arc<VadModel>,
        threads: usize,
    ) -> Self {
        Self {
            context: Arc::new(context),
            run_lock: Arc::new(Mutex::new(())),
            audio_reader,
            vad_model,
            threads: threads.max(1),
        }
    }
}

impl SpeechRecognizer for WhisperRecognizer {
    fn start(
        &self,
        media: &Path,
        config: &DecodingConfig,
    ) -> Result<RecognizerStream, TranscriptionError> {
        let (tx, rx) = crossbeam_channel::bounded::<DecodeMessage>(SEGMENT_CHANNEL_CAPACITY);
        let abort = Arc::new(AtomicBool::new(false));

        let job = DecodeJob {
            context: self.context.clone(),
            run_lock: self.run_lock.clone(),
            audio_reader: self.audio_reader.clone(),
            vad_model: self.vad_model.clone(),
            threads: self.threads,
            media: media.to_path_buf(),
            config: config.clone(),
            abort: abort.clone(),
        };

        thread::Builder::new()
            .name("whisper-decode".to_string())
            .spawn(move || job.run(tx))
            .map_err(|e| TranscriptionError::Recognizer(format!("failed to spawn decoder: {e}")))?;

        Ok(Box::new(ChannelStream::new(rx, abort)))
    }
}

enum DecodeMessage {
    Event(RecognizerEvent),
    Failed(TranscriptionError),
    Done,
}

struct DecodeJob {
    context: Arc<WhisperContext>,
    run_lock: Arc<Mutex<()>>,
    audio_reader: Arc<dyn AudioReader>,
    vad_model: Arc<VadModel>,
    threads: usize,
    media: PathBuf,
    config: DecodingConfig,
    abort: Arc<AtomicBool>,
}

impl DecodeJob {
    fn run(self, tx: Sender<DecodeMessage>) {
        let message = match self.decode(&tx) {
            Ok(()) => DecodeMessage::Done,
            Err(e) => DecodeMessage::Failed(e),
        };
        let _ = tx.send(message);
    }

    fn decode(&self, tx: &Sender<DecodeMessage>) -> Result<(), TranscriptionError> {
        let _guard = self.run_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let audio = self
            .audio_reader
            .read_audio(&self.media, WHISPER_SAMPLE_RATE)
            .map_err(|e| TranscriptionError::Decode {
                path: self.media.clone(),
                message: e.to_string(),
            })?
            .ok_or_else(|| TranscriptionError::NoAudioTrack(self.media.clone()))?;

        if audio.sample_rate() != WHISPER_SAMPLE_RATE {
            return Err(TranscriptionError::Decode {
                path: self.media.clone(),
                message: format!(
                    "audio decoded at {} Hz, expected {WHISPER_SAMPLE_RATE} Hz",
                    audio.sample_rate()
                ),
            });
        }
        if audio.is_empty() {
            log::info!("{} has an empty audio track", self.media.display());
            return Ok(());
        }
        log::debug!("Decoding {:.1}s of audio", audio.duration());
        if self.abort.load(Ordering::Relaxed) {
            return Ok(());
        }

        let mut state = self
            .context
            .create_state()
            .map_err(|e| TranscriptionError::Recognizer(format!("failed to create state: {e}")))?;

        let detection = match self.config.language_hint() {
            Some(code) => LanguageDetection::forced(code),
            None => detect_language(&mut state, audio.samples(), self.threads)?,
        };
        let event = RecognizerEvent::LanguageDetected(detection.clone());
        if tx.send(DecodeMessage::Event(event)).is_err() {
            return Ok(());
        }

        // Outlives `params`, which borrows the path
        let vad_model = if self.config.vad_filter() {
            self.vad_model.resolve()
        } else {
            None
        };

        let mut params = FullParams::new(SamplingStrategy::BeamSearch {
            beam_size: self.config.beam_size() as i32,
            patience: -1.0,
        });
        params.set_n_threads(self.threads as i32);
        params.set_language(Some(detection.language.as_str()));
        params.set_translate(false);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        if let Some(prompt) = self.config.initial_prompt() {
            params.set_initial_prompt(prompt);
        }

        let thresholds = WhisperThresholds::from(self.config.thresholds());
        params.set_no_context(thresholds.no_context);
        params.set_no_speech_thold(thresholds.no_speech_thold);
        if let Some(entropy) = thresholds.entropy_thold {
            params.set_entropy_thold(entropy);
        }
        if let Some(logprob) = thresholds.logprob_thold {
            params.set_logprob_thold(logprob);
        }

        if self.config.vad_filter() {
            match vad_model.as_deref().and_then(Path::to_str) {
                Some(path) => {
                    params.enable_vad(true);
                    params.set_vad_model_path(Some(path));
                }
                None => log::warn!("VAD requested but no VAD model is available; decoding without it"),
            }
        }

        let segment_tx = tx.clone();
        let abort_on_hangup = self.abort.clone();
        let on_segment: Box<dyn FnMut(SegmentCallbackData)> =
            Box::new(move |data: SegmentCallbackData| {
                let segment = Segment::new(
                    centis_to_secs(data.start_timestamp),
                    centis_to_secs(data.end_timestamp),
                    data.text,
                );
                let event = DecodeMessage::Event(RecognizerEvent::Segment(segment));
                if segment_tx.send(event).is_err() {
                    abort_on_hangup.store(true, Ordering::Relaxed);
                }
            });
        params.set_segment_callback_safe::<_, Box<dyn FnMut(SegmentCallbackData)>>(Some(on_segment));

        let abort = self.abort.clone();
        let should_abort: Box<dyn FnMut() -> bool> =
            Box::new(move || abort.load(Ordering::Relaxed));
        params.set_abort_callback_safe::<_, Box<dyn FnMut() -> bool>>(Some(should_abort));

        let result = state.full(params, audio.samples());
        if self.abort.load(Ordering::Relaxed) {
            return Ok(());
        }
        result.map_err(|e| TranscriptionError::Recognizer(format!("inference failed: {e}")))?;
        Ok(())
    }
}

fn detect_language(
    state: &mut WhisperState,
    samples: &[f32],
    threads: usize,
) -> Result<LanguageDetection, TranscriptionError> {
    state
        .pcm_to_mel(samples, threads)
        .map_err(|e| TranscriptionError::Recognizer(format!("mel spectrogram failed: {e}")))?;
    let (lang_id, probabilities) = state
        .lang_detect(0, threads)
        .map_err(|e| TranscriptionError::Recognizer(format!("language detection failed: {e}")))?;

    let language = whisper_rs::get_lang_str(lang_id).ok_or_else(|| {
        TranscriptionError::Recognizer(format!("unknown language id {lang_id}"))
    })?;
    let confidence = usize::try_from(lang_id)
        .ok()
        .and_then(|i| probabilities.get(i).copied())
        .unwrap_or(0.0)
        .clamp(0.0, 1.0);

    Ok(LanguageDetection {
        language: language.to_string(),
        confidence,
    })
}

fn centis_to_secs(centis: i64) -> f64 {
    centis as f64 / 100.0
}

/// whisper.cpp knobs derived from a strictness threshold set.
///
/// whisper.cpp's entropy threshold plays the role of the compression-ratio
/// filter. A disabled filter becomes an infinite threshold.
#[derive(Clone, Copy, Debug, PartialEq)]
struct WhisperThresholds {
    no_context: bool,
    no_speech_thold: f32,
    entropy_thold: Option<f32>,
    logprob_thold: Option<f32>,
}

impl From<StrictnessThresholds> for WhisperThresholds {
    fn from(t: StrictnessThresholds) -> Self {
        Self {
            no_context: !t.condition_on_previous_text,
            no_speech_thold: t.no_speech_threshold,
            entropy_thold: threshold_value(t.compression_ratio_threshold, f32::INFINITY),
            logprob_thold: threshold_value(t.log_prob_threshold, f32::NEG_INFINITY),
        }
    }
}

fn threshold_value(threshold: Threshold, disabled: f32) -> Option<f32> {
    match threshold {
        Threshold::EngineDefault => None,
        Threshold::Value(v) => Some(v),
        Threshold::Disabled => Some(disabled),
    }
}

/// Receiving end of a decode thread.
///
/// Ends cleanly on `Done`, yields the failure once on `Failed`, and reports a
/// decode thread that vanished without either as `Disconnected`. Dropping the
/// stream asks the decode thread to abort.
struct ChannelStream {
    rx: Receiver<DecodeMessage>,
    abort: Arc<AtomicBool>,
    finished: bool,
}

impl ChannelStream {
    fn new(rx: Receiver<DecodeMessage>, abort: Arc<AtomicBool>) -> Self {
        Self {
            rx,
            abort,
            finished: false,
        }
    }
}

impl Iterator for ChannelStream {
    type Item = Result<RecognizerEvent, TranscriptionError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.rx.recv() {
            Ok(DecodeMessage::Event(event)) => Some(Ok(event)),
            Ok(DecodeMessage::Done) => {
                self.finished = true;
                None
            }
            Ok(DecodeMessage::Failed(e)) => {
                self.finished = true;
                Some(Err(e))
            }
            Err(_) => {
                self.finished = true;
                Some(Err(TranscriptionError::Disconnected))
            }
        }
    }
}

impl Drop for ChannelStream {
    fn drop(&mut self) {
        self.abort.store(true, Ordering::Relaxed);
    }
}
