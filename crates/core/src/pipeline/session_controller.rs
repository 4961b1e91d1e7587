use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::Sender;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::media::domain::duration_probe::DurationProbe;
use crate::media::domain::media_duration::MediaDuration;
use crate::recognition::domain::decoding_policy::{DecodingChoices, DecodingPolicy};
use crate::recognition::domain::device_profile::DeviceProfile;
use crate::recognition::domain::engine_loader::{EngineKey, EngineLoadError};
use crate::recognition::domain::segment::{LanguageDetection, Segment};
use crate::recognition::domain::speech_recognizer::TranscriptionError;
use crate::recognition::engine_cache::EngineCache;
use crate::subtitles::domain::subtitle_sink::{OutputPaths, SubtitleSink, WriteError};
use crate::subtitles::domain::subtitle_writer::SubtitleWriter;

use super::progress_tracker::{ProgressSnapshot, ProgressTracker};
use super::stage_logger::StageLogger;
use super::transcription_session::TranscriptionSession;

const FALLBACK_STEM: &str = "transcript";

/// Where a run is in its lifecycle.
///
/// `Idle → ProbingDuration → LoadingEngine → Transcribing → Writing →
/// Succeeded`; any stage may end in `Failed` or `Cancelled`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    ProbingDuration,
    LoadingEngine,
    Transcribing,
    Writing,
    Succeeded,
    Failed,
    Cancelled,
}

/// Status reported to the front end while a run progresses.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    StateChanged(SessionState),
    DurationProbed(MediaDuration),
    LanguageDetected(LanguageDetection),
    /// `index` is 1-based.
    Segment { index: usize, segment: Segment },
    Progress(ProgressSnapshot),
    Completed(SubtitleOutputs),
    Failed(String),
}

/// Files produced by a successful run.
#[derive(Clone, Debug, PartialEq)]
pub struct SubtitleOutputs {
    pub srt_path: PathBuf,
    pub txt_path: PathBuf,
    pub segment_count: usize,
    pub detection: Option<LanguageDetection>,
}

/// Media to transcribe.
#[derive(Clone, Debug)]
pub enum MediaSource {
    Path(PathBuf),
    /// Uploaded bytes with the name they arrived under.
    Upload { file_name: String, data: Vec<u8> },
}

#[derive(Clone, Debug)]
pub struct TranscriptionRequest {
    pub source: MediaSource,
    /// Defaults to the media's directory, or the current directory for uploads.
    pub output_dir: Option<PathBuf>,
    pub choices: DecodingChoices,
    pub device: DeviceProfile,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RunOutcome {
    Completed(SubtitleOutputs),
    Cancelled,
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("could not stage upload {file_name}: {source}")]
    StagingFailed {
        file_name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("engine load failed: {0}")]
    EngineLoadFailed(#[from] EngineLoadError),
    #[error("transcription failed: {0}")]
    TranscriptionFailed(#[from] TranscriptionError),
    #[error("writing subtitles failed: {0}")]
    WriteFailed(#[from] WriteError),
}

/// Runs one transcription end to end.
///
/// Every stage blocks the calling thread. Cancellation is polled between
/// stages and between segments; a cancelled or failed run writes nothing and
/// removes any staged upload.
pub struct SessionController {
    probe: Box<dyn DurationProbe>,
    engines: Arc<EngineCache>,
    sink: Box<dyn SubtitleSink>,
    logger: Box<dyn StageLogger>,
    state: SessionState,
}

impl SessionController {
    pub fn new(
        probe: Box<dyn DurationProbe>,
        engines: Arc<EngineCache>,
        sink: Box<dyn SubtitleSink>,
        logger: Box<dyn StageLogger>,
    ) -> Self {
        Self {
            probe,
            engines,
            sink,
            logger,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn run(
        &mut self,
        request: TranscriptionRequest,
        events: &Sender<SessionEvent>,
        cancelled: &AtomicBool,
    ) -> Result<RunOutcome, SessionError> {
        self.state = SessionState::Idle;
        let result = self.execute(request, events, cancelled);

        match result {
            Ok(RunOutcome::Completed(ref outputs)) => {
                self.transition(SessionState::Succeeded, events);
                let _ = events.send(SessionEvent::Completed(outputs.clone()));
            }
            Ok(RunOutcome::Cancelled) => {
                self.logger.info("Run cancelled, no output written");
                self.transition(SessionState::Cancelled, events);
            }
            Err(ref e) => {
                log::error!("Run failed: {e}");
                self.transition(SessionState::Failed, events);
                let _ = events.send(SessionEvent::Failed(e.to_string()));
            }
        }
        self.logger.summary();
        result
    }

    fn execute(
        &mut self,
        request: TranscriptionRequest,
        events: &Sender<SessionEvent>,
        cancelled: &AtomicBool,
    ) -> Result<RunOutcome, SessionError> {
        // Dropped on every return path, which deletes a staged upload
        let media = StagedMedia::stage(&request.source)?;
        if is_cancelled(cancelled) {
            return Ok(RunOutcome::Cancelled);
        }

        self.transition(SessionState::ProbingDuration, events);
        let started = Instant::now();
        let duration = self.probe.probe(media.path());
        self.logger.timing("probe", elapsed_ms(started));
        if duration.is_known() {
            self.logger.metric("media_secs", duration.as_secs());
        }
        let _ = events.send(SessionEvent::DurationProbed(duration));
        if is_cancelled(cancelled) {
            return Ok(RunOutcome::Cancelled);
        }

        self.transition(SessionState::LoadingEngine, events);
        let config = DecodingPolicy::build(&request.choices);
        let started = Instant::now();
        let engine = self
            .engines
            .get(EngineKey::new(config.model_size(), request.device))?;
        self.logger.timing("load", elapsed_ms(started));
        if is_cancelled(cancelled) {
            return Ok(RunOutcome::Cancelled);
        }

        self.transition(SessionState::Transcribing, events);
        let started = Instant::now();
        let mut session = TranscriptionSession::start(engine.as_ref(), media.path(), &config)?;
        let mut tracker = ProgressTracker::new(duration);
        let mut writer = SubtitleWriter::new();
        let mut detection_reported = report_detection(session.wait_for_detection(), events);

        while let Some(item) = session.next() {
            if is_cancelled(cancelled) {
                return Ok(RunOutcome::Cancelled);
            }
            let segment = item?;
            if !detection_reported {
                detection_reported = report_detection(session.detection(), events);
            }

            writer.push(&segment);
            let index = writer.len();
            self.logger.segment(index, segment.end);
            let progress = tracker.update(segment.end);
            let _ = events.send(SessionEvent::Segment { index, segment });
            let _ = events.send(SessionEvent::Progress(progress));
        }
        if is_cancelled(cancelled) {
            return Ok(RunOutcome::Cancelled);
        }
        if !detection_reported {
            report_detection(session.detection(), events);
        }
        let detection = session.detection().cloned();
        drop(session);
        self.logger.timing("transcribe", elapsed_ms(started));

        self.transition(SessionState::Writing, events);
        let started = Instant::now();
        let segment_count = writer.len();
        let output_dir = request
            .output_dir
            .clone()
            .unwrap_or_else(|| media.default_output_dir());
        let paths = OutputPaths::for_basename(&output_dir, media.stem());
        self.sink.write(&paths, &writer.finish())?;
        self.logger.timing("write", elapsed_ms(started));
        let _ = events.send(SessionEvent::Progress(tracker.complete()));

        Ok(RunOutcome::Completed(SubtitleOutputs {
            srt_path: paths.srt,
            txt_path: paths.txt,
            segment_count,
            detection,
        }))
    }

    fn transition(&mut self, state: SessionState, events: &Sender<SessionEvent>) {
        self.state = state;
        log::info!("Stage: {state:?}");
        let _ = events.send(SessionEvent::StateChanged(state));
    }
}

fn report_detection(detection: Option<&LanguageDetection>, events: &Sender<SessionEvent>) -> bool {
    match detection {
        Some(d) => {
            let _ = events.send(SessionEvent::LanguageDetected(d.clone()));
            true
        }
        None => false,
    }
}

fn is_cancelled(flag: &AtomicBool) -> bool {
    flag.load(Ordering::Relaxed)
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

/// Media on disk for the duration of a run.
struct StagedMedia {
    path: PathBuf,
    stem: String,
    from_upload: bool,
    _temp: Option<NamedTempFile>,
}

impl StagedMedia {
    fn stage(source: &MediaSource) -> Result<Self, SessionError> {
        match source {
            MediaSource::Path(path) => Ok(Self {
                path: path.clone(),
                stem: stem_of(path),
                from_upload: false,
                _temp: None,
            }),
            MediaSource::Upload { file_name, data } => {
                let staging_failed = |source| SessionError::StagingFailed {
                    file_name: file_name.clone(),
                    source,
                };
                let suffix = Path::new(file_name)
                    .extension()
                    .map(|ext| format!(".{}", ext.to_string_lossy()))
                    .unwrap_or_default();
                let mut temp = tempfile::Builder::new()
                    .prefix("vidscribe-")
                    .suffix(&suffix)
                    .tempfile()
                    .map_err(staging_failed)?;
                temp.write_all(data)
                    .and_then(|()| temp.flush())
                    .map_err(staging_failed)?;
                log::info!(
                    "Staged upload {file_name} ({} bytes) at {}",
                    data.len(),
                    temp.path().display()
                );
                Ok(Self {
                    path: temp.path().to_path_buf(),
                    stem: stem_of(Path::new(file_name)),
                    from_upload: true,
                    _temp: Some(temp),
                })
            }
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn stem(&self) -> &str {
        &self.stem
    }

    fn default_output_dir(&self) -> PathBuf {
        if self.from_upload {
            return PathBuf::from(".");
        }
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| FALLBACK_STEM.to_string())
}
