mod settings;

use std::error::Error;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use crossbeam_channel::Receiver;

use vidscribe_core::media::infrastructure::ffmpeg_duration_probe::FfmpegDurationProbe;
use vidscribe_core::pipeline::progress_tracker::ProgressSnapshot;
use vidscribe_core::pipeline::session_controller::{
    MediaSource, SessionController, SessionEvent, SessionState, TranscriptionRequest,
};
use vidscribe_core::pipeline::stage_logger::LogStageLogger;
use vidscribe_core::pipeline::transcription_worker;
use vidscribe_core::recognition::domain::device_profile::DeviceChoice;
use vidscribe_core::recognition::domain::model_size::ModelSize;
use vidscribe_core::recognition::engine_cache::EngineCache;
use vidscribe_core::recognition::infrastructure::whisper_engine_loader::WhisperEngineLoader;
use vidscribe_core::shared::constants::MEDIA_EXTENSIONS;
use vidscribe_core::subtitles::domain::subtitle_writer::preview_line;
use vidscribe_core::subtitles::infrastructure::file_subtitle_sink::FileSubtitleSink;

use settings::Settings;

/// Subtitles and transcripts for video and audio files.
#[derive(Parser)]
#[command(name = "vidscribe", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Transcribe a media file into <name>.srt and <name>.txt.
    Transcribe(TranscribeArgs),
    /// Download Whisper weights ahead of time.
    DownloadModels(DownloadArgs),
}

#[derive(Args)]
struct TranscribeArgs {
    /// Input video or audio file, or `-` to read it from stdin.
    input: PathBuf,

    /// Original file name when reading from stdin (names the outputs).
    #[arg(long)]
    name: Option<String>,

    /// Directory for the .srt/.txt files (default: next to the input).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Model size: tiny, base, small, medium, large-v3.
    #[arg(long)]
    model: Option<String>,

    /// Language: Auto, English, Korean, Japanese, Chinese (or en/ko/ja/zh).
    #[arg(long)]
    language: Option<String>,

    /// Context hint passed to the recognizer (names, jargon).
    #[arg(long, default_value = "")]
    hint: String,

    /// Skip silent stretches with voice activity detection.
    #[arg(long)]
    vad: Option<bool>,

    /// Ask the recognizer to ignore singing and lyrics.
    #[arg(long)]
    suppress_singing: Option<bool>,

    /// Wider beam search: slower, more accurate.
    #[arg(long)]
    high_accuracy: Option<bool>,

    /// Strict thresholds against hallucination; false favors recall.
    #[arg(long)]
    strict: Option<bool>,

    /// Inference device: auto, cpu, gpu.
    #[arg(long, default_value = "auto")]
    device: String,

    /// ffmpeg executable used to probe the media duration.
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// Decode threads (default: available cores, capped at 8).
    #[arg(long)]
    threads: Option<usize>,

    /// Directory holding ggml weights (default: user cache directory).
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// Persist the effective model/language/toggle choices as defaults.
    #[arg(long)]
    save_settings: bool,
}

#[derive(Args)]
struct DownloadArgs {
    /// Model sizes to fetch (comma-separated, default: all).
    #[arg(long, value_delimiter = ',')]
    models: Option<Vec<String>>,

    /// Device whose precision decides which weights to fetch: auto, cpu, gpu.
    #[arg(long, default_value = "auto")]
    device: String,

    /// Directory holding ggml weights (default: user cache directory).
    #[arg(long)]
    models_dir: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    match Cli::parse().command {
        Command::Transcribe(args) => transcribe(args),
        Command::DownloadModels(args) => download_models(args),
    }
}

fn transcribe(args: TranscribeArgs) -> Result<(), Box<dyn Error>> {
    validate(&args)?;

    let settings = effective_settings(&args, Settings::load());
    if args.save_settings {
        let path = settings.save()?;
        log::info!("Saved settings to {}", path.display());
    }
    let choices = settings.to_choices(&args.hint)?;
    let device = args.device.parse::<DeviceChoice>()?.resolve();
    log::info!("Using {} model on {device}", choices.model_size);

    let mut loader = engine_loader(args.models_dir.as_deref());
    if let Some(threads) = args.threads {
        loader = loader.with_threads(threads);
    }

    let controller = SessionController::new(
        Box::new(FfmpegDurationProbe::with_program(&args.ffmpeg)),
        EngineCache::new(Box::new(loader)),
        Box::new(FileSubtitleSink),
        Box::new(LogStageLogger::default()),
    );
    let request = TranscriptionRequest {
        source: media_source(&args)?,
        output_dir: args.output_dir.clone(),
        choices,
        device,
    };

    let (events, cancelled) = transcription_worker::spawn(controller, request);
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\nCancelling after the current segment...");
        cancelled.store(true, Ordering::Relaxed);
    }) {
        log::warn!("Ctrl+C will not cancel cleanly: {e}");
    }

    report(events)
}

fn download_models(args: DownloadArgs) -> Result<(), Box<dyn Error>> {
    let precision = args.device.parse::<DeviceChoice>()?.resolve().precision;
    let sizes = match args.models {
        Some(ref names) => names
            .iter()
            .map(|n| n.parse::<ModelSize>())
            .collect::<Result<Vec<_>, _>>()?,
        None => ModelSize::ALL.to_vec(),
    };

    let loader = engine_loader(args.models_dir.as_deref());

    let mut failed = Vec::new();
    for size in sizes {
        let result = loader.prefetch(size, precision);
        eprintln!();
        match result {
            Ok(path) => println!("{size}: {}", path.display()),
            Err(e) => {
                eprintln!("{size}: {e}");
                failed.push(size.to_string());
            }
        }
    }
    let vad = loader.prefetch_vad();
    eprintln!();
    match vad {
        Ok(path) => println!("vad: {}", path.display()),
        Err(e) => {
            eprintln!("vad: {e}");
            failed.push("vad".to_string());
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(format!("Failed to download: {}", failed.join(", ")).into())
    }
}

fn engine_loader(models_dir: Option<&Path>) -> WhisperEngineLoader {
    let mut loader =
        WhisperEngineLoader::new().with_download_progress(Arc::new(download_progress));
    if let Some(dir) = models_dir {
        loader = loader.with_models_dir(dir);
    }
    if let Some(dir) = bundled_models_dir() {
        log::debug!("Checking bundled weights in {}", dir.display());
        loader = loader.with_bundled_dir(dir);
    }
    loader
}

/// `models/` next to the executable, shipped by packaged installs.
fn bundled_models_dir() -> Option<PathBuf> {
    let dir = std::env::current_exe().ok()?.parent()?.join("models");
    dir.is_dir().then_some(dir)
}

/// Print live preview lines and the final result; return the failure, if any.
fn report(events: Receiver<SessionEvent>) -> Result<(), Box<dyn Error>> {
    let mut pending_line: Option<String> = None;
    let mut failure = None;

    for event in events {
        match event {
            SessionEvent::DurationProbed(duration) => {
                if !duration.is_known() {
                    eprintln!("Media duration unknown; progress will be indeterminate");
                }
            }
            SessionEvent::LanguageDetected(detection) => {
                eprintln!(
                    "Language: {} ({:.0}%)",
                    detection.language,
                    detection.confidence * 100.0
                );
            }
            SessionEvent::Segment { segment, .. } => {
                pending_line = Some(preview_line(&segment));
            }
            SessionEvent::Progress(progress) => {
                if let Some(line) = pending_line.take() {
                    println!("{} {line}", format_progress(progress));
                }
            }
            SessionEvent::Completed(outputs) => {
                println!(
                    "Wrote {} and {} ({} segments)",
                    outputs.srt_path.display(),
                    outputs.txt_path.display(),
                    outputs.segment_count
                );
            }
            SessionEvent::StateChanged(SessionState::Cancelled) => {
                eprintln!("Cancelled; no files written");
            }
            SessionEvent::StateChanged(_) => {}
            SessionEvent::Failed(message) => failure = Some(message),
        }
    }

    match failure {
        Some(message) => Err(message.into()),
        None => Ok(()),
    }
}

fn format_progress(progress: ProgressSnapshot) -> String {
    match progress {
        ProgressSnapshot::Percent(p) => format!("[{p:>3}%]"),
        ProgressSnapshot::Indeterminate => "[ ...]".to_string(),
    }
}

/// Saved settings overridden by whatever flags were given.
fn effective_settings(args: &TranscribeArgs, saved: Settings) -> Settings {
    Settings {
        model: args.model.clone().unwrap_or(saved.model),
        language: args.language.clone().unwrap_or(saved.language),
        vad: args.vad.unwrap_or(saved.vad),
        suppress_singing: args.suppress_singing.unwrap_or(saved.suppress_singing),
        high_accuracy: args.high_accuracy.unwrap_or(saved.high_accuracy),
        strict: args.strict.unwrap_or(saved.strict),
    }
}

fn media_source(args: &TranscribeArgs) -> Result<MediaSource, Box<dyn Error>> {
    if !is_stdin(&args.input) {
        return Ok(MediaSource::Path(args.input.clone()));
    }
    let file_name = args
        .name
        .clone()
        .ok_or("--name is required when reading from stdin")?;
    let mut data = Vec::new();
    std::io::stdin().lock().read_to_end(&mut data)?;
    Ok(MediaSource::Upload { file_name, data })
}

fn validate(args: &TranscribeArgs) -> Result<(), Box<dyn Error>> {
    if is_stdin(&args.input) {
        if args.name.is_none() {
            return Err("--name is required when reading from stdin".into());
        }
    } else if !args.input.exists() {
        return Err(format!("Input file not found: {}", args.input.display()).into());
    } else if !is_media(&args.input) {
        log::warn!(
            "{} does not have a known media extension; trying anyway",
            args.input.display()
        );
    }
    if let Some(ref dir) = args.output_dir {
        if !dir.is_dir() {
            return Err(format!("Output directory not found: {}", dir.display()).into());
        }
    }
    if let Some(ref model) = args.model {
        model.parse::<ModelSize>()?;
    }
    if args.threads == Some(0) {
        return Err("Threads must be at least 1".into());
    }
    Ok(())
}

fn is_stdin(path: &Path) -> bool {
    path.as_os_str() == "-"
}

fn is_media(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| MEDIA_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn download_progress(name: &str, downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading {name}... {pct}%");
    } else {
        eprint!("\rDownloading {name}... {downloaded} bytes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    fn args(input: &str) -> TranscribeArgs {
        Cli::try_parse_from(["vidscribe", "transcribe", input])
            .map(|cli| match cli.command {
                Command::Transcribe(a) => a,
                Command::DownloadModels(_) => unreachable!(),
            })
            .unwrap()
    }

    #[test]
    fn test_cli_parses_transcribe_flags() {
        let cli = Cli::try_parse_from([
            "vidscribe",
            "transcribe",
            "talk.mp4",
            "--model",
            "small",
            "--language",
            "Korean",
            "--vad",
            "false",
            "--strict",
            "false",
            "--hint",
            "K-pop",
        ])
        .unwrap();
        let Command::Transcribe(a) = cli.command else {
            panic!("expected transcribe");
        };
        assert_eq!(a.model.as_deref(), Some("small"));
        assert_eq!(a.vad, Some(false));
        assert_eq!(a.strict, Some(false));
        assert_eq!(a.high_accuracy, None);
        assert_eq!(a.hint, "K-pop");
    }

    #[test]
    fn test_cli_parses_download_models() {
        let cli =
            Cli::try_parse_from(["vidscribe", "download-models", "--models", "tiny,base"]).unwrap();
        let Command::DownloadModels(a) = cli.command else {
            panic!("expected download-models");
        };
        assert_eq!(a.models.unwrap(), vec!["tiny", "base"]);
    }

    #[test]
    fn test_flags_override_saved_settings() {
        let mut a = args("talk.mp4");
        a.model = Some("tiny".to_string());
        a.high_accuracy = Some(true);
        let saved = Settings {
            model: "small".to_string(),
            language: "Japanese".to_string(),
            ..Settings::default()
        };
        let effective = effective_settings(&a, saved);
        assert_eq!(effective.model, "tiny");
        assert_eq!(effective.language, "Japanese");
        assert!(effective.high_accuracy);
        assert!(effective.vad);
    }

    #[test]
    fn test_validate_missing_input() {
        assert!(validate(&args("/definitely/not/here.mp4")).is_err());
    }

    #[test]
    fn test_validate_stdin_requires_name() {
        let mut a = args("-");
        assert!(validate(&a).is_err());
        a.name = Some("clip.mp4".to_string());
        assert!(validate(&a).is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_model() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("a.mp4");
        std::fs::write(&input, b"").unwrap();
        let mut a = args(input.to_str().unwrap());
        assert!(validate(&a).is_ok());
        a.model = Some("gigantic".to_string());
        assert!(validate(&a).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_threads() {
        let mut a = args("-");
        a.name = Some("clip.mp4".to_string());
        a.threads = Some(0);
        assert!(validate(&a).is_err());
    }

    #[rstest]
    #[case::mp4("movie.mp4", true)]
    #[case::upper("MOVIE.MKV", true)]
    #[case::audio("song.flac", true)]
    #[case::text("notes.txt", false)]
    #[case::none("README", false)]
    fn test_is_media(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_media(Path::new(name)), expected);
    }

    #[rstest]
    #[case::percent(ProgressSnapshot::Percent(7), "[  7%]")]
    #[case::full(ProgressSnapshot::Percent(100), "[100%]")]
    #[case::unknown(ProgressSnapshot::Indeterminate, "[ ...]")]
    fn test_format_progress(#[case] progress: ProgressSnapshot, #[case] expected: &str) {
        assert_eq!(format_progress(progress), expected);
    }
}
