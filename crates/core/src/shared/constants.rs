/// Sample rate whisper.cpp expects for its PCM input.
pub const WHISPER_SAMPLE_RATE: u32 = 16000;

/// Base URL for ggml-converted Whisper weights.
pub const WHISPER_MODEL_BASE_URL: &str =
    "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

pub const VAD_MODEL_NAME: &str = "ggml-silero-v5.1.2.bin";
pub const VAD_MODEL_URL: &str =
    "https://huggingface.co/ggml-org/whisper-vad/resolve/main/ggml-silero-v5.1.2.bin";

/// Instruction prepended to the initial prompt when singing suppression is on.
pub const ANTI_SINGING_PROMPT: &str = "Ignore singing and lyrics.";

pub const DEFAULT_BEAM_SIZE: u32 = 5;
pub const HIGH_ACCURACY_BEAM_SIZE: u32 = 10;

/// Log a debug line for every Nth consumed segment.
pub const SEGMENT_LOG_INTERVAL: usize = 10;

/// Upper bound on decode threads handed to whisper.cpp.
pub const MAX_DECODE_THREADS: usize = 8;

pub const MEDIA_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "avi", "mov", "flv", "webm", "wav", "mp3", "m4a", "flac", "ogg",
];
