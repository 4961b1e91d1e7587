pub mod whisper_engine_loader;
pub mod whisper_recognizer;
