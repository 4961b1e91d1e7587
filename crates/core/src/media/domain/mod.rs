pub mod audio_buffer;
pub mod audio_reader;
pub mod duration_probe;
pub mod media_duration;
