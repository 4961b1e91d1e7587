use std::path::Path;

use super::audio_buffer::AudioBuffer;

/// Domain interface for decoding the audio track of a media file.
pub trait AudioReader: Send + Sync {
    /// Decode the audio track to mono PCM at `target_sample_rate`.
    /// Returns `None` if the file has no audio track.
    fn read_audio(
        &self,
        path: &Path,
        target_sample_rate: u32,
    ) -> Result<Option<AudioBuffer>, Box<dyn std::error::Error + Send + Sync>>;
}
