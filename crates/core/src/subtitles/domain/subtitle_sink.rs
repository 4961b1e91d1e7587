use std::path::{Path, PathBuf};

use thiserror::Error;

use super::subtitle_writer::RenderedSubtitles;

#[derive(Error, Debug)]
#[error("failed to write {path}: {source}")]
pub struct WriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Destination pair for one run's subtitles.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputPaths {
    pub srt: PathBuf,
    pub txt: PathBuf,
}

impl OutputPaths {
    /// `<dir>/<stem>.srt` and `<dir>/<stem>.txt`.
    pub fn for_basename(dir: &Path, stem: &str) -> Self {
        Self {
            srt: dir.join(format!("{stem}.srt")),
            txt: dir.join(format!("{stem}.txt")),
        }
    }
}

/// Domain interface for persisting rendered subtitles.
///
/// Either both files are written or neither is left behind.
pub trait SubtitleSink: Send {
    fn write(&self, outputs: &OutputPaths, rendered: &RenderedSubtitles) -> Result<(), WriteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_basename() {
        let paths = OutputPaths::for_basename(Path::new("/out"), "clip.final");
        assert_eq!(paths.srt, Path::new("/out/clip.final.srt"));
        assert_eq!(paths.txt, Path::new("/out/clip.final.txt"));
    }
}
