use std::fs;
use std::path::{Path, PathBuf};

use crate::subtitles::domain::subtitle_sink::{OutputPaths, SubtitleSink, WriteError};
use crate::subtitles::domain::subtitle_writer::RenderedSubtitles;

/// Writes subtitles as UTF-8 files next to each other.
///
/// Each file goes to a `.part` sibling first and is renamed into place. If
/// the text file fails, the already-placed SRT is removed again.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileSubtitleSink;

impl SubtitleSink for FileSubtitleSink {
    fn write(&self, outputs: &OutputPaths, rendered: &RenderedSubtitles) -> Result<(), WriteError> {
        write_atomically(&outputs.srt, &rendered.srt)?;
        if let Err(e) = write_atomically(&outputs.txt, &rendered.plain) {
            let _ = fs::remove_file(&outputs.srt);
            return Err(e);
        }
        log::info!(
            "Wrote {} and {}",
            outputs.srt.display(),
            outputs.txt.display()
        );
        Ok(())
    }
}

fn write_atomically(path: &Path, contents: &str) -> Result<(), WriteError> {
    let part = part_path(path);
    let result = fs::write(&part, contents).and_then(|()| fs::rename(&part, path));
    result.map_err(|source| {
        let _ = fs::remove_file(&part);
        WriteError {
            path: path.to_path_buf(),
            source,
        }
    })
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn rendered() -> RenderedSubtitles {
        RenderedSubtitles {
            srt: "1\n00:00:00,000 --> 00:00:01,000\nHi\n\n".to_string(),
            plain: "Hi".to_string(),
        }
    }

    #[test]
    fn test_writes_both_files() {
        let tmp = TempDir::new().unwrap();
        let outputs = OutputPaths::for_basename(tmp.path(), "talk");
        FileSubtitleSink.write(&outputs, &rendered()).unwrap();

        assert_eq!(fs::read_to_string(&outputs.srt).unwrap(), rendered().srt);
        assert_eq!(fs::read_to_string(&outputs.txt).unwrap(), "Hi");
        assert!(!part_path(&outputs.srt).exists());
        assert!(!part_path(&outputs.txt).exists());
    }

    #[test]
    fn test_writes_empty_files() {
        let tmp = TempDir::new().unwrap();
        let outputs = OutputPaths::for_basename(tmp.path(), "silence");
        FileSubtitleSink
            .write(&outputs, &RenderedSubtitles::default())
            .unwrap();
        assert_eq!(fs::read_to_string(&outputs.srt).unwrap(), "");
        assert_eq!(fs::read_to_string(&outputs.txt).unwrap(), "");
    }

    #[test]
    fn test_overwrites_existing_output() {
        let tmp = TempDir::new().unwrap();
        let outputs = OutputPaths::for_basename(tmp.path(), "talk");
        fs::write(&outputs.txt, "stale").unwrap();
        FileSubtitleSink.write(&outputs, &rendered()).unwrap();
        assert_eq!(fs::read_to_string(&outputs.txt).unwrap(), "Hi");
    }

    #[test]
    fn test_missing_directory_is_write_error() {
        let tmp = TempDir::new().unwrap();
        let outputs = OutputPaths::for_basename(&tmp.path().join("missing"), "talk");
        let err = FileSubtitleSink.write(&outputs, &rendered()).unwrap_err();
        assert_eq!(err.path, outputs.srt);
        assert!(!outputs.txt.exists());
    }

    #[test]
    fn test_second_failure_removes_first_file() {
        let tmp = TempDir::new().unwrap();
        let outputs = OutputPaths {
            srt: tmp.path().join("talk.srt"),
            txt: tmp.path().join("no_such_dir").join("talk.txt"),
        };
        let err = FileSubtitleSink.write(&outputs, &rendered()).unwrap_err();
        assert_eq!(err.path, outputs.txt);
        assert!(!outputs.srt.exists());
    }

    #[test]
    fn test_part_path() {
        assert_eq!(
            part_path(Path::new("/a/b.srt")),
            Path::new("/a/b.srt.part")
        );
    }
}
