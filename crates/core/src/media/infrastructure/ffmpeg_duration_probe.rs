use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::LazyLock;

use regex::Regex;

use crate::media::domain::duration_probe::DurationProbe;
use crate::media::domain::media_duration::MediaDuration;

static DURATION_RE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"Duration: (\d{2}):(\d{2}):(\d{2})\.(\d{2})"));

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Measures media duration by running `ffmpeg -i <path>` and reading the
/// `Duration:` line from its diagnostic output.
#[derive(Debug, Clone)]
pub struct FfmpegDurationProbe {
    program: PathBuf,
}

impl FfmpegDurationProbe {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
        }
    }

    /// Use a specific ffmpeg executable instead of the one on `PATH`.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn diagnostics(&self, path: &Path) -> std::io::Result<String> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-hide_banner")
            .arg("-i")
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        // ffmpeg exits non-zero without an output file; stderr still carries the header
        let output = cmd.output()?;
        Ok(String::from_utf8_lossy(&output.stderr).into_owned())
    }
}

impl Default for FfmpegDurationProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl DurationProbe for FfmpegDurationProbe {
    fn probe(&self, path: &Path) -> MediaDuration {
        let text = match self.diagnostics(path) {
            Ok(text) => text,
            Err(e) => {
                log::warn!(
                    "Duration probe could not run {}: {e}; progress will be indeterminate",
                    self.program.display()
                );
                return MediaDuration::UNKNOWN;
            }
        };

        match parse_duration(&text) {
            Some(secs) => MediaDuration::from_secs(secs),
            None => {
                log::warn!(
                    "No duration found for {}; progress will be indeterminate",
                    path.display()
                );
                MediaDuration::UNKNOWN
            }
        }
    }
}

/// Extract the first `Duration: HH:MM:SS.ff` from ffmpeg diagnostic text.
pub fn parse_duration(text: &str) -> Option<f64> {
    let re = DURATION_RE.as_ref().ok()?;
    let caps = re.captures(text)?;
    let field = |i: usize| -> Option<u64> { caps.get(i)?.as_str().parse().ok() };

    let hours = field(1)?;
    let minutes = field(2)?;
    let seconds = field(3)?;
    let hundredths = field(4)?;

    let total_hundredths = ((hours * 3600 + minutes * 60 + seconds) * 100) + hundredths;
    Some(total_hundredths as f64 / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const FFMPEG_HEADER: &str = "\
Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'lecture.mp4':
  Metadata:
    major_brand     : isom
  Duration: 01:02:03.45, start: 0.000000, bitrate: 1205 kb/s
  Stream #0:0[0x1](und): Video: h264 (High) (avc1 / 0x31637661), yuv420p
  Stream #0:1[0x2](und): Audio: aac (LC) (mp4a / 0x6134706D), 44100 Hz, stereo
At least one output file must be specified
";

    #[test]
    fn test_parse_duration_exact_value() {
        assert_eq!(parse_duration(FFMPEG_HEADER), Some(3723.45));
    }

    #[rstest]
    #[case::zero("Duration: 00:00:00.00,", 0.0)]
    #[case::sub_second("Duration: 00:00:00.07,", 0.07)]
    #[case::minutes("Duration: 00:10:00.50,", 600.5)]
    #[case::long("Duration: 12:00:00.00,", 43200.0)]
    fn test_parse_duration_cases(#[case] text: &str, #[case] expected: f64) {
        assert_eq!(parse_duration(text), Some(expected));
    }

    #[test]
    fn test_parse_duration_takes_first_match() {
        let text = "Duration: 00:00:10.00\nDuration: 00:00:20.00";
        assert_eq!(parse_duration(text), Some(10.0));
    }

    #[rstest]
    #[case::empty("")]
    #[case::not_available("Duration: N/A, bitrate: N/A")]
    #[case::missing_hundredths("Duration: 00:01:02")]
    #[case::no_such_file("missing.mp4: No such file or directory")]
    fn test_parse_duration_no_match(#[case] text: &str) {
        assert_eq!(parse_duration(text), None);
    }

    #[test]
    fn test_probe_missing_program_degrades_to_unknown() {
        let probe = FfmpegDurationProbe::with_program("/nonexistent/bin/ffmpeg-missing");
        let d = probe.probe(Path::new("/nonexistent/file.mp4"));
        assert_eq!(d, MediaDuration::UNKNOWN);
    }

    #[test]
    fn test_default_program_is_ffmpeg() {
        assert_eq!(FfmpegDurationProbe::default().program(), Path::new("ffmpeg"));
    }
}
