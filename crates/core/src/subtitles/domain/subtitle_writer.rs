use std::fmt::Write as _;

use crate::recognition::domain::segment::Segment;

/// Rendered subtitle documents for one run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderedSubtitles {
    pub srt: String,
    pub plain: String,
}

/// Serializes segments into SRT and a plain-text paragraph.
///
/// Segments are numbered from 1 in the order they are pushed. The plain text
/// is every trimmed segment text joined by one space, then trimmed as a whole,
/// so a blank segment between two others leaves a double space.
#[derive(Debug, Default)]
pub struct SubtitleWriter {
    srt: String,
    plain: String,
    count: usize,
}

impl SubtitleWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one segment to both documents.
    pub fn push(&mut self, segment: &Segment) {
        self.count += 1;
        let text = segment.text.trim();
        // Writing to a String cannot fail
        let _ = write!(
            self.srt,
            "{}\n{} --> {}\n{}\n\n",
            self.count,
            format_timestamp(segment.start),
            format_timestamp(segment.end),
            text
        );
        if self.count > 1 {
            self.plain.push(' ');
        }
        self.plain.push_str(text);
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn finish(self) -> RenderedSubtitles {
        RenderedSubtitles {
            srt: self.srt,
            plain: self.plain.trim().to_string(),
        }
    }

    pub fn render(segments: &[Segment]) -> RenderedSubtitles {
        let mut writer = Self::new();
        for segment in segments {
            writer.push(segment);
        }
        writer.finish()
    }
}

/// `HH:MM:SS,mmm`, truncated to whole milliseconds. Hours are not capped.
///
/// The value is snapped to the nearest microsecond first so centisecond
/// inputs like `1.13` don't lose a millisecond to binary representation.
pub fn format_timestamp(secs: f64) -> String {
    let total_ms = if secs.is_finite() && secs > 0.0 {
        (secs * 1_000_000.0).round() as u64 / 1000
    } else {
        0
    };
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let s = total_secs % 60;
    let m = (total_secs / 60) % 60;
    let h = total_secs / 3600;
    format!("{h:02}:{m:02}:{s:02},{ms:03}")
}

/// Single-line live preview: `[start -> end] text`.
pub fn preview_line(segment: &Segment) -> String {
    format!(
        "[{} -> {}] {}",
        format_timestamp(segment.start),
        format_timestamp(segment.end),
        segment.text.trim()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::zero(0.0, "00:00:00,000")]
    #[case::fraction(1.5, "00:00:01,500")]
    #[case::truncates(1.9999, "00:00:01,999")]
    #[case::minutes(61.25, "00:01:01,250")]
    #[case::centiseconds(1.13, "00:00:01,130")]
    #[case::hours(3723.45, "01:02:03,450")]
    #[case::past_99_hours(360_000.0, "100:00:00,000")]
    #[case::negative_clamps(-3.0, "00:00:00,000")]
    #[case::nan_clamps(f64::NAN, "00:00:00,000")]
    fn test_format_timestamp(#[case] secs: f64, #[case] expected: &str) {
        assert_eq!(format_timestamp(secs), expected);
    }

    #[test]
    fn test_render_three_segments() {
        let segments = vec![
            Segment::new(0.0, 1.5, "Hello"),
            Segment::new(1.5, 3.0, "world"),
            Segment::new(3.0, 4.0, " "),
        ];
        let out = SubtitleWriter::render(&segments);
        assert_eq!(
            out.srt,
            "1\n00:00:00,000 --> 00:00:01,500\nHello\n\n\
             2\n00:00:01,500 --> 00:00:03,000\nworld\n\n\
             3\n00:00:03,000 --> 00:00:04,000\n\n\n"
        );
        assert_eq!(out.plain, "Hello world");
    }

    #[test]
    fn test_render_empty() {
        let out = SubtitleWriter::render(&[]);
        assert_eq!(out, RenderedSubtitles::default());
        assert!(out.srt.is_empty());
        assert!(out.plain.is_empty());
    }

    #[rstest]
    #[case::blank_between(&["Hello", " ", "world"], "Hello  world")]
    #[case::blank_edges(&["   ", " one ", "\t"], "one")]
    #[case::two_blanks_between(&["a", "", "", "b"], "a   b")]
    #[case::all_blank(&[" ", "\n"], "")]
    #[case::inner_spaces_kept(&[" two  words "], "two  words")]
    fn test_plain_text_joins_trimmed_texts(#[case] texts: &[&str], #[case] expected: &str) {
        let segments: Vec<_> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| Segment::new(i as f64, i as f64 + 1.0, *t))
            .collect();
        assert_eq!(SubtitleWriter::render(&segments).plain, expected);
    }

    #[test]
    fn test_blank_segments_keep_their_cue() {
        let out = SubtitleWriter::render(&[
            Segment::new(0.0, 1.0, "   "),
            Segment::new(1.0, 2.0, " one "),
            Segment::new(2.0, 3.0, "\t"),
            Segment::new(3.0, 4.0, "two"),
        ]);
        assert!(out.srt.starts_with("1\n00:00:00,000 --> 00:00:01,000\n\n\n2\n"));
        assert!(out.srt.contains("\n4\n00:00:03,000 --> 00:00:04,000\ntwo\n\n"));
    }

    #[test]
    fn test_push_matches_render() {
        let segments = vec![Segment::new(0.0, 2.0, "a"), Segment::new(2.0, 4.0, "b")];
        let mut writer = SubtitleWriter::new();
        assert!(writer.is_empty());
        for s in &segments {
            writer.push(s);
        }
        assert_eq!(writer.len(), 2);
        assert_eq!(writer.finish(), SubtitleWriter::render(&segments));
    }

    #[test]
    fn test_preview_line() {
        let line = preview_line(&Segment::new(61.0, 62.5, " Hi there "));
        assert_eq!(line, "[00:01:01,000 -> 00:01:02,500] Hi there");
    }
}
