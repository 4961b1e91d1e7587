/// One recognized span of speech.
///
/// Times are seconds from the start of the media with `0 <= start <= end`.
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl Segment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    /// Whether the timestamps satisfy `0 <= start <= end`.
    pub fn is_well_formed(&self) -> bool {
        self.start.is_finite() && self.end.is_finite() && self.start >= 0.0 && self.start <= self.end
    }
}

/// Language the recognizer settled on, with its confidence in [0, 1].
#[derive(Clone, Debug, PartialEq)]
pub struct LanguageDetection {
    pub language: String,
    pub confidence: f32,
}

impl LanguageDetection {
    /// Detection for a language the user forced: certain by definition.
    pub fn forced(code: &str) -> Self {
        Self {
            language: code.to_string(),
            confidence: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_segment_fields() {
        let s = Segment::new(1.0, 2.5, "hello");
        assert_eq!(s.start, 1.0);
        assert_eq!(s.end, 2.5);
        assert_eq!(s.text, "hello");
    }

    #[rstest]
    #[case::ordinary(Segment::new(0.0, 1.0, "a"), true)]
    #[case::zero_length(Segment::new(2.0, 2.0, ""), true)]
    #[case::negative_start(Segment::new(-0.1, 1.0, "a"), false)]
    #[case::end_before_start(Segment::new(3.0, 2.0, "a"), false)]
    #[case::nan(Segment::new(f64::NAN, 1.0, "a"), false)]
    fn test_is_well_formed(#[case] segment: Segment, #[case] expected: bool) {
        assert_eq!(segment.is_well_formed(), expected);
    }

    #[test]
    fn test_forced_detection_is_certain() {
        let d = LanguageDetection::forced("ko");
        assert_eq!(d.language, "ko");
        assert_eq!(d.confidence, 1.0);
    }
}
