use std::collections::VecDeque;
use std::path::Path;

use crate::recognition::domain::decoding_config::DecodingConfig;
use crate::recognition::domain::segment::{LanguageDetection, Segment};
use crate::recognition::domain::speech_recognizer::{
    RecognizerEvent, RecognizerStream, SpeechRecognizer, TranscriptionError,
};

/// One recognizer invocation, consumed as a lazy sequence of segments.
///
/// `next()` blocks until the recognizer produces the next segment. Segments
/// are checked against the recognizer contract (`0 <= start <= end`,
/// non-decreasing `start`); a violation or a recognizer error is yielded once
/// and the session is exhausted afterwards. Dropping the session mid-run
/// asks the recognizer to stop.
pub struct TranscriptionSession {
    stream: RecognizerStream,
    detection: Option<LanguageDetection>,
    buffered: VecDeque<Segment>,
    deferred_error: Option<TranscriptionError>,
    last_start: f64,
    finished: bool,
}

impl TranscriptionSession {
    pub fn start(
        recognizer: &dyn SpeechRecognizer,
        media: &Path,
        config: &DecodingConfig,
    ) -> Result<Self, TranscriptionError> {
        let stream = recognizer.start(media, config)?;
        Ok(Self::from_stream(stream))
    }

    fn from_stream(stream: RecognizerStream) -> Self {
        Self {
            stream,
            detection: None,
            buffered: VecDeque::new(),
            deferred_error: None,
            last_start: 0.0,
            finished: false,
        }
    }

    /// Detected language, once the recognizer has reported it.
    pub fn detection(&self) -> Option<&LanguageDetection> {
        self.detection.as_ref()
    }

    /// Block until the recognizer reports its language or its first segment.
    ///
    /// A segment that arrives first is kept for the next `next()` call.
    /// Returns `None` if no detection preceded the first segment, or the
    /// recognizer finished or failed without one.
    pub fn wait_for_detection(&mut self) -> Option<&LanguageDetection> {
        if self.detection.is_none() && self.buffered.is_empty() && self.deferred_error.is_none() {
            match self.pull() {
                Some(Ok(segment)) => self.buffered.push_back(segment),
                Some(Err(e)) => self.deferred_error = Some(e),
                None => {}
            }
        }
        self.detection.as_ref()
    }

    fn pull(&mut self) -> Option<Result<Segment, TranscriptionError>> {
        while !self.finished {
            match self.stream.next() {
                None => self.finished = true,
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(e));
                }
                Some(Ok(RecognizerEvent::LanguageDetected(detection))) => {
                    log::info!(
                        "Detected language '{}' with probability {:.2}",
                        detection.language,
                        detection.confidence
                    );
                    self.detection = Some(detection);
                }
                Some(Ok(RecognizerEvent::Segment(segment))) => {
                    if let Err(e) = self.check_contract(&segment) {
                        self.finished = true;
                        return Some(Err(e));
                    }
                    self.last_start = segment.start;
                    return Some(Ok(segment));
                }
            }
        }
        None
    }

    fn check_contract(&self, segment: &Segment) -> Result<(), TranscriptionError> {
        if !segment.is_well_formed() {
            return Err(TranscriptionError::ContractViolation(format!(
                "segment [{}, {}] has invalid bounds",
                segment.start, segment.end
            )));
        }
        if segment.start < self.last_start {
            return Err(TranscriptionError::ContractViolation(format!(
                "segment starts at {} after one starting at {}",
                segment.start, self.last_start
            )));
        }
        Ok(())
    }
}

impl Iterator for TranscriptionSession {
    type Item = Result<Segment, TranscriptionError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(segment) = self.buffered.pop_front() {
            return Some(Ok(segment));
        }
        if let Some(e) = self.deferred_error.take() {
            return Some(Err(e));
        }
        self.pull()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::ScriptedRecognizer;
    use crate::recognition::domain::decoding_policy::{DecodingChoices, DecodingPolicy};

    fn detected(code: &str) -> Result<RecognizerEvent, TranscriptionError> {
        Ok(RecognizerEvent::LanguageDetected(LanguageDetection {
            language: code.to_string(),
            confidence: 0.9,
        }))
    }

    fn seg(start: f64, end: f64, text: &str) -> Result<RecognizerEvent, TranscriptionError> {
        Ok(RecognizerEvent::Segment(Segment::new(start, end, text)))
    }

    fn session(events: Vec<Result<RecognizerEvent, TranscriptionError>>) -> TranscriptionSession {
        let recognizer = ScriptedRecognizer::new(events);
        let config = DecodingPolicy::build(&DecodingChoices::default());
        TranscriptionSession::start(&recognizer, Path::new("clip.mp4"), &config).unwrap()
    }

    #[test]
    fn test_yields_segments_in_order() {
        let mut s = session(vec![detected("en"), seg(0.0, 1.0, "a"), seg(1.0, 2.0, "b")]);
        let texts: Vec<_> = s.by_ref().map(|r| r.unwrap().text).collect();
        assert_eq!(texts, vec!["a", "b"]);
        assert_eq!(s.detection().unwrap().language, "en");
    }

    #[test]
    fn test_detection_absent_until_seen() {
        let mut s = session(vec![seg(0.0, 1.0, "a"), detected("ko")]);
        assert!(s.detection().is_none());
        s.next().unwrap().unwrap();
        assert!(s.detection().is_none());
        assert!(s.next().is_none());
        assert_eq!(s.detection().unwrap().language, "ko");
    }

    #[test]
    fn test_wait_for_detection_returns_before_first_segment() {
        let mut s = session(vec![detected("ja"), seg(0.0, 1.0, "a")]);
        assert_eq!(s.wait_for_detection().unwrap().language, "ja");
        let texts: Vec<_> = s.map(|r| r.unwrap().text).collect();
        assert_eq!(texts, vec!["a"]);
    }

    #[test]
    fn test_wait_for_detection_stops_at_first_segment() {
        let mut s = session(vec![seg(0.0, 1.0, "a"), seg(1.0, 2.0, "b"), detected("ja")]);
        assert!(s.wait_for_detection().is_none());
        assert!(s.wait_for_detection().is_none());
        let texts: Vec<_> = s.by_ref().map(|r| r.unwrap().text).collect();
        assert_eq!(texts, vec!["a", "b"]);
        assert_eq!(s.detection().unwrap().language, "ja");
    }

    #[test]
    fn test_wait_for_detection_without_one() {
        let mut s = session(vec![seg(0.0, 1.0, "a")]);
        assert!(s.wait_for_detection().is_none());
        assert_eq!(s.next().unwrap().unwrap().text, "a");
        assert!(s.next().is_none());
    }

    #[test]
    fn test_error_is_reported_once_then_fused() {
        let mut s = session(vec![
            seg(0.0, 1.0, "a"),
            Err(TranscriptionError::Recognizer("boom".into())),
            seg(1.0, 2.0, "never"),
        ]);
        assert!(s.next().unwrap().is_ok());
        assert_eq!(
            s.next().unwrap().unwrap_err(),
            TranscriptionError::Recognizer("boom".into())
        );
        assert!(s.next().is_none());
        assert!(s.next().is_none());
    }

    #[test]
    fn test_error_during_wait_is_deferred_after_buffer() {
        let mut s = session(vec![
            seg(0.0, 1.0, "a"),
            Err(TranscriptionError::Disconnected),
        ]);
        assert!(s.wait_for_detection().is_none());
        assert!(s.next().unwrap().is_ok());
        assert_eq!(s.next().unwrap().unwrap_err(), TranscriptionError::Disconnected);
        assert!(s.next().is_none());
    }

    #[test]
    fn test_decreasing_start_is_contract_violation() {
        let mut s = session(vec![seg(2.0, 3.0, "a"), seg(1.0, 4.0, "b")]);
        assert!(s.next().unwrap().is_ok());
        assert!(matches!(
            s.next().unwrap(),
            Err(TranscriptionError::ContractViolation(_))
        ));
        assert!(s.next().is_none());
    }

    #[test]
    fn test_inverted_bounds_is_contract_violation() {
        let mut s = session(vec![seg(3.0, 2.0, "a")]);
        assert!(matches!(
            s.next().unwrap(),
            Err(TranscriptionError::ContractViolation(_))
        ));
    }

    #[test]
    fn test_equal_starts_are_allowed() {
        let s = session(vec![seg(1.0, 1.0, ""), seg(1.0, 2.0, "x")]);
        assert_eq!(s.filter(|r| r.is_ok()).count(), 2);
    }

    #[test]
    fn test_empty_stream() {
        let mut s = session(vec![]);
        assert!(s.next().is_none());
        assert!(s.detection().is_none());
    }

    #[test]
    fn test_start_failure_propagates() {
        let recognizer = ScriptedRecognizer::failing_to_start(TranscriptionError::NoAudioTrack(
            "silent.mp4".into(),
        ));
        let config = DecodingPolicy::build(&DecodingChoices::default());
        let err = TranscriptionSession::start(&recognizer, Path::new("silent.mp4"), &config)
            .err()
            .unwrap();
        assert!(matches!(err, TranscriptionError::NoAudioTrack(_)));
    }
}
