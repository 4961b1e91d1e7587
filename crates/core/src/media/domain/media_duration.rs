/// Total length of a media file in seconds.
///
/// Zero means "unknown": the probe failed or found nothing, and percentage
/// progress is unavailable for the run.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct MediaDuration(f64);

impl MediaDuration {
    pub const UNKNOWN: MediaDuration = MediaDuration(0.0);

    /// Negative and non-finite inputs collapse to [`MediaDuration::UNKNOWN`].
    pub fn from_secs(secs: f64) -> Self {
        if secs.is_finite() && secs > 0.0 {
            Self(secs)
        } else {
            Self::UNKNOWN
        }
    }

    pub fn as_secs(&self) -> f64 {
        self.0
    }

    pub fn is_known(&self) -> bool {
        self.0 > 0.0
    }
}

impl std::fmt::Display for MediaDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_known() {
            write!(f, "{:.2}s", self.0)
        } else {
            write!(f, "unknown")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_from_secs_keeps_positive_value() {
        let d = MediaDuration::from_secs(3723.45);
        assert_eq!(d.as_secs(), 3723.45);
        assert!(d.is_known());
    }

    #[rstest]
    #[case::zero(0.0)]
    #[case::negative(-1.5)]
    #[case::nan(f64::NAN)]
    #[case::infinite(f64::INFINITY)]
    fn test_from_secs_invalid_is_unknown(#[case] secs: f64) {
        let d = MediaDuration::from_secs(secs);
        assert_eq!(d, MediaDuration::UNKNOWN);
        assert!(!d.is_known());
    }

    #[test]
    fn test_display() {
        assert_eq!(MediaDuration::from_secs(12.5).to_string(), "12.50s");
        assert_eq!(MediaDuration::UNKNOWN.to_string(), "unknown");
    }
}
