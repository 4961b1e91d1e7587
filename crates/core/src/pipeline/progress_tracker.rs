use crate::media::domain::media_duration::MediaDuration;

/// Progress as shown to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressSnapshot {
    Percent(u8),
    /// Total duration unknown; show activity without a percentage.
    Indeterminate,
}

/// Maps segment end times onto a percentage of the probed duration.
///
/// Reported percentages never decrease within a run, even if a later segment
/// ends before an earlier one.
#[derive(Debug)]
pub struct ProgressTracker {
    total: MediaDuration,
    best: u8,
}

impl ProgressTracker {
    pub fn new(total: MediaDuration) -> Self {
        Self { total, best: 0 }
    }

    pub fn update(&mut self, segment_end: f64) -> ProgressSnapshot {
        if !self.total.is_known() {
            return ProgressSnapshot::Indeterminate;
        }
        let ratio = segment_end / self.total.as_secs() * 100.0;
        let percent = if ratio.is_finite() {
            ratio.floor().clamp(0.0, 100.0) as u8
        } else {
            0
        };
        self.best = self.best.max(percent);
        ProgressSnapshot::Percent(self.best)
    }

    /// A finished run is always at 100%.
    pub fn complete(&mut self) -> ProgressSnapshot {
        self.best = 100;
        ProgressSnapshot::Percent(100)
    }
}
