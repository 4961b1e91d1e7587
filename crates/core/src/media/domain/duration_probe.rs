use std::path::Path;

use super::media_duration::MediaDuration;

/// Domain interface for measuring how long a media file plays.
///
/// Probing is best-effort: implementations never fail, they return
/// [`MediaDuration::UNKNOWN`] and the run continues with indeterminate progress.
pub trait DurationProbe: Send {
    fn probe(&self, path: &Path) -> MediaDuration;
}
