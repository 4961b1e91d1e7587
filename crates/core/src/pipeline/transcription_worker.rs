use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::Receiver;

use super::session_controller::{SessionController, SessionEvent, TranscriptionRequest};

/// Run one transcription on a background thread.
///
/// Returns the event stream and a cancellation flag. The stream ends when the
/// run reaches a terminal state; the final events are `StateChanged` with
/// that state and, for success or failure, `Completed` or `Failed`.
pub fn spawn(
    mut controller: SessionController,
    request: TranscriptionRequest,
) -> (Receiver<SessionEvent>, Arc<AtomicBool>) {
    let (tx, rx) = crossbeam_channel::unbounded::<SessionEvent>();
    let cancelled = Arc::new(AtomicBool::new(false));
    let cancelled_clone = cancelled.clone();

    let spawned = thread::Builder::new()
        .name("transcription".to_string())
        .spawn(move || {
            // Outcome and errors are already reported as events
            let _ = controller.run(request, &tx, &cancelled_clone);
        });
    if let Err(e) = spawned {
        log::error!("Failed to spawn transcription worker: {e}");
    }

    (rx, cancelled)
}
