pub mod progress_tracker;
pub mod session_controller;
pub mod stage_logger;
pub mod transcription_session;
pub mod transcription_worker;

#[cfg(test)]
pub(crate) mod test_support;
