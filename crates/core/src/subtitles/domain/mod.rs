pub mod subtitle_sink;
pub mod subtitle_writer;
