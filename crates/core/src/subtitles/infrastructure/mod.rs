pub mod file_subtitle_sink;
