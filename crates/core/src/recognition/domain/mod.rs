pub mod decoding_config;
pub mod decoding_policy;
pub mod device_profile;
pub mod engine_loader;
pub mod model_size;
pub mod segment;
pub mod speech_recognizer;
