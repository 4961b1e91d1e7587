pub mod domain;
pub mod engine_cache;
pub mod infrastructure;
