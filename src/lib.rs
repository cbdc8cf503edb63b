pub mod backend;
pub mod config;
pub mod discover;
pub mod error;
pub mod feed;
pub mod format;
pub mod media;
pub mod stories;
pub mod telemetry;
