//! Core business logic module
//!
//! Domain models, saved defaults, the yt-dlp invocation with its retry
//! handling, the metadata pass, parallel and scheduled downloads, and the
//! external tool checks.

pub mod config;
pub mod dependencies;
pub mod downloader;
pub mod error_handling;
pub mod metadata;
pub mod models;
pub mod parallel;
pub mod schedule;
pub mod ytdlp;


// Re-export commonly used types
pub use config::AppConfig;
pub use downloader::MediaDownloader;
