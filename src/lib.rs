//! Media Downloader - Core Library
//!
//! Interactive front-end for yt-dlp and ffmpeg: a numbered menu collects
//! options, the downloader turns them into a yt-dlp invocation, downloaded
//! audio gets a metadata pass through ffmpeg, and defaults live in a small
//! JSON file.

pub mod cli;
pub mod commands;
pub mod core;
pub mod utils;

// Re-export commonly used types
pub use crate::core::{
    config::AppConfig,
    downloader::{DownloaderSettings, MediaDownloader},
    models::{AppError, AppResult, AudioFormat, DownloadKind, DownloadOutcome, DownloadRequest},
    parallel::{download_parallel, BatchReport},
};

use std::path::PathBuf;

/// Application state shared by the menu and the subcommands
pub struct AppState {
    pub config: AppConfig,
    pub config_path: PathBuf,
    pub downloader: MediaDownloader,
}

impl AppState {
    /// Load the saved defaults from `config_path`, falling back to defaults
    pub fn new(config_path: PathBuf) -> Self {
        let config = AppConfig::load_or_default(&config_path);
        Self::with_config(config, config_path)
    }

    pub fn with_config(config: AppConfig, config_path: PathBuf) -> Self {
        let downloader = Self::build_downloader(&config);
        Self {
            config,
            config_path,
            downloader,
        }
    }

    /// Replace the settings and rebuild the downloader from them
    pub fn apply_config(&mut self, config: AppConfig) {
        self.downloader = Self::build_downloader(&config);
        self.config = config;
        tracing::debug!("Applied new configuration");
    }

    fn build_downloader(config: &AppConfig) -> MediaDownloader {
        MediaDownloader::from_config(config)
            .with_retry_notifier(commands::download::retry_notifier())
    }
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert_eq!(NAME, "media-downloader");
    }

    #[test]
    fn test_state_follows_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = AppState::new(dir.path().join("missing.json"));
        assert_eq!(state.config, AppConfig::default());
        assert_eq!(state.downloader.settings().retries, 3);

        state.apply_config(AppConfig {
            retries: 6,
            tag_metadata: false,
            ..AppConfig::default()
        });
        assert_eq!(state.downloader.settings().retries, 6);
        assert!(!state.downloader.settings().tag_metadata);
    }
}
