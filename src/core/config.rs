//! Saved defaults (`config.json`)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::models::{AudioFormat, VideoContainer, VideoQuality};
use crate::utils::validation::{validate_byte_size, validate_proxy};

/// File name used when no `--config` path is given
pub const CONFIG_FILE: &str = "config.json";

/// Upper bound on attempts per download
pub const MAX_RETRIES: u32 = 10;

/// Upper bound on concurrent yt-dlp workers
pub const MAX_PARALLEL_WORKERS: usize = 20;

/// Saved defaults, stored as one flat JSON object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub output_dir: PathBuf,
    pub output_format: AudioFormat,
    pub proxy: Option<String>,
    pub quality: VideoQuality,
    pub video_format: VideoContainer,
    pub retries: u32,
    pub parallel_workers: usize,
    /// yt-dlp `--limit-rate` value
    pub rate_limit: Option<String>,
    /// yt-dlp `--http-chunk-size` value
    pub chunk_size: Option<String>,
    pub subtitle_languages: Vec<String>,
    pub tag_metadata: bool,
    pub ytdlp_path: String,
    pub ffmpeg_path: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            output_format: AudioFormat::Mp3,
            proxy: None,
            quality: VideoQuality::Best,
            video_format: VideoContainer::Mp4,
            retries: 3,
            parallel_workers: 5,
            rate_limit: None,
            chunk_size: None,
            subtitle_languages: vec!["en".to_string()],
            tag_metadata: true,
            ytdlp_path: "yt-dlp".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
        }
    }
}

impl AppConfig {
    /// Path of `config.json` in the working directory
    pub fn default_path() -> PathBuf {
        PathBuf::from(CONFIG_FILE)
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: AppConfig =
            serde_json::from_str(&content).with_context(|| "Failed to parse config file")?;

        config
            .validate()
            .with_context(|| format!("Invalid configuration in {:?}", path))?;

        tracing::info!("Loaded configuration from: {:?}", path);
        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is missing or broken
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!("No configuration at {:?}, using defaults", path);
            return Self::default();
        }

        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("{:#}. Using defaults", err);
                Self::default()
            }
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()
            .with_context(|| "Refusing to save invalid configuration")?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = self.export()?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        tracing::info!("Saved configuration to: {:?}", path);
        Ok(())
    }

    /// Reset configuration to defaults
    pub fn reset(path: &Path) -> Result<Self> {
        let config = Self::default();
        config.save(path)?;
        tracing::info!("Reset configuration to defaults");
        Ok(config)
    }

    /// Pretty-printed JSON, as written to disk
    pub fn export(&self) -> Result<String> {
        serde_json::to_string_pretty(self).with_context(|| "Failed to export configuration")
    }

    pub fn import(json: &str) -> Result<Self> {
        let config: AppConfig =
            serde_json::from_str(json).with_context(|| "Failed to parse imported configuration")?;

        config
            .validate()
            .with_context(|| "Imported configuration is invalid")?;

        Ok(config)
    }

    /// Proxy handed to yt-dlp, ignoring blank values
    pub fn effective_proxy(&self) -> Option<String> {
        self.proxy
            .as_ref()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
    }

    /// Reject values yt-dlp would choke on
    pub fn validate(&self) -> Result<()> {
        if self.output_dir.as_os_str().is_empty() {
            anyhow::bail!("Output directory must not be empty");
        }

        if self.retries == 0 || self.retries > MAX_RETRIES {
            anyhow::bail!("Retries should be between 1 and {}", MAX_RETRIES);
        }

        if self.parallel_workers == 0 || self.parallel_workers > MAX_PARALLEL_WORKERS {
            anyhow::bail!(
                "Parallel workers should be between 1 and {}",
                MAX_PARALLEL_WORKERS
            );
        }

        if let Some(proxy) = self.effective_proxy() {
            validate_proxy(&proxy)?;
        }

        if let Some(ref rate_limit) = self.rate_limit {
            validate_byte_size("rate limit", rate_limit)?;
        }

        if let Some(ref chunk_size) = self.chunk_size {
            validate_byte_size("chunk size", chunk_size)?;
        }

        if self.subtitle_languages.iter().any(|lang| lang.trim().is_empty()) {
            anyhow::bail!("Subtitle languages must not contain blank entries");
        }

        if self.ytdlp_path.trim().is_empty() || self.ffmpeg_path.trim().is_empty() {
            anyhow::bail!("Tool paths must not be empty");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.parallel_workers, 5);
        assert_eq!(config.retries, 3);
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let json = config.export().unwrap();
        let parsed_config = AppConfig::import(&json).unwrap();
        assert_eq!(config, parsed_config);
    }

    #[test]
    fn test_minimal_file_takes_defaults() {
        let json = r#"{"output_dir": "/music", "output_format": "flac", "proxy": null, "quality": "720"}"#;
        let config = AppConfig::import(json).unwrap();

        assert_eq!(config.output_dir, PathBuf::from("/music"));
        assert_eq!(config.output_format, AudioFormat::Flac);
        assert_eq!(config.quality, VideoQuality::MaxHeight(720));
        assert_eq!(config.video_format, VideoContainer::Mp4);
        assert!(config.tag_metadata);
    }

    #[test]
    fn test_invalid_config_validation() {
        let mut config = AppConfig::default();
        config.retries = 0;
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.parallel_workers = 50;
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.proxy = Some("ftp://host:21".to_string());
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.rate_limit = Some("fast".to_string());
        assert!(config.validate().is_err());

        assert!(AppConfig::import(r#"{"output_format": "wma"}"#).is_err());
        assert!(AppConfig::import(r#"{"quality": "ultra"}"#).is_err());
    }

    #[test]
    fn test_blank_proxy_is_ignored() {
        let mut config = AppConfig::default();
        config.proxy = Some("   ".to_string());
        assert!(config.validate().is_ok());
        assert_eq!(config.effective_proxy(), None);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let mut config = AppConfig::default();
        config.output_format = AudioFormat::Ogg;
        config.proxy = Some("socks5://127.0.0.1:1080".to_string());
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_or_default_on_broken_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        assert_eq!(AppConfig::load_or_default(&path), AppConfig::default());
        assert!(!path.exists());

        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(AppConfig::load_or_default(&path), AppConfig::default());
    }

    #[test]
    fn test_reset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{"output_format": "wav"}"#).unwrap();

        let config = AppConfig::reset(&path).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(AppConfig::load(&path).unwrap(), AppConfig::default());
    }
}
