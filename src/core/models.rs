//! Core data models for the media downloader

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Audio formats yt-dlp can extract to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    M4a,
    Wav,
    Aac,
    Flac,
    Ogg,
}

impl AudioFormat {
    pub const ALL: [AudioFormat; 6] = [
        AudioFormat::Mp3,
        AudioFormat::M4a,
        AudioFormat::Wav,
        AudioFormat::Aac,
        AudioFormat::Flac,
        AudioFormat::Ogg,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::M4a => "m4a",
            Self::Wav => "wav",
            Self::Aac => "aac",
            Self::Flac => "flac",
            Self::Ogg => "ogg",
        }
    }

    /// Codec name for `--audio-format`; yt-dlp writes `.ogg` files for vorbis
    pub fn ytdlp_codec(&self) -> &'static str {
        match self {
            Self::Ogg => "vorbis",
            other => other.as_str(),
        }
    }

    /// Whether the container carries title/artist/album tags
    pub fn supports_tags(&self) -> bool {
        !matches!(self, Self::Wav)
    }

    /// Extension-based lookup used on files yt-dlp reports back
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "opus" | "oga" => Some(Self::Ogg),
            other => other.parse().ok(),
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudioFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|format| format.as_str() == wanted)
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "Unsupported audio format '{}': expected one of mp3/m4a/wav/aac/flac/ogg",
                    s.trim()
                ))
            })
    }
}

/// Video containers yt-dlp merges into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoContainer {
    #[default]
    Mp4,
    Mkv,
}

impl VideoContainer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mkv => "mkv",
        }
    }
}

impl fmt::Display for VideoContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoContainer {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp4" => Ok(Self::Mp4),
            "mkv" => Ok(Self::Mkv),
            other => Err(AppError::Validation(format!(
                "Unsupported video format '{}': expected mp4 or mkv",
                other
            ))),
        }
    }
}

/// Video quality selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoQuality {
    #[default]
    Best,
    /// Cap on the vertical resolution, e.g. 720
    MaxHeight(u32),
}

impl VideoQuality {
    /// yt-dlp format selector for this quality
    pub fn format_selector(&self) -> String {
        match self {
            Self::Best => "bestvideo+bestaudio/best".to_string(),
            Self::MaxHeight(height) => format!(
                "bestvideo[height<={h}]+bestaudio/best[height<={h}]",
                h = height
            ),
        }
    }
}

impl fmt::Display for VideoQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Best => f.write_str("best"),
            Self::MaxHeight(height) => write!(f, "{}", height),
        }
    }
}

impl FromStr for VideoQuality {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_ascii_lowercase();
        if value == "best" {
            return Ok(Self::Best);
        }

        let digits = value.strip_suffix('p').unwrap_or(&value);
        match digits.parse::<u32>() {
            Ok(height) if height > 0 => Ok(Self::MaxHeight(height)),
            _ => Err(AppError::Validation(format!(
                "Invalid video quality '{}': use 'best' or a height such as 1080, 720, 480",
                s.trim()
            ))),
        }
    }
}

impl Serialize for VideoQuality {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VideoQuality {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// What a single download produces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DownloadKind {
    /// One track, audio extracted
    Track { format: AudioFormat },
    /// Every entry of a playlist, audio extracted
    Playlist { format: AudioFormat },
    /// Video merged into a container
    Video {
        container: VideoContainer,
        quality: VideoQuality,
    },
    /// Subtitle files only
    Subtitles { languages: Vec<String> },
}

impl DownloadKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Track { .. } => "music",
            Self::Playlist { .. } => "playlist",
            Self::Video { .. } => "video",
            Self::Subtitles { .. } => "subtitles",
        }
    }

    pub fn audio_format(&self) -> Option<AudioFormat> {
        match self {
            Self::Track { format } | Self::Playlist { format } => Some(*format),
            _ => None,
        }
    }
}

/// Parameter object handed to the downloader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub url: String,
    pub kind: DownloadKind,
    pub output_dir: PathBuf,
    pub proxy: Option<String>,
    pub rate_limit: Option<String>,
    pub chunk_size: Option<String>,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, kind: DownloadKind, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            kind,
            output_dir: output_dir.into(),
            proxy: None,
            rate_limit: None,
            chunk_size: None,
        }
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy.filter(|p| !p.trim().is_empty());
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: Option<String>) -> Self {
        self.rate_limit = rate_limit.filter(|r| !r.trim().is_empty());
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: Option<String>) -> Self {
        self.chunk_size = chunk_size.filter(|c| !c.trim().is_empty());
        self
    }

    /// Same options, different URL
    pub fn for_url(&self, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..self.clone()
        }
    }
}

/// Title/artist/album written by the tagging pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
}

impl Default for TrackMetadata {
    fn default() -> Self {
        Self {
            title: "Unknown Title".to_string(),
            artist: "Unknown Artist".to_string(),
            album: "Unknown Album".to_string(),
        }
    }
}

/// Result of one finished download
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadOutcome {
    pub url: String,
    /// Absolute paths of the produced files
    pub files: Vec<PathBuf>,
    /// Absolute output directory
    pub output_dir: PathBuf,
    /// Tags of the last produced track
    pub metadata: Option<TrackMetadata>,
    pub attempts: u32,
}

impl DownloadOutcome {
    /// Path shown to the user: the single file, or the directory for many
    pub fn display_path(&self) -> &PathBuf {
        match self.files.as_slice() {
            [only] => only,
            _ => &self.output_dir,
        }
    }
}

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("{tool} not found; install it or set its path in the settings")]
    MissingTool { tool: String },

    #[error("Failed to start {tool}: {message}")]
    Spawn { tool: String, message: String },

    #[error("{tool} exited with {}", exit_summary(.code, .stderr_tail))]
    ToolFailed {
        tool: String,
        code: Option<i32>,
        stderr_tail: String,
    },

    #[error("Nothing was downloaded: {0}")]
    NoOutput(String),

    #[error("Schedule error: {0}")]
    Schedule(String),

    #[error("Download canceled by the user")]
    Cancelled,
}

impl AppError {
    /// Whether running the same command again can help
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ToolFailed { .. } | Self::Io(_))
    }
}

fn exit_summary(code: &Option<i32>, stderr_tail: &str) -> String {
    let status = match code {
        Some(code) => format!("code {}", code),
        None => "a signal".to_string(),
    };
    if stderr_tail.is_empty() {
        status
    } else {
        format!("{}: {}", status, stderr_tail)
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_format_parsing() {
        assert_eq!("MP3".parse::<AudioFormat>().unwrap(), AudioFormat::Mp3);
        assert_eq!(" flac ".parse::<AudioFormat>().unwrap(), AudioFormat::Flac);
        assert!("wma".parse::<AudioFormat>().is_err());
        assert_eq!(AudioFormat::from_extension("opus"), Some(AudioFormat::Ogg));
        assert!(!AudioFormat::Wav.supports_tags());
        assert_eq!(AudioFormat::default(), AudioFormat::Mp3);
        assert_eq!(VideoContainer::default(), VideoContainer::Mp4);
    }

    #[test]
    fn test_video_quality_parsing() {
        assert_eq!("best".parse::<VideoQuality>().unwrap(), VideoQuality::Best);
        assert_eq!(
            "720p".parse::<VideoQuality>().unwrap(),
            VideoQuality::MaxHeight(720)
        );
        assert!("0".parse::<VideoQuality>().is_err());
        assert!("hd".parse::<VideoQuality>().is_err());
    }

    #[test]
    fn test_format_selector() {
        assert_eq!(
            VideoQuality::MaxHeight(1080).format_selector(),
            "bestvideo[height<=1080]+bestaudio/best[height<=1080]"
        );
        assert_eq!(VideoQuality::Best.format_selector(), "bestvideo+bestaudio/best");
    }

    #[test]
    fn test_quality_serializes_as_string() {
        let json = serde_json::to_string(&VideoQuality::MaxHeight(480)).unwrap();
        assert_eq!(json, "\"480\"");
        let parsed: VideoQuality = serde_json::from_str("\"best\"").unwrap();
        assert_eq!(parsed, VideoQuality::Best);
    }

    #[test]
    fn test_tool_failed_message() {
        let err = AppError::ToolFailed {
            tool: "yt-dlp".to_string(),
            code: Some(1),
            stderr_tail: "ERROR: Unsupported URL".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "yt-dlp exited with code 1: ERROR: Unsupported URL"
        );
        assert!(err.is_retryable());
        assert!(!AppError::MissingTool {
            tool: "yt-dlp".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn test_display_path() {
        let outcome = DownloadOutcome {
            url: "https://example.com/a".to_string(),
            files: vec![PathBuf::from("/music/a.mp3")],
            output_dir: PathBuf::from("/music"),
            metadata: None,
            attempts: 1,
        };
        assert_eq!(outcome.display_path(), &PathBuf::from("/music/a.mp3"));
    }
}
