//! yt-dlp command line construction
//!
//! Turns a [`DownloadRequest`] into the argument vector for one yt-dlp run and
//! parses the result records that run prints back. Nothing here spawns a
//! process, so every option mapping is testable in isolation.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::models::{DownloadKind, DownloadRequest, TrackMetadata};

/// Prefix of the lines yt-dlp prints for every finished file
pub const RESULT_MARKER: &str = "MDL-RESULT ";

/// Audio bitrate requested from the extract-audio post-processor
pub const AUDIO_QUALITY: &str = "320K";

/// Subtitle extensions recognised after a subtitle run
pub const SUBTITLE_EXTENSIONS: [&str; 5] = ["srt", "vtt", "ass", "ttml", "lrc"];

/// yt-dlp's notice for every subtitle file it writes
const SUBTITLE_NOTICE: &str = "Writing video subtitles to: ";

/// Per-invocation switches that are not part of the request itself
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationOptions {
    /// Suppress yt-dlp's own progress output (parallel workers)
    pub quiet: bool,
    /// Passed as `--ffmpeg-location` when ffmpeg is not on PATH
    pub ffmpeg_location: Option<String>,
}

impl InvocationOptions {
    pub fn interactive() -> Self {
        Self::default()
    }

    pub fn quiet() -> Self {
        Self {
            quiet: true,
            ..Self::default()
        }
    }

    pub fn with_ffmpeg(mut self, ffmpeg_path: &str) -> Self {
        self.ffmpeg_location = match ffmpeg_path.trim() {
            "" | "ffmpeg" => None,
            custom => Some(custom.to_string()),
        };
        self
    }
}

/// Output file name template for a download kind
pub fn output_template(output_dir: &Path, kind: &DownloadKind) -> String {
    let name = match kind {
        DownloadKind::Playlist { .. } => "%(playlist_index)s - %(title)s.%(ext)s",
        _ => "%(title)s.%(ext)s",
    };
    output_dir.join(name).to_string_lossy().into_owned()
}

/// Build the full yt-dlp argument list for `request`
pub fn build_args(request: &DownloadRequest, options: &InvocationOptions) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();

    match &request.kind {
        DownloadKind::Track { format } | DownloadKind::Playlist { format } => {
            args.extend(
                [
                    "-f",
                    "bestaudio/best",
                    "-x",
                    "--audio-format",
                    format.ytdlp_codec(),
                    "--audio-quality",
                    AUDIO_QUALITY,
                ]
                .map(String::from),
            );
            let playlist_flag = if matches!(request.kind, DownloadKind::Playlist { .. }) {
                "--yes-playlist"
            } else {
                "--no-playlist"
            };
            args.push(playlist_flag.to_string());
        }
        DownloadKind::Video { container, quality } => {
            args.push("-f".to_string());
            args.push(quality.format_selector());
            args.push("--merge-output-format".to_string());
            args.push(container.as_str().to_string());
            args.push("--no-playlist".to_string());
        }
        DownloadKind::Subtitles { languages } => {
            args.extend(
                [
                    "--skip-download",
                    "--write-subs",
                    "--write-auto-subs",
                    "--sub-format",
                    "srt/best",
                    "--convert-subs",
                    "srt",
                    "--force-overwrites",
                    "--no-playlist",
                ]
                .map(String::from),
            );
            if !languages.is_empty() {
                args.push("--sub-langs".to_string());
                args.push(languages.join(","));
            }
        }
    }

    args.push("-o".to_string());
    args.push(output_template(&request.output_dir, &request.kind));

    if let Some(proxy) = &request.proxy {
        args.push("--proxy".to_string());
        args.push(proxy.clone());
    }
    if let Some(rate_limit) = &request.rate_limit {
        args.push("--limit-rate".to_string());
        args.push(rate_limit.clone());
    }
    if let Some(chunk_size) = &request.chunk_size {
        args.push("--http-chunk-size".to_string());
        args.push(chunk_size.clone());
    }
    if let Some(ffmpeg) = &options.ffmpeg_location {
        args.push("--ffmpeg-location".to_string());
        args.push(ffmpeg.clone());
    }

    if !matches!(request.kind, DownloadKind::Subtitles { .. }) {
        // --print implies --quiet, so progress has to be asked for explicitly
        args.push("--print".to_string());
        args.push(format!(
            "after_move:{}%(.{{filepath,title,artist,album,uploader}})j",
            RESULT_MARKER
        ));
    }

    if options.quiet {
        args.push("--quiet".to_string());
        args.push("--no-warnings".to_string());
    } else {
        args.push("--newline".to_string());
        args.push("--progress".to_string());
    }

    args.push("--".to_string());
    args.push(request.url.clone());
    args
}

/// One finished file as reported by yt-dlp
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ResultRecord {
    #[serde(default)]
    pub filepath: Option<PathBuf>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
}

impl ResultRecord {
    /// Tags for this file, the uploader standing in for a missing artist
    pub fn metadata(&self) -> TrackMetadata {
        let defaults = TrackMetadata::default();
        let pick = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty() && *v != "NA")
                .map(str::to_string)
        };

        TrackMetadata {
            title: pick(&self.title).unwrap_or(defaults.title),
            artist: pick(&self.artist)
                .or_else(|| pick(&self.uploader))
                .unwrap_or(defaults.artist),
            album: pick(&self.album).unwrap_or(defaults.album),
        }
    }
}

/// Subtitle path announced on a stdout line
///
/// The announced file may be a `.vtt` that `--convert-subs` replaces, so the
/// caller resolves it against the directory afterwards.
pub fn parse_subtitle_notice(line: &str) -> Option<PathBuf> {
    let (_, path) = line.trim_end().split_once(SUBTITLE_NOTICE)?;
    let path = path.trim();
    (!path.is_empty()).then(|| PathBuf::from(path))
}

/// Parse a stdout line, returning `None` for ordinary output
pub fn parse_result_line(line: &str) -> Option<ResultRecord> {
    let payload = line.trim_end().strip_prefix(RESULT_MARKER)?;
    match serde_json::from_str(payload) {
        Ok(record) => Some(record),
        Err(err) => {
            tracing::warn!("Unreadable yt-dlp result line ({}): {}", err, payload);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{AudioFormat, VideoContainer, VideoQuality};

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn test_track_args() {
        let request = DownloadRequest::new(
            "https://youtu.be/dQw4w9WgXcQ",
            DownloadKind::Track {
                format: AudioFormat::Flac,
            },
            "/music",
        )
        .with_proxy(Some("socks5://127.0.0.1:1080".to_string()));

        let args = build_args(&request, &InvocationOptions::interactive());

        assert_eq!(value_after(&args, "-f"), Some("bestaudio/best"));
        assert!(args.contains(&"-x".to_string()));
        assert_eq!(value_after(&args, "--audio-format"), Some("flac"));
        assert_eq!(value_after(&args, "--audio-quality"), Some("320K"));
        assert_eq!(value_after(&args, "-o"), Some("/music/%(title)s.%(ext)s"));
        assert_eq!(value_after(&args, "--proxy"), Some("socks5://127.0.0.1:1080"));
        assert!(args.contains(&"--no-playlist".to_string()));
        assert!(args.contains(&"--progress".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("https://youtu.be/dQw4w9WgXcQ"));
        assert_eq!(args[args.len() - 2], "--");

        let ogg = DownloadRequest::new(
            "https://youtu.be/dQw4w9WgXcQ",
            DownloadKind::Track {
                format: AudioFormat::Ogg,
            },
            "/music",
        );
        let args = build_args(&ogg, &InvocationOptions::interactive());
        assert_eq!(value_after(&args, "--audio-format"), Some("vorbis"));
    }

    #[test]
    fn test_playlist_template() {
        let request = DownloadRequest::new(
            "https://www.youtube.com/playlist?list=PL123",
            DownloadKind::Playlist {
                format: AudioFormat::Mp3,
            },
            "/music",
        );
        let args = build_args(&request, &InvocationOptions::interactive());

        assert!(args.contains(&"--yes-playlist".to_string()));
        assert_eq!(
            value_after(&args, "-o"),
            Some("/music/%(playlist_index)s - %(title)s.%(ext)s")
        );
    }

    #[test]
    fn test_video_args() {
        let request = DownloadRequest::new(
            "https://vimeo.com/1",
            DownloadKind::Video {
                container: VideoContainer::Mkv,
                quality: VideoQuality::MaxHeight(720),
            },
            "out",
        )
        .with_rate_limit(Some("2M".to_string()))
        .with_chunk_size(Some("10M".to_string()));

        let args = build_args(&request, &InvocationOptions::quiet().with_ffmpeg("/opt/ffmpeg"));

        assert_eq!(
            value_after(&args, "-f"),
            Some("bestvideo[height<=720]+bestaudio/best[height<=720]")
        );
        assert_eq!(value_after(&args, "--merge-output-format"), Some("mkv"));
        assert_eq!(value_after(&args, "--limit-rate"), Some("2M"));
        assert_eq!(value_after(&args, "--http-chunk-size"), Some("10M"));
        assert_eq!(value_after(&args, "--ffmpeg-location"), Some("/opt/ffmpeg"));
        assert!(args.contains(&"--quiet".to_string()));
        assert!(!args.contains(&"--progress".to_string()));
        assert!(!args.contains(&"-x".to_string()));
    }

    #[test]
    fn test_subtitle_args() {
        let request = DownloadRequest::new(
            "https://youtu.be/x",
            DownloadKind::Subtitles {
                languages: vec!["en".to_string(), "de".to_string()],
            },
            ".",
        );
        let args = build_args(&request, &InvocationOptions::interactive());

        assert!(args.contains(&"--skip-download".to_string()));
        assert!(args.contains(&"--write-auto-subs".to_string()));
        assert_eq!(value_after(&args, "--convert-subs"), Some("srt"));
        assert_eq!(value_after(&args, "--sub-langs"), Some("en,de"));
        assert!(args.contains(&"--force-overwrites".to_string()));
        assert!(!args.contains(&"--print".to_string()));
    }

    #[test]
    fn test_parse_subtitle_notice() {
        assert_eq!(
            parse_subtitle_notice("[info] Writing video subtitles to: /subs/Talk.en.vtt"),
            Some(PathBuf::from("/subs/Talk.en.vtt"))
        );
        assert_eq!(parse_subtitle_notice("[info] Video subtitle en.srt is already present"), None);
        assert_eq!(parse_subtitle_notice("[info] Writing video subtitles to: "), None);
    }

    #[test]
    fn test_default_ffmpeg_not_passed() {
        assert_eq!(InvocationOptions::interactive().with_ffmpeg("ffmpeg").ffmpeg_location, None);
    }

    #[test]
    fn test_parse_result_line() {
        let line = r#"MDL-RESULT {"filepath": "/music/Song.mp3", "title": "Song", "artist": null, "uploader": "Band"}"#;
        let record = parse_result_line(line).unwrap();
        assert_eq!(record.filepath, Some(PathBuf::from("/music/Song.mp3")));

        let meta = record.metadata();
        assert_eq!(meta.title, "Song");
        assert_eq!(meta.artist, "Band");
        assert_eq!(meta.album, "Unknown Album");

        assert!(parse_result_line("[download] 42.0% of 3.2MiB").is_none());
        assert!(parse_result_line("MDL-RESULT {broken").is_none());
    }
}
