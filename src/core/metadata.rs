//! Metadata tagging pass over downloaded audio
//!
//! ffmpeg rewrites the container with title/artist/album set and the result
//! replaces the original file. Streams are copied, never re-encoded.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::models::{AppError, AppResult, AudioFormat, TrackMetadata};
use crate::utils::file_utils::get_file_extension;

/// Sibling path ffmpeg writes to before the rename
fn staging_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!(".{}.tagging.{}", stem, ext.to_string_lossy()),
        None => format!(".{}.tagging", stem),
    };
    path.with_file_name(name)
}

/// ffmpeg arguments that copy `input` to `output` with new tags
pub fn ffmpeg_tag_args(input: &Path, output: &Path, metadata: &TrackMetadata) -> Vec<String> {
    let mut args: Vec<String> = ["-hide_banner", "-loglevel", "error", "-y", "-i"]
        .map(String::from)
        .to_vec();
    args.push(input.to_string_lossy().into_owned());
    args.extend(["-map", "0", "-c", "copy"].map(String::from));
    for (key, value) in [
        ("title", &metadata.title),
        ("artist", &metadata.artist),
        ("album", &metadata.album),
    ] {
        args.push("-metadata".to_string());
        args.push(format!("{}={}", key, value));
    }
    args.push(output.to_string_lossy().into_owned());
    args
}

/// Whether the tagging pass applies to `path`
pub fn is_taggable(path: &Path) -> bool {
    get_file_extension(path)
        .and_then(|ext| AudioFormat::from_extension(&ext))
        .map(|format| format.supports_tags())
        .unwrap_or(false)
}

/// Write `metadata` into the file at `path`
pub async fn tag_file(ffmpeg: &str, path: &Path, metadata: &TrackMetadata) -> AppResult<()> {
    if !is_taggable(path) {
        debug!("Skipping metadata for {}", path.display());
        return Ok(());
    }

    let staging = staging_path(path);
    let output = Command::new(ffmpeg)
        .args(ffmpeg_tag_args(path, &staging, metadata))
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AppError::MissingTool {
                tool: ffmpeg.to_string(),
            },
            _ => AppError::Spawn {
                tool: ffmpeg.to_string(),
                message: e.to_string(),
            },
        })?;

    if !output.status.success() {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(AppError::ToolFailed {
            tool: ffmpeg.to_string(),
            code: output.status.code(),
            stderr_tail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    tokio::fs::rename(&staging, path).await?;
    info!(
        "🏷️ Tagged {} ({} / {} / {})",
        path.display(),
        metadata.title,
        metadata.artist,
        metadata.album
    );
    Ok(())
}

/// Tag the file, reporting failures instead of returning them
pub async fn tag_file_or_warn(ffmpeg: &str, path: &Path, metadata: &TrackMetadata) -> bool {
    match tag_file(ffmpeg, path, metadata).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Error setting metadata on {}: {}", path.display(), e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_args() {
        let meta = TrackMetadata {
            title: "Song".to_string(),
            artist: "Band".to_string(),
            album: "Record".to_string(),
        };
        let args = ffmpeg_tag_args(
            Path::new("/m/Song.mp3"),
            Path::new("/m/.Song.tagging.mp3"),
            &meta,
        );

        assert_eq!(args[args.len() - 1], "/m/.Song.tagging.mp3");
        assert!(args.windows(2).any(|w| w == ["-i", "/m/Song.mp3"]));
        assert!(args.windows(2).any(|w| w == ["-c", "copy"]));
        assert!(args.windows(2).any(|w| w == ["-metadata", "artist=Band"]));
        assert!(args.windows(2).any(|w| w == ["-metadata", "album=Record"]));
    }

    #[test]
    fn test_staging_path_keeps_extension() {
        assert_eq!(
            staging_path(Path::new("/m/Song.flac")),
            PathBuf::from("/m/.Song.tagging.flac")
        );
    }

    #[test]
    fn test_taggable_formats() {
        assert!(is_taggable(Path::new("a.mp3")));
        assert!(is_taggable(Path::new("a.OPUS")));
        assert!(!is_taggable(Path::new("a.wav")));
        assert!(!is_taggable(Path::new("a.webm")));
        assert!(!is_taggable(Path::new("noext")));
    }

    #[tokio::test]
    async fn test_missing_ffmpeg_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Song.mp3");
        std::fs::write(&file, b"ID3").unwrap();

        let result = tag_file(
            "/nonexistent/ffmpeg-for-tests",
            &file,
            &TrackMetadata::default(),
        )
        .await;
        assert!(matches!(result, Err(AppError::MissingTool { .. })));
        assert!(file.exists());
    }
}
