//! yt-dlp invocation
//!
//! [`MediaDownloader`] runs one yt-dlp process per attempt, streams its output,
//! collects the result records printed after each file is moved into place and
//! finishes audio downloads with the metadata pass.

use std::collections::{BTreeSet, VecDeque};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::config::AppConfig;
use super::error_handling::{RetryExecutor, RetryNotifier, RetryPolicy};
use super::metadata::tag_file_or_warn;
use super::models::{AppError, AppResult, DownloadKind, DownloadOutcome, DownloadRequest};
use super::ytdlp::{
    build_args, parse_result_line, parse_subtitle_notice, InvocationOptions, ResultRecord,
    SUBTITLE_EXTENSIONS,
};
use crate::utils::file_utils::{
    absolute_path, changed_files_with_extensions, ensure_dir_exists, has_extension,
    snapshot_files, FileSnapshot,
};

/// stderr lines kept for the error message of a failed run
const STDERR_TAIL_LINES: usize = 20;

/// Tool locations and behaviour switches taken from the saved defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloaderSettings {
    pub ytdlp_path: String,
    pub ffmpeg_path: String,
    pub retries: u32,
    pub tag_metadata: bool,
}

impl Default for DownloaderSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for DownloaderSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            ytdlp_path: config.ytdlp_path.clone(),
            ffmpeg_path: config.ffmpeg_path.clone(),
            retries: config.retries,
            tag_metadata: config.tag_metadata,
        }
    }
}

/// Result records of one successful yt-dlp run
#[derive(Debug, Default)]
struct RunOutput {
    records: Vec<ResultRecord>,
    /// Subtitle paths yt-dlp announced while writing them
    subtitles: Vec<PathBuf>,
}

/// Runs downloads through yt-dlp
#[derive(Clone)]
pub struct MediaDownloader {
    settings: DownloaderSettings,
    executor: RetryExecutor,
}

impl MediaDownloader {
    pub fn new(settings: DownloaderSettings) -> Self {
        let executor = RetryExecutor::new(RetryPolicy::with_attempts(settings.retries));
        Self { settings, executor }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(DownloaderSettings::from(config))
    }

    /// Use a custom retry policy (tests use millisecond delays)
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.executor = RetryExecutor::new(policy);
        self
    }

    /// Announce retries, e.g. "Attempt 1 failed. Retrying..."
    pub fn with_retry_notifier(mut self, notifier: RetryNotifier) -> Self {
        self.executor = self.executor.with_notifier(notifier);
        self
    }

    pub fn settings(&self) -> &DownloaderSettings {
        &self.settings
    }

    /// Download `request`, echoing yt-dlp's output unless `quiet`
    pub async fn download(
        &self,
        request: &DownloadRequest,
        quiet: bool,
    ) -> AppResult<DownloadOutcome> {
        ensure_dir_exists(&request.output_dir)?;
        let output_dir = absolute_path(&request.output_dir);

        let options = InvocationOptions {
            quiet,
            ..InvocationOptions::default()
        }
        .with_ffmpeg(&self.settings.ffmpeg_path);

        let subtitles = matches!(request.kind, DownloadKind::Subtitles { .. });
        let before = if subtitles {
            snapshot_files(&output_dir)
        } else {
            FileSnapshot::new()
        };

        info!(
            "⬇️ Starting {} download: {} -> {}",
            request.kind.label(),
            request.url,
            output_dir.display()
        );

        let this = self;
        let options = &options;
        let (run, attempts) = self
            .executor
            .execute(move |_ctx| this.run_once(request, options))
            .await?;

        let files: Vec<PathBuf> = if subtitles {
            subtitle_files(&output_dir, &before, &run.subtitles)
        } else {
            run.records
                .iter()
                .filter_map(|record| record.filepath.as_deref())
                .map(absolute_path)
                .collect()
        };

        if subtitles && files.is_empty() {
            return Err(AppError::NoOutput(format!(
                "no subtitles available for {}",
                request.url
            )));
        }
        if files.is_empty() {
            warn!("yt-dlp finished without reporting any file for {}", request.url);
        }

        let mut metadata = None;
        if request.kind.audio_format().is_some() {
            for record in &run.records {
                let tags = record.metadata();
                if self.settings.tag_metadata {
                    if let Some(path) = record.filepath.as_deref() {
                        tag_file_or_warn(&self.settings.ffmpeg_path, path, &tags).await;
                    }
                }
                metadata = Some(tags);
            }
        }

        info!(
            "✅ {} download finished after {} attempt(s): {} file(s)",
            request.kind.label(),
            attempts,
            files.len()
        );

        Ok(DownloadOutcome {
            url: request.url.clone(),
            files,
            output_dir,
            metadata,
            attempts,
        })
    }

    /// One yt-dlp process, start to exit
    async fn run_once(
        &self,
        request: &DownloadRequest,
        options: &InvocationOptions,
    ) -> AppResult<RunOutput> {
        let tool = self.settings.ytdlp_path.as_str();
        let args = build_args(request, options);
        debug!("Running {} {}", tool, args.join(" "));

        let mut child = Command::new(tool)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(tool, e))?;

        let stdout = child.stdout.take().ok_or_else(|| AppError::Spawn {
            tool: tool.to_string(),
            message: "stdout was not captured".to_string(),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| AppError::Spawn {
            tool: tool.to_string(),
            message: "stderr was not captured".to_string(),
        })?;

        let echo = !options.quiet;
        let stderr_task = tokio::spawn(async move {
            let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if echo {
                    eprintln!("{}", line);
                }
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            tail
        });

        let mut output = RunOutput::default();
        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            if let Some(record) = parse_result_line(&line) {
                output.records.push(record);
                continue;
            }
            if let Some(path) = parse_subtitle_notice(&line) {
                output.subtitles.push(path);
            }
            if echo {
                println!("{}", line);
            }
        }

        let status = child.wait().await?;
        let tail = stderr_task.await.unwrap_or_default();

        if !status.success() {
            return Err(AppError::ToolFailed {
                tool: tool.to_string(),
                code: status.code(),
                stderr_tail: summarize_stderr(&tail),
            });
        }

        Ok(output)
    }
}

/// Subtitle files a run produced
///
/// Files created or rewritten in `dir` count, as do the ones yt-dlp announced.
/// An announced `.vtt` that `--convert-subs` replaced resolves to its `.srt`.
fn subtitle_files(dir: &Path, before: &FileSnapshot, announced: &[PathBuf]) -> Vec<PathBuf> {
    let mut files: BTreeSet<PathBuf> =
        changed_files_with_extensions(dir, before, &SUBTITLE_EXTENSIONS)
            .into_iter()
            .collect();

    for path in announced {
        let path = if path.is_absolute() {
            path.clone()
        } else {
            dir.join(path)
        };
        let converted = path.with_extension("srt");
        for candidate in [path, converted] {
            if candidate.is_file() && has_extension(&candidate, &SUBTITLE_EXTENSIONS) {
                files.insert(absolute_path(&candidate));
            }
        }
    }

    files.into_iter().collect()
}

fn spawn_error(tool: &str, error: std::io::Error) -> AppError {
    match error.kind() {
        std::io::ErrorKind::NotFound => AppError::MissingTool {
            tool: tool.to_string(),
        },
        _ => AppError::Spawn {
            tool: tool.to_string(),
            message: error.to_string(),
        },
    }
}

/// `ERROR:` lines if yt-dlp printed any, otherwise the last line
fn summarize_stderr(tail: &VecDeque<String>) -> String {
    let errors: Vec<&str> = tail
        .iter()
        .map(|line| line.trim())
        .filter(|line| line.starts_with("ERROR:"))
        .collect();

    if errors.is_empty() {
        tail.iter()
            .rev()
            .map(|line| line.trim())
            .find(|line| !line.is_empty())
            .unwrap_or_default()
            .to_string()
    } else {
        errors.join("; ")
    }
}
