//! Parallel track downloads
//!
//! Each URL gets its own yt-dlp process. A semaphore caps how many run at
//! once; the processes share nothing, and every result is collected on its
//! own so one failure never stops the rest.

use futures::future::join_all;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use super::downloader::MediaDownloader;
use super::models::{AppError, DownloadOutcome, DownloadRequest};

/// Worker cap used when none is configured
pub const DEFAULT_WORKERS: usize = 5;

/// Result for a single URL of a batch
#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    pub url: String,
    pub result: Result<DownloadOutcome, String>,
}

/// Results of a parallel batch, in input order
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|item| item.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.succeeded()
    }

    pub fn is_complete_success(&self) -> bool {
        !self.items.is_empty() && self.failed() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items.iter().filter_map(|item| match &item.result {
            Ok(_) => None,
            Err(error) => Some((item.url.as_str(), error.as_str())),
        })
    }
}

/// Trim, drop blanks and collapse repeated URLs, keeping first-seen order
pub fn dedupe_urls<I, S>(urls: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    urls.into_iter()
        .map(|url| url.as_ref().trim().to_string())
        .filter(|url| !url.is_empty())
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {prefix:.bold} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Download every URL with `template`'s options, at most `workers` at a time
pub async fn download_parallel(
    downloader: &MediaDownloader,
    template: &DownloadRequest,
    urls: &[String],
    workers: usize,
    show_progress: bool,
) -> BatchReport {
    let urls = dedupe_urls(urls);
    let workers = workers.max(1);
    let semaphore = Arc::new(Semaphore::new(workers));

    let multi = if show_progress {
        MultiProgress::new()
    } else {
        MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
    };

    info!("🚀 Starting {} parallel downloads with {} workers", urls.len(), workers);

    let tasks = urls.iter().enumerate().map(|(index, url)| {
        let semaphore = Arc::clone(&semaphore);
        let request = template.for_url(url.clone());
        let bar = multi.add(ProgressBar::new_spinner());
        bar.set_style(spinner_style());
        bar.set_prefix(format!("[{}/{}]", index + 1, urls.len()));
        bar.set_message(format!("waiting  {}", url));

        async move {
            let result = match semaphore.acquire_owned().await {
                Ok(_permit) => {
                    bar.enable_steady_tick(Duration::from_millis(120));
                    bar.set_message(format!("downloading  {}", request.url));
                    downloader.download(&request, true).await
                }
                Err(_) => Err(AppError::Cancelled),
            };

            match &result {
                Ok(outcome) => bar.finish_with_message(format!(
                    "done  {}",
                    outcome.display_path().display()
                )),
                Err(error) => {
                    warn!("Parallel download failed for {}: {}", request.url, error);
                    bar.abandon_with_message(format!("failed  {}: {}", request.url, error));
                }
            }

            BatchItem {
                url: request.url.clone(),
                result: result.map_err(|e| e.to_string()),
            }
        }
    });

    let items = join_all(tasks).await;
    let report = BatchReport { items };
    info!(
        "Parallel batch finished: {} succeeded, {} failed",
        report.succeeded(),
        report.failed()
    );
    report
}
