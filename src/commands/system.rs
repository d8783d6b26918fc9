//! System commands
//!
//! Startup requirement check with an install offer, and the `check`
//! subcommand.

use std::io::{self, BufRead, Write};
use tracing::{error, info, warn};

use crate::cli::prompt::{PromptResult, Prompter};
use crate::core::config::AppConfig;
use crate::core::dependencies::{
    check_requirements, install_ffmpeg, install_ytdlp, RequirementReport, ToolStatus,
    FFMPEG_DOWNLOAD_URL,
};
use crate::utils::logging::{local_logging_enabled, resolve_log_dir};

fn describe(status: &ToolStatus) -> String {
    match status {
        ToolStatus::Available { version } => format!("found ({})", version),
        ToolStatus::Missing => "not found".to_string(),
        ToolStatus::Broken { message } => format!("not working: {}", message),
    }
}

/// One line per tool
pub fn render_report(
    out: &mut impl Write,
    config: &AppConfig,
    report: &RequirementReport,
) -> io::Result<()> {
    writeln!(out, "yt-dlp ({}): {}", config.ytdlp_path, describe(&report.ytdlp))?;
    writeln!(out, "ffmpeg ({}): {}", config.ffmpeg_path, describe(&report.ffmpeg))
}

async fn install_missing(report: &RequirementReport, ytdlp: bool, ffmpeg: bool) -> Vec<String> {
    let mut problems = Vec::new();

    if ffmpeg && !report.ffmpeg.is_available() {
        if let Err(e) = install_ffmpeg().await {
            problems.push(format!("Error installing ffmpeg: {}", e));
        }
    }
    if ytdlp && !report.ytdlp.is_available() {
        if let Err(e) = install_ytdlp().await {
            problems.push(format!("Error installing yt-dlp: {}", e));
        }
    }

    problems
}

fn warn_missing(out: &mut impl Write, report: &RequirementReport) -> io::Result<()> {
    if !report.ytdlp.is_available() {
        writeln!(
            out,
            "Warning: yt-dlp is unavailable. Downloads will fail until it is installed \
             or its path is set in Settings."
        )?;
    }
    if !report.ffmpeg.is_available() {
        writeln!(
            out,
            "Warning: ffmpeg is unavailable. Audio conversion and tagging need it: {}",
            FFMPEG_DOWNLOAD_URL
        )?;
    }
    Ok(())
}

/// Check both tools on startup and offer to install what is missing
///
/// The menu starts either way so paths can still be fixed in Settings.
pub async fn ensure_requirements<R: BufRead, W: Write>(
    config: &AppConfig,
    p: &mut Prompter<R, W>,
) -> PromptResult<RequirementReport> {
    let report = check_requirements(&config.ytdlp_path, &config.ffmpeg_path).await;
    if report.all_available() {
        info!("✅ yt-dlp and ffmpeg are available");
        return Ok(report);
    }

    render_report(p.output(), config, &report)?;

    let install_ffmpeg = !report.ffmpeg.is_available()
        && p.confirm("ffmpeg is required. Install it now? [Y/n]: ", true)?;
    let install_ytdlp = !report.ytdlp.is_available()
        && p.confirm("yt-dlp is required. Install it with pip now? [Y/n]: ", true)?;

    if !install_ffmpeg && !install_ytdlp {
        warn_missing(p.output(), &report)?;
        return Ok(report);
    }

    for problem in install_missing(&report, install_ytdlp, install_ffmpeg).await {
        error!("❌ {}", problem);
        p.say(problem)?;
    }

    let report = check_requirements(&config.ytdlp_path, &config.ffmpeg_path).await;
    warn_missing(p.output(), &report)?;
    Ok(report)
}

/// `check` subcommand; returns whether both tools are usable
pub async fn check(
    config: &AppConfig,
    install: bool,
    out: &mut impl Write,
) -> anyhow::Result<bool> {
    let mut report = check_requirements(&config.ytdlp_path, &config.ffmpeg_path).await;
    render_report(out, config, &report)?;

    if install && !report.all_available() {
        for problem in install_missing(&report, true, true).await {
            warn!("{}", problem);
            writeln!(out, "{}", problem)?;
        }
        report = check_requirements(&config.ytdlp_path, &config.ffmpeg_path).await;
        writeln!(out, "After installation:")?;
        render_report(out, config, &report)?;
    }

    if local_logging_enabled() {
        match resolve_log_dir() {
            Ok(dir) => writeln!(out, "Log directory: {}", dir.display())?,
            Err(e) => writeln!(out, "Log directory: unavailable ({})", e)?,
        }
    }

    Ok(report.all_available())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn config_without_tools() -> AppConfig {
        AppConfig {
            ytdlp_path: "/nonexistent/yt-dlp-for-tests".to_string(),
            ffmpeg_path: "/nonexistent/ffmpeg-for-tests".to_string(),
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_render_report() {
        let config = AppConfig::default();
        let report = RequirementReport {
            ytdlp: ToolStatus::Available {
                version: "2024.05.27".to_string(),
            },
            ffmpeg: ToolStatus::Missing,
        };
        let mut out = Vec::new();
        render_report(&mut out, &config, &report).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "yt-dlp (yt-dlp): found (2024.05.27)\nffmpeg (ffmpeg): not found\n"
        );
    }

    #[tokio::test]
    async fn test_declined_install_still_starts() {
        let config = config_without_tools();
        let mut p = Prompter::new(Cursor::new(b"n\nn\n".to_vec()), Vec::new());

        let report = ensure_requirements(&config, &mut p).await.unwrap();
        assert!(!report.all_available());

        let out = String::from_utf8(p.into_output()).unwrap();
        assert!(out.contains("not found"));
        assert!(out.contains("Warning: yt-dlp is unavailable"));
        assert!(out.contains(FFMPEG_DOWNLOAD_URL));
    }

    #[tokio::test]
    async fn test_check_without_install() {
        let config = config_without_tools();
        let mut out = Vec::new();
        assert!(!check(&config, false, &mut out).await.unwrap());
        assert!(String::from_utf8(out)
            .unwrap()
            .contains("yt-dlp (/nonexistent/yt-dlp-for-tests): not found"));
    }
}
