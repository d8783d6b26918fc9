//! Settings commands
//!
//! The settings screen walks through every saved default, validates the
//! result and writes `config.json`. The `config` subcommand prints or resets
//! the same file.

use std::fmt::Display;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::{error, info};

use crate::cli::prompt::{PromptResult, Prompter};
use crate::core::config::{AppConfig, MAX_PARALLEL_WORKERS, MAX_RETRIES};
use crate::core::models::{AppError, AppResult, AudioFormat, VideoContainer, VideoQuality};
use crate::utils::file_utils::absolute_path;
use crate::utils::validation::{validate_byte_size, validate_proxy};
use crate::AppState;

fn ask_optional<R, W, F>(
    p: &mut Prompter<R, W>,
    label: &str,
    current: &Option<String>,
    check: F,
) -> PromptResult<Option<String>>
where
    R: BufRead,
    W: Write,
    F: Fn(&str) -> AppResult<()>,
{
    let question = format!(
        "{} [Current: {}, 'none' clears]: ",
        label,
        current.as_deref().unwrap_or("none")
    );
    p.ask_parsed(&question, current.clone(), |answer| {
        if answer.eq_ignore_ascii_case("none") {
            Ok(None)
        } else {
            check(answer).map(|_| Some(answer.to_string()))
        }
    })
}

fn ask_bounded<R, W, T>(p: &mut Prompter<R, W>, label: &str, current: T, max: T) -> PromptResult<T>
where
    R: BufRead,
    W: Write,
    T: std::str::FromStr + PartialOrd + From<u8> + Display + Copy,
{
    let question = format!("{} (1-{}) [Current: {}]: ", label, max, current);
    p.ask_parsed(&question, current, |answer| match answer.parse::<T>() {
        Ok(value) if value >= T::from(1) && value <= max => Ok(value),
        _ => Err(format!("{} must be a number between 1 and {}", label, max)),
    })
}

fn ask_text<R: BufRead, W: Write>(
    p: &mut Prompter<R, W>,
    label: &str,
    current: &str,
) -> PromptResult<String> {
    let question = format!("{} [Current: {}]: ", label, current);
    p.ask_parsed(&question, current.to_string(), |answer| {
        Ok::<_, AppError>(answer.to_string())
    })
}

/// Walk through every field; blank answers keep the current value
pub fn collect_settings<R: BufRead, W: Write>(
    p: &mut Prompter<R, W>,
    current: &AppConfig,
) -> PromptResult<AppConfig> {
    let output_dir = p.ask_parsed(
        &format!("Output directory [Current: {}]: ", current.output_dir.display()),
        current.output_dir.clone(),
        |answer| Ok::<_, AppError>(PathBuf::from(answer)),
    )?;
    let output_format = p.ask_or_default::<AudioFormat>(
        &format!(
            "Audio format (mp3/m4a/wav/aac/flac/ogg) [Current: {}]: ",
            current.output_format
        ),
        current.output_format,
    )?;
    let video_format = p.ask_or_default::<VideoContainer>(
        &format!("Video format (mp4/mkv) [Current: {}]: ", current.video_format),
        current.video_format,
    )?;
    let quality = p.ask_or_default::<VideoQuality>(
        &format!(
            "Video quality (best, 1080, 720, 480) [Current: {}]: ",
            current.quality
        ),
        current.quality,
    )?;
    let proxy = ask_optional(p, "Proxy", &current.proxy, validate_proxy)?;
    let rate_limit = ask_optional(p, "Speed limit (e.g., 500K, 2M)", &current.rate_limit, |value| {
        validate_byte_size("rate limit", value)
    })?;
    let chunk_size = ask_optional(p, "Chunk size (e.g., 10M)", &current.chunk_size, |value| {
        validate_byte_size("chunk size", value)
    })?;
    let subtitle_languages = p.ask_parsed(
        &format!(
            "Subtitle languages, comma separated [Current: {}]: ",
            current.subtitle_languages.join(",")
        ),
        current.subtitle_languages.clone(),
        |answer| {
            let languages: Vec<String> = answer
                .split(',')
                .map(|lang| lang.trim().to_string())
                .filter(|lang| !lang.is_empty())
                .collect();
            if languages.is_empty() {
                Err("Enter at least one language")
            } else {
                Ok(languages)
            }
        },
    )?;
    let retries = ask_bounded(p, "Attempts per download", current.retries, MAX_RETRIES)?;
    let parallel_workers = ask_bounded(
        p,
        "Parallel downloads",
        current.parallel_workers,
        MAX_PARALLEL_WORKERS,
    )?;
    let tag_metadata = p.confirm(
        &format!(
            "Write title/artist/album tags after audio downloads? (y/n) [Current: {}]: ",
            if current.tag_metadata { "y" } else { "n" }
        ),
        current.tag_metadata,
    )?;
    let ytdlp_path = ask_text(p, "yt-dlp executable", &current.ytdlp_path)?;
    let ffmpeg_path = ask_text(p, "ffmpeg executable", &current.ffmpeg_path)?;

    Ok(AppConfig {
        output_dir,
        output_format,
        proxy,
        quality,
        video_format,
        retries,
        parallel_workers,
        rate_limit,
        chunk_size,
        subtitle_languages,
        tag_metadata,
        ytdlp_path,
        ffmpeg_path,
    })
}

/// Menu entry 7
pub fn interactive_settings<R: BufRead, W: Write>(
    state: &mut AppState,
    p: &mut Prompter<R, W>,
) -> PromptResult<()> {
    p.say("Current settings (press Enter to keep a value):")?;
    let updated = collect_settings(p, &state.config)?;

    if let Err(e) = updated.validate() {
        p.say(format!("Invalid settings: {:#}. Nothing was saved.", e))?;
        return Ok(());
    }

    if updated == state.config {
        p.say("No changes.")?;
        return Ok(());
    }

    if !p.confirm("Save these settings? [Y/n]: ", true)? {
        p.say("Settings discarded.")?;
        return Ok(());
    }

    match updated.save(&state.config_path) {
        Ok(()) => {
            info!("⚙️ Settings updated");
            p.say(format!(
                "Settings saved to {}.",
                absolute_path(&state.config_path).display()
            ))?;
        }
        Err(e) => {
            error!("❌ Failed to save settings: {:#}", e);
            p.say(format!(
                "Failed to save settings: {:#}. They apply to this session only.",
                e
            ))?;
        }
    }
    state.apply_config(updated);
    Ok(())
}

/// `config show`
pub fn show(state: &AppState, out: &mut impl Write) -> anyhow::Result<()> {
    writeln!(out, "{}", state.config.export()?)?;
    Ok(())
}

/// `config path`
pub fn path(state: &AppState, out: &mut impl Write) -> anyhow::Result<()> {
    let path = absolute_path(&state.config_path);
    if path.exists() {
        writeln!(out, "{}", path.display())?;
    } else {
        writeln!(out, "{} (not created yet, defaults in use)", path.display())?;
    }
    Ok(())
}

/// `config reset`
pub fn reset(state: &mut AppState, out: &mut impl Write) -> anyhow::Result<()> {
    let config = AppConfig::reset(&state.config_path)?;
    state.apply_config(config);
    writeln!(
        out,
        "Settings reset to defaults in {}.",
        absolute_path(&state.config_path).display()
    )?;
    Ok(())
}
