//! Command handlers
//!
//! Interactive menu actions and the non-interactive subcommands, grouped by
//! what they operate on.

pub mod config;
pub mod download;
pub mod system;

use std::io;
use std::process::ExitCode;
use tracing::info;

use crate::cli::args::{Command, ConfigAction};
use crate::cli::interrupt::Interrupts;
use crate::core::models::DownloadKind;
use crate::AppState;

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Run one subcommand to completion
pub async fn run_command(
    state: &mut AppState,
    command: Command,
    interrupts: &Interrupts,
) -> anyhow::Result<ExitCode> {
    info!("▶️ Running subcommand {:?}", command);
    let defaults = state.config.clone();

    let success = match command {
        Command::Track(args) => {
            let format = args.format.unwrap_or(defaults.output_format);
            let kind = DownloadKind::Track { format };
            let request = download::request_from_args(&defaults, &args.url, kind, &args.common)?;
            download::run_single(state, interrupts, request, args.common.at.as_deref()).await?
        }
        Command::Playlist(args) => {
            let format = args.format.unwrap_or(defaults.output_format);
            let kind = DownloadKind::Playlist { format };
            let request = download::request_from_args(&defaults, &args.url, kind, &args.common)?;
            download::run_single(state, interrupts, request, args.common.at.as_deref()).await?
        }
        Command::Video(args) => {
            let kind = DownloadKind::Video {
                container: args.format.unwrap_or(defaults.video_format),
                quality: args.quality.unwrap_or(defaults.quality),
            };
            let request = download::request_from_args(&defaults, &args.url, kind, &args.common)?;
            download::run_single(state, interrupts, request, args.common.at.as_deref()).await?
        }
        Command::Subtitles(args) => {
            let languages = if args.langs.is_empty() {
                defaults.subtitle_languages.clone()
            } else {
                args.langs.clone()
            };
            let kind = DownloadKind::Subtitles { languages };
            let request = download::request_from_args(&defaults, &args.url, kind, &args.common)?;
            download::run_single(state, interrupts, request, args.common.at.as_deref()).await?
        }
        Command::Batch(args) => {
            let format = args.format.unwrap_or(defaults.output_format);
            let first = args.urls.first().map(String::as_str).unwrap_or_default();
            let kind = DownloadKind::Track { format };
            let template = download::request_from_args(&defaults, first, kind, &args.common)?;
            let workers = args.workers.unwrap_or(defaults.parallel_workers);
            let at = args.common.at.as_deref();
            download::run_batch(state, interrupts, template, &args.urls, workers, at).await?
        }
        Command::Config { action } => {
            let mut out = io::stdout();
            match action {
                ConfigAction::Show => config::show(state, &mut out)?,
                ConfigAction::Path => config::path(state, &mut out)?,
                ConfigAction::Reset => config::reset(state, &mut out)?,
            }
            true
        }
        Command::Check { install } => system::check(&defaults, install, &mut io::stdout()).await?,
    };

    Ok(exit_code(success))
}
