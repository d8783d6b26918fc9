//! Terminal front-end
//!
//! Argument parsing, the numbered menu, line prompts and Ctrl-C handling.

pub mod args;
pub mod interrupt;
pub mod menu;
pub mod prompt;

use std::io::{BufRead, Write};
use tracing::debug;

use crate::commands;
use crate::AppState;
use interrupt::Interrupts;
use menu::{MenuChoice, CHOICE_PROMPT};
use prompt::{PromptError, PromptResult, Prompter};

pub const INVALID_CHOICE: &str = "Invalid choice. Please try again.";

/// Show the menu until the user picks Exit or input ends
///
/// A failed download never leaves the loop; only terminal I/O errors do.
pub async fn run_menu<R: BufRead, W: Write>(
    state: &mut AppState,
    p: &mut Prompter<R, W>,
    interrupts: &Interrupts,
) -> PromptResult<()> {
    loop {
        menu::render(p.output())?;
        let answer = match p.ask(CHOICE_PROMPT) {
            Ok(answer) => answer,
            Err(PromptError::Eof) => break,
            Err(e) => return Err(e),
        };

        let choice = match answer.parse::<MenuChoice>() {
            Ok(choice) => choice,
            Err(_) => {
                p.say(INVALID_CHOICE)?;
                continue;
            }
        };
        debug!("Menu choice: {:?}", choice);

        let result = match choice {
            MenuChoice::Track
            | MenuChoice::Playlist
            | MenuChoice::Video
            | MenuChoice::Subtitles => {
                commands::download::interactive_download(state, p, interrupts, choice).await
            }
            MenuChoice::Parallel => {
                commands::download::interactive_parallel(state, p, interrupts).await
            }
            MenuChoice::Schedule => {
                commands::download::interactive_schedule(state, p, interrupts).await
            }
            MenuChoice::Settings => commands::config::interactive_settings(state, p),
            MenuChoice::Exit => break,
        };

        match result {
            Ok(()) => {}
            Err(PromptError::Eof) => break,
            Err(e) => return Err(e),
        }
    }

    p.say("Exiting...")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::AppConfig;
    use std::io::Cursor;

    async fn drive(input: &str) -> (String, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            output_dir: dir.path().to_path_buf(),
            ytdlp_path: "/nonexistent/yt-dlp-for-tests".to_string(),
            ..AppConfig::default()
        };
        let mut state = AppState::with_config(config, dir.path().join("config.json"));
        let mut p = Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new());

        run_menu(&mut state, &mut p, &Interrupts::disabled()).await.unwrap();
        (String::from_utf8(p.into_output()).unwrap(), state)
    }

    #[tokio::test]
    async fn test_exit_choice() {
        let (out, _) = drive("8\n").await;
        assert!(out.contains(menu::WELCOME));
        assert!(out.ends_with("Exiting...\n"));
    }

    #[tokio::test]
    async fn test_invalid_choice_then_eof() {
        let (out, _) = drive("42\nabc\n").await;
        assert_eq!(out.matches(INVALID_CHOICE).count(), 2);
        assert_eq!(out.matches(menu::WELCOME).count(), 3);
        assert!(out.ends_with("Exiting...\n"));
    }

    #[tokio::test]
    async fn test_eof_inside_a_prompt_exits() {
        let (out, _) = drive("3\nhttps://v.com/1\n").await;
        assert!(out.contains("Enter proxy"));
        assert!(!out.contains("Enter output format (mp4/mkv)"));
        assert!(out.ends_with("Exiting...\n"));
    }

    #[tokio::test]
    async fn test_failed_download_returns_to_menu() {
        let (out, _) = drive("1\nhttps://example.com/watch?v=1\n\n\n\n8\n").await;
        assert!(out.contains("Failed to download the music."));
        assert_eq!(out.matches(menu::WELCOME).count(), 2);
    }
}
