//! Main menu

use std::io::{self, Write};
use std::str::FromStr;

pub const WELCOME: &str = "Welcome to the Music and Video Downloader!";

pub const CHOICE_PROMPT: &str = "Enter your choice (1-8): ";

/// One entry of the main menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Track,
    Playlist,
    Video,
    Subtitles,
    Parallel,
    Schedule,
    Settings,
    Exit,
}

impl MenuChoice {
    pub const ALL: [MenuChoice; 8] = [
        MenuChoice::Track,
        MenuChoice::Playlist,
        MenuChoice::Video,
        MenuChoice::Subtitles,
        MenuChoice::Parallel,
        MenuChoice::Schedule,
        MenuChoice::Settings,
        MenuChoice::Exit,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Self::Track => "Download a single track",
            Self::Playlist => "Download a playlist",
            Self::Video => "Download a video",
            Self::Subtitles => "Download subtitles",
            Self::Parallel => "Download multiple tracks in parallel",
            Self::Schedule => "Schedule a download",
            Self::Settings => "Settings (saved defaults)",
            Self::Exit => "Exit",
        }
    }

    /// 1-based menu number
    pub fn number(&self) -> usize {
        Self::ALL
            .iter()
            .position(|choice| choice == self)
            .map_or(0, |index| index + 1)
    }
}

impl FromStr for MenuChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|index| Self::ALL.get(index).copied())
            .ok_or_else(|| format!("'{}' is not a menu entry", s.trim()))
    }
}

/// Print the welcome line and the numbered entries
pub fn render(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "{}", WELCOME)?;
    for choice in MenuChoice::ALL {
        writeln!(out, "{}. {}", choice.number(), choice.title())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choice_parsing() {
        assert_eq!("1".parse::<MenuChoice>(), Ok(MenuChoice::Track));
        assert_eq!(" 5 ".parse::<MenuChoice>(), Ok(MenuChoice::Parallel));
        assert_eq!("8".parse::<MenuChoice>(), Ok(MenuChoice::Exit));
        assert!("0".parse::<MenuChoice>().is_err());
        assert!("9".parse::<MenuChoice>().is_err());
        assert!("exit".parse::<MenuChoice>().is_err());
    }

    #[test]
    fn test_render() {
        let mut out = Vec::new();
        render(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with(WELCOME));
        assert!(text.contains("1. Download a single track"));
        assert!(text.contains("5. Download multiple tracks in parallel"));
        assert!(text.contains("8. Exit"));
    }
}
