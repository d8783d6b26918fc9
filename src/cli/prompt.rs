//! Line-based prompts over any reader/writer pair
//!
//! Blank answers take the offered default, invalid answers are reported and
//! asked again, and end of input surfaces as [`PromptError::Eof`] so the menu
//! loop can shut down cleanly.

use std::fmt::Display;
use std::io::{self, BufRead, Write};

use crate::utils::validation::validate_url;

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("end of input")]
    Eof,

    #[error("terminal I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type PromptResult<T> = Result<T, PromptError>;

pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn output(&mut self) -> &mut W {
        &mut self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Print one line
    pub fn say(&mut self, message: impl Display) -> PromptResult<()> {
        writeln!(self.output, "{}", message)?;
        Ok(())
    }

    /// Print `question` and read the trimmed answer
    pub fn ask(&mut self, question: &str) -> PromptResult<String> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Err(PromptError::Eof);
        }
        Ok(line.trim().to_string())
    }

    /// Ask until `parse` accepts the answer; blank means `default`
    pub fn ask_parsed<T, E, F>(&mut self, question: &str, default: T, parse: F) -> PromptResult<T>
    where
        E: Display,
        F: Fn(&str) -> Result<T, E>,
    {
        let mut default = Some(default);
        loop {
            let answer = self.ask(question)?;
            if answer.is_empty() {
                if let Some(value) = default.take() {
                    return Ok(value);
                }
            }
            match parse(&answer) {
                Ok(value) => return Ok(value),
                Err(e) => self.say(format!("{}. Please try again.", e))?,
            }
        }
    }

    /// Ask for a value parsed with `FromStr`; blank means `default`
    pub fn ask_or_default<T>(&mut self, question: &str, default: T) -> PromptResult<T>
    where
        T: std::str::FromStr,
        T::Err: Display,
    {
        self.ask_parsed(question, default, |answer| answer.parse::<T>())
    }

    /// Ask until a valid http(s) URL is given
    pub fn ask_url(&mut self, question: &str) -> PromptResult<String> {
        loop {
            let answer = self.ask(question)?;
            match validate_url(&answer) {
                Ok(_) => return Ok(answer),
                Err(e) => self.say(format!("{}. Please try again.", e))?,
            }
        }
    }

    /// Ask for whitespace-separated URLs until every one of them is valid
    pub fn ask_urls(&mut self, question: &str) -> PromptResult<Vec<String>> {
        loop {
            let answer = self.ask(question)?;
            let urls: Vec<String> = answer.split_whitespace().map(str::to_string).collect();
            if urls.is_empty() {
                self.say("Please enter at least one URL.")?;
                continue;
            }

            let invalid: Vec<&str> = urls
                .iter()
                .filter(|url| validate_url(url).is_err())
                .map(String::as_str)
                .collect();
            if invalid.is_empty() {
                return Ok(urls);
            }
            self.say(format!(
                "Invalid URL(s): {}. Please try again.",
                invalid.join(" ")
            ))?;
        }
    }

    /// Yes/no question; blank means `default`
    pub fn confirm(&mut self, question: &str, default: bool) -> PromptResult<bool> {
        self.ask_parsed(question, default, |answer| {
            match answer.to_ascii_lowercase().as_str() {
                "y" | "yes" => Ok(true),
                "n" | "no" => Ok(false),
                _ => Err("Please answer y or n"),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::AudioFormat;
    use std::io::Cursor;

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn output_of(p: Prompter<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8(p.into_output()).unwrap()
    }

    #[test]
    fn test_ask_trims_and_detects_eof() {
        let mut p = prompter("  hello  \n");
        assert_eq!(p.ask("Q: ").unwrap(), "hello");
        assert!(matches!(p.ask("Q: "), Err(PromptError::Eof)));
    }

    #[test]
    fn test_default_and_retry() {
        let mut p = prompter("\nwma\nFLAC\n");
        assert_eq!(p.ask_or_default("F: ", AudioFormat::Ogg).unwrap(), AudioFormat::Ogg);
        assert_eq!(p.ask_or_default("F: ", AudioFormat::Mp3).unwrap(), AudioFormat::Flac);

        let out = output_of(p);
        assert!(out.contains("Unsupported audio format 'wma'"));
        assert!(out.contains("Please try again."));
    }

    #[test]
    fn test_ask_url_rejects_garbage() {
        let mut p = prompter("not-a-url\nhttps://youtu.be/abc\n");
        assert_eq!(p.ask_url("URL: ").unwrap(), "https://youtu.be/abc");
        assert!(output_of(p).contains("Invalid URL format"));
    }

    #[test]
    fn test_ask_urls() {
        let mut p = prompter("\nhttps://a.com/1 nope\nhttps://a.com/1   https://a.com/2\n");
        assert_eq!(
            p.ask_urls("URLs: ").unwrap(),
            vec!["https://a.com/1".to_string(), "https://a.com/2".to_string()]
        );
        let out = output_of(p);
        assert!(out.contains("Please enter at least one URL."));
        assert!(out.contains("Invalid URL(s): nope"));
    }

    #[test]
    fn test_confirm() {
        let mut p = prompter("\nmaybe\nN\n");
        assert!(p.confirm("? ", true).unwrap());
        assert!(!p.confirm("? ", true).unwrap());
    }
}
