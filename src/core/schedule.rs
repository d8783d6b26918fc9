//! Delayed downloads
//!
//! Accepted forms: `HH:MM` (today, or tomorrow once passed),
//! `YYYY-MM-DD HH:MM`, and relative offsets such as `+30m`, `+2h`, `+45s`.

use chrono::{Duration as ChronoDuration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::info;

use super::models::{AppError, AppResult};

const MAX_OFFSET_SECS: i64 = 366 * 24 * 3600;

fn relative_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\+\s*(\d+)\s*([smh])$").expect("valid relative pattern"))
}

/// Resolve `input` to a local wall-clock time after `now`
pub fn parse_schedule(input: &str, now: NaiveDateTime) -> AppResult<NaiveDateTime> {
    let input = input.trim();

    if let Some(captures) = relative_pattern().captures(&input.to_ascii_lowercase()) {
        let amount: i64 = captures[1]
            .parse()
            .map_err(|_| AppError::Schedule(format!("Offset '{}' is too large", input)))?;
        let unit = match &captures[2] {
            "s" => 1,
            "m" => 60,
            _ => 3600,
        };
        let seconds = amount
            .checked_mul(unit)
            .filter(|secs| *secs <= MAX_OFFSET_SECS)
            .ok_or_else(|| AppError::Schedule(format!("Offset '{}' is more than a year", input)))?;
        return Ok(now + ChronoDuration::seconds(seconds));
    }

    if let Ok(time) = NaiveTime::parse_from_str(input, "%H:%M") {
        let today = now.date().and_time(time);
        return Ok(if today <= now {
            today + ChronoDuration::days(1)
        } else {
            today
        });
    }

    if let Ok(at) = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M") {
        if at <= now {
            return Err(AppError::Schedule(format!("{} is in the past", at)));
        }
        return Ok(at);
    }

    if NaiveDate::parse_from_str(input, "%Y-%m-%d").is_ok() {
        return Err(AppError::Schedule(format!(
            "'{}' has no time of day; use YYYY-MM-DD HH:MM",
            input
        )));
    }

    Err(AppError::Schedule(format!(
        "Unrecognised time '{}': use HH:MM, YYYY-MM-DD HH:MM or +30m",
        input
    )))
}

/// Time left until `target`, zero when it has passed
pub fn delay_until(target: NaiveDateTime, now: NaiveDateTime) -> Duration {
    (target - now).to_std().unwrap_or(Duration::ZERO)
}

/// Sleep until the local clock reaches `target`
pub async fn wait_until(target: NaiveDateTime) {
    let delay = delay_until(target, Local::now().naive_local());
    info!("⏰ Waiting {:?} until {}", delay, target);
    tokio::time::sleep(delay).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    #[test]
    fn test_clock_time_later_today() {
        let now = at("2024-05-01 10:00");
        assert_eq!(parse_schedule("18:30", now).unwrap(), at("2024-05-01 18:30"));
    }

    #[test]
    fn test_clock_time_rolls_to_tomorrow() {
        let now = at("2024-05-01 10:00");
        assert_eq!(parse_schedule("09:15", now).unwrap(), at("2024-05-02 09:15"));
        assert_eq!(parse_schedule("10:00", now).unwrap(), at("2024-05-02 10:00"));
    }

    #[test]
    fn test_absolute_time() {
        let now = at("2024-05-01 10:00");
        assert_eq!(
            parse_schedule("2024-05-03 07:00", now).unwrap(),
            at("2024-05-03 07:00")
        );
        assert!(parse_schedule("2024-04-30 07:00", now).is_err());
        assert!(parse_schedule("2024-05-03", now).is_err());
    }

    #[test]
    fn test_relative_offsets() {
        let now = at("2024-05-01 10:00");
        assert_eq!(parse_schedule("+30m", now).unwrap(), at("2024-05-01 10:30"));
        assert_eq!(parse_schedule("+2H", now).unwrap(), at("2024-05-01 12:00"));
        assert_eq!(
            parse_schedule("+45s", now).unwrap(),
            now + ChronoDuration::seconds(45)
        );
        assert!(parse_schedule("+5d", now).is_err());
        assert!(parse_schedule("+99999999h", now).is_err());
        assert!(parse_schedule("soon", now).is_err());
    }

    #[test]
    fn test_delay_until() {
        let now = at("2024-05-01 10:00");
        assert_eq!(delay_until(at("2024-05-01 10:01"), now), Duration::from_secs(60));
        assert_eq!(delay_until(at("2024-05-01 09:00"), now), Duration::ZERO);
    }
}
