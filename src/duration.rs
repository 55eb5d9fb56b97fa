//! Conversions between scheduler duration strings and seconds.
//!
//! Two vocabularies are handled and they are deliberately kept apart:
//!
//! - Slurm clock format (`D-HH:MM:SS`, `HH:MM:SS`, `MM:SS`) as printed by
//!   `squeue`/`sacct`. [`parse_duration`] is lenient: anything it cannot read
//!   becomes 0 so a display field never fails.
//! - Verbose format (`H:MM:SS`, `N day(s), H:MM:SS`) produced by
//!   [`elapsed_since`] for the job table. [`parse_verbose_duration`] is strict
//!   because its result is used as a sort key.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::DurationError;

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 3600;
const SECS_PER_DAY: u64 = 86400;

static VERBOSE_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(\d+)\s+days?\s*,\s+)?(\d+):(\d{1,2}):(\d{1,2})$")
        .expect("verbose duration pattern is a valid regex")
});

/// Parse a clock field of at most two digits, bounded by `max`.
fn clock_field(text: &str, max: u64) -> Option<u64> {
    if text.is_empty() || text.len() > 2 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok().filter(|v| *v <= max)
}

/// Strict form of [`parse_duration`]: `None` for anything that is not one of
/// `D-HH:MM:SS`, `HH:MM:SS` or `MM:SS`.
#[must_use]
pub fn try_parse_duration(text: &str) -> Option<u64> {
    let (days, clock) = match text.split_once('-') {
        Some((days, clock)) => {
            if days.is_empty() || !days.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            (Some(days.parse::<u64>().ok()?), clock)
        }
        None => (None, text),
    };

    let fields: Vec<&str> = clock.split(':').collect();
    let clock_secs = match (days.is_some(), fields.as_slice()) {
        (_, [h, m, s]) => {
            clock_field(h, 23)? * SECS_PER_HOUR
                + clock_field(m, 59)? * SECS_PER_MINUTE
                + clock_field(s, 59)?
        }
        (false, [m, s]) => clock_field(m, 59)? * SECS_PER_MINUTE + clock_field(s, 59)?,
        _ => return None,
    };

    days.unwrap_or(0)
        .checked_mul(SECS_PER_DAY)?
        .checked_add(clock_secs)
}

/// Convert `D-HH:MM:SS`, `HH:MM:SS` or `MM:SS` to seconds.
///
/// Malformed input yields 0 rather than an error.
///
/// # Examples
/// ```
/// use slurmtop::duration::parse_duration;
/// assert_eq!(parse_duration("1-02:03:04"), 93784);
/// assert_eq!(parse_duration("02:03:04"), 7384);
/// assert_eq!(parse_duration("03:04"), 184);
/// assert_eq!(parse_duration("soon"), 0);
/// ```
#[must_use]
pub fn parse_duration(text: &str) -> u64 {
    try_parse_duration(text).unwrap_or_else(|| {
        tracing::debug!(value = text, "unparseable duration, using 0");
        0
    })
}

/// Convert the verbose form (`H:MM:SS`, `N day(s), H:MM:SS`) to seconds.
///
/// The empty string (a job that has not started) is 0.
///
/// # Errors
/// `InvalidDurationFormat` for any other non-matching input.
pub fn parse_verbose_duration(text: &str) -> Result<u64, DurationError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(0);
    }

    let invalid = || DurationError::InvalidDurationFormat(text.to_string());
    let caps = VERBOSE_DURATION.captures(text).ok_or_else(invalid)?;
    let number = |idx: usize| -> Result<u64, DurationError> {
        caps.get(idx)
            .map_or(Ok(0), |m| m.as_str().parse::<u64>().map_err(|_| invalid()))
    };

    let (days, hours, minutes, seconds) = (number(1)?, number(2)?, number(3)?, number(4)?);
    if minutes > 59 || seconds > 59 {
        return Err(invalid());
    }

    days.checked_mul(SECS_PER_DAY)
        .and_then(|d| d.checked_add(hours.checked_mul(SECS_PER_HOUR)?))
        .and_then(|t| t.checked_add(minutes * SECS_PER_MINUTE + seconds))
        .ok_or_else(invalid)
}

/// Render seconds in the verbose form read by [`parse_verbose_duration`].
///
/// # Examples
/// ```
/// use slurmtop::duration::format_verbose_duration;
/// assert_eq!(format_verbose_duration(3661), "1:01:01");
/// assert_eq!(format_verbose_duration(90061), "1 day, 1:01:01");
/// assert_eq!(format_verbose_duration(2 * 86400), "2 days, 0:00:00");
/// ```
#[must_use]
pub fn format_verbose_duration(seconds: u64) -> String {
    let days = seconds / SECS_PER_DAY;
    let hours = (seconds % SECS_PER_DAY) / SECS_PER_HOUR;
    let minutes = (seconds % SECS_PER_HOUR) / SECS_PER_MINUTE;
    let secs = seconds % SECS_PER_MINUTE;

    let clock = format!("{}:{:02}:{:02}", hours, minutes, secs);
    match days {
        0 => clock,
        1 => format!("1 day, {}", clock),
        n => format!("{} days, {}", n, clock),
    }
}

/// Format duration as HH:MM:SS or D-HH:MM:SS (Slurm clock style).
///
/// # Examples
/// ```
/// use slurmtop::duration::format_duration_hms;
/// assert_eq!(format_duration_hms(3661), "01:01:01");
/// assert_eq!(format_duration_hms(90061), "1-01:01:01");
/// ```
#[must_use]
pub fn format_duration_hms(seconds: u64) -> String {
    let hours = seconds / SECS_PER_HOUR;
    let minutes = (seconds % SECS_PER_HOUR) / SECS_PER_MINUTE;
    let secs = seconds % SECS_PER_MINUTE;

    if hours >= 24 {
        let days = hours / 24;
        let remaining_hours = hours % 24;
        format!("{}-{:02}:{:02}:{:02}", days, remaining_hours, minutes, secs)
    } else {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    }
}

/// Time a job has been running, as shown in the job table.
///
/// Empty when the job has not started (`start_epoch <= 0`) or when the start
/// lies in the future relative to `now_epoch` (clock skew between the
/// controller and this host).
#[must_use]
pub fn elapsed_since(start_epoch: i64, now_epoch: i64) -> String {
    if start_epoch <= 0 || now_epoch < start_epoch {
        return String::new();
    }
    format_verbose_duration(now_epoch.abs_diff(start_epoch))
}
