//! License expiry.
//!
//! Expiry is stored exactly as the administrator supplied it. Interpreting
//! the text is total: it is either the [`LIFETIME`] sentinel, a
//! timezone-naive timestamp, or malformed. Malformed expiry data never
//! expires.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The sentinel meaning "this key never expires".
pub const LIFETIME: &str = "lifetime";

/// The interpreted form of an expiry value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Deadline {
    /// The key never expires.
    Never,
    /// The key expires once wall-clock time passes this instant.
    At(NaiveDateTime),
    /// The expiry text could not be parsed.
    Malformed,
}

/// Outcome of comparing an expiry against the current time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpiryCheck {
    /// Lifetime key.
    NeverExpires,
    /// The deadline has not passed yet.
    Active,
    /// The deadline is strictly before now.
    Expired,
    /// Lenient policy: unparsable expiry data is treated as never expiring.
    Malformed,
}

impl ExpiryCheck {
    /// Returns true unless the key is past its deadline.
    #[must_use]
    pub fn permits_access(&self) -> bool {
        !matches!(self, Self::Expired)
    }
}

/// A license expiry, kept as raw text alongside its interpretation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Expiry {
    raw: String,
    deadline: Deadline,
}

impl Expiry {
    /// Creates an expiry from admin-supplied text. Never fails.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let deadline = interpret(&raw);
        Self { raw, deadline }
    }

    /// The never-expiring sentinel.
    #[must_use]
    pub fn lifetime() -> Self {
        Self::new(LIFETIME)
    }

    /// An expiry at the given instant, written in ISO 8601 form.
    #[must_use]
    pub fn at(deadline: NaiveDateTime) -> Self {
        Self {
            raw: deadline.format("%Y-%m-%dT%H:%M:%S").to_string(),
            deadline: Deadline::At(deadline),
        }
    }

    /// Returns the text exactly as stored.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the interpreted deadline.
    #[must_use]
    pub fn deadline(&self) -> Deadline {
        self.deadline
    }

    /// Compares this expiry against `now`.
    ///
    /// A key whose deadline equals `now` is still active; only a deadline
    /// strictly before `now` counts as expired.
    #[must_use]
    pub fn check(&self, now: NaiveDateTime) -> ExpiryCheck {
        match self.deadline {
            Deadline::Never => ExpiryCheck::NeverExpires,
            Deadline::Malformed => ExpiryCheck::Malformed,
            Deadline::At(deadline) if deadline < now => ExpiryCheck::Expired,
            Deadline::At(_) => ExpiryCheck::Active,
        }
    }
}

impl Default for Expiry {
    fn default() -> Self {
        Self::lifetime()
    }
}

impl From<String> for Expiry {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&str> for Expiry {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<Expiry> for String {
    fn from(expiry: Expiry) -> Self {
        expiry.raw
    }
}

impl fmt::Display for Expiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn interpret(raw: &str) -> Deadline {
    if raw == LIFETIME {
        return Deadline::Never;
    }
    parse_iso(raw).map_or(Deadline::Malformed, Deadline::At)
}

/// Reads the ISO 8601 subset accepted for expiries.
///
/// A calendar date (`YYYY-MM-DD` or `YYYYMMDD`), optionally followed by any
/// single separator character and a time of day: `HH`, `HH:MM`,
/// `HH:MM:SS` or their compact forms `HHMM`, `HHMMSS`. Seconds may carry a
/// fraction after `.` or `,`, truncated to microseconds. UTC offsets and
/// week dates are not accepted.
fn parse_iso(raw: &str) -> Option<NaiveDateTime> {
    let (date, rest) = split_date(raw)?;
    let mut rest = rest.chars();
    let time = match rest.next() {
        None => NaiveTime::MIN,
        Some(_separator) => parse_time(rest.as_str())?,
    };
    Some(date.and_time(time))
}

fn split_date(raw: &str) -> Option<(NaiveDate, &str)> {
    let bytes = raw.as_bytes();
    let (year, month, day, rest) = if bytes.get(4) == Some(&b'-') {
        if bytes.get(7) != Some(&b'-') {
            return None;
        }
        (raw.get(..4)?, raw.get(5..7)?, raw.get(8..10)?, raw.get(10..)?)
    } else {
        (raw.get(..4)?, raw.get(4..6)?, raw.get(6..8)?, raw.get(8..)?)
    };
    let year = i32::try_from(number(year)?).ok()?;
    let date = NaiveDate::from_ymd_opt(year, number(month)?, number(day)?)?;
    Some((date, rest))
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    let (clock, fraction) = match text.find(['.', ',']) {
        Some(at) => (&text[..at], Some(&text[at + 1..])),
        None => (text, None),
    };

    let fields: Vec<&str> = if clock.contains(':') {
        clock.split(':').collect()
    } else {
        if !clock.is_ascii() || clock.len() % 2 != 0 {
            return None;
        }
        (0..clock.len()).step_by(2).map(|i| &clock[i..i + 2]).collect()
    };
    if fields.iter().any(|field| field.len() != 2) {
        return None;
    }

    let (hour, minute, second) = match fields.as_slice() {
        [h] => (number(h)?, 0, 0),
        [h, m] => (number(h)?, number(m)?, 0),
        [h, m, s] => (number(h)?, number(m)?, number(s)?),
        _ => return None,
    };
    let micro = match fraction {
        None => 0,
        Some(digits) if fields.len() == 3 => micros(digits)?,
        Some(_) => return None,
    };
    NaiveTime::from_hms_micro_opt(hour, minute, second, micro)
}

fn is_digits(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

fn number(text: &str) -> Option<u32> {
    if !is_digits(text) {
        return None;
    }
    text.parse().ok()
}

fn micros(digits: &str) -> Option<u32> {
    if !is_digits(digits) {
        return None;
    }
    let mut padded: String = digits.chars().take(6).collect();
    while padded.len() < 6 {
        padded.push('0');
    }
    padded.parse().ok()
}
