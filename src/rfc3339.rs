//! Parser for the RFC 3339 timestamps used throughout the API's JSON payloads.
//!
//! Only a restricted profile is accepted:
//!
//! ```text
//! YYYY-MM-DDTHH:MM:SS[.fraction](Z|+HH:MM|-HH:MM)
//! ```
//!
//! The separator and UTC designator are case-insensitive, the fraction may have
//! any number of digits (only the first six are kept, without rounding), and an
//! offset is always required. Every malformed input maps to the same failure.

use chrono::{DateTime, FixedOffset, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?P<year>[0-9]{4})-(?P<month>[0-9]{2})-(?P<day>[0-9]{2})[Tt]",
        r"(?P<hour>[0-9]{2}):(?P<minute>[0-9]{2}):(?P<second>[0-9]{2})",
        r"(?:\.(?P<frac>[0-9]+))?",
        r"(?:(?P<utc>[Zz])|(?P<sign>[+-])(?P<offset_hour>[0-9]{2}):(?P<offset_minute>[0-9]{2}))$",
    ))
    .expect("timestamp pattern is valid")
});

const MAX_OFFSET_MINUTES: i32 = 24 * 60;

/// A timestamp broken into the fields it was written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParsedTimestamp {
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
    microseconds: u32,
    offset_minutes: i32,
}

/// Returned when a string is not a timestamp in the accepted profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseFailure;

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid RFC 3339 timestamp")
    }
}

impl std::error::Error for ParseFailure {}

/// Parses `input`, returning `None` if it is not a valid timestamp.
pub fn parse(input: &str) -> Option<ParsedTimestamp> {
    let caps = TIMESTAMP.captures(input)?;
    let field = |name: &str| caps.name(name).map(|m| m.as_str());

    let microseconds = match field("frac") {
        Some(frac) => {
            // ASCII digits only, so byte slicing stays on a char boundary.
            let digits = &frac[..frac.len().min(6)];
            let value: u32 = digits.parse().ok()?;
            value * 10u32.pow(6 - digits.len() as u32)
        }
        None => 0,
    };

    let offset_minutes = if field("utc").is_some() {
        0
    } else {
        let hours: i32 = field("offset_hour")?.parse().ok()?;
        let minutes: i32 = field("offset_minute")?.parse().ok()?;
        let total = hours * 60 + minutes;
        if field("sign")? == "-" { -total } else { total }
    };

    let ts = ParsedTimestamp {
        year: field("year")?.parse().ok()?,
        month: field("month")?.parse().ok()?,
        day: field("day")?.parse().ok()?,
        hour: field("hour")?.parse().ok()?,
        minute: field("minute")?.parse().ok()?,
        second: field("second")?.parse().ok()?,
        microseconds,
        offset_minutes,
    };

    ts.in_range().then_some(ts)
}

/// Parses `input` straight into an offset-aware datetime.
///
/// Unlike [`parse`] this also rejects dates that don't exist in the calendar,
/// such as `2021-02-30`.
pub fn parse_datetime(input: &str) -> Option<DateTime<FixedOffset>> {
    parse(input).and_then(|ts| ts.to_datetime())
}

impl ParsedTimestamp {
    fn in_range(&self) -> bool {
        self.year >= 1
            && (1..=12).contains(&self.month)
            && (1..=31).contains(&self.day)
            && self.hour < 24
            && self.minute < 60
            && self.second < 60
            && self.microseconds < 1_000_000
            && self.offset_minutes.abs() < MAX_OFFSET_MINUTES
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    pub fn second(&self) -> u32 {
        self.second
    }

    pub fn microseconds(&self) -> u32 {
        self.microseconds
    }

    /// Total offset from UTC in minutes, negative west of Greenwich.
    pub fn offset_minutes(&self) -> i32 {
        self.offset_minutes
    }

    /// Converts to a [`chrono`] datetime carrying the parsed offset.
    ///
    /// Returns `None` when the date doesn't exist in the calendar.
    pub fn to_datetime(&self) -> Option<DateTime<FixedOffset>> {
        let offset = FixedOffset::east_opt(self.offset_minutes * 60)?;
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)?
            .and_hms_micro_opt(self.hour, self.minute, self.second, self.microseconds)?
            .and_local_timezone(offset)
            .single()
    }

    /// Formats in the accepted profile, so the result parses back to `self`.
    pub fn to_rfc3339(&self) -> String {
        let mut out = format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        );
        if self.microseconds != 0 {
            out.push_str(&format!(".{:06}", self.microseconds));
        }
        if self.offset_minutes == 0 {
            out.push('Z');
        } else {
            out.push_str(&self.offset_string());
        }
        out
    }

    fn offset_string(&self) -> String {
        let sign = if self.offset_minutes < 0 { '-' } else { '+' };
        let abs = self.offset_minutes.abs();
        format!("{}{:02}:{:02}", sign, abs / 60, abs % 60)
    }
}

impl fmt::Display for ParsedTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )?;
        if self.microseconds != 0 {
            write!(f, ".{:06}", self.microseconds)?;
        }
        f.write_str(&self.offset_string())
    }
}

impl FromStr for ParsedTimestamp {
    type Err = ParseFailure;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s).ok_or(ParseFailure)
    }
}

/// Deserializes an optional timestamp field.
///
/// Missing, `null` and unparseable values all become `None`; a bad timestamp
/// never fails the surrounding object.
pub(crate) fn deserialize_optional<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<FixedOffset>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        let parsed = parse_datetime(&s);
        if parsed.is_none() {
            tracing::warn!("ignoring unparseable timestamp {:?}", s);
        }
        parsed
    }))
}
