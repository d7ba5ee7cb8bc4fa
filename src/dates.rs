//! Best-effort normalization of heterogeneous date strings.
//!
//! Sources report dates as RFC 2822 (`pubDate`), RFC 3339 (`datetime`
//! attributes), naive ISO timestamps or bare dates. [`DateNormalizer`] maps
//! all of them to a comparable UTC instant and never fails:
//!
//! | Input | Result |
//! |-------|--------|
//! | missing or blank | Unix epoch (sorts last) |
//! | full date-time | the parsed instant |
//! | bare date | midnight UTC of that day |
//! | anything else | the clock's "now" (sorts first) |

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use std::fmt;
use std::sync::Arc;

/// ISO 8601 layouts whose offset has no colon (`+0300`).
const OFFSET_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M:%S%z"];

/// Naive date-time layouts tried after the zoned ones, read as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Bare date layouts, interpreted as midnight UTC.
const BARE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y"];

/// Source of the current instant.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Parses date strings into instants. Cheap to clone.
#[derive(Clone)]
pub struct DateNormalizer {
    clock: Arc<dyn Clock + Send + Sync>,
}

impl fmt::Debug for DateNormalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DateNormalizer").finish_non_exhaustive()
    }
}

impl Default for DateNormalizer {
    fn default() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl DateNormalizer {
    pub fn with_clock(clock: impl Clock + Send + Sync + 'static) -> Self {
        Self {
            clock: Arc::new(clock),
        }
    }

    /// The current instant according to the injected clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Normalize a date string.
    ///
    /// Missing input maps to the Unix epoch while present-but-unparseable
    /// input maps to "now". The two fallbacks are deliberately asymmetric:
    /// undated posts sink to the bottom, garbled ones float to the top.
    pub fn normalize(&self, input: Option<&str>) -> DateTime<Utc> {
        let input = match input.map(str::trim) {
            Some(s) if !s.is_empty() => s,
            _ => return DateTime::<Utc>::UNIX_EPOCH,
        };

        if let Some(instant) = parse_datetime(input) {
            return instant;
        }
        if let Some(instant) = parse_bare_date(input) {
            return instant;
        }

        tracing::debug!(input, "Unparseable date; using current time");
        self.clock.now()
    }
}

fn parse_datetime(input: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(dt) = parse_rfc2822_lenient(input) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(dt) = OFFSET_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(input, fmt).ok())
    {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// RFC 2822, ignoring a day-of-week that disagrees with the date.
fn parse_rfc2822_lenient(input: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc2822(input).ok().or_else(|| {
        let (day, rest) = input.split_once(',')?;
        if !day.trim().chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }
        DateTime::parse_from_rfc2822(rest.trim()).ok()
    })
}

fn parse_bare_date(input: &str) -> Option<DateTime<Utc>> {
    BARE_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(input, fmt).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
