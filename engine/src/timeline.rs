//! Timeline grammar
//!
//! A formatted entry reads `HH:MM - HH:MM (**<duration>**) - <activity>`, where
//! the duration is `N'` below one hour and `HhMM'` otherwise. Input may carry
//! full-width brackets around the duration; those still count as formatted.

use std::fmt;
use std::sync::OnceLock;

use daybook_store::TimelineEntry;
use regex_lite::Regex;

const MINUTES_PER_DAY: u32 = 24 * 60;

fn time_range_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{2}):(\d{2})\s*-\s*(\d{2}):(\d{2})").ok())
        .as_ref()
}

fn duration_marker_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[(（]\*\*(\d+h\d{2}'|\d+')\*\*[)）]").ok())
        .as_ref()
}

fn duration_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:(\d+)h(\d{2})|(\d+))'$").ok())
        .as_ref()
}

/// Wall-clock time of day, minute precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime {
    minutes: u32,
}

impl ClockTime {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self {
            minutes: hour * 60 + minute,
        })
    }

    /// Minutes since midnight.
    pub fn minutes(self) -> u32 {
        self.minutes
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.minutes / 60, self.minutes % 60)
    }
}

/// A `HH:MM - HH:MM` span found in entry text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: ClockTime,
    pub end: ClockTime,
}

impl TimeRange {
    /// First time range in `content`, if any.
    pub fn find(content: &str) -> Option<Self> {
        let caps = time_range_re()?.captures(content)?;
        let part = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
        Some(Self {
            start: ClockTime::new(part(1)?, part(2)?)?,
            end: ClockTime::new(part(3)?, part(4)?)?,
        })
    }

    pub fn duration_minutes(self) -> u32 {
        duration_between(self.start, self.end)
    }

    /// Rendered duration, e.g. `45'` or `1h05'`.
    pub fn duration_text(self) -> String {
        format_duration(self.duration_minutes())
    }
}

/// Minutes from `start` to `end`, wrapping past midnight when `end < start`.
pub fn duration_between(start: ClockTime, end: ClockTime) -> u32 {
    if end >= start {
        end.minutes - start.minutes
    } else {
        end.minutes + MINUTES_PER_DAY - start.minutes
    }
}

pub fn format_duration(minutes: u32) -> String {
    if minutes < 60 {
        format!("{minutes}'")
    } else {
        format!("{}h{:02}'", minutes / 60, minutes % 60)
    }
}

/// Inverse of [`format_duration`]. `None` for malformed or overflowing text.
pub fn parse_duration(text: &str) -> Option<u32> {
    let caps = duration_re()?.captures(text.trim())?;
    if let Some(minutes) = caps.get(3) {
        return minutes.as_str().parse().ok();
    }
    let hours: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minutes: u32 = caps.get(2)?.as_str().parse().ok()?;
    if minutes >= 60 {
        return None;
    }
    hours.checked_mul(60)?.checked_add(minutes)
}

/// Minutes written in the entry's bold duration marker, if it has one.
pub fn marked_duration(content: &str) -> Option<u32> {
    let caps = duration_marker_re()?.captures(content)?;
    parse_duration(caps.get(1)?.as_str())
}

/// Whether `content` already carries a bold duration marker, in ASCII or
/// full-width brackets.
pub fn is_formatted(content: &str) -> bool {
    duration_marker_re().is_some_and(|re| re.is_match(content))
}

/// End time of the last entry (by order) that carries a time range.
pub fn last_end_time(entries: &[TimelineEntry]) -> Option<ClockTime> {
    entries
        .iter()
        .rev()
        .find_map(|entry| TimeRange::find(&entry.content))
        .map(|range| range.end)
}

/// Formatting state of one day's entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DaySummary {
    pub entries: usize,
    pub formatted: usize,
    pub needs_formatting: usize,
    /// Formatted entries whose marker disagrees with their time range.
    pub stale_durations: usize,
    /// Sum of all parsed range durations.
    pub tracked_minutes: u32,
}

impl DaySummary {
    pub fn of(entries: &[TimelineEntry]) -> Self {
        let formatted = entries.iter().filter(|e| is_formatted(&e.content)).count();
        let stale_durations = entries
            .iter()
            .filter(|e| {
                let marked = marked_duration(&e.content);
                let range = TimeRange::find(&e.content).map(TimeRange::duration_minutes);
                matches!((marked, range), (Some(m), Some(r)) if m != r)
            })
            .count();
        let tracked_minutes = entries
            .iter()
            .filter_map(|e| TimeRange::find(&e.content))
            .map(TimeRange::duration_minutes)
            .sum();
        Self {
            entries: entries.len(),
            formatted,
            needs_formatting: entries.len() - formatted,
            stale_durations,
            tracked_minutes,
        }
    }
}
