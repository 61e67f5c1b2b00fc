//! Daily-note page titles ("January 17th, 2026").

use chrono::{Datelike, NaiveDate};

/// English ordinal suffix for a day of month.
pub fn ordinal_suffix(day: u32) -> &'static str {
    if (11..=13).contains(&(day % 100)) {
        return "th";
    }
    match day % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

/// Title of the daily-notes page for `date`.
pub fn daily_page_title(date: NaiveDate) -> String {
    let day = date.day();
    format!(
        "{} {day}{}, {}",
        date.format("%B"),
        ordinal_suffix(day),
        date.year()
    )
}
