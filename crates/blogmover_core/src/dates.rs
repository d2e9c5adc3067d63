//! Date layouts used by the source platforms.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};

/// `17 Mar 2009 21:05`, after month names have been translated.
pub const DIARY_POST: &str = "%d %b %Y %H:%M";
/// `2009-03-17 в 21:05`
pub const DIARY_COMMENT: &str = "%Y-%m-%d в %H:%M";
/// `2020-03-17T19:58:16+0000`
pub const ISO_NUMERIC_OFFSET: &str = "%Y-%m-%dT%H:%M:%S%z";
/// `2008-11-02 14:10:38`
pub const JOURNAL_POST: &str = "%Y-%m-%d %H:%M:%S";
/// `2008-11-02 03:04 pm`
pub const JOURNAL_COMMENT: &str = "%Y-%m-%d %I:%M %p";
/// `Mar 17 2020`
pub const ANNOTATION: &str = "%b %d %Y";

const RUSSIAN_MONTHS: [(&str, &str); 12] = [
    ("января", "Jan"),
    ("февраля", "Feb"),
    ("марта", "Mar"),
    ("апреля", "Apr"),
    ("мая", "May"),
    ("июня", "Jun"),
    ("июля", "Jul"),
    ("августа", "Aug"),
    ("сентября", "Sep"),
    ("октября", "Oct"),
    ("ноября", "Nov"),
    ("декабря", "Dec"),
];

/// Replace spelled-out Russian (genitive) month names with English abbreviations.
pub fn translate_russian_months(date: &str) -> String {
    RUSSIAN_MONTHS
        .iter()
        .fold(date.to_string(), |acc, (ru, en)| acc.replace(ru, en))
}

/// Parse a layout without zone information as wall-clock time at `offset`.
pub fn parse_local(text: &str, layout: &str, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let naive = NaiveDateTime::parse_from_str(text.trim(), layout).ok()?;
    offset.from_local_datetime(&naive).single()
}

pub fn parse_with_offset(text: &str, layout: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(text.trim(), layout).ok()
}

/// Rendering used for `wm-received` values.
pub fn format_received(date: &DateTime<FixedOffset>) -> String {
    date.format("%Y-%m-%d %H:%M:%S %z").to_string()
}

/// `Mar 17 2020` becomes `2020-03-17`; anything else is returned unchanged.
pub fn normalize_annotation_date(text: &str) -> String {
    match NaiveDate::parse_from_str(text, ANNOTATION) {
        Ok(date) => date.format("%Y-%m-%d").to_string(),
        Err(_) => text.to_string(),
    }
}
