//! Timestamp window calculation.
//!
//! Occurred-at timestamps in tickets are wall-clock JST (UTC+9) without an
//! offset marker. Each one becomes a ±2 minute window in epoch seconds.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::{ScanError, ScanResult};

/// Offset of the ticket timestamps, in seconds east of UTC
pub const SOURCE_OFFSET_SECS: i32 = 9 * 3600;
/// Half width of the window around an occurrence
pub const HALF_WINDOW_SECS: i64 = 2 * 60;

static TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})-(\d{2})-(\d{2}) (\d{2}):(\d{2}):(\d{2})$").expect("valid timestamp pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub from_epoch_seconds: i64,
    pub to_epoch_seconds: i64,
}

impl TimeWindow {
    pub fn around(instant: i64) -> Self {
        Self {
            from_epoch_seconds: instant - HALF_WINDOW_SECS,
            to_epoch_seconds: instant + HALF_WINDOW_SECS,
        }
    }

    pub fn span_seconds(&self) -> i64 {
        self.to_epoch_seconds - self.from_epoch_seconds
    }
}

/// Parse `YYYY-MM-DD HH:MM:SS` as UTC+9 wall-clock time.
///
/// Surrounding whitespace and one pair of square brackets are tolerated,
/// since tickets often write `発生時刻: [2025-09-29 05:36:04]`.
pub fn parse_occurred_at(text: &str) -> ScanResult<DateTime<FixedOffset>> {
    let invalid = || ScanError::InvalidTimestamp(text.to_string());

    let trimmed = text.trim();
    let trimmed = trimmed
        .strip_prefix('[')
        .and_then(|inner| inner.strip_suffix(']'))
        .unwrap_or(trimmed)
        .trim();

    let caps = TIMESTAMP.captures(trimmed).ok_or_else(invalid)?;
    let component = |i: usize| -> ScanResult<u32> {
        caps.get(i).and_then(|m| m.as_str().parse().ok()).ok_or_else(invalid)
    };

    let year = i32::try_from(component(1)?).map_err(|_| invalid())?;
    let date = NaiveDate::from_ymd_opt(year, component(2)?, component(3)?).ok_or_else(invalid)?;
    let time =
        NaiveTime::from_hms_opt(component(4)?, component(5)?, component(6)?).ok_or_else(invalid)?;

    let offset = FixedOffset::east_opt(SOURCE_OFFSET_SECS).ok_or_else(invalid)?;
    offset.from_local_datetime(&NaiveDateTime::new(date, time)).single().ok_or_else(invalid)
}

/// Window of ±2 minutes around the occurred-at timestamp
pub fn window_for(text: &str) -> ScanResult<TimeWindow> {
    let instant = parse_occurred_at(text)?;
    Ok(TimeWindow::around(instant.timestamp()))
}
