//! Learning-time aggregation.
//!
//! Turns raw presence sessions into per-day and per-month totals in a
//! fixed local timezone (Asia/Seoul):
//! - open sessions end at the injected "now"
//! - overlapping sessions are merged before counting
//! - sessions are clipped to the target month and split at local midnight

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use tracing::warn;

use crate::models::{local_midnight, DayTotal, Interval, MonthPeriod, MonthSummary, Session};

/// UTC offset of Asia/Seoul. Korea has not observed DST since 1988.
pub const SEOUL_OFFSET_SECS: i32 = 9 * 3600;

/// Default monthly target used for the progress percentage.
pub const DEFAULT_MAX_HOURS: u32 = 80;

/// The service's fixed timezone.
pub fn seoul() -> FixedOffset {
    FixedOffset::east_opt(SEOUL_OFFSET_SECS).expect("+09:00 is a valid offset")
}

/// Aggregate `sessions` into a summary of `period`.
///
/// Nothing after `now` is counted, so a month in progress only covers the
/// days up to today. Malformed sessions are logged and contribute nothing.
pub fn aggregate(
    sessions: &[Session],
    period: MonthPeriod,
    now: DateTime<Utc>,
    tz: &FixedOffset,
) -> MonthSummary {
    let (month_start, month_end) = period.bounds(tz);
    let window_end = month_end.min(now);
    if window_end <= month_start {
        return MonthSummary::empty(period);
    }

    let intervals: Vec<Interval> = sessions
        .iter()
        .filter_map(|session| match session.resolve(now) {
            Ok(interval) => Some(interval),
            Err(e) => {
                warn!("Skipping malformed session: {}", e);
                None
            }
        })
        .filter_map(|interval| interval.clamp(month_start, window_end))
        .collect();

    let mut per_day: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    for interval in merge_overlapping(intervals) {
        for (date, seconds) in split_by_day(interval, tz) {
            if period.contains_date(date) {
                *per_day.entry(date).or_insert(0) += seconds;
            }
        }
    }

    let days: Vec<DayTotal> = per_day
        .into_iter()
        .filter(|(_, seconds)| *seconds > 0)
        .map(|(date, seconds)| DayTotal { date, seconds })
        .collect();
    let total_seconds = days.iter().map(|d| d.seconds).sum();

    MonthSummary {
        year: period.year,
        month: period.month,
        total_seconds,
        days,
    }
}

/// Union of intervals, sorted by start. Touching intervals are joined.
pub fn merge_overlapping(mut intervals: Vec<Interval>) -> Vec<Interval> {
    intervals.retain(|i| !i.is_empty());
    intervals.sort_by_key(|i| (i.start, i.end));

    let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        match merged.last_mut() {
            Some(last) if interval.start <= last.end => {
                last.end = last.end.max(interval.end);
            }
            _ => merged.push(interval),
        }
    }
    merged
}

/// Lazily split an interval at local midnights into `(date, seconds)` pieces.
pub fn split_by_day(interval: Interval, tz: &FixedOffset) -> DaySplit {
    DaySplit {
        cursor: interval.start,
        end: interval.end,
        tz: *tz,
    }
}

/// Iterator returned by [`split_by_day`].
#[derive(Debug, Clone)]
pub struct DaySplit {
    cursor: DateTime<Utc>,
    end: DateTime<Utc>,
    tz: FixedOffset,
}

impl Iterator for DaySplit {
    type Item = (NaiveDate, i64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.end {
            return None;
        }

        let date = self.cursor.with_timezone(&self.tz).date_naive();
        let piece_end = match date.succ_opt() {
            Some(next_day) => local_midnight(next_day, &self.tz).min(self.end),
            None => self.end,
        };
        let seconds = (piece_end - self.cursor).num_seconds();
        self.cursor = piece_end;

        Some((date, seconds))
    }
}

/// Format seconds as `HH:MM:SS`. Hours are not wrapped; negatives clamp to zero.
pub fn format_hms(total_seconds: i64) -> String {
    let total_seconds = total_seconds.max(0);
    let h = total_seconds / 3600;
    let m = (total_seconds % 3600) / 60;
    let s = total_seconds % 60;
    format!("{:02}:{:02}:{:02}", h, m, s)
}

/// Share of the monthly target reached, in percent, rounded to 2 decimals.
pub fn target_percent(total_seconds: i64, max_hours: u32) -> f64 {
    if max_hours == 0 {
        return 0.0;
    }
    let ratio = total_seconds as f64 / (max_hours as f64 * 3600.0);
    (ratio * 10000.0).round() / 100.0
}
