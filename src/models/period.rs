//! Calendar months in a fixed local timezone.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A calendar year + month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthPeriod {
    pub year: i32,
    pub month: u32,
}

impl MonthPeriod {
    /// Returns `None` when `month` is not in `1..=12`.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    /// The month that `instant` falls in, as seen from `tz`.
    pub fn containing(instant: DateTime<Utc>, tz: &FixedOffset) -> Self {
        let local = instant.with_timezone(tz);
        Self {
            year: local.year(),
            month: local.month(),
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn last_day(&self) -> NaiveDate {
        self.next()
            .first_day()
            .pred_opt()
            .unwrap_or_else(|| self.first_day())
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// UTC instants of local midnight on the 1st of this month and of the next.
    pub fn bounds(&self, tz: &FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            local_midnight(self.first_day(), tz),
            local_midnight(self.next().first_day(), tz),
        )
    }
}

impl std::fmt::Display for MonthPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Midnight at the start of `date` in `tz`, as a UTC instant.
pub fn local_midnight(date: NaiveDate, tz: &FixedOffset) -> DateTime<Utc> {
    let midnight = date.and_hms_opt(0, 0, 0).expect("00:00:00 is a valid time");
    Utc.from_utc_datetime(&midnight) - Duration::seconds(i64::from(tz.local_minus_utc()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seoul() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    #[test]
    fn test_new_rejects_bad_month() {
        assert!(MonthPeriod::new(2024, 0).is_none());
        assert!(MonthPeriod::new(2024, 13).is_none());
        assert!(MonthPeriod::new(2024, 12).is_some());
    }

    #[test]
    fn test_last_day_handles_leap_year() {
        let feb = MonthPeriod::new(2024, 2).unwrap();
        assert_eq!(feb.last_day(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        let dec = MonthPeriod::new(2023, 12).unwrap();
        assert_eq!(dec.last_day(), NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
    }

    #[test]
    fn test_next_wraps_year() {
        let dec = MonthPeriod::new(2023, 12).unwrap();
        assert_eq!(dec.next(), MonthPeriod::new(2024, 1).unwrap());
    }

    #[test]
    fn test_containing_uses_local_time() {
        // 2024-01-31 16:00 UTC is 2024-02-01 01:00 in Seoul
        let instant = Utc.with_ymd_and_hms(2024, 1, 31, 16, 0, 0).unwrap();
        assert_eq!(
            MonthPeriod::containing(instant, &seoul()),
            MonthPeriod::new(2024, 2).unwrap()
        );
    }

    #[test]
    fn test_bounds_are_local_midnight() {
        let jan = MonthPeriod::new(2024, 1).unwrap();
        let (start, end) = jan.bounds(&seoul());
        assert_eq!(start, Utc.with_ymd_and_hms(2023, 12, 31, 15, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 1, 31, 15, 0, 0).unwrap());
    }

    #[test]
    fn test_display() {
        assert_eq!(MonthPeriod::new(2024, 3).unwrap().to_string(), "2024-03");
    }
}
