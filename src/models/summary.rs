//! Aggregated learning time.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::MonthPeriod;

/// Total presence on one local calendar day, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayTotal {
    pub date: NaiveDate,
    pub seconds: i64,
}

/// Per-day breakdown and total for one calendar month.
///
/// `days` is sorted by date and only lists days with recorded activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthSummary {
    pub year: i32,
    pub month: u32,
    pub total_seconds: i64,
    pub days: Vec<DayTotal>,
}

impl MonthSummary {
    pub fn empty(period: MonthPeriod) -> Self {
        Self {
            year: period.year,
            month: period.month,
            total_seconds: 0,
            days: Vec::new(),
        }
    }

    pub fn period(&self) -> Option<MonthPeriod> {
        MonthPeriod::new(self.year, self.month)
    }

    /// Seconds recorded on `date`, zero when the day has no activity.
    pub fn seconds_on(&self, date: NaiveDate) -> i64 {
        self.days
            .binary_search_by_key(&date, |d| d.date)
            .map(|i| self.days[i].seconds)
            .unwrap_or(0)
    }

    /// Every day from the 1st through `through` (capped at month end),
    /// including days with no activity.
    pub fn days_through(&self, through: NaiveDate) -> Vec<DayTotal> {
        let Some(period) = self.period() else {
            return Vec::new();
        };
        let last = through.min(period.last_day());

        period
            .first_day()
            .iter_days()
            .take_while(|d| *d <= last)
            .map(|date| DayTotal {
                date,
                seconds: self.seconds_on(date),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn sample() -> MonthSummary {
        MonthSummary {
            year: 2024,
            month: 1,
            total_seconds: 5400,
            days: vec![
                DayTotal {
                    date: day(2),
                    seconds: 3600,
                },
                DayTotal {
                    date: day(4),
                    seconds: 1800,
                },
            ],
        }
    }

    #[test]
    fn test_seconds_on() {
        let summary = sample();
        assert_eq!(summary.seconds_on(day(2)), 3600);
        assert_eq!(summary.seconds_on(day(3)), 0);
    }

    #[test]
    fn test_days_through_zero_fills() {
        let days = sample().days_through(day(5));
        assert_eq!(days.len(), 5);
        assert_eq!(days[0].seconds, 0);
        assert_eq!(days[1].seconds, 3600);
        assert_eq!(days[2].seconds, 0);
        assert_eq!(days[3].seconds, 1800);
    }

    #[test]
    fn test_days_through_caps_at_month_end() {
        let through = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        assert_eq!(sample().days_through(through).len(), 31);
    }

    #[test]
    fn test_days_through_before_month_is_empty() {
        let through = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        assert!(sample().days_through(through).is_empty());
    }
}
