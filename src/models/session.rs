//! Presence sessions as reported by the location-tracking API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A session that cannot be turned into a valid interval.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("session ends before it starts ({start} > {end})")]
    EndBeforeStart {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// A raw location record from the provider.
///
/// Every field is optional because the provider occasionally omits them;
/// records without `begin_at` carry no usable time information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub id: Option<u64>,

    /// Workstation hostname (e.g. "c1r2s3")
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub begin_at: Option<DateTime<Utc>>,

    /// Absent while the user is still logged in
    #[serde(default)]
    pub end_at: Option<DateTime<Utc>>,
}

impl Location {
    /// Convert to a session, skipping records with no start time.
    pub fn to_session(&self) -> Option<Session> {
        self.begin_at.map(|start| Session::new(start, self.end_at))
    }
}

/// A contiguous presence interval. `end` is `None` while ongoing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    pub fn closed(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self::new(start, Some(end))
    }

    pub fn ongoing(start: DateTime<Utc>) -> Self {
        Self::new(start, None)
    }

    /// Resolve against `now`: open sessions end at `now`, and nothing
    /// extends past `now`. A start in the future yields an empty interval.
    pub fn resolve(&self, now: DateTime<Utc>) -> Result<Interval, ValidationError> {
        if let Some(end) = self.end {
            if end < self.start {
                return Err(ValidationError::EndBeforeStart {
                    start: self.start,
                    end,
                });
            }
        }

        let end = self.end.unwrap_or(now).min(now);
        let start = self.start.min(end);
        Ok(Interval { start, end })
    }
}

/// A resolved, half-open `[start, end)` span with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    pub fn seconds(&self) -> i64 {
        (self.end - self.start).num_seconds()
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Intersection with `[lo, hi)`, or `None` when nothing remains.
    pub fn clamp(&self, lo: DateTime<Utc>, hi: DateTime<Utc>) -> Option<Interval> {
        let clamped = Interval {
            start: self.start.max(lo),
            end: self.end.min(hi),
        };
        (!clamped.is_empty()).then_some(clamped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, h, m, 0).unwrap()
    }

    #[test]
    fn test_resolve_closed_session() {
        let session = Session::closed(utc(10, 0), utc(12, 0));
        let interval = session.resolve(utc(23, 0)).unwrap();
        assert_eq!(interval.seconds(), 7200);
    }

    #[test]
    fn test_resolve_ongoing_uses_now() {
        let session = Session::ongoing(utc(10, 0));
        let interval = session.resolve(utc(10, 30)).unwrap();
        assert_eq!(interval.end, utc(10, 30));
        assert_eq!(interval.seconds(), 1800);
    }

    #[test]
    fn test_resolve_future_start_is_empty() {
        let session = Session::ongoing(utc(15, 0));
        let interval = session.resolve(utc(10, 0)).unwrap();
        assert!(interval.is_empty());
        assert_eq!(interval.seconds(), 0);
    }

    #[test]
    fn test_resolve_end_before_start_fails() {
        let session = Session::closed(utc(12, 0), utc(10, 0));
        assert!(matches!(
            session.resolve(utc(23, 0)),
            Err(ValidationError::EndBeforeStart { .. })
        ));
    }

    #[test]
    fn test_clamp() {
        let interval = Interval {
            start: utc(8, 0),
            end: utc(12, 0),
        };
        let clamped = interval.clamp(utc(9, 0), utc(10, 0)).unwrap();
        assert_eq!(clamped.seconds(), 3600);
        assert!(interval.clamp(utc(13, 0), utc(14, 0)).is_none());
    }

    #[test]
    fn test_location_deserialization() {
        let json = r#"{
            "id": 42,
            "host": "c1r2s3",
            "begin_at": "2024-01-15T14:00:00.000Z",
            "end_at": null
        }"#;
        let location: Location = serde_json::from_str(json).unwrap();
        assert_eq!(location.host.as_deref(), Some("c1r2s3"));

        let session = location.to_session().unwrap();
        assert_eq!(session.start, utc(14, 0));
        assert!(session.end.is_none());
    }

    #[test]
    fn test_location_without_begin_is_skipped() {
        let location: Location = serde_json::from_str(r#"{"id": 1}"#).unwrap();
        assert!(location.to_session().is_none());
    }
}
