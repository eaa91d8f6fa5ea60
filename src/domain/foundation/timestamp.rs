//! Timestamp value object for immutable points in time.

use chrono::{DateTime, Duration, Months, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a timestamp from a DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Checks if this timestamp is before another.
    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }

    /// Checks if this timestamp is after another.
    pub fn is_after(&self, other: &Timestamp) -> bool {
        self.0 > other.0
    }

    /// Returns the duration from another timestamp to this one.
    ///
    /// Returns negative duration if other is after self.
    pub fn duration_since(&self, other: &Timestamp) -> Duration {
        self.0.signed_duration_since(other.0)
    }

    /// Creates a new timestamp by adding the given duration.
    pub fn plus(&self, duration: Duration) -> Self {
        Self(self.0 + duration)
    }

    /// Creates a new timestamp by subtracting the given duration.
    pub fn minus(&self, duration: Duration) -> Self {
        Self(self.0 - duration)
    }

    /// Creates a new timestamp by adding the specified number of days.
    ///
    /// Negative values subtract days.
    pub fn add_days(&self, days: i64) -> Self {
        Self(self.0 + Duration::days(days))
    }

    /// Adds whole calendar months, clamping the day to the end of the target month.
    ///
    /// Jan 31 + 1 month is Feb 28 (or 29). Returns `None` only when the result
    /// would fall outside the representable range.
    pub fn add_calendar_months(&self, months: u32) -> Option<Self> {
        self.0.checked_add_months(Months::new(months)).map(Self)
    }

    /// RFC 3339 rendering with second precision, as sent to billing providers.
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> Timestamp {
        Timestamp::from_datetime(Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap())
    }

    #[test]
    fn timestamp_now_creates_current_time() {
        let before = Utc::now();
        let ts = Timestamp::now();
        let after = Utc::now();

        assert!(ts.as_datetime() >= &before);
        assert!(ts.as_datetime() <= &after);
    }

    #[test]
    fn ordering_helpers_agree_with_ord() {
        let earlier = at(2024, 1, 1);
        let later = at(2024, 1, 2);

        assert!(earlier.is_before(&later));
        assert!(later.is_after(&earlier));
        assert!(earlier < later);
    }

    #[test]
    fn add_days_moves_forward_and_back() {
        let ts = at(2024, 3, 10);
        assert_eq!(ts.add_days(5), at(2024, 3, 15));
        assert_eq!(ts.add_days(-10), at(2024, 2, 29));
    }

    #[test]
    fn calendar_months_keep_the_day_of_month() {
        assert_eq!(at(2024, 1, 15).add_calendar_months(1), Some(at(2024, 2, 15)));
        assert_eq!(at(2024, 1, 15).add_calendar_months(6), Some(at(2024, 7, 15)));
    }

    #[test]
    fn calendar_months_clamp_to_month_end() {
        assert_eq!(at(2024, 1, 31).add_calendar_months(1), Some(at(2024, 2, 29)));
        assert_eq!(at(2023, 1, 31).add_calendar_months(1), Some(at(2023, 2, 28)));
        assert_eq!(at(2024, 8, 31).add_calendar_months(3), Some(at(2024, 11, 30)));
    }

    #[test]
    fn rfc3339_uses_zulu_suffix() {
        assert_eq!(at(2024, 1, 15).to_rfc3339(), "2024-01-15T12:00:00Z");
    }

    #[test]
    fn timestamp_serializes_to_json() {
        let json = serde_json::to_string(&at(2024, 1, 15)).unwrap();
        assert!(json.contains("2024-01-15T12:00:00"));
    }
}
