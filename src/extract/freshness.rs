//! Publication recency filter.
//!
//! Only the calendar date matters: `2026-01-01` and
//! `2026-01-01T23:59:00+01:00` are the same day. Anything that does not start
//! with a `YYYY-MM-DD` date is "not recent".

use chrono::{Local, NaiveDate};

/// Default recency window in days.
pub const DEFAULT_DAYS_LIMIT: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessFilter {
    days_limit: i64,
}

impl Default for FreshnessFilter {
    fn default() -> Self {
        Self::new(DEFAULT_DAYS_LIMIT)
    }
}

impl FreshnessFilter {
    pub fn new(days_limit: i64) -> Self {
        Self { days_limit }
    }

    pub fn days_limit(&self) -> i64 {
        self.days_limit
    }

    /// Whether `date` falls within the window, measured from today's local date.
    pub fn is_recent(&self, date: Option<&str>) -> bool {
        self.is_recent_on(date, Local::now().date_naive())
    }

    /// Accept iff `0 <= today - date <= days_limit` in whole calendar days.
    /// Future dates are rejected.
    pub fn is_recent_on(&self, date: Option<&str>, today: NaiveDate) -> bool {
        match date.and_then(calendar_date) {
            Some(published) => {
                let diff = (today - published).num_days();
                (0..=self.days_limit).contains(&diff)
            }
            None => false,
        }
    }
}

/// The leading `YYYY-MM-DD` of a date or timestamp string.
pub fn calendar_date(raw: &str) -> Option<NaiveDate> {
    let head = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// Reduce a date or timestamp to its `YYYY-MM-DD` part.
///
/// Strings without a `T` separator are cut to their first 10 characters.
pub fn normalize_date(raw: &str) -> String {
    let raw = raw.trim();
    match raw.split_once('T') {
        Some((day, _)) => day.to_string(),
        None => raw.chars().take(10).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    fn fmt(d: NaiveDate) -> String {
        d.format("%Y-%m-%d").to_string()
    }

    #[test]
    fn test_today_is_recent() {
        let f = FreshnessFilter::new(3);
        assert!(f.is_recent_on(Some(&fmt(today())), today()));
    }

    #[test]
    fn test_window_edges() {
        let f = FreshnessFilter::new(3);
        assert!(f.is_recent_on(Some(&fmt(today() - Duration::days(3))), today()));
        assert!(!f.is_recent_on(Some(&fmt(today() - Duration::days(4))), today()));
    }

    #[test]
    fn test_future_date_is_rejected() {
        let f = FreshnessFilter::new(3);
        assert!(!f.is_recent_on(Some(&fmt(today() + Duration::days(1))), today()));
    }

    #[test]
    fn test_missing_or_malformed_date_is_rejected() {
        let f = FreshnessFilter::new(3);
        assert!(!f.is_recent_on(Some("not-a-date"), today()));
        assert!(!f.is_recent_on(Some(""), today()));
        assert!(!f.is_recent_on(Some("2026-1"), today()));
        assert!(!f.is_recent_on(None, today()));
    }

    #[test]
    fn test_timestamp_with_offset_uses_calendar_date() {
        let f = FreshnessFilter::new(3);
        assert!(f.is_recent_on(Some("2026-10-17T23:30:00+01:00"), today()));
        assert!(f.is_recent_on(Some("2026-10-15 10:00"), today()));
    }

    #[test]
    fn test_is_recent_against_wall_clock() {
        let f = FreshnessFilter::default();
        let now = Local::now().date_naive();
        assert!(f.is_recent(Some(&fmt(now))));
        assert!(!f.is_recent(Some(&fmt(now - Duration::days(5)))));
        assert!(!f.is_recent(None));
    }

    #[test]
    fn test_normalize_date() {
        assert_eq!(normalize_date("2026-01-01T12:00:00+01:00"), "2026-01-01");
        assert_eq!(normalize_date("2026-01-01 10:00"), "2026-01-01");
        assert_eq!(normalize_date(" 2026-01-01 "), "2026-01-01");
    }
}
