//! TIME_WINDOW: local time-of-day window, optionally restricted to a set
//! of weekdays, with midnight-crossing support.

use crate::scalar::Context;
use chrono::{DateTime, Datelike, NaiveTime, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindowMatcher {
    pub tz_name: String,
    pub tz: Tz,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub days_of_week: Option<HashSet<Weekday>>,
}

impl TimeWindowMatcher {
    /// `wall_clock_now` is the fallback used when `ctx.now()` is absent.
    pub fn evaluate(&self, ctx: &Context, wall_clock_now: DateTime<Utc>) -> bool {
        let now_utc = ctx.now().unwrap_or(wall_clock_now);
        let local = now_utc.with_timezone(&self.tz);
        let day = local.weekday();

        if let Some(days) = &self.days_of_week {
            if !days.contains(&day) {
                return false;
            }
        }

        let t = local.time();
        if self.start <= self.end {
            t >= self.start && t <= self.end
        } else {
            // Crosses midnight: match the tail of today or the head of
            // tomorrow's window.
            t >= self.start || t <= self.end
        }
    }
}

/// Parse `HH:MM[:SS]` into a `NaiveTime`.
pub fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

pub fn format_time_of_day(t: &NaiveTime) -> String {
    format!("{:02}:{:02}:{:02}", t.hour(), t.minute(), t.second())
}

pub fn parse_weekday(raw: &str) -> Option<Weekday> {
    match raw.to_lowercase().as_str() {
        "mon" => Some(Weekday::Mon),
        "tue" => Some(Weekday::Tue),
        "wed" => Some(Weekday::Wed),
        "thu" => Some(Weekday::Thu),
        "fri" => Some(Weekday::Fri),
        "sat" => Some(Weekday::Sat),
        "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

pub fn format_weekday(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn window(start: &str, end: &str) -> TimeWindowMatcher {
        TimeWindowMatcher {
            tz_name: "America/Sao_Paulo".to_string(),
            tz: "America/Sao_Paulo".parse().unwrap(),
            start: parse_time_of_day(start).unwrap(),
            end: parse_time_of_day(end).unwrap(),
            days_of_week: None,
        }
    }

    #[test]
    fn midnight_crossing_matches_late_evening() {
        let m = window("22:00", "06:00");
        // 2024-01-01T23:30:00-03:00 == 2024-01-02T02:30:00Z
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 2, 30, 0).unwrap();
        assert!(m.evaluate(&Context::new(), now));
    }

    #[test]
    fn midnight_crossing_matches_early_morning() {
        let m = window("22:00", "06:00");
        // 2024-01-01T05:00:00-03:00 == 2024-01-01T08:00:00Z
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        assert!(m.evaluate(&Context::new(), now));
    }

    #[test]
    fn midnight_crossing_excludes_midday() {
        let m = window("22:00", "06:00");
        // 2024-01-01T12:00:00-03:00 == 2024-01-01T15:00:00Z
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 15, 0, 0).unwrap();
        assert!(!m.evaluate(&Context::new(), now));
    }

    #[test]
    fn non_crossing_window_is_a_simple_range() {
        let m = window("09:00", "17:00");
        let inside = Utc.with_ymd_and_hms(2024, 1, 1, 15, 0, 0).unwrap(); // 12:00 local
        let outside = Utc.with_ymd_and_hms(2024, 1, 1, 3, 0, 0).unwrap(); // 00:00 local
        assert!(m.evaluate(&Context::new(), inside));
        assert!(!m.evaluate(&Context::new(), outside));
    }

    #[test]
    fn days_of_week_filter_excludes_other_days() {
        let mut m = window("00:00", "23:59:59");
        let mut days = HashSet::new();
        days.insert(Weekday::Mon);
        m.days_of_week = Some(days);

        // 2024-01-01 is a Monday.
        let monday = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let tuesday = Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap();
        assert!(m.evaluate(&Context::new(), monday));
        assert!(!m.evaluate(&Context::new(), tuesday));
    }
}
