//! Trigger evaluation — when does a notice fire next?
//!
//! Two shapes: a one-off absolute timestamp, or a weekly day + time slot.
//! All evaluation happens against the process-local wall clock. DST is
//! taken as-is: a slot falling inside a skipped hour resolves to the next
//! representable instant, a repeated hour fires on its first occurrence.

use chrono::{DateTime, Datelike, Duration, Local, LocalResult, NaiveTime, TimeZone, Weekday};
use serde::{Deserialize, Serialize};

/// When a notice fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Trigger {
    /// Fire once at an absolute time. A time already in the past fires
    /// immediately (boot-time catch-up of a missed one-off notice).
    Once { at: DateTime<Local> },
    /// Fire every week on the given day at the given time of day.
    Weekly { day: Weekday, at: NaiveTime },
}

impl Trigger {
    /// Compute the next occurrence strictly after `after`.
    ///
    /// For `Once` this is simply the stored timestamp, even if it has
    /// passed — the delay computation clamps to zero so overdue notices
    /// fire right away instead of never.
    ///
    /// For `Weekly`, if `after` falls on the target weekday but the time
    /// of day has already passed (or is exactly now), roll to next week.
    pub fn next_occurrence(&self, after: DateTime<Local>) -> DateTime<Local> {
        match self {
            Trigger::Once { at } => *at,
            Trigger::Weekly { day, at } => {
                let days_ahead = (day.num_days_from_monday() + 7
                    - after.weekday().num_days_from_monday())
                    % 7;
                let days_ahead = if days_ahead == 0 && *at <= after.time() {
                    7
                } else {
                    days_ahead
                };
                let date = after.date_naive() + Duration::days(i64::from(days_ahead));
                resolve_local(date.and_time(*at))
            }
        }
    }

    /// Sleep duration from `now` until the next occurrence. Past instants
    /// clamp to zero.
    pub fn delay_from(&self, now: DateTime<Local>) -> std::time::Duration {
        (self.next_occurrence(now) - now)
            .to_std()
            .unwrap_or(std::time::Duration::ZERO)
    }

    /// True for triggers that re-arm after firing.
    pub fn is_recurring(&self) -> bool {
        matches!(self, Trigger::Weekly { .. })
    }
}

/// Resolve a naive local datetime to a concrete instant.
/// Ambiguous (repeated DST hour): first occurrence.
/// Nonexistent (skipped DST hour): shift forward one hour.
fn resolve_local(naive: chrono::NaiveDateTime) -> DateTime<Local> {
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(first, _) => first,
        LocalResult::None => resolve_local(naive + Duration::hours(1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2026-02-22 is a Sunday.
    fn sunday(h: u32, m: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 2, 22, h, m, 0).unwrap()
    }

    #[test]
    fn test_weekly_later_this_week() {
        let t = Trigger::Weekly {
            day: Weekday::Wed,
            at: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        };
        let next = t.next_occurrence(sunday(10, 0));
        assert_eq!(next, Local.with_ymd_and_hms(2026, 2, 25, 18, 0, 0).unwrap());
    }

    #[test]
    fn test_weekly_same_day_time_not_passed() {
        let t = Trigger::Weekly {
            day: Weekday::Sun,
            at: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        };
        let next = t.next_occurrence(sunday(10, 0));
        assert_eq!(next, sunday(18, 0));
    }

    #[test]
    fn test_weekly_same_day_time_passed_rolls_a_week() {
        let t = Trigger::Weekly {
            day: Weekday::Sun,
            at: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        };
        let next = t.next_occurrence(sunday(10, 0));
        assert_eq!(next, Local.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_weekly_exact_boundary_rolls_a_week() {
        let t = Trigger::Weekly {
            day: Weekday::Sun,
            at: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        };
        let next = t.next_occurrence(sunday(10, 0));
        assert_eq!(next, Local.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_once_in_the_past_has_zero_delay() {
        let t = Trigger::Once {
            at: Local::now() - Duration::hours(1),
        };
        assert_eq!(t.delay_from(Local::now()), std::time::Duration::ZERO);
    }

    #[test]
    fn test_once_in_the_future_keeps_its_instant() {
        let at = sunday(15, 30);
        let t = Trigger::Once { at };
        assert_eq!(t.next_occurrence(sunday(10, 0)), at);
    }

    #[test]
    fn test_recurring_flag() {
        assert!(Trigger::Weekly {
            day: Weekday::Mon,
            at: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        }
        .is_recurring());
        assert!(!Trigger::Once { at: Local::now() }.is_recurring());
    }
}
