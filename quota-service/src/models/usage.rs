//! Usage counter model and period computation.

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Usage counter row. One row per (tenant, category, period); lazily created
/// on first increment and never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UsageCounter {
    pub tenant_id: Uuid,
    pub category: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub count: i64,
}

/// A calendar-month counting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsagePeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl UsagePeriod {
    /// Period containing `now`: first instant of the calendar month through
    /// its last whole second. Guard reads and ledger increments must be
    /// computed from the same `now` snapshot so a request straddling a month
    /// rollover is checked and recorded against the same period.
    pub fn containing(now: DateTime<Utc>) -> Self {
        let start = Utc
            .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
            .single()
            .expect("first of month is always a valid UTC instant");

        let (next_year, next_month) = if now.month() == 12 {
            (now.year() + 1, 1)
        } else {
            (now.year(), now.month() + 1)
        };
        let next_start = Utc
            .with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0)
            .single()
            .expect("first of month is always a valid UTC instant");

        Self {
            start,
            end: next_start - Duration::seconds(1),
        }
    }

    pub fn current() -> Self {
        Self::containing(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn leap_year_february() {
        let period = UsagePeriod::containing(utc(2024, 2, 15, 12, 30, 0));
        assert_eq!(period.start, utc(2024, 2, 1, 0, 0, 0));
        assert_eq!(period.end, utc(2024, 2, 29, 23, 59, 59));
    }

    #[test]
    fn non_leap_year_february() {
        let period = UsagePeriod::containing(utc(2023, 2, 1, 0, 0, 0));
        assert_eq!(period.end, utc(2023, 2, 28, 23, 59, 59));
    }

    #[test]
    fn december_rolls_into_next_year() {
        let period = UsagePeriod::containing(utc(2025, 12, 31, 23, 59, 59));
        assert_eq!(period.start, utc(2025, 12, 1, 0, 0, 0));
        assert_eq!(period.end, utc(2025, 12, 31, 23, 59, 59));
    }

    #[test]
    fn period_is_deterministic_for_a_snapshot() {
        let now = utc(2026, 8, 30, 9, 0, 0);
        assert_eq!(UsagePeriod::containing(now), UsagePeriod::containing(now));
    }
}
