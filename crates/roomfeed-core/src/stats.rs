use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::products::PostOutcome;

/// Posting counters for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub attempted: u32,
    pub succeeded: u32,
    pub failed: u32,
    pub last_post_at: Option<DateTime<Utc>>,
}

impl DailyStats {
    /// Zeroed counters for `date`.
    #[must_use]
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            attempted: 0,
            succeeded: 0,
            failed: 0,
            last_post_at: None,
        }
    }

    /// Posts still allowed today under `daily_limit`.
    ///
    /// Only successful posts consume quota.
    #[must_use]
    pub fn remaining(&self, daily_limit: u32) -> u32 {
        daily_limit.saturating_sub(self.succeeded)
    }

    /// Apply one attempt to the counters. `Skipped` does not count as an
    /// attempt.
    pub fn record(&mut self, outcome: PostOutcome, at: DateTime<Utc>) {
        match outcome {
            PostOutcome::Success => {
                self.attempted += 1;
                self.succeeded += 1;
                self.last_post_at = Some(at);
            }
            PostOutcome::Failure => {
                self.attempted += 1;
                self.failed += 1;
            }
            PostOutcome::Skipped => {}
        }
    }
}

/// The calendar day `now` falls on at the given UTC offset.
///
/// Offsets outside ±23h fall back to UTC; configuration rejects them before
/// they get here.
#[must_use]
pub fn calendar_day(now: DateTime<Utc>, utc_offset_hours: i32) -> NaiveDate {
    let offset = FixedOffset::east_opt(utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix());
    now.with_timezone(&offset).date_naive()
}
