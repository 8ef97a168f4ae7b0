//! Database operations for `daily_post_stats`.

use chrono::{DateTime, NaiveDate, Utc};
use roomfeed_core::{DailyStats, PostOutcome};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `daily_post_stats` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DailyStatsRow {
    pub stat_date: NaiveDate,
    pub attempted: i32,
    pub succeeded: i32,
    pub failed: i32,
    pub last_post_at: Option<DateTime<Utc>>,
}

impl From<DailyStatsRow> for DailyStats {
    fn from(row: DailyStatsRow) -> Self {
        // CHECK constraints keep the counters non-negative.
        let count = |v: i32| u32::try_from(v).unwrap_or(0);
        DailyStats {
            date: row.stat_date,
            attempted: count(row.attempted),
            succeeded: count(row.succeeded),
            failed: count(row.failed),
            last_post_at: row.last_post_at,
        }
    }
}

/// Fetches the counters for `day`, if any attempt was recorded.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_daily_stats(
    pool: &PgPool,
    day: NaiveDate,
) -> Result<Option<DailyStatsRow>, DbError> {
    let row = sqlx::query_as::<_, DailyStatsRow>(
        "SELECT stat_date, attempted, succeeded, failed, last_post_at \
         FROM daily_post_stats \
         WHERE stat_date = $1",
    )
    .bind(day)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Applies one attempt to the counters for `day` in a single statement,
/// creating the row on the first attempt of the day.
///
/// `skipped` outcomes leave the counters unchanged but still materialise the
/// row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn record_post_attempt(
    pool: &PgPool,
    day: NaiveDate,
    outcome: PostOutcome,
    at: DateTime<Utc>,
) -> Result<DailyStatsRow, DbError> {
    let (attempted, succeeded, failed): (i32, i32, i32) = match outcome {
        PostOutcome::Success => (1, 1, 0),
        PostOutcome::Failure => (1, 0, 1),
        PostOutcome::Skipped => (0, 0, 0),
    };
    let last_post_at = (outcome == PostOutcome::Success).then_some(at);

    let row = sqlx::query_as::<_, DailyStatsRow>(
        "INSERT INTO daily_post_stats \
             (stat_date, attempted, succeeded, failed, last_post_at) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (stat_date) DO UPDATE SET \
             attempted    = daily_post_stats.attempted + EXCLUDED.attempted, \
             succeeded    = daily_post_stats.succeeded + EXCLUDED.succeeded, \
             failed       = daily_post_stats.failed + EXCLUDED.failed, \
             last_post_at = COALESCE(EXCLUDED.last_post_at, daily_post_stats.last_post_at), \
             updated_at   = NOW() \
         RETURNING stat_date, attempted, succeeded, failed, last_post_at",
    )
    .bind(day)
    .bind(attempted)
    .bind(succeeded)
    .bind(failed)
    .bind(last_post_at)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Returns the most recent `limit` days with recorded activity, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_recent_daily_stats(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<DailyStatsRow>, DbError> {
    let rows = sqlx::query_as::<_, DailyStatsRow>(
        "SELECT stat_date, attempted, succeeded, failed, last_post_at \
         FROM daily_post_stats \
         ORDER BY stat_date DESC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
