//! Contracts for the persistence backend.
//!
//! The pipeline only ever talks to these traits; the Postgres adapter lives
//! in `roomfeed-db` and tests use in-memory fakes.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::products::{PostOutcome, Product, ProductRecord};
use crate::stats::DailyStats;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend cannot be reached or refuses our credentials. Always
    /// fatal for the current run.
    #[error("store {store} is unavailable: {reason}")]
    Unavailable { store: String, reason: String },

    /// A single read or write failed while the backend itself is reachable.
    #[error("store query failed: {0}")]
    Query(String),
}

impl StoreError {
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable { .. })
    }
}

/// Row store holding collected products, one logical location per category.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// All rows recorded under `category`, oldest first.
    async fn list_rows(&self, category: &str) -> Result<Vec<ProductRecord>, StoreError>;

    /// Every product URL currently recorded, across all categories.
    async fn known_urls(&self) -> Result<HashSet<String>, StoreError>;

    /// Record a product under `category`. Returns `false` when a row with the
    /// same URL already exists and nothing was written.
    async fn append_row(&self, category: &str, product: &Product) -> Result<bool, StoreError>;

    /// Rows not yet posted and not marked skipped, oldest `collected_at`
    /// first. Synthetic rows are left out unless `include_synthetic`.
    async fn list_unposted(&self, include_synthetic: bool)
        -> Result<Vec<ProductRecord>, StoreError>;

    /// Record the outcome of a publishing attempt for one row.
    ///
    /// `Success` sets the posted flag and timestamp; a row already posted is
    /// never posted again.
    async fn mark_posted(
        &self,
        row_id: i64,
        at: DateTime<Utc>,
        outcome: PostOutcome,
    ) -> Result<(), StoreError>;
}

/// Persisted per-day posting counters backing the daily quota.
#[async_trait]
pub trait DailyStatsStore: Send + Sync {
    /// Counters for `day`; zeroed if nothing was recorded yet.
    async fn load_day(&self, day: NaiveDate) -> Result<DailyStats, StoreError>;

    /// Atomically apply one attempt to `day` and return the updated counters.
    async fn record_attempt(
        &self,
        day: NaiveDate,
        outcome: PostOutcome,
        at: DateTime<Utc>,
    ) -> Result<DailyStats, StoreError>;

    /// The most recent `limit` days with any activity, newest first.
    async fn recent_days(&self, limit: u32) -> Result<Vec<DailyStats>, StoreError>;
}
