//! In-memory fakes for the store, acquisition and session seams.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use roomfeed_core::{
    AcquisitionTier, DailyStats, DailyStatsStore, PostOutcome, Product, ProductRecord,
    ProductStore, StoreError,
};
use roomfeed_scraper::{AcquisitionStrategy, ScraperError};
use roomfeed_session::{PostRequest, PostingSession, SessionError};

pub(crate) fn product(url: &str, tier: AcquisitionTier) -> Product {
    Product {
        title: format!("title for {url}"),
        url: url.to_string(),
        price_yen: Some(1_980),
        shop_name: "shop".to_string(),
        rating: None,
        review_count: None,
        image_url: None,
        caption: format!("caption for {url}"),
        tier,
    }
}

pub(crate) fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap()
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum FailMode {
    Unavailable,
    Query,
}

impl FailMode {
    fn error(self) -> StoreError {
        match self {
            FailMode::Unavailable => StoreError::Unavailable {
                store: "memory".to_string(),
                reason: "connection refused".to_string(),
            },
            FailMode::Query => StoreError::Query("injected".to_string()),
        }
    }
}

#[derive(Default)]
struct Inner {
    rows: Vec<ProductRecord>,
    stats: BTreeMap<NaiveDate, DailyStats>,
    append_failures: HashMap<String, FailMode>,
    known_urls_failure: Option<FailMode>,
    record_failure: Option<FailMode>,
    mark_failure: Option<(PostOutcome, FailMode)>,
}

/// Row and stats store held in memory. Rows get ids in insertion order.
#[derive(Default)]
pub(crate) struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    /// Seeds a row whose `collected_at` is `minutes_ago` before [`base_time`].
    pub(crate) fn seed(&self, category: &str, product: Product, minutes_ago: i64) -> i64 {
        let mut inner = self.lock();
        let id = i64::try_from(inner.rows.len()).unwrap() + 1;
        inner.rows.push(ProductRecord {
            id,
            category: category.to_string(),
            product,
            collected_at: base_time() - Duration::minutes(minutes_ago),
            posted: false,
            posted_at: None,
            post_outcome: None,
            last_attempt_at: None,
        });
        id
    }

    pub(crate) fn seed_stats(&self, stats: DailyStats) {
        self.lock().stats.insert(stats.date, stats);
    }

    pub(crate) fn fail_append_of(&self, url: &str, mode: FailMode) {
        self.lock().append_failures.insert(url.to_string(), mode);
    }

    pub(crate) fn fail_known_urls(&self, mode: FailMode) {
        self.lock().known_urls_failure = Some(mode);
    }

    pub(crate) fn fail_record_attempt(&self, mode: FailMode) {
        self.lock().record_failure = Some(mode);
    }

    /// Fails `mark_posted` calls that record `outcome`.
    pub(crate) fn fail_mark_posted(&self, outcome: PostOutcome, mode: FailMode) {
        self.lock().mark_failure = Some((outcome, mode));
    }

    pub(crate) fn rows(&self) -> Vec<ProductRecord> {
        self.lock().rows.clone()
    }

    pub(crate) fn row(&self, id: i64) -> ProductRecord {
        self.lock()
            .rows
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .unwrap()
    }

    pub(crate) fn stats_for(&self, day: NaiveDate) -> DailyStats {
        self.lock()
            .stats
            .get(&day)
            .cloned()
            .unwrap_or_else(|| DailyStats::empty(day))
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn list_rows(&self, category: &str) -> Result<Vec<ProductRecord>, StoreError> {
        Ok(self
            .lock()
            .rows
            .iter()
            .filter(|r| r.category == category)
            .cloned()
            .collect())
    }

    async fn known_urls(&self) -> Result<HashSet<String>, StoreError> {
        let inner = self.lock();
        if let Some(mode) = inner.known_urls_failure {
            return Err(mode.error());
        }
        Ok(inner.rows.iter().map(|r| r.product.url.clone()).collect())
    }

    async fn append_row(&self, category: &str, product: &Product) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        if let Some(mode) = inner.append_failures.get(&product.url) {
            return Err(mode.error());
        }
        if inner.rows.iter().any(|r| r.product.url == product.url) {
            return Ok(false);
        }
        let id = i64::try_from(inner.rows.len()).unwrap() + 1;
        inner.rows.push(ProductRecord {
            id,
            category: category.to_string(),
            product: product.clone(),
            collected_at: base_time() + Duration::seconds(id),
            posted: false,
            posted_at: None,
            post_outcome: None,
            last_attempt_at: None,
        });
        Ok(true)
    }

    async fn list_unposted(
        &self,
        include_synthetic: bool,
    ) -> Result<Vec<ProductRecord>, StoreError> {
        let mut rows: Vec<ProductRecord> = self
            .lock()
            .rows
            .iter()
            .filter(|r| !r.posted && r.post_outcome != Some(PostOutcome::Skipped))
            .filter(|r| include_synthetic || !r.product.is_synthetic())
            .cloned()
            .collect();
        rows.sort_by_key(|r| (r.collected_at, r.id));
        Ok(rows)
    }

    async fn mark_posted(
        &self,
        row_id: i64,
        at: DateTime<Utc>,
        outcome: PostOutcome,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if let Some((failing, mode)) = inner.mark_failure {
            if failing == outcome {
                return Err(mode.error());
            }
        }
        let row = inner
            .rows
            .iter_mut()
            .find(|r| r.id == row_id)
            .ok_or_else(|| StoreError::Query(format!("row {row_id} not found")))?;
        if row.posted {
            return Err(StoreError::Query(format!("row {row_id} already posted")));
        }
        row.last_attempt_at = Some(at);
        row.post_outcome = Some(outcome);
        if outcome == PostOutcome::Success {
            row.posted = true;
            row.posted_at = Some(at);
        }
        Ok(())
    }
}

#[async_trait]
impl DailyStatsStore for MemoryStore {
    async fn load_day(&self, day: NaiveDate) -> Result<DailyStats, StoreError> {
        Ok(self.stats_for(day))
    }

    async fn record_attempt(
        &self,
        day: NaiveDate,
        outcome: PostOutcome,
        at: DateTime<Utc>,
    ) -> Result<DailyStats, StoreError> {
        let mut inner = self.lock();
        if let Some(mode) = inner.record_failure {
            return Err(mode.error());
        }
        let stats = inner
            .stats
            .entry(day)
            .or_insert_with(|| DailyStats::empty(day));
        stats.record(outcome, at);
        Ok(stats.clone())
    }

    async fn recent_days(&self, limit: u32) -> Result<Vec<DailyStats>, StoreError> {
        Ok(self
            .lock()
            .stats
            .values()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

/// Acquisition strategy returning canned products per keyword. Keywords
/// without an entry produce nothing.
pub(crate) struct FakeTier {
    pub tier: AcquisitionTier,
    pub by_keyword: HashMap<String, Vec<Product>>,
}

impl FakeTier {
    pub(crate) fn new(tier: AcquisitionTier) -> Self {
        Self {
            tier,
            by_keyword: HashMap::new(),
        }
    }

    pub(crate) fn with(mut self, keyword: &str, urls: &[&str]) -> Self {
        let products = urls.iter().map(|u| product(u, self.tier)).collect();
        self.by_keyword.insert(keyword.to_string(), products);
        self
    }
}

#[async_trait]
impl AcquisitionStrategy for FakeTier {
    fn tier(&self) -> AcquisitionTier {
        self.tier
    }

    async fn attempt(&self, keyword: &str, _desired: usize) -> Result<Vec<Product>, ScraperError> {
        Ok(self.by_keyword.get(keyword).cloned().unwrap_or_default())
    }
}

/// What a [`FakeSession`] saw, shared with the test after the session is
/// handed to the orchestrator.
#[derive(Debug, Default)]
pub(crate) struct SessionLog {
    pub logins: usize,
    pub closes: usize,
    pub posted: Vec<(String, tokio::time::Instant)>,
}

pub(crate) struct FakeSession {
    pub log: Arc<Mutex<SessionLog>>,
    pub fail_login: bool,
    pub fail_urls: HashSet<String>,
}

impl FakeSession {
    pub(crate) fn new() -> (Self, Arc<Mutex<SessionLog>>) {
        let log = Arc::new(Mutex::new(SessionLog::default()));
        let session = Self {
            log: Arc::clone(&log),
            fail_login: false,
            fail_urls: HashSet::new(),
        };
        (session, log)
    }
}

#[async_trait]
impl PostingSession for FakeSession {
    async fn login(&mut self) -> Result<(), SessionError> {
        self.log.lock().unwrap().logins += 1;
        if self.fail_login {
            return Err(SessionError::Login("bad credentials".to_string()));
        }
        Ok(())
    }

    async fn post(&mut self, request: &PostRequest) -> Result<(), SessionError> {
        if self.fail_urls.contains(&request.product_url) {
            return Err(SessionError::ElementNotFound("submit button".to_string()));
        }
        self.log
            .lock()
            .unwrap()
            .posted
            .push((request.product_url.clone(), tokio::time::Instant::now()));
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.log.lock().unwrap().closes += 1;
        Ok(())
    }
}
