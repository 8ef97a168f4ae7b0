//! Publishing scheduler: picks unposted rows under the daily quota and
//! submits them through a [`PostingSession`], pacing successful posts.
//!
//! The quota counter lives in the store and is re-read before every attempt,
//! so concurrent or repeated invocations on the same day cannot overshoot it.

use std::time::Duration;

use chrono::{NaiveDate, Utc};
use rand::Rng;
use roomfeed_core::{
    calendar_day, AppConfig, DailyStats, DailyStatsStore, PostOutcome, ProductRecord,
    ProductStore, StoreError,
};
use roomfeed_session::{ChromiumSession, PostRequest, PostingSession, SessionConfig, SessionError};
use thiserror::Error;

use crate::{runs, stats_artifact};

#[derive(Debug, Error)]
pub(crate) enum PublishError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("posting session login failed: {0}")]
    Login(#[source] SessionError),
}

#[derive(Debug, Clone)]
pub(crate) struct PublishSettings {
    pub daily_limit: u32,
    pub max_posts: u32,
    pub include_synthetic: bool,
    /// Inclusive bounds of the pause after a successful post, in seconds.
    pub interval_secs: (u64, u64),
    pub utc_offset_hours: i32,
}

impl PublishSettings {
    pub(crate) fn from_config(config: &AppConfig, max_posts: u32) -> Self {
        Self {
            daily_limit: config.daily_post_limit,
            max_posts,
            include_synthetic: config.publish_synthetic,
            interval_secs: (config.post_interval_min_secs, config.post_interval_max_secs),
            utc_offset_hours: config.stats_utc_offset_hours,
        }
    }

    fn today(&self) -> NaiveDate {
        calendar_day(Utc::now(), self.utc_offset_hours)
    }
}

/// Rows chosen for one run and the counters they were chosen against.
#[derive(Debug, Clone)]
pub(crate) struct Selection {
    pub today: DailyStats,
    pub remaining: u32,
    pub candidates: Vec<ProductRecord>,
    /// Rows whose URL cannot be posted. They are marked skipped and do not
    /// count against the budget.
    pub unpostable: Vec<ProductRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PublishReport {
    pub day: NaiveDate,
    pub selected: usize,
    pub attempted: u32,
    pub succeeded: u32,
    pub failed: u32,
    pub skipped: u32,
    /// Quota left for `day` after this run.
    pub remaining: u32,
}

impl PublishReport {
    fn empty(day: NaiveDate, remaining: u32) -> Self {
        Self {
            day,
            selected: 0,
            attempted: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            remaining,
        }
    }
}

/// Loads today's counters and the oldest postable unposted rows, capped at
/// `min(max_posts, remaining quota)`. Unpostable rows met on the way are
/// returned separately.
///
/// # Errors
///
/// Returns [`StoreError`] if either the counters or the rows cannot be read.
pub(crate) async fn select_candidates<P, D>(
    products: &P,
    stats: &D,
    settings: &PublishSettings,
) -> Result<Selection, StoreError>
where
    P: ProductStore + ?Sized,
    D: DailyStatsStore + ?Sized,
{
    let today = stats.load_day(settings.today()).await?;
    let remaining = today.remaining(settings.daily_limit);
    let budget = settings.max_posts.min(remaining) as usize;

    let mut candidates = Vec::new();
    let mut unpostable = Vec::new();
    if budget > 0 {
        for row in products.list_unposted(settings.include_synthetic).await? {
            if !is_postable_url(&row.product.url) {
                unpostable.push(row);
            } else if candidates.len() < budget {
                candidates.push(row);
            } else {
                break;
            }
        }
    }

    tracing::info!(
        day = %today.date,
        succeeded_today = today.succeeded,
        remaining,
        selected = candidates.len(),
        unpostable = unpostable.len(),
        "selected publishing candidates"
    );
    Ok(Selection {
        today,
        remaining,
        candidates,
        unpostable,
    })
}

/// Runs the scheduler to completion.
///
/// The session logs in once, only when there is something to post, and is
/// always closed before returning.
///
/// # Errors
///
/// Returns [`PublishError::Login`] if login fails (no post is attempted) or
/// [`PublishError::Store`] if the quota counters cannot be read or updated,
/// a successful post cannot be marked, or the row store becomes unavailable.
pub(crate) async fn publish<P, D, S>(
    products: &P,
    stats: &D,
    session: &mut S,
    settings: &PublishSettings,
) -> Result<PublishReport, PublishError>
where
    P: ProductStore + ?Sized,
    D: DailyStatsStore + ?Sized,
    S: PostingSession + ?Sized,
{
    let selection = select_candidates(products, stats, settings).await?;
    let mut report = PublishReport::empty(selection.today.date, selection.remaining);
    report.selected = selection.candidates.len();

    for row in &selection.unpostable {
        tracing::warn!(
            row_id = row.id,
            url = %row.product.url,
            "unpostable URL; skipping row"
        );
        mark_row(products, row, PostOutcome::Skipped).await?;
        report.skipped += 1;
    }

    if selection.candidates.is_empty() {
        if selection.remaining == 0 {
            tracing::info!(limit = settings.daily_limit, "daily post limit reached");
        } else {
            tracing::info!("no unposted products");
        }
        return Ok(report);
    }

    if let Err(e) = session.login().await {
        close_best_effort(session).await;
        return Err(PublishError::Login(e));
    }

    let result = post_all(
        products,
        stats,
        session,
        settings,
        &selection.candidates,
        &mut report,
    )
    .await;
    close_best_effort(session).await;
    result.map(|()| report)
}

async fn post_all<P, D, S>(
    products: &P,
    stats: &D,
    session: &mut S,
    settings: &PublishSettings,
    candidates: &[ProductRecord],
    report: &mut PublishReport,
) -> Result<(), PublishError>
where
    P: ProductStore + ?Sized,
    D: DailyStatsStore + ?Sized,
    S: PostingSession + ?Sized,
{
    for (index, row) in candidates.iter().enumerate() {
        let day = settings.today();
        let current = stats.load_day(day).await?;
        report.day = day;
        report.remaining = current.remaining(settings.daily_limit);
        if report.remaining == 0 {
            tracing::info!(
                limit = settings.daily_limit,
                "daily post limit reached mid-run"
            );
            break;
        }

        let request = PostRequest {
            product_url: row.product.url.clone(),
            caption: row.product.caption.clone(),
            image_url: row.product.image_url.clone(),
        };
        let outcome = match session.post(&request).await {
            Ok(()) => {
                tracing::info!(row_id = row.id, url = %row.product.url, "posted");
                PostOutcome::Success
            }
            Err(e) => {
                tracing::warn!(
                    row_id = row.id,
                    url = %row.product.url,
                    error = %e,
                    "post failed"
                );
                PostOutcome::Failure
            }
        };

        // The row is marked even when the counter write fails.
        let recorded = stats.record_attempt(day, outcome, Utc::now()).await;
        let marked = mark_row(products, row, outcome).await;
        report.attempted += 1;
        report.remaining = recorded?.remaining(settings.daily_limit);
        marked?;

        if outcome == PostOutcome::Success {
            report.succeeded += 1;
            if index + 1 < candidates.len() {
                post_interval(settings.interval_secs).await;
            }
        } else {
            report.failed += 1;
        }
    }
    Ok(())
}

/// Records the row's outcome.
///
/// Failures to mark a successful post are fatal since the row would be posted
/// again. Other outcomes tolerate row-level errors unless the store is gone.
async fn mark_row<P>(
    products: &P,
    row: &ProductRecord,
    outcome: PostOutcome,
) -> Result<(), StoreError>
where
    P: ProductStore + ?Sized,
{
    match products.mark_posted(row.id, Utc::now(), outcome).await {
        Ok(()) => Ok(()),
        Err(e) if e.is_unavailable() || outcome == PostOutcome::Success => {
            tracing::error!(
                row_id = row.id,
                %outcome,
                error = %e,
                "failed to record post outcome"
            );
            Err(e)
        }
        Err(e) => {
            tracing::error!(
                row_id = row.id,
                %outcome,
                error = %e,
                "failed to record post outcome; continuing"
            );
            Ok(())
        }
    }
}

fn is_postable_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

async fn post_interval((min_secs, max_secs): (u64, u64)) {
    let secs = rand::rng().random_range(min_secs..=max_secs.max(min_secs));
    tracing::info!(secs, "waiting before next post");
    tokio::time::sleep(Duration::from_secs(secs)).await;
}

async fn close_best_effort<S: PostingSession + ?Sized>(session: &mut S) {
    if let Err(e) = session.close().await {
        tracing::warn!(error = %e, "failed to close posting session");
    }
}

/// `post` mode entry point.
///
/// Dry-run lists what would be posted without opening a browser, touching
/// the ledger or needing credentials.
///
/// # Errors
///
/// Returns an error if credentials are missing, the ledger cannot be
/// written, or the scheduler fails fatally.
pub(crate) async fn run_post(
    pool: &sqlx::PgPool,
    store: &roomfeed_db::PgStore,
    config: &AppConfig,
    max_posts: u32,
    dry_run: bool,
) -> anyhow::Result<PublishReport> {
    let settings = PublishSettings::from_config(config, max_posts);

    if dry_run {
        let selection = select_candidates(store, store, &settings).await?;
        for row in &selection.unpostable {
            println!("dry-run: would skip unpostable row {} {}", row.id, row.product.url);
        }
        for row in &selection.candidates {
            println!(
                "dry-run: would post [{}] {} {}",
                row.category, row.product.title, row.product.url
            );
        }
        let mut report = PublishReport::empty(selection.today.date, selection.remaining);
        report.selected = selection.candidates.len();
        report.skipped = u32::try_from(selection.unpostable.len()).unwrap_or(u32::MAX);
        print_report(&report, true);
        return Ok(report);
    }

    let credentials = config.posting_credentials()?;
    let mut session = ChromiumSession::new(SessionConfig::from_app_config(config), credentials);

    let run_id = runs::begin(pool, runs::RUN_TYPE_POST).await?;
    let report = match publish(store, store, &mut session, &settings).await {
        Ok(report) => report,
        Err(e) => {
            runs::fail_run_best_effort(pool, run_id, runs::RUN_TYPE_POST, format!("{e:#}"))
                .await;
            return Err(e.into());
        }
    };
    runs::finish(pool, run_id, runs::RUN_TYPE_POST, report.succeeded as usize).await?;

    match store.load_day(report.day).await {
        Ok(today) => {
            if let Err(e) = stats_artifact::record_day(&config.stats_path, &today) {
                tracing::warn!(
                    path = %config.stats_path.display(),
                    error = %e,
                    "failed to write stats file"
                );
            }
        }
        Err(e) => tracing::warn!(error = %e, "failed to reload daily stats for stats file"),
    }

    print_report(&report, false);
    Ok(report)
}

fn print_report(report: &PublishReport, dry_run: bool) {
    if dry_run {
        println!(
            "dry-run: would post {} products on {} ({} skipped, {} remaining today)",
            report.selected, report.day, report.skipped, report.remaining
        );
        return;
    }
    println!(
        "posted {} of {} attempted on {} ({} failed, {} skipped, {} remaining today)",
        report.succeeded,
        report.attempted,
        report.day,
        report.failed,
        report.skipped,
        report.remaining
    );
}

#[cfg(test)]
#[path = "publish_test.rs"]
mod tests;
