//! Collection command: categories × keywords → tier chain → dedup → store.
//!
//! Row-level write failures are logged and the run moves on to the next
//! keyword. A store that cannot be reached aborts the run.

mod dedup;

use std::collections::BTreeMap;
use std::time::Duration;

use rand::Rng;
use roomfeed_core::{AcquisitionTier, AppConfig, CategoriesFile, ProductStore, StoreError};
use roomfeed_scraper::TierChain;
use thiserror::Error;

use crate::runs;
use dedup::Deduplicator;

#[derive(Debug, Error)]
pub(crate) enum CollectError {
    #[error(transparent)]
    Store(StoreError),
}

/// Knobs for one collection run.
#[derive(Debug, Clone)]
pub(crate) struct CollectSettings {
    pub products_per_keyword: usize,
    pub keyword_cap: usize,
    /// Random pause between keywords, in milliseconds. `None` disables it.
    pub keyword_delay_ms: Option<(u64, u64)>,
    pub dry_run: bool,
}

impl CollectSettings {
    pub(crate) fn from_config(
        config: &AppConfig,
        products_per_keyword: usize,
        dry_run: bool,
    ) -> Self {
        let keyword_delay_ms = (!dry_run && config.keyword_delay_max_ms > 0)
            .then_some((config.keyword_delay_min_ms, config.keyword_delay_max_ms));
        Self {
            products_per_keyword,
            keyword_cap: config.max_keywords_per_run,
            keyword_delay_ms,
            dry_run,
        }
    }
}

/// Totals for one collection run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct CollectReport {
    pub keywords_processed: usize,
    pub keywords_skipped: usize,
    /// Rows written, or rows that would be written in dry-run.
    pub rows_written: usize,
    pub duplicates_dropped: usize,
    pub write_failures: usize,
    pub rows_by_tier: BTreeMap<&'static str, usize>,
}

/// Runs the orchestrator against `store` using `chain` for acquisition.
///
/// Known URLs are read once up front. In dry-run nothing is written and the
/// inter-keyword pause is skipped; dedup still runs so the report matches
/// what a real run would write.
///
/// # Errors
///
/// Returns [`CollectError::Store`] if the known-URL read fails or a write
/// reports the store as unavailable.
pub(crate) async fn collect<S>(
    store: &S,
    chain: &TierChain,
    categories: &CategoriesFile,
    settings: &CollectSettings,
) -> Result<CollectReport, CollectError>
where
    S: ProductStore + ?Sized,
{
    let known = store.known_urls().await.map_err(CollectError::Store)?;
    tracing::info!(known_urls = known.len(), "loaded known product URLs");
    let mut dedup = Deduplicator::new(known);

    let pairs = categories.capped_keywords(settings.keyword_cap);
    let mut report = CollectReport {
        keywords_skipped: categories.keyword_count().saturating_sub(pairs.len()),
        ..CollectReport::default()
    };
    if report.keywords_skipped > 0 {
        tracing::info!(
            cap = settings.keyword_cap,
            skipped = report.keywords_skipped,
            "keyword cap reached; remaining keywords skipped"
        );
    }

    for (index, &(category, keyword)) in pairs.iter().enumerate() {
        if index > 0 {
            if let Some((min_ms, max_ms)) = settings.keyword_delay_ms {
                keyword_pause(min_ms, max_ms).await;
            }
        }

        let acquisition = chain.acquire(keyword, settings.products_per_keyword).await;
        let candidates = acquisition.products.len();
        let fresh = dedup.filter(acquisition.products);
        report.duplicates_dropped += candidates - fresh.len();
        report.keywords_processed += 1;

        tracing::info!(
            category = %category.label,
            keyword,
            tier = %acquisition.tier,
            candidates,
            new = fresh.len(),
            "keyword acquired"
        );

        if settings.dry_run {
            for product in &fresh {
                println!(
                    "dry-run: would write [{}] {} ({}) {}",
                    category.label, product.title, acquisition.tier, product.url
                );
            }
            for product in &fresh {
                dedup.accept(&product.url);
            }
            record_rows(&mut report, acquisition.tier, fresh.len());
            continue;
        }

        // Products left unwritten after a row failure stay eligible for
        // later keywords.
        for product in &fresh {
            match store.append_row(&category.label, product).await {
                Ok(true) => {
                    dedup.accept(&product.url);
                    record_rows(&mut report, acquisition.tier, 1);
                }
                Ok(false) => {
                    dedup.accept(&product.url);
                    report.duplicates_dropped += 1;
                    tracing::debug!(url = %product.url, "row already present; not written");
                }
                Err(e) if e.is_unavailable() => return Err(CollectError::Store(e)),
                Err(e) => {
                    report.write_failures += 1;
                    tracing::warn!(
                        category = %category.label,
                        keyword,
                        url = %product.url,
                        error = %e,
                        "row write failed; moving to next keyword"
                    );
                    break;
                }
            }
        }
    }

    Ok(report)
}

fn record_rows(report: &mut CollectReport, tier: AcquisitionTier, count: usize) {
    if count == 0 {
        return;
    }
    report.rows_written += count;
    *report.rows_by_tier.entry(tier.as_str()).or_default() += count;
}

async fn keyword_pause(min_ms: u64, max_ms: u64) {
    let ms = rand::rng().random_range(min_ms..=max_ms);
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// `collect` mode entry point: wraps [`collect`] in a `pipeline_runs`
/// ledger entry. Dry-run skips the ledger.
///
/// # Errors
///
/// Returns an error if the tier chain cannot be built, the run ledger cannot
/// be created, or the orchestrator aborts on a store failure.
pub(crate) async fn run_collect<S>(
    pool: &sqlx::PgPool,
    store: &S,
    config: &AppConfig,
    categories: &CategoriesFile,
    products_per_keyword: usize,
    dry_run: bool,
) -> anyhow::Result<CollectReport>
where
    S: ProductStore + ?Sized,
{
    let chain = TierChain::from_config(config)?;
    let tiers: Vec<&str> = chain.tiers().iter().map(|t| t.as_str()).collect();
    tracing::info!(tiers = ?tiers, products_per_keyword, dry_run, "starting collection");

    let settings = CollectSettings::from_config(config, products_per_keyword, dry_run);

    if dry_run {
        let report = collect(store, &chain, categories, &settings).await?;
        print_report(&report, true);
        return Ok(report);
    }

    let run_id = runs::begin(pool, runs::RUN_TYPE_COLLECT).await?;
    let report = match collect(store, &chain, categories, &settings).await {
        Ok(report) => report,
        Err(e) => {
            runs::fail_run_best_effort(pool, run_id, runs::RUN_TYPE_COLLECT, format!("{e:#}"))
                .await;
            return Err(e.into());
        }
    };

    runs::finish(pool, run_id, runs::RUN_TYPE_COLLECT, report.rows_written).await?;
    print_report(&report, false);
    Ok(report)
}

fn print_report(report: &CollectReport, dry_run: bool) {
    let prefix = if dry_run { "dry-run: " } else { "" };
    let by_tier: Vec<String> = report
        .rows_by_tier
        .iter()
        .map(|(tier, n)| format!("{tier}={n}"))
        .collect();
    println!(
        "{prefix}collected {} new products from {} keywords ({} duplicates, {} write failures) [{}]",
        report.rows_written,
        report.keywords_processed,
        report.duplicates_dropped,
        report.write_failures,
        by_tier.join(", ")
    );
}

#[cfg(test)]
#[path = "collect_test.rs"]
mod tests;
