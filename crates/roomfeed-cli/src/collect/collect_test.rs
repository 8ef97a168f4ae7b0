use roomfeed_core::CategoryConfig;
use roomfeed_scraper::SyntheticTier;

use super::*;
use crate::test_support::{FailMode, FakeTier, MemoryStore};

fn categories(layout: &[(&str, &[&str])]) -> CategoriesFile {
    CategoriesFile {
        categories: layout
            .iter()
            .map(|(label, keywords)| CategoryConfig {
                label: (*label).to_string(),
                keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
            })
            .collect(),
    }
}

fn settings(products_per_keyword: usize, keyword_cap: usize) -> CollectSettings {
    CollectSettings {
        products_per_keyword,
        keyword_cap,
        keyword_delay_ms: None,
        dry_run: false,
    }
}

fn chain(tier: FakeTier) -> TierChain {
    TierChain::new(vec![Box::new(tier)], SyntheticTier)
}

fn row_urls(store: &MemoryStore) -> Vec<String> {
    store.rows().into_iter().map(|r| r.product.url).collect()
}

#[tokio::test]
async fn keyword_cap_processes_first_keywords_in_file_order() {
    let store = MemoryStore::default();
    let tier = FakeTier::new(AcquisitionTier::Api)
        .with("k1", &["https://x/1"])
        .with("k2", &["https://x/2"])
        .with("k3", &["https://x/3"])
        .with("k4", &["https://x/4"]);
    let cats = categories(&[("20代", &["k1", "k2"]), ("30代", &["k3", "k4"])]);

    let report = collect(&store, &chain(tier), &cats, &settings(3, 3))
        .await
        .unwrap();

    assert_eq!(report.keywords_processed, 3);
    assert_eq!(report.keywords_skipped, 1);
    assert_eq!(row_urls(&store), vec!["https://x/1", "https://x/2", "https://x/3"]);
    let rows = store.rows();
    assert_eq!(rows[2].category, "30代");
}

#[tokio::test]
async fn url_found_under_two_keywords_is_written_once() {
    let store = MemoryStore::default();
    let tier = FakeTier::new(AcquisitionTier::Scrape)
        .with("k1", &["https://x/shared"])
        .with("k2", &["https://x/shared"]);
    let cats = categories(&[("20代", &["k1"]), ("30代", &["k2"])]);

    let report = collect(&store, &chain(tier), &cats, &settings(3, 10))
        .await
        .unwrap();

    assert_eq!(row_urls(&store), vec!["https://x/shared"]);
    assert_eq!(store.rows()[0].category, "20代");
    assert_eq!(report.rows_written, 1);
    assert_eq!(report.duplicates_dropped, 1);
}

#[tokio::test]
async fn second_run_over_same_results_writes_nothing() {
    let store = MemoryStore::default();
    let tier = FakeTier::new(AcquisitionTier::Api).with("k1", &["https://x/1", "https://x/2"]);
    let chain = chain(tier);
    let cats = categories(&[("20代", &["k1"])]);

    let first = collect(&store, &chain, &cats, &settings(3, 10)).await.unwrap();
    let second = collect(&store, &chain, &cats, &settings(3, 10)).await.unwrap();

    assert_eq!(first.rows_written, 2);
    assert_eq!(second.rows_written, 0);
    assert_eq!(second.duplicates_dropped, 2);
    assert_eq!(store.rows().len(), 2);
}

#[tokio::test]
async fn keyword_with_no_source_results_gets_synthetic_rows() {
    let store = MemoryStore::default();
    let cats = categories(&[("40代", &["乾燥肌"])]);

    let report = collect(
        &store,
        &chain(FakeTier::new(AcquisitionTier::Api)),
        &cats,
        &settings(2, 10),
    )
    .await
    .unwrap();

    assert_eq!(report.rows_by_tier.get("synthetic"), Some(&2));
    assert!(store.rows().iter().all(|r| r.product.is_synthetic()));
}

#[tokio::test]
async fn unavailable_store_aborts_before_acquisition() {
    let store = MemoryStore::default();
    store.fail_known_urls(FailMode::Unavailable);
    let tier = FakeTier::new(AcquisitionTier::Api).with("k1", &["https://x/1"]);
    let cats = categories(&[("20代", &["k1"])]);

    let err = collect(&store, &chain(tier), &cats, &settings(3, 10))
        .await
        .unwrap_err();

    let CollectError::Store(inner) = err;
    assert!(inner.is_unavailable());
    assert!(store.rows().is_empty());
}

#[tokio::test]
async fn unavailable_store_during_write_aborts_run() {
    let store = MemoryStore::default();
    store.fail_append_of("https://x/1", FailMode::Unavailable);
    let tier = FakeTier::new(AcquisitionTier::Api)
        .with("k1", &["https://x/1"])
        .with("k2", &["https://x/2"]);
    let cats = categories(&[("20代", &["k1", "k2"])]);

    let result = collect(&store, &chain(tier), &cats, &settings(3, 10)).await;

    assert!(result.is_err());
    assert!(store.rows().is_empty(), "k2 must not be processed");
}

#[tokio::test]
async fn row_write_failure_skips_rest_of_keyword_and_continues() {
    let store = MemoryStore::default();
    store.fail_append_of("https://x/a", FailMode::Query);
    let tier = FakeTier::new(AcquisitionTier::Api)
        .with("k1", &["https://x/a", "https://x/b"])
        .with("k2", &["https://x/c"]);
    let cats = categories(&[("20代", &["k1", "k2"])]);

    let report = collect(&store, &chain(tier), &cats, &settings(3, 10))
        .await
        .unwrap();

    assert_eq!(report.write_failures, 1);
    assert_eq!(report.keywords_processed, 2);
    assert_eq!(row_urls(&store), vec!["https://x/c"]);
}

#[tokio::test]
async fn product_left_unwritten_by_row_failure_is_written_for_later_keyword() {
    let store = MemoryStore::default();
    store.fail_append_of("https://x/a", FailMode::Query);
    let tier = FakeTier::new(AcquisitionTier::Api)
        .with("k1", &["https://x/a", "https://x/b"])
        .with("k2", &["https://x/b"]);
    let cats = categories(&[("20代", &["k1"]), ("30代", &["k2"])]);

    let report = collect(&store, &chain(tier), &cats, &settings(3, 10))
        .await
        .unwrap();

    assert_eq!(report.write_failures, 1);
    assert_eq!(report.rows_written, 1);
    assert_eq!(row_urls(&store), vec!["https://x/b"]);
    assert_eq!(store.rows()[0].category, "30代");
}

#[tokio::test]
async fn dry_run_reports_rows_without_writing() {
    let store = MemoryStore::default();
    let tier = FakeTier::new(AcquisitionTier::Scrape)
        .with("k1", &["https://x/1", "https://x/2"])
        .with("k2", &["https://x/2", "https://x/3"]);
    let cats = categories(&[("20代", &["k1", "k2"])]);
    let mut settings = settings(3, 10);
    settings.dry_run = true;

    let report = collect(&store, &chain(tier), &cats, &settings).await.unwrap();

    assert!(store.rows().is_empty());
    assert_eq!(report.rows_written, 3);
    assert_eq!(report.duplicates_dropped, 1);
    assert_eq!(report.rows_by_tier.get("scrape"), Some(&3));
}

#[tokio::test(start_paused = true)]
async fn keywords_are_spaced_by_configured_delay() {
    let store = MemoryStore::default();
    let tier = FakeTier::new(AcquisitionTier::Api)
        .with("k1", &["https://x/1"])
        .with("k2", &["https://x/2"]);
    let cats = categories(&[("20代", &["k1", "k2"])]);
    let mut settings = settings(3, 10);
    settings.keyword_delay_ms = Some((2_000, 2_000));

    let started = tokio::time::Instant::now();
    collect(&store, &chain(tier), &cats, &settings).await.unwrap();

    assert!(started.elapsed() >= Duration::from_secs(2));
}
