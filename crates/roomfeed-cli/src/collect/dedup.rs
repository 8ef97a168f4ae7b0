//! URL-keyed duplicate filter for one collection run.

use std::collections::HashSet;

use roomfeed_core::Product;

/// Drops candidates whose URL is already recorded or was accepted earlier
/// in the same run.
///
/// A URL counts as accepted only once [`Deduplicator::accept`] is called for
/// it, so products that were filtered but never written stay eligible for
/// later keywords.
///
/// `known` is read once at run start; rows written by other processes
/// during the run are not seen.
#[derive(Debug, Default)]
pub(crate) struct Deduplicator {
    known: HashSet<String>,
    accepted: HashSet<String>,
}

impl Deduplicator {
    pub(crate) fn new(known: HashSet<String>) -> Self {
        Self {
            known,
            accepted: HashSet::new(),
        }
    }

    /// Returns the new candidates in input order. Repeats within the batch
    /// keep their first occurrence.
    pub(crate) fn filter(&self, candidates: Vec<Product>) -> Vec<Product> {
        let mut batch = HashSet::new();
        let mut fresh = Vec::with_capacity(candidates.len());
        for product in candidates {
            if self.known.contains(&product.url)
                || self.accepted.contains(&product.url)
                || !batch.insert(product.url.clone())
            {
                tracing::debug!(url = %product.url, "skipping duplicate product");
                continue;
            }
            fresh.push(product);
        }
        fresh
    }

    /// Marks `url` as handled for the rest of the run.
    pub(crate) fn accept(&mut self, url: &str) {
        self.accepted.insert(url.to_string());
    }
}

#[cfg(test)]
mod tests {
    use roomfeed_core::AcquisitionTier;

    use super::*;

    fn product(url: &str) -> Product {
        Product {
            title: url.to_string(),
            url: url.to_string(),
            price_yen: None,
            shop_name: String::new(),
            rating: None,
            review_count: None,
            image_url: None,
            caption: String::new(),
            tier: AcquisitionTier::Scrape,
        }
    }

    fn urls(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.url.as_str()).collect()
    }

    #[test]
    fn known_urls_are_dropped_and_order_is_kept() {
        let known = HashSet::from(["https://x/2".to_string()]);
        let dedup = Deduplicator::new(known);

        let fresh = dedup.filter(vec![
            product("https://x/3"),
            product("https://x/2"),
            product("https://x/1"),
        ]);

        assert_eq!(urls(&fresh), vec!["https://x/3", "https://x/1"]);
    }

    #[test]
    fn repeat_within_one_batch_keeps_first() {
        let dedup = Deduplicator::default();
        let fresh = dedup.filter(vec![product("https://x/1"), product("https://x/1")]);
        assert_eq!(fresh.len(), 1);
    }

    #[test]
    fn url_accepted_for_one_keyword_is_dropped_for_the_next() {
        let mut dedup = Deduplicator::default();

        let first = dedup.filter(vec![product("https://x/shared"), product("https://x/a")]);
        for p in &first {
            dedup.accept(&p.url);
        }
        let second = dedup.filter(vec![product("https://x/shared"), product("https://x/b")]);

        assert_eq!(urls(&first), vec!["https://x/shared", "https://x/a"]);
        assert_eq!(urls(&second), vec!["https://x/b"]);
    }

    #[test]
    fn filtered_but_unaccepted_url_stays_eligible() {
        let mut dedup = Deduplicator::default();

        let first = dedup.filter(vec![product("https://x/1"), product("https://x/2")]);
        dedup.accept(&first[0].url);
        let second = dedup.filter(vec![product("https://x/1"), product("https://x/2")]);

        assert_eq!(urls(&second), vec!["https://x/2"]);
    }
}
