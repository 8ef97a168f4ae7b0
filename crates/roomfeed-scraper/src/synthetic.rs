//! Tier 3: placeholder products fabricated when no real source produced
//! anything. Rows are tagged `synthetic` so they stay distinguishable.

use async_trait::async_trait;
use percent_encoding::utf8_percent_encode;
use rand::Rng;
use roomfeed_core::{compose_synthetic_caption, AcquisitionTier, Product};

use crate::error::ScraperError;
use crate::search_page::PATH_SEGMENT;
use crate::tiers::AcquisitionStrategy;

const SYNTHETIC_SHOP_NAME: &str = "楽天おすすめショップ";
const PLACEHOLDER_ROOT: &str = "https://item.rakuten.co.jp/dummy/";
const PRICE_RANGE_YEN: std::ops::RangeInclusive<i64> = 1_000..=8_000;
// Ratings in tenths: 3.8 to 4.9.
const RATING_TENTHS: std::ops::RangeInclusive<u32> = 38..=49;

/// Infallible generator of placeholder products.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticTier;

impl SyntheticTier {
    /// Fabricates exactly `count` placeholders for `keyword`.
    ///
    /// URLs are deterministic per keyword and index, so re-running the same
    /// keyword yields the same URLs and the dedup gate drops them.
    #[must_use]
    pub fn generate(&self, keyword: &str, count: usize) -> Vec<Product> {
        let mut rng = rand::rng();
        let slug = utf8_percent_encode(keyword.trim(), PATH_SEGMENT).to_string();

        (1..=count)
            .map(|n| {
                let title = format!("{} おすすめ商品 #{n}", keyword.trim());
                let price = rng.random_range(PRICE_RANGE_YEN);
                let rating = f64::from(rng.random_range(RATING_TENTHS)) / 10.0;
                let caption = compose_synthetic_caption(&title, keyword.trim(), price, rating);
                Product {
                    url: format!("{PLACEHOLDER_ROOT}{slug}-{n}/"),
                    title,
                    price_yen: Some(price),
                    shop_name: SYNTHETIC_SHOP_NAME.to_string(),
                    rating: Some(rating),
                    review_count: None,
                    image_url: None,
                    caption,
                    tier: AcquisitionTier::Synthetic,
                }
            })
            .collect()
    }
}

#[async_trait]
impl AcquisitionStrategy for SyntheticTier {
    fn tier(&self) -> AcquisitionTier {
        AcquisitionTier::Synthetic
    }

    async fn attempt(&self, keyword: &str, desired: usize) -> Result<Vec<Product>, ScraperError> {
        Ok(self.generate(keyword, desired))
    }
}
