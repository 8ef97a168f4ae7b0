//! The ordered acquisition chain: API, then scrape, then synthetic.

use async_trait::async_trait;
use roomfeed_core::{AcquisitionTier, AppConfig, Product};

use crate::api::{ApiTier, RakutenApiClient};
use crate::error::ScraperError;
use crate::search_page::{ScrapeTier, SearchPageClient};
use crate::synthetic::SyntheticTier;

/// One source of products for a keyword.
///
/// An attempt is a single bounded try: no internal retries. An empty `Ok`
/// and an `Err` both mean "fall through to the next tier".
#[async_trait]
pub trait AcquisitionStrategy: Send + Sync {
    fn tier(&self) -> AcquisitionTier;

    async fn attempt(&self, keyword: &str, desired: usize) -> Result<Vec<Product>, ScraperError>;
}

/// Products for one keyword and the tier that produced them.
#[derive(Debug, Clone)]
pub struct Acquisition {
    pub tier: AcquisitionTier,
    pub products: Vec<Product>,
}

/// Strictly ordered, short-circuiting chain of strategies with a synthetic
/// floor that cannot fail.
pub struct TierChain {
    strategies: Vec<Box<dyn AcquisitionStrategy>>,
    floor: SyntheticTier,
}

impl TierChain {
    #[must_use]
    pub fn new(strategies: Vec<Box<dyn AcquisitionStrategy>>, floor: SyntheticTier) -> Self {
        Self { strategies, floor }
    }

    /// Builds the production chain. The API tier is only included when an
    /// application id is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError`] if an HTTP client cannot be constructed or
    /// a configured base URL does not parse.
    pub fn from_config(config: &AppConfig) -> Result<Self, ScraperError> {
        let mut strategies: Vec<Box<dyn AcquisitionStrategy>> = Vec::with_capacity(2);

        if let Some(app_id) = config.rakuten_app_id.as_deref() {
            let client = RakutenApiClient::new(
                app_id,
                &config.api_base_url,
                config.api_timeout_secs,
                &config.user_agent,
            )?;
            strategies.push(Box::new(ApiTier::new(client)));
        } else {
            tracing::info!("RAKUTEN_APP_ID not set; API tier disabled");
        }

        let pages = SearchPageClient::new(
            &config.search_base_url,
            config.scrape_timeout_secs,
            &config.user_agent,
        )?;
        strategies.push(Box::new(ScrapeTier::new(pages)));

        Ok(Self::new(strategies, SyntheticTier))
    }

    /// Tiers in the order they are tried, floor included.
    #[must_use]
    pub fn tiers(&self) -> Vec<AcquisitionTier> {
        self.strategies
            .iter()
            .map(|s| s.tier())
            .chain(std::iter::once(self.floor.tier()))
            .collect()
    }

    /// Returns the first non-empty result, truncated to `desired`.
    ///
    /// Falls back to exactly `desired` synthetic placeholders, so the result
    /// is empty only when `desired` is zero.
    pub async fn acquire(&self, keyword: &str, desired: usize) -> Acquisition {
        for strategy in &self.strategies {
            let tier = strategy.tier();
            match strategy.attempt(keyword, desired).await {
                Ok(mut products) if !products.is_empty() => {
                    products.truncate(desired);
                    tracing::info!(keyword, %tier, count = products.len(), "tier produced products");
                    return Acquisition { tier, products };
                }
                Ok(_) => {
                    tracing::info!(keyword, %tier, "tier returned no products; falling through");
                }
                Err(e) => {
                    tracing::warn!(keyword, %tier, error = %e, "tier failed; falling through");
                }
            }
        }

        let products = self.floor.generate(keyword, desired);
        tracing::warn!(
            keyword,
            count = products.len(),
            "all sources failed; using synthetic placeholders"
        );
        Acquisition {
            tier: AcquisitionTier::Synthetic,
            products,
        }
    }
}
