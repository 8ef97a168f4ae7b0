//! HTTP client for the Ichiba item search API and the tier built on it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use roomfeed_core::{compose_caption, AcquisitionTier, Product};

use crate::error::ScraperError;
use crate::tiers::AcquisitionStrategy;
use crate::types::{ApiErrorBody, ApiItem, ItemSearchResponse};

/// Upper bound the API accepts for `hits`.
pub const MAX_HITS: usize = 30;

/// Client for the item search endpoint.
///
/// The endpoint is passed in whole (production URL from config, or a
/// wiremock URI in tests). The application id is never included in error
/// messages or logs.
pub struct RakutenApiClient {
    client: Client,
    application_id: String,
    endpoint: Url,
}

impl RakutenApiClient {
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`ScraperError::InvalidUrl`] if `endpoint`
    /// does not parse.
    pub fn new(
        application_id: &str,
        endpoint: &str,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        let endpoint = Url::parse(endpoint).map_err(|e| ScraperError::InvalidUrl {
            url: endpoint.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            application_id: application_id.to_owned(),
            endpoint,
        })
    }

    /// Searches items for `keyword`, asking for `hits` results (clamped to
    /// `1..=30`). One request, no retries.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::Api`] if the body is an error envelope.
    /// - [`ScraperError::UnexpectedStatus`] for any other non-2xx status.
    /// - [`ScraperError::Http`] on network failure or timeout.
    /// - [`ScraperError::Deserialize`] if the body does not match the
    ///   expected shape.
    pub async fn search_items(
        &self,
        keyword: &str,
        hits: usize,
    ) -> Result<Vec<ApiItem>, ScraperError> {
        let url = self.build_url(keyword, hits);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            if let Ok(err) = serde_json::from_str::<ApiErrorBody>(&body) {
                return Err(ScraperError::Api {
                    code: err.error,
                    description: err.error_description,
                });
            }
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: self.endpoint.to_string(),
            });
        }

        let value: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| ScraperError::Deserialize {
                context: format!("item search (keyword={keyword})"),
                source: e,
            })?;

        if value.get("error").is_some() {
            let err: ApiErrorBody =
                serde_json::from_value(value).map_err(|e| ScraperError::Deserialize {
                    context: format!("item search error body (keyword={keyword})"),
                    source: e,
                })?;
            return Err(ScraperError::Api {
                code: err.error,
                description: err.error_description,
            });
        }

        let parsed: ItemSearchResponse =
            serde_json::from_value(value).map_err(|e| ScraperError::Deserialize {
                context: format!("item search (keyword={keyword})"),
                source: e,
            })?;

        Ok(parsed.items.into_iter().map(|e| e.item).collect())
    }

    fn build_url(&self, keyword: &str, hits: usize) -> Url {
        let hits = hits.clamp(1, MAX_HITS).to_string();
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("applicationId", &self.application_id)
            .append_pair("keyword", keyword)
            .append_pair("format", "json")
            .append_pair("hits", &hits)
            .append_pair("sort", "standard");
        url
    }
}

/// Tier 1: the structured search API.
pub struct ApiTier {
    client: RakutenApiClient,
}

impl ApiTier {
    #[must_use]
    pub fn new(client: RakutenApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AcquisitionStrategy for ApiTier {
    fn tier(&self) -> AcquisitionTier {
        AcquisitionTier::Api
    }

    async fn attempt(&self, keyword: &str, desired: usize) -> Result<Vec<Product>, ScraperError> {
        let items = self.client.search_items(keyword, desired).await?;
        Ok(items
            .into_iter()
            .filter_map(product_from_item)
            .take(desired)
            .collect())
    }
}

/// Maps an API item to a [`Product`]. Items without a name or URL are
/// dropped.
fn product_from_item(item: ApiItem) -> Option<Product> {
    let title = item.item_name.trim().to_string();
    let url = item.item_url.trim().to_string();
    if title.is_empty() || url.is_empty() {
        return None;
    }

    // The API reports 0.0 for listings without reviews.
    let rating = item.review_average.filter(|r| *r > 0.0);
    let image_url = item.first_image_url().map(str::to_string);
    let caption = compose_caption(&title, item.item_price, rating);

    Some(Product {
        title,
        url,
        price_yen: item.item_price,
        shop_name: item.shop_name,
        rating,
        review_count: item.review_count,
        image_url,
        caption,
        tier: AcquisitionTier::Api,
    })
}
