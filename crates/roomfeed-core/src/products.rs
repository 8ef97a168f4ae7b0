use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which acquisition strategy produced a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcquisitionTier {
    Api,
    Scrape,
    Synthetic,
}

impl AcquisitionTier {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AcquisitionTier::Api => "api",
            AcquisitionTier::Scrape => "scrape",
            AcquisitionTier::Synthetic => "synthetic",
        }
    }

    /// Parse the lowercase storage form back into a tier.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "api" => Some(AcquisitionTier::Api),
            "scrape" => Some(AcquisitionTier::Scrape),
            "synthetic" => Some(AcquisitionTier::Synthetic),
            _ => None,
        }
    }
}

impl std::fmt::Display for AcquisitionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one publishing attempt for a stored product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostOutcome {
    Success,
    Failure,
    /// The row was never submitted (e.g. its URL cannot be opened) and is
    /// excluded from later selection.
    Skipped,
}

impl PostOutcome {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PostOutcome::Success => "success",
            PostOutcome::Failure => "failure",
            PostOutcome::Skipped => "skipped",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(PostOutcome::Success),
            "failure" => Some(PostOutcome::Failure),
            "skipped" => Some(PostOutcome::Skipped),
            _ => None,
        }
    }
}

impl std::fmt::Display for PostOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A product listing as returned by an acquisition tier, before it is
/// recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub title: String,
    /// Canonical product page URL; the store-wide dedup key.
    pub url: String,
    /// Price in whole yen, when the source exposes one.
    pub price_yen: Option<i64>,
    pub shop_name: String,
    /// Average review score on a 0–5 scale.
    pub rating: Option<f64>,
    pub review_count: Option<i64>,
    pub image_url: Option<String>,
    /// Caption text submitted when the product is published.
    pub caption: String,
    pub tier: AcquisitionTier,
}

impl Product {
    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        self.tier == AcquisitionTier::Synthetic
    }
}

/// A product row as held by the persistence backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: i64,
    pub category: String,
    pub product: Product,
    pub collected_at: DateTime<Utc>,
    pub posted: bool,
    pub posted_at: Option<DateTime<Utc>>,
    pub post_outcome: Option<PostOutcome>,
    pub last_attempt_at: Option<DateTime<Utc>>,
}
