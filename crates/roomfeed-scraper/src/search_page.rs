//! Keyword search-page scraping: fetch the listing HTML and extract items
//! with structural CSS selectors.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use reqwest::Client;
use roomfeed_core::{compose_caption, AcquisitionTier, Product};
use scraper::{ElementRef, Html, Selector};

use crate::error::ScraperError;
use crate::tiers::AcquisitionStrategy;

const ITEM_HOST: &str = "https://item.rakuten.co.jp";

/// Unreserved characters stay literal in the keyword path segment.
pub(crate) const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

static LISTING_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.searchresultitem, div.item").expect("valid listing selector")
});
static TITLE_SELS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    ["h2 a", "h3 a", "h3", "a[title]", "a"]
        .iter()
        .map(|s| Selector::parse(s).expect("valid title selector"))
        .collect()
});
static LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid link selector"));
static IMG_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img").expect("valid image selector"));
static SHOP_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".merchant a, .merchant").expect("valid shop selector"));
static PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9][0-9,]*)\s*円").expect("valid price regex"));

/// One listing element extracted from a search page.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingItem {
    pub title: String,
    pub url: String,
    pub price_yen: Option<i64>,
    pub shop_name: String,
    pub image_url: Option<String>,
}

/// Fetches search pages for a keyword.
pub struct SearchPageClient {
    client: Client,
    base_url: String,
}

impl SearchPageClient {
    /// `base_url` is the search root; the keyword is appended as one path
    /// segment followed by `/`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(base_url: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            base_url: format!("{}/", base_url.trim_end_matches('/')),
        })
    }

    #[must_use]
    pub fn search_url(&self, keyword: &str) -> String {
        let encoded = utf8_percent_encode(keyword.trim(), PATH_SEGMENT);
        format!("{}{encoded}/", self.base_url)
    }

    /// Fetches the search page HTML for `keyword`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::UnexpectedStatus`] on a non-2xx status or
    /// [`ScraperError::Http`] on network failure.
    pub async fn fetch_page(&self, keyword: &str) -> Result<(String, String), ScraperError> {
        let url = self.search_url(keyword);
        let response = self
            .client
            .get(&url)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8",
            )
            .header(reqwest::header::ACCEPT_LANGUAGE, "ja,en-US;q=0.7")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.text().await?;
        Ok((url, body))
    }
}

/// Extracts up to `limit` listing items from search-page HTML.
///
/// Listing elements without a link are skipped.
///
/// # Errors
///
/// Returns [`ScraperError::MarkupMismatch`] when the page contains no
/// listing elements at all.
pub fn parse_search_page(
    html: &str,
    page_url: &str,
    limit: usize,
) -> Result<Vec<ListingItem>, ScraperError> {
    let document = Html::parse_document(html);
    let mut listings = document.select(&LISTING_SEL).peekable();
    if listings.peek().is_none() {
        return Err(ScraperError::MarkupMismatch {
            url: page_url.to_string(),
        });
    }

    Ok(listings.filter_map(parse_listing).take(limit).collect())
}

fn parse_listing(el: ElementRef<'_>) -> Option<ListingItem> {
    let href = el
        .select(&LINK_SEL)
        .filter_map(|a| a.value().attr("href"))
        .map(str::trim)
        .find(|h| !h.is_empty() && !h.starts_with('#') && !h.starts_with("javascript:"))?;
    let url = absolutize_url(href);

    let title = TITLE_SELS.iter().find_map(|sel| {
        el.select(sel).find_map(|node| {
            let text = collapse_whitespace(&node.text().collect::<String>());
            if text.is_empty() {
                node.value()
                    .attr("title")
                    .map(collapse_whitespace)
                    .filter(|t| !t.is_empty())
            } else {
                Some(text)
            }
        })
    })?;

    let full_text = el.text().collect::<String>();
    let price_yen = parse_price(&full_text);

    let shop_name = el
        .select(&SHOP_SEL)
        .map(|s| collapse_whitespace(&s.text().collect::<String>()))
        .find(|s| !s.is_empty())
        .unwrap_or_default();

    let image_url = el
        .select(&IMG_SEL)
        .filter_map(|img| {
            img.value()
                .attr("src")
                .or_else(|| img.value().attr("data-src"))
        })
        .map(str::trim)
        .find(|src| !src.is_empty() && !src.starts_with("data:"))
        .map(absolutize_url);

    Some(ListingItem {
        title,
        url,
        price_yen,
        shop_name,
        image_url,
    })
}

/// First `N円` amount in `text`, commas removed.
#[must_use]
pub fn parse_price(text: &str) -> Option<i64> {
    PRICE_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().replace(',', "").parse::<i64>().ok())
}

/// Resolves protocol-relative (`//host/…`) and root-relative (`/…`) hrefs to
/// absolute `https://` URLs. Anything else is returned unchanged.
#[must_use]
pub fn absolutize_url(href: &str) -> String {
    if let Some(rest) = href.strip_prefix("//") {
        format!("https://{rest}")
    } else if href.starts_with('/') {
        format!("{ITEM_HOST}{href}")
    } else {
        href.to_string()
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Tier 2: scrape the keyword search page.
pub struct ScrapeTier {
    client: SearchPageClient,
}

impl ScrapeTier {
    #[must_use]
    pub fn new(client: SearchPageClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AcquisitionStrategy for ScrapeTier {
    fn tier(&self) -> AcquisitionTier {
        AcquisitionTier::Scrape
    }

    async fn attempt(&self, keyword: &str, desired: usize) -> Result<Vec<Product>, ScraperError> {
        let (url, body) = self.client.fetch_page(keyword).await?;
        let items = parse_search_page(&body, &url, desired)?;

        Ok(items
            .into_iter()
            .map(|item| {
                let caption = compose_caption(&item.title, item.price_yen, None);
                Product {
                    title: item.title,
                    url: item.url,
                    price_yen: item.price_yen,
                    shop_name: item.shop_name,
                    rating: None,
                    review_count: None,
                    image_url: item.image_url,
                    caption,
                    tier: AcquisitionTier::Scrape,
                }
            })
            .collect())
    }
}
