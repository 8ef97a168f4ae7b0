//! Database operations for the `products` table.

use chrono::{DateTime, Utc};
use roomfeed_core::{AcquisitionTier, PostOutcome, Product, ProductRecord};
use sqlx::PgPool;

use crate::DbError;

const PRODUCT_COLUMNS: &str = "id, category, title, url, price_yen, shop_name, rating, \
     review_count, caption, image_url, acquisition_tier, collected_at, posted, posted_at, \
     post_outcome, last_attempt_at";

/// A row from the `products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub category: String,
    pub title: String,
    pub url: String,
    pub price_yen: Option<i64>,
    pub shop_name: String,
    pub rating: Option<f64>,
    pub review_count: Option<i64>,
    pub caption: String,
    pub image_url: Option<String>,
    /// One of `api`, `scrape`, `synthetic` (enforced by a CHECK constraint).
    pub acquisition_tier: String,
    pub collected_at: DateTime<Utc>,
    pub posted: bool,
    pub posted_at: Option<DateTime<Utc>>,
    pub post_outcome: Option<String>,
    pub last_attempt_at: Option<DateTime<Utc>>,
}

impl TryFrom<ProductRow> for ProductRecord {
    type Error = DbError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let tier =
            AcquisitionTier::parse(&row.acquisition_tier).ok_or_else(|| DbError::CorruptRow {
                id: row.id,
                column: "acquisition_tier",
                value: row.acquisition_tier.clone(),
            })?;

        let post_outcome = match row.post_outcome.as_deref() {
            None => None,
            Some(raw) => Some(PostOutcome::parse(raw).ok_or_else(|| DbError::CorruptRow {
                id: row.id,
                column: "post_outcome",
                value: raw.to_string(),
            })?),
        };

        Ok(ProductRecord {
            id: row.id,
            category: row.category,
            product: Product {
                title: row.title,
                url: row.url,
                price_yen: row.price_yen,
                shop_name: row.shop_name,
                rating: row.rating,
                review_count: row.review_count,
                image_url: row.image_url,
                caption: row.caption,
                tier,
            },
            collected_at: row.collected_at,
            posted: row.posted,
            posted_at: row.posted_at,
            post_outcome,
            last_attempt_at: row.last_attempt_at,
        })
    }
}

/// Inserts a product under `category` unless its URL is already recorded.
///
/// Returns the new row's `id`, or `None` when the URL already exists in any
/// category.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_product(
    pool: &PgPool,
    category: &str,
    product: &Product,
    collected_at: DateTime<Utc>,
) -> Result<Option<i64>, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO products \
             (category, title, url, price_yen, shop_name, rating, review_count, \
              caption, image_url, acquisition_tier, collected_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         ON CONFLICT (url) DO NOTHING \
         RETURNING id",
    )
    .bind(category)
    .bind(&product.title)
    .bind(&product.url)
    .bind(product.price_yen)
    .bind(&product.shop_name)
    .bind(product.rating)
    .bind(product.review_count)
    .bind(&product.caption)
    .bind(&product.image_url)
    .bind(product.tier.as_str())
    .bind(collected_at)
    .fetch_optional(pool)
    .await?;

    Ok(id)
}

/// Returns every row recorded under `category`, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_products_by_category(
    pool: &PgPool,
    category: &str,
) -> Result<Vec<ProductRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products \
         WHERE category = $1 \
         ORDER BY collected_at ASC, id ASC"
    ))
    .bind(category)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns every recorded product URL across all categories.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_product_urls(pool: &PgPool) -> Result<Vec<String>, DbError> {
    let urls = sqlx::query_scalar::<_, String>("SELECT url FROM products")
        .fetch_all(pool)
        .await?;
    Ok(urls)
}

/// Returns rows that have not been posted and were not marked `skipped`,
/// ordered by `collected_at` ascending.
///
/// Synthetic rows are excluded unless `include_synthetic` is `true`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_unposted_products(
    pool: &PgPool,
    include_synthetic: bool,
) -> Result<Vec<ProductRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products \
         WHERE NOT posted \
           AND (post_outcome IS NULL OR post_outcome <> 'skipped') \
           AND ($1 OR acquisition_tier <> 'synthetic') \
         ORDER BY collected_at ASC, id ASC"
    ))
    .bind(include_synthetic)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Records a publishing outcome for one row.
///
/// `success` flips `posted` and sets `posted_at`; the `NOT posted` guard keeps
/// an already-posted row from being overwritten. `failure` and `skipped` only
/// touch `post_outcome` and `last_attempt_at`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no unposted row has the given `id`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn mark_product_post_outcome(
    pool: &PgPool,
    id: i64,
    at: DateTime<Utc>,
    outcome: PostOutcome,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE products SET \
             post_outcome    = $2, \
             last_attempt_at = $3, \
             posted          = posted OR $4, \
             posted_at       = CASE WHEN $4 THEN $3 ELSE posted_at END \
         WHERE id = $1 AND NOT posted",
    )
    .bind(id)
    .bind(outcome.as_str())
    .bind(at)
    .bind(outcome == PostOutcome::Success)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
