pub mod api;
pub mod error;
pub mod search_page;
pub mod synthetic;
pub mod tiers;
pub mod types;

pub use api::{ApiTier, RakutenApiClient};
pub use error::ScraperError;
pub use search_page::{parse_search_page, ListingItem, ScrapeTier, SearchPageClient};
pub use synthetic::SyntheticTier;
pub use tiers::{Acquisition, AcquisitionStrategy, TierChain};
