//! Domain types, configuration and store contracts shared by every roomfeed
//! crate.

pub mod app_config;
pub mod caption;
pub mod categories;
pub mod config;
pub mod products;
pub mod stats;
pub mod store;

use thiserror::Error;

pub use app_config::{AppConfig, Environment, PostingCredentials};
pub use caption::{compose_caption, compose_synthetic_caption, format_price_yen};
pub use categories::{load_categories, CategoriesFile, CategoryConfig};
pub use config::{load_app_config, load_app_config_from_env};
pub use products::{AcquisitionTier, PostOutcome, Product, ProductRecord};
pub use stats::{calendar_day, DailyStats};
pub use store::{DailyStatsStore, ProductStore, StoreError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read categories file {path}: {source}")]
    CategoriesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse categories file: {0}")]
    CategoriesFileParse(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Validation(String),
}
