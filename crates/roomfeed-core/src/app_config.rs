use std::path::PathBuf;

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Login credentials for the posting session.
///
/// Only required by the `post` and `full` modes; see
/// [`AppConfig::posting_credentials`].
#[derive(Clone)]
pub struct PostingCredentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for PostingCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostingCredentials")
            .field("email", &self.email)
            .field("password", &"[redacted]")
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub categories_path: PathBuf,
    /// Application id for the product-search API. `None` removes the API
    /// tier from the acquisition chain.
    pub rakuten_app_id: Option<String>,
    pub room_email: Option<String>,
    pub room_password: Option<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub api_base_url: String,
    pub api_timeout_secs: u64,
    pub search_base_url: String,
    pub scrape_timeout_secs: u64,
    pub user_agent: String,
    pub max_keywords_per_run: usize,
    pub keyword_delay_min_ms: u64,
    pub keyword_delay_max_ms: u64,
    pub daily_post_limit: u32,
    pub post_interval_min_secs: u64,
    pub post_interval_max_secs: u64,
    /// Whether synthetic placeholder rows may be published.
    pub publish_synthetic: bool,
    pub stats_path: PathBuf,
    /// Offset from UTC that defines the calendar day for the daily quota.
    pub stats_utc_offset_hours: i32,
    pub room_base_url: String,
    pub chromium_path: Option<PathBuf>,
    pub browser_headless: bool,
}

impl AppConfig {
    /// Returns the posting credentials, or an error naming the first
    /// missing variable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] if `ROOM_EMAIL` or
    /// `ROOM_PASSWORD` is not set.
    pub fn posting_credentials(&self) -> Result<PostingCredentials, ConfigError> {
        let email = self
            .room_email
            .clone()
            .ok_or_else(|| ConfigError::MissingEnvVar("ROOM_EMAIL".to_string()))?;
        let password = self
            .room_password
            .clone()
            .ok_or_else(|| ConfigError::MissingEnvVar("ROOM_PASSWORD".to_string()))?;
        Ok(PostingCredentials { email, password })
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("categories_path", &self.categories_path)
            .field("database_url", &"[redacted]")
            .field(
                "rakuten_app_id",
                &self.rakuten_app_id.as_ref().map(|_| "[redacted]"),
            )
            .field("room_email", &self.room_email)
            .field(
                "room_password",
                &self.room_password.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("api_base_url", &self.api_base_url)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("search_base_url", &self.search_base_url)
            .field("scrape_timeout_secs", &self.scrape_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_keywords_per_run", &self.max_keywords_per_run)
            .field("keyword_delay_min_ms", &self.keyword_delay_min_ms)
            .field("keyword_delay_max_ms", &self.keyword_delay_max_ms)
            .field("daily_post_limit", &self.daily_post_limit)
            .field("post_interval_min_secs", &self.post_interval_min_secs)
            .field("post_interval_max_secs", &self.post_interval_max_secs)
            .field("publish_synthetic", &self.publish_synthetic)
            .field("stats_path", &self.stats_path)
            .field("stats_utc_offset_hours", &self.stats_utc_offset_hours)
            .field("room_base_url", &self.room_base_url)
            .field("chromium_path", &self.chromium_path)
            .field("browser_headless", &self.browser_headless)
            .finish()
    }
}
