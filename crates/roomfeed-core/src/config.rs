use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

pub(crate) const DEFAULT_API_BASE_URL: &str =
    "https://app.rakuten.co.jp/services/api/IchibaItem/Search/20220601";
pub(crate) const DEFAULT_SEARCH_BASE_URL: &str = "https://search.rakuten.co.jp/search/mall/";
pub(crate) const DEFAULT_ROOM_BASE_URL: &str = "https://room.rakuten.co.jp/";
pub(crate) const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
#[allow(clippy::too_many_lines)]
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    // Blank values count as unset so an empty line in `.env` does not
    // enable a tier with an empty credential.
    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        let raw = or_default(var, default);
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(invalid(var, format!("expected a boolean, got '{other}'"))),
        }
    };

    let database_url = require("DATABASE_URL")?;

    let env = parse_environment(&or_default("ROOMFEED_ENV", "development"))?;
    let log_level = or_default("ROOMFEED_LOG_LEVEL", "info");
    let categories_path = PathBuf::from(or_default(
        "ROOMFEED_CATEGORIES_PATH",
        "./config/categories.yaml",
    ));

    let rakuten_app_id = optional("RAKUTEN_APP_ID");
    let room_email = optional("ROOM_EMAIL");
    let room_password = optional("ROOM_PASSWORD");

    let db_max_connections = parse_u32("ROOMFEED_DB_MAX_CONNECTIONS", "5")?;
    let db_min_connections = parse_u32("ROOMFEED_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("ROOMFEED_DB_ACQUIRE_TIMEOUT_SECS", "10")?;
    if db_min_connections > db_max_connections {
        return Err(invalid(
            "ROOMFEED_DB_MIN_CONNECTIONS",
            format!("must not exceed ROOMFEED_DB_MAX_CONNECTIONS ({db_max_connections})"),
        ));
    }

    let api_base_url = or_default("ROOMFEED_API_BASE_URL", DEFAULT_API_BASE_URL);
    let api_timeout_secs = parse_u64("ROOMFEED_API_TIMEOUT_SECS", "10")?;
    let search_base_url = or_default("ROOMFEED_SEARCH_BASE_URL", DEFAULT_SEARCH_BASE_URL);
    let scrape_timeout_secs = parse_u64("ROOMFEED_SCRAPE_TIMEOUT_SECS", "15")?;
    let user_agent = or_default("ROOMFEED_USER_AGENT", DEFAULT_USER_AGENT);

    let max_keywords_per_run = parse_usize("ROOMFEED_MAX_KEYWORDS_PER_RUN", "8")?;
    if max_keywords_per_run == 0 {
        return Err(invalid(
            "ROOMFEED_MAX_KEYWORDS_PER_RUN",
            "must be at least 1".to_string(),
        ));
    }

    let keyword_delay_min_ms = parse_u64("ROOMFEED_KEYWORD_DELAY_MIN_MS", "2000")?;
    let keyword_delay_max_ms = parse_u64("ROOMFEED_KEYWORD_DELAY_MAX_MS", "5000")?;
    if keyword_delay_min_ms > keyword_delay_max_ms {
        return Err(invalid(
            "ROOMFEED_KEYWORD_DELAY_MIN_MS",
            format!("must not exceed ROOMFEED_KEYWORD_DELAY_MAX_MS ({keyword_delay_max_ms})"),
        ));
    }

    let daily_post_limit = parse_u32("ROOMFEED_DAILY_POST_LIMIT", "3")?;
    if daily_post_limit == 0 {
        return Err(invalid(
            "ROOMFEED_DAILY_POST_LIMIT",
            "must be at least 1".to_string(),
        ));
    }

    let post_interval_min_secs = parse_u64("ROOMFEED_POST_INTERVAL_MIN_SECS", "300")?;
    let post_interval_max_secs = parse_u64("ROOMFEED_POST_INTERVAL_MAX_SECS", "600")?;
    if post_interval_min_secs > post_interval_max_secs {
        return Err(invalid(
            "ROOMFEED_POST_INTERVAL_MIN_SECS",
            format!("must not exceed ROOMFEED_POST_INTERVAL_MAX_SECS ({post_interval_max_secs})"),
        ));
    }

    let publish_synthetic = parse_bool("ROOMFEED_PUBLISH_SYNTHETIC", "false")?;
    let stats_path = PathBuf::from(or_default("ROOMFEED_STATS_PATH", "./daily_stats.json"));

    let stats_utc_offset_hours = or_default("ROOMFEED_STATS_UTC_OFFSET_HOURS", "9")
        .parse::<i32>()
        .map_err(|e| invalid("ROOMFEED_STATS_UTC_OFFSET_HOURS", e.to_string()))?;
    if !(-23..=23).contains(&stats_utc_offset_hours) {
        return Err(invalid(
            "ROOMFEED_STATS_UTC_OFFSET_HOURS",
            format!("{stats_utc_offset_hours} is outside -23..=23"),
        ));
    }

    let room_base_url = or_default("ROOMFEED_ROOM_BASE_URL", DEFAULT_ROOM_BASE_URL);
    let chromium_path = optional("ROOMFEED_CHROMIUM_PATH").map(PathBuf::from);
    let browser_headless = parse_bool("ROOMFEED_BROWSER_HEADLESS", "true")?;

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        categories_path,
        rakuten_app_id,
        room_email,
        room_password,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        api_base_url,
        api_timeout_secs,
        search_base_url,
        scrape_timeout_secs,
        user_agent,
        max_keywords_per_run,
        keyword_delay_min_ms,
        keyword_delay_max_ms,
        daily_post_limit,
        post_interval_min_secs,
        post_interval_max_secs,
        publish_synthetic,
        stats_path,
        stats_utc_offset_hours,
        room_base_url,
        chromium_path,
        browser_headless,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test` or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "ROOMFEED_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
