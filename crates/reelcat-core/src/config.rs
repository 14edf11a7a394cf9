use std::path::PathBuf;

use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` if a value is present but invalid.
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
/// Returns `ConfigError::InvalidEnvVar` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
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

    let parse_positive_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let value = or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value == 0 {
            return Err(invalid(var, "must be at least 1".to_string()));
        }
        Ok(value)
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        match or_default(var, default).to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            other => Err(invalid(var, format!("expected a boolean, got '{other}'"))),
        }
    };

    let env = parse_environment(&or_default("REELCAT_ENV", "development"))?;
    let log_level = or_default("REELCAT_LOG_LEVEL", "info");

    let listing_url_template = or_default(
        "REELCAT_LISTING_URL_TEMPLATE",
        "https://www.rottentomatoes.com/browse/movies_at_home/?page=",
    );
    let site_origin = or_default("REELCAT_SITE_ORIGIN", "https://www.rottentomatoes.com");
    let parsed_origin = url::Url::parse(&site_origin)
        .map_err(|e| invalid("REELCAT_SITE_ORIGIN", e.to_string()))?;
    if parsed_origin.cannot_be_a_base() {
        return Err(invalid(
            "REELCAT_SITE_ORIGIN",
            "must be an absolute http(s) origin".to_string(),
        ));
    }

    let page_start = parse_u32("REELCAT_PAGE_START", "0")?;
    let page_end = parse_u32("REELCAT_PAGE_END", "7")?;
    if page_start > page_end {
        return Err(invalid(
            "REELCAT_PAGE_START",
            format!("start page {page_start} is after end page {page_end}"),
        ));
    }

    let max_concurrent = parse_positive_usize("REELCAT_MAX_CONCURRENT", "3")?;
    let chunk_size = parse_positive_usize("REELCAT_CHUNK_SIZE", "10")?;
    let chunk_pause_ms = parse_u64("REELCAT_CHUNK_PAUSE_MS", "1000")?;

    let list_nav_timeout_secs = parse_u64("REELCAT_LIST_NAV_TIMEOUT_SECS", "60")?;
    let detail_nav_timeout_secs = parse_u64("REELCAT_DETAIL_NAV_TIMEOUT_SECS", "30")?;
    let scorecard_wait_secs = parse_u64("REELCAT_SCORECARD_WAIT_SECS", "10")?;
    let score_wait_secs = parse_u64("REELCAT_SCORE_WAIT_SECS", "5")?;
    let list_settle_ms = parse_u64("REELCAT_LIST_SETTLE_MS", "1000")?;
    let detail_settle_ms = parse_u64("REELCAT_DETAIL_SETTLE_MS", "2000")?;

    let chrome_path = lookup("REELCAT_CHROME_PATH")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from);
    let headless = parse_bool("REELCAT_HEADLESS", "true")?;

    let raw_output = PathBuf::from(or_default("REELCAT_RAW_OUTPUT", "./data/movies_raw.csv"));
    let clean_output = PathBuf::from(or_default(
        "REELCAT_CLEAN_OUTPUT",
        "./data/movies_clean.csv",
    ));

    Ok(AppConfig {
        env,
        log_level,
        listing_url_template,
        site_origin,
        page_start,
        page_end,
        max_concurrent,
        chunk_size,
        chunk_pause_ms,
        list_nav_timeout_secs,
        detail_nav_timeout_secs,
        scorecard_wait_secs,
        score_wait_secs,
        list_settle_ms,
        detail_settle_ms,
        chrome_path,
        headless,
        raw_output,
        clean_output,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for unrecognized values.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "REELCAT_ENV".to_string(),
            reason: format!(
                "unrecognized value '{other}'; expected development, test, or production"
            ),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
