use crate::app_config::{AppConfig, Environment, ItemFailurePolicy};
use crate::ConfigError;

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
/// Decoupled from the process environment so it can be exercised with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let database_url = require("DATABASE_URL")?;

    let env = parse_environment(&or_default("SUPCAT_ENV", "development"))?;

    let bind_addr = parse("SUPCAT_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("SUPCAT_LOG_LEVEL", "info");
    let suppliers_path = PathBuf::from(or_default(
        "SUPCAT_SUPPLIERS_PATH",
        "./config/suppliers.yaml",
    ));

    let db_max_connections = parse_u32("SUPCAT_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("SUPCAT_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("SUPCAT_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let http_timeout_secs = parse_u64("SUPCAT_HTTP_TIMEOUT_SECS", "30")?;
    let http_user_agent = or_default("SUPCAT_HTTP_USER_AGENT", "supcat/0.1 (supplier-ingest)");
    let http_max_retries = parse_u32("SUPCAT_HTTP_MAX_RETRIES", "2")?;
    let http_retry_backoff_base_secs = parse_u64("SUPCAT_HTTP_RETRY_BACKOFF_BASE_SECS", "1")?;

    let pull_timeout_secs = parse_u64("SUPCAT_PULL_TIMEOUT_SECS", "300")?;
    let sitemap_concurrency = parse_usize("SUPCAT_SITEMAP_CONCURRENCY", "4")?;
    if sitemap_concurrency == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "SUPCAT_SITEMAP_CONCURRENCY".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let item_failure_policy =
        parse_item_failure_policy(&or_default("SUPCAT_ITEM_FAILURE_POLICY", "isolate"))?;

    let image_fetch_url = lookup("SUPCAT_IMAGE_FETCH_URL")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let image_queue_capacity = parse_usize("SUPCAT_IMAGE_QUEUE_CAPACITY", "256")?;
    let image_fetch_max_retries = parse_u32("SUPCAT_IMAGE_FETCH_MAX_RETRIES", "3")?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        suppliers_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        http_timeout_secs,
        http_user_agent,
        http_max_retries,
        http_retry_backoff_base_secs,
        pull_timeout_secs,
        sitemap_concurrency,
        item_failure_policy,
        image_fetch_url,
        image_queue_capacity,
        image_fetch_max_retries,
    })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "SUPCAT_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

fn parse_item_failure_policy(s: &str) -> Result<ItemFailurePolicy, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "isolate" => Ok(ItemFailurePolicy::Isolate),
        "abort" => Ok(ItemFailurePolicy::Abort),
        other => Err(ConfigError::InvalidEnvVar {
            var: "SUPCAT_ITEM_FAILURE_POLICY".to_string(),
            reason: format!("expected 'isolate' or 'abort', got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
