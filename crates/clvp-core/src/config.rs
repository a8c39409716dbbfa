use url::Url;

use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
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
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Parsing and validation are decoupled from the process environment so they
/// can be tested with a plain `HashMap` lookup.
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
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| invalid(var, e.to_string()))
    };

    let env = parse_environment(&or_default("CLVP_ENV", "development"))?;
    let log_level = or_default("CLVP_LOG_LEVEL", "info");

    let store_url = match lookup("CLVP_STORE_URL") {
        Ok(raw) if !raw.trim().is_empty() => {
            let url = Url::parse(raw.trim()).map_err(|e| invalid("CLVP_STORE_URL", e.to_string()))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(invalid(
                    "CLVP_STORE_URL",
                    format!("unsupported scheme {}", url.scheme()),
                ));
            }
            Some(url)
        }
        _ => None,
    };

    let request_timeout_secs = parse_u64("CLVP_REQUEST_TIMEOUT_SECS", "30")?;
    let navigation_timeout_secs = parse_u64("CLVP_NAVIGATION_TIMEOUT_SECS", "15")?;
    if navigation_timeout_secs == 0 {
        return Err(invalid(
            "CLVP_NAVIGATION_TIMEOUT_SECS",
            "must be greater than zero".to_string(),
        ));
    }
    let user_agent = or_default("CLVP_USER_AGENT", "clvp/0.1 (variant-picker)");
    let max_retries = parse_u32("CLVP_MAX_RETRIES", "1")?;
    let retry_backoff_base_ms = parse_u64("CLVP_RETRY_BACKOFF_BASE_MS", "250")?;

    let entry_separator = or_default("CLVP_ENTRY_SEPARATOR", crate::ENTRY_SEPARATOR);
    if entry_separator.chars().count() != 3 {
        return Err(invalid(
            "CLVP_ENTRY_SEPARATOR",
            format!("expected 3 characters, got {entry_separator:?}"),
        ));
    }

    let raw_field = or_default("CLVP_FIELD_SEPARATOR", &crate::FIELD_SEPARATOR.to_string());
    let mut field_chars = raw_field.chars();
    let field_separator = match (field_chars.next(), field_chars.next()) {
        (Some(c), None) => c,
        _ => {
            return Err(invalid(
                "CLVP_FIELD_SEPARATOR",
                format!("expected 1 character, got {raw_field:?}"),
            ))
        }
    };
    if entry_separator.contains(field_separator) {
        return Err(invalid(
            "CLVP_FIELD_SEPARATOR",
            "must not occur in the entry separator".to_string(),
        ));
    }

    Ok(AppConfig {
        env,
        log_level,
        store_url,
        request_timeout_secs,
        navigation_timeout_secs,
        user_agent,
        max_retries,
        retry_backoff_base_ms,
        entry_separator,
        field_separator,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "CLVP_ENV".to_string(),
            reason: format!("unknown environment {other:?}"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
