use std::time::Duration;

use url::Url;

use crate::combination::Separators;

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

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    /// Storefront origin used to resolve relative product paths.
    pub store_url: Option<Url>,
    pub request_timeout_secs: u64,
    pub navigation_timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub entry_separator: String,
    pub field_separator: char,
}

impl AppConfig {
    /// Upper bound on one navigation, retries included.
    #[must_use]
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    #[must_use]
    pub fn separators(&self) -> Separators {
        Separators {
            entry: self.entry_separator.clone(),
            field: self.field_separator,
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Query strings on the store URL can carry preview or access tokens.
        let store_url = self.store_url.as_ref().map(|url| {
            if url.query().is_some() {
                format!("{}[redacted]", &url[..url::Position::AfterPath])
            } else {
                url.to_string()
            }
        });
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("store_url", &store_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("navigation_timeout_secs", &self.navigation_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("entry_separator", &self.entry_separator)
            .field("field_separator", &self.field_separator)
            .finish()
    }
}
