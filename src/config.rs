//! Startup configuration.
//!
//! Read once from a TOML file; the Telegram credentials may come from the
//! environment instead. Anything required that is missing is a
//! [`ConfigError`] and the process never enters the poll loop.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::notify::ListingFilter;
use crate::retry::RetryPolicy;
use crate::scrapers::divar::DEFAULT_ENDPOINT;
use crate::scrapers::SearchFilters;

pub const TOKEN_ENV: &str = "DIVAR_WATCH_TELEGRAM_TOKEN";
pub const CHAT_ID_ENV: &str = "DIVAR_WATCH_CHAT_ID";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramConfig {
    pub token: String,
    pub chat_id: String,
}

#[derive(Debug, Clone)]
pub struct DivarConfig {
    pub endpoint: String,
    /// Prefix of the public post link; the token is appended
    pub post_base_url: String,
    pub authorization: Option<String>,
    pub request_timeout: Duration,
    pub filters: SearchFilters,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub fetch_interval: Duration,
    pub log_level: String,
    pub retry: RetryPolicy,
    pub page_delay: Duration,
    pub message_delay: Duration,
    pub snapshot_path: PathBuf,
    pub log_file: Option<PathBuf>,
}

/// Validated configuration for one process run.
#[derive(Debug, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub divar: DivarConfig,
    pub settings: Settings,
    pub filter: ListingFilter,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    telegram: RawTelegram,
    divar: RawDivar,
    settings: RawSettings,
    filter: ListingFilter,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTelegram {
    token: Option<String>,
    chat_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawDivar {
    city_ids: Vec<String>,
    category: Option<String>,
    districts: Vec<String>,
    max_rent: Option<u64>,
    max_credit: Option<u64>,
    sort: String,
    authorization: Option<String>,
    endpoint: String,
    post_base_url: String,
    request_timeout_secs: u64,
}

impl Default for RawDivar {
    fn default() -> Self {
        Self {
            city_ids: Vec::new(),
            category: None,
            districts: Vec::new(),
            max_rent: None,
            max_credit: None,
            sort: "sort_date".to_string(),
            authorization: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            post_base_url: "https://divar.ir/v/".to_string(),
            request_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawSettings {
    fetch_interval: u64,
    log_level: String,
    max_retries: u32,
    retry_backoff: u64,
    page_delay_ms: u64,
    message_delay_ms: u64,
    snapshot_path: PathBuf,
    log_file: String,
}

impl Default for RawSettings {
    fn default() -> Self {
        Self {
            fetch_interval: 300,
            log_level: "info".to_string(),
            max_retries: 0,
            retry_backoff: 5,
            page_delay_ms: 1000,
            message_delay_ms: 1000,
            snapshot_path: PathBuf::from("old_data.json"),
            log_file: "divar_bot.log".to_string(),
        }
    }
}

impl Config {
    /// Load from a TOML file, with credentials overridable from the process
    /// environment.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text, |key| std::env::var(key).ok())
    }

    /// Parse and validate. `env` resolves environment overrides.
    pub fn from_toml(
        text: &str,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(text)?;

        let token = non_empty(env(TOKEN_ENV).or(raw.telegram.token))
            .ok_or(ConfigError::Missing("telegram.token"))?;
        let chat_id = non_empty(env(CHAT_ID_ENV).or(raw.telegram.chat_id))
            .ok_or(ConfigError::Missing("telegram.chat_id"))?;

        let divar = raw.divar;
        if divar.city_ids.iter().all(|c| c.trim().is_empty()) {
            return Err(ConfigError::Missing("divar.city_ids"));
        }
        let category = non_empty(divar.category).ok_or(ConfigError::Missing("divar.category"))?;
        if divar.request_timeout_secs == 0 {
            return Err(ConfigError::invalid("divar.request_timeout_secs", "must be positive"));
        }

        let settings = raw.settings;
        if settings.fetch_interval == 0 {
            return Err(ConfigError::invalid("settings.fetch_interval", "must be positive"));
        }

        Ok(Self {
            telegram: TelegramConfig { token, chat_id },
            divar: DivarConfig {
                endpoint: divar.endpoint,
                post_base_url: divar.post_base_url,
                authorization: non_empty(divar.authorization),
                request_timeout: Duration::from_secs(divar.request_timeout_secs),
                filters: SearchFilters {
                    city_ids: divar.city_ids,
                    category,
                    districts: divar.districts,
                    max_rent: divar.max_rent,
                    max_credit: divar.max_credit,
                    sort: divar.sort,
                },
            },
            settings: Settings {
                fetch_interval: Duration::from_secs(settings.fetch_interval),
                log_level: settings.log_level.to_lowercase(),
                retry: RetryPolicy {
                    max_retries: settings.max_retries,
                    backoff: Duration::from_secs(settings.retry_backoff),
                },
                page_delay: Duration::from_millis(settings.page_delay_ms),
                message_delay: Duration::from_millis(settings.message_delay_ms),
                snapshot_path: settings.snapshot_path,
                log_file: non_empty(Some(settings.log_file)).map(PathBuf::from),
            },
            filter: raw.filter,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [telegram]
        token = "123:abc"
        chat_id = "-100200300"

        [divar]
        city_ids = ["1"]
        category = "apartment-rent"
    "#;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_toml(MINIMAL, no_env).unwrap();

        assert_eq!(config.telegram.token, "123:abc");
        assert_eq!(config.divar.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.divar.post_base_url, "https://divar.ir/v/");
        assert_eq!(config.divar.filters.sort, "sort_date");
        assert_eq!(config.settings.fetch_interval, Duration::from_secs(300));
        assert_eq!(config.settings.retry, RetryPolicy { max_retries: 0, backoff: Duration::from_secs(5) });
        assert_eq!(config.settings.snapshot_path, PathBuf::from("old_data.json"));
        assert_eq!(config.settings.log_file, Some(PathBuf::from("divar_bot.log")));
        assert_eq!(config.filter, ListingFilter::default());
    }

    #[test]
    fn test_full_config() {
        let text = r#"
            [telegram]
            token = "123:abc"
            chat_id = "42"

            [divar]
            city_ids = ["1", "2"]
            category = "apartment-rent"
            districts = ["925", "173"]
            max_rent = 12000000
            max_credit = 200000000
            authorization = "Basic abc"

            [settings]
            fetch_interval = 60
            log_level = "DEBUG"
            max_retries = 3
            retry_backoff = 2
            page_delay_ms = 0
            log_file = ""

            [filter]
            excluded_title_keywords = ["اشتراکی"]
        "#;
        let config = Config::from_toml(text, no_env).unwrap();

        assert_eq!(config.divar.filters.city_ids, vec!["1", "2"]);
        assert_eq!(config.divar.filters.max_rent, Some(12_000_000));
        assert_eq!(config.divar.authorization.as_deref(), Some("Basic abc"));
        assert_eq!(config.settings.log_level, "debug");
        assert_eq!(config.settings.retry.max_retries, 3);
        assert_eq!(config.settings.page_delay, Duration::ZERO);
        assert_eq!(config.settings.log_file, None);
        assert_eq!(config.filter.excluded_title_keywords, vec!["اشتراکی"]);
        assert_eq!(config.filter.suspicious_price_patterns, vec!["۱۱۱"]);
    }

    #[test]
    fn test_env_overrides_credentials() {
        let env = |key: &str| match key {
            TOKEN_ENV => Some("from-env".to_string()),
            _ => None,
        };
        let config = Config::from_toml(MINIMAL, env).unwrap();

        assert_eq!(config.telegram.token, "from-env");
        assert_eq!(config.telegram.chat_id, "-100200300");
    }

    #[test]
    fn test_missing_required_values() {
        let no_token = MINIMAL.replace("token = \"123:abc\"", "");
        assert!(matches!(
            Config::from_toml(&no_token, no_env),
            Err(ConfigError::Missing("telegram.token"))
        ));

        let no_cities = MINIMAL.replace("city_ids = [\"1\"]", "city_ids = []");
        assert!(matches!(
            Config::from_toml(&no_cities, no_env),
            Err(ConfigError::Missing("divar.city_ids"))
        ));

        let no_category = MINIMAL.replace("category = \"apartment-rent\"", "");
        assert!(matches!(
            Config::from_toml(&no_category, no_env),
            Err(ConfigError::Missing("divar.category"))
        ));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let text = format!("{MINIMAL}\n[settings]\nfetch_interval = 0\n");
        assert!(matches!(
            Config::from_toml(&text, no_env),
            Err(ConfigError::Invalid { key: "settings.fetch_interval", .. })
        ));
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            Config::from_toml("[telegram\ntoken=", no_env),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_unreadable_file() {
        let err = Config::load(Path::new("/nonexistent/divar-watch.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
