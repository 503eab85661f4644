//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use clap::{Args, builder::BoolishValueParser};
use config::{Config, Environment, File};
use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::cache::CacheConfig;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "piazza";
const DEFAULT_API_BASE: &str = "http://127.0.0.1:3000/";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PAGE_LIMIT: u32 = 20;
const DEFAULT_COMMENT_PAGE_LIMIT: u32 = 10;

/// CLI overrides, flattened into the binary's argument parser. Every field
/// is optional; unset fields fall through to environment and file values.
#[derive(Debug, Args, Default, Clone)]
pub struct Overrides {
    /// Override the API base URL.
    #[arg(long = "api-base", env = "PIAZZA_API_BASE", value_name = "URL")]
    pub api_base: Option<String>,

    /// Override the per-request timeout.
    #[arg(long = "api-timeout-seconds", value_name = "SECONDS")]
    pub api_timeout_seconds: Option<u64>,

    /// Override the page size used for list requests.
    #[arg(long = "page-limit", value_name = "COUNT")]
    pub page_limit: Option<u32>,

    /// Override the token file location.
    #[arg(long = "token-file", env = "PIAZZA_TOKEN_FILE", value_name = "PATH")]
    pub token_file: Option<PathBuf>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

/// Fully-resolved client settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api: ApiSettings,
    pub credentials: CredentialSettings,
    pub cache: CacheSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Base URL every endpoint path is joined onto. Always ends in `/`.
    pub base_url: Url,
    pub timeout: Duration,
    /// Page size for list requests.
    pub page_limit: NonZeroU32,
    /// Page size for comment threads.
    pub comment_page_limit: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct CredentialSettings {
    /// Token file location. `None` falls back to the platform default under
    /// the user configuration directory.
    pub token_path: Option<PathBuf>,
}

/// Entity cache bounds. Mirrors [`CacheConfig`], which carries the defaults.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub post_limit: usize,
    pub profile_limit: usize,
    pub post_page_limit: usize,
    pub comment_page_limit: usize,
    pub user_page_limit: usize,
    pub search_freshness_secs: u64,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(config_file: Option<&Path>, overrides: &Overrides) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = config_file {
        builder = builder.add_source(File::from(path).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix("PIAZZA")
            .separator("__")
            .try_parsing(true),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(overrides);
    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    api: RawApiSettings,
    credentials: RawCredentialSettings,
    cache: RawCacheSettings,
    logging: RawLoggingSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawApiSettings {
    base_url: Option<String>,
    timeout_seconds: Option<u64>,
    page_limit: Option<u32>,
    comment_page_limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCredentialSettings {
    token_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    post_limit: Option<usize>,
    profile_limit: Option<usize>,
    post_page_limit: Option<usize>,
    comment_page_limit: Option<usize>,
    user_page_limit: Option<usize>,
    search_freshness_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(base) = overrides.api_base.as_ref() {
            self.api.base_url = Some(base.clone());
        }
        if let Some(seconds) = overrides.api_timeout_seconds {
            self.api.timeout_seconds = Some(seconds);
        }
        if let Some(limit) = overrides.page_limit {
            self.api.page_limit = Some(limit);
        }
        if let Some(path) = overrides.token_file.as_ref() {
            self.credentials.token_path = Some(path.clone());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            api,
            credentials,
            cache,
            logging,
        } = raw;

        Ok(Self {
            api: build_api_settings(api)?,
            credentials: CredentialSettings {
                token_path: credentials.token_path,
            },
            cache: build_cache_settings(cache),
            logging: build_logging_settings(logging)?,
        })
    }
}

fn build_api_settings(api: RawApiSettings) -> Result<ApiSettings, LoadError> {
    let raw_base = api
        .base_url
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
    let mut base_url = Url::parse(raw_base.trim())
        .map_err(|err| LoadError::invalid("api.base_url", err.to_string()))?;
    if base_url.cannot_be_a_base() {
        return Err(LoadError::invalid(
            "api.base_url",
            "URL cannot serve as a base for endpoint paths",
        ));
    }
    // Relative endpoint paths join onto the base, so it must end in a slash.
    if !base_url.path().ends_with('/') {
        let path = format!("{}/", base_url.path());
        base_url.set_path(&path);
    }

    let timeout_secs = api.timeout_seconds.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "api.timeout_seconds",
            "must be greater than zero",
        ));
    }

    let page_limit = non_zero_u32(
        api.page_limit.unwrap_or(DEFAULT_PAGE_LIMIT).into(),
        "api.page_limit",
    )?;
    let comment_page_limit = non_zero_u32(
        api.comment_page_limit
            .unwrap_or(DEFAULT_COMMENT_PAGE_LIMIT)
            .into(),
        "api.comment_page_limit",
    )?;

    Ok(ApiSettings {
        base_url,
        timeout: Duration::from_secs(timeout_secs),
        page_limit,
        comment_page_limit,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> CacheSettings {
    let defaults = CacheConfig::default();
    CacheSettings {
        post_limit: cache.post_limit.unwrap_or(defaults.post_limit),
        profile_limit: cache.profile_limit.unwrap_or(defaults.profile_limit),
        post_page_limit: cache.post_page_limit.unwrap_or(defaults.post_page_limit),
        comment_page_limit: cache
            .comment_page_limit
            .unwrap_or(defaults.comment_page_limit),
        user_page_limit: cache.user_page_limit.unwrap_or(defaults.user_page_limit),
        search_freshness_secs: cache
            .search_freshness_secs
            .unwrap_or(defaults.search_freshness_secs),
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    fn defaults_are_usable() {
        let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

        assert_eq!(settings.api.base_url.as_str(), DEFAULT_API_BASE);
        assert_eq!(settings.api.timeout, Duration::from_secs(30));
        assert_eq!(settings.api.page_limit.get(), 20);
        assert_eq!(settings.api.comment_page_limit.get(), 10);
        assert!(settings.credentials.token_path.is_none());
        assert_eq!(settings.cache.post_limit, 512);
        assert_eq!(settings.cache.search_freshness_secs, 30);
        assert_eq!(settings.logging.level, LevelFilter::INFO);
        assert!(matches!(settings.logging.format, LogFormat::Compact));
    }

    #[test]
    fn cli_overrides_take_highest_precedence() {
        let mut raw = RawSettings::default();
        raw.api.base_url = Some("https://file.example.com".to_string());
        raw.logging.level = Some("info".to_string());

        let overrides = Overrides {
            api_base: Some("https://cli.example.com".to_string()),
            log_level: Some("debug".to_string()),
            ..Default::default()
        };

        raw.apply_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert_eq!(settings.api.base_url.host_str(), Some("cli.example.com"));
        assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    }

    #[test]
    fn base_url_gains_trailing_slash() {
        let mut raw = RawSettings::default();
        raw.api.base_url = Some("https://example.com/piazza".to_string());

        let settings = Settings::from_raw(raw).expect("valid settings");
        assert_eq!(settings.api.base_url.path(), "/piazza/");
    }

    #[test]
    fn malformed_base_url_is_rejected() {
        let mut raw = RawSettings::default();
        raw.api.base_url = Some("not a url".to_string());

        let err = Settings::from_raw(raw).expect_err("invalid URL");
        assert!(matches!(err, LoadError::Invalid { key, .. } if key == "api.base_url"));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut raw = RawSettings::default();
        raw.api.timeout_seconds = Some(0);

        let err = Settings::from_raw(raw).expect_err("zero timeout");
        assert!(matches!(err, LoadError::Invalid { key, .. } if key == "api.timeout_seconds"));
    }

    #[test]
    fn zero_page_limit_is_rejected() {
        let mut raw = RawSettings::default();
        raw.api.page_limit = Some(0);

        let err = Settings::from_raw(raw).expect_err("zero page limit");
        assert!(matches!(err, LoadError::Invalid { key, .. } if key == "api.page_limit"));
    }

    #[test]
    fn cli_json_logging_enforces_format() {
        let mut raw = RawSettings::default();
        let overrides = Overrides {
            log_json: Some(true),
            ..Default::default()
        };

        raw.apply_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert!(matches!(settings.logging.format, LogFormat::Json));
    }

    #[test]
    #[serial]
    fn environment_variables_feed_the_builder() {
        // SAFETY: guarded by #[serial]; no other test mutates this variable.
        unsafe {
            std::env::set_var("PIAZZA_API__BASE_URL", "https://env.example.com");
            std::env::set_var("PIAZZA_CACHE__POST_LIMIT", "64");
        }

        let settings = load(None, &Overrides::default()).expect("valid settings");

        unsafe {
            std::env::remove_var("PIAZZA_API__BASE_URL");
            std::env::remove_var("PIAZZA_CACHE__POST_LIMIT");
        }

        assert_eq!(settings.api.base_url.host_str(), Some("env.example.com"));
        assert_eq!(settings.cache.post_limit, 64);
    }

    #[test]
    #[serial]
    fn cli_wins_over_environment() {
        unsafe {
            std::env::set_var("PIAZZA_API__BASE_URL", "https://env.example.com");
        }

        let overrides = Overrides {
            api_base: Some("https://cli.example.com".to_string()),
            ..Default::default()
        };
        let settings = load(None, &overrides).expect("valid settings");

        unsafe {
            std::env::remove_var("PIAZZA_API__BASE_URL");
        }

        assert_eq!(settings.api.base_url.host_str(), Some("cli.example.com"));
    }
}
