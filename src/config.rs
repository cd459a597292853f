use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;

/// Bounded retry for remote course fetches: `max_attempts` calls with a fixed
/// `delay` between them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            delay: Duration::ZERO,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// What happens to a product whose stored id no longer resolves to a
/// published product once a replacement has been created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OrphanPolicy {
    #[default]
    Keep,
    Trash,
}

impl FromStr for OrphanPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" => Ok(Self::Keep),
            "trash" => Ok(Self::Trash),
            other => Err(AppError::Config(format!("unknown ORPHAN_POLICY: {}", other))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct StrapiConfig {
    pub api_url: String,
    pub api_token: String,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub site_url: String,
    pub course_endpoint_url: String,
    pub avatar_base_url: String,
    pub retry: RetryPolicy,
    pub fetch_timeout: Duration,
    pub batch_size: u32,
    pub default_image_id: i64,
    pub commerce_enabled: bool,
    pub fields_enabled: bool,
    pub orphan_policy: OrphanPolicy,
    pub nonce_secret: String,
    pub webhook_secret: Option<String>,
    pub strapi: Option<StrapiConfig>,
    pub sync_interval: Option<Duration>,
    pub sync_lock_ttl: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        let site_url = "http://127.0.0.1:3000".to_string();
        Self {
            database_url: "sqlite://course-sync.db?mode=rwc".to_string(),
            bind_addr: "127.0.0.1:3000".to_string(),
            course_endpoint_url: format!("{}/custom/v1/courses", site_url),
            avatar_base_url: format!("{}/wp-content/uploads/stm_lms_avatars", site_url),
            site_url,
            retry: RetryPolicy::default(),
            fetch_timeout: Duration::from_secs(10),
            batch_size: 5,
            default_image_id: 123,
            commerce_enabled: true,
            fields_enabled: true,
            orphan_policy: OrphanPolicy::Keep,
            nonce_secret: "development-nonce-secret".to_string(),
            webhook_secret: None,
            strapi: None,
            sync_interval: None,
            sync_lock_ttl: Duration::from_secs(60),
        }
    }
}

impl AppConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let defaults = Self::default();

        let site_url = env::var("SITE_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or(defaults.site_url);
        let nonce_secret = env::var("NONCE_SECRET")
            .map_err(|_| AppError::Config("NONCE_SECRET is not set".to_string()))?;

        let strapi = match (env::var("STRAPI_API_URL"), env::var("STRAPI_TOKEN")) {
            (Ok(api_url), Ok(api_token)) => Some(StrapiConfig { api_url, api_token }),
            _ => None,
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            course_endpoint_url: env::var("COURSE_ENDPOINT_URL")
                .unwrap_or_else(|_| format!("{}/custom/v1/courses", site_url)),
            avatar_base_url: env::var("AVATAR_BASE_URL")
                .unwrap_or_else(|_| format!("{}/wp-content/uploads/stm_lms_avatars", site_url)),
            site_url,
            retry: RetryPolicy {
                max_attempts: parse_var("FETCH_MAX_ATTEMPTS")?.unwrap_or(defaults.retry.max_attempts).max(1),
                delay: parse_var("FETCH_RETRY_DELAY_MS")?
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.retry.delay),
            },
            fetch_timeout: parse_var("FETCH_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.fetch_timeout),
            batch_size: parse_var("BATCH_SIZE")?.unwrap_or(defaults.batch_size).max(1),
            default_image_id: parse_var("DEFAULT_IMAGE_ID")?.unwrap_or(defaults.default_image_id),
            commerce_enabled: parse_flag("COMMERCE_ENABLED")?.unwrap_or(true),
            fields_enabled: parse_flag("FIELDS_ENABLED")?.unwrap_or(true),
            orphan_policy: parse_var("ORPHAN_POLICY")?.unwrap_or_default(),
            nonce_secret,
            webhook_secret: env::var("WEBHOOK_SECRET").ok().filter(|s| !s.is_empty()),
            strapi,
            sync_interval: parse_var("SYNC_INTERVAL_SECS")?.map(Duration::from_secs),
            sync_lock_ttl: parse_var("SYNC_LOCK_TTL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.sync_lock_ttl),
        })
    }
}

fn parse_var<T: FromStr>(key: &str) -> Result<Option<T>, AppError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| AppError::Config(format!("{} has an invalid value: {}", key, raw))),
        Err(_) => Ok(None),
    }
}

fn parse_flag(key: &str) -> Result<Option<bool>, AppError> {
    match env::var(key) {
        Ok(raw) => match raw.trim() {
            "1" | "true" | "TRUE" | "True" | "yes" => Ok(Some(true)),
            "0" | "false" | "FALSE" | "False" | "no" => Ok(Some(false)),
            _ => Err(AppError::Config(format!("{} must be a boolean: {}", key, raw))),
        },
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orphan_policy_parses_case_insensitive() {
        assert_eq!("Trash".parse::<OrphanPolicy>().unwrap(), OrphanPolicy::Trash);
        assert_eq!(" keep ".parse::<OrphanPolicy>().unwrap(), OrphanPolicy::Keep);
        assert!("delete".parse::<OrphanPolicy>().is_err());
    }

    #[test]
    fn test_default_config_points_endpoints_at_site() {
        let config = AppConfig::default();
        assert_eq!(config.course_endpoint_url, "http://127.0.0.1:3000/custom/v1/courses");
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.sync_lock_ttl, Duration::from_secs(60));
    }
}
