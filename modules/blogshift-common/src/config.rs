use std::env;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

/// How the delay between consistency re-reads grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffKind {
    Fixed,
    Exponential,
}

impl std::str::FromStr for BackoffKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(BackoffKind::Fixed),
            "exponential" => Ok(BackoffKind::Exponential),
            other => Err(anyhow!("unknown backoff kind: {other}")),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // ButterCMS
    pub buttercms_api_url: String,
    pub buttercms_read_token: String,
    pub buttercms_write_token: String,
    pub page_type: String,

    // Web server
    pub web_host: String,
    pub web_port: u16,

    // Migration
    pub read_retry_delay: Duration,
    pub read_retries: u32,
    pub read_backoff: BackoffKind,
    pub max_concurrency: Option<usize>,
}

impl Config {
    /// Load configuration from the environment (and `.env`, if present).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            buttercms_api_url: env::var("BUTTERCMS_API_URL")
                .unwrap_or_else(|_| "https://api.buttercms.com/v2".to_string()),
            buttercms_read_token: required_env("BUTTERCMS_READ_TOKEN")?,
            buttercms_write_token: required_env("BUTTERCMS_WRITE_TOKEN")?,
            page_type: env::var("BUTTERCMS_PAGE_TYPE").unwrap_or_else(|_| "blog_page".to_string()),
            web_host: env::var("WEB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_port: parsed_env("WEB_PORT", 4000)?,
            read_retry_delay: Duration::from_millis(parsed_env("MIGRATE_READ_RETRY_DELAY_MS", 1000)?),
            read_retries: parsed_env("MIGRATE_READ_RETRIES", 1)?,
            read_backoff: parsed_env("MIGRATE_READ_BACKOFF", BackoffKind::Fixed)?,
            max_concurrency: optional_parsed_env("MIGRATE_MAX_CONCURRENCY")?,
        };

        config.log_keys();
        Ok(config)
    }

    fn log_keys(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  BUTTERCMS_API_URL: {}", self.buttercms_api_url);
        tracing::info!("  BUTTERCMS_READ_TOKEN: {}", preview(&self.buttercms_read_token));
        tracing::info!("  BUTTERCMS_WRITE_TOKEN: {}", preview(&self.buttercms_write_token));
        tracing::info!(
            delay_ms = self.read_retry_delay.as_millis() as u64,
            retries = self.read_retries,
            backoff = ?self.read_backoff,
            "  read retry policy"
        );
    }
}

fn required_env(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} environment variable is required"))
}

fn parsed_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    Ok(optional_parsed_env(key)?.unwrap_or(default))
}

/// First few characters of a secret, safe to log.
fn preview(val: &str) -> String {
    let head: String = val.chars().take(5).collect();
    format!("{head}...({} chars)", val.chars().count())
}

fn optional_parsed_env<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow!("{key} is invalid: {e}")),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_kind_parses_case_insensitively() {
        assert_eq!("Fixed".parse::<BackoffKind>().unwrap(), BackoffKind::Fixed);
        assert_eq!(
            " exponential ".parse::<BackoffKind>().unwrap(),
            BackoffKind::Exponential
        );
        assert!("linear".parse::<BackoffKind>().is_err());
    }

    #[test]
    fn preview_cuts_on_char_boundaries() {
        assert_eq!(preview("abcdefgh"), "abcde...(8 chars)");
        assert_eq!(preview("ééééééé"), "ééééé...(7 chars)");
        assert_eq!(preview("ab"), "ab...(2 chars)");
    }
}
