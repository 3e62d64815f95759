use std::env;
use std::time::Duration;

use storefront_pay::{
    FlowConfig, RetryPolicy, DEFAULT_MAX_RETRIES, DEFAULT_REDIRECT_DELAY, DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_RETRY_DELAY,
};
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:8080";

#[derive(Clone)]
pub struct VerifierConfig {
    /// Storefront backend base URL
    pub api_url: String,
    /// Session token; present means the caller is signed in
    pub auth_token: Option<String>,
    /// Extra confirmation attempts after the first
    pub max_retries: u32,
    /// Pause between confirmation attempts
    pub retry_delay: Duration,
    /// Pause before navigating to the outcome page
    pub redirect_delay: Duration,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl std::fmt::Debug for VerifierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifierConfig")
            .field("api_url", &self.api_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .field("redirect_delay", &self.redirect_delay)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            auth_token: None,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            redirect_delay: DEFAULT_REDIRECT_DELAY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl VerifierConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Unset and empty values fall
    /// back to defaults; malformed numbers are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|s| !s.trim().is_empty());
        let defaults = Self::default();

        let api_url = var("STOREFRONT_API_URL").unwrap_or(defaults.api_url);
        let parsed =
            Url::parse(&api_url).map_err(|_| ConfigError::InvalidUrl(api_url.clone()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl(api_url));
        }
        if parsed.scheme() == "http"
            && !matches!(parsed.host_str(), Some("localhost" | "127.0.0.1"))
        {
            tracing::warn!(
                api_url = %api_url,
                "STOREFRONT_API_URL does not use HTTPS, session token will be sent in cleartext"
            );
        }

        let auth_token = var("STOREFRONT_AUTH_TOKEN");

        let max_retries = match var("VERIFY_MAX_RETRIES") {
            Some(s) => parse_number("VERIFY_MAX_RETRIES", &s)?,
            None => defaults.max_retries,
        };
        let retry_delay = match var("VERIFY_RETRY_DELAY_MS") {
            Some(s) => Duration::from_millis(parse_number("VERIFY_RETRY_DELAY_MS", &s)?),
            None => defaults.retry_delay,
        };
        let redirect_delay = match var("REDIRECT_DELAY_MS") {
            Some(s) => Duration::from_millis(parse_number("REDIRECT_DELAY_MS", &s)?),
            None => defaults.redirect_delay,
        };
        let request_timeout = match var("VERIFY_TIMEOUT_SECS") {
            Some(s) => Duration::from_secs(parse_number("VERIFY_TIMEOUT_SECS", &s)?),
            None => defaults.request_timeout,
        };
        if request_timeout.is_zero() {
            return Err(ConfigError::InvalidNumber {
                name: "VERIFY_TIMEOUT_SECS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            api_url,
            auth_token,
            max_retries,
            retry_delay,
            redirect_delay,
            request_timeout,
        })
    }

    pub fn flow_config(&self) -> FlowConfig {
        FlowConfig {
            retry: RetryPolicy {
                max_retries: self.max_retries,
                delay: self.retry_delay,
            },
            redirect_delay: self.redirect_delay,
        }
    }
}

fn parse_number<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber {
            name,
            value: value.to_string(),
        })
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("invalid value for {name}: {value}")]
    InvalidNumber { name: &'static str, value: String },
}
