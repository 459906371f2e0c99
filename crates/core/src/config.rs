//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the
//! API client. Nothing in the core reads process-wide environment variables
//! while handling a command; the `*_from_env_value` helpers take the raw
//! value so callers decide where it comes from.

use crate::constants::{
    API_ENDPOINT_ENV, DEFAULT_API_ENDPOINT, DEFAULT_REQUEST_TIMEOUT_SECS, REQUEST_TIMEOUT_ENV,
};
use crate::{HcduError, HcduResult};
use std::time::Duration;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    api_endpoint: String,
    request_timeout: Duration,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`HcduError::InvalidInput`] if the endpoint is not an http(s) URL
    /// or the timeout is zero.
    pub fn new(api_endpoint: String, request_timeout: Duration) -> HcduResult<Self> {
        validate_api_endpoint(&api_endpoint)?;
        if request_timeout.is_zero() {
            return Err(HcduError::InvalidInput(
                "request timeout must be greater than zero".into(),
            ));
        }

        Ok(Self {
            api_endpoint,
            request_timeout,
        })
    }

    /// Resolve the configuration from `HCDU_API_ENDPOINT` and
    /// `HCDU_REQUEST_TIMEOUT_SECS`, falling back to the defaults when unset.
    ///
    /// Intended to be called once at startup.
    pub fn from_env() -> HcduResult<Self> {
        let api_endpoint = api_endpoint_from_env_value(std::env::var(API_ENDPOINT_ENV).ok())?;
        let request_timeout =
            request_timeout_from_env_value(std::env::var(REQUEST_TIMEOUT_ENV).ok())?;
        tracing::info!(
            "API endpoint {} (timeout {}s)",
            api_endpoint,
            request_timeout.as_secs()
        );
        Self::new(api_endpoint, request_timeout)
    }

    pub fn api_endpoint(&self) -> &str {
        &self.api_endpoint
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

fn validate_api_endpoint(endpoint: &str) -> HcduResult<()> {
    if endpoint.trim().is_empty() {
        return Err(HcduError::InvalidInput("API endpoint cannot be empty".into()));
    }
    if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
        return Err(HcduError::InvalidInput(format!(
            "API endpoint must be an http(s) URL, got '{endpoint}'"
        )));
    }
    if endpoint.chars().any(char::is_whitespace) {
        return Err(HcduError::InvalidInput(
            "API endpoint must not contain whitespace".into(),
        ));
    }
    Ok(())
}

/// Parse the API endpoint from an optional raw value.
///
/// `None` or blank values resolve to [`DEFAULT_API_ENDPOINT`].
pub fn api_endpoint_from_env_value(value: Option<String>) -> HcduResult<String> {
    let endpoint = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string());
    validate_api_endpoint(&endpoint)?;
    Ok(endpoint)
}

/// Parse the request timeout (whole seconds) from an optional raw value.
///
/// `None` or blank values resolve to [`DEFAULT_REQUEST_TIMEOUT_SECS`].
pub fn request_timeout_from_env_value(value: Option<String>) -> HcduResult<Duration> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let secs = match value {
        Some(v) => v.parse::<u64>().map_err(|_| {
            HcduError::InvalidInput(format!("request timeout must be whole seconds, got '{v}'"))
        })?,
        None => DEFAULT_REQUEST_TIMEOUT_SECS,
    };
    if secs == 0 {
        return Err(HcduError::InvalidInput(
            "request timeout must be greater than zero".into(),
        ));
    }
    Ok(Duration::from_secs(secs))
}
