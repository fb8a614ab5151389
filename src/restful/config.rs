//! Configuration management for RESTful clients

use std::{path::PathBuf, time::Duration};

use compact_str::{format_compact, CompactString};

use super::{
    auth::Auth,
    error::{RestfulError, Result},
};

/// Default User-Agent header sent with every request
pub fn default_user_agent() -> CompactString {
    format_compact!("{}/{}", crate::TITLE, crate::VERSION)
}

/// Main configuration for a RESTful client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server base URL
    pub base_url: CompactString,
    /// Credentials attached to every request
    pub auth: Option<Auth>,
    /// TLS certificate verification
    pub ssl_verify: SslVerify,
    /// Default request timeout
    pub timeout: Option<Duration>,
    /// User-Agent header value
    pub user_agent: CompactString,
    /// Retry behaviour
    pub retry: RetryConfig,
    /// Debug configuration
    pub debug: DebugConfig,
}

/// TLS certificate verification mode
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SslVerify {
    #[default]
    Enabled,
    Disabled,
    /// Verify against the certificates of a PEM bundle
    CaFile(PathBuf),
}

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retry connection errors and 500, 502, 503, 504 and 52x responses
    pub retry_transient_errors: bool,
    /// Wait and retry on 429 responses
    pub obey_rate_limit: bool,
    /// Retries before giving up; -1 retries forever
    pub max_retries: i32,
}

/// Debug and logging configuration
#[derive(Debug, Clone)]
pub struct DebugConfig {
    /// Enable debug logging of HTTP responses
    pub log_responses: bool,
    /// Directory for storing debug logs
    pub log_directory: Option<PathBuf>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retry_transient_errors: false,
            obey_rate_limit: true,
            max_retries: 10,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_responses: false,
            log_directory: Some(PathBuf::from("uanti-logs")),
        }
    }
}

impl ClientConfig {
    /// Create a new client configuration
    pub fn new(base_url: impl Into<CompactString>) -> Self {
        Self {
            base_url: base_url.into(),
            auth: None,
            ssl_verify: SslVerify::default(),
            timeout: None,
            user_agent: default_user_agent(),
            retry: RetryConfig::default(),
            debug: DebugConfig::default(),
        }
    }

    /// Create a builder for fluent configuration
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(RestfulError::config("Base URL cannot be empty"));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(RestfulError::config("Base URL must start with http:// or https://"));
        }

        url::Url::parse(&self.base_url)
            .map_err(|e| RestfulError::invalid_url(self.base_url.as_str(), e))?;

        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(RestfulError::config("Timeout must be greater than zero"));
        }

        if self.retry.max_retries < -1 {
            return Err(RestfulError::config_validation(
                "max_retries",
                "must be -1 (forever) or a non-negative number",
            ));
        }

        if self.user_agent.is_empty() {
            return Err(RestfulError::config_validation("user_agent", "cannot be empty"));
        }

        Ok(())
    }

    /// Set credentials
    pub fn with_auth(mut self, auth: Option<Auth>) -> Self {
        self.auth = auth;
        self
    }

    /// Set TLS verification mode
    pub fn with_ssl_verify(mut self, ssl_verify: SslVerify) -> Self {
        self.ssl_verify = ssl_verify;
        self
    }

    /// Set default request timeout
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set retry configuration
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Enable retries of transient errors
    pub fn with_retry_transient_errors(mut self, enabled: bool) -> Self {
        self.retry.retry_transient_errors = enabled;
        self
    }

    /// Set debug configuration
    pub fn with_debug(mut self, debug: DebugConfig) -> Self {
        self.debug = debug;
        self
    }

    /// Enable debug logging
    pub fn with_debug_logging(mut self, enabled: bool) -> Self {
        self.debug.log_responses = enabled;
        self
    }
}

/// Builder for ClientConfig
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    base_url: Option<CompactString>,
    auth: Option<Auth>,
    ssl_verify: Option<SslVerify>,
    timeout: Option<Duration>,
    user_agent: Option<CompactString>,
    retry: Option<RetryConfig>,
    debug: Option<DebugConfig>,
}

impl ClientConfigBuilder {
    /// Set base URL
    pub fn base_url(mut self, url: impl Into<CompactString>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Use HTTP Basic authentication
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some(Auth::basic(username, password));
        self
    }

    /// Set TLS verification mode
    pub fn ssl_verify(mut self, ssl_verify: SslVerify) -> Self {
        self.ssl_verify = Some(ssl_verify);
        self
    }

    /// Set request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<CompactString>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Retry connection errors and transient server errors
    pub fn retry_transient_errors(mut self, enabled: bool) -> Self {
        let mut retry = self.retry.unwrap_or_default();
        retry.retry_transient_errors = enabled;
        self.retry = Some(retry);
        self
    }

    /// Set maximum number of retries
    pub fn max_retries(mut self, max_retries: i32) -> Self {
        let mut retry = self.retry.unwrap_or_default();
        retry.max_retries = max_retries;
        self.retry = Some(retry);
        self
    }

    /// Wait and retry on 429 responses
    pub fn obey_rate_limit(mut self, enabled: bool) -> Self {
        let mut retry = self.retry.unwrap_or_default();
        retry.obey_rate_limit = enabled;
        self.retry = Some(retry);
        self
    }

    /// Enable debug logging
    pub fn debug_logging(mut self, enabled: bool) -> Self {
        let mut debug = self.debug.unwrap_or_default();
        debug.log_responses = enabled;
        self.debug = Some(debug);
        self
    }

    /// Set directory for response logs
    pub fn log_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        let mut debug = self.debug.unwrap_or_default();
        debug.log_directory = Some(directory.into());
        self.debug = Some(debug);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<ClientConfig> {
        let base_url = self
            .base_url
            .ok_or_else(|| RestfulError::config("Base URL is required"))?;

        let config = ClientConfig {
            base_url,
            auth: self.auth,
            ssl_verify: self.ssl_verify.unwrap_or_default(),
            timeout: self.timeout,
            user_agent: self.user_agent.unwrap_or_else(default_user_agent),
            retry: self.retry.unwrap_or_default(),
            debug: self.debug.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}
