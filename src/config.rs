use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use compact_str::CompactString;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::{
    gerrit::{cli::ConnectionArgs, GERRIT_SERVICE_ROOT},
    restful::{
        auth::{Auth, AuthScheme},
        config::{ClientConfig, SslVerify},
        error::RestfulError,
    },
    result::{Result, UantiError},
};

/// Settings stored in the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GerritConfig {
    /// The URL of the Gerrit instance
    pub url: CompactString,
    /// Username for HTTP authentication
    pub username: Option<CompactString>,
    /// HTTP password of `username`
    pub password: Option<CompactString>,
    /// `basic` or `digest`
    pub auth_type: AuthScheme,
    /// Verify TLS certificates
    pub ssl_verify: bool,
    /// PEM bundle to verify TLS certificates against
    pub ca_file: Option<PathBuf>,
    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
    /// Retry after 500, 502, 503, 504 and 52x responses
    pub retry_transient_errors: bool,
    /// Log level, e.g. `debug`
    pub log_level: Option<CompactString>,
    /// Write every response body to the response log directory
    pub log_responses: bool,
}

impl Default for GerritConfig {
    fn default() -> Self {
        Self {
            url: GERRIT_SERVICE_ROOT.into(),
            username: None,
            password: None,
            auth_type: AuthScheme::Basic,
            ssl_verify: true,
            ca_file: None,
            timeout_secs: None,
            retry_transient_errors: false,
            log_level: None,
            log_responses: false,
        }
    }
}

impl GerritConfig {
    /// Override file settings with the ones given on the command line
    pub fn apply_args(&mut self, args: &ConnectionArgs) {
        if let Some(url) = &args.url {
            self.url = url.as_str().into();
        }
        if let Some(username) = &args.username {
            self.username = Some(username.as_str().into());
        }
        if let Some(password) = &args.password {
            self.password = Some(password.as_str().into());
        }
        if let Some(auth_type) = args.auth_type {
            self.auth_type = auth_type;
        }
        if args.no_ssl_verify {
            self.ssl_verify = false;
            self.ca_file = None;
        }
        if let Some(ca_file) = &args.ca_file {
            self.ssl_verify = true;
            self.ca_file = Some(ca_file.clone());
        }
        if let Some(timeout) = args.timeout {
            self.timeout_secs = Some(timeout);
        }
        if args.retry_transient_errors {
            self.retry_transient_errors = true;
        }
    }

    /// Client configuration for these settings
    pub fn to_client_config(&self) -> crate::restful::Result<ClientConfig> {
        let auth = match (&self.username, &self.password) {
            (Some(username), Some(password)) => {
                Some(Auth::new(self.auth_type, username.as_str(), password.as_str()))
            },
            (None, None) => None,
            _ => {
                return Err(RestfulError::config(
                    "Both username and password are required for authentication",
                ))
            },
        };

        let ssl_verify = match (&self.ca_file, self.ssl_verify) {
            (Some(ca_file), true) => SslVerify::CaFile(ca_file.clone()),
            (None, true) => SslVerify::Enabled,
            (_, false) => SslVerify::Disabled,
        };

        let config = ClientConfig::new(self.url.clone())
            .with_auth(auth)
            .with_ssl_verify(ssl_verify)
            .with_timeout(self.timeout_secs.map(Duration::from_secs))
            .with_retry_transient_errors(self.retry_transient_errors)
            .with_debug_logging(self.log_responses);

        config.validate()?;
        Ok(config)
    }
}

pub fn default_config_path() -> PathBuf {
    if let Some(dirs) = BaseDirs::new() {
        dirs.config_dir().join("uanti.toml")
    } else {
        PathBuf::from("uanti.toml")
    }
}

/// Load the configuration file; a missing file yields the defaults
pub fn load_config(config_file: &Path) -> Result<GerritConfig> {
    if !config_file.exists() {
        return Ok(GerritConfig::default());
    }

    confy::load_path(config_file).map_err(UantiError::ConfigError)
}

pub fn save_config(config_file: &Path, config: &GerritConfig) -> Result<()> {
    confy::store_path(config_file, config).map_err(UantiError::ConfigError)?;

    Ok(())
}
