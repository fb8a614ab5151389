//! Gerrit service root

use std::{path::PathBuf, sync::Arc};

use compact_str::format_compact;
use reqwest::header::{HeaderValue, ACCEPT};
use serde_json::Value;
use tracing::{debug, info};

use super::objects::{Account, Change, DocResult, Group, Project, ProjectAccess};
use crate::restful::{
    auth::{default_netrc_path, Auth},
    client::{BodyDecoder, RestfulClient},
    config::ClientConfig,
    error::Result,
    RestfulManager,
};

/// Public Gerrit instance used when no URL is configured
pub const GERRIT_SERVICE_ROOT: &str = "https://review.opendev.org";

/// Line Gerrit prepends to every JSON response to defeat XSSI
const GERRIT_MAGIC_JSON_PREFIX: &[u8] = b")]}'";

/// JSON decoder that strips Gerrit's `)]}'` guard line.
///
/// An empty body decodes to `null`.
#[derive(Debug, Default, Clone, Copy)]
pub struct GerritJsonDecoder;

impl BodyDecoder for GerritJsonDecoder {
    fn decode(&self, body: &[u8]) -> serde_json::Result<Value> {
        let body = body.trim_ascii();
        if body.is_empty() {
            return Ok(Value::Null);
        }

        let body = body.strip_prefix(GERRIT_MAGIC_JSON_PREFIX).unwrap_or(body);
        serde_json::from_slice(body)
    }
}

/// Root Gerrit API handle.
///
/// Authenticated clients talk to the `/a` endpoints. When the configuration
/// carries no credentials, the user's netrc file is consulted for the host.
#[derive(Debug, Clone)]
pub struct Gerrit {
    client: Arc<RestfulClient>,
}

impl Gerrit {
    /// Create a Gerrit handle, looking up missing credentials in the default
    /// netrc file
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_netrc(config, default_netrc_path())
    }

    /// Create a Gerrit handle for `url` with default settings
    pub fn from_url(url: &str) -> Result<Self> {
        Self::new(ClientConfig::new(url))
    }

    /// Create a Gerrit handle, looking up missing credentials in `netrc`
    pub fn with_netrc(mut config: ClientConfig, netrc: Option<PathBuf>) -> Result<Self> {
        if config.auth.is_none() {
            if let Some(path) = netrc {
                match Auth::basic_from_netrc_file(&config.base_url, &path) {
                    Ok(auth) => config.auth = Some(auth),
                    Err(e) => debug!(error = %e, "No netrc credentials"),
                }
            }
        }

        if config.auth.is_some() {
            config.base_url = format_compact!("{}/a", config.base_url.trim_end_matches('/'));
        }

        let client = RestfulClient::new(config)?
            .with_header(ACCEPT, HeaderValue::from_static("application/json"))
            .with_decoder(GerritJsonDecoder);
        info!(url = client.url(), "Gerrit client ready");

        Ok(Self { client: Arc::new(client) })
    }

    /// API root, including the `/a` suffix when authenticated
    pub fn url(&self) -> &str {
        self.client.url()
    }

    pub fn client(&self) -> &Arc<RestfulClient> {
        &self.client
    }

    pub fn changes(&self) -> RestfulManager<Change> {
        RestfulManager::new(Arc::clone(&self.client))
    }

    pub fn accounts(&self) -> RestfulManager<Account> {
        RestfulManager::new(Arc::clone(&self.client))
    }

    pub fn groups(&self) -> RestfulManager<Group> {
        RestfulManager::new(Arc::clone(&self.client))
    }

    pub fn projects(&self) -> RestfulManager<Project> {
        RestfulManager::new(Arc::clone(&self.client))
    }

    pub fn access(&self) -> RestfulManager<ProjectAccess> {
        RestfulManager::new(Arc::clone(&self.client))
    }

    pub fn documentation(&self) -> RestfulManager<DocResult> {
        RestfulManager::new(Arc::clone(&self.client))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;

    use super::*;

    #[test]
    fn test_decoder_strips_magic_prefix() {
        let decoder = GerritJsonDecoder;
        assert_eq!(decoder.decode(b")]}'\n{\"id\": 1}\n").unwrap(), json!({"id": 1}));
        assert_eq!(decoder.decode(b"[1, 2]").unwrap(), json!([1, 2]));
        assert_eq!(decoder.decode(b"  \n").unwrap(), Value::Null);
        assert!(decoder.decode(b")]}'\nnot json").is_err());
    }

    #[test]
    fn test_anonymous_client_has_no_prefix() {
        let gerrit = Gerrit::with_netrc(ClientConfig::new("https://review.example.com/"), None).unwrap();
        assert_eq!(gerrit.url(), "https://review.example.com");
        assert_eq!(gerrit.client().headers().get(ACCEPT).unwrap(), "application/json");
    }

    #[test]
    fn test_authenticated_client_uses_a_prefix() {
        let config = ClientConfig::new("https://review.example.com/")
            .with_auth(Some(Auth::basic("alice", "s3cret")));
        let gerrit = Gerrit::with_netrc(config, None).unwrap();
        assert_eq!(gerrit.url(), "https://review.example.com/a");
    }

    #[test]
    fn test_netrc_credentials_used() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "machine review.example.com login alice password s3cret").unwrap();

        let config = ClientConfig::new("https://review.example.com");
        let gerrit = Gerrit::with_netrc(config, Some(file.path().to_path_buf())).unwrap();

        assert_eq!(gerrit.url(), "https://review.example.com/a");
        assert_eq!(gerrit.client().config().auth, Some(Auth::basic("alice", "s3cret")));

        let config = ClientConfig::new("https://other.example.com");
        let gerrit = Gerrit::with_netrc(config, Some(file.path().to_path_buf())).unwrap();
        assert_eq!(gerrit.url(), "https://other.example.com");
    }

    #[test]
    fn test_manager_paths() {
        let gerrit = Gerrit::with_netrc(ClientConfig::new(GERRIT_SERVICE_ROOT), None).unwrap();
        assert_eq!(gerrit.changes().path(), "/changes/");
        assert_eq!(gerrit.accounts().path(), "/accounts/");
        assert_eq!(gerrit.groups().path(), "/groups/");
        assert_eq!(gerrit.projects().path(), "/projects/");
        assert_eq!(gerrit.access().path(), "/access/");
        assert_eq!(gerrit.documentation().path(), "/Documentation/");
    }
}
