//! Authentication handlers

use std::{
    fmt,
    path::{Path, PathBuf},
};

use digest_auth::{AuthContext, HttpMethod};
use directories::BaseDirs;
use reqwest::{Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{RestfulError, Result};

/// HTTP authentication scheme
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
    #[default]
    Basic,
    Digest,
}

/// Credentials attached to every request
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    /// HTTP Basic authentication
    Basic { username: String, password: String },
    /// HTTP Digest authentication, sent once the server has issued a challenge
    Digest { username: String, password: String },
}

impl Auth {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Auth::Basic { username: username.into(), password: password.into() }
    }

    pub fn digest(username: impl Into<String>, password: impl Into<String>) -> Self {
        Auth::Digest { username: username.into(), password: password.into() }
    }

    pub fn new(scheme: AuthScheme, username: impl Into<String>, password: impl Into<String>) -> Self {
        match scheme {
            AuthScheme::Basic => Self::basic(username, password),
            AuthScheme::Digest => Self::digest(username, password),
        }
    }

    pub fn scheme(&self) -> AuthScheme {
        match self {
            Auth::Basic { .. } => AuthScheme::Basic,
            Auth::Digest { .. } => AuthScheme::Digest,
        }
    }

    /// HTTP Basic authentication with credentials looked up in the user's
    /// netrc file for the host of `url`
    pub fn basic_from_netrc(url: &str) -> Result<Self> {
        let path = default_netrc_path().ok_or(RestfulError::Netrc)?;
        Self::from_netrc_file(AuthScheme::Basic, url, &path)
    }

    /// HTTP Digest authentication with netrc credentials
    pub fn digest_from_netrc(url: &str) -> Result<Self> {
        let path = default_netrc_path().ok_or(RestfulError::Netrc)?;
        Self::from_netrc_file(AuthScheme::Digest, url, &path)
    }

    /// Like [`Auth::basic_from_netrc`], reading an explicit netrc file
    pub fn basic_from_netrc_file(url: &str, path: &Path) -> Result<Self> {
        Self::from_netrc_file(AuthScheme::Basic, url, path)
    }

    /// Credentials for the host of `url` from the netrc file at `path`
    pub fn from_netrc_file(scheme: AuthScheme, url: &str, path: &Path) -> Result<Self> {
        let host = url::Url::parse(url)
            .map_err(|e| RestfulError::invalid_url(url, e))?
            .host_str()
            .map(str::to_owned)
            .ok_or(RestfulError::Netrc)?;

        let contents = std::fs::read_to_string(path).map_err(|e| {
            debug!(path = %path.display(), error = %e, "Unable to read netrc");
            RestfulError::Netrc
        })?;

        let netrc = Netrc::parse(&contents);
        let entry = netrc.authenticators(&host).ok_or(RestfulError::Netrc)?;
        let login = if entry.login.is_empty() { &entry.account } else { &entry.login };

        debug!(host = %host, ?scheme, "Using netrc credentials");
        Ok(Self::new(scheme, login.clone(), entry.password.clone()))
    }

    pub(crate) fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Auth::Basic { username, password } => request.basic_auth(username, Some(password)),
            Auth::Digest { .. } => request,
        }
    }

    /// `Authorization` value answering a digest `challenge` for `method` on
    /// `uri` (path and query of the request)
    pub(crate) fn answer_challenge(&self, method: &Method, uri: &str, challenge: &str) -> Option<String> {
        let Auth::Digest { username, password } = self else {
            return None;
        };
        if !is_digest_challenge(challenge) {
            return None;
        }

        let mut prompt = digest_auth::parse(challenge)
            .map_err(|e| debug!(error = %e, "Unusable digest challenge"))
            .ok()?;
        let mut context = AuthContext::new(username.as_str(), password.as_str(), uri);
        context.method = HttpMethod::from(method.as_str());

        prompt
            .respond(&context)
            .map(|answer| answer.to_header_string())
            .map_err(|e| debug!(error = %e, "Unable to answer digest challenge"))
            .ok()
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, username) = match self {
            Auth::Basic { username, .. } => ("Basic", username),
            Auth::Digest { username, .. } => ("Digest", username),
        };
        f.debug_struct(name)
            .field("username", username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// `WWW-Authenticate` value offering the Digest scheme
pub(crate) fn is_digest_challenge(value: &str) -> bool {
    value
        .trim_start()
        .get(..6)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("digest"))
}

/// `$NETRC`, then `~/.netrc`, then `~/_netrc`
pub fn default_netrc_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("NETRC") {
        return Some(PathBuf::from(path));
    }

    let home = BaseDirs::new()?.home_dir().to_path_buf();
    [".netrc", "_netrc"]
        .iter()
        .map(|name| home.join(name))
        .find(|path| path.exists())
}

/// One `machine` (or `default`) block of a netrc file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetrcEntry {
    pub login: String,
    pub account: String,
    pub password: String,
}

/// Parsed netrc file
#[derive(Debug, Clone, Default)]
pub struct Netrc {
    machines: Vec<(String, NetrcEntry)>,
    default: Option<NetrcEntry>,
}

impl Netrc {
    pub fn parse(contents: &str) -> Self {
        let mut netrc = Netrc::default();
        let mut current: Option<(Option<String>, NetrcEntry)> = None;
        let mut lines = contents.lines();

        while let Some(line) = lines.next() {
            let mut tokens = line.split_whitespace();
            while let Some(token) = tokens.next() {
                match token {
                    "machine" | "default" => {
                        netrc.finish(current.take());
                        let name = if token == "machine" {
                            tokens.next().map(str::to_owned)
                        } else {
                            None
                        };
                        current = Some((name, NetrcEntry::default()));
                    },
                    "login" | "user" => {
                        if let (Some((_, entry)), Some(value)) = (current.as_mut(), tokens.next()) {
                            entry.login = value.to_owned();
                        }
                    },
                    "account" => {
                        if let (Some((_, entry)), Some(value)) = (current.as_mut(), tokens.next()) {
                            entry.account = value.to_owned();
                        }
                    },
                    "password" => {
                        if let (Some((_, entry)), Some(value)) = (current.as_mut(), tokens.next()) {
                            entry.password = value.to_owned();
                        }
                    },
                    "macdef" => {
                        // macro body runs until the next empty line
                        for body in lines.by_ref() {
                            if body.trim().is_empty() {
                                break;
                            }
                        }
                        break;
                    },
                    _ if token.starts_with('#') => break,
                    _ => {},
                }
            }
        }

        netrc.finish(current);
        netrc
    }

    fn finish(&mut self, entry: Option<(Option<String>, NetrcEntry)>) {
        match entry {
            Some((Some(machine), entry)) => self.machines.push((machine, entry)),
            Some((None, entry)) => self.default = Some(entry),
            None => {},
        }
    }

    /// Credentials for `host`, falling back to the `default` block
    pub fn authenticators(&self, host: &str) -> Option<&NetrcEntry> {
        self.machines
            .iter()
            .find(|(machine, _)| machine == host)
            .map(|(_, entry)| entry)
            .or(self.default.as_ref())
    }
}
