//! Test utilities and common fixtures for the Gerrit binding

use serde_json::{json, Value};
use wiremock::ResponseTemplate;

use crate::{
    gerrit::client::Gerrit,
    restful::{auth::Auth, config::ClientConfig},
};


/// Sample ChangeInfo
pub fn change_json(number: u64, subject: &str) -> Value {
    json!({
        "id": format!("platform%2Fbuild~main~I{number:040x}"),
        "project": "platform/build",
        "branch": "main",
        "change_id": format!("I{number:040x}"),
        "subject": subject,
        "status": "NEW",
        "_number": number,
        "owner": {"_account_id": 1000096},
    })
}

/// Sample AccountInfo
pub fn account_json(id: u64, username: &str) -> Value {
    json!({
        "_account_id": id,
        "name": username.to_uppercase(),
        "username": username,
        "email": format!("{username}@example.com"),
    })
}

/// Sample GroupInfo, with the url-encoded ids the server sends
pub fn group_json(name: &str) -> Value {
    json!({
        "id": format!("{}%3A{name}", "ldap"),
        "name": name,
        "owner": "Administrators",
        "owner_id": "global%3ARegistered-Users",
        "group_id": 7,
    })
}

/// Sample ProjectInfo keyed the way project listings are
pub fn project_json(name: &str) -> Value {
    json!({
        "id": name.replace('/', "%2F"),
        "name": name,
        "state": "ACTIVE",
    })
}

/// JSON response carrying Gerrit's XSSI guard line
pub fn gerrit_response(status: u16, body: &Value) -> ResponseTemplate {
    ResponseTemplate::new(status)
        .set_body_raw(format!(")]}}'\n{body}\n").into_bytes(), "application/json")
}

/// Mock Gerrit server for testing
#[allow(dead_code)]
pub struct MockServer {
    pub server: wiremock::MockServer,
}

#[allow(dead_code)]
impl MockServer {
    /// Start a new mock server
    pub async fn start() -> Self {
        let server = wiremock::MockServer::start().await;
        Self { server }
    }

    /// Get the base URL of the mock server
    pub fn base_url(&self) -> String {
        self.server.uri()
    }

    /// Anonymous client for this mock server; netrc is never consulted
    pub fn gerrit(&self) -> Gerrit {
        Gerrit::with_netrc(ClientConfig::new(self.base_url()), None).unwrap()
    }

    /// Client authenticated as `user`/`pass`
    pub fn authenticated_gerrit(&self) -> Gerrit {
        let config = ClientConfig::new(self.base_url()).with_auth(Some(Auth::basic("user", "pass")));
        Gerrit::with_netrc(config, None).unwrap()
    }
}

#[cfg(test)]
#[allow(clippy::module_inception)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures() {
        let change = change_json(1, "Fix build");
        assert_eq!(change["_number"], 1);
        assert!(change["id"].as_str().unwrap().starts_with("platform%2Fbuild~main~I"));

        assert_eq!(group_json("devs")["id"], "ldap%3Adevs");
        assert_eq!(project_json("a/b")["id"], "a%2Fb");
        assert_eq!(account_json(5, "alice")["email"], "alice@example.com");
    }
}
