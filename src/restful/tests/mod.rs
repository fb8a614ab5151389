//! Test utilities and common fixtures for the RESTful layer

use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::restful::{
    base::{ListShape, ObjectKind, Resource, RestfulManager},
    client::RestfulClient,
    config::ClientConfig,
    mixins::{Create, Delete, Get, GetWithoutId, List},
    types::RequiredOptional,
};


/// Array-listed resource with every capability
pub struct Item;

impl Resource for Item {
    const KIND: ObjectKind = ObjectKind::new("Item").repr_attr("name");
    const PATH: &'static str = "/items";
    const CREATE_ATTRS: RequiredOptional =
        RequiredOptional::new().required(&["name"]).optional(&["description"]);
    const LIST_FILTERS: &'static [&'static str] = &["state"];

    fn prepare_attrs(attrs: &mut Map<String, Value>) -> crate::restful::Result<()> {
        attrs.remove("_more_items");
        Ok(())
    }
}

impl Get for Item {}
impl Create for Item {}
impl Delete for Item {}
impl List for Item {}

/// Resource listed as a dictionary keyed by name
pub struct Registry;

impl Resource for Registry {
    const KIND: ObjectKind = ObjectKind::new("Registry");
    const PATH: &'static str = "/registries/";
    const LIST_SHAPE: ListShape = ListShape::Dict { copy_id_attr: Some("id") };
}

impl List for Registry {}

/// Singleton read straight from its collection path
pub struct ServerInfo;

impl Resource for ServerInfo {
    const KIND: ObjectKind = ObjectKind::new("ServerInfo").id_attr(None);
    const PATH: &'static str = "/config/server/info";
}

impl GetWithoutId for ServerInfo {}

/// Sample item as served by the mock server
pub fn item_json(id: u64, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": format!("{name} description"),
    })
}

/// Error body carrying a `message` field
pub fn error_response(message: &str) -> Value {
    json!({ "message": message })
}

/// Mock HTTP server for testing
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

    /// Create a test config pointing to this mock server
    pub fn test_config(&self) -> ClientConfig {
        ClientConfig::new(self.base_url())
    }

    /// Create a client for this mock server
    pub fn client(&self) -> RestfulClient {
        RestfulClient::new(self.test_config()).unwrap()
    }

    /// Create a manager for this mock server
    pub fn manager<R: Resource>(&self) -> RestfulManager<R> {
        RestfulManager::new(Arc::new(self.client()))
    }
}

#[cfg(test)]
#[allow(clippy::module_inception)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures() {
        let item = item_json(1, "first");
        assert_eq!(item["id"], 1);
        assert_eq!(item["description"], "first description");
        assert_eq!(error_response("gone")["message"], "gone");
    }
}
