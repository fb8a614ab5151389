//! Capability traits enabling manager operations
//!
//! A resource opts into an operation by implementing the matching marker
//! trait; the operation then shows up on its [`RestfulManager`].

use serde_json::{Map, Value};
use tracing::{debug, instrument};

use super::{
    base::{ListShape, Resource, RestfulManager, RestfulObject, RestfulObjectList},
    client::RequestOptions,
    error::{OperationKind, RestfulError, Result},
    utils::{EncodedId, QueryParams},
};

/// Objects can be fetched by id
pub trait Get: Resource {}

/// The collection path itself is a single object
pub trait GetWithoutId: Resource {}

/// Objects can be created by POSTing to the collection
pub trait Create: Resource {}

/// Objects can be deleted
pub trait Delete: Resource {}

/// The collection can be listed
pub trait List: Resource {}

impl<R: Get> RestfulManager<R> {
    /// Retrieve a single object
    #[instrument(skip_all, fields(kind = R::KIND.name))]
    pub async fn get(&self, id: impl Into<EncodedId>, query: &QueryParams) -> Result<RestfulObject> {
        let path = self.object_path(&id.into());
        let options = RequestOptions::new().with_query(query.clone());

        let data = self
            .client()
            .http_get(&path, &options)
            .await
            .and_then(|payload| payload.into_json())
            .map_err(|e| e.on_http_error(OperationKind::Get))?;

        self.build_object(data, false)
    }
}

impl<R: GetWithoutId> RestfulManager<R> {
    /// Retrieve the object living at the collection path
    #[instrument(skip_all, fields(kind = R::KIND.name))]
    pub async fn fetch(&self, query: &QueryParams) -> Result<RestfulObject> {
        let options = RequestOptions::new().with_query(query.clone());

        let data = self
            .client()
            .http_get(self.path(), &options)
            .await
            .and_then(|payload| payload.into_json())
            .map_err(|e| e.on_http_error(OperationKind::Get))?;

        self.build_object(data, false)
    }
}

impl<R: Create> RestfulManager<R> {
    /// Create a new object from `data`
    pub async fn create(&self, data: Map<String, Value>) -> Result<RestfulObject> {
        let path = self.path().to_owned();
        self.create_at(&path, data).await
    }

    /// Create a new object, POSTing to `path` instead of the collection path
    #[instrument(skip(self, data), fields(kind = R::KIND.name))]
    pub async fn create_at(&self, path: &str, data: Map<String, Value>) -> Result<RestfulObject> {
        R::CREATE_ATTRS.validate_attrs(&data, &[])?;

        let options = RequestOptions::new().with_json(Value::Object(data));
        let data = self
            .client()
            .http_post(path, &options)
            .await
            .and_then(|payload| payload.into_json())
            .map_err(|e| e.on_http_error(OperationKind::Create))?;

        self.build_object(data, false)
    }
}

impl<R: Delete> RestfulManager<R> {
    /// Delete the object `id`, or the collection path itself when `None`
    #[instrument(skip_all, fields(kind = R::KIND.name))]
    pub async fn delete(&self, id: Option<EncodedId>) -> Result<()> {
        let path = match &id {
            Some(id) => self.object_path(id),
            None => self.path().to_owned(),
        };

        self.client()
            .http_delete(&path, &RequestOptions::new())
            .await
            .map_err(|e| e.on_http_error(OperationKind::Delete))?;

        Ok(())
    }
}

impl<R: List> RestfulManager<R> {
    /// Retrieve the objects of the collection
    pub async fn list(&self, query: &QueryParams) -> Result<RestfulObjectList> {
        let path = self.path().to_owned();
        self.list_at(&path, query).await
    }

    /// Retrieve a listing served at `path` instead of the collection path
    #[instrument(skip(self, query), fields(kind = R::KIND.name))]
    pub async fn list_at(&self, path: &str, query: &QueryParams) -> Result<RestfulObjectList> {
        let options = RequestOptions::new().with_query(query.clone());
        let data = self
            .client()
            .http_list(path, &options)
            .await
            .map_err(|e| e.on_http_error(OperationKind::List))?;

        self.build_list(data)
    }

    fn build_list(&self, data: Value) -> Result<RestfulObjectList> {
        let (items, more) = match (R::LIST_SHAPE, data) {
            (ListShape::Array, Value::Array(items)) => {
                let more = items.last().is_some_and(has_more_marker);
                (items, more)
            },
            (ListShape::Dict { copy_id_attr }, Value::Object(entries)) => {
                let items = entries
                    .into_iter()
                    .map(|(key, mut value)| {
                        if let (Some(attr), Value::Object(attrs)) = (copy_id_attr, &mut value) {
                            attrs.insert(attr.to_owned(), Value::String(key));
                        }
                        value
                    })
                    .collect();
                (items, false)
            },
            (ListShape::Array, other) | (ListShape::Dict { .. }, other) => {
                return Err(RestfulError::parsing(format!(
                    "Unexpected {} list response: {other}",
                    R::KIND.name
                )));
            },
        };

        let objects = items
            .into_iter()
            .map(|item| self.build_object(item, true))
            .collect::<Result<Vec<_>>>()?;
        debug!(count = objects.len(), more, "Listed objects");

        Ok(RestfulObjectList::new(objects, more))
    }
}

/// Gerrit flags truncated results with `_more_<kind>: true` on the last item
fn has_more_marker(item: &Value) -> bool {
    item.as_object().is_some_and(|attrs| {
        attrs
            .iter()
            .any(|(key, value)| key.starts_with("_more_") && value.as_bool() == Some(true))
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_more_marker() {
        assert!(has_more_marker(&json!({"id": 1, "_more_changes": true})));
        assert!(!has_more_marker(&json!({"id": 1, "_more_changes": false})));
        assert!(!has_more_marker(&json!({"id": 1})));
        assert!(!has_more_marker(&json!([1])));
    }
}
