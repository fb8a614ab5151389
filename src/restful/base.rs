//! Objects built from server data and the managers that fetch them

use std::{
    fmt,
    hash::{Hash, Hasher},
    marker::PhantomData,
    ops::Deref,
    sync::Arc,
};

use serde_json::{Map, Value};

use super::{
    client::RestfulClient,
    error::{RestfulError, Result},
    types::RequiredOptional,
    utils::{json_type_name, EncodedId},
};

/// Static description of a resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectKind {
    /// Type name, e.g. `Change`
    pub name: &'static str,
    /// Attribute holding the unique id; `None` for resources without one
    pub id_attr: Option<&'static str>,
    /// Attribute shown as a human-readable identifier
    pub repr_attr: Option<&'static str>,
}

impl ObjectKind {
    pub const fn new(name: &'static str) -> Self {
        Self { name, id_attr: Some("id"), repr_attr: None }
    }

    pub const fn id_attr(mut self, id_attr: Option<&'static str>) -> Self {
        self.id_attr = id_attr;
        self
    }

    pub const fn repr_attr(mut self, repr_attr: &'static str) -> Self {
        self.repr_attr = Some(repr_attr);
        self
    }
}

/// How a list endpoint shapes its response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListShape {
    /// A JSON array of objects
    Array,
    /// A JSON object keyed by id; the key is copied into `copy_id_attr`
    Dict { copy_id_attr: Option<&'static str> },
}

/// A REST resource served under [`Resource::PATH`]
pub trait Resource: Send + Sync + 'static {
    const KIND: ObjectKind;

    /// Path template; `{name}` placeholders are filled from the parent object
    const PATH: &'static str;

    /// Manager attribute to parent attribute mapping used to fill `PATH`
    const FROM_PARENT_ATTRS: &'static [(&'static str, &'static str)] = &[];

    const CREATE_ATTRS: RequiredOptional = RequiredOptional::EMPTY;

    const LIST_SHAPE: ListShape = ListShape::Array;

    /// Query parameters a list call accepts
    const LIST_FILTERS: &'static [&'static str] = &[];

    /// Query parameters a get call accepts
    const OPTIONAL_GET_ATTRS: &'static [&'static str] = &[];

    /// Adjust server attributes before they are wrapped in an object
    fn prepare_attrs(_attrs: &mut Map<String, Value>) -> Result<()> {
        Ok(())
    }
}

/// An object built from server data.
///
/// Holds the attributes known from the server and, separately, the
/// attributes updated locally. Lookups check local updates first, then
/// server attributes, then the attributes inherited from the parent object
/// the manager was attached to.
#[derive(Debug, Clone)]
pub struct RestfulObject {
    kind: ObjectKind,
    attrs: Map<String, Value>,
    updated_attrs: Map<String, Value>,
    parent_attrs: Map<String, Value>,
    created_from_list: bool,
}

impl RestfulObject {
    /// Wrap a server response; anything but a JSON object is rejected
    pub fn new(
        kind: ObjectKind,
        value: Value,
        parent_attrs: Map<String, Value>,
        created_from_list: bool,
    ) -> Result<Self> {
        match value {
            Value::Object(attrs) => Ok(Self {
                kind,
                attrs,
                updated_attrs: Map::new(),
                parent_attrs,
                created_from_list,
            }),
            other => Err(RestfulError::parsing(format!(
                "Attempted to initialize RestfulObject with a non-dictionary value: {other}\n\
                 This likely indicates an incorrect or malformed server response."
            ))),
        }
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// True when built from a list call, which may carry partial data
    pub fn created_from_list(&self) -> bool {
        self.created_from_list
    }

    /// Look up an attribute
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.updated_attrs
            .get(name)
            .or_else(|| self.attrs.get(name))
            .or_else(|| self.parent_attrs.get(name))
    }

    /// Look up an attribute, failing with a descriptive error when absent
    pub fn attr(&self, name: &str) -> Result<&Value> {
        self.get(name).ok_or_else(|| self.missing_attr(name))
    }

    /// String attribute
    pub fn attr_str(&self, name: &str) -> Result<&str> {
        let value = self.attr(name)?;
        value.as_str().ok_or_else(|| {
            RestfulError::attribute(format!(
                "{:?} attribute {name:?} is a {}, not a string",
                self.kind.name,
                json_type_name(value)
            ))
        })
    }

    /// Mutable access to an attribute.
    ///
    /// The server value is copied into the local updates first so in-place
    /// edits of arrays and objects are tracked.
    pub fn attr_mut(&mut self, name: &str) -> Result<&mut Value> {
        if !self.updated_attrs.contains_key(name) {
            let value = self
                .attrs
                .get(name)
                .cloned()
                .ok_or_else(|| self.missing_attr(name))?;
            self.updated_attrs.insert(name.to_owned(), value);
        }

        Ok(self.updated_attrs.entry(name).or_insert(Value::Null))
    }

    /// Record a local update
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.updated_attrs.insert(name.into(), value.into());
    }

    /// Attributes changed locally since the last server update
    pub fn updated_attrs(&self) -> &Map<String, Value> {
        &self.updated_attrs
    }

    pub fn parent_attrs(&self) -> &Map<String, Value> {
        &self.parent_attrs
    }

    /// Replace server attributes and drop local updates
    pub fn update_attrs(&mut self, attrs: Map<String, Value>) {
        self.attrs = attrs;
        self.updated_attrs.clear();
    }

    /// Merge of parent (optionally), server and local attributes
    pub fn as_dict(&self, with_parent_attrs: bool) -> Map<String, Value> {
        let mut data = Map::new();
        if with_parent_attrs {
            data.extend(self.parent_attrs.clone());
        }
        data.extend(self.attrs.clone());
        data.extend(self.updated_attrs.clone());
        data
    }

    /// All attributes including those inherited from the parent
    pub fn attributes(&self) -> Map<String, Value> {
        self.as_dict(true)
    }

    pub fn to_json(&self, with_parent_attrs: bool) -> Result<String> {
        serde_json::to_string(&self.as_dict(with_parent_attrs))
            .map_err(|e| RestfulError::Parsing { message: e.to_string(), source: Some(e) })
    }

    /// Multi-line rendering of the attributes
    pub fn pformat(&self) -> String {
        let body = serde_json::to_string_pretty(&self.as_dict(false)).unwrap_or_default();
        format!("{} => \n{}", self.kind.name, body)
    }

    /// Value of the id attribute
    pub fn get_id(&self) -> Option<&Value> {
        self.kind
            .id_attr
            .and_then(|attr| self.get(attr))
            .filter(|id| !id.is_null())
    }

    /// Value of the human-readable identifier attribute
    pub fn repr_value(&self) -> Option<&str> {
        self.kind
            .repr_attr
            .and_then(|attr| self.get(attr))
            .and_then(Value::as_str)
    }

    fn missing_attr(&self, name: &str) -> RestfulError {
        let mut message = format!("{:?} object has no attribute {name:?}", self.kind.name);
        if self.created_from_list {
            message.push_str(&format!(
                "\n\n{} was created via a list() call and only a subset of the data may be \
                 present. To ensure all data is present get the object using a get(object.id) \
                 call.",
                self.kind.name
            ));
        }
        RestfulError::attribute(message)
    }
}

fn display_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "None".into(),
    }
}

impl fmt::Display for RestfulObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.kind.name;
        let repr = self.repr_value();

        match (self.kind.id_attr, repr) {
            (Some(id_attr), Some(repr)) if Some(id_attr) != self.kind.repr_attr => write!(
                f,
                "<{name} {id_attr}:{} {}:{repr}>",
                display_value(self.get_id()),
                self.kind.repr_attr.unwrap_or_default()
            ),
            (Some(id_attr), _) => write!(f, "<{name} {id_attr}:{}>", display_value(self.get_id())),
            (None, Some(repr)) => {
                write!(f, "<{name} {}:{repr}>", self.kind.repr_attr.unwrap_or_default())
            },
            (None, None) => write!(f, "<{name}>"),
        }
    }
}

impl PartialEq for RestfulObject {
    fn eq(&self, other: &Self) -> bool {
        match (self.get_id(), other.get_id()) {
            (Some(a), Some(b)) => a == b,
            _ => self.kind == other.kind && self.as_dict(true) == other.as_dict(true),
        }
    }
}

impl Eq for RestfulObject {}

impl Hash for RestfulObject {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.get_id() {
            Some(id) => id.to_string().hash(state),
            None => serde_json::to_string(&self.as_dict(true))
                .unwrap_or_default()
                .hash(state),
        }
    }
}

/// Objects returned by a list call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestfulObjectList {
    items: Vec<RestfulObject>,
    more: bool,
}

impl RestfulObjectList {
    pub fn new(items: Vec<RestfulObject>, more: bool) -> Self {
        Self { items, more }
    }

    /// True when the server truncated the result and more objects exist
    pub fn has_more(&self) -> bool {
        self.more
    }

    pub fn into_vec(self) -> Vec<RestfulObject> {
        self.items
    }
}

impl Deref for RestfulObjectList {
    type Target = [RestfulObject];

    fn deref(&self) -> &Self::Target {
        &self.items
    }
}

impl IntoIterator for RestfulObjectList {
    type Item = RestfulObject;
    type IntoIter = std::vec::IntoIter<RestfulObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a RestfulObjectList {
    type Item = &'a RestfulObject;
    type IntoIter = std::slice::Iter<'a, RestfulObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// CRUD operations on the objects of one resource.
///
/// Which operations are available depends on the capability traits in
/// [`super::mixins`] the resource implements.
pub struct RestfulManager<R: Resource> {
    client: Arc<RestfulClient>,
    path: String,
    parent_attrs: Map<String, Value>,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> RestfulManager<R> {
    /// Create a top-level manager
    pub fn new(client: Arc<RestfulClient>) -> Self {
        Self {
            client,
            path: R::PATH.to_owned(),
            parent_attrs: Map::new(),
            _resource: PhantomData,
        }
    }

    /// Create a manager nested under `parent`
    pub fn with_parent(client: Arc<RestfulClient>, parent: &RestfulObject) -> Result<Self> {
        let mut path = R::PATH.to_owned();
        let mut parent_attrs = Map::new();

        for (self_attr, parent_attr) in R::FROM_PARENT_ATTRS {
            match parent.get(parent_attr) {
                Some(value) => {
                    let encoded = EncodedId::try_from(value)?;
                    path = path.replace(&format!("{{{self_attr}}}"), encoded.as_str());
                    parent_attrs.insert((*self_attr).to_owned(), Value::String(encoded.into_string()));
                },
                None => {
                    parent_attrs.insert((*self_attr).to_owned(), Value::Null);
                },
            }
        }

        Ok(Self { client, path, parent_attrs, _resource: PhantomData })
    }

    /// Computed path of the managed collection
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path of a single object of the collection
    pub fn object_path(&self, id: &EncodedId) -> String {
        format!("{}/{}", self.path.trim_end_matches('/'), id)
    }

    pub fn parent_attrs(&self) -> &Map<String, Value> {
        &self.parent_attrs
    }

    pub fn client(&self) -> &Arc<RestfulClient> {
        &self.client
    }

    /// Wrap server data in an object of this resource
    pub fn build_object(&self, value: Value, created_from_list: bool) -> Result<RestfulObject> {
        let value = match value {
            Value::Object(mut attrs) => {
                R::prepare_attrs(&mut attrs)?;
                Value::Object(attrs)
            },
            other => other,
        };
        RestfulObject::new(R::KIND, value, self.parent_attrs.clone(), created_from_list)
    }
}

impl<R: Resource> Clone for RestfulManager<R> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            path: self.path.clone(),
            parent_attrs: self.parent_attrs.clone(),
            _resource: PhantomData,
        }
    }
}

impl<R: Resource> fmt::Debug for RestfulManager<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestfulManager")
            .field("kind", &R::KIND.name)
            .field("path", &self.path)
            .field("parent_attrs", &self.parent_attrs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::restful::config::ClientConfig;

    const WIDGET: ObjectKind = ObjectKind::new("Widget").repr_attr("name");
    const NAMELESS: ObjectKind = ObjectKind::new("Nameless").id_attr(None);

    struct Comment;

    impl Resource for Comment {
        const KIND: ObjectKind = ObjectKind::new("Comment");
        const PATH: &'static str = "/changes/{change_id}/comments";
        const FROM_PARENT_ATTRS: &'static [(&'static str, &'static str)] = &[("change_id", "id")];
    }

    fn object(kind: ObjectKind, value: Value) -> RestfulObject {
        RestfulObject::new(kind, value, Map::new(), false).unwrap()
    }

    fn test_client() -> Arc<RestfulClient> {
        Arc::new(RestfulClient::new(ClientConfig::new("https://review.example.com")).unwrap())
    }

    #[test]
    fn test_rejects_non_object_values() {
        let err = RestfulObject::new(WIDGET, json!([1, 2]), Map::new(), false).unwrap_err();
        assert!(matches!(err, RestfulError::Parsing { .. }));
        assert!(err.to_string().contains("malformed server response"));
    }

    #[test]
    fn test_attribute_precedence() {
        let mut parent = Map::new();
        parent.insert("project".into(), json!("parent-project"));
        parent.insert("name".into(), json!("from-parent"));

        let mut obj =
            RestfulObject::new(WIDGET, json!({"id": 1, "name": "server"}), parent, false).unwrap();
        assert_eq!(obj.get("name"), Some(&json!("server")));
        assert_eq!(obj.get("project"), Some(&json!("parent-project")));

        obj.set("name", "local");
        assert_eq!(obj.get("name"), Some(&json!("local")));
        assert_eq!(obj.as_dict(false).get("project"), None);
        assert_eq!(obj.attributes().get("project"), Some(&json!("parent-project")));
        assert_eq!(obj.as_dict(false).get("name"), Some(&json!("local")));
    }

    #[test]
    fn test_attr_mut_tracks_in_place_edits() {
        let mut obj = object(WIDGET, json!({"id": 1, "reviewers": ["alice"]}));

        obj.attr_mut("reviewers")
            .unwrap()
            .as_array_mut()
            .unwrap()
            .push(json!("bob"));

        assert_eq!(obj.updated_attrs().get("reviewers"), Some(&json!(["alice", "bob"])));
        assert_eq!(obj.get("reviewers"), Some(&json!(["alice", "bob"])));

        *obj.attr_mut("reviewers").unwrap() = json!([]);
        assert_eq!(obj.get("reviewers"), Some(&json!([])));

        assert!(matches!(obj.attr_mut("topic"), Err(RestfulError::Attribute(_))));
        assert!(obj.updated_attrs().get("topic").is_none());
    }

    #[test]
    fn test_update_attrs_discards_local_changes() {
        let mut obj = object(WIDGET, json!({"id": 1, "name": "a"}));
        obj.set("name", "b");
        obj.update_attrs(json!({"id": 1, "name": "c"}).as_object().cloned().unwrap());

        assert!(obj.updated_attrs().is_empty());
        assert_eq!(obj.attr_str("name").unwrap(), "c");
    }

    #[test]
    fn test_missing_attribute_messages() {
        let obj = object(WIDGET, json!({"id": 1}));
        let err = obj.attr("subject").unwrap_err();
        assert_eq!(err.to_string(), "\"Widget\" object has no attribute \"subject\"");

        let listed = RestfulObject::new(WIDGET, json!({"id": 1}), Map::new(), true).unwrap();
        let err = listed.attr("subject").unwrap_err();
        assert!(err.to_string().contains("created via a list() call"));
    }

    #[test]
    fn test_display() {
        assert_eq!(object(WIDGET, json!({"id": 7, "name": "w"})).to_string(), "<Widget id:7 name:w>");
        assert_eq!(object(WIDGET, json!({"id": "x"})).to_string(), "<Widget id:x>");
        assert_eq!(object(NAMELESS, json!({"title": "t"})).to_string(), "<Nameless>");
    }

    #[test]
    fn test_equality_by_id() {
        let a = object(WIDGET, json!({"id": 7, "name": "a"}));
        let b = object(WIDGET, json!({"id": 7, "name": "b"}));
        let c = object(WIDGET, json!({"id": 8, "name": "a"}));
        assert_eq!(a, b);
        assert_ne!(a, c);

        let d = object(NAMELESS, json!({"title": "t"}));
        let e = object(NAMELESS, json!({"title": "t"}));
        let f = object(NAMELESS, json!({"title": "u"}));
        assert_eq!(d, e);
        assert_ne!(d, f);

        let set: std::collections::HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_to_json_and_pformat() {
        let obj = object(WIDGET, json!({"id": 7}));
        assert_eq!(obj.to_json(false).unwrap(), r#"{"id":7}"#);
        assert!(obj.pformat().starts_with("Widget => \n{"));
    }

    #[test]
    fn test_manager_paths() {
        let manager: RestfulManager<Comment> = RestfulManager::new(test_client());
        assert_eq!(manager.path(), "/changes/{change_id}/comments");
        assert_eq!(manager.object_path(&EncodedId::from(3_u64)), "/changes/{change_id}/comments/3");

        let change = object(ObjectKind::new("Change"), json!({"id": "my/project~main~I12"}));
        let nested = RestfulManager::<Comment>::with_parent(test_client(), &change).unwrap();
        assert_eq!(nested.path(), "/changes/my%2Fproject~main~I12/comments");
        assert_eq!(nested.parent_attrs().get("change_id"), Some(&json!("my%2Fproject~main~I12")));

        let orphan = object(NAMELESS, json!({}));
        let nested = RestfulManager::<Comment>::with_parent(test_client(), &orphan).unwrap();
        assert_eq!(nested.parent_attrs().get("change_id"), Some(&Value::Null));
    }

    #[test]
    fn test_build_object_inherits_parent_attrs() {
        let change = object(ObjectKind::new("Change"), json!({"id": 42}));
        let manager = RestfulManager::<Comment>::with_parent(test_client(), &change).unwrap();

        let comment = manager.build_object(json!({"id": "c1"}), true).unwrap();
        assert_eq!(comment.get("change_id"), Some(&json!("42")));
        assert!(comment.created_from_list());
        assert_eq!(comment.kind().name, "Comment");
    }

    #[test]
    fn test_object_list() {
        let items = vec![object(WIDGET, json!({"id": 1})), object(WIDGET, json!({"id": 2}))];
        let list = RestfulObjectList::new(items, true);

        assert!(list.has_more());
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].get_id(), Some(&json!(2)));
        assert_eq!((&list).into_iter().count(), 2);
        assert_eq!(list.into_vec().len(), 2);
    }
}
