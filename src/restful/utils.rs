//! URL and naming helpers shared by the RESTful layer

use std::{borrow::Cow, fmt};

use itertools::Itertools;
use once_cell::sync::Lazy;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use serde_json::{Map, Value};

use super::error::{RestfulError, Result};

/// Everything but `A-Z a-z 0-9 _ . - ~` is escaped, `/` included.
const PATH_PARAMETER: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~');

/// A path parameter that has been URL-encoded exactly once.
///
/// Integers are used verbatim; strings are percent-encoded with no safe
/// characters so that ids such as `platform/build` or `project~main~I8473b95`
/// survive being placed into a single path segment. Converting an
/// `EncodedId` into an `EncodedId` leaves it untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EncodedId(String);

impl EncodedId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for EncodedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EncodedId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EncodedId {
    fn from(value: &str) -> Self {
        Self(utf8_percent_encode(value, PATH_PARAMETER).to_string())
    }
}

impl From<String> for EncodedId {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<&String> for EncodedId {
    fn from(value: &String) -> Self {
        Self::from(value.as_str())
    }
}

macro_rules! encoded_id_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for EncodedId {
                fn from(value: $t) -> Self {
                    Self(value.to_string())
                }
            }
        )*
    };
}

encoded_id_from_int!(i32, i64, u32, u64, usize);

impl TryFrom<&Value> for EncodedId {
    type Error = RestfulError;

    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(Self::from(s.as_str())),
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Self(n.to_string())),
            other => Err(RestfulError::attribute(format!(
                "Unsupported type received: {}",
                json_type_name(other)
            ))),
        }
    }
}

/// Decode a percent-encoded string, leaving invalid sequences as they are
pub fn unquote(value: &str) -> Cow<'_, str> {
    percent_decode_str(value).decode_utf8_lossy()
}

/// Query string parameters in insertion order.
///
/// Inserting a key replaces earlier values of that key. Arrays become
/// repeated keys, objects are flattened into `key[sub]` entries and booleans
/// are sent as `true`/`false`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object, flattening nested values
    pub fn from_map(map: &Map<String, Value>) -> Self {
        let mut params = Self::new();
        params.copy_from(map);
        params
    }

    /// Parse the query part of a URL
    pub fn parse(query: &str) -> Self {
        let mut params = Self::new();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            params.pairs.push((key.into_owned(), value.into_owned()));
        }
        params
    }

    /// Set `key`, replacing any existing values
    pub fn insert(&mut self, key: impl Into<String>, value: &Value) {
        let key = key.into();
        self.remove(&key);
        match value {
            Value::Null => {},
            Value::Array(items) => {
                for item in items {
                    self.pairs.push((key.clone(), scalar_to_string(item)));
                }
            },
            Value::Object(entries) => {
                for (sub_key, sub_value) in entries {
                    self.insert(format!("{key}[{sub_key}]"), sub_value);
                }
            },
            scalar => self.pairs.push((key, scalar_to_string(scalar))),
        }
    }

    /// Builder-style [`QueryParams::insert`]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, &value.into());
        self
    }

    /// Append a value without replacing earlier ones
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Copy every entry of `map`, replacing existing keys
    pub fn copy_from(&mut self, map: &Map<String, Value>) {
        for (key, value) in map {
            self.insert(key.clone(), value);
        }
    }

    /// Copy every key of `other`, replacing existing keys
    pub fn extend(&mut self, other: &QueryParams) {
        let keys: Vec<&str> = other.pairs.iter().map(|(k, _)| k.as_str()).unique().collect();
        for key in keys {
            self.remove(key);
        }
        self.pairs.extend(other.pairs.iter().cloned());
    }

    pub fn remove(&mut self, key: &str) {
        self.pairs.retain(|(k, _)| k != key);
    }

    /// First value of `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All values of `key`
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

static CAMEL_UPPERLOWER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Z]+)([A-Z][a-z])").expect("valid regex"));
static CAMEL_LOWERUPPER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z\d])([A-Z])").expect("valid regex"));

/// `ProjectAccess` → `project-access`, `HTTPServer` → `http-server`
pub fn to_dasherized_lowercase(name: &str) -> String {
    let dasherized = CAMEL_UPPERLOWER.replace_all(name, "${1}-${2}");
    let dasherized = CAMEL_LOWERUPPER.replace_all(&dasherized, "${1}-${2}");
    dasherized.to_lowercase()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_encoded_id_escapes_everything_unsafe() {
        assert_eq!(EncodedId::from("platform/build").as_str(), "platform%2Fbuild");
        assert_eq!(EncodedId::from("foo bar").as_str(), "foo%20bar");
        assert_eq!(EncodedId::from("project~main~I8473b95").as_str(), "project~main~I8473b95");
        assert_eq!(EncodedId::from("a+b@c:d").as_str(), "a%2Bb%40c%3Ad");
        assert_eq!(EncodedId::from(12345_u64).as_str(), "12345");
    }

    #[test]
    fn test_encoded_id_encodes_once() {
        let once = EncodedId::from("foo/bar");
        let again = EncodedId::from(once.clone());
        assert_eq!(once, again);
        assert_eq!(format!("/projects/{again}"), "/projects/foo%2Fbar");
    }

    #[test]
    fn test_encoded_id_from_json() {
        assert_eq!(EncodedId::try_from(&json!("a/b")).unwrap().as_str(), "a%2Fb");
        assert_eq!(EncodedId::try_from(&json!(42)).unwrap().as_str(), "42");

        let err = EncodedId::try_from(&json!([1, 2])).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported type received: array");
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("Administrators%2Fci"), "Administrators/ci");
        assert_eq!(unquote("plain"), "plain");
    }

    #[test]
    fn test_query_params_flattening() {
        let map = json!({
            "q": ["status:open", "owner:self"],
            "custom_attributes": {"foo": "bar"},
            "no-limit": true,
            "start": 25,
            "skip": null,
        });

        let params = QueryParams::from_map(map.as_object().unwrap());

        assert_eq!(params.get_all("q").collect::<Vec<_>>(), vec!["status:open", "owner:self"]);
        assert_eq!(params.get("custom_attributes[foo]"), Some("bar"));
        assert_eq!(params.get("no-limit"), Some("true"));
        assert_eq!(params.get("start"), Some("25"));
        assert_eq!(params.get("skip"), None);
    }

    #[test]
    fn test_query_params_later_values_win() {
        let mut params = QueryParams::parse("n=10&o=LABELS&o=CURRENT_REVISION");
        assert_eq!(params.get_all("o").count(), 2);

        let overrides = QueryParams::new().with("n", 25).with("o", json!(["MESSAGES"]));
        params.extend(&overrides);

        assert_eq!(params.get("n"), Some("25"));
        assert_eq!(params.get_all("o").collect::<Vec<_>>(), vec!["MESSAGES"]);
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_to_dasherized_lowercase() {
        assert_eq!(to_dasherized_lowercase("Change"), "change");
        assert_eq!(to_dasherized_lowercase("ProjectAccess"), "project-access");
        assert_eq!(to_dasherized_lowercase("DocResult"), "doc-result");
        assert_eq!(to_dasherized_lowercase("HTTPServer"), "http-server");
        assert_eq!(to_dasherized_lowercase("Sha1Key"), "sha1-key");
    }
}
