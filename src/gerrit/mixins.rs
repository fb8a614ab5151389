//! Gerrit-style paginated listing

use serde_json::Value;
use tracing::instrument;

use crate::restful::{
    base::{RestfulManager, RestfulObjectList},
    error::Result,
    mixins::List,
    utils::QueryParams,
};

/// The collection is a Gerrit query endpoint paginated with `n` and `start`
pub trait GerritList: List {}

/// Query options of a Gerrit list call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Result limit; `0` keeps the server default, `-1` lifts the limit
    pub limit: i64,
    /// Number of results to skip
    pub start: u64,
    /// Query expression sent as `q`
    pub query: Option<String>,
    /// Additional fields to include, sent as repeated `o`
    pub options: Vec<String>,
    /// Other parameters, sent verbatim
    pub params: QueryParams,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// Return every result
    pub fn no_limit(self) -> Self {
        self.with_limit(-1)
    }

    pub fn with_start(mut self, start: u64) -> Self {
        self.start = start;
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_option(mut self, option: impl Into<String>) -> Self {
        self.options.push(option.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key, &value.into());
        self
    }

    /// Query string of the list call
    pub fn to_query_params(&self) -> QueryParams {
        let mut params = self.params.clone();

        if let Some(query) = &self.query {
            params.insert("q", &Value::from(query.as_str()));
        }
        if !self.options.is_empty() {
            params.insert("o", &Value::from(self.options.clone()));
        }

        match self.limit {
            -1 => params.insert("no-limit", &Value::Bool(true)),
            n if n > 0 => params.insert("n", &Value::from(n)),
            _ => {},
        }
        if self.start != 0 {
            params.insert("start", &Value::from(self.start));
        }

        params
    }
}

impl<R: GerritList> RestfulManager<R> {
    /// Retrieve one page of query results.
    ///
    /// [`RestfulObjectList::has_more`] tells whether the server truncated
    /// the result.
    #[instrument(skip_all, fields(kind = R::KIND.name, limit = options.limit, start = options.start))]
    pub async fn query(&self, options: &ListOptions) -> Result<RestfulObjectList> {
        self.list(&options.to_query_params()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_are_empty() {
        assert!(ListOptions::new().to_query_params().is_empty());
    }

    #[test]
    fn test_limit_mapping() {
        let params = ListOptions::new().no_limit().to_query_params();
        assert_eq!(params.get("no-limit"), Some("true"));
        assert_eq!(params.get("n"), None);

        let params = ListOptions::new().with_limit(25).to_query_params();
        assert_eq!(params.get("n"), Some("25"));
        assert_eq!(params.get("no-limit"), None);

        let params = ListOptions::new().with_limit(-5).to_query_params();
        assert!(params.is_empty());
    }

    #[test]
    fn test_query_and_options() {
        let params = ListOptions::new()
            .with_query("status:open owner:self")
            .with_option("LABELS")
            .with_option("CURRENT_REVISION")
            .with_start(50)
            .with_param("S", 10)
            .to_query_params();

        assert_eq!(params.get("q"), Some("status:open owner:self"));
        assert_eq!(params.get_all("o").collect::<Vec<_>>(), vec!["LABELS", "CURRENT_REVISION"]);
        assert_eq!(params.get("start"), Some("50"));
        assert_eq!(params.get("S"), Some("10"));
    }
}
