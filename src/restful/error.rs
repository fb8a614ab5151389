//! Error types for RESTful client operations

use std::fmt;

use thiserror::Error;

/// Operation a manager was performing when the server rejected a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Create,
    Delete,
    Get,
    List,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Create => "create",
            OperationKind::Delete => "delete",
            OperationKind::Get => "get",
            OperationKind::List => "list",
        };
        f.write_str(name)
    }
}

/// Structured error types for RESTful client operations
#[derive(Debug, Error)]
pub enum RestfulError {
    /// HTTP transport failed before a response was received
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered 401
    #[error("{code}: {message}")]
    Authentication {
        code: u16,
        message: String,
        body: Vec<u8>,
    },

    /// Server answered with a non-2xx status
    #[error("{code}: {message}")]
    HttpStatus {
        code: u16,
        message: String,
        body: Vec<u8>,
    },

    /// Response body could not be decoded
    #[error("{message}")]
    Parsing {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// A non-GET request was redirected
    #[error("{0}")]
    Redirect(String),

    /// Manager operation rejected by the server
    #[error("{code}: {message}")]
    Operation {
        kind: OperationKind,
        code: u16,
        message: String,
        body: Vec<u8>,
    },

    /// Attribute missing, or attribute validation failed
    #[error("{0}")]
    Attribute(String),

    /// Configuration is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration field validation failed
    #[error("Invalid {field}: {message}")]
    ConfigValidation { field: String, message: String },

    /// No usable credentials in netrc
    #[error("netrc missing or no credentials found in netrc")]
    Netrc,

    /// URL could not be parsed
    #[error("Invalid URL: {url}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RestfulError {
    /// Create a parsing error without an underlying JSON error
    pub fn parsing(message: impl Into<String>) -> Self {
        Self::Parsing { message: message.into(), source: None }
    }

    /// Create the parsing error reported when a response body is not valid JSON
    pub fn server_message(source: serde_json::Error) -> Self {
        Self::Parsing {
            message: "Failed to parse the server message".into(),
            source: Some(source),
        }
    }

    /// Create an attribute error
    pub fn attribute(message: impl Into<String>) -> Self {
        Self::Attribute(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a configuration field validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation { field: field.into(), message: message.into() }
    }

    /// Create an invalid URL error
    pub fn invalid_url(url: impl Into<String>, source: url::ParseError) -> Self {
        Self::InvalidUrl { url: url.into(), source }
    }

    /// Relabel a server status error as a failure of `kind`.
    ///
    /// Authentication and transport errors pass through untouched.
    pub fn on_http_error(self, kind: OperationKind) -> Self {
        match self {
            RestfulError::HttpStatus { code, message, body } => {
                RestfulError::Operation { kind, code, message, body }
            },
            other => other,
        }
    }

    /// HTTP status code the server answered with, if any
    pub fn response_code(&self) -> Option<u16> {
        match self {
            RestfulError::Authentication { code, .. }
            | RestfulError::HttpStatus { code, .. }
            | RestfulError::Operation { code, .. } => Some(*code),
            RestfulError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Full response body of a rejected request
    pub fn response_body(&self) -> Option<&[u8]> {
        match self {
            RestfulError::Authentication { body, .. }
            | RestfulError::HttpStatus { body, .. }
            | RestfulError::Operation { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            RestfulError::Http(e) => e.is_timeout() || e.is_connect(),
            RestfulError::HttpStatus { code, .. } => {
                *code == 429 || super::client::is_transient_status(*code)
            },
            _ => false,
        }
    }
}

/// Result type alias for RESTful operations
pub type Result<T> = std::result::Result<T, RestfulError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_error(code: u16, message: &str) -> RestfulError {
        RestfulError::HttpStatus {
            code,
            message: message.into(),
            body: message.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_display_includes_status_code() {
        let err = status_error(404, "Not found: 123");
        assert_eq!(err.to_string(), "404: Not found: 123");

        let err = RestfulError::parsing("Failed to parse the server message");
        assert_eq!(err.to_string(), "Failed to parse the server message");
    }

    #[test]
    fn test_operation_kind_names() {
        let names: Vec<String> = [
            OperationKind::Create,
            OperationKind::Delete,
            OperationKind::Get,
            OperationKind::List,
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        assert_eq!(names, ["create", "delete", "get", "list"]);
    }

    #[test]
    fn test_on_http_error_relabels_status_errors() {
        let err = status_error(409, "change is closed").on_http_error(OperationKind::Delete);

        match &err {
            RestfulError::Operation { kind, code, message, body } => {
                assert_eq!(*kind, OperationKind::Delete);
                assert_eq!(*code, 409);
                assert_eq!(message, "change is closed");
                assert_eq!(body, b"change is closed");
            },
            other => panic!("Expected Operation error, got {other:?}"),
        }
        assert_eq!(err.response_code(), Some(409));
        assert_eq!(err.to_string(), "409: change is closed");
    }

    #[test]
    fn test_on_http_error_keeps_authentication_errors() {
        let err = RestfulError::Authentication {
            code: 401,
            message: "Unauthorized".into(),
            body: vec![],
        }
        .on_http_error(OperationKind::Get);

        assert!(matches!(err, RestfulError::Authentication { .. }));
    }

    #[test]
    fn test_retryable_errors() {
        assert!(status_error(429, "slow down").is_retryable());
        assert!(status_error(503, "unavailable").is_retryable());
        assert!(status_error(525, "ssl handshake").is_retryable());
        assert!(!status_error(404, "missing").is_retryable());
        assert!(!RestfulError::config("test").is_retryable());
        assert!(!RestfulError::Netrc.is_retryable());
    }
}
