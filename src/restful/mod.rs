//! Generic building blocks for RESTful service bindings

pub mod auth;
pub mod base;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod mixins;
pub mod types;
pub mod utils;

pub use auth::Auth;
pub use base::{ListShape, ObjectKind, Resource, RestfulManager, RestfulObject, RestfulObjectList};
pub use client::{BodyDecoder, FilePart, Payload, RequestBody, RequestOptions, RestfulClient};
pub use config::{ClientConfig, DebugConfig, RetryConfig, SslVerify};
pub use error::{OperationKind, RestfulError, Result};
pub use types::RequiredOptional;
pub use utils::{EncodedId, QueryParams};

#[cfg(test)]
mod tests;
