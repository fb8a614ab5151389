//! Yet another library for Gerrit service
//!
//! [`gerrit::Gerrit`] is the entry point of the Gerrit binding; the
//! [`restful`] module holds the service-independent client, object and
//! manager machinery it is built on.

pub mod config;
pub mod gerrit;
pub mod logging;
pub mod restful;
pub mod result;

pub const TITLE: &str = "uanti";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
