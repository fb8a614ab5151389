//! Gerrit REST API binding

pub mod cli;
pub mod client;
pub mod mixins;
pub mod objects;

pub use client::{Gerrit, GerritJsonDecoder, GERRIT_SERVICE_ROOT};
pub use mixins::{GerritList, ListOptions};

#[cfg(test)]
mod tests;
