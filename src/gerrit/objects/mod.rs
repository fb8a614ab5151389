//! Gerrit REST resources

mod access;
mod accounts;
mod changes;
mod documentation;
mod groups;
mod projects;

#[allow(clippy::wildcard_imports)]
pub use self::{access::*, accounts::*, changes::*, documentation::*, groups::*, projects::*};
