//! Attribute requirement declarations and validation of create payloads

use itertools::Itertools;
use serde_json::{Map, Value};

use super::error::{RestfulError, Result};

/// Attribute sets accepted by a create call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequiredOptional {
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
    pub exclusive: &'static [&'static str],
}

impl RequiredOptional {
    pub const EMPTY: RequiredOptional = RequiredOptional {
        required: &[],
        optional: &[],
        exclusive: &[],
    };

    pub const fn new() -> Self {
        Self::EMPTY
    }

    pub const fn required(mut self, attrs: &'static [&'static str]) -> Self {
        self.required = attrs;
        self
    }

    pub const fn optional(mut self, attrs: &'static [&'static str]) -> Self {
        self.optional = attrs;
        self
    }

    pub const fn exclusive(mut self, attrs: &'static [&'static str]) -> Self {
        self.exclusive = attrs;
        self
    }

    /// Check `data` against the attribute sets, ignoring required attributes
    /// listed in `excludes`
    pub fn validate_attrs(&self, data: &Map<String, Value>, excludes: &[&str]) -> Result<()> {
        let missing = self
            .required
            .iter()
            .filter(|attr| !excludes.contains(*attr))
            .filter(|attr| !data.contains_key(**attr))
            .join(", ");
        if !missing.is_empty() {
            return Err(RestfulError::attribute(format!("Missing attributes: {missing}")));
        }

        if !self.exclusive.is_empty() {
            let given: Vec<&str> = data
                .keys()
                .map(String::as_str)
                .filter(|attr| self.exclusive.contains(attr))
                .collect();
            if given.len() > 1 {
                return Err(RestfulError::attribute(format!(
                    "Provide only one of these attributes: {}",
                    given.join(", ")
                )));
            }
            if given.is_empty() {
                return Err(RestfulError::attribute(format!(
                    "Must provide one of these attributes: {}",
                    self.exclusive.join(", ")
                )));
            }
        }

        Ok(())
    }
}
