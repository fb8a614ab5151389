//! Change endpoints: create, delete, get and query changes

use serde_json::{Map, Value};

use crate::{
    gerrit::mixins::GerritList,
    restful::{
        base::{ObjectKind, Resource},
        error::Result,
        mixins::{Create, Delete, Get, List},
        types::RequiredOptional,
    },
};

/// A code review
pub struct Change;

impl Resource for Change {
    const KIND: ObjectKind = ObjectKind::new("Change").repr_attr("subject");
    const PATH: &'static str = "/changes/";
    const CREATE_ATTRS: RequiredOptional = RequiredOptional::new()
        .required(&["project", "branch", "subject"])
        .optional(&[
            "topic",
            "status",
            "is_private",
            "work_in_progress",
            "base_change",
            "base_commit",
            "new_branch",
            "validation_options",
            "merge",
            "author",
            "notify",
            "notify_details",
        ]);
    const OPTIONAL_GET_ATTRS: &'static [&'static str] = &["o"];

    fn prepare_attrs(attrs: &mut Map<String, Value>) -> Result<()> {
        attrs.remove("_more_changes");
        Ok(())
    }
}

impl Get for Change {}
impl Create for Change {}
impl Delete for Change {}
impl List for Change {}
impl GerritList for Change {}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_more_marker_removed() {
        let mut attrs = json!({"id": "p~main~I1", "_more_changes": true});
        Change::prepare_attrs(attrs.as_object_mut().unwrap()).unwrap();
        assert_eq!(attrs, json!({"id": "p~main~I1"}));
    }

    #[test]
    fn test_create_requires_project_branch_subject() {
        let data = json!({"project": "p", "subject": "s"});
        let err = Change::CREATE_ATTRS
            .validate_attrs(data.as_object().unwrap(), &[])
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing attributes: branch");
    }
}
