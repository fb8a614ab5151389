//! Project endpoints: create, get and list projects

use serde_json::{Map, Value};

use crate::restful::{
    base::{ListShape, ObjectKind, Resource},
    error::Result,
    mixins::{Create, Get, List},
    types::RequiredOptional,
    utils::unquote,
};

pub struct Project;

impl Resource for Project {
    const KIND: ObjectKind = ObjectKind::new("Project").repr_attr("name");
    const PATH: &'static str = "/projects/";
    const CREATE_ATTRS: RequiredOptional = RequiredOptional::new().optional(&[
        "name",
        "parent",
        "description",
        "permissions_only",
        "create_empty_commit",
        "submit_type",
        "branches",
        "owners",
        "use_contributor_agreements",
        "use_signed_off_by",
        "create_new_change_for_all_not_in_target",
        "use_content_merge",
        "require_change_id",
        "enable_signed_push",
        "require_signed_push",
        "max_object_size_limit",
        "plugin_config_values",
        "reject_empty_commit",
    ]);
    const LIST_SHAPE: ListShape = ListShape::Dict { copy_id_attr: None };
    const LIST_FILTERS: &'static [&'static str] = &["b", "d", "m", "n", "p", "r", "S", "type", "state"];

    fn prepare_attrs(attrs: &mut Map<String, Value>) -> Result<()> {
        if let Some(Value::String(id)) = attrs.get_mut("id") {
            *id = unquote(id).into_owned();
        }
        Ok(())
    }
}

impl Get for Project {}
impl Create for Project {}
impl List for Project {}
