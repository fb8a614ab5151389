//! Group endpoints: create, delete, get and query groups

use serde_json::{Map, Value};

use crate::{
    gerrit::mixins::GerritList,
    restful::{
        base::{ObjectKind, Resource},
        error::Result,
        mixins::{Create, Delete, Get, List},
        types::RequiredOptional,
        utils::unquote,
    },
};

pub struct Group;

impl Resource for Group {
    const KIND: ObjectKind = ObjectKind::new("Group").repr_attr("name");
    const PATH: &'static str = "/groups/";
    const CREATE_ATTRS: RequiredOptional = RequiredOptional::new().optional(&[
        "name",
        "uuid",
        "description",
        "visible_to_all",
        "owner_id",
        "members",
    ]);

    fn prepare_attrs(attrs: &mut Map<String, Value>) -> Result<()> {
        // the server returns these url-encoded
        for attr in ["id", "owner_id"] {
            if let Some(Value::String(value)) = attrs.get_mut(attr) {
                *value = unquote(value).into_owned();
            }
        }
        attrs.remove("_more_groups");
        Ok(())
    }
}

impl Get for Group {}
impl Create for Group {}
impl Delete for Group {}
impl List for Group {}
impl GerritList for Group {}
