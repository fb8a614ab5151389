//! Access endpoint: list access rights

use crate::restful::{
    base::{ListShape, ObjectKind, Resource},
    mixins::List,
};

/// Access rights of one project, keyed by project name
pub struct ProjectAccess;

impl Resource for ProjectAccess {
    const KIND: ObjectKind = ObjectKind::new("ProjectAccess");
    const PATH: &'static str = "/access/";
    const LIST_SHAPE: ListShape = ListShape::Dict { copy_id_attr: Some("id") };
    const LIST_FILTERS: &'static [&'static str] = &["project"];
}

impl List for ProjectAccess {}
