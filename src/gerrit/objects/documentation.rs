//! Documentation search endpoint

use crate::restful::{
    base::{ObjectKind, Resource},
    mixins::List,
};

pub struct DocResult;

impl Resource for DocResult {
    const KIND: ObjectKind = ObjectKind::new("DocResult").id_attr(None).repr_attr("title");
    const PATH: &'static str = "/Documentation/";
    const LIST_FILTERS: &'static [&'static str] = &["q"];
}

impl List for DocResult {}
