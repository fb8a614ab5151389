//! Account endpoints: create, delete, get and query accounts

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

pub struct Account;

impl Resource for Account {
    const KIND: ObjectKind = ObjectKind::new("Account")
        .id_attr(Some("_account_id"))
        .repr_attr("username");
    const PATH: &'static str = "/accounts/";
    const CREATE_ATTRS: RequiredOptional = RequiredOptional::new().optional(&[
        "username",
        "name",
        "display_name",
        "email",
        "ssh_key",
        "http_password",
        "groups",
    ]);

    fn prepare_attrs(attrs: &mut Map<String, Value>) -> Result<()> {
        attrs.remove("_more_accounts");
        Ok(())
    }
}

impl Get for Account {}
impl Create for Account {}
impl Delete for Account {}
impl List for Account {}
impl GerritList for Account {}
