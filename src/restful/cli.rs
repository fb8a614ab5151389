//! Command tree derived from resource descriptions
//!
//! Every resource becomes a subcommand named after its dasherized kind, with
//! one nested subcommand per supported action. Attribute flags drop a leading
//! underscore and use dashes, so `_account_id` is passed as `--account-id`.

use std::fmt;

use clap::{Arg, ArgMatches, Command};
use serde_json::{Map, Value};

use super::{
    base::{ObjectKind, Resource},
    types::RequiredOptional,
    utils::to_dasherized_lowercase,
};

/// Manager operation exposed on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    List,
    Get,
    Create,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::List, Action::Get, Action::Create, Action::Delete];

    pub const fn name(self) -> &'static str {
        match self {
            Action::List => "list",
            Action::Get => "get",
            Action::Create => "create",
            Action::Delete => "delete",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.name() == name)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything the command tree needs to know about a resource
#[derive(Debug, Clone)]
pub struct ResourceDescriptor {
    pub kind: ObjectKind,
    pub actions: Vec<Action>,
    pub from_parent_attrs: &'static [(&'static str, &'static str)],
    pub list_filters: &'static [&'static str],
    pub optional_get_attrs: &'static [&'static str],
    pub create_attrs: RequiredOptional,
    /// `get` reads the collection path and takes no id
    pub get_without_id: bool,
    /// Extra flags of the `list` action, e.g. pagination
    pub list_args: Vec<Arg>,
}

impl ResourceDescriptor {
    pub fn of<R: Resource>(actions: &[Action]) -> Self {
        Self {
            kind: R::KIND,
            actions: actions.to_vec(),
            from_parent_attrs: R::FROM_PARENT_ATTRS,
            list_filters: R::LIST_FILTERS,
            optional_get_attrs: R::OPTIONAL_GET_ATTRS,
            create_attrs: R::CREATE_ATTRS,
            get_without_id: false,
            list_args: Vec::new(),
        }
    }

    pub fn with_get_without_id(mut self) -> Self {
        self.get_without_id = true;
        self
    }

    pub fn with_list_args(mut self, args: impl IntoIterator<Item = Arg>) -> Self {
        self.list_args.extend(args);
        self
    }

    /// Subcommand name, e.g. `project-access`
    pub fn name(&self) -> String {
        to_dasherized_lowercase(self.kind.name)
    }

    pub fn supports(&self, action: Action) -> bool {
        self.actions.contains(&action)
    }

    fn command(&self) -> Command {
        let actions = Action::ALL
            .into_iter()
            .filter(|action| self.supports(*action))
            .map(|action| self.action_command(action));

        Command::new(self.name())
            .about(format!("Manage {} objects", self.kind.name))
            .subcommand_required(true)
            .arg_required_else_help(true)
            .subcommands(actions)
    }

    fn action_command(&self, action: Action) -> Command {
        let mut command = Command::new(action.name());

        for (attr, _) in self.from_parent_attrs {
            command = command.arg(attr_arg(attr, true));
        }

        match action {
            Action::List => {
                for attr in self.list_filters {
                    command = command.arg(attr_arg(attr, false));
                }
                command = command.args(self.list_args.iter().cloned());
            },
            Action::Get => {
                if let (false, Some(id_attr)) = (self.get_without_id, self.kind.id_attr) {
                    command = command.arg(attr_arg(id_attr, true));
                }
                for attr in self.optional_get_attrs {
                    command = command.arg(attr_arg(attr, false));
                }
            },
            Action::Create => {
                for attr in self.create_attrs.required {
                    command = command.arg(attr_arg(attr, true));
                }
                for attr in self.create_attrs.optional {
                    command = command.arg(attr_arg(attr, false));
                }
            },
            Action::Delete => {
                if let Some(id_attr) = self.kind.id_attr {
                    command = command.arg(attr_arg(id_attr, true));
                }
            },
        }

        command
    }
}

/// `--flag` spelling of an attribute name
pub fn attr_flag(attr: &str) -> String {
    attr.trim_start_matches('_').replace('_', "-")
}

fn attr_arg(attr: &str, required: bool) -> Arg {
    Arg::new(attr.to_owned())
        .long(attr_flag(attr))
        .value_name(attr.trim_start_matches('_').to_uppercase())
        .required(required)
}

/// Add one subcommand per resource, sorted by kind name
pub fn extend_resources_parser(command: Command, resources: &[ResourceDescriptor]) -> Command {
    let mut resources: Vec<&ResourceDescriptor> = resources.iter().collect();
    resources.sort_by_key(|resource| resource.kind.name);

    command
        .subcommand_required(true)
        .subcommands(resources.into_iter().map(ResourceDescriptor::command))
}

/// Command line value as JSON.
///
/// Objects, arrays and booleans are decoded; anything else is kept as a
/// string.
pub fn parse_cli_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    let structured = trimmed.starts_with('{')
        || trimmed.starts_with('[')
        || trimmed == "true"
        || trimmed == "false";

    if structured {
        if let Ok(value) = serde_json::from_str(trimmed) {
            return value;
        }
    }
    Value::String(raw.to_owned())
}

/// Attribute values given for `attrs`, keyed by attribute name
pub fn collect_attrs<'a>(
    matches: &ArgMatches,
    attrs: impl IntoIterator<Item = &'a str>,
) -> Map<String, Value> {
    attrs
        .into_iter()
        .filter_map(|attr| {
            let value = matches
                .try_get_one::<String>(attr)
                .ok()
                .flatten()?;
            Some((attr.to_owned(), parse_cli_value(value)))
        })
        .collect()
}
