//! Gerrit API command line interface

use std::path::PathBuf;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Args, Command, CommandFactory, Parser};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use super::{
    client::Gerrit,
    mixins::ListOptions,
    objects::{Account, Change, DocResult, Group, Project, ProjectAccess},
};
use crate::{
    restful::{
        auth::AuthScheme,
        cli::{collect_attrs, extend_resources_parser, Action, ResourceDescriptor},
        error::RestfulError,
        utils::{EncodedId, QueryParams},
        Resource, RestfulObject, RestfulObjectList,
    },
    result::Result,
};

/// Gerrit API Command Line Interface
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "gerrit", version, about, long_about = None)]
pub struct GlobalArgs {
    /// Alternate path to the configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Print the path to the configuration file and exit.
    #[arg(long)]
    pub print_config_path: bool,
    /// Store the effective connection settings in the configuration file.
    #[arg(long)]
    pub save_config: bool,
    #[command(flatten)]
    pub connection: ConnectionArgs,
}

/// Server connection settings; each overrides the configuration file
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// URL of the Gerrit server.
    #[arg(long, env = "GERRIT_URL")]
    pub url: Option<String>,
    /// Username for HTTP authentication.
    #[arg(long, env = "GERRIT_USERNAME", requires = "password")]
    pub username: Option<String>,
    /// Password for HTTP authentication.
    #[arg(long, env = "GERRIT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
    /// HTTP authentication scheme.
    #[arg(long, value_enum, env = "GERRIT_AUTH_TYPE")]
    pub auth_type: Option<AuthScheme>,
    /// Do not verify TLS certificates.
    #[arg(long, conflicts_with = "ca_file")]
    pub no_ssl_verify: bool,
    /// Verify TLS certificates against this PEM bundle.
    #[arg(long, value_name = "FILE")]
    pub ca_file: Option<PathBuf>,
    /// Request timeout in seconds.
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
    /// Retry after 500, 502, 503, 504 and 52x responses.
    #[arg(long)]
    pub retry_transient_errors: bool,
}

/// Resources reachable from the command line
pub fn resources() -> Vec<ResourceDescriptor> {
    vec![
        ResourceDescriptor::of::<Account>(&Action::ALL).with_list_args(list_option_args()),
        ResourceDescriptor::of::<Change>(&Action::ALL).with_list_args(list_option_args()),
        ResourceDescriptor::of::<DocResult>(&[Action::List]),
        ResourceDescriptor::of::<Group>(&Action::ALL).with_list_args(list_option_args()),
        ResourceDescriptor::of::<Project>(&[Action::List, Action::Get, Action::Create]),
        ResourceDescriptor::of::<ProjectAccess>(&[Action::List]),
    ]
}

/// Flags of the paginated Gerrit query endpoints
fn list_option_args() -> [Arg; 4] {
    [
        Arg::new("limit")
            .long("limit")
            .value_name("N")
            .value_parser(value_parser!(i64))
            .allow_negative_numbers(true)
            .help("Limit the number of results; -1 returns all of them."),
        Arg::new("start")
            .long("start")
            .value_name("N")
            .value_parser(value_parser!(u64))
            .help("Skip a number of results."),
        Arg::new("query")
            .long("query")
            .value_name("QUERY")
            .help("Query expression."),
        Arg::new("option")
            .long("option")
            .value_name("OPTION")
            .action(ArgAction::Append)
            .help("Additional field to include; may be repeated."),
    ]
}

pub fn get_parser() -> Command {
    extend_resources_parser(GlobalArgs::command(), &resources())
        .subcommand_required(false)
        .arg_required_else_help(true)
}

fn list_options(args: &ArgMatches) -> ListOptions {
    ListOptions {
        limit: args.get_one::<i64>("limit").copied().unwrap_or_default(),
        start: args.get_one::<u64>("start").copied().unwrap_or_default(),
        query: args.get_one::<String>("query").cloned(),
        options: args
            .get_many::<String>("option")
            .map(|values| values.cloned().collect())
            .unwrap_or_default(),
        params: QueryParams::new(),
    }
}

fn query_params(args: &ArgMatches, attrs: &[&str]) -> QueryParams {
    QueryParams::from_map(&collect_attrs(args, attrs.iter().copied()))
}

fn create_data<R: Resource>(args: &ArgMatches) -> Map<String, Value> {
    let attrs = R::CREATE_ATTRS.required.iter().chain(R::CREATE_ATTRS.optional);
    collect_attrs(args, attrs.copied())
}

fn object_id<R: Resource>(args: &ArgMatches) -> Result<EncodedId> {
    let id_attr = R::KIND.id_attr.ok_or_else(|| {
        RestfulError::attribute(format!("{} objects have no id attribute", R::KIND.name))
    })?;

    args.get_one::<String>(id_attr)
        .map(EncodedId::from)
        .ok_or_else(|| RestfulError::attribute(format!("Missing attributes: {id_attr}")).into())
}

fn object_json(object: RestfulObject) -> Value {
    Value::Object(object.as_dict(false))
}

fn list_json(objects: RestfulObjectList) -> Value {
    Value::Array(objects.into_iter().map(object_json).collect())
}

/// Run the resource action selected in `matches`.
///
/// Returns the JSON to print; `null` when the action produces no output.
#[instrument(skip_all)]
pub async fn execute(gerrit: &Gerrit, matches: &ArgMatches) -> Result<Value> {
    let (resource, resource_args) = matches
        .subcommand()
        .ok_or_else(|| RestfulError::attribute("No resource given"))?;
    let (action_name, args) = resource_args
        .subcommand()
        .ok_or_else(|| RestfulError::attribute(format!("No action given for {resource}")))?;
    let action = Action::from_name(action_name)
        .ok_or_else(|| RestfulError::attribute(format!("Unknown action: {action_name}")))?;
    debug!(resource, %action, "Executing");

    let output = match (resource, action) {
        ("account", Action::List) => list_json(gerrit.accounts().query(&list_options(args)).await?),
        ("account", Action::Get) => object_json(
            gerrit
                .accounts()
                .get(object_id::<Account>(args)?, &QueryParams::new())
                .await?,
        ),
        ("account", Action::Create) => {
            object_json(gerrit.accounts().create(create_data::<Account>(args)).await?)
        },
        ("account", Action::Delete) => {
            gerrit.accounts().delete(Some(object_id::<Account>(args)?)).await?;
            Value::Null
        },

        ("change", Action::List) => list_json(gerrit.changes().query(&list_options(args)).await?),
        ("change", Action::Get) => object_json(
            gerrit
                .changes()
                .get(
                    object_id::<Change>(args)?,
                    &query_params(args, Change::OPTIONAL_GET_ATTRS),
                )
                .await?,
        ),
        ("change", Action::Create) => {
            object_json(gerrit.changes().create(create_data::<Change>(args)).await?)
        },
        ("change", Action::Delete) => {
            gerrit.changes().delete(Some(object_id::<Change>(args)?)).await?;
            Value::Null
        },

        ("doc-result", Action::List) => list_json(
            gerrit
                .documentation()
                .list(&query_params(args, DocResult::LIST_FILTERS))
                .await?,
        ),

        ("group", Action::List) => list_json(gerrit.groups().query(&list_options(args)).await?),
        ("group", Action::Get) => object_json(
            gerrit
                .groups()
                .get(object_id::<Group>(args)?, &QueryParams::new())
                .await?,
        ),
        ("group", Action::Create) => {
            object_json(gerrit.groups().create(create_data::<Group>(args)).await?)
        },
        ("group", Action::Delete) => {
            gerrit.groups().delete(Some(object_id::<Group>(args)?)).await?;
            Value::Null
        },

        ("project", Action::List) => list_json(
            gerrit
                .projects()
                .list(&query_params(args, Project::LIST_FILTERS))
                .await?,
        ),
        ("project", Action::Get) => object_json(
            gerrit
                .projects()
                .get(object_id::<Project>(args)?, &QueryParams::new())
                .await?,
        ),
        ("project", Action::Create) => {
            object_json(gerrit.projects().create(create_data::<Project>(args)).await?)
        },

        ("project-access", Action::List) => list_json(
            gerrit
                .access()
                .list(&query_params(args, ProjectAccess::LIST_FILTERS))
                .await?,
        ),

        (resource, action) => {
            return Err(RestfulError::attribute(format!(
                "Action {action} is not supported by {resource}"
            ))
            .into())
        },
    };

    Ok(output)
}

#[cfg(test)]
mod tests {
    use clap::FromArgMatches;

    use super::*;

    fn parse(args: &[&str]) -> clap::error::Result<ArgMatches> {
        get_parser().try_get_matches_from(std::iter::once("gerrit").chain(args.iter().copied()))
    }

    #[test]
    fn test_resource_names() {
        let parser = get_parser();
        let names: Vec<_> = parser.get_subcommands().map(|c| c.get_name()).collect();
        assert_eq!(
            names,
            vec!["account", "change", "doc-result", "group", "project", "project-access"]
        );
    }

    #[test]
    fn test_actions_per_resource() {
        let parser = get_parser();
        let actions = |name: &str| -> Vec<String> {
            parser
                .find_subcommand(name)
                .unwrap()
                .get_subcommands()
                .map(|c| c.get_name().to_owned())
                .collect()
        };

        assert_eq!(actions("change"), vec!["list", "get", "create", "delete"]);
        assert_eq!(actions("project"), vec!["list", "get", "create"]);
        assert_eq!(actions("project-access"), vec!["list"]);
        assert_eq!(actions("doc-result"), vec!["list"]);
    }

    #[test]
    fn test_gerrit_list_flags() {
        let matches = parse(&[
            "change", "list", "--query", "status:open", "--limit", "-1", "--option", "LABELS",
            "--option", "MESSAGES",
        ])
        .unwrap();
        let (_, resource) = matches.subcommand().unwrap();
        let (_, args) = resource.subcommand().unwrap();

        let options = list_options(args);
        assert_eq!(options.limit, -1);
        assert_eq!(options.query.as_deref(), Some("status:open"));
        assert_eq!(options.options, vec!["LABELS", "MESSAGES"]);

        assert!(parse(&["project", "list", "--limit", "5"]).is_err());
    }

    #[test]
    fn test_id_flags() {
        let matches = parse(&["account", "get", "--account-id", "1000096"]).unwrap();
        let (_, resource) = matches.subcommand().unwrap();
        let (_, args) = resource.subcommand().unwrap();
        assert_eq!(object_id::<Account>(args).unwrap().as_str(), "1000096");

        assert!(parse(&["change", "delete"]).is_err());
    }

    #[test]
    fn test_create_flags() {
        let matches = parse(&[
            "change", "create", "--project", "p", "--branch", "main", "--subject", "s",
            "--work-in-progress", "true",
        ])
        .unwrap();
        let (_, resource) = matches.subcommand().unwrap();
        let (_, args) = resource.subcommand().unwrap();

        let data = create_data::<Change>(args);
        assert_eq!(data.get("project"), Some(&Value::from("p")));
        assert_eq!(data.get("work_in_progress"), Some(&Value::Bool(true)));
        assert_eq!(data.len(), 4);
    }

    #[test]
    fn test_connection_flags() {
        let matches = parse(&[
            "--url", "https://review.example.com", "--username", "alice", "--password", "pw",
            "--timeout", "30", "--no-ssl-verify", "change", "list",
        ])
        .unwrap();
        let args = GlobalArgs::from_arg_matches(&matches).unwrap();

        assert_eq!(args.connection.url.as_deref(), Some("https://review.example.com"));
        assert_eq!(args.connection.username.as_deref(), Some("alice"));
        assert_eq!(args.connection.timeout, Some(30));
        assert!(args.connection.no_ssl_verify);

        assert!(parse(&["--username", "alice", "change", "list"]).is_err());
        assert!(parse(&["--no-ssl-verify", "--ca-file", "ca.pem", "change", "list"]).is_err());
    }
}
