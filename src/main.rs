use std::process::exit;

use clap::FromArgMatches;
use uanti::{
    config::default_config_path,
    gerrit::cli::{execute, get_parser, GlobalArgs},
    result::Result,
};

use crate::app_init::{initialize_app, AppComponents};

mod app_init;

fn main() -> Result<()> {
    let matches = get_parser().get_matches();
    let args = match GlobalArgs::from_arg_matches(&matches) {
        Ok(args) => args,
        Err(e) => e.exit(),
    };
    let config_path = args.config.clone().unwrap_or_else(default_config_path);

    if args.print_config_path {
        println!("{}", config_path.display());
        exit(0);
    }

    let AppComponents { gerrit, runtime, _log_guard } = initialize_app(config_path, &args)?;

    if matches.subcommand().is_none() {
        if !args.save_config {
            get_parser().print_help().ok();
        }
        return Ok(());
    }

    let output = runtime.block_on(execute(&gerrit, &matches))?;
    if !output.is_null() {
        println!("{}", serde_json::to_string_pretty(&output)?);
    }

    Ok(())
}
