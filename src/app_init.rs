use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use uanti::{
    config::{load_config, save_config, GerritConfig},
    gerrit::{cli::GlobalArgs, Gerrit},
    logging::{init_logging, LoggingConfig},
    result::{Result, UantiError},
};

pub struct AppComponents {
    pub gerrit: Gerrit,
    pub runtime: tokio::runtime::Runtime,
    pub _log_guard: Option<WorkerGuard>,
}

pub fn initialize_app(config_path: PathBuf, args: &GlobalArgs) -> Result<AppComponents> {
    color_eyre::install().map_err(|e| UantiError::GeneralError(e.to_string()))?;

    let mut config = load_config(&config_path)?;
    config.apply_args(&args.connection);

    let log_guard = initialize_logging(&config)?;
    tracing::debug!(version = uanti::VERSION, url = %config.url, "gerrit cli starting up");

    if args.save_config {
        save_config(&config_path, &config)?;
        tracing::info!(path = %config_path.display(), "configuration saved");
    }

    let gerrit = Gerrit::new(config.to_client_config()?)?;

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| UantiError::GeneralError(format!("Failed to create runtime: {e}")))?;

    Ok(AppComponents { gerrit, runtime, _log_guard: log_guard })
}

fn initialize_logging(config: &GerritConfig) -> Result<Option<WorkerGuard>> {
    let mut logging_config = LoggingConfig::from_env();

    // Override with config if specified
    if let Some(log_level) = &config.log_level {
        logging_config = logging_config.with_level(log_level);
    }

    init_logging(logging_config)
        .map_err(|e| UantiError::GeneralError(format!("Failed to initialize logging: {e}")))
}
