use confy::ConfyError;
use thiserror::Error;

use crate::restful::RestfulError;

pub type Result<T> = std::result::Result<T, UantiError>;

#[derive(Debug, Error)]
pub enum UantiError {
    #[error("Failure reading configuration file.")]
    ConfigError(#[source] ConfyError),

    #[error(transparent)]
    Restful(#[from] RestfulError),

    #[error("Failed to render output: {0}")]
    Output(#[from] serde_json::Error),

    #[error("{0}")]
    GeneralError(String),
}
