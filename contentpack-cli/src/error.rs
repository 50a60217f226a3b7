//! CLI error type.

use std::io;

use contentpack::loader::LoaderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("no pack with identity '{0}'")]
    PackNotFound(String),

    #[error("no pack contains '{0}'")]
    ResourceNotFound(String),

    #[error(transparent)]
    Loader(#[from] LoaderError),

    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}
