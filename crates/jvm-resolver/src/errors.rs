use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum JvmError {
    #[error("invalid java version requirement '{0}'")]
    InvalidVersion(String),

    #[error("no JVM found matching version requirement '{0}'")]
    NotFound(String),

    #[error("configured JVM runtime at {} is not usable: {reason}", path.display())]
    UnusableRuntime { path: PathBuf, reason: String },

    #[error("no libjli library found below {}", .0.display())]
    MissingDylib(PathBuf),

    #[error("invalid launch configuration: {0}")]
    Launch(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
