use std::path::PathBuf;

use bundle_model::PlistError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error(transparent)]
    Plist(#[from] PlistError),

    #[error("invalid bundle configuration: {0}")]
    Invalid(String),

    #[error("cannot find {what} at {}", path.display())]
    MissingFile { what: &'static str, path: PathBuf },

    #[error("command '{tool}' exited with status {status}")]
    Tool { tool: String, status: i32 },

    #[error("invalid file set pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Walk(#[from] walkdir::Error),
}

impl BundleError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}
