use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlistError {
    #[error("invalid plist configuration: {0}")]
    Invalid(String),

    #[error("malformed plist: {0}")]
    Malformed(String),

    #[error("unexpected plist element <{0}>")]
    UnexpectedElement(String),

    #[error("failed to parse bundle config: {0}")]
    Config(#[from] toml::de::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
