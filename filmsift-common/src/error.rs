//! Common error types for filmsift

use thiserror::Error;

/// Common result type for filmsift operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the filmsift crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed TOML document
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Parse(err.to_string())
    }
}
