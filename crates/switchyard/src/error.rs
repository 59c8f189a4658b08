//! Application error type.

use std::path::PathBuf;

use switchyard_core::ReactorError;

/// Errors raised while setting up or running the application.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The reactor core refused an operation.
    #[error(transparent)]
    Reactor(#[from] ReactorError),

    /// The configuration file could not be read.
    #[error("failed to read config file '{path}': {source}")]
    ConfigRead {
        /// The file that was read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file could not be written.
    #[error("failed to write config file '{path}': {source}")]
    ConfigSave {
        /// The file that was written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A portable environment path does not resolve.
    #[error("failed to resolve environment path '{path}': {source}")]
    Environment {
        /// The path as configured, joined to its base.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration document is not valid.
    #[error("invalid configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The configuration could not be written back out.
    #[error("failed to serialize configuration: {0}")]
    ConfigWrite(#[from] toml::ser::Error),
}

/// A specialized Result type for application operations.
pub type AppResult<T> = std::result::Result<T, AppError>;
