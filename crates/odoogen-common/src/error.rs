//! Unified error types for the odoogen workspace.
//!
//! Remote-fetch and extraction failures are recoverable: the archive crate
//! converts them into a failed outcome and generation continues. The other
//! variants abort the invocation.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum OdoogenError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A required input is missing or contradicts another one.
    #[error("precondition failed: {message}")]
    Precondition {
        /// Description of the unmet precondition.
        message: String,
    },

    /// The remote archive host could not deliver the archive.
    #[error("remote fetch failed: {message}")]
    RemoteFetch {
        /// Description of the failed step.
        message: String,
    },

    /// An archive could not be read or unpacked.
    #[error("extraction of {archive} failed: {message}")]
    Extraction {
        /// Archive being extracted.
        archive: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// A template is missing or failed to render.
    #[error("template {name}: {message}")]
    Template {
        /// Template file name.
        name: String,
        /// Description of the failure.
        message: String,
    },

    /// A YAML document could not be parsed or emitted.
    #[error("YAML error: {source}")]
    Yaml {
        /// Underlying YAML error.
        #[from]
        source: serde_yaml::Error,
    },

    /// The container runtime reported a failure.
    #[error("`{command}` failed: {message}")]
    Runtime {
        /// Command line that was invoked.
        command: String,
        /// Captured diagnostic output.
        message: String,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },
}

impl OdoogenError {
    /// Builds an [`OdoogenError::Io`] for the given path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Builds an [`OdoogenError::RemoteFetch`] from any displayable message.
    pub fn remote(message: impl Into<String>) -> Self {
        Self::RemoteFetch {
            message: message.into(),
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, OdoogenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_mentions_path() {
        let err = OdoogenError::io(
            "/tmp/instance",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let text = err.to_string();
        assert!(text.contains("/tmp/instance"));
        assert!(text.contains("denied"));
    }

    #[test]
    fn runtime_error_mentions_command() {
        let err = OdoogenError::Runtime {
            command: "docker compose up -d --build".into(),
            message: "exit status 1".into(),
        };
        assert_eq!(
            err.to_string(),
            "`docker compose up -d --build` failed: exit status 1"
        );
    }
}
