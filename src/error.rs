//! Error types and handling for the collector

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sources::SourceKind;

/// Main error type for a collector run
#[derive(Error, Debug)]
pub enum CollectorError {
    /// Network failure, timeout, or non-2xx answer from a source
    #[error("{role} unavailable: {message}")]
    SourceUnavailable { role: SourceKind, message: String },

    /// A source answered but the payload could not be understood
    #[error("{role} returned malformed data: {message}")]
    SourceMalformed { role: SourceKind, message: String },

    /// The snapshot could not be turned into JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The snapshot could not be written to its published location
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CollectorError {
    /// Create a new source-unavailable error
    pub fn unavailable<S: Into<String>>(role: SourceKind, message: S) -> Self {
        Self::SourceUnavailable {
            role,
            message: message.into(),
        }
    }

    /// Create a new source-malformed error
    pub fn malformed<S: Into<String>>(role: SourceKind, message: S) -> Self {
        Self::SourceMalformed {
            role,
            message: message.into(),
        }
    }

    /// Create a new write error for `path`
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error aborts the run without publishing
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::SourceUnavailable { .. } | Self::SourceMalformed { .. }
        )
    }
}

/// Failure class recorded for a degraded source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    SourceUnavailable,
    SourceMalformed,
}

/// A per-source failure, carried as a value into the merge instead of
/// aborting the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFailure {
    pub role: SourceKind,
    pub kind: FailureKind,
    pub message: String,
}

impl SourceFailure {
    pub fn unavailable<S: Into<String>>(role: SourceKind, message: S) -> Self {
        Self {
            role,
            kind: FailureKind::SourceUnavailable,
            message: message.into(),
        }
    }

    pub fn malformed<S: Into<String>>(role: SourceKind, message: S) -> Self {
        Self {
            role,
            kind: FailureKind::SourceMalformed,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let error: CollectorError = self.clone().into();
        write!(f, "{error}")
    }
}

impl From<SourceFailure> for CollectorError {
    fn from(failure: SourceFailure) -> Self {
        match failure.kind {
            FailureKind::SourceUnavailable => Self::unavailable(failure.role, failure.message),
            FailureKind::SourceMalformed => Self::malformed(failure.role, failure.message),
        }
    }
}
