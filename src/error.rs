// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Error kinds shared by the parsing pipeline and the workflow stages

use serde::Serialize;
use std::fmt;

/// A single field-level problem found while validating a metadata document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldProblem {
    /// Dotted path into the document, e.g. `apixMetadata.list[0].version`
    pub path: String,
    /// Human-readable description
    pub message: String,
}

impl FieldProblem {
    /// Build a problem for `path`
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Library error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Workbook bytes could not be decoded, or a requested sheet is missing
    #[error("source unreadable: {0}")]
    SourceUnreadable(String),

    /// No matching repository, or no metadata file on any tried branch
    #[error("not found: {0}")]
    NotFound(String),

    /// Fetched content is not a valid JSON document
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// Schema or field errors in a metadata document
    #[error("validation failed with {} problem(s)", .0.len())]
    ValidationFailed(Vec<FieldProblem>),

    /// Network or HTTP failure talking to GitHub or the publish endpoint
    #[error("remote call failed{}: {body}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    RemoteCallFailed {
        /// HTTP status, when a response was received
        status: Option<u16>,
        /// Response body verbatim, or the transport error text
        body: String,
    },

    /// A workflow stage guard was violated
    #[error("precondition not met: {0}")]
    PreconditionNotMet(String),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Shorthand for a transport-level failure with no HTTP status
    pub fn transport(err: impl fmt::Display) -> Self {
        Self::RemoteCallFailed {
            status: None,
            body: err.to_string(),
        }
    }

    /// Stable machine-readable name of the error kind
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SourceUnreadable(_) => "source_unreadable",
            Self::NotFound(_) => "not_found",
            Self::MalformedDocument(_) => "malformed_document",
            Self::ValidationFailed(_) => "validation_failed",
            Self::RemoteCallFailed { .. } => "remote_call_failed",
            Self::PreconditionNotMet(_) => "precondition_not_met",
            Self::Config(_) => "config",
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::RemoteCallFailed {
            status: err.status().map(|s| s.as_u16()),
            body: err.to_string(),
        }
    }
}

impl From<calamine::XlsxError> for Error {
    fn from(err: calamine::XlsxError) -> Self {
        Self::SourceUnreadable(err.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_call_display_includes_status() {
        let err = Error::RemoteCallFailed {
            status: Some(502),
            body: "bad gateway".into(),
        };
        assert_eq!(err.to_string(), "remote call failed (HTTP 502): bad gateway");
    }

    #[test]
    fn test_remote_call_display_without_status() {
        let err = Error::transport("connection reset");
        assert_eq!(err.to_string(), "remote call failed: connection reset");
        assert_eq!(err.kind(), "remote_call_failed");
    }

    #[test]
    fn test_validation_failed_counts_problems() {
        let err = Error::ValidationFailed(vec![
            FieldProblem::new("a", "missing"),
            FieldProblem::new("b", "blank"),
        ]);
        assert_eq!(err.to_string(), "validation failed with 2 problem(s)");
    }
}
