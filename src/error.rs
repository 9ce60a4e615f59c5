//! Error types for jobhunt.
//!
//! `HuntError` is what crosses the pipeline boundary. `SourceError` and
//! `OracleError` live below it and are normally absorbed (empty results,
//! neutral scores) before they ever reach a caller.

use std::time::Duration;

use thiserror::Error;

use crate::core::record::SourceKind;

pub type Result<T> = std::result::Result<T, HuntError>;

#[derive(Debug, Error)]
pub enum HuntError {
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("missing configuration: {0}")]
    MissingConfig(String),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("pipeline failed: {0}")]
    PipelineFailed(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure of a single fetch attempt against one job source.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("{site} request failed: {message}")]
    Network { site: SourceKind, message: String },

    #[error("{site} timed out after {after:?}")]
    Timeout { site: SourceKind, after: Duration },

    #[error("{site} returned HTTP {status}")]
    Status { site: SourceKind, status: u16 },

    #[error("{site} response could not be parsed: {message}")]
    Parse { site: SourceKind, message: String },
}

impl SourceError {
    #[must_use]
    pub const fn site(&self) -> SourceKind {
        match self {
            Self::Network { site, .. }
            | Self::Timeout { site, .. }
            | Self::Status { site, .. }
            | Self::Parse { site, .. } => *site,
        }
    }
}

/// Failure talking to the semantic oracle.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OracleError {
    #[error("oracle request failed: {0}")]
    Request(String),

    #[error("oracle returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("oracle timed out")]
    Timeout,

    #[error("oracle returned no text")]
    EmptyResponse,

    #[error("oracle answer not understood: {0}")]
    Malformed(String),

    #[error("oracle unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_error_reports_site() {
        let err = SourceError::Status {
            site: SourceKind::Rozee,
            status: 503,
        };
        assert_eq!(err.site(), SourceKind::Rozee);
        assert_eq!(err.to_string(), "Rozee.pk returned HTTP 503");
    }

    #[test]
    fn hunt_error_wraps_source_error_transparently() {
        let err: HuntError = SourceError::Parse {
            site: SourceKind::Indeed,
            message: "expected array".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Indeed response could not be parsed: expected array"
        );
    }
}
