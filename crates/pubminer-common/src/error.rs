//! Error taxonomy shared across PubMiner crates.
//!
//! Every failure that reaches a caller is one of three kinds: the upstream could
//! not be reached ([`ErrorKind::TransportError`]), it answered with a document we
//! cannot read ([`ErrorKind::InvalidDocumentFormat`]), or the local
//! configuration is broken ([`ErrorKind::Config`]).

use std::fmt;

use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PubMinerError>;

/// The E-utilities step a request or document belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Search,
    Link,
    Summary,
    Fetch,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Search  => "esearch",
            Stage::Link    => "elink",
            Stage::Summary => "esummary",
            Stage::Fetch   => "efetch",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    TransportError,
    InvalidDocumentFormat,
    Config,
}

/// How loudly a caller-facing surface should present a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Danger,
}

#[derive(Debug, Error)]
pub enum PubMinerError {
    #[error("{stage} request failed: {source}")]
    Transport {
        stage: Stage,
        #[source]
        source: reqwest::Error,
    },

    #[error("{stage} returned HTTP {status}")]
    UpstreamStatus { stage: Stage, status: u16 },

    #[error("Request refused: {0}")]
    Security(String),

    #[error("invalid {stage} document ({context}): {reason}")]
    InvalidDocumentFormat {
        stage: Stage,
        context: String,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PubMinerError {
    pub fn invalid_document(
        stage: Stage,
        context: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        PubMinerError::InvalidDocumentFormat {
            stage,
            context: context.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PubMinerError::Transport { .. }
            | PubMinerError::UpstreamStatus { .. }
            | PubMinerError::Security(_) => ErrorKind::TransportError,
            PubMinerError::InvalidDocumentFormat { .. } => ErrorKind::InvalidDocumentFormat,
            PubMinerError::Config(_) => ErrorKind::Config,
        }
    }

    /// Transport failures are usually transient; a bad document or config is not.
    pub fn severity(&self) -> Severity {
        match self.kind() {
            ErrorKind::TransportError => Severity::Warning,
            ErrorKind::InvalidDocumentFormat | ErrorKind::Config => Severity::Danger,
        }
    }

    /// The step the failure happened in, when it is known.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PubMinerError::Transport { stage, .. }
            | PubMinerError::UpstreamStatus { stage, .. }
            | PubMinerError::InvalidDocumentFormat { stage, .. } => Some(*stage),
            PubMinerError::Security(_) | PubMinerError::Config(_) => None,
        }
    }
}
