use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::document::{NodeId, RangeId};

/// Banner text used when an error renders to an empty message.
pub const FALLBACK_ERROR_MESSAGE: &str = "Failed to generate content";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),
    #[error("node {0:?} is not attached to the note")]
    Detached(NodeId),
    #[error("node {0:?} cannot hold children")]
    NotAContainer(NodeId),
    #[error("node {0:?} is not a text node")]
    NotText(NodeId),
    #[error("offset {offset} is out of bounds for node {node:?}")]
    OffsetOutOfBounds { node: NodeId, offset: usize },
    #[error("range {0:?} has been released")]
    ReleasedRange(RangeId),
    #[error("node {0:?} cannot be inserted there")]
    InvalidInsertion(NodeId),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),
    #[error("provider returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
    #[error("provider returned no content")]
    EmptyResponse,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SanitizeError {
    #[error("{0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("Please select some text first")]
    NoSelection,
    #[error("a generation is already in progress")]
    Busy,
    #[error("no generation request is pending")]
    NotPending,
    #[error("{0}")]
    Provider(#[from] ProviderError),
    #[error("model did not answer within {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("unrecognized response marker: {0}")]
    Classification(String),
    #[error("{0}")]
    Sanitization(#[from] SanitizeError),
    #[error("could not update the note: {0}")]
    Splice(#[from] DocumentError),
}

impl GenerationError {
    /// Text for the error banner.
    pub fn banner_message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            FALLBACK_ERROR_MESSAGE.to_string()
        } else {
            message
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingSecret(&'static str),
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
