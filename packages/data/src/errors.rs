//! Error types for the document model

use crate::location::NodeLocation;
use crate::node::NodeKey;
use thiserror::Error;

pub type DocumentResult<T> = Result<T, DocumentError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentError {
    #[error("Node {0} is no longer in the document")]
    StaleReference(NodeKey),

    #[error("Delta needs {required} units but the text has {available}")]
    DeltaOutOfRange { required: usize, available: usize },

    #[error("Offset {offset} falls inside a surrogate pair")]
    SurrogateSplit { offset: usize },

    #[error("No node at location {0}")]
    InvalidLocation(NodeLocation),

    #[error("Duplicate block id: {0}")]
    DuplicateId(String),

    #[error("Invalid structure: {0}")]
    InvalidStructure(String),

    #[error("Invalid attribute: {0}")]
    InvalidAttribute(String),

    #[error("Malformed JSON: {0}")]
    MalformedJson(String),

    #[error("More than {limit} deferred changesets queued by one apply")]
    DeferredLimitExceeded { limit: usize },
}

/// Payload-free classification of [`DocumentError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    StaleReference,
    DeltaOutOfRange,
    SurrogateSplit,
    InvalidLocation,
    DuplicateId,
    InvalidStructure,
    InvalidAttribute,
    MalformedJson,
    DeferredLimitExceeded,
}

impl DocumentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DocumentError::StaleReference(_) => ErrorKind::StaleReference,
            DocumentError::DeltaOutOfRange { .. } => ErrorKind::DeltaOutOfRange,
            DocumentError::SurrogateSplit { .. } => ErrorKind::SurrogateSplit,
            DocumentError::InvalidLocation(_) => ErrorKind::InvalidLocation,
            DocumentError::DuplicateId(_) => ErrorKind::DuplicateId,
            DocumentError::InvalidStructure(_) => ErrorKind::InvalidStructure,
            DocumentError::InvalidAttribute(_) => ErrorKind::InvalidAttribute,
            DocumentError::MalformedJson(_) => ErrorKind::MalformedJson,
            DocumentError::DeferredLimitExceeded { .. } => ErrorKind::DeferredLimitExceeded,
        }
    }

    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure(message.into())
    }

    pub fn invalid_attribute(message: impl Into<String>) -> Self {
        Self::InvalidAttribute(message.into())
    }
}

impl From<serde_json::Error> for DocumentError {
    fn from(e: serde_json::Error) -> Self {
        DocumentError::MalformedJson(e.to_string())
    }
}
