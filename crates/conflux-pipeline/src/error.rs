//! Pipeline error types.

use thiserror::Error;

use crate::pipeline::{ApplicationId, CollectionId, PipelineOptionsBuilderError};

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that can occur while constructing a pipeline graph.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// An argument violated the contract of the called operation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An index was outside the bounds of a collection list.
    #[error("index {index} out of range for list of length {len}")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Length of the list.
        len: usize,
    },

    /// A transform application name is already taken.
    #[error("transform name {0:?} is already used in this pipeline")]
    DuplicateName(String),

    /// A collection already has a different producing application or tag.
    #[error("collection {collection} is already produced by application {producer}")]
    AlreadyProduced {
        /// The collection that was recorded twice.
        collection: CollectionId,
        /// The application that produced it first.
        producer: ApplicationId,
    },

    /// A collection is not part of the pipeline graph.
    #[error("unknown collection {0}")]
    UnknownCollection(CollectionId),

    /// Pipeline options are invalid.
    #[error("invalid pipeline options: {0}")]
    InvalidConfig(#[from] PipelineOptionsBuilderError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The pipeline graph is structurally invalid.
    #[error("invalid pipeline graph: {0}")]
    InvalidDefinition(String),
}

impl PipelineError {
    /// Creates a [`PipelineError::InvalidArgument`] error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}
