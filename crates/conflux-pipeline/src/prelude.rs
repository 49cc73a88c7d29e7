//! Prelude module for convenient imports.
//!
//! This module re-exports commonly used types for ergonomic imports:
//!
//! ```rust
//! use conflux_pipeline::prelude::*;
//! ```

pub use crate::error::{PipelineError, PipelineResult};
pub use crate::pipeline::{Pipeline, PipelineOptions, UniqueNames};
pub use crate::transform::{AppliedTransform, Flatten, Partition, Source, Transform};
pub use crate::value::{
    Collection, CollectionList, GraphInput, GraphOutput, GraphValue, PipelineBegin, Tag,
    TaggedValue,
};
