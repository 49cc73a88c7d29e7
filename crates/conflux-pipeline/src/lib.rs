#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod error;
pub mod pipeline;
pub mod transform;
pub mod value;

#[doc(hidden)]
pub mod prelude;

pub use error::{PipelineError, PipelineResult};

/// Tracing target for pipeline graph operations.
pub const TRACING_TARGET: &str = "conflux_pipeline";
