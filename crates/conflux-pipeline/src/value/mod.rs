//! Values that flow between transform applications.
//!
//! - [`Collection`]: typed handle to one collection node
//! - [`CollectionList`]: ordered, homogeneous group of collections
//! - [`PipelineBegin`]: root input with no collections
//! - [`Tag`] and [`TaggedValue`]: named references used by the graph

mod begin;
mod collection;
mod list;
mod tag;

pub use begin::PipelineBegin;
pub use collection::{Collection, TaggedCollection};
pub use list::CollectionList;
pub use tag::{Tag, TaggedValue};

use crate::error::PipelineResult;
use crate::pipeline::Pipeline;
use crate::transform::AppliedTransform;

/// A value that is part of a pipeline graph.
pub trait GraphValue {
    /// Returns the pipeline this value belongs to.
    fn pipeline(&self) -> &Pipeline;

    /// Expands this value into its component tagged references, in order.
    fn expand(&self) -> Vec<TaggedValue>;
}

/// A value that can be consumed by a transform application.
pub trait GraphInput: GraphValue {}

/// A value that can be produced by a transform application.
pub trait GraphOutput: GraphValue {
    /// Records `application` as the producer of every component of this value.
    ///
    /// Called once by [`Pipeline::apply_transform`] after the transform has
    /// expanded. Components already produced by an application nested in
    /// `application` keep their producer. Calling it again with the same
    /// application is a no-op; any other application fails with
    /// [`PipelineError::AlreadyProduced`](crate::PipelineError::AlreadyProduced).
    fn record_as_output(&self, application: &AppliedTransform) -> PipelineResult<()>;

    /// Finalizes this value once it has been recorded as an output.
    fn finish_specifying_output(
        &self,
        input: &dyn GraphInput,
        transform_name: &str,
    ) -> PipelineResult<()>;
}
