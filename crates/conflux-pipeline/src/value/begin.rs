//! Root input of a pipeline.

use super::{GraphInput, GraphValue, TaggedValue};
use crate::error::PipelineResult;
use crate::pipeline::Pipeline;
use crate::transform::Transform;

/// Input of root transforms, carrying no collections.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipelineBegin {
    pipeline: Pipeline,
}

impl PipelineBegin {
    pub(crate) fn new(pipeline: Pipeline) -> Self {
        Self { pipeline }
    }

    /// Like [`apply_named`](Self::apply_named) but uses the transform's name.
    pub fn apply<X>(&self, transform: &X) -> PipelineResult<X::Output>
    where
        X: Transform<Self>,
    {
        Pipeline::apply_transform(self, transform)
    }

    /// Applies a root transform under the given name.
    pub fn apply_named<X>(&self, name: &str, transform: &X) -> PipelineResult<X::Output>
    where
        X: Transform<Self>,
    {
        Pipeline::apply_transform_named(name, self, transform)
    }
}

impl GraphValue for PipelineBegin {
    fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    fn expand(&self) -> Vec<TaggedValue> {
        Vec::new()
    }
}

impl GraphInput for PipelineBegin {}
