//! Handle to one application of a transform.

use serde::{Deserialize, Serialize};

use crate::pipeline::{ApplicationId, PipelineId};
use crate::value::TaggedValue;

/// A transform applied to a specific input within a pipeline.
///
/// The handle is threaded through [`GraphOutput::record_as_output`] so that
/// every produced collection learns which application created it.
///
/// [`GraphOutput::record_as_output`]: crate::value::GraphOutput::record_as_output
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppliedTransform {
    id: ApplicationId,
    pipeline: PipelineId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent: Option<ApplicationId>,
    full_name: String,
    transform_name: String,
    inputs: Vec<TaggedValue>,
}

impl AppliedTransform {
    pub(crate) fn new(
        pipeline: PipelineId,
        parent: Option<ApplicationId>,
        full_name: impl Into<String>,
        transform_name: impl Into<String>,
        inputs: Vec<TaggedValue>,
    ) -> Self {
        Self {
            id: ApplicationId::new(),
            pipeline,
            parent,
            full_name: full_name.into(),
            transform_name: transform_name.into(),
            inputs,
        }
    }

    /// Returns the application id.
    #[inline]
    pub fn id(&self) -> ApplicationId {
        self.id
    }

    /// Returns the id of the owning pipeline.
    #[inline]
    pub fn pipeline_id(&self) -> PipelineId {
        self.pipeline
    }

    /// Returns the composite application whose expansion applied this one.
    #[inline]
    pub fn parent(&self) -> Option<ApplicationId> {
        self.parent
    }

    /// Returns the unique name of this application within its pipeline.
    ///
    /// Nested applications are prefixed with their parent's full name,
    /// separated by `/`.
    #[inline]
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Returns the name of the applied transform.
    #[inline]
    pub fn transform_name(&self) -> &str {
        &self.transform_name
    }

    /// Returns the expanded inputs, in order.
    #[inline]
    pub fn inputs(&self) -> &[TaggedValue] {
        &self.inputs
    }
}
