//! Transforms and their applications.
//!
//! - [`Transform`]: a graph-building step from one input value to an output value
//! - [`AppliedTransform`]: handle to one application of a transform
//! - [`Source`]: declares a root collection
//! - [`Flatten`]: merges a [`CollectionList`] into a single collection
//! - [`Partition`]: splits a collection into a [`CollectionList`]
//!
//! [`CollectionList`]: crate::value::CollectionList

mod applied;
mod flatten;
mod partition;
mod source;

use std::borrow::Cow;

pub use applied::AppliedTransform;
pub use flatten::Flatten;
pub use partition::Partition;
pub use source::Source;

use crate::error::PipelineResult;
use crate::value::{GraphInput, GraphOutput};

/// A step that expands an input value into an output value.
///
/// Expansion only declares graph structure: it creates output collections
/// through the input's pipeline and may apply nested transforms. It never
/// processes elements.
pub trait Transform<I: GraphInput>: Send + Sync {
    /// Value produced by this transform.
    type Output: GraphOutput;

    /// Returns the default application name of this transform.
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed(short_type_name::<Self>())
    }

    /// Declares the output of this transform for `input`.
    fn expand(&self, input: &I) -> PipelineResult<Self::Output>;
}

/// Returns the unqualified type name of `T` without generic arguments.
fn short_type_name<T: ?Sized>() -> &'static str {
    let name = std::any::type_name::<T>();
    let name = name.split('<').next().unwrap_or(name);
    name.rsplit("::").next().unwrap_or(name)
}
