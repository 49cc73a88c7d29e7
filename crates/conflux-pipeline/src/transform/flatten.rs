//! Merging a list of collections into one.

use super::Transform;
use crate::error::PipelineResult;
use crate::value::{Collection, CollectionList};

/// Merges every collection of a [`CollectionList`] into a single collection.
///
/// An empty list is accepted and yields an empty collection in the list's
/// pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct Flatten;

impl<T> Transform<CollectionList<T>> for Flatten {
    type Output = Collection<T>;

    fn expand(&self, input: &CollectionList<T>) -> PipelineResult<Self::Output> {
        Ok(input.pipeline().new_collection())
    }
}
