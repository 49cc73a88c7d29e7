//! Typed collection handles.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use super::{GraphInput, GraphOutput, GraphValue, Tag, TaggedValue};
use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::{ApplicationId, CollectionId, Pipeline};
use crate::transform::{AppliedTransform, Transform};

/// Handle to a collection of `T` elements in a pipeline graph.
///
/// The handle stores no elements; `T` only ties transforms together at
/// compile time. Bookkeeping such as the producing application and the
/// output tag lives in the pipeline graph.
pub struct Collection<T> {
    id: CollectionId,
    pipeline: Pipeline,
    _element: PhantomData<fn() -> T>,
}

impl<T> Collection<T> {
    pub(crate) fn new(pipeline: Pipeline, id: CollectionId) -> Self {
        Self {
            id,
            pipeline,
            _element: PhantomData,
        }
    }

    /// Returns the collection id.
    #[inline]
    pub fn id(&self) -> CollectionId {
        self.id
    }

    /// Returns the owning pipeline.
    #[inline]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Returns the tag assigned when this collection was recorded as an output.
    pub fn tag(&self) -> Tag {
        self.pipeline
            .collection_node(self.id)
            .map(|node| node.tag)
            .unwrap_or_default()
    }

    /// Returns the application that produced this collection, if any.
    pub fn producer(&self) -> Option<ApplicationId> {
        self.pipeline
            .collection_node(self.id)
            .and_then(|node| node.producer)
    }

    /// Returns this collection paired with its current tag.
    pub fn tagged(&self) -> TaggedCollection<T> {
        TaggedCollection {
            tag: self.tag(),
            collection: self.clone(),
        }
    }

    /// Like [`apply_named`](Self::apply_named) but uses the transform's name.
    pub fn apply<X>(&self, transform: &X) -> PipelineResult<X::Output>
    where
        X: Transform<Self>,
    {
        Pipeline::apply_transform(self, transform)
    }

    /// Applies `transform` to this collection under the given name.
    pub fn apply_named<X>(&self, name: &str, transform: &X) -> PipelineResult<X::Output>
    where
        X: Transform<Self>,
    {
        Pipeline::apply_transform_named(name, self, transform)
    }
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self::new(self.pipeline.clone(), self.id)
    }
}

impl<T> PartialEq for Collection<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.pipeline == other.pipeline
    }
}

impl<T> Eq for Collection<T> {}

impl<T> Hash for Collection<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.pipeline.hash(state);
        self.id.hash(state);
    }
}

impl<T> fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("id", &self.id)
            .field("pipeline", &self.pipeline.id())
            .finish()
    }
}

impl<T> GraphValue for Collection<T> {
    fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    fn expand(&self) -> Vec<TaggedValue> {
        vec![self.tagged().to_tagged_value()]
    }
}

impl<T> GraphInput for Collection<T> {}

impl<T> GraphOutput for Collection<T> {
    fn record_as_output(&self, application: &AppliedTransform) -> PipelineResult<()> {
        self.pipeline
            .record_outputs(application, &[(self.id, Tag::single_output())])
    }

    fn finish_specifying_output(
        &self,
        _input: &dyn GraphInput,
        transform_name: &str,
    ) -> PipelineResult<()> {
        if self.producer().is_none() {
            return Err(PipelineError::invalid_argument(format!(
                "collection {} returned by {transform_name} was never recorded as an output",
                self.id
            )));
        }
        Ok(())
    }
}

/// A collection paired with the tag it carried when it was referenced.
pub struct TaggedCollection<T> {
    tag: Tag,
    collection: Collection<T>,
}

impl<T> TaggedCollection<T> {
    /// Returns the tag.
    #[inline]
    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    /// Returns the collection.
    #[inline]
    pub fn collection(&self) -> &Collection<T> {
        &self.collection
    }

    /// Consumes the pair and returns the collection.
    pub fn into_collection(self) -> Collection<T> {
        self.collection
    }

    /// Returns the type-erased form of this reference.
    pub fn to_tagged_value(&self) -> TaggedValue {
        TaggedValue::new(
            self.tag.clone(),
            self.collection.pipeline.id(),
            self.collection.id,
        )
    }
}

impl<T> Clone for TaggedCollection<T> {
    fn clone(&self) -> Self {
        Self {
            tag: self.tag.clone(),
            collection: self.collection.clone(),
        }
    }
}

impl<T> PartialEq for TaggedCollection<T> {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag && self.collection == other.collection
    }
}

impl<T> Eq for TaggedCollection<T> {}

impl<T> Hash for TaggedCollection<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tag.hash(state);
        self.collection.hash(state);
    }
}

impl<T> fmt::Debug for TaggedCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaggedCollection")
            .field("tag", &self.tag)
            .field("collection", &self.collection)
            .finish()
    }
}
