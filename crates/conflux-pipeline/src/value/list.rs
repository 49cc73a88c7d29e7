//! Ordered lists of homogeneous collections.

use std::fmt;
use std::hash::{Hash, Hasher};

use super::{Collection, GraphInput, GraphOutput, GraphValue, Tag, TaggedCollection, TaggedValue};
use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::Pipeline;
use crate::transform::{AppliedTransform, Transform};

/// An immutable, ordered list of collections of the same element type.
///
/// A `CollectionList` lets a transform consume or produce several
/// collections as one value: [`Flatten`] merges a list into one collection,
/// [`Partition`] splits one collection into a list. Every collection in the
/// list belongs to the list's pipeline.
///
/// Lists never change after construction. [`append`](Self::append) and
/// [`append_all`](Self::append_all) return a new list and leave the
/// original untouched.
///
/// ```rust
/// use conflux_pipeline::prelude::*;
///
/// let pipeline = Pipeline::new();
/// let a = pipeline.begin().apply(&Source::<u32>::new())?;
/// let b = pipeline.begin().apply(&Source::<u32>::new())?;
///
/// let list = CollectionList::of(&a).append(&b)?;
/// assert_eq!(list.len(), 2);
/// assert_eq!(list.get(1)?, &b);
///
/// let merged = list.apply(&Flatten)?;
/// assert_eq!(merged.pipeline(), &pipeline);
/// # Ok::<(), conflux_pipeline::PipelineError>(())
/// ```
///
/// [`Flatten`]: crate::transform::Flatten
/// [`Partition`]: crate::transform::Partition
pub struct CollectionList<T> {
    pipeline: Pipeline,
    elements: Vec<TaggedCollection<T>>,
}

impl<T> CollectionList<T> {
    /// Returns an empty list bound to `pipeline`.
    pub fn empty(pipeline: &Pipeline) -> Self {
        Self {
            pipeline: pipeline.clone(),
            elements: Vec::new(),
        }
    }

    /// Returns a list containing only `collection`.
    pub fn of(collection: &Collection<T>) -> Self {
        Self {
            pipeline: collection.pipeline().clone(),
            elements: vec![collection.tagged()],
        }
    }

    /// Returns a list containing the given collections, in order.
    ///
    /// The list is bound to the pipeline of the first collection.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidArgument`] if `collections` is empty
    /// or the collections belong to different pipelines.
    pub fn of_all<'a, I>(collections: I) -> PipelineResult<Self>
    where
        I: IntoIterator<Item = &'a Collection<T>>,
        T: 'a,
    {
        let mut collections = collections.into_iter().peekable();
        let Some(first) = collections.peek() else {
            return Err(PipelineError::invalid_argument(
                "must either have a non-empty list of collections, or start from an empty list",
            ));
        };

        Self::empty(first.pipeline()).append_all(collections)
    }

    /// Returns a new list with `collection` appended at the end.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidArgument`] if `collection` belongs to a
    /// different pipeline than this list.
    pub fn append(&self, collection: &Collection<T>) -> PipelineResult<Self> {
        self.append_all(std::iter::once(collection))
    }

    /// Returns a new list with all `collections` appended at the end, in order.
    ///
    /// Either every collection is appended or none is.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidArgument`] on the first collection that
    /// belongs to a different pipeline than this list.
    pub fn append_all<'a, I>(&self, collections: I) -> PipelineResult<Self>
    where
        I: IntoIterator<Item = &'a Collection<T>>,
        T: 'a,
    {
        let collections = collections.into_iter();
        let mut elements = Vec::with_capacity(self.elements.len() + collections.size_hint().0);
        elements.extend(self.elements.iter().cloned());

        for collection in collections {
            if collection.pipeline() != &self.pipeline {
                return Err(PipelineError::invalid_argument(format!(
                    "collection {} belongs to pipeline {}, not {}",
                    collection.id(),
                    collection.pipeline().id(),
                    self.pipeline.id()
                )));
            }
            elements.push(collection.tagged());
        }

        Ok(Self {
            pipeline: self.pipeline.clone(),
            elements,
        })
    }

    /// Returns the pipeline this list is bound to.
    #[inline]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Returns the number of collections in the list.
    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns whether the list is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Returns the collection at `index` (origin zero).
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::IndexOutOfRange`] if `index >= self.len()`.
    pub fn get(&self, index: usize) -> PipelineResult<&Collection<T>> {
        self.elements
            .get(index)
            .map(TaggedCollection::collection)
            .ok_or(PipelineError::IndexOutOfRange {
                index,
                len: self.elements.len(),
            })
    }

    /// Returns all collections, in list order.
    pub fn get_all(&self) -> Vec<Collection<T>> {
        self.iter().cloned().collect()
    }

    /// Returns an iterator over the collections, in list order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Collection<T>> {
        self.elements.iter().map(TaggedCollection::collection)
    }

    /// Returns the tagged elements, in list order.
    #[inline]
    pub fn tagged(&self) -> &[TaggedCollection<T>] {
        &self.elements
    }

    /// Like [`apply_named`](Self::apply_named) but uses the transform's name.
    pub fn apply<X>(&self, transform: &X) -> PipelineResult<X::Output>
    where
        X: Transform<Self>,
    {
        Pipeline::apply_transform(self, transform)
    }

    /// Applies `transform` to this list under the given name.
    pub fn apply_named<X>(&self, name: &str, transform: &X) -> PipelineResult<X::Output>
    where
        X: Transform<Self>,
    {
        Pipeline::apply_transform_named(name, self, transform)
    }
}

impl<T> GraphValue for CollectionList<T> {
    fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    fn expand(&self) -> Vec<TaggedValue> {
        self.elements
            .iter()
            .map(TaggedCollection::to_tagged_value)
            .collect()
    }
}

impl<T> GraphInput for CollectionList<T> {}

impl<T> GraphOutput for CollectionList<T> {
    /// Tags the `i`-th collection `out{i}` and records `application` as its
    /// producer. The list must not contain the same collection twice.
    fn record_as_output(&self, application: &AppliedTransform) -> PipelineResult<()> {
        let outputs: Vec<_> = self
            .elements
            .iter()
            .enumerate()
            .map(|(index, element)| (element.collection().id(), Tag::output(index)))
            .collect();
        self.pipeline.record_outputs(application, &outputs)
    }

    fn finish_specifying_output(
        &self,
        _input: &dyn GraphInput,
        _transform_name: &str,
    ) -> PipelineResult<()> {
        // Component collections are finished on their own.
        Ok(())
    }
}

impl<T> Clone for CollectionList<T> {
    fn clone(&self) -> Self {
        Self {
            pipeline: self.pipeline.clone(),
            elements: self.elements.clone(),
        }
    }
}

impl<T> PartialEq for CollectionList<T> {
    fn eq(&self, other: &Self) -> bool {
        self.pipeline == other.pipeline && self.elements == other.elements
    }
}

impl<T> Eq for CollectionList<T> {}

impl<T> Hash for CollectionList<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.pipeline.hash(state);
        self.elements.hash(state);
    }
}

impl<T> fmt::Debug for CollectionList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionList")
            .field("pipeline", &self.pipeline.id())
            .field("elements", &self.elements)
            .finish()
    }
}

impl<'a, T> IntoIterator for &'a CollectionList<T> {
    type Item = &'a Collection<T>;
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, TaggedCollection<T>>,
        fn(&'a TaggedCollection<T>) -> &'a Collection<T>,
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.elements
            .iter()
            .map(TaggedCollection::collection as fn(&'a TaggedCollection<T>) -> &'a Collection<T>)
    }
}
