//! Tags and tagged references.

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

use crate::pipeline::{CollectionId, PipelineId};

/// Prefix of the positional tags assigned to recorded outputs.
const OUTPUT_TAG_PREFIX: &str = "out";

/// Name distinguishing one input or output of a transform application.
///
/// A collection that has not been recorded as an output yet carries the
/// unset (empty) tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    /// Creates a tag from a string.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Returns the unset tag.
    #[inline]
    pub const fn unset() -> Self {
        Self(String::new())
    }

    /// Returns the positional output tag `out{index}`.
    pub fn output(index: usize) -> Self {
        Self(format!("{OUTPUT_TAG_PREFIX}{index}"))
    }

    /// Returns the tag of a single, unnumbered output.
    pub fn single_output() -> Self {
        Self(OUTPUT_TAG_PREFIX.to_owned())
    }

    /// Returns whether no tag has been assigned yet.
    #[inline]
    pub fn is_unset(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the tag as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Tag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Tag {
    fn from(tag: &str) -> Self {
        Self(tag.to_owned())
    }
}

/// Type-erased tagged reference to a collection node.
///
/// This is the shape in which inputs and outputs are handed to the
/// transform application machinery.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaggedValue {
    /// Tag of the reference.
    pub tag: Tag,
    /// Pipeline owning the collection.
    pub pipeline: PipelineId,
    /// Referenced collection.
    pub collection: CollectionId,
}

impl TaggedValue {
    /// Creates a new tagged reference.
    pub fn new(tag: impl Into<Tag>, pipeline: PipelineId, collection: CollectionId) -> Self {
        Self {
            tag: tag.into(),
            pipeline,
            collection,
        }
    }
}
