//! Root collection declaration.

use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;

use super::Transform;
use crate::error::PipelineResult;
use crate::value::{Collection, GraphValue, PipelineBegin};

/// Declares a root collection of `T` elements.
///
/// Applied to [`PipelineBegin`]; the produced collection has no inputs.
pub struct Source<T> {
    label: Option<String>,
    _element: PhantomData<fn() -> T>,
}

impl<T> Source<T> {
    /// Creates an unlabeled source.
    pub fn new() -> Self {
        Self {
            label: None,
            _element: PhantomData,
        }
    }

    /// Creates a source whose default application name is `label`.
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            _element: PhantomData,
        }
    }
}

impl<T> Default for Source<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Source<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source").field("label", &self.label).finish()
    }
}

impl<T> Transform<PipelineBegin> for Source<T> {
    type Output = Collection<T>;

    fn name(&self) -> Cow<'static, str> {
        match &self.label {
            Some(label) => Cow::Owned(label.clone()),
            None => Cow::Borrowed("Source"),
        }
    }

    fn expand(&self, input: &PipelineBegin) -> PipelineResult<Self::Output> {
        Ok(input.pipeline().new_collection())
    }
}
