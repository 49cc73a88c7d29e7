//! Splitting a collection into a list of collections.

use std::fmt;
use std::sync::Arc;

use super::Transform;
use crate::error::{PipelineError, PipelineResult};
use crate::value::{Collection, CollectionList};

/// Function choosing the partition of an element, given the partition count.
type PartitionFn<T> = Arc<dyn Fn(&T, usize) -> usize + Send + Sync>;

/// Splits a collection into a fixed number of collections.
///
/// The partition function is not called during graph construction; it is
/// carried for the runner that executes the graph, which evaluates it
/// through [`Partition::partition_for`].
pub struct Partition<T> {
    num_partitions: usize,
    partition_fn: PartitionFn<T>,
}

impl<T> Partition<T> {
    /// Creates a partition transform with `num_partitions` outputs.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidArgument`] if `num_partitions` is zero.
    pub fn new<F>(num_partitions: usize, partition_fn: F) -> PipelineResult<Self>
    where
        F: Fn(&T, usize) -> usize + Send + Sync + 'static,
    {
        if num_partitions == 0 {
            return Err(PipelineError::invalid_argument(
                "number of partitions must be at least 1",
            ));
        }

        Ok(Self {
            num_partitions,
            partition_fn: Arc::new(partition_fn),
        })
    }

    /// Returns the number of output collections.
    #[inline]
    pub fn num_partitions(&self) -> usize {
        self.num_partitions
    }

    /// Returns the partition index of `element`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidArgument`] if the partition function
    /// returns an index outside `0..num_partitions`.
    pub fn partition_for(&self, element: &T) -> PipelineResult<usize> {
        let index = (self.partition_fn)(element, self.num_partitions);
        if index >= self.num_partitions {
            return Err(PipelineError::invalid_argument(format!(
                "partition function returned {index}, expected a value below {}",
                self.num_partitions
            )));
        }
        Ok(index)
    }
}

impl<T> Clone for Partition<T> {
    fn clone(&self) -> Self {
        Self {
            num_partitions: self.num_partitions,
            partition_fn: Arc::clone(&self.partition_fn),
        }
    }
}

impl<T> fmt::Debug for Partition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Partition")
            .field("num_partitions", &self.num_partitions)
            .finish_non_exhaustive()
    }
}

impl<T> Transform<Collection<T>> for Partition<T> {
    type Output = CollectionList<T>;

    fn expand(&self, input: &Collection<T>) -> PipelineResult<Self::Output> {
        let pipeline = input.pipeline();
        let outputs: Vec<Collection<T>> = (0..self.num_partitions)
            .map(|_| pipeline.new_collection())
            .collect();
        CollectionList::of_all(&outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Pipeline;
    use crate::transform::Source;
    use crate::value::Tag;

    #[test]
    fn test_zero_partitions_rejected() {
        let result = Partition::new(0, |_: &u32, _| 0);
        assert!(matches!(result, Err(PipelineError::InvalidArgument(_))));
    }

    #[test]
    fn test_partition_for() {
        let partition = Partition::new(4, |n: &u32, count| *n as usize % count).unwrap();
        assert_eq!(partition.partition_for(&7).unwrap(), 3);
        assert_eq!(partition.partition_for(&8).unwrap(), 0);

        let broken = Partition::new(2, |_: &u32, count| count).unwrap();
        assert!(broken.partition_for(&1).is_err());
    }

    #[test]
    fn test_partition_outputs() {
        let pipeline = Pipeline::new();
        let numbers = pipeline.begin().apply(&Source::<u32>::new()).unwrap();
        let parts = numbers
            .apply_named("ByParity", &Partition::new(2, |n: &u32, _| (*n % 2) as usize).unwrap())
            .unwrap();

        assert_eq!(parts.len(), 2);
        let application = pipeline.application(parts.get(0).unwrap().producer().unwrap()).unwrap();
        assert_eq!(application.full_name(), "ByParity");
        assert_eq!(application.transform_name(), "Partition");
        assert_eq!(application.inputs()[0].collection, numbers.id());
        assert_eq!(parts.get(1).unwrap().tag(), Tag::output(1));
    }
}
