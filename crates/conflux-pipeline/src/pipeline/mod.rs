//! Pipeline container and graph construction.
//!
//! - [`Pipeline`]: cloneable handle to a graph under construction
//! - [`PipelineOptions`]: configuration, built with [`PipelineOptionsBuilder`]
//! - [`PipelineDefinition`]: serializable snapshot of the graph
//! - [`PipelineId`], [`CollectionId`], [`ApplicationId`]: node identifiers

mod config;
mod definition;
mod graph;
mod id;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub use config::{PipelineOptions, PipelineOptionsBuilder, PipelineOptionsBuilderError, UniqueNames};
pub use definition::{Edge, PipelineDefinition};
pub use graph::CollectionNode;
use graph::PipelineGraph;
pub use id::{ApplicationId, CollectionId, PipelineId};

use crate::error::{PipelineError, PipelineResult};
use crate::transform::{AppliedTransform, Transform};
use crate::value::{Collection, GraphInput, GraphOutput, GraphValue, PipelineBegin, Tag};

/// Tracing target for pipeline construction.
const TRACING_TARGET: &str = "conflux_pipeline::pipeline";

/// A pipeline graph under construction.
///
/// `Pipeline` is a cheap handle: clones share the same graph. Two handles
/// are equal iff they refer to the same pipeline.
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<PipelineInner>,
}

struct PipelineInner {
    id: PipelineId,
    options: PipelineOptions,
    graph: RwLock<PipelineGraph>,
}

impl Pipeline {
    /// Creates a new empty pipeline with default options.
    pub fn new() -> Self {
        Self::with_options(PipelineOptions::default())
    }

    /// Creates a new empty pipeline with the given options.
    pub fn with_options(options: PipelineOptions) -> Self {
        let id = PipelineId::new();

        tracing::info!(
            target: TRACING_TARGET,
            pipeline_id = %id,
            name = options.name.as_deref().unwrap_or_default(),
            unique_names = %options.unique_names,
            "Pipeline created"
        );

        Self {
            inner: Arc::new(PipelineInner {
                id,
                options,
                graph: RwLock::new(PipelineGraph::default()),
            }),
        }
    }

    /// Returns the pipeline id.
    #[inline]
    pub fn id(&self) -> PipelineId {
        self.inner.id
    }

    /// Returns the pipeline options.
    #[inline]
    pub fn options(&self) -> &PipelineOptions {
        &self.inner.options
    }

    /// Returns the root input for transforms that start the graph.
    pub fn begin(&self) -> PipelineBegin {
        PipelineBegin::new(self.clone())
    }

    /// Declares a new, not yet produced collection in this pipeline.
    ///
    /// Transforms call this from [`Transform::expand`] to create their outputs.
    pub fn new_collection<T>(&self) -> Collection<T> {
        let id = self.write().add_collection();
        Collection::new(self.clone(), id)
    }

    /// Returns the number of collections in the graph.
    pub fn collection_count(&self) -> usize {
        self.read().collection_count()
    }

    /// Returns the number of transform applications in the graph.
    pub fn application_count(&self) -> usize {
        self.read().application_count()
    }

    /// Returns all transform applications, in the order they were applied.
    pub fn applications(&self) -> Vec<AppliedTransform> {
        self.read().applications()
    }

    /// Returns the application with the given id.
    pub fn application(&self, id: ApplicationId) -> Option<AppliedTransform> {
        self.read().application(id).cloned()
    }

    /// Returns the graph node of a collection.
    pub fn collection_node(&self, id: CollectionId) -> Option<CollectionNode> {
        self.read().collection(id).cloned()
    }

    /// Returns the application that produced a collection.
    pub fn producer_of(&self, id: CollectionId) -> Option<AppliedTransform> {
        let graph = self.read();
        let producer = graph.collection(id)?.producer?;
        graph.application(producer).cloned()
    }

    /// Returns the applications consuming a collection, in application order.
    pub fn consumers_of(&self, id: CollectionId) -> Vec<ApplicationId> {
        self.read().consumers_of(id)
    }

    /// Returns transform applications in topological order.
    pub fn topological_order(&self) -> PipelineResult<Vec<ApplicationId>> {
        self.read().topological_order()
    }

    /// Returns a serializable snapshot of the graph.
    pub fn to_definition(&self) -> PipelineDefinition {
        self.read()
            .to_definition(self.id(), self.options().name.clone())
    }

    /// Like [`apply_transform_named`](Self::apply_transform_named) but uses
    /// the transform's own name.
    pub fn apply_transform<I, X>(input: &I, transform: &X) -> PipelineResult<X::Output>
    where
        I: GraphInput,
        X: Transform<I> + ?Sized,
    {
        let name = transform.name();
        input.pipeline().apply(&name, input, transform)
    }

    /// Applies `transform` to `input` in the input's pipeline.
    ///
    /// Registers the application, expands the transform, records the
    /// expanded output as produced by the application and finishes it.
    /// Transforms applied during the expansion become nested applications.
    /// The application is removed again if any of these steps fails,
    /// together with its nested applications and recorded outputs.
    pub fn apply_transform_named<I, X>(
        name: &str,
        input: &I,
        transform: &X,
    ) -> PipelineResult<X::Output>
    where
        I: GraphInput,
        X: Transform<I> + ?Sized,
    {
        input.pipeline().apply(name, input, transform)
    }

    fn apply<I, X>(&self, name: &str, input: &I, transform: &X) -> PipelineResult<X::Output>
    where
        I: GraphInput,
        X: Transform<I> + ?Sized,
    {
        let inputs = input.expand();
        if let Some(foreign) = inputs.iter().find(|value| value.pipeline != self.id()) {
            return Err(PipelineError::invalid_argument(format!(
                "input collection {} belongs to pipeline {}, not {}",
                foreign.collection,
                foreign.pipeline,
                self.id()
            )));
        }

        let options = self.options();
        let application = {
            let mut graph = self.write();
            if graph.application_count() >= options.max_applications {
                return Err(PipelineError::invalid_argument(format!(
                    "pipeline reached the limit of {} transform applications",
                    options.max_applications
                )));
            }
            graph.add_application(
                self.id(),
                name,
                &transform.name(),
                inputs,
                options.unique_names,
            )?
        };

        let expanded = {
            let _scope = ApplicationScope::enter(self, application.id());
            transform.expand(input)
        };

        let expanded = expanded.and_then(|output| {
            output.record_as_output(&application)?;
            output.finish_specifying_output(input, application.full_name())?;
            Ok(output)
        });

        let output = match expanded {
            Ok(output) => output,
            Err(error) => {
                self.write().remove_application(application.id());
                tracing::debug!(
                    target: TRACING_TARGET,
                    pipeline_id = %self.id(),
                    name = application.full_name(),
                    error = %error,
                    "Transform application failed"
                );
                return Err(error);
            }
        };

        tracing::debug!(
            target: TRACING_TARGET,
            pipeline_id = %self.id(),
            application_id = %application.id(),
            parent_id = application.parent().map(tracing::field::display),
            name = application.full_name(),
            transform = application.transform_name(),
            inputs = application.inputs().len(),
            outputs = output.expand().len(),
            "Transform applied"
        );

        Ok(output)
    }

    /// Records `application` as the producer of each collection under its tag.
    pub(crate) fn record_outputs(
        &self,
        application: &AppliedTransform,
        outputs: &[(CollectionId, Tag)],
    ) -> PipelineResult<()> {
        if application.pipeline_id() != self.id() {
            return Err(PipelineError::invalid_argument(format!(
                "application {} belongs to pipeline {}, not {}",
                application.id(),
                application.pipeline_id(),
                self.id()
            )));
        }
        self.write().record_outputs(application.id(), outputs)
    }

    fn read(&self) -> RwLockReadGuard<'_, PipelineGraph> {
        self.inner.graph.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, PipelineGraph> {
        self.inner.graph.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Keeps an application open for nested applications until dropped.
struct ApplicationScope<'a> {
    pipeline: &'a Pipeline,
    application: ApplicationId,
}

impl<'a> ApplicationScope<'a> {
    fn enter(pipeline: &'a Pipeline, application: ApplicationId) -> Self {
        pipeline.write().enter_scope(application);
        Self {
            pipeline,
            application,
        }
    }
}

impl Drop for ApplicationScope<'_> {
    fn drop(&mut self) {
        self.pipeline.write().leave_scope(self.application);
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("id", &self.inner.id)
            .field("name", &self.inner.options.name)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Pipeline {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Pipeline {}

impl Hash for Pipeline {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{Flatten, Partition, Source};
    use crate::value::TaggedValue;

    struct Failing;

    impl Transform<PipelineBegin> for Failing {
        type Output = Collection<u8>;

        fn expand(&self, _input: &PipelineBegin) -> PipelineResult<Self::Output> {
            Err(PipelineError::invalid_argument("expansion failed"))
        }
    }

    /// Returns its input as output.
    struct Passthrough;

    impl Transform<Collection<u8>> for Passthrough {
        type Output = Collection<u8>;

        fn expand(&self, input: &Collection<u8>) -> PipelineResult<Self::Output> {
            Ok(input.clone())
        }
    }

    /// Input whose expansion is supplied by the test.
    struct Mixed {
        pipeline: Pipeline,
        values: Vec<TaggedValue>,
    }

    impl GraphValue for Mixed {
        fn pipeline(&self) -> &Pipeline {
            &self.pipeline
        }

        fn expand(&self) -> Vec<TaggedValue> {
            self.values.clone()
        }
    }

    impl GraphInput for Mixed {}

    struct Merge;

    impl Transform<Mixed> for Merge {
        type Output = Collection<u8>;

        fn expand(&self, input: &Mixed) -> PipelineResult<Self::Output> {
            Ok(input.pipeline().new_collection())
        }
    }

    /// Output whose finishing step always fails.
    struct Unfinished(Collection<u8>);

    impl GraphValue for Unfinished {
        fn pipeline(&self) -> &Pipeline {
            self.0.pipeline()
        }

        fn expand(&self) -> Vec<TaggedValue> {
            self.0.expand()
        }
    }

    impl GraphOutput for Unfinished {
        fn record_as_output(&self, application: &AppliedTransform) -> PipelineResult<()> {
            self.0.record_as_output(application)
        }

        fn finish_specifying_output(
            &self,
            _input: &dyn GraphInput,
            transform_name: &str,
        ) -> PipelineResult<()> {
            Err(PipelineError::invalid_argument(format!(
                "{transform_name} cannot be finished"
            )))
        }
    }

    struct Declare;

    impl Transform<PipelineBegin> for Declare {
        type Output = Unfinished;

        fn expand(&self, input: &PipelineBegin) -> PipelineResult<Self::Output> {
            Ok(Unfinished(input.pipeline().new_collection()))
        }
    }

    /// Reads a source inside its own expansion.
    struct ReadNested;

    impl Transform<PipelineBegin> for ReadNested {
        type Output = Collection<u8>;

        fn expand(&self, input: &PipelineBegin) -> PipelineResult<Self::Output> {
            input.apply_named("Read", &Source::new())
        }
    }

    #[test]
    fn test_pipeline_identity() {
        let pipeline = Pipeline::new();
        let other = Pipeline::new();
        assert_eq!(pipeline, pipeline.clone());
        assert_ne!(pipeline, other);
        assert_eq!(pipeline.collection_count(), 0);
        assert_eq!(pipeline.application_count(), 0);
    }

    #[test]
    fn test_apply_source() {
        let pipeline = Pipeline::new();
        let words = pipeline.begin().apply(&Source::<String>::new()).unwrap();

        assert_eq!(pipeline.application_count(), 1);
        let node = pipeline.collection_node(words.id()).unwrap();
        assert_eq!(node.tag.as_str(), "out");

        let applications = pipeline.applications();
        assert_eq!(applications[0].full_name(), "Source");
        assert_eq!(node.producer, Some(applications[0].id()));
        assert!(applications[0].inputs().is_empty());
    }

    #[test]
    fn test_apply_named_uses_given_name() {
        let pipeline = Pipeline::new();
        let words = pipeline
            .begin()
            .apply_named("ReadWords", &Source::<String>::new())
            .unwrap();
        let producer = words.producer().unwrap();
        let application = pipeline.application(producer).unwrap();
        assert_eq!(application.full_name(), "ReadWords");
        assert_eq!(application.transform_name(), "Source");
    }

    #[test]
    fn test_duplicate_names_are_suffixed() {
        let pipeline = Pipeline::new();
        let source = Source::<u8>::new();
        pipeline.begin().apply_named("Read", &source).unwrap();
        pipeline.begin().apply_named("Read", &source).unwrap();
        pipeline.begin().apply_named("Read", &source).unwrap();

        let names: Vec<_> = pipeline
            .applications()
            .iter()
            .map(|application| application.full_name().to_owned())
            .collect();
        assert_eq!(names, ["Read", "Read2", "Read3"]);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let options = PipelineOptions::builder()
            .unique_names(UniqueNames::Error)
            .build()
            .unwrap();
        let pipeline = Pipeline::with_options(options);
        let source = Source::<u8>::new();
        pipeline.begin().apply_named("Read", &source).unwrap();

        let result = pipeline.begin().apply_named("Read", &source);
        assert!(matches!(result, Err(PipelineError::DuplicateName(name)) if name == "Read"));
        assert_eq!(pipeline.application_count(), 1);
    }

    #[test]
    fn test_application_limit() {
        let options = PipelineOptions::builder()
            .max_applications(1usize)
            .build()
            .unwrap();
        let pipeline = Pipeline::with_options(options);
        let source = Source::<u8>::new();
        pipeline.begin().apply(&source).unwrap();

        let result = pipeline.begin().apply(&source);
        assert!(matches!(result, Err(PipelineError::InvalidArgument(_))));
    }

    #[test]
    fn test_failed_expansion_removes_application() {
        let pipeline = Pipeline::new();
        let result = pipeline.begin().apply(&Failing);
        assert!(matches!(result, Err(PipelineError::InvalidArgument(_))));
        assert_eq!(pipeline.application_count(), 0);

        // The name is free again.
        pipeline.begin().apply_named("Failing", &Source::<u8>::new()).unwrap();
        assert_eq!(pipeline.applications()[0].full_name(), "Failing");
    }

    #[test]
    fn test_failed_finish_unproduces_outputs() {
        let pipeline = Pipeline::new();
        let result = pipeline.begin().apply(&Declare);
        assert!(matches!(result, Err(PipelineError::InvalidArgument(_))));
        assert_eq!(pipeline.application_count(), 0);

        let definition = pipeline.to_definition();
        assert_eq!(definition.collections.len(), 1);
        let orphan = &definition.collections[0];
        assert!(orphan.producer.is_none());
        assert!(orphan.tag.is_unset());
        assert!(pipeline.producer_of(orphan.id).is_none());
        assert!(definition.edges.is_empty());

        // The collection can be produced by a later application.
        let bytes = Collection::<u8>::new(pipeline.clone(), orphan.id);
        pipeline.begin().apply(&Source::<u8>::new()).unwrap();
        let application = pipeline.applications().remove(0);
        bytes.record_as_output(&application).unwrap();
        assert_eq!(bytes.producer(), Some(application.id()));
    }

    #[test]
    fn test_nested_application() {
        let pipeline = Pipeline::new();
        let bytes = pipeline.begin().apply(&ReadNested).unwrap();

        let applications = pipeline.applications();
        let names: Vec<_> = applications.iter().map(AppliedTransform::full_name).collect();
        assert_eq!(names, ["ReadNested", "ReadNested/Read"]);
        assert_eq!(applications[1].parent(), Some(applications[0].id()));

        let producer = pipeline.producer_of(bytes.id()).unwrap();
        assert_eq!(producer.id(), applications[1].id());
        assert_eq!(bytes.tag().as_str(), "out");

        // Applications after the composite are top-level again.
        pipeline.begin().apply_named("Read", &Source::<u8>::new()).unwrap();
        let last = pipeline.applications().remove(2);
        assert_eq!(last.full_name(), "Read");
        assert!(last.parent().is_none());
    }

    #[test]
    fn test_output_must_not_be_input() {
        let pipeline = Pipeline::new();
        let bytes = pipeline.begin().apply(&Source::<u8>::new()).unwrap();
        let result = bytes.apply(&Passthrough);
        assert!(matches!(result, Err(PipelineError::InvalidArgument(_))));
        assert_eq!(pipeline.application_count(), 1);
        assert_eq!(bytes.tag().as_str(), "out");
    }

    #[test]
    fn test_input_from_other_pipeline_rejected() {
        let pipeline = Pipeline::new();
        let other = Pipeline::new();
        let local = pipeline.new_collection::<u8>();
        let foreign = other.new_collection::<u8>();

        let mixed = Mixed {
            pipeline: pipeline.clone(),
            values: vec![local.expand().remove(0), foreign.expand().remove(0)],
        };
        let result = Pipeline::apply_transform(&mixed, &Merge);
        assert!(matches!(result, Err(PipelineError::InvalidArgument(_))));
        assert_eq!(pipeline.application_count(), 0);
        assert_eq!(pipeline.collection_count(), 1);
    }

    #[test]
    fn test_consumers_and_topological_order() {
        let pipeline = Pipeline::new();
        let numbers = pipeline.begin().apply(&Source::<u32>::new()).unwrap();
        let parts = numbers
            .apply(&Partition::new(2, |n: &u32, count| *n as usize % count).unwrap())
            .unwrap();
        let merged = parts.apply(&Flatten).unwrap();

        let applications = pipeline.applications();
        assert_eq!(applications.len(), 3);
        assert_eq!(pipeline.consumers_of(numbers.id()), [applications[1].id()]);
        assert_eq!(pipeline.consumers_of(merged.id()), Vec::<ApplicationId>::new());

        let order = pipeline.topological_order().unwrap();
        let ids: Vec<_> = applications.iter().map(AppliedTransform::id).collect();
        assert_eq!(order, ids);
    }

    #[test]
    fn test_record_foreign_application_rejected() {
        let pipeline = Pipeline::new();
        let other = Pipeline::new();
        other.begin().apply(&Source::<u8>::new()).unwrap();
        let foreign = other.applications().remove(0);

        let bytes = pipeline.new_collection::<u8>();
        let result = bytes.record_as_output(&foreign);
        assert!(matches!(result, Err(PipelineError::InvalidArgument(_))));
        assert!(bytes.producer().is_none());
    }

    #[test]
    fn test_definition_export() {
        let options = PipelineOptions::builder().name("words").build().unwrap();
        let pipeline = Pipeline::with_options(options);
        let words = pipeline.begin().apply(&Source::<String>::new()).unwrap();
        let parts = words
            .apply_named("Split", &Partition::new(2, |_: &String, _| 0).unwrap())
            .unwrap();
        parts.apply_named("Merge", &Flatten).unwrap();

        let definition = pipeline.to_definition();
        assert_eq!(definition.name.as_deref(), Some("words"));
        assert_eq!(definition.collections.len(), 4);
        assert_eq!(definition.applications.len(), 3);
        // source -> words, words -> split, split -> 2 parts, 2 parts -> merge, merge -> merged
        assert_eq!(definition.edges.len(), 7);

        let split = &definition.applications[1];
        let mut ports: Vec<_> = definition
            .outgoing(split.id().as_uuid())
            .filter_map(|edge| edge.from_port.clone())
            .map(String::from)
            .collect();
        ports.sort();
        assert_eq!(ports, ["out0", "out1"]);

        let merge = &definition.applications[2];
        let sources: Vec<_> = definition
            .incoming(merge.id().as_uuid())
            .map(|edge| edge.from)
            .collect();
        let parts: Vec<_> = parts.iter().map(|part| part.id().as_uuid()).collect();
        assert_eq!(sources.len(), 2);
        assert!(sources.iter().all(|source| parts.contains(source)));

        let json = definition.to_json().unwrap();
        let parsed = PipelineDefinition::from_json(&json).unwrap();
        assert_eq!(parsed, definition);
    }
}
