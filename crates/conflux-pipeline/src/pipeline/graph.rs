//! Pipeline graph bookkeeping.

use std::collections::{HashMap, HashSet};
use std::thread::{self, ThreadId};

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use serde::{Deserialize, Serialize};

use super::config::UniqueNames;
use super::definition::{Edge, PipelineDefinition};
use super::id::{ApplicationId, CollectionId, PipelineId};
use crate::error::{PipelineError, PipelineResult};
use crate::transform::AppliedTransform;
use crate::value::{Tag, TaggedValue};

/// Collection node stored in the pipeline graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionNode {
    /// Identifier of the collection.
    pub id: CollectionId,
    /// Tag assigned when the collection was recorded as an output.
    #[serde(default, skip_serializing_if = "Tag::is_unset")]
    pub tag: Tag,
    /// Application that produced the collection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub producer: Option<ApplicationId>,
}

/// Node weight of the pipeline graph.
#[derive(Debug, Clone)]
pub(crate) enum NodeData {
    Collection(CollectionNode),
    Application(AppliedTransform),
}

/// Edge weight of the pipeline graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub(crate) struct EdgeData {
    /// Tag of the output on the producing application.
    pub from_port: Option<Tag>,
    /// Tag of the input on the consuming application.
    pub to_port: Option<Tag>,
}

/// Mutable graph state behind a pipeline handle.
///
/// Collections and applications are both nodes; edges run from a consumed
/// collection to its application and from an application to each
/// collection it produced.
#[derive(Debug, Default)]
pub(crate) struct PipelineGraph {
    graph: StableDiGraph<NodeData, EdgeData>,
    collections: HashMap<CollectionId, NodeIndex>,
    applications: HashMap<ApplicationId, NodeIndex>,
    /// Application ids in the order they were applied.
    order: Vec<ApplicationId>,
    names: HashSet<String>,
    /// Applications currently expanding, innermost last, per constructing thread.
    scopes: HashMap<ThreadId, Vec<ApplicationId>>,
}

impl PipelineGraph {
    pub fn collection_count(&self) -> usize {
        self.collections.len()
    }

    pub fn application_count(&self) -> usize {
        self.applications.len()
    }

    pub fn add_collection(&mut self) -> CollectionId {
        let id = CollectionId::new();
        let index = self.graph.add_node(NodeData::Collection(CollectionNode {
            id,
            tag: Tag::unset(),
            producer: None,
        }));
        self.collections.insert(id, index);
        id
    }

    pub fn collection(&self, id: CollectionId) -> Option<&CollectionNode> {
        let index = self.collections.get(&id)?;
        match self.graph.node_weight(*index)? {
            NodeData::Collection(node) => Some(node),
            NodeData::Application(_) => None,
        }
    }

    fn collection_mut(&mut self, id: CollectionId) -> Option<&mut CollectionNode> {
        let index = self.collections.get(&id)?;
        match self.graph.node_weight_mut(*index)? {
            NodeData::Collection(node) => Some(node),
            NodeData::Application(_) => None,
        }
    }

    pub fn application(&self, id: ApplicationId) -> Option<&AppliedTransform> {
        let index = self.applications.get(&id)?;
        match self.graph.node_weight(*index)? {
            NodeData::Application(application) => Some(application),
            NodeData::Collection(_) => None,
        }
    }

    /// Returns the application currently expanding on this thread.
    fn current_scope(&self) -> Option<ApplicationId> {
        self.scopes
            .get(&thread::current().id())
            .and_then(|stack| stack.last())
            .copied()
    }

    /// Marks `application` as expanding on this thread.
    pub fn enter_scope(&mut self, application: ApplicationId) {
        self.scopes
            .entry(thread::current().id())
            .or_default()
            .push(application);
    }

    /// Ends the expansion of `application` and of anything nested in it.
    pub fn leave_scope(&mut self, application: ApplicationId) {
        let thread = thread::current().id();
        let Some(stack) = self.scopes.get_mut(&thread) else {
            return;
        };
        if let Some(position) = stack.iter().rposition(|id| *id == application) {
            stack.truncate(position);
        }
        if stack.is_empty() {
            self.scopes.remove(&thread);
        }
    }

    /// Returns whether `application` was applied during the expansion of `ancestor`.
    pub fn is_nested_in(&self, application: ApplicationId, ancestor: ApplicationId) -> bool {
        let mut current = self.application(application).and_then(AppliedTransform::parent);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.application(parent).and_then(AppliedTransform::parent);
        }
        false
    }

    /// Resolves a unique application name according to `policy`.
    fn unique_name(&self, name: &str, policy: UniqueNames) -> PipelineResult<String> {
        if !self.names.contains(name) {
            return Ok(name.to_owned());
        }

        if policy == UniqueNames::Error {
            return Err(PipelineError::DuplicateName(name.to_owned()));
        }

        let unique = (2..)
            .map(|suffix| format!("{name}{suffix}"))
            .find(|candidate| !self.names.contains(candidate))
            .unwrap_or_else(|| name.to_owned());

        if policy == UniqueNames::Warn {
            tracing::warn!(
                target: crate::TRACING_TARGET,
                name,
                unique_name = %unique,
                "Transform name is not unique, renamed application"
            );
        }

        Ok(unique)
    }

    /// Registers a new application consuming `inputs`.
    ///
    /// An application registered while another one is expanding on the same
    /// thread becomes its child. Nothing is inserted unless every input
    /// collection is known.
    pub fn add_application(
        &mut self,
        pipeline: PipelineId,
        name: &str,
        transform_name: &str,
        inputs: Vec<TaggedValue>,
        policy: UniqueNames,
    ) -> PipelineResult<AppliedTransform> {
        let input_indices = inputs
            .iter()
            .map(|input| {
                self.collections
                    .get(&input.collection)
                    .copied()
                    .ok_or(PipelineError::UnknownCollection(input.collection))
            })
            .collect::<PipelineResult<Vec<_>>>()?;

        let parent = self.current_scope();
        let name = match parent.and_then(|parent| self.application(parent)) {
            Some(parent) => format!("{}/{name}", parent.full_name()),
            None => name.to_owned(),
        };

        let full_name = self.unique_name(&name, policy)?;
        let application =
            AppliedTransform::new(pipeline, parent, full_name, transform_name, inputs);
        let index = self
            .graph
            .add_node(NodeData::Application(application.clone()));

        for (input, input_index) in application.inputs().iter().zip(input_indices) {
            let to_port = (!input.tag.is_unset()).then(|| input.tag.clone());
            self.graph.add_edge(
                input_index,
                index,
                EdgeData {
                    from_port: None,
                    to_port,
                },
            );
        }

        self.names.insert(application.full_name().to_owned());
        self.applications.insert(application.id(), index);
        self.order.push(application.id());
        Ok(application)
    }

    /// Removes an application whose expansion failed.
    ///
    /// Applications nested in it are removed as well, and every collection
    /// they recorded as output is unproduced again.
    pub fn remove_application(&mut self, id: ApplicationId) -> Option<AppliedTransform> {
        let nested: Vec<ApplicationId> = self
            .order
            .iter()
            .copied()
            .filter(|other| self.is_nested_in(*other, id))
            .collect();
        for child in nested.into_iter().rev() {
            self.detach_application(child);
        }
        self.detach_application(id)
    }

    fn detach_application(&mut self, id: ApplicationId) -> Option<AppliedTransform> {
        let index = self.applications.remove(&id)?;
        self.order.retain(|other| *other != id);

        let produced: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(index, Direction::Outgoing)
            .collect();
        for collection in produced {
            if let Some(NodeData::Collection(node)) = self.graph.node_weight_mut(collection) {
                if node.producer == Some(id) {
                    node.producer = None;
                    node.tag = Tag::unset();
                }
            }
        }

        match self.graph.remove_node(index)? {
            NodeData::Application(application) => {
                self.names.remove(application.full_name());
                Some(application)
            }
            NodeData::Collection(_) => None,
        }
    }

    /// Records `application` as the producer of each collection under its tag.
    ///
    /// All outputs are validated before any of them is updated. Recording a
    /// collection again with the same application and tag is a no-op, and so
    /// is recording a collection that an application nested in `application`
    /// already produced: the inner producer and tag are kept.
    pub fn record_outputs(
        &mut self,
        application: ApplicationId,
        outputs: &[(CollectionId, Tag)],
    ) -> PipelineResult<()> {
        let application_index = self.applications.get(&application).copied().ok_or_else(|| {
            PipelineError::invalid_argument(format!(
                "application {application} is not part of this pipeline"
            ))
        })?;

        let inputs: HashSet<CollectionId> = self
            .application(application)
            .map(|applied| applied.inputs().iter().map(|input| input.collection).collect())
            .unwrap_or_default();

        let mut pending: HashMap<CollectionId, &Tag> = HashMap::with_capacity(outputs.len());
        for (id, tag) in outputs {
            if inputs.contains(id) {
                return Err(PipelineError::invalid_argument(format!(
                    "collection {id} is both an input and an output of application {application}"
                )));
            }

            let node = self
                .collection(*id)
                .ok_or(PipelineError::UnknownCollection(*id))?;

            if let Some(producer) = node.producer {
                let recorded = producer == application && node.tag == *tag;
                if recorded || self.is_nested_in(producer, application) {
                    continue;
                }
                return Err(PipelineError::AlreadyProduced {
                    collection: *id,
                    producer,
                });
            }

            if pending.insert(*id, tag).is_some_and(|previous| previous != tag) {
                return Err(PipelineError::AlreadyProduced {
                    collection: *id,
                    producer: application,
                });
            }
        }

        for (id, tag) in outputs {
            let Some(index) = self.collections.get(id).copied() else {
                continue;
            };
            let Some(node) = self.collection_mut(*id) else {
                continue;
            };
            if node.producer.is_some() {
                continue;
            }

            node.producer = Some(application);
            node.tag = tag.clone();
            self.graph.add_edge(
                application_index,
                index,
                EdgeData {
                    from_port: Some(tag.clone()),
                    to_port: None,
                },
            );
        }

        Ok(())
    }

    /// Returns the applications that consume a collection, in application order.
    pub fn consumers_of(&self, id: CollectionId) -> Vec<ApplicationId> {
        let Some(index) = self.collections.get(&id).copied() else {
            return Vec::new();
        };

        let consumers: HashSet<ApplicationId> = self
            .graph
            .neighbors_directed(index, Direction::Outgoing)
            .filter_map(|neighbor| match self.graph.node_weight(neighbor)? {
                NodeData::Application(application) => Some(application.id()),
                NodeData::Collection(_) => None,
            })
            .collect();

        self.order
            .iter()
            .copied()
            .filter(|application| consumers.contains(application))
            .collect()
    }

    /// Returns all applications in the order they were applied.
    pub fn applications(&self) -> Vec<AppliedTransform> {
        self.order
            .iter()
            .filter_map(|id| self.application(*id).cloned())
            .collect()
    }

    /// Returns application ids in topological order.
    pub fn topological_order(&self) -> PipelineResult<Vec<ApplicationId>> {
        toposort(&self.graph, None)
            .map(|indices| {
                indices
                    .into_iter()
                    .filter_map(|index| match self.graph.node_weight(index)? {
                        NodeData::Application(application) => Some(application.id()),
                        NodeData::Collection(_) => None,
                    })
                    .collect()
            })
            .map_err(|_| PipelineError::InvalidDefinition("cycle detected in pipeline graph".into()))
    }

    /// Converts the graph into a serializable definition.
    pub fn to_definition(&self, id: PipelineId, name: Option<String>) -> PipelineDefinition {
        let mut collections: Vec<CollectionNode> = self
            .graph
            .node_indices()
            .filter_map(|index| match self.graph.node_weight(index)? {
                NodeData::Collection(node) => Some(node.clone()),
                NodeData::Application(_) => None,
            })
            .collect();
        collections.sort_by_key(|node| node.id);

        let edges = self
            .graph
            .edge_indices()
            .filter_map(|edge| {
                let (source, target) = self.graph.edge_endpoints(edge)?;
                let from = self.node_uuid(source)?;
                let to = self.node_uuid(target)?;
                let data = self.graph.edge_weight(edge)?;
                Some(Edge {
                    from,
                    to,
                    from_port: data.from_port.clone(),
                    to_port: data.to_port.clone(),
                })
            })
            .collect();

        PipelineDefinition {
            id,
            name,
            collections,
            applications: self.applications(),
            edges,
        }
    }

    fn node_uuid(&self, index: NodeIndex) -> Option<uuid::Uuid> {
        match self.graph.node_weight(index)? {
            NodeData::Collection(node) => Some(node.id.as_uuid()),
            NodeData::Application(application) => Some(application.id().as_uuid()),
        }
    }
}
