//! Serializable pipeline definition.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::graph::CollectionNode;
use super::id::PipelineId;
use crate::error::PipelineResult;
use crate::transform::AppliedTransform;
use crate::value::Tag;

/// A connection between a collection and a transform application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Source node (collection or application id).
    pub from: Uuid,
    /// Target node (collection or application id).
    pub to: Uuid,
    /// Output tag on the producing application.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_port: Option<Tag>,
    /// Input tag on the consuming application.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_port: Option<Tag>,
}

/// JSON-friendly snapshot of a pipeline graph.
///
/// Obtained through [`Pipeline::to_definition`](super::Pipeline::to_definition);
/// intended for display and debugging of the constructed graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    /// Identifier of the pipeline.
    pub id: PipelineId,
    /// Optional pipeline name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Collection nodes, ordered by id.
    pub collections: Vec<CollectionNode>,
    /// Transform applications, in application order.
    pub applications: Vec<AppliedTransform>,
    /// Edges between collections and applications.
    pub edges: Vec<Edge>,
}

impl PipelineDefinition {
    /// Serializes the definition as pretty-printed JSON.
    pub fn to_json(&self) -> PipelineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a definition from JSON.
    pub fn from_json(json: &str) -> PipelineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Returns the edges leaving the given node.
    pub fn outgoing(&self, node: Uuid) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |edge| edge.from == node)
    }

    /// Returns the edges entering the given node.
    pub fn incoming(&self, node: Uuid) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |edge| edge.to == node)
    }
}
