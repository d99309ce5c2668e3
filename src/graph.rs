// Licensed under the Apache License, Version 2.0 (the "License"); you may
// not use this file except in compliance with the License. You may obtain
// a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied. See the
// License for the specific language governing permissions and limitations
// under the License.

//! The graph collaborator consumed by community detection.
//!
//! Community detection never stores or edits graphs itself. It takes a
//! frozen snapshot through [`GraphView`] when a run starts and, for the
//! `assign` entry points, writes labels back through [`GraphViewMut`].
//! Implementations are provided for petgraph's `Graph` and `StableGraph`.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::hash::Hash;

use petgraph::graph::{Graph, IndexType, NodeIndex};
use petgraph::stable_graph::StableGraph;
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::EdgeType;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of a graph, as far as community detection is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphKind {
    Undirected,
    Directed,
    /// Both directed and undirected edges are present.
    Mixed,
}

/// One edge as seen by the community detection engine.
#[derive(Debug)]
pub struct EdgeEntry<'a, N, E: ?Sized> {
    pub source: N,
    pub target: N,
    pub undirected: bool,
    pub attributes: &'a E,
}

/// Read access to a named numeric edge attribute.
pub trait EdgeAttributes {
    /// Returns the value stored under `name`, if any.
    fn weight(&self, name: &str) -> Option<f64>;
}

/// Write access to a named node attribute, used to store community labels.
pub trait NodeAttributesMut {
    fn set_community(&mut self, name: &str, community: usize);
}

/// Read-only capabilities required from an input graph.
pub trait GraphView {
    type NodeId: Copy + Eq + Hash + Debug;
    type EdgeData: EdgeAttributes + ?Sized;

    fn node_count(&self) -> usize;

    fn edge_count(&self) -> usize;

    fn contains_node(&self, node: Self::NodeId) -> bool;

    /// Nodes in a stable order. The position of a node in this sequence is
    /// its index inside the neighborhood index.
    fn node_ids(&self) -> impl Iterator<Item = Self::NodeId> + '_;

    /// Edges in a stable order.
    fn edge_entries(
        &self,
    ) -> impl Iterator<Item = EdgeEntry<'_, Self::NodeId, Self::EdgeData>> + '_;

    /// Declared kind of the graph. Defaults to inspecting the edges.
    fn kind(&self) -> GraphKind {
        infer_kind(self)
    }
}

/// Write capabilities needed by the `assign` entry points.
pub trait GraphViewMut: GraphView {
    fn set_node_attribute(&mut self, node: Self::NodeId, name: &str, community: usize);
}

/// Infer the kind of a graph from its edges.
///
/// A graph with no edges is considered undirected.
pub fn infer_kind<G: GraphView + ?Sized>(graph: &G) -> GraphKind {
    let mut directed = false;
    let mut undirected = false;

    for edge in graph.edge_entries() {
        if edge.undirected {
            undirected = true;
        } else {
            directed = true;
        }

        if directed && undirected {
            return GraphKind::Mixed;
        }
    }

    if directed {
        GraphKind::Directed
    } else {
        GraphKind::Undirected
    }
}

// ============================================================================
// Attribute implementations
// ============================================================================

macro_rules! numeric_edge_attributes {
    ($($t:ty),*) => {
        $(
            impl EdgeAttributes for $t {
                #[inline]
                fn weight(&self, _name: &str) -> Option<f64> {
                    Some(*self as f64)
                }
            }
        )*
    };
}

numeric_edge_attributes!(f64, f32, u32, u64, i32, i64, usize);

impl EdgeAttributes for () {
    #[inline]
    fn weight(&self, _name: &str) -> Option<f64> {
        None
    }
}

impl EdgeAttributes for Map<String, Value> {
    fn weight(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }
}

impl EdgeAttributes for Value {
    fn weight(&self, name: &str) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            other => other.get(name).and_then(Value::as_f64),
        }
    }
}

impl EdgeAttributes for BTreeMap<String, f64> {
    fn weight(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

impl NodeAttributesMut for Map<String, Value> {
    fn set_community(&mut self, name: &str, community: usize) {
        self.insert(name.to_owned(), Value::from(community));
    }
}

impl NodeAttributesMut for Value {
    /// Non-object payloads are replaced by an object holding the label.
    fn set_community(&mut self, name: &str, community: usize) {
        if !self.is_object() {
            *self = Value::Object(Map::new());
        }
        if let Value::Object(map) = self {
            map.set_community(name, community);
        }
    }
}

impl NodeAttributesMut for BTreeMap<String, usize> {
    fn set_community(&mut self, name: &str, community: usize) {
        self.insert(name.to_owned(), community);
    }
}

// ============================================================================
// petgraph implementations
// ============================================================================

impl<N, E, Ty, Ix> GraphView for Graph<N, E, Ty, Ix>
where
    E: EdgeAttributes,
    Ty: EdgeType,
    Ix: IndexType,
{
    type NodeId = NodeIndex<Ix>;
    type EdgeData = E;

    fn node_count(&self) -> usize {
        Graph::node_count(self)
    }

    fn edge_count(&self) -> usize {
        Graph::edge_count(self)
    }

    fn contains_node(&self, node: Self::NodeId) -> bool {
        self.node_weight(node).is_some()
    }

    fn node_ids(&self) -> impl Iterator<Item = Self::NodeId> + '_ {
        self.node_indices()
    }

    fn edge_entries(&self) -> impl Iterator<Item = EdgeEntry<'_, Self::NodeId, E>> + '_ {
        let undirected = !Ty::is_directed();
        self.edge_references().map(move |edge| EdgeEntry {
            source: edge.source(),
            target: edge.target(),
            undirected,
            attributes: edge.weight(),
        })
    }

    fn kind(&self) -> GraphKind {
        if Ty::is_directed() {
            GraphKind::Directed
        } else {
            GraphKind::Undirected
        }
    }
}

impl<N, E, Ty, Ix> GraphViewMut for Graph<N, E, Ty, Ix>
where
    N: NodeAttributesMut,
    E: EdgeAttributes,
    Ty: EdgeType,
    Ix: IndexType,
{
    fn set_node_attribute(&mut self, node: Self::NodeId, name: &str, community: usize) {
        if let Some(data) = self.node_weight_mut(node) {
            data.set_community(name, community);
        }
    }
}

impl<N, E, Ty, Ix> GraphView for StableGraph<N, E, Ty, Ix>
where
    E: EdgeAttributes,
    Ty: EdgeType,
    Ix: IndexType,
{
    type NodeId = NodeIndex<Ix>;
    type EdgeData = E;

    fn node_count(&self) -> usize {
        StableGraph::node_count(self)
    }

    fn edge_count(&self) -> usize {
        StableGraph::edge_count(self)
    }

    fn contains_node(&self, node: Self::NodeId) -> bool {
        StableGraph::contains_node(self, node)
    }

    fn node_ids(&self) -> impl Iterator<Item = Self::NodeId> + '_ {
        self.node_indices()
    }

    fn edge_entries(&self) -> impl Iterator<Item = EdgeEntry<'_, Self::NodeId, E>> + '_ {
        let undirected = !Ty::is_directed();
        self.edge_references().map(move |edge| EdgeEntry {
            source: edge.source(),
            target: edge.target(),
            undirected,
            attributes: edge.weight(),
        })
    }

    fn kind(&self) -> GraphKind {
        if Ty::is_directed() {
            GraphKind::Directed
        } else {
            GraphKind::Undirected
        }
    }
}

impl<N, E, Ty, Ix> GraphViewMut for StableGraph<N, E, Ty, Ix>
where
    N: NodeAttributesMut,
    E: EdgeAttributes,
    Ty: EdgeType,
    Ix: IndexType,
{
    fn set_node_attribute(&mut self, node: Self::NodeId, name: &str, community: usize) {
        if let Some(data) = self.node_weight_mut(node) {
            data.set_community(name, community);
        }
    }
}
