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

//! Multi-level neighborhood index used by Louvain and Leiden.
//!
//! The index is a CSR snapshot of the input graph (`starts`, `neighborhood`,
//! `weights`, with self-loops kept aside in `loops`) plus the mutable
//! community bookkeeping of the current level: `belongings`, `counts`, the
//! per-community incident weights and a stack of `unused` community ids.
//!
//! Nodes of a level are `0..node_count()`. Community ids live in the same
//! range: initially every node is its own community, a community emptied by
//! a move returns its id to `unused` and [`isolate`](UndirectedIndex::isolate)
//! takes ids back from there. `node_count() - unused().len()` is therefore
//! the number of live communities.
//!
//! `zoom_out` replaces every live community by a single node, rebuilding the
//! arrays for the coarser level and appending the renumbering to the
//! [`Dendrogram`].
//!
//! Delta computations follow Newman's modularity with a resolution
//! parameter, and Dugué & Perez for the directed case. The delta of moving a
//! node is taken between the node isolated and the node inside the target
//! community, which only differs from `Q_after - Q_before` by a term
//! constant across candidate communities.

mod directed;
mod undirected;

pub use directed::DirectedIndex;
pub use undirected::UndirectedIndex;

use std::hash::Hash;
use std::ops::Range;

use foldhash::{HashMap, HashMapExt};
use indexmap::IndexMap;

use super::dendrogram::Dendrogram;
use super::sparse::SparseMap;
use crate::error::{CommunityError, Result};
use crate::graph::{EdgeAttributes, GraphView, GraphViewMut};

/// Marker for a community id with no counterpart, e.g. dead ids in the
/// renumbering returned by `zoom_out`.
pub const UNASSIGNED: usize = usize::MAX;

// ========================
// Graph snapshot
// ========================

/// Nodes and weighted edges of the input graph, by node position.
pub(crate) struct Snapshot<K> {
    pub(crate) nodes: Vec<K>,
    pub(crate) edges: Vec<(usize, usize, f64)>,
}

impl<K: Copy + Eq + Hash> Snapshot<K> {
    /// Take a snapshot of `graph`.
    ///
    /// In weighted mode (`weight_attribute` given) a missing or NaN weight
    /// counts as 1, other non-positive or infinite weights are rejected.
    pub(crate) fn take<G>(graph: &G, weight_attribute: Option<&str>) -> Result<Self>
    where
        G: GraphView<NodeId = K>,
    {
        let nodes: Vec<K> = graph.node_ids().collect();
        let mut ids: HashMap<K, usize> = HashMap::with_capacity(nodes.len());
        for (i, &node) in nodes.iter().enumerate() {
            ids.insert(node, i);
        }

        let mut edges = Vec::with_capacity(graph.edge_count());
        for edge in graph.edge_entries() {
            let (Some(&source), Some(&target)) = (ids.get(&edge.source), ids.get(&edge.target))
            else {
                return Err(CommunityError::InvalidGraph(
                    "an edge references a node that is not part of the graph".to_owned(),
                ));
            };
            let weight = match weight_attribute {
                None => 1.0,
                Some(name) => read_weight(edge.attributes, name)?,
            };
            edges.push((source, target, weight));
        }

        Ok(Snapshot { nodes, edges })
    }
}

fn read_weight<E: EdgeAttributes + ?Sized>(attributes: &E, name: &str) -> Result<f64> {
    match attributes.weight(name) {
        None => Ok(1.0),
        Some(weight) if weight.is_nan() => Ok(1.0),
        Some(weight) if weight <= 0.0 || weight.is_infinite() => {
            Err(CommunityError::InvalidWeight { weight })
        }
        Some(weight) => Ok(weight),
    }
}

// ========================
// Shared index state
// ========================

/// State shared by the undirected and directed indices.
#[derive(Debug, Clone)]
pub struct IndexCore<K> {
    /// Original node keys, by position in the input graph.
    pub(crate) nodes: Vec<K>,
    pub(crate) resolution: f64,
    /// Total edge weight, each edge counted once.
    pub(crate) m: f64,
    pub(crate) level: usize,

    // Edge-level
    pub(crate) neighborhood: Vec<usize>,
    pub(crate) weights: Vec<f64>,

    // Node-level
    pub(crate) starts: Vec<usize>,
    pub(crate) loops: Vec<f64>,
    pub(crate) belongings: Vec<usize>,

    // Community-level
    pub(crate) counts: Vec<usize>,
    pub(crate) unused: Vec<usize>,

    pub(crate) dendrogram: Dendrogram,
}

impl<K: Copy + Eq + Hash> IndexCore<K> {
    fn singletons(nodes: Vec<K>, resolution: f64) -> Self {
        let order = nodes.len();
        IndexCore {
            nodes,
            resolution,
            m: 0.0,
            level: 0,
            neighborhood: Vec::new(),
            weights: Vec::new(),
            starts: vec![0; order + 1],
            loops: vec![0.0; order],
            belongings: (0..order).collect(),
            counts: vec![1; order],
            unused: Vec::with_capacity(order),
            dendrogram: Dendrogram::new(order),
        }
    }

    /// Number of nodes at the current level.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.belongings.len()
    }

    /// Number of live communities at the current level.
    #[inline]
    pub fn community_count(&self) -> usize {
        self.node_count() - self.unused.len()
    }

    /// Total edge weight `M`.
    #[inline]
    pub fn total_weight(&self) -> f64 {
        self.m
    }

    #[inline]
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Number of zoom-outs performed so far.
    #[inline]
    pub fn level(&self) -> usize {
        self.level
    }

    #[inline]
    pub fn nodes(&self) -> &[K] {
        &self.nodes
    }

    #[inline]
    pub fn belongings(&self) -> &[usize] {
        &self.belongings
    }

    #[inline]
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    #[inline]
    pub fn loops(&self) -> &[f64] {
        &self.loops
    }

    #[inline]
    pub fn unused(&self) -> &[usize] {
        &self.unused
    }

    #[inline]
    pub fn neighborhood(&self) -> &[usize] {
        &self.neighborhood
    }

    #[inline]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    #[inline]
    pub fn dendrogram(&self) -> &Dendrogram {
        &self.dendrogram
    }

    /// Range of `node`'s adjacency inside `neighborhood` and `weights`.
    #[inline]
    pub fn bounds(&self, node: usize) -> Range<usize> {
        self.starts[node]..self.starts[node + 1]
    }

    /// Neighbor positions of every node at the current level.
    pub fn project(&self) -> Vec<Vec<usize>> {
        (0..self.node_count())
            .map(|i| self.neighborhood[self.bounds(i)].to_vec())
            .collect()
    }

    /// Sum of the weights of `node`'s adjacency, self-loops excluded.
    pub fn compute_node_degree(&self, node: usize) -> f64 {
        self.weights[self.bounds(node)].iter().sum()
    }

    /// Original node key → community id at `level` (defaults to the current
    /// level).
    pub fn collect(&self, level: Option<usize>) -> IndexMap<K, usize> {
        let mapping = self.dendrogram.project(level.unwrap_or(self.level));
        self.nodes.iter().copied().zip(mapping).collect()
    }

    /// Write the community id at `level` of every node onto `graph` under
    /// the node attribute `name`.
    pub fn assign<G>(&self, graph: &mut G, name: &str, level: Option<usize>)
    where
        G: GraphViewMut<NodeId = K>,
    {
        let mapping = self.dendrogram.project(level.unwrap_or(self.level));
        for (&node, community) in self.nodes.iter().zip(mapping) {
            graph.set_node_attribute(node, name, community);
        }
    }

    /// Common bookkeeping of a move: counts, belongings and id reclaim.
    #[inline]
    fn relocate(&mut self, node: usize, current: usize, target: usize) {
        self.belongings[node] = target;
        self.counts[current] -= 1;
        self.counts[target] += 1;
        if self.counts[current] == 0 {
            self.unused.push(current);
        }
    }

    /// Renumber live communities by first appearance, record the renumbering
    /// in the dendrogram and return it together with the number of live
    /// communities. Afterwards `belongings[i]` is the new id of node `i`.
    fn renumber(&mut self) -> (Vec<usize>, usize) {
        let mut new_labels = vec![UNASSIGNED; self.node_count()];
        let mut live = 0;
        for belonging in self.belongings.iter_mut() {
            if new_labels[*belonging] == UNASSIGNED {
                new_labels[*belonging] = live;
                live += 1;
            }
            *belonging = new_labels[*belonging];
        }
        self.dendrogram.push(self.belongings.clone());
        (new_labels, live)
    }

    /// Positions of nodes grouped by their (renumbered) community.
    fn members_by_community(&self, communities: usize) -> (Vec<usize>, Vec<usize>) {
        let mut bounds = vec![0; communities + 1];
        for &c in &self.belongings {
            bounds[c + 1] += 1;
        }
        for c in 0..communities {
            bounds[c + 1] += bounds[c];
        }
        let mut cursor = bounds.clone();
        let mut members = vec![0; self.node_count()];
        for (i, &c) in self.belongings.iter().enumerate() {
            members[cursor[c]] = i;
            cursor[c] += 1;
        }
        (members, bounds)
    }
}

/// Drain `map` into `(key, value)` pairs sorted by key.
fn sorted_entries(map: &SparseMap<f64>) -> Vec<(usize, f64)> {
    let mut entries: Vec<(usize, f64)> = (0..map.len()).map(|i| map.entry_at(i)).collect();
    entries.sort_unstable_by_key(|&(key, _)| key);
    entries
}

// ========================
// Local move seam
// ========================

/// Operations the local moving phase needs from an index, independent of
/// whether the graph is directed.
pub(crate) trait LouvainIndex {
    /// Incident weight of a node: a scalar, or `(in, out)` when directed.
    type Degree: Copy;

    fn node_count(&self) -> usize;

    fn belonging(&self, node: usize) -> usize;

    fn neighbors(&self, node: usize) -> &[usize];

    /// Accumulate the weight from `node` toward each neighboring community
    /// into `communities` and return the node's degree.
    fn accumulate_neighbor_communities(
        &self,
        node: usize,
        communities: &mut SparseMap<f64>,
    ) -> Self::Degree;

    /// Delta used to rank the node's current community.
    fn local_delta_with_own_community(
        &self,
        node: usize,
        degree: Self::Degree,
        community_degree: f64,
        community: usize,
    ) -> f64;

    /// Delta used to rank another candidate community.
    fn local_delta(
        &self,
        node: usize,
        degree: Self::Degree,
        community_degree: f64,
        community: usize,
    ) -> f64;

    fn move_node(&mut self, node: usize, degree: Self::Degree, target: usize);

    fn isolate(&mut self, node: usize, degree: Self::Degree) -> usize;

    /// Coarsen the graph, see [`UndirectedIndex::zoom_out`].
    fn zoom_out(&mut self) -> Vec<usize>;
}
