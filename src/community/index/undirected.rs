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

use std::hash::Hash;
use std::ops::Deref;

use super::{sorted_entries, IndexCore, LouvainIndex, Snapshot, UNASSIGNED};
use crate::community::sparse::SparseMap;
use crate::error::Result;
use crate::graph::GraphView;

/// Neighborhood index of an undirected graph.
///
/// A self-loop of weight `w` adds `2w` to its node's `loops` and to its
/// community's total weight, matching the adjacency-matrix convention where
/// the diagonal entry of a loop is doubled.
#[derive(Debug, Clone)]
pub struct UndirectedIndex<K> {
    core: IndexCore<K>,
    total_weights: Vec<f64>,
}

impl<K> Deref for UndirectedIndex<K> {
    type Target = IndexCore<K>;

    fn deref(&self) -> &IndexCore<K> {
        &self.core
    }
}

impl<K: Copy + Eq + Hash> UndirectedIndex<K> {
    /// Index `graph`, every node starting in its own community.
    ///
    /// Edge weights are read from `weight_attribute` when given, otherwise
    /// every edge weighs 1.
    pub fn new<G>(graph: &G, resolution: f64, weight_attribute: Option<&str>) -> Result<Self>
    where
        G: GraphView<NodeId = K>,
    {
        let snapshot = Snapshot::take(graph, weight_attribute)?;
        Ok(Self::from_snapshot(snapshot, resolution))
    }

    pub(crate) fn from_snapshot(snapshot: Snapshot<K>, resolution: f64) -> Self {
        let Snapshot { nodes, edges } = snapshot;
        let order = nodes.len();
        let mut core = IndexCore::singletons(nodes, resolution);
        let mut total_weights = vec![0.0; order];

        for &(source, target, _) in &edges {
            if source != target {
                core.starts[source + 1] += 1;
                core.starts[target + 1] += 1;
            }
        }
        for i in 0..order {
            core.starts[i + 1] += core.starts[i];
        }

        let size = core.starts[order];
        core.neighborhood = vec![0; size];
        core.weights = vec![0.0; size];
        let mut cursor = core.starts.clone();

        // Single sweep over the edges
        for (source, target, weight) in edges {
            core.m += weight;

            if source == target {
                total_weights[source] += weight * 2.0;
                core.loops[source] += weight * 2.0;
                continue;
            }

            total_weights[source] += weight;
            total_weights[target] += weight;

            core.neighborhood[cursor[source]] = target;
            core.weights[cursor[source]] = weight;
            cursor[source] += 1;

            core.neighborhood[cursor[target]] = source;
            core.weights[cursor[target]] = weight;
            cursor[target] += 1;
        }

        UndirectedIndex {
            core,
            total_weights,
        }
    }

    /// Incident weight of every community, self-loops included.
    #[inline]
    pub fn total_weights(&self) -> &[f64] {
        &self.total_weights
    }

    /// Move `node` to `target`. `degree` is the node's incident weight
    /// without self-loops.
    pub fn move_node(&mut self, node: usize, degree: f64, target: usize) {
        let current = self.core.belongings[node];
        if current == target {
            return;
        }

        let degree = degree + self.core.loops[node];
        self.total_weights[current] -= degree;
        self.total_weights[target] += degree;
        self.core.relocate(node, current, target);
    }

    /// Move `node` into a singleton community and return its id. A node that
    /// is already alone keeps its community.
    pub fn isolate(&mut self, node: usize, degree: f64) -> usize {
        let current = self.core.belongings[node];

        // The node is already isolated
        if self.core.counts[current] == 1 {
            return current;
        }

        // A community with two members or more implies a free id.
        let Some(community) = self.core.unused.pop() else {
            debug_assert!(false, "no free community id while isolating {node}");
            return current;
        };

        let degree = degree + self.core.loops[node];
        self.total_weights[current] -= degree;
        self.total_weights[community] += degree;
        self.core.relocate(node, current, community);

        community
    }

    pub fn expensive_move(&mut self, node: usize, target: usize) {
        let degree = self.core.compute_node_degree(node);
        self.move_node(node, degree, target);
    }

    pub fn expensive_isolate(&mut self, node: usize) -> usize {
        let degree = self.core.compute_node_degree(node);
        self.isolate(node, degree)
    }

    /// Modularity gain of moving the isolated `node` into `target`, where
    /// `target_degree` is the weight between the node and `target`.
    pub fn delta(&self, node: usize, degree: f64, target_degree: f64, target: usize) -> f64 {
        let m = self.core.m;
        let degree = degree + self.core.loops[node];
        let target_total = self.total_weights[target];

        // target_degree is the one-sided weight, hence M instead of 2M.
        target_degree / m - (target_total * degree * self.core.resolution) / (2.0 * m * m)
    }

    /// [`delta`](Self::delta) for the community `node` currently belongs to,
    /// discounting the node's own contribution to its total weight.
    pub fn delta_with_own_community(
        &self,
        node: usize,
        degree: f64,
        target_degree: f64,
        target: usize,
    ) -> f64 {
        let m = self.core.m;
        let degree = degree + self.core.loops[node];
        let target_total = self.total_weights[target];

        target_degree / m
            - ((target_total - degree) * degree * self.core.resolution) / (2.0 * m * m)
    }

    /// [`delta`](Self::delta) scaled by `M`. Ranks candidates identically.
    #[inline]
    pub fn fast_delta(&self, node: usize, degree: f64, target_degree: f64, target: usize) -> f64 {
        let m = self.core.m;
        let degree = degree + self.core.loops[node];
        let target_total = self.total_weights[target];

        target_degree - (degree * target_total * self.core.resolution) / (2.0 * m)
    }

    /// [`delta_with_own_community`](Self::delta_with_own_community) scaled by `M`.
    #[inline]
    pub fn fast_delta_with_own_community(
        &self,
        node: usize,
        degree: f64,
        target_degree: f64,
        target: usize,
    ) -> f64 {
        let m = self.core.m;
        let degree = degree + self.core.loops[node];
        let target_total = self.total_weights[target];

        target_degree - (degree * (target_total - degree) * self.core.resolution) / (2.0 * m)
    }

    /// Modularity of the current partition. NaN when the graph has no edges.
    pub fn modularity(&self) -> f64 {
        let core = &self.core;
        let m2 = core.m * 2.0;
        let mut internal_weights = vec![0.0; core.node_count()];

        for i in 0..core.node_count() {
            let ci = core.belongings[i];
            internal_weights[ci] += core.loops[i];

            for o in core.bounds(i) {
                if core.belongings[core.neighborhood[o]] == ci {
                    internal_weights[ci] += core.weights[o];
                }
            }
        }

        internal_weights
            .iter()
            .zip(&self.total_weights)
            .map(|(internal, total)| internal / m2 - (total / m2).powi(2) * core.resolution)
            .sum()
    }

    /// Replace every live community by a single node.
    ///
    /// Intra-community weight becomes the new node's self-loop, parallel
    /// inter-community edges are merged. Returns the renumbering from old
    /// community ids to new node ids ([`UNASSIGNED`] for dead ids).
    pub fn zoom_out(&mut self) -> Vec<usize> {
        let previous = self.core.node_count();
        let (new_labels, live) = self.core.renumber();

        let mut total_weights = vec![0.0; live];
        for (old, &new) in new_labels.iter().enumerate() {
            if new != UNASSIGNED {
                total_weights[new] = self.total_weights[old];
            }
        }

        let (members, bounds) = self.core.members_by_community(live);
        let core = &self.core;

        let mut adjacency = SparseMap::with_capacity(live);
        let mut starts = Vec::with_capacity(live + 1);
        let mut neighborhood = Vec::new();
        let mut weights = Vec::new();
        let mut loops = vec![0.0; live];

        starts.push(0);
        for ci in 0..live {
            adjacency.clear();

            for &i in &members[bounds[ci]..bounds[ci + 1]] {
                loops[ci] += core.loops[i];

                for o in core.bounds(i) {
                    let cj = core.belongings[core.neighborhood[o]];

                    if cj == ci {
                        loops[ci] += core.weights[o];
                    } else {
                        adjacency.add(cj, core.weights[o]);
                    }
                }
            }

            for (cj, weight) in sorted_entries(&adjacency) {
                neighborhood.push(cj);
                weights.push(weight);
            }
            starts.push(neighborhood.len());
        }

        log::debug!(
            "zoom out to level {}: {} nodes -> {} nodes, {} adjacency entries",
            self.core.level + 1,
            previous,
            live,
            neighborhood.len()
        );

        let core = &mut self.core;
        core.starts = starts;
        core.neighborhood = neighborhood;
        core.weights = weights;
        core.loops = loops;
        core.belongings = (0..live).collect();
        core.counts = vec![1; live];
        core.unused.clear();
        core.level += 1;
        self.total_weights = total_weights;

        new_labels
    }
}

impl<K: Copy + Eq + Hash> LouvainIndex for UndirectedIndex<K> {
    type Degree = f64;

    #[inline]
    fn node_count(&self) -> usize {
        self.core.node_count()
    }

    #[inline]
    fn belonging(&self, node: usize) -> usize {
        self.core.belongings[node]
    }

    #[inline]
    fn neighbors(&self, node: usize) -> &[usize] {
        &self.core.neighborhood[self.core.bounds(node)]
    }

    fn accumulate_neighbor_communities(
        &self,
        node: usize,
        communities: &mut SparseMap<f64>,
    ) -> f64 {
        let core = &self.core;
        let mut degree = 0.0;

        for o in core.bounds(node) {
            let weight = core.weights[o];
            degree += weight;
            communities.add(core.belongings[core.neighborhood[o]], weight);
        }

        degree
    }

    #[inline]
    fn local_delta_with_own_community(
        &self,
        node: usize,
        degree: f64,
        community_degree: f64,
        community: usize,
    ) -> f64 {
        self.fast_delta_with_own_community(node, degree, community_degree, community)
    }

    #[inline]
    fn local_delta(
        &self,
        node: usize,
        degree: f64,
        community_degree: f64,
        community: usize,
    ) -> f64 {
        self.fast_delta(node, degree, community_degree, community)
    }

    #[inline]
    fn move_node(&mut self, node: usize, degree: f64, target: usize) {
        UndirectedIndex::move_node(self, node, degree, target);
    }

    #[inline]
    fn isolate(&mut self, node: usize, degree: f64) -> usize {
        UndirectedIndex::isolate(self, node, degree)
    }

    fn zoom_out(&mut self) -> Vec<usize> {
        UndirectedIndex::zoom_out(self)
    }
}
