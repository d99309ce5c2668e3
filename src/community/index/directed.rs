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
use std::ops::{Deref, Range};

use super::{sorted_entries, IndexCore, LouvainIndex, Snapshot, UNASSIGNED};
use crate::community::sparse::SparseMap;
use crate::error::Result;
use crate::graph::GraphView;

/// Neighborhood index of a directed graph.
///
/// The adjacency of node `i` lists its out-neighbors in
/// `starts[i]..offsets[i]` followed by its in-neighbors in
/// `offsets[i]..starts[i + 1]`. A self-loop of weight `w` adds `w` to both
/// the in and out totals of its community, and to `loops`.
#[derive(Debug, Clone)]
pub struct DirectedIndex<K> {
    core: IndexCore<K>,
    offsets: Vec<usize>,
    total_in_weights: Vec<f64>,
    total_out_weights: Vec<f64>,
}

impl<K> Deref for DirectedIndex<K> {
    type Target = IndexCore<K>;

    fn deref(&self) -> &IndexCore<K> {
        &self.core
    }
}

impl<K: Copy + Eq + Hash> DirectedIndex<K> {
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
        let mut total_in_weights = vec![0.0; order];
        let mut total_out_weights = vec![0.0; order];

        let mut out_degrees = vec![0usize; order];
        let mut in_degrees = vec![0usize; order];
        for &(source, target, _) in &edges {
            if source != target {
                out_degrees[source] += 1;
                in_degrees[target] += 1;
            }
        }

        let mut offsets = vec![0; order];
        for i in 0..order {
            offsets[i] = core.starts[i] + out_degrees[i];
            core.starts[i + 1] = offsets[i] + in_degrees[i];
        }

        let size = core.starts[order];
        core.neighborhood = vec![0; size];
        core.weights = vec![0.0; size];
        let mut out_cursor = core.starts[..order].to_vec();
        let mut in_cursor = offsets.clone();

        for (source, target, weight) in edges {
            core.m += weight;

            total_out_weights[source] += weight;
            total_in_weights[target] += weight;

            if source == target {
                core.loops[source] += weight;
                continue;
            }

            core.neighborhood[out_cursor[source]] = target;
            core.weights[out_cursor[source]] = weight;
            out_cursor[source] += 1;

            core.neighborhood[in_cursor[target]] = source;
            core.weights[in_cursor[target]] = weight;
            in_cursor[target] += 1;
        }

        DirectedIndex {
            core,
            offsets,
            total_in_weights,
            total_out_weights,
        }
    }

    #[inline]
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    #[inline]
    pub fn total_in_weights(&self) -> &[f64] {
        &self.total_in_weights
    }

    #[inline]
    pub fn total_out_weights(&self) -> &[f64] {
        &self.total_out_weights
    }

    #[inline]
    pub fn out_bounds(&self, node: usize) -> Range<usize> {
        self.core.starts[node]..self.offsets[node]
    }

    #[inline]
    pub fn in_bounds(&self, node: usize) -> Range<usize> {
        self.offsets[node]..self.core.starts[node + 1]
    }

    /// Out-neighbors and in-neighbors of every node at the current level.
    pub fn project_directed(&self) -> (Vec<Vec<usize>>, Vec<Vec<usize>>) {
        let neighborhood = &self.core.neighborhood;
        (0..self.core.node_count())
            .map(|i| {
                (
                    neighborhood[self.out_bounds(i)].to_vec(),
                    neighborhood[self.in_bounds(i)].to_vec(),
                )
            })
            .unzip()
    }

    pub fn compute_node_in_degree(&self, node: usize) -> f64 {
        self.core.weights[self.in_bounds(node)].iter().sum()
    }

    pub fn compute_node_out_degree(&self, node: usize) -> f64 {
        self.core.weights[self.out_bounds(node)].iter().sum()
    }

    /// Move `node` to `target`. Degrees exclude self-loops.
    pub fn move_node(&mut self, node: usize, in_degree: f64, out_degree: f64, target: usize) {
        let current = self.core.belongings[node];
        if current == target {
            return;
        }

        let loops = self.core.loops[node];
        let in_degree = in_degree + loops;
        let out_degree = out_degree + loops;

        self.total_in_weights[current] -= in_degree;
        self.total_out_weights[current] -= out_degree;
        self.total_in_weights[target] += in_degree;
        self.total_out_weights[target] += out_degree;
        self.core.relocate(node, current, target);
    }

    pub fn isolate(&mut self, node: usize, in_degree: f64, out_degree: f64) -> usize {
        let current = self.core.belongings[node];

        if self.core.counts[current] == 1 {
            return current;
        }

        let Some(community) = self.core.unused.pop() else {
            debug_assert!(false, "no free community id while isolating {node}");
            return current;
        };

        let loops = self.core.loops[node];
        let in_degree = in_degree + loops;
        let out_degree = out_degree + loops;

        self.total_in_weights[current] -= in_degree;
        self.total_out_weights[current] -= out_degree;
        self.total_in_weights[community] += in_degree;
        self.total_out_weights[community] += out_degree;
        self.core.relocate(node, current, community);

        community
    }

    pub fn expensive_move(&mut self, node: usize, target: usize) {
        let in_degree = self.compute_node_in_degree(node);
        let out_degree = self.compute_node_out_degree(node);
        self.move_node(node, in_degree, out_degree, target);
    }

    pub fn expensive_isolate(&mut self, node: usize) -> usize {
        let in_degree = self.compute_node_in_degree(node);
        let out_degree = self.compute_node_out_degree(node);
        self.isolate(node, in_degree, out_degree)
    }

    /// Directed modularity gain of moving the isolated `node` into `target`.
    /// `target_degree` sums both edge directions between node and target.
    pub fn delta(
        &self,
        node: usize,
        in_degree: f64,
        out_degree: f64,
        target_degree: f64,
        target: usize,
    ) -> f64 {
        let m = self.core.m;
        let loops = self.core.loops[node];
        let in_degree = in_degree + loops;
        let out_degree = out_degree + loops;

        let target_in = self.total_in_weights[target];
        let target_out = self.total_out_weights[target];

        target_degree / m
            - ((out_degree * target_in + in_degree * target_out) * self.core.resolution) / (m * m)
    }

    pub fn delta_with_own_community(
        &self,
        node: usize,
        in_degree: f64,
        out_degree: f64,
        target_degree: f64,
        target: usize,
    ) -> f64 {
        let m = self.core.m;
        let loops = self.core.loops[node];
        let in_degree = in_degree + loops;
        let out_degree = out_degree + loops;

        let target_in = self.total_in_weights[target] - in_degree;
        let target_out = self.total_out_weights[target] - out_degree;

        target_degree / m
            - ((out_degree * target_in + in_degree * target_out) * self.core.resolution) / (m * m)
    }

    /// [`delta`](Self::delta) scaled by `M`.
    pub fn fast_delta(
        &self,
        node: usize,
        in_degree: f64,
        out_degree: f64,
        target_degree: f64,
        target: usize,
    ) -> f64 {
        let m = self.core.m;
        let loops = self.core.loops[node];
        let in_degree = in_degree + loops;
        let out_degree = out_degree + loops;

        let target_in = self.total_in_weights[target];
        let target_out = self.total_out_weights[target];

        target_degree
            - ((out_degree * target_in + in_degree * target_out) * self.core.resolution) / m
    }

    pub fn fast_delta_with_own_community(
        &self,
        node: usize,
        in_degree: f64,
        out_degree: f64,
        target_degree: f64,
        target: usize,
    ) -> f64 {
        let m = self.core.m;
        let loops = self.core.loops[node];
        let in_degree = in_degree + loops;
        let out_degree = out_degree + loops;

        let target_in = self.total_in_weights[target] - in_degree;
        let target_out = self.total_out_weights[target] - out_degree;

        target_degree
            - ((out_degree * target_in + in_degree * target_out) * self.core.resolution) / m
    }

    /// Directed modularity of the current partition. NaN without edges.
    pub fn modularity(&self) -> f64 {
        let core = &self.core;
        let m = core.m;
        let mut internal_weights = vec![0.0; core.node_count()];

        for i in 0..core.node_count() {
            let ci = core.belongings[i];
            internal_weights[ci] += core.loops[i];

            for o in self.out_bounds(i) {
                if core.belongings[core.neighborhood[o]] == ci {
                    internal_weights[ci] += core.weights[o];
                }
            }
        }

        (0..core.node_count())
            .map(|c| {
                internal_weights[c] / m
                    - (self.total_in_weights[c] * self.total_out_weights[c] * core.resolution)
                        / (m * m)
            })
            .sum()
    }

    /// Directed counterpart of [`UndirectedIndex::zoom_out`](super::UndirectedIndex::zoom_out).
    pub fn zoom_out(&mut self) -> Vec<usize> {
        let previous = self.core.node_count();
        let (new_labels, live) = self.core.renumber();

        let mut total_in_weights = vec![0.0; live];
        let mut total_out_weights = vec![0.0; live];
        for (old, &new) in new_labels.iter().enumerate() {
            if new != UNASSIGNED {
                total_in_weights[new] = self.total_in_weights[old];
                total_out_weights[new] = self.total_out_weights[old];
            }
        }

        let (members, bounds) = self.core.members_by_community(live);
        let core = &self.core;

        let mut out_adjacency = SparseMap::with_capacity(live);
        let mut in_adjacency = SparseMap::with_capacity(live);
        let mut starts = Vec::with_capacity(live + 1);
        let mut offsets = Vec::with_capacity(live);
        let mut neighborhood = Vec::new();
        let mut weights = Vec::new();
        let mut loops = vec![0.0; live];

        starts.push(0);
        for ci in 0..live {
            out_adjacency.clear();
            in_adjacency.clear();

            for &i in &members[bounds[ci]..bounds[ci + 1]] {
                loops[ci] += core.loops[i];

                for o in core.bounds(i) {
                    let outgoing = o < self.offsets[i];
                    let cj = core.belongings[core.neighborhood[o]];

                    if cj == ci {
                        // Each internal arc shows up once on each side.
                        if outgoing {
                            loops[ci] += core.weights[o];
                        }
                        continue;
                    }

                    if outgoing {
                        out_adjacency.add(cj, core.weights[o]);
                    } else {
                        in_adjacency.add(cj, core.weights[o]);
                    }
                }
            }

            for (cj, weight) in sorted_entries(&out_adjacency) {
                neighborhood.push(cj);
                weights.push(weight);
            }
            offsets.push(neighborhood.len());
            for (cj, weight) in sorted_entries(&in_adjacency) {
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
        self.offsets = offsets;
        self.total_in_weights = total_in_weights;
        self.total_out_weights = total_out_weights;

        new_labels
    }
}

impl<K: Copy + Eq + Hash> LouvainIndex for DirectedIndex<K> {
    /// `(in, out)`
    type Degree = (f64, f64);

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
    ) -> (f64, f64) {
        let core = &self.core;
        let mut in_degree = 0.0;
        let mut out_degree = 0.0;

        for o in core.bounds(node) {
            let weight = core.weights[o];
            if o < self.offsets[node] {
                out_degree += weight;
            } else {
                in_degree += weight;
            }
            communities.add(core.belongings[core.neighborhood[o]], weight);
        }

        (in_degree, out_degree)
    }

    #[inline]
    fn local_delta_with_own_community(
        &self,
        node: usize,
        (in_degree, out_degree): (f64, f64),
        community_degree: f64,
        community: usize,
    ) -> f64 {
        self.delta_with_own_community(node, in_degree, out_degree, community_degree, community)
    }

    #[inline]
    fn local_delta(
        &self,
        node: usize,
        (in_degree, out_degree): (f64, f64),
        community_degree: f64,
        community: usize,
    ) -> f64 {
        self.delta(node, in_degree, out_degree, community_degree, community)
    }

    #[inline]
    fn move_node(&mut self, node: usize, (in_degree, out_degree): (f64, f64), target: usize) {
        DirectedIndex::move_node(self, node, in_degree, out_degree, target);
    }

    #[inline]
    fn isolate(&mut self, node: usize, (in_degree, out_degree): (f64, f64)) -> usize {
        DirectedIndex::isolate(self, node, in_degree, out_degree)
    }

    fn zoom_out(&mut self) -> Vec<usize> {
        DirectedIndex::zoom_out(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use petgraph::graph::{DiGraph, NodeIndex};

    fn fixture() -> DiGraph<(), f64> {
        let mut graph = DiGraph::new();
        let nodes: Vec<NodeIndex> = (0..6).map(|_| graph.add_node(())).collect();
        for (s, t, w) in [
            (0, 1, 30.0),
            (0, 4, 1.0),
            (1, 2, 15.0),
            (2, 3, 10.0),
            (3, 1, 1.0),
            (4, 0, 5.0),
            (5, 2, 100.0),
        ] {
            graph.add_edge(nodes[s], nodes[t], w);
        }
        graph
    }

    fn sorted(mut v: Vec<usize>) -> Vec<usize> {
        v.sort_unstable();
        v
    }

    #[test]
    fn indexes_weighted_graph() {
        let index = DirectedIndex::new(&fixture(), 1.0, Some("weight")).unwrap();

        assert_eq!(index.total_weight(), 162.0);
        assert_eq!(index.offsets(), &[2, 4, 7, 10, 12, 14]);
        assert_eq!(index.total_out_weights(), &[31.0, 15.0, 10.0, 1.0, 5.0, 100.0]);
        assert_eq!(index.total_in_weights(), &[5.0, 31.0, 115.0, 10.0, 1.0, 0.0]);

        let (outs, ins) = index.project_directed();
        let outs: Vec<Vec<usize>> = outs.into_iter().map(sorted).collect();
        let ins: Vec<Vec<usize>> = ins.into_iter().map(sorted).collect();
        assert_eq!(outs, vec![vec![1, 4], vec![2], vec![3], vec![1], vec![0], vec![2]]);
        assert_eq!(ins, vec![vec![4], vec![0, 3], vec![1, 5], vec![2], vec![0], vec![]]);

        assert_eq!(index.compute_node_out_degree(0), 31.0);
        assert_eq!(index.compute_node_in_degree(2), 115.0);
    }

    #[test]
    fn moves_conserve_in_and_out_totals() {
        let mut index = DirectedIndex::new(&fixture(), 1.0, None).unwrap();
        index.expensive_move(1, 2);
        index.expensive_move(0, 4);
        index.expensive_move(5, 2);
        index.expensive_move(3, 2);

        assert_eq!(index.belongings(), &[4, 2, 2, 2, 4, 2]);
        assert_eq!(index.counts(), &[0, 0, 4, 0, 2, 0]);
        assert_eq!(index.community_count(), 2);
        assert_eq!(index.total_in_weights().iter().sum::<f64>(), index.total_weight());
        assert_eq!(index.total_out_weights().iter().sum::<f64>(), index.total_weight());
        assert_eq!(index.total_out_weights()[4], 3.0);
        assert_eq!(index.total_in_weights()[4], 2.0);

        let community = index.expensive_isolate(2);
        assert_eq!(index.counts()[community], 1);
        index.expensive_move(2, 2);
        assert_eq!(index.belongings()[2], 2);
    }

    #[test]
    fn fast_delta_matches_delta() {
        let mut index = DirectedIndex::new(&fixture(), 1.0, Some("weight")).unwrap();
        index.expensive_move(3, 2);
        let m = index.total_weight();

        for (node, target_degree, target) in [(1, 16.0, 2), (5, 100.0, 2), (0, 30.0, 1)] {
            let in_degree = index.compute_node_in_degree(node);
            let out_degree = index.compute_node_out_degree(node);

            let exact = index.delta(node, in_degree, out_degree, target_degree, target);
            let fast = index.fast_delta(node, in_degree, out_degree, target_degree, target);
            assert!((exact * m - fast).abs() < 1e-9);
        }
    }

    #[test]
    fn zoom_out_preserves_modularity() {
        let mut index = DirectedIndex::new(&fixture(), 1.0, None).unwrap();
        index.expensive_move(1, 2);
        index.expensive_move(0, 4);
        index.expensive_move(5, 2);
        index.expensive_move(3, 2);
        let before = index.modularity();

        index.zoom_out();
        assert_eq!(index.node_count(), 2);
        // 0 -> 4 and 4 -> 0 are internal to the first community.
        assert_eq!(index.loops(), &[2.0, 4.0]);
        assert_eq!(index.offsets(), &[1, 1]);
        assert_eq!(index.total_in_weights(), &[2.0, 5.0]);
        assert_eq!(index.total_out_weights(), &[3.0, 4.0]);
        assert!((index.modularity() - before).abs() < 1e-5);
    }

    fn weight_toward(index: &DirectedIndex<NodeIndex>, node: usize, community: usize) -> f64 {
        index
            .out_bounds(node)
            .chain(index.in_bounds(node))
            .filter(|&o| index.belongings()[index.neighborhood()[o]] == community)
            .map(|o| index.weights()[o])
            .sum()
    }

    #[test]
    fn own_community_delta_matches_delta_after_isolation() {
        let mut graph = fixture();
        graph.add_edge(NodeIndex::new(2), NodeIndex::new(2), 4.0);

        for weight in [None, Some("weight")] {
            let mut index = DirectedIndex::new(&graph, 1.0, weight).unwrap();
            for (node, target) in [(1, 2), (0, 4), (5, 2), (3, 2)] {
                index.expensive_move(node, target);
            }

            for node in 0..index.node_count() {
                let community = index.belongings()[node];
                let in_degree = index.compute_node_in_degree(node);
                let out_degree = index.compute_node_out_degree(node);
                let toward = weight_toward(&index, node, community);
                let own =
                    index.delta_with_own_community(node, in_degree, out_degree, toward, community);
                let fast_own = index
                    .fast_delta_with_own_community(node, in_degree, out_degree, toward, community);

                let mut isolated = index.clone();
                assert_ne!(isolated.isolate(node, in_degree, out_degree), community);
                let after = isolated.delta(node, in_degree, out_degree, toward, community);
                let fast_after =
                    isolated.fast_delta(node, in_degree, out_degree, toward, community);

                assert!((own - after).abs() < 1e-12, "node {node}: {own} != {after}");
                assert!((fast_own - fast_after).abs() < 1e-9);
            }
        }
    }
}
