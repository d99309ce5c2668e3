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
// https://arxiv.org/abs/0803.0476

use std::hash::Hash;

use indexmap::IndexMap;

use super::common::{build_rng, random_index, tie_breaker, RandomSource};
use super::index::{DirectedIndex, IndexCore, LouvainIndex, Snapshot, UndirectedIndex};
use super::options::LouvainOptions;
use super::report::{DetailedReport, MoveHistory};
use super::sparse::{SparseMap, SparseQueueSet};
use crate::error::{CommunityError, Result};
use crate::graph::{GraphKind, GraphView, GraphViewMut};

// ========================
// Local moving phase
// ========================

/// Greedy local search over one level of an index.
///
/// The scratch structures are sized for the first level and reused for
/// every coarser one.
pub(crate) struct LocalMover {
    communities: SparseMap<f64>,
    queue: SparseQueueSet,
    random_walk: bool,
    pub(crate) delta_computations: usize,
    pub(crate) nodes_visited: usize,
}

impl LocalMover {
    pub(crate) fn new(capacity: usize, random_walk: bool) -> Self {
        LocalMover {
            communities: SparseMap::with_capacity(capacity),
            queue: SparseQueueSet::with_capacity(capacity),
            random_walk,
            delta_computations: 0,
            nodes_visited: 0,
        }
    }

    fn first_node(&self, rng: &mut dyn RandomSource, order: usize) -> usize {
        if self.random_walk {
            random_index(rng, order)
        } else {
            0
        }
    }

    /// Evaluate every neighboring community of `node` and apply the best
    /// move. Returns the node's new community, or `None` if it stayed.
    fn visit<I: LouvainIndex>(&mut self, index: &mut I, node: usize) -> Option<usize> {
        self.nodes_visited += 1;
        self.communities.clear();

        let current = index.belonging(node);
        let degree = index.accumulate_neighbor_communities(node, &mut self.communities);

        let mut best_delta = index.local_delta_with_own_community(
            node,
            degree,
            self.communities.get(current).unwrap_or(0.0),
            current,
        );
        let mut best = current;

        for ci in 0..self.communities.len() {
            let (target, target_degree) = self.communities.entry_at(ci);
            if target == current {
                continue;
            }

            self.delta_computations += 1;
            let delta = index.local_delta(node, degree, target_degree, target);

            if tie_breaker(best, current, target, delta, best_delta) {
                best_delta = delta;
                best = target;
            }
        }

        if best_delta < 0.0 {
            // Staying scores worse than being alone, which self-loops or a
            // resolution other than 1 can cause.
            let isolated = index.isolate(node, degree);
            (isolated != current).then_some(isolated)
        } else if best == current {
            None
        } else {
            index.move_node(node, degree, best);
            Some(best)
        }
    }

    /// Queue-driven pass: every node is queued once, and a moved node
    /// requeues its neighbors lying outside its new community. Returns the
    /// number of moves.
    pub(crate) fn queue_pass<I: LouvainIndex>(
        &mut self,
        index: &mut I,
        rng: &mut dyn RandomSource,
    ) -> usize {
        let order = index.node_count();
        let start = self.first_node(rng, order);
        for s in 0..order {
            self.queue.enqueue((start + s) % order);
        }

        let mut moves = 0;
        while let Some(node) = self.queue.dequeue() {
            let Some(target) = self.visit(index, node) else {
                continue;
            };
            moves += 1;

            for &neighbor in index.neighbors(node) {
                if index.belonging(neighbor) != target {
                    self.queue.enqueue(neighbor);
                }
            }
        }

        moves
    }

    /// Sweep-driven pass: full sweeps until one makes no move. Returns the
    /// number of moves of each sweep, the last one being 0.
    pub(crate) fn sweep_pass<I: LouvainIndex>(
        &mut self,
        index: &mut I,
        rng: &mut dyn RandomSource,
    ) -> Vec<usize> {
        let order = index.node_count();
        let mut sweeps = Vec::new();

        loop {
            let start = self.first_node(rng, order);
            let mut moves = 0;

            for s in 0..order {
                if self.visit(index, (start + s) % order).is_some() {
                    moves += 1;
                }
            }

            sweeps.push(moves);
            if moves == 0 {
                return sweeps;
            }
        }
    }
}

// ========================
// Driver
// ========================

/// Diagnostics of a finished run.
#[derive(Debug, Clone)]
pub(crate) struct RunStats {
    pub(crate) delta_computations: usize,
    pub(crate) nodes_visited: usize,
    pub(crate) moves: MoveHistory,
}

impl RunStats {
    pub(crate) fn new(mover: &LocalMover, moves: MoveHistory) -> Self {
        RunStats {
            delta_computations: mover.delta_computations,
            nodes_visited: mover.nodes_visited,
            moves,
        }
    }
}

/// Alternate local moves and zoom-outs until a pass makes no move.
fn optimize<I: LouvainIndex>(
    index: &mut I,
    options: &LouvainOptions,
    rng: &mut dyn RandomSource,
) -> RunStats {
    let mut mover = LocalMover::new(index.node_count(), options.random_walk);

    let moves = if options.fast_local_moves {
        let mut passes = Vec::new();
        loop {
            let moves = mover.queue_pass(index, rng);
            log::trace!(
                "louvain pass {}: {} moves over {} nodes",
                passes.len(),
                moves,
                index.node_count()
            );
            passes.push(moves);
            if moves == 0 {
                break;
            }
            index.zoom_out();
        }
        MoveHistory::Queue(passes)
    } else {
        let mut passes = Vec::new();
        loop {
            let sweeps = mover.sweep_pass(index, rng);
            let moved = sweeps.iter().any(|&moves| moves > 0);
            log::trace!(
                "louvain pass {}: {} sweeps, {} moves over {} nodes",
                passes.len(),
                sweeps.len(),
                sweeps.iter().sum::<usize>(),
                index.node_count()
            );
            passes.push(sweeps);
            if !moved {
                break;
            }
            index.zoom_out();
        }
        MoveHistory::Sweep(passes)
    };

    RunStats::new(&mover, moves)
}

/// Index of a finished run, or the trivial partition of an edgeless graph.
pub(crate) enum Detection<K> {
    Empty(Vec<K>),
    Undirected(UndirectedIndex<K>, RunStats),
    Directed(DirectedIndex<K>, RunStats),
}

impl<K: Copy + Eq + Hash> Detection<K> {
    fn parts(&self) -> Option<(&IndexCore<K>, &RunStats)> {
        match self {
            Detection::Empty(_) => None,
            Detection::Undirected(index, stats) => Some((&**index, stats)),
            Detection::Directed(index, stats) => Some((&**index, stats)),
        }
    }

    fn modularity(&self) -> f64 {
        match self {
            Detection::Empty(_) => f64::NAN,
            Detection::Undirected(index, _) => index.modularity(),
            Detection::Directed(index, _) => index.modularity(),
        }
    }

    pub(crate) fn collect(&self) -> IndexMap<K, usize> {
        match self {
            Detection::Empty(nodes) => nodes
                .iter()
                .enumerate()
                .map(|(community, &node)| (node, community))
                .collect(),
            Detection::Undirected(index, _) => index.collect(None),
            Detection::Directed(index, _) => index.collect(None),
        }
    }

    pub(crate) fn assign<G>(&self, graph: &mut G, name: &str)
    where
        G: GraphViewMut<NodeId = K>,
    {
        match self.parts() {
            Some((core, _)) => core.assign(graph, name, None),
            None => {
                for (node, community) in self.collect() {
                    graph.set_node_attribute(node, name, community);
                }
            }
        }
    }

    pub(crate) fn into_report(self, resolution: f64) -> DetailedReport<K> {
        let Some((core, stats)) = self.parts() else {
            let nodes = match &self {
                Detection::Empty(nodes) => nodes.clone(),
                _ => Vec::new(),
            };
            return DetailedReport::trivial(nodes, resolution);
        };

        DetailedReport {
            count: core.node_count(),
            delta_computations: stats.delta_computations,
            dendrogram: Some(core.dendrogram().levels()),
            level: core.level(),
            modularity: self.modularity(),
            moves: Some(stats.moves.clone()),
            nodes_visited: stats.nodes_visited,
            resolution,
            communities: core.collect(None),
        }
    }

    pub(crate) fn log_summary(&self, algorithm: &str) {
        if let Some((core, stats)) = self.parts() {
            log::debug!(
                "{algorithm} done: {} communities after {} levels, {} nodes visited, {} delta computations",
                core.node_count(),
                core.level(),
                stats.nodes_visited,
                stats.delta_computations
            );
        }
    }
}

/// Reject graphs the algorithms cannot run on, before any state is built.
pub(crate) fn check_kind<G: GraphView>(graph: &G, algorithm: &str) -> Result<GraphKind> {
    let kind = graph.kind();
    if kind == GraphKind::Mixed {
        return Err(CommunityError::UnsupportedGraphKind(format!(
            "{algorithm} cannot run on a graph mixing directed and undirected edges"
        )));
    }
    Ok(kind)
}

fn detect<G: GraphView>(
    graph: &G,
    options: &LouvainOptions,
    rng: &mut dyn RandomSource,
) -> Result<Detection<G::NodeId>> {
    options.validate()?;
    let kind = check_kind(graph, "louvain")?;

    if graph.edge_count() == 0 {
        return Ok(Detection::Empty(graph.node_ids().collect()));
    }

    let snapshot = Snapshot::take(graph, options.weight_attribute())?;
    log::debug!(
        "louvain on {:?} graph: {} nodes, {} edges, resolution {}",
        kind,
        snapshot.nodes.len(),
        snapshot.edges.len(),
        options.resolution
    );

    let detection = match kind {
        GraphKind::Directed => {
            let mut index = DirectedIndex::from_snapshot(snapshot, options.resolution);
            let stats = optimize(&mut index, options, rng);
            Detection::Directed(index, stats)
        }
        _ => {
            let mut index = UndirectedIndex::from_snapshot(snapshot, options.resolution);
            let stats = optimize(&mut index, options, rng);
            Detection::Undirected(index, stats)
        }
    };
    detection.log_summary("louvain");

    Ok(detection)
}

// ========================
// Public API
// ========================

/// Detect communities with the Louvain method.
///
/// Returns the community of every node, in node iteration order. Community
/// ids are dense in `[0, count)`. Randomness comes from a [`Pcg64`] seeded
/// with `options.seed`, or from OS entropy.
///
/// [`Pcg64`]: rand_pcg::Pcg64
///
/// # Errors
///
/// * [`CommunityError::InvalidParameter`] for a non-positive resolution
/// * [`CommunityError::UnsupportedGraphKind`] for a mixed graph
/// * [`CommunityError::InvalidGraph`] or [`CommunityError::InvalidWeight`]
///   when the graph cannot be indexed
///
/// # Example
///
/// ```
/// use petgraph::graph::UnGraph;
/// use rustworkx_community::community::{louvain, LouvainOptions};
///
/// let graph = UnGraph::<(), ()>::from_edges([(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3), (2, 3)]);
/// let communities = louvain(&graph, &LouvainOptions::new().with_seed(42)).unwrap();
/// assert_eq!(communities.len(), 6);
/// ```
pub fn louvain<G: GraphView>(
    graph: &G,
    options: &LouvainOptions,
) -> Result<IndexMap<G::NodeId, usize>> {
    let mut rng = build_rng(options.seed);
    louvain_with_rng(graph, options, &mut rng)
}

/// [`louvain`] drawing from `rng`. `options.seed` is ignored.
pub fn louvain_with_rng<G: GraphView>(
    graph: &G,
    options: &LouvainOptions,
    rng: &mut dyn RandomSource,
) -> Result<IndexMap<G::NodeId, usize>> {
    Ok(detect(graph, options, rng)?.collect())
}

/// Run [`louvain`] and write each node's community to its
/// `options.attributes.community` attribute.
pub fn louvain_assign<G: GraphViewMut>(graph: &mut G, options: &LouvainOptions) -> Result<()> {
    let mut rng = build_rng(options.seed);
    louvain_assign_with_rng(graph, options, &mut rng)
}

pub fn louvain_assign_with_rng<G: GraphViewMut>(
    graph: &mut G,
    options: &LouvainOptions,
    rng: &mut dyn RandomSource,
) -> Result<()> {
    let detection = detect(graph, options, rng)?;
    detection.assign(graph, &options.attributes.community);
    Ok(())
}

/// Run [`louvain`] and return the partition along with its diagnostics.
pub fn louvain_detailed<G: GraphView>(
    graph: &G,
    options: &LouvainOptions,
) -> Result<DetailedReport<G::NodeId>> {
    let mut rng = build_rng(options.seed);
    louvain_detailed_with_rng(graph, options, &mut rng)
}

pub fn louvain_detailed_with_rng<G: GraphView>(
    graph: &G,
    options: &LouvainOptions,
    rng: &mut dyn RandomSource,
) -> Result<DetailedReport<G::NodeId>> {
    Ok(detect(graph, options, rng)?.into_report(options.resolution))
}

/// Assign communities like [`louvain_assign`] and return the report of
/// [`louvain_detailed`].
pub fn louvain_assign_detailed<G: GraphViewMut>(
    graph: &mut G,
    options: &LouvainOptions,
) -> Result<DetailedReport<G::NodeId>> {
    let mut rng = build_rng(options.seed);
    louvain_assign_detailed_with_rng(graph, options, &mut rng)
}

pub fn louvain_assign_detailed_with_rng<G: GraphViewMut>(
    graph: &mut G,
    options: &LouvainOptions,
    rng: &mut dyn RandomSource,
) -> Result<DetailedReport<G::NodeId>> {
    let detection = detect(graph, options, rng)?;
    detection.assign(graph, &options.attributes.community);
    Ok(detection.into_report(options.resolution))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::community::common::FnSource;
    use petgraph::graph::{DiGraph, NodeIndex, UnGraph};
    use rand::Rng;

    fn two_triangles() -> UnGraph<(), ()> {
        UnGraph::from_edges([(0, 1), (0, 2), (1, 2), (3, 4), (3, 5), (4, 5), (2, 4)])
    }

    fn fixed() -> LouvainOptions {
        LouvainOptions::new().with_random_walk(false)
    }

    #[test]
    fn queue_pass_merges_triangles() {
        let graph = two_triangles();
        let mut index = UndirectedIndex::new(&graph, 1.0, None).unwrap();
        let mut mover = LocalMover::new(index.node_count(), false);
        let mut rng = FnSource(|| 0.0);

        let moves = mover.queue_pass(&mut index, &mut rng);
        assert_eq!(moves, 4);
        assert_eq!(index.belongings(), &[1, 1, 1, 5, 5, 5]);
        assert_eq!(index.community_count(), 2);
        assert_eq!(mover.nodes_visited, 7);

        index.zoom_out();
        assert_eq!(mover.queue_pass(&mut index, &mut rng), 0);
    }

    #[test]
    fn sweep_pass_ends_with_an_empty_sweep() {
        let graph = two_triangles();
        let mut index = UndirectedIndex::new(&graph, 1.0, None).unwrap();
        let mut mover = LocalMover::new(index.node_count(), false);
        let mut rng = FnSource(|| 0.0);

        let sweeps = mover.sweep_pass(&mut index, &mut rng);
        assert_eq!(sweeps.last(), Some(&0));
        assert!(sweeps[0] > 0);
        assert_eq!(index.community_count(), 2);
        assert_eq!(mover.nodes_visited, 6 * sweeps.len());
    }

    #[test]
    fn both_traversals_find_the_triangles() {
        let graph = two_triangles();
        for fast in [true, false] {
            let options = fixed().with_fast_local_moves(fast);
            let report = louvain_detailed(&graph, &options).unwrap();

            assert_eq!(report.count, 2);
            assert_eq!(report.level, 1);
            let mapping: Vec<usize> = report.communities.values().copied().collect();
            assert_eq!(mapping, vec![0, 0, 0, 1, 1, 1]);
            assert!((report.modularity - 5.0 / 14.0).abs() < 1e-9);

            let dendrogram = report.dendrogram.unwrap();
            assert_eq!(dendrogram.len(), 2);
            assert_eq!(dendrogram[0], vec![0, 1, 2, 3, 4, 5]);
            assert_eq!(dendrogram[1], mapping);

            match report.moves.unwrap() {
                MoveHistory::Queue(passes) => {
                    assert!(fast);
                    assert_eq!(passes, vec![4, 0]);
                }
                MoveHistory::Sweep(passes) => {
                    assert!(!fast);
                    assert_eq!(passes.len(), 2);
                    assert_eq!(passes[1], vec![0]);
                }
            }
        }
    }

    #[test]
    fn directed_graphs_use_the_directed_index() {
        let graph = DiGraph::<(), ()>::from_edges([
            (0, 1),
            (1, 2),
            (2, 0),
            (3, 4),
            (4, 5),
            (5, 3),
            (2, 3),
        ]);
        let report = louvain_detailed(&graph, &fixed()).unwrap();
        assert_eq!(report.count, 2);
        let mapping: Vec<usize> = report.communities.values().copied().collect();
        assert_eq!(mapping[0], mapping[1]);
        assert_eq!(mapping[1], mapping[2]);
        assert_eq!(mapping[3], mapping[4]);
        assert_eq!(mapping[4], mapping[5]);
        assert_ne!(mapping[0], mapping[3]);
    }

    #[test]
    fn edgeless_graph_short_circuits() {
        let mut graph = UnGraph::<(), ()>::new_undirected();
        for _ in 0..4 {
            graph.add_node(());
        }
        let report = louvain_detailed(&graph, &LouvainOptions::new()).unwrap();
        assert_eq!(report.count, 4);
        assert!(report.modularity.is_nan());
        assert!(report.dendrogram.is_none());
        assert!(report.moves.is_none());
        assert_eq!(report.communities.values().copied().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn invalid_resolution_is_rejected_first() {
        let graph = two_triangles();
        let err = louvain(&graph, &LouvainOptions::new().with_resolution(-1.0)).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn injected_source_drives_the_start_node() {
        let graph = two_triangles();
        let options = LouvainOptions::new();
        let mut first = FnSource(|| 0.5);
        let mut second = FnSource(|| 0.5);
        let a = louvain_with_rng(&graph, &options, &mut first).unwrap();
        let b = louvain_with_rng(&graph, &options, &mut second).unwrap();
        assert_eq!(a, b);
    }

    // Three loose blocks of ten nodes, random positive weights, some self-loops.
    fn noisy_edges(seed: u64) -> Vec<(u32, u32, f64)> {
        let mut rng = build_rng(Some(seed));
        let mut edges = Vec::new();
        for u in 0..30u32 {
            for v in u..30 {
                let p = if u == v {
                    0.2
                } else if u / 10 == v / 10 {
                    0.4
                } else {
                    0.05
                };
                if rng.random::<f64>() < p {
                    edges.push((u, v, 0.5 + 4.0 * rng.random::<f64>()));
                }
            }
        }
        edges
    }

    fn assert_counts_consistent(core: &IndexCore<NodeIndex>) {
        assert_eq!(core.counts().iter().sum::<usize>(), core.node_count());
        for &id in core.unused() {
            assert_eq!(core.counts()[id], 0, "free id {id} still has members");
        }
        for &community in core.belongings() {
            assert!(core.counts()[community] > 0);
        }
    }

    fn assert_conserved(index: &UndirectedIndex<NodeIndex>) {
        let m = index.total_weight();
        let total: f64 = index.total_weights().iter().sum();
        assert!((total - 2.0 * m).abs() < 1e-9 * m);
        assert_counts_consistent(index);
    }

    fn assert_conserved_directed(index: &DirectedIndex<NodeIndex>) {
        let m = index.total_weight();
        let total_in: f64 = index.total_in_weights().iter().sum();
        let total_out: f64 = index.total_out_weights().iter().sum();
        assert!((total_in - m).abs() < 1e-9 * m);
        assert!((total_out - m).abs() < 1e-9 * m);
        assert_counts_consistent(index);
    }

    #[test]
    fn local_moves_conserve_community_totals() {
        for seed in 0..10 {
            let graph = UnGraph::<(), f64>::from_edges(noisy_edges(seed));
            for resolution in [0.5, 1.0, 2.0] {
                let mut index = UndirectedIndex::new(&graph, resolution, Some("weight")).unwrap();
                let mut mover = LocalMover::new(index.node_count(), true);
                let mut rng = build_rng(Some(seed));
                assert_conserved(&index);

                loop {
                    let moves = mover.queue_pass(&mut index, &mut rng);
                    assert_conserved(&index);
                    if moves == 0 {
                        break;
                    }
                    index.zoom_out();
                    assert_conserved(&index);
                }
            }
        }
    }

    #[test]
    fn directed_local_moves_conserve_community_totals() {
        for seed in 0..10 {
            let graph = DiGraph::<(), f64>::from_edges(noisy_edges(seed));
            for resolution in [0.5, 1.0, 2.0] {
                let mut index = DirectedIndex::new(&graph, resolution, Some("weight")).unwrap();
                let mut mover = LocalMover::new(index.node_count(), true);
                let mut rng = build_rng(Some(seed));
                assert_conserved_directed(&index);

                loop {
                    let moves = mover.queue_pass(&mut index, &mut rng);
                    assert_conserved_directed(&index);
                    if moves == 0 {
                        break;
                    }
                    index.zoom_out();
                    assert_conserved_directed(&index);
                }
            }
        }
    }
}
