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
// https://arxiv.org/abs/1810.08473

use std::hash::Hash;

use fixedbitset::FixedBitSet;
use indexmap::IndexMap;
use smallvec::SmallVec;

use super::common::{build_rng, random_in_range, RandomSource};
use super::index::{Snapshot, UndirectedIndex};
use super::louvain::{check_kind, Detection, LocalMover, RunStats};
use super::options::LeidenOptions;
use super::report::{DetailedReport, MoveHistory};
use super::sparse::SparseMap;
use crate::error::{CommunityError, Result};
use crate::graph::{GraphKind, GraphView, GraphViewMut};

/// Refined sub-communities of one macro-community.
type MicroCommunities = SmallVec<[usize; 4]>;

// ========================
// Refinement
// ========================

/// Refinement state layered over an undirected index.
///
/// All buffers are sized for the first level. Sub-community ids are node
/// positions: a sub-community is named after the node that founded it.
pub(crate) struct LeidenRefiner {
    resolution: f64,
    randomness: f64,

    // Nodes grouped by macro-community
    communities_offsets: Vec<usize>,
    nodes_sorted_by_communities: Vec<usize>,
    communities_bounds: Vec<usize>,
    macro_count: usize,

    // Sub-communities
    belongings: Vec<usize>,
    community_weights: Vec<f64>,
    external_edge_weights: Vec<f64>,
    micro_degrees: Vec<f64>,
    non_singleton: FixedBitSet,
    degrees: Vec<f64>,

    neighboring_communities: SparseMap<f64>,
    cumulative_increments: Vec<f64>,
    isolates: SparseMap<usize>,
    macro_communities: Vec<MicroCommunities>,
}

impl LeidenRefiner {
    pub(crate) fn new(capacity: usize, resolution: f64, randomness: f64) -> Self {
        LeidenRefiner {
            resolution,
            randomness,
            communities_offsets: vec![0; capacity],
            nodes_sorted_by_communities: vec![0; capacity],
            communities_bounds: vec![0; capacity + 1],
            macro_count: 0,
            belongings: vec![0; capacity],
            community_weights: vec![0.0; capacity],
            external_edge_weights: vec![0.0; capacity],
            micro_degrees: vec![0.0; capacity],
            non_singleton: FixedBitSet::with_capacity(capacity),
            degrees: vec![0.0; capacity],
            neighboring_communities: SparseMap::with_capacity(capacity),
            cumulative_increments: vec![0.0; capacity],
            isolates: SparseMap::with_capacity(capacity),
            macro_communities: Vec::new(),
        }
    }

    /// Counting sort of the nodes by community. Afterwards the members of
    /// the `b`-th live community are
    /// `nodes_sorted_by_communities[communities_bounds[b]..communities_bounds[b + 1]]`.
    pub(crate) fn group_by_communities<K: Copy + Eq + Hash>(
        &mut self,
        index: &UndirectedIndex<K>,
    ) {
        let order = index.node_count();
        let counts = index.counts();

        let mut n = 0;
        let mut o = 0;
        for (community, &count) in counts.iter().enumerate().take(order) {
            if count != 0 {
                self.communities_bounds[o] = n;
                o += 1;
                n += count;
                self.communities_offsets[community] = n;
            }
        }
        self.communities_bounds[o] = n;

        for (node, &community) in index.belongings().iter().enumerate() {
            self.communities_offsets[community] -= 1;
            self.nodes_sorted_by_communities[self.communities_offsets[community]] = node;
        }

        self.macro_count = o;
    }

    /// Nodes of the `b`-th live community, after
    /// [`group_by_communities`](Self::group_by_communities).
    #[cfg(test)]
    pub(crate) fn members(&self, b: usize) -> &[usize] {
        let (start, stop) = (self.communities_bounds[b], self.communities_bounds[b + 1]);
        &self.nodes_sorted_by_communities[start..stop]
    }

    /// Merge the nodes of one macro-community, `start..stop` of the sorted
    /// node list, into well-connected sub-communities. Returns the ids of
    /// the resulting sub-communities.
    fn merge_nodes_subset<K: Copy + Eq + Hash>(
        &mut self,
        index: &UndirectedIndex<K>,
        start: usize,
        stop: usize,
        rng: &mut dyn RandomSource,
    ) -> MicroCommunities {
        let macro_community = index.belongings()[self.nodes_sorted_by_communities[start]];
        let neighborhood = index.neighborhood();
        let weights = index.weights();
        let loops = index.loops();

        let mut total_node_weight = 0.0;

        for j in start..stop {
            let i = self.nodes_sorted_by_communities[j];

            self.belongings[i] = i;
            self.non_singleton.set(i, false);
            self.degrees[i] = 0.0;
            total_node_weight += loops[i] / 2.0;

            self.community_weights[i] = loops[i];
            self.external_edge_weights[i] = 0.0;

            for o in index.bounds(i) {
                let w = weights[o];
                self.degrees[i] += w;

                if index.belongings()[neighborhood[o]] != macro_community {
                    continue;
                }

                total_node_weight += w;
                self.external_edge_weights[i] += w;
                self.community_weights[i] += w;
            }

            self.micro_degrees[i] = self.external_edge_weights[i];
        }

        let order = stop - start;
        let mut ri = random_in_range(rng, start, stop - 1);

        for _ in start..stop {
            let j = start + ri % order;
            ri += 1;
            let i = self.nodes_sorted_by_communities[j];

            // Only singletons may move.
            if self.non_singleton.contains(i) {
                continue;
            }

            // The node must be well connected to the rest of its macro-community.
            let weight = self.community_weights[i];
            if self.external_edge_weights[i]
                < weight * (total_node_weight / 2.0 - weight) * self.resolution
            {
                continue;
            }

            self.community_weights[i] = 0.0;
            self.external_edge_weights[i] = 0.0;

            self.neighboring_communities.clear();
            self.neighboring_communities.set(i, 0.0);

            let mut degree = 0.0;
            for o in index.bounds(i) {
                let et = neighborhood[o];
                if index.belongings()[et] != macro_community {
                    continue;
                }

                let w = weights[o];
                degree += w;
                self.neighboring_communities.add(self.belongings[et], w);
            }

            let mut best_community = i;
            let mut max_increment = 0.0;
            let mut total_transformed_increment = 0.0;

            for ci in 0..self.neighboring_communities.len() {
                let (target, target_degree) = self.neighboring_communities.entry_at(ci);
                let target_weight = self.community_weights[target];

                if self.external_edge_weights[target]
                    >= target_weight * (total_node_weight / 2.0 - target_weight) * self.resolution
                {
                    let increment = target_degree
                        - (degree + loops[i]) * target_weight * self.resolution
                            / total_node_weight;

                    if increment > max_increment {
                        best_community = target;
                        max_increment = increment;
                    }

                    if increment >= 0.0 {
                        total_transformed_increment += (increment / self.randomness).exp();
                    }
                }

                self.cumulative_increments[ci] = total_transformed_increment;
            }

            let chosen = if total_transformed_increment.is_finite()
                && total_transformed_increment < f64::MAX
            {
                let size = self.neighboring_communities.len();
                let r = total_transformed_increment * rng.next_f64();
                let picked = self.cumulative_increments[..size].partition_point(|&c| c < r);
                self.neighboring_communities.entry_at(picked.min(size - 1)).0
            } else {
                best_community
            };

            self.community_weights[chosen] += degree + loops[i];

            for o in index.bounds(i) {
                let et = neighborhood[o];
                if index.belongings()[et] != macro_community {
                    continue;
                }

                if self.belongings[et] == chosen {
                    self.external_edge_weights[chosen] -= self.micro_degrees[et];
                } else {
                    self.external_edge_weights[chosen] += self.micro_degrees[et];
                }
            }

            if chosen != i {
                self.belongings[i] = chosen;
                self.non_singleton.insert(chosen);
            }
        }

        self.neighboring_communities.clear();
        for j in start..stop {
            let i = self.nodes_sorted_by_communities[j];
            self.neighboring_communities.set(self.belongings[i], 1.0);
        }

        self.neighboring_communities.keys().iter().copied().collect()
    }

    /// Refine every live community of `index`.
    pub(crate) fn refine_partition<K: Copy + Eq + Hash>(
        &mut self,
        index: &UndirectedIndex<K>,
        rng: &mut dyn RandomSource,
    ) {
        self.group_by_communities(index);
        self.macro_communities.clear();

        for b in 0..self.macro_count {
            let start = self.communities_bounds[b];
            let stop = self.communities_bounds[b + 1];
            let micro = self.merge_nodes_subset(index, start, stop, rng);
            self.macro_communities.push(micro);
        }
    }

    /// Sub-community ids of the `b`-th macro-community after refinement.
    #[cfg(test)]
    pub(crate) fn macro_communities(&self) -> &[MicroCommunities] {
        &self.macro_communities
    }

    /// Sub-community of `node` after refinement.
    #[cfg(test)]
    pub(crate) fn sub_community(&self, node: usize) -> usize {
        self.belongings[node]
    }

    /// Apply the refined partition to `index`: founders are isolated first,
    /// then their followers join them.
    pub(crate) fn split<K: Copy + Eq + Hash>(&mut self, index: &mut UndirectedIndex<K>) {
        let order = index.node_count();
        self.isolates.clear();

        for i in 0..order {
            let community = self.belongings[i];
            if i != community {
                continue;
            }

            let isolated = index.isolate(i, self.degrees[i]);
            self.isolates.set(community, isolated);
        }

        for i in 0..order {
            let community = self.belongings[i];
            if i == community {
                continue;
            }

            if let Some(isolated) = self.isolates.get(community) {
                index.move_node(i, self.degrees[i], isolated);
            }
        }

        for micro in self.macro_communities.iter_mut() {
            for community in micro.iter_mut() {
                if let Some(isolated) = self.isolates.get(*community) {
                    *community = isolated;
                }
            }
        }
    }

    /// Refine, coarsen along the refined partition, then regroup the new
    /// nodes by macro-community.
    pub(crate) fn zoom_out<K: Copy + Eq + Hash>(
        &mut self,
        index: &mut UndirectedIndex<K>,
        rng: &mut dyn RandomSource,
    ) {
        self.refine_partition(index, rng);
        self.split(index);

        let new_labels = index.zoom_out();

        for micro in &self.macro_communities {
            let Some((&first, followers)) = micro.split_first() else {
                continue;
            };
            let leader = new_labels[first];

            for &follower in followers {
                index.expensive_move(new_labels[follower], leader);
            }
        }
    }

    /// Whether every live community of `index` holds a single node.
    pub(crate) fn only_singletons<K: Copy + Eq + Hash>(
        &self,
        index: &UndirectedIndex<K>,
    ) -> bool {
        index.counts().iter().all(|&count| count <= 1)
    }
}

// ========================
// Driver
// ========================

fn optimize<K: Copy + Eq + Hash>(
    index: &mut UndirectedIndex<K>,
    options: &LeidenOptions,
    rng: &mut dyn RandomSource,
) -> RunStats {
    let mut mover = LocalMover::new(index.node_count(), options.random_walk);
    let mut refiner =
        LeidenRefiner::new(index.node_count(), options.resolution, options.randomness);
    let mut passes = Vec::new();

    loop {
        let moves = mover.queue_pass(index, rng);
        log::trace!(
            "leiden pass {}: {} moves over {} nodes",
            passes.len(),
            moves,
            index.node_count()
        );
        passes.push(moves);

        if moves == 0 {
            index.zoom_out();
            break;
        }

        if refiner.only_singletons(index) {
            break;
        }

        refiner.zoom_out(index, rng);
    }

    RunStats::new(&mover, MoveHistory::Queue(passes))
}

fn detect<G: GraphView>(
    graph: &G,
    options: &LeidenOptions,
    rng: &mut dyn RandomSource,
) -> Result<Detection<G::NodeId>> {
    options.validate()?;
    if check_kind(graph, "leiden")? == GraphKind::Directed {
        return Err(CommunityError::UnsupportedGraphKind(
            "leiden is not implemented for directed graphs".to_owned(),
        ));
    }

    if graph.edge_count() == 0 {
        return Ok(Detection::Empty(graph.node_ids().collect()));
    }

    let snapshot = Snapshot::take(graph, options.weight_attribute())?;
    log::debug!(
        "leiden on undirected graph: {} nodes, {} edges, resolution {}, randomness {}",
        snapshot.nodes.len(),
        snapshot.edges.len(),
        options.resolution,
        options.randomness
    );

    let mut index = UndirectedIndex::from_snapshot(snapshot, options.resolution);
    let stats = optimize(&mut index, options, rng);
    let detection = Detection::Undirected(index, stats);
    detection.log_summary("leiden");

    Ok(detection)
}

// ========================
// Public API
// ========================

/// Detect communities with the Leiden method.
///
/// Same output as [`louvain`](super::louvain::louvain), with communities
/// guaranteed to be well connected. Only undirected graphs are supported.
///
/// # Errors
///
/// * [`CommunityError::InvalidParameter`] for a non-positive resolution or
///   randomness
/// * [`CommunityError::UnsupportedGraphKind`] for a directed or mixed graph
/// * [`CommunityError::InvalidGraph`] or [`CommunityError::InvalidWeight`]
///   when the graph cannot be indexed
pub fn leiden<G: GraphView>(
    graph: &G,
    options: &LeidenOptions,
) -> Result<IndexMap<G::NodeId, usize>> {
    let mut rng = build_rng(options.seed);
    leiden_with_rng(graph, options, &mut rng)
}

pub fn leiden_with_rng<G: GraphView>(
    graph: &G,
    options: &LeidenOptions,
    rng: &mut dyn RandomSource,
) -> Result<IndexMap<G::NodeId, usize>> {
    Ok(detect(graph, options, rng)?.collect())
}

pub fn leiden_assign<G: GraphViewMut>(graph: &mut G, options: &LeidenOptions) -> Result<()> {
    let mut rng = build_rng(options.seed);
    leiden_assign_with_rng(graph, options, &mut rng)
}

pub fn leiden_assign_with_rng<G: GraphViewMut>(
    graph: &mut G,
    options: &LeidenOptions,
    rng: &mut dyn RandomSource,
) -> Result<()> {
    let detection = detect(graph, options, rng)?;
    detection.assign(graph, &options.attributes.community);
    Ok(())
}

pub fn leiden_detailed<G: GraphView>(
    graph: &G,
    options: &LeidenOptions,
) -> Result<DetailedReport<G::NodeId>> {
    let mut rng = build_rng(options.seed);
    leiden_detailed_with_rng(graph, options, &mut rng)
}

pub fn leiden_detailed_with_rng<G: GraphView>(
    graph: &G,
    options: &LeidenOptions,
    rng: &mut dyn RandomSource,
) -> Result<DetailedReport<G::NodeId>> {
    Ok(detect(graph, options, rng)?.into_report(options.resolution))
}

pub fn leiden_assign_detailed<G: GraphViewMut>(
    graph: &mut G,
    options: &LeidenOptions,
) -> Result<DetailedReport<G::NodeId>> {
    let mut rng = build_rng(options.seed);
    leiden_assign_detailed_with_rng(graph, options, &mut rng)
}

pub fn leiden_assign_detailed_with_rng<G: GraphViewMut>(
    graph: &mut G,
    options: &LeidenOptions,
    rng: &mut dyn RandomSource,
) -> Result<DetailedReport<G::NodeId>> {
    let detection = detect(graph, options, rng)?;
    detection.assign(graph, &options.attributes.community);
    Ok(detection.into_report(options.resolution))
}
