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

#![allow(dead_code)]

use indexmap::IndexMap;
use petgraph::graph::{DiGraph, NodeIndex, UnGraph};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use rustworkx_community::graph::{EdgeEntry, GraphView};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Two triangles {0, 1, 2} and {3, 4, 5} bridged by 2 - 4.
pub fn two_triangles() -> UnGraph<(), ()> {
    UnGraph::from_edges([(0, 1), (0, 2), (1, 2), (3, 4), (3, 5), (4, 5), (2, 4)])
}

/// Three 4-cliques joined in a ring by single edges.
pub fn clique_ring() -> UnGraph<(), ()> {
    let mut edges = Vec::new();
    for clique in 0..3u32 {
        let base = clique * 4;
        for a in 0..4 {
            for b in (a + 1)..4 {
                edges.push((base + a, base + b));
            }
        }
    }
    edges.extend([(3, 4), (7, 8), (11, 0)]);
    UnGraph::from_edges(edges)
}

/// Planted partition: `groups` blocks of `size` nodes, each intra-block pair
/// linked with probability `p_in` and each other pair with `p_out`.
pub fn planted_partition(
    groups: usize,
    size: usize,
    p_in: f64,
    p_out: f64,
    seed: u64,
) -> UnGraph<(), ()> {
    let mut rng = Pcg64::seed_from_u64(seed);
    let order = groups * size;
    let mut graph = UnGraph::with_capacity(order, 0);
    let nodes: Vec<NodeIndex> = (0..order).map(|_| graph.add_node(())).collect();

    for u in 0..order {
        for v in (u + 1)..order {
            let p = if u / size == v / size { p_in } else { p_out };
            if rng.random::<f64>() < p {
                graph.add_edge(nodes[u], nodes[v], ());
            }
        }
    }
    graph
}

/// Directed planted partition with arcs drawn independently both ways.
pub fn directed_planted_partition(
    groups: usize,
    size: usize,
    p_in: f64,
    p_out: f64,
    seed: u64,
) -> DiGraph<(), ()> {
    let mut rng = Pcg64::seed_from_u64(seed);
    let order = groups * size;
    let mut graph = DiGraph::with_capacity(order, 0);
    let nodes: Vec<NodeIndex> = (0..order).map(|_| graph.add_node(())).collect();

    for u in 0..order {
        for v in 0..order {
            if u == v {
                continue;
            }
            let p = if u / size == v / size { p_in } else { p_out };
            if rng.random::<f64>() < p {
                graph.add_edge(nodes[u], nodes[v], ());
            }
        }
    }
    graph
}

pub fn distinct(mapping: &IndexMap<NodeIndex, usize>) -> usize {
    let mut labels: Vec<usize> = mapping.values().copied().collect();
    labels.sort_unstable();
    labels.dedup();
    labels.len()
}

/// Minimal graph holding edges of both kinds.
pub struct MixedGraph {
    pub order: u32,
    pub edges: Vec<(u32, u32, bool)>,
}

impl GraphView for MixedGraph {
    type NodeId = u32;
    type EdgeData = ();

    fn node_count(&self) -> usize {
        self.order as usize
    }

    fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn contains_node(&self, node: u32) -> bool {
        node < self.order
    }

    fn node_ids(&self) -> impl Iterator<Item = u32> + '_ {
        0..self.order
    }

    fn edge_entries(&self) -> impl Iterator<Item = EdgeEntry<'_, u32, ()>> + '_ {
        self.edges
            .iter()
            .map(|&(source, target, undirected)| EdgeEntry {
                source,
                target,
                undirected,
                attributes: &(),
            })
    }
}
