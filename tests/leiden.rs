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

mod common;

use std::collections::{HashSet, VecDeque};

use petgraph::graph::{DiGraph, NodeIndex, UnGraph};
use petgraph::stable_graph::StableUnGraph;
use rustworkx_community::community::{
    communities, leiden, leiden_assign, leiden_detailed, louvain_detailed, modularity,
    LeidenOptions, LouvainOptions, ModularityOptions,
};
use rustworkx_community::CommunityError;
use serde_json::{json, Value};

use common::{clique_ring, distinct, init_logging, planted_partition, two_triangles};

fn is_connected(graph: &UnGraph<(), ()>, members: &[NodeIndex]) -> bool {
    let inside: HashSet<NodeIndex> = members.iter().copied().collect();
    let mut seen = HashSet::from([members[0]]);
    let mut queue = VecDeque::from([members[0]]);
    while let Some(node) = queue.pop_front() {
        for neighbor in graph.neighbors(node) {
            if inside.contains(&neighbor) && seen.insert(neighbor) {
                queue.push_back(neighbor);
            }
        }
    }
    seen.len() == inside.len()
}

#[test]
fn clique_ring_recovers_the_cliques() {
    init_logging();
    let graph = clique_ring();
    let options = LeidenOptions::new().with_random_walk(false).with_seed(1);
    let report = leiden_detailed(&graph, &options).unwrap();

    assert_eq!(report.count, 3);
    assert!((report.modularity - 0.524).abs() < 1e-3);
    for clique in report.groups() {
        assert_eq!(clique.len(), 4);
    }
}

#[test]
fn communities_are_connected() {
    init_logging();
    let graph = planted_partition(10, 40, 0.2, 0.01, 21);
    for seed in [1, 2, 3] {
        let options = LeidenOptions::new().with_seed(seed);
        let report = leiden_detailed(&graph, &options).unwrap();
        for members in report.groups() {
            assert!(is_connected(&graph, &members));
        }

        let naive = modularity(
            &graph,
            &communities(&report.communities),
            &ModularityOptions::from(&options),
        )
        .unwrap();
        assert!((report.modularity - naive).abs() < 1e-4);
    }
}

#[test]
fn quality_is_on_par_with_louvain() {
    let graph = planted_partition(10, 40, 0.2, 0.01, 21);
    let leiden = leiden_detailed(&graph, &LeidenOptions::new().with_seed(8)).unwrap();
    let louvain = louvain_detailed(&graph, &LouvainOptions::new().with_seed(8)).unwrap();
    assert!(leiden.modularity > 0.5);
    assert!(leiden.modularity >= louvain.modularity - 0.05);
}

#[test]
fn randomness_only_changes_refinement() {
    let graph = two_triangles();
    for randomness in [0.001, 0.01, 1.0] {
        let options = LeidenOptions::new()
            .with_randomness(randomness)
            .with_random_walk(false)
            .with_seed(3);
        let mapping = leiden(&graph, &options).unwrap();
        assert_eq!(distinct(&mapping), 2);
        assert_eq!(mapping[&NodeIndex::new(0)], mapping[&NodeIndex::new(2)]);
        assert_ne!(mapping[&NodeIndex::new(0)], mapping[&NodeIndex::new(4)]);
    }
}

#[test]
fn edgeless_graph_yields_singletons() {
    let mut graph = StableUnGraph::<(), ()>::default();
    let a = graph.add_node(());
    let b = graph.add_node(());
    let c = graph.add_node(());
    graph.remove_node(b);

    let report = leiden_detailed(&graph, &LeidenOptions::new()).unwrap();
    assert_eq!(report.count, 2);
    assert!(report.modularity.is_nan());
    assert_eq!(report.communities.keys().copied().collect::<Vec<_>>(), vec![a, c]);
}

#[test]
fn assign_writes_the_community_attribute() {
    let mut graph = UnGraph::<Value, ()>::default();
    let nodes: Vec<_> = (0..6).map(|_| graph.add_node(Value::Null)).collect();
    for (u, v) in [(0, 1), (0, 2), (1, 2), (3, 4), (3, 5), (4, 5), (2, 4)] {
        graph.add_edge(nodes[u], nodes[v], ());
    }
    let options = LeidenOptions::new().with_random_walk(false).with_seed(6);
    leiden_assign(&mut graph, &options).unwrap();

    let label = |i: usize| graph[nodes[i]]["community"].as_u64();
    assert!(label(0).is_some());
    assert_eq!(label(0), label(1));
    assert_eq!(label(3), label(5));
    assert_ne!(label(0), label(3));
    assert_eq!(graph[nodes[0]], json!({ "community": label(0) }));
}

#[test]
fn rejects_directed_graphs_and_bad_options() {
    let digraph = DiGraph::<(), ()>::from_edges([(0, 1), (1, 2), (2, 0)]);
    let err = leiden(&digraph, &LeidenOptions::new()).unwrap_err();
    assert!(matches!(err, CommunityError::UnsupportedGraphKind(_)));

    let graph = two_triangles();
    let err = leiden(&graph, &LeidenOptions::new().with_randomness(0.0)).unwrap_err();
    assert!(matches!(
        err,
        CommunityError::InvalidParameter {
            name: "randomness",
            ..
        }
    ));
    let err = leiden(&graph, &LeidenOptions::new().with_resolution(f64::NAN)).unwrap_err();
    assert!(matches!(
        err,
        CommunityError::InvalidParameter {
            name: "resolution",
            ..
        }
    ));
}
