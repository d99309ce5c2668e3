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

//! Louvain and Leiden community detection.
//!
//! Both algorithms run over a [`NeighborhoodIndex`](index) built from any
//! [`GraphView`](crate::graph::GraphView) and return the community of every
//! node, write it back onto the graph (`*_assign`), or return a
//! [`DetailedReport`] (`*_detailed`).

mod common;
mod dendrogram;
pub mod index;
pub mod leiden;
pub mod louvain;
mod modularity;
mod options;
mod report;
mod sparse;

use std::hash::Hash;

use indexmap::IndexMap;

pub use common::{build_rng, group_by_labels, CommunityRng, FnSource, RandomSource};
pub use dendrogram::Dendrogram;
pub use index::{DirectedIndex, UndirectedIndex};
pub use leiden::{
    leiden, leiden_assign, leiden_assign_detailed, leiden_assign_detailed_with_rng,
    leiden_assign_with_rng, leiden_detailed, leiden_detailed_with_rng, leiden_with_rng,
};
pub use louvain::{
    louvain, louvain_assign, louvain_assign_detailed, louvain_assign_detailed_with_rng,
    louvain_assign_with_rng, louvain_detailed, louvain_detailed_with_rng, louvain_with_rng,
};
pub use modularity::modularity;
pub use options::{Attributes, LeidenOptions, LouvainOptions, ModularityOptions};
pub use report::{DetailedReport, MoveHistory};

/// Group a node → community mapping into member lists, ordered by the first
/// appearance of each community.
///
/// ```
/// use indexmap::IndexMap;
/// use rustworkx_community::community::communities;
///
/// let mapping: IndexMap<&str, usize> = [("a", 1), ("b", 0), ("c", 1)].into_iter().collect();
/// assert_eq!(communities(&mapping), vec![vec!["a", "c"], vec!["b"]]);
/// ```
pub fn communities<K: Copy + Eq + Hash>(mapping: &IndexMap<K, usize>) -> Vec<Vec<K>> {
    group_by_labels(mapping.iter().map(|(&node, &community)| (node, community)))
}
