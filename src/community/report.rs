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

use indexmap::IndexMap;
use serde::{Serialize, Serializer};

use super::common::group_by_labels;

/// Number of moves made by the local moving phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MoveHistory {
    /// Queue-driven moves: one count per outer pass.
    Queue(Vec<usize>),
    /// Sweeps: per outer pass, one count per sweep. The last sweep of a pass
    /// is the one that made no move.
    Sweep(Vec<Vec<usize>>),
}

impl MoveHistory {
    /// Total number of moves.
    pub fn total(&self) -> usize {
        match self {
            MoveHistory::Queue(passes) => passes.iter().sum(),
            MoveHistory::Sweep(passes) => passes.iter().flatten().sum(),
        }
    }

    /// Number of outer passes.
    pub fn passes(&self) -> usize {
        match self {
            MoveHistory::Queue(passes) => passes.len(),
            MoveHistory::Sweep(passes) => passes.len(),
        }
    }
}

/// Outcome of a run together with its diagnostics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedReport<K: Hash + Eq> {
    /// Number of communities.
    pub count: usize,
    pub delta_computations: usize,
    /// Original node position → community at each level, level 0 being the
    /// identity. `None` for graphs without edges.
    pub dendrogram: Option<Vec<Vec<usize>>>,
    /// Number of coarsening steps.
    pub level: usize,
    /// NaN for graphs without edges, serialized as `null`.
    #[serde(serialize_with = "serialize_finite")]
    pub modularity: f64,
    pub moves: Option<MoveHistory>,
    pub nodes_visited: usize,
    pub resolution: f64,
    pub communities: IndexMap<K, usize>,
}

impl<K: Hash + Eq + Copy> DetailedReport<K> {
    /// Report of a graph without edges: every node is its own community.
    pub(crate) fn trivial(nodes: impl IntoIterator<Item = K>, resolution: f64) -> Self {
        let communities: IndexMap<K, usize> = nodes
            .into_iter()
            .enumerate()
            .map(|(community, node)| (node, community))
            .collect();

        DetailedReport {
            count: communities.len(),
            delta_computations: 0,
            dendrogram: None,
            level: 0,
            modularity: f64::NAN,
            moves: None,
            nodes_visited: 0,
            resolution,
            communities,
        }
    }

    /// Members of each community, in order of first appearance.
    pub fn groups(&self) -> Vec<Vec<K>> {
        group_by_labels(self.communities.iter().map(|(&node, &c)| (node, c)))
    }
}

fn serialize_finite<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else {
        serializer.serialize_none()
    }
}
