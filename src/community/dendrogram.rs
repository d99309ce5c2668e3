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

use serde::Serialize;

/// Append-only log of the coarsening steps of a run.
///
/// Level `k + 1` is obtained from level `k` through `remaps[k]`, which maps
/// every node of level `k` to its node (community) at level `k + 1`. Level 0
/// is the input graph itself, so the domain of `remaps[0]` is the original
/// node range and the domain of `remaps[k + 1]` is the range of `remaps[k]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Dendrogram {
    order: usize,
    remaps: Vec<Vec<usize>>,
}

impl Dendrogram {
    /// Dendrogram of a graph with `order` nodes, holding level 0 only.
    pub fn new(order: usize) -> Self {
        Dendrogram {
            order,
            remaps: Vec::new(),
        }
    }

    /// Number of nodes of the original graph.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Index of the deepest recorded level.
    pub fn level(&self) -> usize {
        self.remaps.len()
    }

    /// Record one coarsening step.
    pub(crate) fn push(&mut self, remap: Vec<usize>) {
        debug_assert_eq!(
            remap.len(),
            self.remaps.last().map_or(self.order, |previous| {
                previous.iter().copied().max().map_or(0, |max| max + 1)
            })
        );
        self.remaps.push(remap);
    }

    /// Remap applied when going from `level` to `level + 1`.
    pub fn remap(&self, level: usize) -> Option<&[usize]> {
        self.remaps.get(level).map(Vec::as_slice)
    }

    /// Original node position → node id at `level`, composing remaps from
    /// level 0 upwards. Levels past the deepest one are clamped.
    pub fn project(&self, level: usize) -> Vec<usize> {
        let level = level.min(self.remaps.len());
        let mut mapping: Vec<usize> = (0..self.order).collect();
        for remap in &self.remaps[..level] {
            for community in mapping.iter_mut() {
                *community = remap[*community];
            }
        }
        mapping
    }

    /// Projections of every level, level 0 (identity) first.
    pub fn levels(&self) -> Vec<Vec<usize>> {
        let mut levels = Vec::with_capacity(self.remaps.len() + 1);
        let mut mapping: Vec<usize> = (0..self.order).collect();
        levels.push(mapping.clone());
        for remap in &self.remaps {
            for community in mapping.iter_mut() {
                *community = remap[*community];
            }
            levels.push(mapping.clone());
        }
        levels
    }
}
