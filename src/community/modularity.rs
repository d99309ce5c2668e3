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

use foldhash::{HashMap, HashMapExt};

use super::index::{Snapshot, UNASSIGNED};
use super::options::{validate_resolution, ModularityOptions};
use crate::error::{CommunityError, Result};
use crate::graph::{GraphKind, GraphView};

fn invalid_partition(message: String) -> CommunityError {
    CommunityError::InvalidParameter {
        name: "communities",
        message,
    }
}

/// Modularity of `communities` over `graph`, computed straight from the
/// edge list.
///
/// Undirected graphs use `Q = Σ_c [L_c / M - γ (K_c / 2M)²]` and directed
/// graphs `Q = Σ_c [L_c / M - γ K_c^in K_c^out / M²]`, where `M` is the
/// total edge weight, `L_c` the weight inside community `c` and `K_c` the
/// summed degrees of its members. NaN for a graph without edges.
///
/// # Errors
///
/// The partition must cover every node of the graph exactly once, otherwise
/// [`CommunityError::InvalidParameter`] is returned.
pub fn modularity<G: GraphView>(
    graph: &G,
    communities: &[Vec<G::NodeId>],
    options: &ModularityOptions,
) -> Result<f64> {
    validate_resolution(options.resolution)?;
    let kind = graph.kind();
    if kind == GraphKind::Mixed {
        return Err(CommunityError::UnsupportedGraphKind(
            "modularity is undefined on a graph mixing directed and undirected edges".to_owned(),
        ));
    }

    let Snapshot { nodes, edges } = Snapshot::take(graph, options.weight_attribute())?;

    let mut positions = HashMap::with_capacity(nodes.len());
    for (i, &node) in nodes.iter().enumerate() {
        positions.insert(node, i);
    }

    // Validate partition and build the node to community mapping
    let mut node_to_comm = vec![UNASSIGNED; nodes.len()];
    for (cid, community) in communities.iter().enumerate() {
        for node in community {
            let Some(&i) = positions.get(node) else {
                return Err(invalid_partition(format!(
                    "node {node:?} is not part of the graph"
                )));
            };
            if node_to_comm[i] != UNASSIGNED {
                return Err(invalid_partition(format!(
                    "node {node:?} belongs to more than one community"
                )));
            }
            node_to_comm[i] = cid;
        }
    }
    if node_to_comm.contains(&UNASSIGNED) {
        return Err(invalid_partition(
            "the communities do not cover every node of the graph".to_owned(),
        ));
    }

    let gamma = options.resolution;
    let m: f64 = edges.iter().map(|&(_, _, w)| w).sum();
    if m == 0.0 {
        return Ok(f64::NAN);
    }

    let count = communities.len();
    let mut internal = vec![0.0; count];

    let q = if kind == GraphKind::Directed {
        let mut k_in = vec![0.0; count];
        let mut k_out = vec![0.0; count];
        for &(u, v, w) in &edges {
            let (cu, cv) = (node_to_comm[u], node_to_comm[v]);
            k_out[cu] += w;
            k_in[cv] += w;
            if cu == cv {
                internal[cu] += w;
            }
        }
        (0..count)
            .map(|c| internal[c] / m - gamma * k_in[c] * k_out[c] / (m * m))
            .sum()
    } else {
        let mut k = vec![0.0; count];
        for &(u, v, w) in &edges {
            let (cu, cv) = (node_to_comm[u], node_to_comm[v]);
            k[cu] += w;
            k[cv] += w;
            if cu == cv {
                internal[cu] += w;
            }
        }
        (0..count)
            .map(|c| internal[c] / m - gamma * (k[c] / (2.0 * m)).powi(2))
            .sum()
    };

    Ok(q)
}
