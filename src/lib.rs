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

//! Modularity-based community detection for petgraph graphs.
//!
//! ```
//! use petgraph::graph::UnGraph;
//! use rustworkx_community::community::{louvain_detailed, LouvainOptions};
//!
//! let graph = UnGraph::<(), ()>::from_edges([(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3), (2, 3)]);
//! let report = louvain_detailed(&graph, &LouvainOptions::new().with_seed(1)).unwrap();
//! assert_eq!(report.count, 2);
//! ```

pub mod community;
pub mod error;
pub mod graph;

pub use error::{CommunityError, Result};
pub use graph::{GraphKind, GraphView, GraphViewMut};
