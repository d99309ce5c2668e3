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

use thiserror::Error;

/// Result alias used by every fallible entry point of this crate.
pub type Result<T> = std::result::Result<T, CommunityError>;

/// Errors raised before any community detection state is built.
///
/// None of these are transient: a run either completes with a valid
/// partition or fails up front without touching the input graph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommunityError {
    /// The graph (or a partition over it) is malformed.
    #[error("invalid graph: {0}")]
    InvalidGraph(String),

    /// An option is out of its valid range.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        name: &'static str,
        message: String,
    },

    /// A weighted run found an edge weight it cannot use.
    #[error("invalid edge weight {weight}: community detection requires positive finite edge weights")]
    InvalidWeight { weight: f64 },

    /// The graph shape is not supported by the requested algorithm.
    #[error("unsupported graph kind: {0}")]
    UnsupportedGraphKind(String),
}

impl CommunityError {
    /// Whether the error belongs to the validation family (malformed input),
    /// as opposed to a graph kind the algorithm does not handle.
    pub fn is_validation(&self) -> bool {
        !matches!(self, CommunityError::UnsupportedGraphKind(_))
    }
}
