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

//! Run configuration.
//!
//! Options deserialize from the camelCase names used in JSON configs, e.g.
//! `{"resolution": 2.0, "randomWalk": false, "attributes": {"weight": "w"}}`.
//! Missing fields take their defaults.

use serde::{Deserialize, Serialize};

use crate::error::{CommunityError, Result};

/// Names of the attributes read and written by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attributes {
    /// Node attribute receiving the community label in `assign` runs.
    pub community: String,
    /// Edge attribute holding the weight in weighted runs.
    pub weight: String,
}

impl Default for Attributes {
    fn default() -> Self {
        Attributes {
            community: "community".to_owned(),
            weight: "weight".to_owned(),
        }
    }
}

/// Options of the Louvain algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LouvainOptions {
    pub attributes: Attributes,
    /// Resolution parameter. Higher values yield smaller communities.
    pub resolution: f64,
    /// Start each pass at a random node instead of node 0.
    pub random_walk: bool,
    /// Queue-driven local moves (`true`) or full sweeps (`false`).
    pub fast_local_moves: bool,
    /// Read edge weights from `attributes.weight` instead of using 1.
    pub weighted: bool,
    /// Seed of the default random source. `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for LouvainOptions {
    fn default() -> Self {
        LouvainOptions {
            attributes: Attributes::default(),
            resolution: 1.0,
            random_walk: true,
            fast_local_moves: true,
            weighted: false,
            seed: None,
        }
    }
}

impl LouvainOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_random_walk(mut self, random_walk: bool) -> Self {
        self.random_walk = random_walk;
        self
    }

    pub fn with_fast_local_moves(mut self, fast_local_moves: bool) -> Self {
        self.fast_local_moves = fast_local_moves;
        self
    }

    /// Enable weighted mode, reading weights from `attribute`.
    pub fn with_weight_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.weighted = true;
        self.attributes.weight = attribute.into();
        self
    }

    pub fn with_weighted(mut self, weighted: bool) -> Self {
        self.weighted = weighted;
        self
    }

    pub fn with_community_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attributes.community = attribute.into();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        validate_resolution(self.resolution)
    }

    pub(crate) fn weight_attribute(&self) -> Option<&str> {
        self.weighted.then_some(self.attributes.weight.as_str())
    }
}

/// Options of the Leiden algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LeidenOptions {
    pub attributes: Attributes,
    pub resolution: f64,
    pub random_walk: bool,
    pub weighted: bool,
    /// Temperature of the randomized merge during refinement. Lower values
    /// approach a greedy merge.
    pub randomness: f64,
    pub seed: Option<u64>,
}

impl Default for LeidenOptions {
    fn default() -> Self {
        LeidenOptions {
            attributes: Attributes::default(),
            resolution: 1.0,
            random_walk: true,
            weighted: false,
            randomness: 0.01,
            seed: None,
        }
    }
}

impl LeidenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_random_walk(mut self, random_walk: bool) -> Self {
        self.random_walk = random_walk;
        self
    }

    pub fn with_randomness(mut self, randomness: f64) -> Self {
        self.randomness = randomness;
        self
    }

    pub fn with_weight_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.weighted = true;
        self.attributes.weight = attribute.into();
        self
    }

    pub fn with_weighted(mut self, weighted: bool) -> Self {
        self.weighted = weighted;
        self
    }

    pub fn with_community_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attributes.community = attribute.into();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        validate_resolution(self.resolution)?;
        if !(self.randomness.is_finite() && self.randomness > 0.0) {
            return Err(CommunityError::InvalidParameter {
                name: "randomness",
                message: format!("must be a positive finite number, got {}", self.randomness),
            });
        }
        Ok(())
    }

    pub(crate) fn weight_attribute(&self) -> Option<&str> {
        self.weighted.then_some(self.attributes.weight.as_str())
    }
}

/// Options of the standalone [`modularity`](crate::community::modularity) metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModularityOptions {
    pub resolution: f64,
    pub weighted: bool,
    pub weight_attribute: String,
}

impl Default for ModularityOptions {
    fn default() -> Self {
        ModularityOptions {
            resolution: 1.0,
            weighted: false,
            weight_attribute: "weight".to_owned(),
        }
    }
}

impl ModularityOptions {
    pub(crate) fn weight_attribute(&self) -> Option<&str> {
        self.weighted.then_some(self.weight_attribute.as_str())
    }
}

impl From<&LouvainOptions> for ModularityOptions {
    fn from(options: &LouvainOptions) -> Self {
        ModularityOptions {
            resolution: options.resolution,
            weighted: options.weighted,
            weight_attribute: options.attributes.weight.clone(),
        }
    }
}

impl From<&LeidenOptions> for ModularityOptions {
    fn from(options: &LeidenOptions) -> Self {
        ModularityOptions {
            resolution: options.resolution,
            weighted: options.weighted,
            weight_attribute: options.attributes.weight.clone(),
        }
    }
}

pub(crate) fn validate_resolution(resolution: f64) -> Result<()> {
    if resolution.is_finite() && resolution > 0.0 {
        Ok(())
    } else {
        Err(CommunityError::InvalidParameter {
            name: "resolution",
            message: format!("must be a positive finite number, got {resolution}"),
        })
    }
}
