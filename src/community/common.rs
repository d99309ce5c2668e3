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

//! Common utilities for community detection algorithms.
//!
//! This module provides shared functionality used by Louvain and Leiden: the
//! injected random source, traversal helpers, the move tie breaker and label
//! grouping.

use std::hash::Hash;

use foldhash::{HashMap, HashMapExt};
use rand::{Rng, RngCore, SeedableRng};
use rand_pcg::Pcg64;

// ============================================================================
// RNG Utilities
// ============================================================================

/// A source of uniform floats in `[0, 1)`.
///
/// Every random decision of a run goes through this capability, so runs are
/// reproducible given a deterministic source. Any `rand` generator is a
/// `RandomSource`; closures can be wrapped in [`FnSource`].
pub trait RandomSource {
    fn next_f64(&mut self) -> f64;
}

impl<R: RngCore> RandomSource for R {
    #[inline]
    fn next_f64(&mut self) -> f64 {
        self.random::<f64>()
    }
}

/// Adapter turning a zero-argument closure into a [`RandomSource`].
pub struct FnSource<F>(pub F);

impl<F: FnMut() -> f64> RandomSource for FnSource<F> {
    #[inline]
    fn next_f64(&mut self) -> f64 {
        (self.0)()
    }
}

/// Type alias for RNG used in community detection algorithms.
/// Uses Pcg64 for fast, high-quality random numbers (matches rest of rustworkx).
pub type CommunityRng = Pcg64;

/// Build RNG from optional seed.
///
/// If seed is provided, creates a deterministic RNG seeded with that value.
/// Otherwise, creates an RNG seeded from the operating system's entropy source.
#[inline]
pub fn build_rng(seed: Option<u64>) -> CommunityRng {
    match seed {
        Some(s) => Pcg64::seed_from_u64(s),
        None => Pcg64::from_os_rng(),
    }
}

/// Uniform index in `[0, n)`.
#[inline]
pub(crate) fn random_index(rng: &mut dyn RandomSource, n: usize) -> usize {
    debug_assert!(n > 0);
    let i = (rng.next_f64() * n as f64).floor() as usize;
    i.min(n - 1)
}

/// Uniform integer in `[a, b]`.
#[inline]
pub(crate) fn random_in_range(rng: &mut dyn RandomSource, a: usize, b: usize) -> usize {
    debug_assert!(a <= b);
    a + random_index(rng, b - a + 1)
}

// ============================================================================
// Move selection
// ============================================================================

const EPSILON: f64 = 1e-10;

/// Decide whether `target_community` should replace `best_community`.
///
/// Near-equal deltas keep the node in its current community; between two
/// other candidates the higher community id wins.
#[inline]
pub(crate) fn tie_breaker(
    best_community: usize,
    current_community: usize,
    target_community: usize,
    delta: f64,
    best_delta: f64,
) -> bool {
    if (delta - best_delta).abs() < EPSILON {
        if best_community == current_community {
            false
        } else {
            target_community > best_community
        }
    } else {
        delta > best_delta
    }
}

// ============================================================================
// Label/Community Grouping
// ============================================================================

/// Group nodes by their labels into communities.
///
/// Takes `(node, label)` pairs and returns the communities, each a vector of
/// nodes in input order. Communities are sorted by their first member.
pub fn group_by_labels<K, I>(labels: I) -> Vec<Vec<K>>
where
    K: Copy + Eq + Hash,
    I: IntoIterator<Item = (K, usize)>,
{
    let mut comms: HashMap<usize, (usize, Vec<K>)> = HashMap::new();
    for (position, (node, label)) in labels.into_iter().enumerate() {
        comms
            .entry(label)
            .or_insert_with(|| (position, Vec::new()))
            .1
            .push(node);
    }
    // Sort communities by the position of their first member for deterministic
    // output order.
    let mut result: Vec<(usize, Vec<K>)> = comms.into_values().collect();
    result.sort_unstable_by_key(|(first, _)| *first);
    result.into_iter().map(|(_, comm)| comm).collect()
}
