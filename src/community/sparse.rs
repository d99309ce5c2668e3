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

//! Scratch structures keyed by small integers.
//!
//! Both are allocated once for the largest level and reused for every node
//! visit: clearing is O(1) and never frees memory.

use fixedbitset::FixedBitSet;

/// A map from keys in `[0, capacity)` to values, iterated in insertion order.
#[derive(Debug, Clone)]
pub(crate) struct SparseMap<V> {
    dense: Vec<usize>,
    sparse: Vec<usize>,
    vals: Vec<V>,
    size: usize,
}

impl<V: Copy + Default> SparseMap<V> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        SparseMap {
            dense: vec![0; capacity],
            sparse: vec![0; capacity],
            vals: vec![V::default(); capacity],
            size: 0,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.size
    }

    #[inline]
    pub(crate) fn clear(&mut self) {
        self.size = 0;
    }

    #[inline]
    pub(crate) fn contains(&self, key: usize) -> bool {
        let i = self.sparse[key];
        i < self.size && self.dense[i] == key
    }

    #[inline]
    pub(crate) fn get(&self, key: usize) -> Option<V> {
        if self.contains(key) {
            Some(self.vals[self.sparse[key]])
        } else {
            None
        }
    }

    #[inline]
    pub(crate) fn set(&mut self, key: usize, value: V) {
        if self.contains(key) {
            self.vals[self.sparse[key]] = value;
            return;
        }
        self.dense[self.size] = key;
        self.sparse[key] = self.size;
        self.vals[self.size] = value;
        self.size += 1;
    }

    /// Key and value of the `i`-th inserted entry.
    #[inline]
    pub(crate) fn entry_at(&self, i: usize) -> (usize, V) {
        debug_assert!(i < self.size);
        (self.dense[i], self.vals[i])
    }

    pub(crate) fn keys(&self) -> &[usize] {
        &self.dense[..self.size]
    }
}

impl SparseMap<f64> {
    /// Add `weight` to the value stored under `key`, inserting it if needed.
    #[inline]
    pub(crate) fn add(&mut self, key: usize, weight: f64) {
        let current = self.get(key).unwrap_or(0.0);
        self.set(key, current + weight);
    }
}

/// A FIFO queue over `[0, capacity)` holding each item at most once.
#[derive(Debug, Clone)]
pub(crate) struct SparseQueueSet {
    dense: Vec<usize>,
    members: FixedBitSet,
    start: usize,
    size: usize,
}

impl SparseQueueSet {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        SparseQueueSet {
            dense: vec![0; capacity],
            members: FixedBitSet::with_capacity(capacity),
            start: 0,
            size: 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.size
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Enqueue `item` unless it is already waiting.
    #[inline]
    pub(crate) fn enqueue(&mut self, item: usize) {
        if self.members.contains(item) {
            return;
        }
        let capacity = self.dense.len();
        self.dense[(self.start + self.size) % capacity] = item;
        self.members.insert(item);
        self.size += 1;
    }

    #[inline]
    pub(crate) fn dequeue(&mut self) -> Option<usize> {
        if self.size == 0 {
            return None;
        }
        let item = self.dense[self.start];
        self.start = (self.start + 1) % self.dense.len();
        self.size -= 1;
        self.members.set(item, false);
        Some(item)
    }
}
