//! # bigarr
//!
//! A sparse array indexed by the full `u64` range.
//!
//! Keys are split into 8 bytes, most significant first, and resolved through
//! a byte-radix trie of 256-slot chunks: 7 levels of branch chunks and one
//! level of leaf chunks. Chunks are only allocated for key prefixes that have
//! actually been written, so memory grows with occupancy, not with the range
//! of keys in use.
//!
//! ## Example
//!
//! ```rust
//! use bigarr::BigArr;
//!
//! let mut arr: BigArr<&str> = BigArr::new();
//! arr.set(1234, "foo");
//! arr.set(u64::MAX, "bar");
//!
//! assert_eq!(arr.get(1234), Some(&"foo"));
//! assert_eq!(arr.get(u64::MAX), Some(&"bar"));
//! assert_eq!(arr.get(9999), None);
//! ```

#![deny(unsafe_op_in_unsafe_fn)]

pub mod chunk;
pub mod error;
pub mod key;
pub mod sync;

pub use chunk::Slot;
pub use error::{Error, Result};
pub use sync::SharedBigArr;

use std::fmt;
use std::iter;
use std::mem;

use tracing::{debug, trace};

use chunk::{BranchChunk, Chunk, ChunkId, LeafChunk, CHUNK_SIZE};
use key::BRANCH_LEVELS;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for a [`BigArr`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Branch chunks to reserve arena space for, including the root.
    pub branch_capacity: usize,
    /// Leaf chunks to reserve arena space for.
    pub leaf_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        // Room for one full path from the root to a leaf.
        Self {
            branch_capacity: BRANCH_LEVELS,
            leaf_capacity: 1,
        }
    }
}

/// Chunk and memory statistics for a [`BigArr`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrieStats {
    /// Branch chunks allocated, including the root.
    pub branch_chunks: usize,
    /// Leaf chunks allocated.
    pub leaf_chunks: usize,
    /// Occupied leaf slots.
    pub len: usize,
    /// Bytes held by the chunk arenas.
    pub bytes: usize,
}

// =============================================================================
// BigArr
// =============================================================================

/// A sparse array indexed by `u64`, backed by a lazy byte-radix trie.
///
/// Branch and leaf chunks live in two arenas. Branch slots hold the
/// [`ChunkId`] of their child; at depth 6 that id points into the leaf
/// arena. Chunks are never freed before the whole structure is dropped.
pub struct BigArr<V> {
    /// Branch arena; index 0 is the root.
    branches: Vec<BranchChunk>,
    leaves: Vec<LeafChunk<V>>,
    count: usize,
}

impl<V> BigArr<V> {
    pub fn new() -> Self {
        Self {
            branches: vec![Chunk::new()],
            leaves: Vec::new(),
            count: 0,
        }
    }

    pub fn with_config(config: Config) -> Self {
        debug!(
            branch_capacity = config.branch_capacity,
            leaf_capacity = config.leaf_capacity,
            "reserving chunk arenas"
        );
        let mut branches = Vec::with_capacity(config.branch_capacity.max(1));
        branches.push(Chunk::new());
        Self {
            branches,
            leaves: Vec::with_capacity(config.leaf_capacity),
            count: 0,
        }
    }

    /// Number of keys holding a value.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn stats(&self) -> TrieStats {
        TrieStats {
            branch_chunks: self.branches.len(),
            leaf_chunks: self.leaves.len(),
            len: self.count,
            bytes: self.memory_usage(),
        }
    }

    pub fn memory_usage(&self) -> usize {
        self.branches.capacity() * mem::size_of::<BranchChunk>()
            + self.branches.len() * BranchChunk::heap_size()
            + self.leaves.capacity() * mem::size_of::<LeafChunk<V>>()
            + self.leaves.len() * LeafChunk::<V>::heap_size()
    }

    pub fn shrink_to_fit(&mut self) {
        self.branches.shrink_to_fit();
        self.leaves.shrink_to_fit();
        debug!(
            branch_chunks = self.branches.len(),
            leaf_chunks = self.leaves.len(),
            "shrunk chunk arenas"
        );
    }

    // =========================================================================
    // Path resolution
    // =========================================================================

    /// Walks the branch levels for `key` without allocating.
    ///
    /// Returns `None` as soon as a branch slot on the path is empty.
    #[inline]
    fn find_leaf(&self, key: u64) -> Option<ChunkId> {
        let bytes = key::decompose(key);
        let mut id = ChunkId::ROOT;
        // The first six steps yield branch ids, the seventh a leaf id.
        for &byte in &bytes[..BRANCH_LEVELS] {
            id = *self.branches[id.index()].get(byte)?;
        }
        Some(id)
    }

    /// Walks the branch levels for `key`, creating every missing chunk.
    fn find_or_create_leaf(&mut self, key: u64) -> ChunkId {
        let bytes = key::decompose(key);
        let mut id = ChunkId::ROOT;
        for (depth, &byte) in bytes[..BRANCH_LEVELS].iter().enumerate() {
            id = match self.branches[id.index()].get(byte).copied() {
                Some(child) => child,
                None => {
                    let child = if depth + 1 < BRANCH_LEVELS {
                        self.alloc_branch(depth + 1)
                    } else {
                        self.alloc_leaf()
                    };
                    self.branches[id.index()].set(byte, child);
                    child
                }
            };
        }
        id
    }

    fn alloc_branch(&mut self, depth: usize) -> ChunkId {
        let id = ChunkId::new(self.branches.len());
        self.branches.push(Chunk::new());
        trace!(depth, id = id.index(), "allocated branch chunk");
        id
    }

    fn alloc_leaf(&mut self) -> ChunkId {
        let id = ChunkId::new(self.leaves.len());
        self.leaves.push(Chunk::new());
        trace!(depth = BRANCH_LEVELS, id = id.index(), "allocated leaf chunk");
        id
    }

    // =========================================================================
    // Point access
    // =========================================================================

    /// Returns the value stored at `key`, or `None` if `key` was never set.
    ///
    /// Never allocates, even when the path to `key` does not exist.
    pub fn get(&self, key: u64) -> Option<&V> {
        let leaf = self.find_leaf(key)?;
        self.leaves[leaf.index()].get(key::leaf_offset(key))
    }

    pub fn get_mut(&mut self, key: u64) -> Option<&mut V> {
        let leaf = self.find_leaf(key)?;
        self.leaves[leaf.index()].get_mut(key::leaf_offset(key))
    }

    pub fn contains_key(&self, key: u64) -> bool {
        self.get(key).is_some()
    }

    /// Stores `value` at `key`, overwriting any previous value, and returns
    /// a reference to the stored value.
    pub fn set(&mut self, key: u64, value: V) -> &mut V {
        let leaf = self.find_or_create_leaf(key);
        let offset = key::leaf_offset(key);
        let chunk = &mut self.leaves[leaf.index()];
        if chunk.slot(offset).is_empty() {
            self.count += 1;
        }
        chunk.insert(offset, value)
    }

    /// Returns the value at `key`, storing `f()` there first if it is unset.
    ///
    /// `f` runs before any chunk is allocated, so a panic in `f` leaves the
    /// trie unchanged.
    pub fn get_or_insert_with(&mut self, key: u64, f: impl FnOnce() -> V) -> &mut V {
        if let Some(leaf) = self.find_leaf(key) {
            let offset = key::leaf_offset(key);
            if self.leaves[leaf.index()].slot(offset).is_occupied() {
                return self.leaves[leaf.index()].get_or_insert_with(offset, f);
            }
        }
        let value = f();
        self.set(key, value)
    }

    /// Array-style access: an unset key reads as `V::default()`.
    pub fn get_or_insert_default(&mut self, key: u64) -> &mut V
    where
        V: Default,
    {
        self.get_or_insert_with(key, V::default)
    }

    /// Returns the value stored at the 2-D coordinate `(x, y)`.
    ///
    /// See [`key::interleave`] for how coordinates map onto keys.
    pub fn get_xy(&self, x: u32, y: u32) -> Option<&V> {
        self.get(key::interleave(x, y))
    }

    pub fn set_xy(&mut self, x: u32, y: u32, value: V) -> &mut V {
        self.set(key::interleave(x, y), value)
    }

    // =========================================================================
    // Bulk access
    // =========================================================================

    /// Copies the values at keys `start..start + dst.len()` into `dst`,
    /// writing `None` for unset keys.
    ///
    /// Each leaf chunk on the range is resolved once. Never allocates.
    pub fn read_slice(&self, start: u64, dst: &mut [Option<V>]) -> Result<()>
    where
        V: Clone,
    {
        check_range(start, dst.len())?;

        let mut key = start;
        let mut rest = dst;
        while !rest.is_empty() {
            let offset = key::leaf_offset(key);
            let take = (CHUNK_SIZE - offset as usize).min(rest.len());
            let (head, tail) = mem::take(&mut rest).split_at_mut(take);

            match self.find_leaf(key) {
                Some(leaf) => {
                    let slots = self.leaves[leaf.index()].slots_from(offset);
                    for (out, slot) in head.iter_mut().zip(slots) {
                        *out = slot.as_option().cloned();
                    }
                }
                None => head.iter_mut().for_each(|out| *out = None),
            }

            rest = tail;
            // Wraps to 0 only after the final chunk of a range ending at u64::MAX.
            key = key.wrapping_add(take as u64);
        }
        Ok(())
    }

    /// Stores clones of `src` at keys `start..start + src.len()`.
    ///
    /// The range is checked before anything is written.
    pub fn write_slice(&mut self, start: u64, src: &[V]) -> Result<()>
    where
        V: Clone,
    {
        check_range(start, src.len())?;

        let mut key = start;
        let mut rest = src;
        while !rest.is_empty() {
            let offset = key::leaf_offset(key);
            let take = (CHUNK_SIZE - offset as usize).min(rest.len());
            let (head, tail) = rest.split_at(take);

            // Clone the first value before the walk so a panicking clone
            // never leaves an empty leaf chunk behind.
            let Some((first, others)) = head.split_first() else {
                break;
            };
            let values = iter::once(first.clone()).chain(others.iter().cloned());

            let leaf = self.find_or_create_leaf(key);
            let slots = self.leaves[leaf.index()].slots_from_mut(offset);
            for (slot, value) in slots.iter_mut().zip(values) {
                let was_empty = slot.is_empty();
                slot.insert(value);
                if was_empty {
                    self.count += 1;
                }
            }

            rest = tail;
            key = key.wrapping_add(take as u64);
        }
        Ok(())
    }
}

/// Rejects ranges whose last key would be past `u64::MAX`.
fn check_range(start: u64, len: usize) -> Result<()> {
    if len == 0 {
        return Ok(());
    }
    u64::try_from(len - 1)
        .ok()
        .and_then(|span| start.checked_add(span))
        .map(|_| ())
        .ok_or(Error::RangeOverflow { start, len })
}

impl<V> Default for BigArr<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> Clone for BigArr<V> {
    fn clone(&self) -> Self {
        Self {
            branches: self.branches.clone(),
            leaves: self.leaves.clone(),
            count: self.count,
        }
    }
}

impl<V> fmt::Debug for BigArr<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BigArr")
            .field("len", &self.count)
            .field("branch_chunks", &self.branches.len())
            .field("leaf_chunks", &self.leaves.len())
            .finish()
    }
}


#[cfg(test)]
mod proptests;
