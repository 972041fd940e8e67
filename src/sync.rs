//! A [`BigArr`] behind a read-write lock.
//!
//! `BigArr` itself has no internal locking. `SharedBigArr` serialises every
//! traversal that may allocate behind the write lock, so two concurrent
//! `set`s on a still-unallocated prefix create exactly one chunk per level.

use parking_lot::RwLock;

use crate::error::Result;
use crate::{BigArr, Config, TrieStats};

/// A thread-safe sparse array indexed by `u64`.
pub struct SharedBigArr<V> {
    inner: RwLock<BigArr<V>>,
}

impl<V> SharedBigArr<V> {
    /// Create a new empty array.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BigArr::new()),
        }
    }

    /// Create a new array with the given configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            inner: RwLock::new(BigArr::with_config(config)),
        }
    }

    /// Get a clone of the value at `key`.
    pub fn get(&self, key: u64) -> Option<V>
    where
        V: Clone,
    {
        self.inner.read().get(key).cloned()
    }

    /// Check if `key` holds a value.
    pub fn contains_key(&self, key: u64) -> bool {
        self.inner.read().contains_key(key)
    }

    /// Store `value` at `key`, overwriting any previous value.
    pub fn set(&self, key: u64, value: V) {
        self.inner.write().set(key, value);
    }

    /// Apply `f` to the value at `key`, starting from `V::default()` if the
    /// key is unset, and return what `f` returns.
    pub fn update<R>(&self, key: u64, f: impl FnOnce(&mut V) -> R) -> R
    where
        V: Default,
    {
        let mut inner = self.inner.write();
        f(inner.get_or_insert_default(key))
    }

    /// Bulk read; see [`BigArr::read_slice`].
    pub fn read_slice(&self, start: u64, dst: &mut [Option<V>]) -> Result<()>
    where
        V: Clone,
    {
        self.inner.read().read_slice(start, dst)
    }

    /// Bulk write; see [`BigArr::write_slice`].
    pub fn write_slice(&self, start: u64, src: &[V]) -> Result<()>
    where
        V: Clone,
    {
        self.inner.write().write_slice(start, src)
    }

    /// Get the number of keys holding a value.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Check if the array is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get chunk and memory statistics.
    pub fn stats(&self) -> TrieStats {
        self.inner.read().stats()
    }

    /// Unwrap the underlying array.
    pub fn into_inner(self) -> BigArr<V> {
        self.inner.into_inner()
    }
}

impl<V> Default for SharedBigArr<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> From<BigArr<V>> for SharedBigArr<V> {
    fn from(arr: BigArr<V>) -> Self {
        Self {
            inner: RwLock::new(arr),
        }
    }
}
