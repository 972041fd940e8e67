//! Fixed 256-slot chunks, the nodes of the trie.
//!
//! Every slot carries an explicit presence tag, so a slot that was never
//! written is distinguishable from one holding any value at all.

use std::fmt;
use std::mem;

/// Number of slots in a chunk: one per possible key byte.
pub const CHUNK_SIZE: usize = 256;

/// A slot that is either empty or holds a `T`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot<T> {
    Empty,
    Occupied(T),
}

impl<T> Slot<T> {
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, Slot::Empty)
    }

    #[inline]
    pub fn is_occupied(&self) -> bool {
        !self.is_empty()
    }

    #[inline]
    pub fn as_option(&self) -> Option<&T> {
        match self {
            Slot::Empty => None,
            Slot::Occupied(value) => Some(value),
        }
    }

    #[inline]
    pub fn as_option_mut(&mut self) -> Option<&mut T> {
        match self {
            Slot::Empty => None,
            Slot::Occupied(value) => Some(value),
        }
    }

    #[inline]
    pub fn into_option(self) -> Option<T> {
        match self {
            Slot::Empty => None,
            Slot::Occupied(value) => Some(value),
        }
    }

    /// Installs `value`, returning whatever the slot held before.
    #[inline]
    pub fn replace(&mut self, value: T) -> Slot<T> {
        mem::replace(self, Slot::Occupied(value))
    }

    /// Installs `value` and returns a reference to it.
    #[inline]
    pub fn insert(&mut self, value: T) -> &mut T {
        *self = Slot::Occupied(value);
        match self {
            Slot::Occupied(value) => value,
            Slot::Empty => unreachable!("slot was just filled"),
        }
    }

    /// Returns the occupant, installing `f()` first if the slot is empty.
    #[inline]
    pub fn get_or_insert_with(&mut self, f: impl FnOnce() -> T) -> &mut T {
        if self.is_empty() {
            *self = Slot::Occupied(f());
        }
        match self {
            Slot::Occupied(value) => value,
            Slot::Empty => unreachable!("slot was just filled"),
        }
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Slot::Empty
    }
}

impl<T> From<Option<T>> for Slot<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Slot::Occupied(value),
            None => Slot::Empty,
        }
    }
}

impl<T> From<Slot<T>> for Option<T> {
    fn from(slot: Slot<T>) -> Self {
        slot.into_option()
    }
}

impl<T: fmt::Debug> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Empty => f.write_str("Empty"),
            Slot::Occupied(value) => f.debug_tuple("Occupied").field(value).finish(),
        }
    }
}

/// Stable index of a chunk inside one of the trie's chunk arenas.
///
/// Branch slots at depths 0..=5 index the branch arena; branch slots at
/// depth 6 index the leaf arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChunkId(usize);

impl ChunkId {
    /// The root branch chunk, created with the trie and never replaced.
    pub const ROOT: ChunkId = ChunkId(0);

    #[inline]
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A branch chunk: each slot owns (by arena index) a child chunk.
pub type BranchChunk = Chunk<ChunkId>;

/// A leaf chunk: each slot holds a stored value.
pub type LeafChunk<V> = Chunk<V>;

/// A fixed-length container of [`CHUNK_SIZE`] slots addressed by a key byte.
#[derive(Clone)]
pub struct Chunk<T> {
    // Always exactly CHUNK_SIZE long, so any u8 index is in bounds.
    slots: Box<[Slot<T>]>,
}

impl<T> Chunk<T> {
    pub fn new() -> Self {
        Self {
            slots: (0..CHUNK_SIZE).map(|_| Slot::Empty).collect(),
        }
    }

    #[inline]
    pub fn slot(&self, index: u8) -> &Slot<T> {
        &self.slots[index as usize]
    }

    #[inline]
    pub fn get(&self, index: u8) -> Option<&T> {
        self.slots[index as usize].as_option()
    }

    #[inline]
    pub fn get_mut(&mut self, index: u8) -> Option<&mut T> {
        self.slots[index as usize].as_option_mut()
    }

    /// Writes `value` at `index`, overwriting any prior occupant.
    #[inline]
    pub fn set(&mut self, index: u8, value: T) -> Slot<T> {
        self.slots[index as usize].replace(value)
    }

    #[inline]
    pub fn insert(&mut self, index: u8, value: T) -> &mut T {
        self.slots[index as usize].insert(value)
    }

    #[inline]
    pub fn get_or_insert_with(&mut self, index: u8, f: impl FnOnce() -> T) -> &mut T {
        self.slots[index as usize].get_or_insert_with(f)
    }

    /// Slots from `start` to the end of the chunk.
    #[inline]
    pub(crate) fn slots_from(&self, start: u8) -> &[Slot<T>] {
        &self.slots[start as usize..]
    }

    #[inline]
    pub(crate) fn slots_from_mut(&mut self, start: u8) -> &mut [Slot<T>] {
        &mut self.slots[start as usize..]
    }

    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_occupied()).count()
    }

    /// Heap bytes owned by the chunk itself, not counting what values own.
    pub fn heap_size() -> usize {
        CHUNK_SIZE * mem::size_of::<Slot<T>>()
    }
}

impl<T> Default for Chunk<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Chunk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunk")
            .field("occupied", &self.occupied())
            .finish()
    }
}
