use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use thiserror::Error;

/// Handle returned by the arena allocator.
///
/// Handles are plain indices, so they stay valid for the lifetime of the
/// arena no matter how often the slot they name is overwritten.
pub struct ArenaHandle<T> {
    index: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ArenaHandle<T> {
    fn new(index: usize) -> Self {
        Self {
            index: index as u32,
            _marker: PhantomData,
        }
    }

    pub fn index(&self) -> usize {
        self.index as usize
    }
}

// Manual impls: derives would demand the same traits from `T`.
impl<T> Clone for ArenaHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ArenaHandle<T> {}

impl<T> PartialEq for ArenaHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for ArenaHandle<T> {}

impl<T> Hash for ArenaHandle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> fmt::Debug for ArenaHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("arena exhausted ({capacity} cells)")]
pub struct ArenaFull {
    pub capacity: usize,
}

/// A bump allocation arena with a fixed upper bound on live entries.
///
/// Nothing is ever freed; the whole arena is dropped or cleared at once.
#[derive(Debug)]
pub struct Arena<T> {
    entries: Vec<T>,
    capacity: usize,
}

impl<T> Arena<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
        }
    }

    pub fn allocate(&mut self, value: T) -> Result<ArenaHandle<T>, ArenaFull> {
        if self.entries.len() >= self.capacity {
            return Err(ArenaFull {
                capacity: self.capacity,
            });
        }
        let handle = ArenaHandle::new(self.entries.len());
        self.entries.push(value);
        Ok(handle)
    }

    pub fn get(&self, handle: ArenaHandle<T>) -> Option<&T> {
        self.entries.get(handle.index())
    }

    pub fn get_mut(&mut self, handle: ArenaHandle<T>) -> Option<&mut T> {
        self.entries.get_mut(handle.index())
    }

    /// Swap the contents of two slots in place.
    pub fn swap(&mut self, a: ArenaHandle<T>, b: ArenaHandle<T>) -> bool {
        if a.index() >= self.entries.len() || b.index() >= self.entries.len() {
            return false;
        }
        self.entries.swap(a.index(), b.index());
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
