//! Bounded per-key history.
//!
//! Each key owns a fixed-capacity ring of values, oldest first. Pushing into a full ring evicts
//! exactly the oldest entry. Keys are never removed; a ring for a key that stops receiving
//! values simply stays as it was.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::num::NonZeroUsize;

/// Fixed-capacity FIFO of values, oldest to newest.
#[derive(Debug, Clone)]
pub struct RingBuffer<V> {
    items: VecDeque<V>,
    capacity: NonZeroUsize,
}

impl<V> RingBuffer<V> {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity.get()),
            capacity,
        }
    }

    pub fn push(&mut self, value: V) {
        if self.items.len() == self.capacity.get() {
            self.items.pop_front();
        }
        self.items.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &V> + ExactSizeIterator {
        self.items.iter()
    }

    pub fn newest(&self) -> Option<&V> {
        self.items.back()
    }
}

/// Map from key to a [`RingBuffer`], all rings sharing one capacity.
#[derive(Debug, Clone)]
pub struct HistoryStore<K, V> {
    capacity: NonZeroUsize,
    buffers: HashMap<K, RingBuffer<V>>,
}

impl<K: Eq + Hash, V> HistoryStore<K, V> {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            buffers: HashMap::new(),
        }
    }

    /// Capacity shared by every key's ring.
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Append `value` to the ring for `key`, creating the ring on first use.
    pub fn push(&mut self, key: K, value: V) {
        let capacity = self.capacity;
        self.buffers
            .entry(key)
            .or_insert_with(|| RingBuffer::new(capacity))
            .push(value);
    }

    /// Borrow the ring for `key`; `None` if nothing was ever pushed for it.
    pub fn get(&self, key: &K) -> Option<&RingBuffer<V>> {
        self.buffers.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.buffers.contains_key(key)
    }

    /// Number of keys with a ring.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

impl<K: Eq + Hash, V: Clone> HistoryStore<K, V> {
    /// Point-in-time copy of the ring for `key`, oldest to newest.
    pub fn snapshot(&self, key: &K) -> Option<Vec<V>> {
        self.buffers
            .get(key)
            .map(|ring| ring.iter().cloned().collect())
    }
}
