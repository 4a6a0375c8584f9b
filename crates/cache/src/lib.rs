//! # Cache — bounded LRU recency cache
//!
//! A fixed-capacity map from string ids to values with least-recently-used
//! eviction. The store keeps the last-known live version of each note here so
//! point lookups can skip the segment scan; the cache is never authoritative
//! and is always reconstructable from the log.
//!
//! Recency order is maintained by an intrusive doubly-linked list threaded
//! through a slab of slots, so `get`, `put`, and `remove` are all O(1).
//! `get` promotes the entry to most-recently-used; inserting past capacity
//! evicts from the tail.

use std::collections::HashMap;

/// Capacity used when a caller asks for a zero-capacity cache.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Sentinel slot index meaning "no link".
const NIL: usize = usize::MAX;

struct Slot<V> {
    key: String,
    value: V,
    prev: usize,
    next: usize,
}

/// Bounded LRU map from `String` keys to values.
pub struct LruCache<V> {
    map: HashMap<String, usize>,
    slots: Vec<Option<Slot<V>>>,
    free: Vec<usize>,
    /// Most-recently-used slot index, or `NIL` when empty.
    head: usize,
    /// Least-recently-used slot index, or `NIL` when empty.
    tail: usize,
    cap: usize,
}

impl<V> LruCache<V> {
    /// Creates a cache holding at most `capacity` entries.
    /// A capacity of zero is replaced by [`DEFAULT_CAPACITY`].
    pub fn new(capacity: usize) -> Self {
        let cap = if capacity == 0 { DEFAULT_CAPACITY } else { capacity };
        Self {
            map: HashMap::with_capacity(cap),
            slots: Vec::with_capacity(cap),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            cap,
        }
    }

    /// Looks up `key`, promoting the entry to most-recently-used on a hit.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        let idx = *self.map.get(key)?;
        self.detach(idx);
        self.attach_front(idx);
        self.slots[idx].as_ref().map(|s| &s.value)
    }

    /// Inserts or replaces `key`. The entry becomes most-recently-used.
    /// When a new key would exceed capacity, the least-recently-used entry
    /// is evicted first.
    pub fn put(&mut self, key: String, value: V) {
        if let Some(&idx) = self.map.get(&key) {
            if let Some(slot) = self.slots[idx].as_mut() {
                slot.value = value;
            }
            self.detach(idx);
            self.attach_front(idx);
            return;
        }

        if self.map.len() >= self.cap {
            self.evict_lru();
        }

        let slot = Slot {
            key: key.clone(),
            value,
            prev: NIL,
            next: NIL,
        };
        let idx = match self.free.pop() {
            Some(i) => {
                self.slots[i] = Some(slot);
                i
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        };
        self.map.insert(key, idx);
        self.attach_front(idx);
    }

    /// Removes `key`, returning its value if it was resident.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        let idx = self.map.remove(key)?;
        self.detach(idx);
        self.free.push(idx);
        self.slots[idx].take().map(|s| s.value)
    }

    /// Drops every entry, keeping the configured capacity.
    pub fn clear(&mut self) {
        self.map.clear();
        self.slots.clear();
        self.free.clear();
        self.head = NIL;
        self.tail = NIL;
    }

    /// Number of resident entries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Configured maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Visits entries from most- to least-recently-used without promoting.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            cache: self,
            next: self.head,
        }
    }

    fn evict_lru(&mut self) {
        let tail = self.tail;
        if tail == NIL {
            return;
        }
        self.detach(tail);
        if let Some(slot) = self.slots[tail].take() {
            self.map.remove(&slot.key);
        }
        self.free.push(tail);
    }

    /// Unlinks slot `idx` from the recency list.
    fn detach(&mut self, idx: usize) {
        let (prev, next) = match self.slots[idx].as_ref() {
            Some(s) => (s.prev, s.next),
            None => return,
        };
        match prev {
            NIL => self.head = next,
            p => {
                if let Some(s) = self.slots[p].as_mut() {
                    s.next = next;
                }
            }
        }
        match next {
            NIL => self.tail = prev,
            n => {
                if let Some(s) = self.slots[n].as_mut() {
                    s.prev = prev;
                }
            }
        }
        if let Some(s) = self.slots[idx].as_mut() {
            s.prev = NIL;
            s.next = NIL;
        }
    }

    /// Links slot `idx` at the head (most-recently-used position).
    fn attach_front(&mut self, idx: usize) {
        let old_head = self.head;
        if let Some(s) = self.slots[idx].as_mut() {
            s.prev = NIL;
            s.next = old_head;
        }
        if old_head != NIL {
            if let Some(s) = self.slots[old_head].as_mut() {
                s.prev = idx;
            }
        }
        self.head = idx;
        if self.tail == NIL {
            self.tail = idx;
        }
    }
}

/// Iterator over `(key, value)` pairs in recency order (MRU first).
pub struct Iter<'a, V> {
    cache: &'a LruCache<V>,
    next: usize,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a str, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next == NIL {
            return None;
        }
        let slot = self.cache.slots[self.next].as_ref()?;
        self.next = slot.next;
        Some((slot.key.as_str(), &slot.value))
    }
}
