//! LRU cache over an arena-backed doubly linked list.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

/// Sentinel slot index marking the end of the recency list.
const NIL: usize = usize::MAX;

/// Callback invoked once for every entry that leaves the cache.
pub type EvictionHook<K, V> = Box<dyn FnMut(&K, &V) + Send>;

/// One entry in the recency list.
///
/// Slots link to their neighbors by arena index rather than by pointer,
/// which keeps the list free of reference cycles and lets removed slots
/// be recycled through a free list.
struct Slot<K, V> {
    key: K,
    value: V,
    prev: usize,
    next: usize,
}

/// An LRU cache. It is not safe for concurrent access.
///
/// Entries are held in a doubly linked recency list (front = most
/// recently used) and indexed by a `HashMap` from key to slot. All
/// operations are O(1) amortized.
///
/// A `max_entries` of 0 means no limit; eviction is then driven entirely
/// by the caller through [`remove_oldest`](LruCache::remove_oldest).
pub struct LruCache<K, V> {
    max_entries: usize,
    map: HashMap<K, usize>,
    slots: Vec<Option<Slot<K, V>>>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
    on_evicted: Option<EvictionHook<K, V>>,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq,
{
    /// Create a cache holding at most `max_entries` entries (0 = unbounded).
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            map: HashMap::new(),
            slots: Vec::new(),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            on_evicted: None,
        }
    }

    /// Create a cache that invokes `hook` for every evicted entry.
    ///
    /// The hook fires exactly once per departing entry (on capacity
    /// eviction, [`remove`](LruCache::remove),
    /// [`remove_oldest`](LruCache::remove_oldest), and
    /// [`clear`](LruCache::clear)), synchronously inside the triggering
    /// call. It must not panic; the entry is already gone when it runs.
    pub fn with_eviction_hook(
        max_entries: usize,
        hook: impl FnMut(&K, &V) + Send + 'static,
    ) -> Self {
        let mut cache = Self::new(max_entries);
        cache.on_evicted = Some(Box::new(hook));
        cache
    }

    /// Insert a value, returning the previous value if the key was present.
    ///
    /// An existing key is refreshed to the front of the recency list. A new
    /// key that pushes the cache past `max_entries` evicts the oldest entry.
    pub fn insert(&mut self, key: K, value: V) -> Option<V>
    where
        K: Clone,
    {
        if let Some(&idx) = self.map.get(&key) {
            self.move_to_front(idx);
            let slot = self.slots[idx].as_mut().expect("linked slot");
            return Some(std::mem::replace(&mut slot.value, value));
        }

        let idx = self.alloc_slot(key.clone(), value);
        self.map.insert(key, idx);
        self.push_front(idx);

        if self.max_entries != 0 && self.map.len() > self.max_entries {
            self.remove_oldest();
        }
        None
    }

    /// Look up a value and refresh it to the front of the recency list.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.map.get(key)?;
        self.move_to_front(idx);
        self.slots[idx].as_ref().map(|slot| &slot.value)
    }

    /// Remove a key, returning the evicted pair if it was present.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.map.remove(key)?;
        Some(self.remove_slot(idx))
    }

    /// Remove and return the least recently used entry.
    ///
    /// A no-op returning `None` on an empty cache.
    pub fn remove_oldest(&mut self) -> Option<(K, V)> {
        if self.tail == NIL {
            return None;
        }
        let idx = self.tail;
        Some(self.remove_slot(idx))
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Evict every entry (firing the eviction hook for each) and release
    /// the slot storage.
    pub fn clear(&mut self) {
        while self.remove_oldest().is_some() {}
        self.slots.clear();
        self.free.clear();
    }

    /// Place `key`/`value` in a recycled or fresh slot, unlinked.
    fn alloc_slot(&mut self, key: K, value: V) -> usize {
        let slot = Slot {
            key,
            value,
            prev: NIL,
            next: NIL,
        };
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(slot);
                idx
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        }
    }

    /// Unlink a slot, recycle it, and hand the entry to the eviction hook.
    fn remove_slot(&mut self, idx: usize) -> (K, V) {
        self.detach(idx);
        let slot = self.slots[idx].take().expect("occupied slot");
        self.free.push(idx);
        // No-op when the caller already removed the mapping (keyed removal).
        self.map.remove(&slot.key);
        if let Some(hook) = self.on_evicted.as_mut() {
            hook(&slot.key, &slot.value);
        }
        (slot.key, slot.value)
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head == idx {
            return;
        }
        self.detach(idx);
        self.push_front(idx);
    }

    /// Unlink `idx` from its neighbors. The slot's own links go stale and
    /// are rewritten by the next [`push_front`](Self::push_front).
    fn detach(&mut self, idx: usize) {
        let (prev, next) = {
            let slot = self.slots[idx].as_ref().expect("occupied slot");
            (slot.prev, slot.next)
        };
        if prev == NIL {
            self.head = next;
        } else {
            self.slots[prev].as_mut().expect("linked slot").next = next;
        }
        if next == NIL {
            self.tail = prev;
        } else {
            self.slots[next].as_mut().expect("linked slot").prev = prev;
        }
    }

    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let slot = self.slots[idx].as_mut().expect("occupied slot");
            slot.prev = NIL;
            slot.next = old_head;
        }
        if old_head == NIL {
            self.tail = idx;
        } else {
            self.slots[old_head].as_mut().expect("linked slot").prev = idx;
        }
        self.head = idx;
    }
}
