//! CowHashMap: policy layer over the slot array.
//!
//! Owns the grow/shrink thresholds, resize, tombstone-free deletion and
//! copy-on-write divergence. Probing itself lives in `slot`.

use crate::key_ops::{FnOps, HashOps, KeyOps};
use crate::slot::{self, Entry, Probe, Slot};
use core::fmt;
use core::hash::{BuildHasher, Hash};
use hashbrown::hash_map::DefaultHashBuilder;
use std::collections::TryReserveError;
use std::rc::Rc;
use tracing::trace;

/// Error returned by the fallible capacity operations.
#[derive(Debug)]
pub enum ReserveError {
    /// The requested capacity does not fit in `usize` as a power of two.
    CapacityOverflow,
    /// The allocator refused the new slot array.
    AllocError(TryReserveError),
}

impl fmt::Display for ReserveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReserveError::CapacityOverflow => f.write_str("capacity overflow"),
            ReserveError::AllocError(e) => write!(f, "slot array allocation failed: {e}"),
        }
    }
}

impl std::error::Error for ReserveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReserveError::CapacityOverflow => None,
            ReserveError::AllocError(e) => Some(e),
        }
    }
}

impl From<TryReserveError> for ReserveError {
    fn from(e: TryReserveError) -> Self {
        ReserveError::AllocError(e)
    }
}

/// Open-addressing hash map with linear probing and O(1) snapshots.
///
/// Every entry lives directly in one power-of-two slot array. Deletion
/// leaves no tombstone: the run after the vacated slot is re-placed so
/// lookups can stop at the first empty slot. `copy` (or `clone`) shares
/// the slot array between handles until one of them writes.
///
/// The map grows by doubling when an insert finds it at least half full,
/// and halves when a removal leaves it at most one-eighth full.
///
/// Not thread-safe: handles are `!Send` and `!Sync`.
pub struct CowHashMap<K, V, O = HashOps<DefaultHashBuilder>> {
    slots: Rc<Vec<Slot<K, V>>>,
    len: usize,
    ops: Rc<O>,
}

impl<K, V> CowHashMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_capacity(1)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_ops(capacity, HashOps::default())
    }
}

impl<K, V> Default for CowHashMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> CowHashMap<K, V, HashOps<S>>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(capacity: usize, hasher: S) -> Self {
        Self::with_capacity_and_ops(capacity, HashOps::new(hasher))
    }
}

impl<K, V, E, H> CowHashMap<K, V, FnOps<E, H>>
where
    E: Fn(&K, &K) -> bool,
    H: Fn(&K) -> u64,
{
    /// Build a map from a plain equality function and hash function.
    pub fn with_fns(capacity: usize, equals: E, hash: H) -> Self {
        Self::with_capacity_and_ops(capacity, FnOps::new(equals, hash))
    }
}

/// Iterator over the live entries of a `CowHashMap`, in slot order.
pub struct Iter<'a, K, V> {
    it: core::slice::Iter<'a, Slot<K, V>>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let entry = self.it.by_ref().find_map(Slot::entry);
        if entry.is_some() {
            self.remaining -= 1;
        }
        entry
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

fn rounded_capacity(hint: usize) -> Option<usize> {
    hint.max(1).checked_next_power_of_two()
}

fn empty_slots<K, V>(capacity: usize) -> Vec<Slot<K, V>> {
    let mut slots = Vec::with_capacity(capacity);
    slots.resize_with(capacity, || Slot::Empty);
    slots
}

fn try_empty_slots<K, V>(capacity: usize) -> Result<Vec<Slot<K, V>>, ReserveError> {
    let mut slots = Vec::new();
    slots.try_reserve_exact(capacity)?;
    slots.resize_with(capacity, || Slot::Empty);
    Ok(slots)
}

impl<K, V, O> CowHashMap<K, V, O>
where
    O: KeyOps<K>,
{
    /// Create an empty map. The capacity hint is raised to at least 1 and
    /// rounded up to a power of two.
    ///
    /// # Panics
    ///
    /// Panics if the rounded capacity overflows `usize`.
    pub fn with_capacity_and_ops(capacity: usize, ops: O) -> Self {
        let capacity = match rounded_capacity(capacity) {
            Some(c) => c,
            None => panic!("capacity overflow"),
        };
        Self {
            slots: Rc::new(empty_slots(capacity)),
            len: 0,
            ops: Rc::new(ops),
        }
    }

    /// Fallible form of [`with_capacity_and_ops`](Self::with_capacity_and_ops).
    pub fn try_with_capacity_and_ops(capacity: usize, ops: O) -> Result<Self, ReserveError> {
        let capacity = rounded_capacity(capacity).ok_or(ReserveError::CapacityOverflow)?;
        Ok(Self {
            slots: Rc::new(try_empty_slots(capacity)?),
            len: 0,
            ops: Rc::new(ops),
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots in the backing array. Always a power of two.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// True while the slot array is referenced by another handle.
    pub fn is_shared(&self) -> bool {
        Rc::strong_count(&self.slots) > 1
    }

    pub fn ops(&self) -> &O {
        &self.ops
    }

    fn find_index(&self, key: &K) -> Option<usize> {
        let hash = self.ops.hash(key);
        match slot::probe(self.slots.as_slice(), &*self.ops, hash, key) {
            Probe::Found(idx) => Some(idx),
            Probe::Vacant(_) | Probe::Exhausted => None,
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.get_key_value(key).map(|(_, v)| v)
    }

    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        let idx = self.find_index(key)?;
        self.slots[idx].entry()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.find_index(key).is_some()
    }

    /// O(1) snapshot. Both handles share the slot array until either one
    /// writes; the writer then clones the array for itself.
    pub fn copy(&self) -> Self {
        Self {
            slots: Rc::clone(&self.slots),
            len: self.len,
            ops: Rc::clone(&self.ops),
        }
    }

    /// Visit every entry once, in slot order. The order is unspecified.
    ///
    /// The visitor cannot reach this map mutably while the traversal runs.
    pub fn each<F>(&self, mut visit: F)
    where
        F: FnMut(&K, &V),
    {
        for (k, v) in self.iter() {
            visit(k, v);
        }
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            it: self.slots.iter(),
            remaining: self.len,
        }
    }

    /// Drop every entry, keeping the current capacity. A shared array is
    /// released rather than cloned.
    pub fn clear(&mut self) {
        let capacity = self.capacity();
        self.slots = Rc::new(empty_slots(capacity));
        self.len = 0;
    }
}

impl<K, V, O> CowHashMap<K, V, O>
where
    K: Clone,
    V: Clone,
    O: KeyOps<K>,
{
    // Borrow the private slot array alongside the key ops, cloning the
    // array first if another handle still references it.
    fn slots_and_ops_mut(&mut self) -> (&mut Vec<Slot<K, V>>, &O) {
        if Rc::strong_count(&self.slots) > 1 {
            trace!(capacity = self.slots.len(), len = self.len, "copy-on-write divergence");
        }
        (Rc::make_mut(&mut self.slots), &*self.ops)
    }

    /// Insert or update. Returns the previous value for `key`, if any.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        let hash = self.ops.hash(&key);
        if self.len >= self.capacity() / 2 {
            self.resize(self.capacity() * 2);
        }
        let (slots, ops) = self.slots_and_ops_mut();
        let prev = slot::place(slots, ops, Entry { key, value, hash });
        if prev.is_none() {
            self.len += 1;
        }
        prev
    }

    /// Mutable access to the value for `key`. Diverges a shared map only
    /// when the key is present.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let idx = self.find_index(key)?;
        let (slots, _) = self.slots_and_ops_mut();
        slots[idx].value_mut()
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_entry(key).map(|(_, v)| v)
    }

    /// Remove `key` and return the stored pair. Absent keys leave the map
    /// untouched, including a shared slot array.
    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        let idx = self.find_index(key)?;
        let (slots, _) = self.slots_and_ops_mut();
        let removed = slots[idx].take();
        slot::repair_chain(slots, idx);
        if removed.is_some() {
            self.len -= 1;
        }

        let capacity = self.capacity();
        if self.len > 0 && self.len <= capacity / 8 {
            self.resize(capacity / 2);
        }
        removed.map(|e| (e.key, e.value))
    }

    /// Make room for `additional` new keys without any further resize.
    /// On failure the map is left as it was.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), ReserveError> {
        // `put` grows once `len` reaches half the capacity, so the last of
        // the new keys must still find `len < capacity / 2`.
        let wanted = self
            .len
            .checked_add(additional)
            .and_then(|n| n.checked_mul(2))
            .and_then(rounded_capacity)
            .ok_or(ReserveError::CapacityOverflow)?;
        if wanted <= self.capacity() {
            return Ok(());
        }
        let fresh = try_empty_slots(wanted)?;
        self.rehash_into(fresh);
        Ok(())
    }

    fn resize(&mut self, capacity: usize) {
        self.rehash_into(empty_slots(capacity));
    }

    // Re-place every entry into `fresh` by its stored hash, then swap it in.
    // Entries are moved out of a private array and cloned out of one still
    // held by another handle. `self.slots` is only replaced once `fresh` is
    // complete, so an unwinding `K::clone`/`V::clone` leaves the map as it was.
    fn rehash_into(&mut self, mut fresh: Vec<Slot<K, V>>) {
        debug_assert!(fresh.len().is_power_of_two());
        debug_assert!(fresh.len() > self.len);
        trace!(from = self.capacity(), to = fresh.len(), len = self.len, "resize");

        match Rc::get_mut(&mut self.slots) {
            Some(owned) => {
                for entry in owned.iter_mut().filter_map(Slot::take) {
                    slot::place_vacant(&mut fresh, entry);
                }
            }
            None => {
                for entry in self.slots.iter().filter_map(Slot::occupied) {
                    slot::place_vacant(&mut fresh, entry.clone());
                }
            }
        }
        self.slots = Rc::new(fresh);
    }
}

impl<K, V, O> Clone for CowHashMap<K, V, O>
where
    O: KeyOps<K>,
{
    /// Same as [`CowHashMap::copy`].
    fn clone(&self) -> Self {
        self.copy()
    }
}

impl<K, V, O> fmt::Debug for CowHashMap<K, V, O>
where
    K: fmt::Debug,
    V: fmt::Debug,
    O: KeyOps<K>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, K, V, O> IntoIterator for &'a CowHashMap<K, V, O>
where
    O: KeyOps<K>,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V> FromIterator<(K, V)> for CowHashMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K, V, O> Extend<(K, V)> for CowHashMap<K, V, O>
where
    K: Clone,
    V: Clone,
    O: KeyOps<K>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.put(k, v);
        }
    }
}

#[cfg(test)]
impl<K, V, O> CowHashMap<K, V, O>
where
    O: KeyOps<K>,
{
    pub(crate) fn probe_chains_intact(&self) -> bool {
        slot::probe_chains_intact(self.slots.as_slice(), &*self.ops)
    }

    pub(crate) fn shares_slots_with(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.slots, &other.slots)
    }
}
