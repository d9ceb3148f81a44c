//! Slot array primitives: linear probing over a bare `[Slot<K, V>]`.
//!
//! Everything here works on a plain slice whose length is a power of two.
//! Nothing in this module knows about sharing, load factors or resizing;
//! the map layer decides when to call in and guarantees the slice always
//! has at least one `Empty` slot.
//!
//! Each entry keeps the hash it was inserted with. Re-placing an entry
//! (resize, deletion repair) uses the stored hash and never calls back
//! into `KeyOps`, so those paths cannot unwind halfway through.

use crate::key_ops::KeyOps;
use core::mem;

#[derive(Clone, Debug)]
pub(crate) struct Entry<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) hash: u64,
}

#[derive(Clone, Debug)]
pub(crate) enum Slot<K, V> {
    Empty,
    Occupied(Entry<K, V>),
}

impl<K, V> Slot<K, V> {
    #[inline]
    pub(crate) fn is_occupied(&self) -> bool {
        matches!(self, Slot::Occupied(..))
    }

    #[inline]
    pub(crate) fn occupied(&self) -> Option<&Entry<K, V>> {
        match self {
            Slot::Occupied(e) => Some(e),
            Slot::Empty => None,
        }
    }

    #[inline]
    pub(crate) fn entry(&self) -> Option<(&K, &V)> {
        self.occupied().map(|e| (&e.key, &e.value))
    }

    #[inline]
    pub(crate) fn value_mut(&mut self) -> Option<&mut V> {
        match self {
            Slot::Occupied(e) => Some(&mut e.value),
            Slot::Empty => None,
        }
    }

    /// Empty the slot, handing back whatever it held.
    #[inline]
    pub(crate) fn take(&mut self) -> Option<Entry<K, V>> {
        match mem::replace(self, Slot::Empty) {
            Slot::Occupied(e) => Some(e),
            Slot::Empty => None,
        }
    }
}

/// Outcome of scanning a probe chain for a key.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Probe {
    /// The key lives at this index.
    Found(usize),
    /// The chain ended at this empty index without a match.
    Vacant(usize),
    /// Every slot was visited without meeting an empty one.
    Exhausted,
}

#[inline]
pub(crate) fn ideal_index(hash: u64, capacity: usize) -> usize {
    debug_assert!(capacity.is_power_of_two());
    (hash as usize) & (capacity - 1)
}

/// Scan forward from `hash`'s ideal index until a match or an empty slot.
/// Stored hashes are compared before `equals` is called.
pub(crate) fn probe<K, V, O>(slots: &[Slot<K, V>], ops: &O, hash: u64, key: &K) -> Probe
where
    O: KeyOps<K> + ?Sized,
{
    let capacity = slots.len();
    let mask = capacity - 1;
    let mut idx = ideal_index(hash, capacity);
    for _ in 0..capacity {
        match &slots[idx] {
            Slot::Empty => return Probe::Vacant(idx),
            Slot::Occupied(e) if e.hash == hash && ops.equals(&e.key, key) => {
                return Probe::Found(idx)
            }
            Slot::Occupied(..) => idx = (idx + 1) & mask,
        }
    }
    Probe::Exhausted
}

/// Write `entry` into its chain: overwrite the value on a matching key,
/// otherwise fill the first empty slot. Returns the displaced value when
/// the key was already present.
pub(crate) fn place<K, V, O>(slots: &mut [Slot<K, V>], ops: &O, entry: Entry<K, V>) -> Option<V>
where
    O: KeyOps<K> + ?Sized,
{
    match probe(slots, ops, entry.hash, &entry.key) {
        Probe::Found(idx) => match slots[idx].value_mut() {
            Some(v) => Some(mem::replace(v, entry.value)),
            None => unreachable!("probe reported a match on an empty slot"),
        },
        Probe::Vacant(idx) => {
            slots[idx] = Slot::Occupied(entry);
            None
        }
        Probe::Exhausted => unreachable!("slot array has no empty slot"),
    }
}

/// Put an entry whose key is known to be absent into the first empty slot
/// of its chain. Uses only the stored hash.
pub(crate) fn place_vacant<K, V>(slots: &mut [Slot<K, V>], entry: Entry<K, V>) {
    let mask = slots.len() - 1;
    let mut idx = ideal_index(entry.hash, slots.len());
    while slots[idx].is_occupied() {
        idx = (idx + 1) & mask;
    }
    slots[idx] = Slot::Occupied(entry);
}

/// Close the gap left at `vacated` by re-placing every entry of the run
/// that follows it. Stops at the first empty slot.
pub(crate) fn repair_chain<K, V>(slots: &mut [Slot<K, V>], vacated: usize) {
    let mask = slots.len() - 1;
    let mut idx = (vacated + 1) & mask;
    while let Some(entry) = slots[idx].take() {
        place_vacant(slots, entry);
        idx = (idx + 1) & mask;
    }
}

/// True when every occupied slot holds the hash `ops` gives its key and is
/// reachable from its ideal index through contiguous occupied slots.
#[cfg(test)]
pub(crate) fn probe_chains_intact<K, V, O>(slots: &[Slot<K, V>], ops: &O) -> bool
where
    O: KeyOps<K> + ?Sized,
{
    let capacity = slots.len();
    let mask = capacity - 1;
    slots.iter().enumerate().all(|(at, slot)| match slot {
        Slot::Empty => true,
        Slot::Occupied(e) => {
            if e.hash != ops.hash(&e.key) {
                return false;
            }
            let mut idx = ideal_index(e.hash, capacity);
            while idx != at {
                if !slots[idx].is_occupied() {
                    return false;
                }
                idx = (idx + 1) & mask;
            }
            true
        }
    })
}
