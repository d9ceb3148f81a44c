//! cow-hashmap: a single-threaded, open-addressing hash map with
//! tombstone-free deletion and O(1) copy-on-write snapshots.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: one contiguous slot array, linear probing, no tombstones, and
//!   cheap snapshots that share the array until someone writes.
//! - Layers:
//!   - `key_ops`: the `KeyOps<K>` capability (`equals`, `hash`) a map is
//!     built with. `HashOps<S>` covers `Eq + Hash` keys with any
//!     `BuildHasher`; `FnOps` wraps a pair of plain functions.
//!   - `slot`: `Slot<K, V>` holding `Entry { key, value, hash }` and the
//!     probing primitives over a bare slice (`probe`, `place`,
//!     `place_vacant`, `repair_chain`). No policy, no sharing.
//!   - `CowHashMap<K, V, O>`: public API. Load-factor thresholds,
//!     resize, deletion repair and copy-on-write divergence.
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync` by construction (`Rc` storage).
//! - Capacity is always a power of two, at least 1; indexing is
//!   `hash & (capacity - 1)`.
//! - After every public operation at least one slot is empty, so probes
//!   terminate; probes are also bounded by the capacity.
//!
//! Probe-chain invariant
//! - For every occupied slot `i` holding `k`, every slot on the wrapping
//!   path from `k`'s ideal index to `i` is occupied. Lookups rely on it to
//!   stop at the first empty slot.
//! - Removal clears the slot and then re-places every entry of the run
//!   that follows it, stopping at the first empty slot (backward shift by
//!   re-insertion). No tombstone state exists.
//!
//! Hasher and rehashing
//! - `KeyOps::hash` runs once per lookup or insert, before anything is
//!   modified. The result is stored with the entry.
//! - Resize and deletion repair re-place entries by their stored hash and
//!   never call `hash` or `equals`. A panicking user function therefore
//!   cannot interrupt them.
//! - A resize builds the new array completely before swapping it in; a
//!   panicking `K::clone`/`V::clone` on a shared array leaves the map as
//!   it was.
//!
//! Resize policy
//! - `put` doubles the capacity first when `len >= capacity / 2`.
//! - `remove` halves it afterwards when `0 < len <= capacity / 8`.
//! - The gap between 1/2 and 1/8 keeps alternating insert/remove near a
//!   boundary from resizing on every call.
//! - Resizing re-places every entry into a fresh array; `len` is unchanged.
//!
//! Copy-on-write
//! - The slot array lives in an `Rc`. `copy`/`clone` bumps the count and
//!   returns a new handle in O(1); the map is "shared" while the count is
//!   above one.
//! - The first mutating call on a shared handle (`put`, a successful
//!   `remove`, `get_mut`) clones the array for that handle only, via
//!   `Rc::make_mut`. Removing an absent key never clones.
//! - A resize on a shared handle clones entries into the new array and
//!   leaves the old one to the remaining holders. `clear` just drops its
//!   reference.
//! - The key ops are also behind an `Rc`, so every handle derived from a
//!   map hashes identically.
//!
//! Errors
//! - Absence is `None`, never an error.
//! - Allocation failure in infallible calls is Rust's usual abort;
//!   `try_reserve` and `try_with_capacity_and_ops` report `ReserveError`
//!   and leave the map unchanged.
//!
//! Notes and non-goals
//! - Iteration order is slot order and carries no guarantee.
//! - No protection against adversarial collisions beyond the chosen
//!   `BuildHasher`.
//! - Resize and copy-on-write events are emitted as `tracing` trace events.

pub mod cow_hash_map;
mod cow_hash_map_proptest;
pub mod key_ops;
mod slot;

// Public surface
pub use cow_hash_map::{CowHashMap, Iter, ReserveError};
pub use key_ops::{FnOps, HashOps, KeyOps};
