//! Key operations: the equality/hash capability a map is built with.
//!
//! A `CowHashMap` never calls `K: Eq` or `K: Hash` directly; it goes
//! through a `KeyOps<K>` value supplied at construction. The value is
//! stored behind an `Rc` and shared by every copy of the map, so all
//! handles that reference the same slot array index it the same way.

use core::hash::{BuildHasher, Hash};
use hashbrown::hash_map::DefaultHashBuilder;

/// Equality and hashing strategy for keys of type `K`.
///
/// Implementations must be consistent: `equals(a, b)` implies
/// `hash(a) == hash(b)`. The map cannot detect a violation; lookups
/// silently miss keys when it happens.
pub trait KeyOps<K> {
    fn equals(&self, a: &K, b: &K) -> bool;
    fn hash(&self, key: &K) -> u64;
}

/// `KeyOps` for `Eq + Hash` keys, hashing through a `BuildHasher`.
#[derive(Clone, Debug, Default)]
pub struct HashOps<S = DefaultHashBuilder> {
    hasher: S,
}

impl<S> HashOps<S> {
    pub fn new(hasher: S) -> Self {
        Self { hasher }
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }
}

impl<K, S> KeyOps<K> for HashOps<S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    #[inline]
    fn equals(&self, a: &K, b: &K) -> bool {
        a == b
    }

    #[inline]
    fn hash(&self, key: &K) -> u64 {
        self.hasher.hash_one(key)
    }
}

/// `KeyOps` from a pair of plain functions or closures.
#[derive(Clone, Copy)]
pub struct FnOps<E, H> {
    equals: E,
    hash: H,
}

impl<E, H> FnOps<E, H> {
    pub fn new(equals: E, hash: H) -> Self {
        Self { equals, hash }
    }
}

impl<E, H> core::fmt::Debug for FnOps<E, H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FnOps").finish_non_exhaustive()
    }
}

impl<K, E, H> KeyOps<K> for FnOps<E, H>
where
    E: Fn(&K, &K) -> bool,
    H: Fn(&K) -> u64,
{
    #[inline]
    fn equals(&self, a: &K, b: &K) -> bool {
        (self.equals)(a, b)
    }

    #[inline]
    fn hash(&self, key: &K) -> u64 {
        (self.hash)(key)
    }
}
