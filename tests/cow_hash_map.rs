use cow_hashmap::{CowHashMap, KeyOps, ReserveError};
use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::BuildHasher;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

#[test]
fn put_get_remove_clear_flow() {
    let _ = tracing_subscriber::fmt::try_init();
    let mut m = CowHashMap::with_capacity(1);

    m.put("foo".to_string(), 42);
    m.put("bar".to_string(), 13);
    assert_eq!(m.get(&"foo".to_string()), Some(&42));
    assert_eq!(m.get(&"baz".to_string()), None);

    assert_eq!(m.remove(&"foo".to_string()), Some(42));
    assert_eq!(m.get(&"foo".to_string()), None);
    assert_eq!(m.get(&"bar".to_string()), Some(&13));

    m.clear();
    assert_eq!(m.get(&"foo".to_string()), None);
    assert_eq!(m.get(&"bar".to_string()), None);
    assert_eq!(m.len(), 0);
}

#[test]
fn empty_map_behaviour() {
    let mut m: CowHashMap<u64, u64> = CowHashMap::new();
    assert_eq!(m.len(), 0);
    assert!(m.is_empty());
    assert_eq!(m.capacity(), 1);
    assert_eq!(m.get(&7), None);
    assert!(!m.contains_key(&7));
    assert_eq!(m.remove(&7), None);
    assert_eq!(m.capacity(), 1);

    let mut calls = 0;
    m.each(|_, _| calls += 1);
    assert_eq!(calls, 0);
    assert_eq!(m.iter().next(), None);
}

#[test]
fn clear_is_idempotent() {
    let mut m: CowHashMap<u64, u64> = (0..50).map(|k| (k, k)).collect();
    let cap = m.capacity();
    m.clear();
    assert_eq!(m.len(), 0);
    m.clear();
    assert_eq!(m.len(), 0);
    assert_eq!(m.capacity(), cap);
    for k in 0..50 {
        assert!(!m.contains_key(&k));
    }
    m.put(1, 1);
    assert_eq!(m.get(&1), Some(&1));
}

#[test]
fn cross_check_against_std_hashmap() {
    let mut rng = lcg(0x5eed);
    let mut std_map: HashMap<u64, u32> = HashMap::new();
    let mut m = CowHashMap::with_capacity((rng.next().unwrap() % 1024) as usize);

    for _ in 0..2000 {
        let key = rng.next().unwrap() % 100;
        let val = (rng.next().unwrap() >> 32) as u32;
        if rng.next().unwrap() % 2 == 0 {
            assert_eq!(m.put(key, val), std_map.insert(key, val));
        } else if let Some(&del) = std_map.keys().next() {
            assert_eq!(m.remove(&del), std_map.remove(&del));
        }

        assert_eq!(m.len(), std_map.len());
        m.each(|k, v| assert_eq!(std_map.get(k), Some(v), "key {k} should exist"));
        for (k, v) in &std_map {
            assert_eq!(m.get(k), Some(v));
        }
    }
}

#[test]
fn copy_then_write_keeps_original() {
    let mut orig: CowHashMap<u64, u32> = CowHashMap::with_capacity(1);
    for i in 0..10u32 {
        orig.put(u64::from(i), i);
    }

    let mut cpy = orig.copy();
    assert!(orig.is_shared());
    assert!(cpy.is_shared());
    cpy.each(|k, v| assert_eq!(orig.get(k), Some(v)));

    cpy.put(0, 42);
    assert_eq!(cpy.get(&0), Some(&42));
    assert_eq!(orig.get(&0), Some(&0));

    orig.remove(&5);
    assert_eq!(orig.get(&5), None);
    assert_eq!(cpy.get(&5), Some(&5));
    assert_eq!(orig.len(), 9);
    assert_eq!(cpy.len(), 10);
}

#[test]
fn chained_copies_share_until_each_diverges() {
    let mut a: CowHashMap<u32, u32> = (0..8).map(|k| (k, k)).collect();
    let b = a.copy();
    let mut c = b.copy();
    assert!(a.is_shared() && b.is_shared() && c.is_shared());

    c.put(100, 100);
    assert!(!c.is_shared());
    assert!(a.is_shared() && b.is_shared());

    a.put(200, 200);
    assert!(!a.is_shared());
    assert!(!b.is_shared(), "b is now the sole holder of the original array");

    assert_eq!(b.len(), 8);
    assert_eq!(b.get(&100), None);
    assert_eq!(b.get(&200), None);
    assert_eq!(c.get(&100), Some(&100));
    assert_eq!(a.get(&200), Some(&200));
}

#[test]
fn grow_threshold_doubles_exactly_once() {
    let mut m: CowHashMap<u32, u32> = CowHashMap::with_capacity(8);
    for k in 0..4 {
        m.put(k, k);
        assert_eq!(m.capacity(), 8);
    }
    assert_eq!(m.len(), 4);

    m.put(4, 4);
    assert_eq!(m.capacity(), 16);
    assert_eq!(m.len(), 5);

    // Overwriting an existing key at the threshold still grows first.
    for k in 5..8 {
        m.put(k, k);
    }
    assert_eq!(m.capacity(), 16);
    m.put(0, 99);
    assert_eq!(m.capacity(), 32);
    assert_eq!(m.len(), 8);
    assert_eq!(m.get(&0), Some(&99));
}

#[test]
fn shrink_threshold_halves_exactly_once() {
    let mut m: CowHashMap<u32, u32> = CowHashMap::with_capacity(8);
    for k in 0..5 {
        m.put(k, k);
    }
    assert_eq!(m.capacity(), 16);

    m.remove(&0);
    m.remove(&1);
    assert_eq!(m.len(), 3);
    assert_eq!(m.capacity(), 16);

    // len 2 <= 16 / 8
    m.remove(&2);
    assert_eq!(m.len(), 2);
    assert_eq!(m.capacity(), 8);

    // len 1 <= 8 / 8
    m.remove(&3);
    assert_eq!(m.len(), 1);
    assert_eq!(m.capacity(), 4);
    assert_eq!(m.get(&4), Some(&4));

    // Removing the last entry never shrinks.
    m.remove(&4);
    assert_eq!(m.len(), 0);
    assert_eq!(m.capacity(), 4);
}

#[test]
fn absent_remove_does_not_shrink() {
    let mut m: CowHashMap<u32, u32> = CowHashMap::with_capacity(64);
    m.put(1, 1);
    assert_eq!(m.remove(&2), None);
    assert_eq!(m.capacity(), 64);
}

#[test]
fn custom_fns_with_total_collisions() {
    let mut m = CowHashMap::with_fns(4, |a: &u32, b: &u32| a == b, |_: &u32| 7);
    for k in 0..32 {
        m.put(k, k + 1);
    }
    for k in (0..32).step_by(3) {
        assert_eq!(m.remove(&k), Some(k + 1));
    }
    for k in 0..32 {
        let expected = if k % 3 == 0 { None } else { Some(k + 1) };
        assert_eq!(m.get(&k).copied(), expected);
    }
    assert_eq!(KeyOps::<u32>::hash(m.ops(), &123), 7);
}

#[test]
fn case_insensitive_keys_via_fns() {
    let mut m = CowHashMap::with_fns(
        8,
        |a: &String, b: &String| a.eq_ignore_ascii_case(b),
        |k: &String| {
            k.bytes()
                .fold(0xcbf29ce484222325u64, |h, b| {
                    (h ^ u64::from(b.to_ascii_lowercase())).wrapping_mul(0x100000001b3)
                })
        },
    );
    m.put("Hello".to_string(), 1);
    assert_eq!(m.put("HELLO".to_string(), 2), Some(1));
    assert_eq!(m.len(), 1);
    assert_eq!(m.get_key_value(&"hello".to_string()), Some((&"Hello".to_string(), &2)));
}

#[test]
fn custom_hasher_and_extend() {
    let mut m: CowHashMap<String, usize, _> = CowHashMap::with_hasher(0, RandomState::new());
    m.extend(["a", "bb", "ccc"].iter().map(|s| (s.to_string(), s.len())));
    assert_eq!(m.len(), 3);
    assert_eq!(m.get(&"bb".to_string()), Some(&2));
    let snapshot = m.clone();
    assert_eq!(snapshot.get(&"ccc".to_string()), Some(&3));

    // Keys are hashed with exactly the builder the map was given.
    let key = "ccc".to_string();
    let builder = m.ops().hasher();
    assert_eq!(KeyOps::<String>::hash(m.ops(), &key), builder.hash_one(&key));
    assert_eq!(snapshot.ops().hasher().hash_one(&key), builder.hash_one(&key));
}

#[test]
fn try_reserve_overflow_leaves_map_unchanged() {
    let mut m: CowHashMap<u32, u32> = (0..10).map(|k| (k, k)).collect();
    let cap = m.capacity();
    let err = m.try_reserve(usize::MAX / 2).unwrap_err();
    assert!(matches!(err, ReserveError::CapacityOverflow));
    assert_eq!(err.to_string(), "capacity overflow");
    assert_eq!(m.capacity(), cap);
    assert_eq!(m.len(), 10);
    for k in 0..10 {
        assert_eq!(m.get(&k), Some(&k));
    }
}

#[test]
fn try_reserve_on_shared_map_diverges() {
    let mut a: CowHashMap<u32, u32> = (0..4).map(|k| (k, k)).collect();
    let b = a.copy();
    a.try_reserve(1000).unwrap();
    assert!(!a.is_shared());
    assert!(!b.is_shared());
    assert!(a.capacity() >= 2048);
    assert_eq!(b.capacity(), 8);
    for k in 0..4 {
        assert_eq!(a.get(&k), Some(&k));
        assert_eq!(b.get(&k), Some(&k));
    }
}
