#![cfg(test)]

// Property tests for CowHashMap kept inside the crate so they can inspect
// the private slot array for probe-chain completeness after every step.

use crate::cow_hash_map::CowHashMap;
use crate::key_ops::KeyOps;
use proptest::prelude::*;
use std::collections::{HashMap, VecDeque};

#[derive(Clone, Debug)]
enum Op {
    Put(u16, u32),
    Remove(u16),
    Get(u16),
    Snapshot,
    Clear,
}

fn arb_ops(key_space: u16) -> impl Strategy<Value = Vec<Op>> {
    let op = prop_oneof![
        16 => (0..key_space, any::<u32>()).prop_map(|(k, v)| Op::Put(k, v)),
        12 => (0..key_space).prop_map(Op::Remove),
        8 => (0..key_space).prop_map(Op::Get),
        3 => Just(Op::Snapshot),
        1 => Just(Op::Clear),
    ];
    proptest::collection::vec(op, 1..200)
}

// Drives `sut` and a std HashMap model through `ops`, checking after every
// step:
// - every model entry is found with the same value, and len/iter agree;
// - the probe-chain invariant holds on the slot array;
// - capacity follows the grow (len >= cap/2 before put) and shrink
//   (0 < len <= cap/8 after a real removal) rules exactly;
// - every snapshot taken along the way still matches its frozen model.
fn check_against_model<O>(mut sut: CowHashMap<u16, u32, O>, ops: Vec<Op>) -> Result<(), TestCaseError>
where
    O: KeyOps<u16>,
{
    let mut model: HashMap<u16, u32> = HashMap::new();
    let mut snapshots: Vec<(CowHashMap<u16, u32, O>, HashMap<u16, u32>)> = Vec::new();

    for op in ops {
        let cap = sut.capacity();
        let len = sut.len();
        match op {
            Op::Put(k, v) => {
                prop_assert_eq!(sut.put(k, v), model.insert(k, v));
                let expected = if len >= cap / 2 { cap * 2 } else { cap };
                prop_assert_eq!(sut.capacity(), expected, "grow rule");
                prop_assert_eq!(sut.get(&k), Some(&v));
            }
            Op::Remove(k) => {
                prop_assert_eq!(sut.remove(&k), model.remove(&k));
                let after = sut.len();
                let shrink = after < len && after > 0 && after <= cap / 8;
                let expected = if shrink { cap / 2 } else { cap };
                prop_assert_eq!(sut.capacity(), expected, "shrink rule");
                prop_assert_eq!(sut.get(&k), None);
            }
            Op::Get(k) => {
                prop_assert_eq!(sut.get(&k), model.get(&k));
            }
            Op::Snapshot => snapshots.push((sut.copy(), model.clone())),
            Op::Clear => {
                sut.clear();
                model.clear();
                prop_assert_eq!(sut.capacity(), cap);
            }
        }

        prop_assert_eq!(sut.len(), model.len());
        prop_assert!(sut.capacity().is_power_of_two());
        prop_assert!(sut.len() < sut.capacity(), "at least one empty slot");
        prop_assert!(sut.probe_chains_intact());
        prop_assert_eq!(sut.iter().count(), model.len());
        for (k, v) in &model {
            prop_assert_eq!(sut.get(k), Some(v));
        }
        for (snap, frozen) in &snapshots {
            prop_assert_eq!(snap.len(), frozen.len());
            prop_assert!(snap.probe_chains_intact());
            for (k, v) in frozen {
                prop_assert_eq!(snap.get(k), Some(v));
            }
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

    // Property: state-machine equivalence with std HashMap using the
    // default hasher, from arbitrary starting capacities.
    #[test]
    fn prop_matches_model(hint in 0usize..64, ops in arb_ops(96)) {
        check_against_model(CowHashMap::with_capacity(hint), ops)?;
    }

    // Property: same as above with a four-bucket hash, so long collision
    // chains and wrap-around repairs are the common case.
    #[test]
    fn prop_matches_model_under_collisions(hint in 0usize..16, ops in arb_ops(48)) {
        let sut = CowHashMap::with_fns(hint, |a: &u16, b: &u16| a == b, |k: &u16| u64::from(*k % 4));
        check_against_model(sut, ops)?;
    }

    // Property: random walks of insert-fresh / remove-oldest starting at the
    // grow threshold keep the capacity rules, the invariants and every key.
    #[test]
    fn prop_threshold_oscillation(exp in 3u32..9, steps in proptest::collection::vec(any::<bool>(), 1..300)) {
        let cap = 1usize << exp;
        let mut ops: Vec<Op> = (0..(cap / 2) as u16).map(|k| Op::Put(k, u32::from(k))).collect();
        let mut live: VecDeque<u16> = (0..(cap / 2) as u16).collect();
        let mut next = (cap / 2) as u16;
        for insert in steps {
            if insert || live.is_empty() {
                ops.push(Op::Put(next, u32::from(next)));
                live.push_back(next);
                next += 1;
            } else if let Some(k) = live.pop_front() {
                ops.push(Op::Remove(k));
            }
        }
        check_against_model(CowHashMap::with_capacity(cap), ops)?;
    }

    // Property: writes through any handle never leak into other handles,
    // whichever handle writes first.
    #[test]
    fn prop_copy_isolation(
        base in proptest::collection::vec((0u16..64, any::<u32>()), 0..40),
        writes in proptest::collection::vec((any::<bool>(), 0u16..64, any::<u32>()), 1..40),
    ) {
        let mut a: CowHashMap<u16, u32> = CowHashMap::new();
        let mut model_a = HashMap::new();
        for (k, v) in base {
            a.put(k, v);
            model_a.insert(k, v);
        }
        let mut b = a.copy();
        let mut model_b = model_a.clone();

        for (to_a, k, v) in writes {
            if to_a {
                a.put(k, v);
                model_a.insert(k, v);
            } else {
                b.remove(&k);
                model_b.remove(&k);
            }
            for (k, v) in &model_a {
                prop_assert_eq!(a.get(k), Some(v));
            }
            for (k, v) in &model_b {
                prop_assert_eq!(b.get(k), Some(v));
            }
            prop_assert_eq!(a.len(), model_a.len());
            prop_assert_eq!(b.len(), model_b.len());
        }
    }
}
