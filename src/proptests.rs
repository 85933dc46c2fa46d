use super::*;

use proptest::prelude::*;
use std::collections::BTreeMap;
use std::ops::Bound;

fn validate_tree<V>(t: &RadixTree<V>) {
    let errors = t.verify_integrity();
    assert!(errors.is_empty(), "integrity violations: {errors:?}\n{}", t.dump());
    assert!(
        t.node_count() <= 2 * t.len().max(1),
        "node count {} exceeds twice the key count {}",
        t.node_count(),
        t.len()
    );
}

/// Brute-force answer for a seek against a sorted model.
fn model_seek<'m>(m: &'m BTreeMap<Vec<u8>, u64>, op: SeekOp, target: &[u8]) -> Option<&'m [u8]> {
    let t = target.to_vec();
    let found = match op {
        SeekOp::Eq => m.get_key_value(target).map(|(k, _)| k),
        SeekOp::Gt => m.range((Bound::Excluded(t), Bound::Unbounded)).next().map(|(k, _)| k),
        SeekOp::Ge => m.range(t..).next().map(|(k, _)| k),
        SeekOp::Lt => m.range(..t).next_back().map(|(k, _)| k),
        SeekOp::Le => m.range(..=t).next_back().map(|(k, _)| k),
        SeekOp::Min => m.keys().next(),
        SeekOp::Max => m.keys().next_back(),
    };
    found.map(Vec::as_slice)
}

#[derive(Clone, Debug)]
enum Op {
    Insert(Vec<u8>, u64),
    Remove(Vec<u8>),
    Get(Vec<u8>),
    Seek(SeekOp, Vec<u8>),
    Shrink,
}

fn key_strategy() -> impl Strategy<Value = Vec<u8>> + Clone {
    // A small alphabet, including 0x00 and 0xff, forces shared prefixes.
    prop::collection::vec(prop::sample::select(vec![0u8, 1, b'a', b'b', 0xff]), 0..=6)
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let key = key_strategy();
    let op = prop_oneof![
        40 => (key.clone(), any::<u64>()).prop_map(|(k, v)| Op::Insert(k, v)),
        25 => key.clone().prop_map(Op::Remove),
        10 => key.clone().prop_map(Op::Get),
        24 => (any::<SeekOp>(), key.clone()).prop_map(|(op, k)| Op::Seek(op, k)),
        1 => Just(Op::Shrink),
    ];
    prop::collection::vec(op, 0..=500)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in ops_strategy()) {
        let mut t: RadixTree<u64> = RadixTree::new();
        let mut m: BTreeMap<Vec<u8>, u64> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    let old_t = t.insert(&key, value);
                    let old_m = m.insert(key, value);
                    prop_assert_eq!(old_t, old_m);
                }
                Op::Remove(key) => {
                    let old_t = t.remove(&key);
                    let old_m = m.remove(key.as_slice());
                    prop_assert_eq!(old_t, old_m);
                }
                Op::Get(key) => {
                    let got_t = t.get(&key).copied();
                    let got_m = m.get(key.as_slice()).copied();
                    prop_assert_eq!(got_t, got_m);
                }
                Op::Seek(op, key) => {
                    let it = t.seek(op, &key);
                    prop_assert_eq!(it.key(), model_seek(&m, op, &key), "seek {} {:?}", op, key);
                    if let Some(k) = it.key() {
                        prop_assert_eq!(it.value(), m.get(k));
                    }
                }
                Op::Shrink => t.shrink_to_fit(),
            }

            prop_assert_eq!(t.len(), m.len());
        }

        validate_tree(&t);
        let got: Vec<(Vec<u8>, u64)> = t.iter().map(|(k, v)| (k, *v)).collect();
        let expected: Vec<(Vec<u8>, u64)> = m.iter().map(|(k, v)| (k.clone(), *v)).collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_steps_match_model(
        keys in prop::collection::btree_set(key_strategy(), 0..40),
        op in any::<SeekOp>(),
        target in key_strategy(),
        forward in any::<bool>(),
    ) {
        let m: BTreeMap<Vec<u8>, u64> = keys.iter().cloned().zip(0..).collect();
        let t: RadixTree<u64> = m.iter().map(|(k, v)| (k.clone(), *v)).collect();

        let mut it = t.seek(op, &target);
        let start = model_seek(&m, op, &target).map(<[u8]>::to_vec);
        prop_assert_eq!(it.key().map(<[u8]>::to_vec), start.clone());

        let expected: Vec<Vec<u8>> = match (&start, forward) {
            (Some(s), true) => m.range::<Vec<u8>, _>((Bound::Excluded(s), Bound::Unbounded))
                .map(|(k, _)| k.clone()).collect(),
            (Some(s), false) => m.range::<Vec<u8>, _>(..s).rev().map(|(k, _)| k.clone()).collect(),
            (None, _) => Vec::new(),
        };
        let dir = if forward { Direction::Forward } else { Direction::Backward };
        let mut got = Vec::new();
        if start.is_some() {
            while it.step(dir) {
                got.push(it.key().map(<[u8]>::to_vec).unwrap());
            }
            prop_assert!(it.is_exhausted());
        }
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_stream_id_roundtrip(ms in any::<u64>(), seq in any::<u64>()) {
        let id = StreamId::new(ms, seq);
        prop_assert_eq!(StreamId::decode(&id.encode()), Ok(id));
        prop_assert_eq!(id.to_string().parse::<StreamId>(), Ok(id));
    }

    #[test]
    fn prop_stream_id_order(a in any::<(u64, u64)>(), b in any::<(u64, u64)>()) {
        let a = StreamId::new(a.0, a.1);
        let b = StreamId::new(b.0, b.1);
        prop_assert_eq!(StreamId::compare(&a, &b), a.encode().cmp(&b.encode()));
    }

    #[test]
    fn prop_next_strictly_increases(
        start in any::<(u64, u64)>(),
        walls in prop::collection::vec(any::<u64>(), 1..100),
    ) {
        let mut last = StreamId::new(start.0, start.1);
        for wall in walls {
            match StreamId::next(&last, wall) {
                Ok(next) => {
                    prop_assert!(next > last);
                    last = next;
                }
                Err(Error::SequenceOverflow { ms }) => {
                    prop_assert_eq!(ms, last.ms);
                    prop_assert_eq!(last.seq, u64::MAX);
                    prop_assert!(wall <= last.ms);
                }
                Err(e) => prop_assert!(false, "unexpected error {e}"),
            }
        }
    }

    #[test]
    fn prop_typed_i64_order(mut values in prop::collection::vec(any::<i64>(), 0..64)) {
        let mut t: RadixTree<()> = RadixTree::new();
        for v in &values {
            t.insert_typed(v, ());
        }
        values.sort_unstable();
        values.dedup();
        let got: Vec<i64> = t.iter().map(|(k, _)| i64::decode(&k).unwrap()).collect();
        prop_assert_eq!(got, values);
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

fn small_set() -> Vec<Vec<u8>> {
    vec![
        b"".to_vec(),
        b"a".to_vec(),
        b"b".to_vec(),
        b"aa".to_vec(),
        b"ab".to_vec(),
        b"ba".to_vec(),
    ]
}

#[test]
fn exhaustive_insert_order_small_set() {
    let keys = small_set();

    for_each_permutation(&keys, |perm| {
        let mut t: RadixTree<u64> = RadixTree::new();
        let mut m: BTreeMap<Vec<u8>, u64> = BTreeMap::new();

        for (i, k) in perm.into_iter().enumerate() {
            let v = i as u64;
            assert_eq!(t.insert(&k, v), m.insert(k, v));
            validate_tree(&t);
        }

        let got: Vec<(Vec<u8>, u64)> = t.iter().map(|(k, v)| (k, *v)).collect();
        let expected: Vec<(Vec<u8>, u64)> = m.iter().map(|(k, v)| (k.clone(), *v)).collect();
        assert_eq!(got, expected);
    });
}

#[test]
fn exhaustive_remove_order_small_set() {
    let keys = small_set();

    // Insert in a fixed order, then remove in all permutations.
    let mut base_tree: RadixTree<u64> = RadixTree::new();
    let mut base_map: BTreeMap<Vec<u8>, u64> = BTreeMap::new();
    for (i, k) in keys.iter().enumerate() {
        let v = i as u64;
        assert_eq!(base_tree.insert(k, v), base_map.insert(k.clone(), v));
    }

    for_each_permutation(&keys, |perm| {
        let mut t = base_tree.clone();
        let mut m = base_map.clone();

        for k in perm {
            assert_eq!(t.remove(&k), m.remove(k.as_slice()));
            assert_eq!(t.len(), m.len());
            validate_tree(&t);

            // Every seek still agrees with the model after each removal.
            for target in &keys {
                for op in [SeekOp::Gt, SeekOp::Ge, SeekOp::Lt, SeekOp::Le] {
                    assert_eq!(t.seek(op, target).key(), model_seek(&m, op, target));
                }
            }
        }
        assert_eq!(t.len(), 0);
        assert!(t.root.is_none());
    });
}

#[test]
fn stream_ids_strictly_increase_under_random_clock() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(7);
    let clock = ManualClock::new(1_000);
    let mut s = Stream::with_clock(&clock);
    let mut last = StreamId::MIN;
    for i in 0..5_000u32 {
        // Mostly forward, sometimes backwards.
        clock.set(1_000 + rng.gen_range(0..50) + u64::from(i / 10));
        let id = s.append(IdSpec::Auto, Entry::new().with("i", i.to_string())).unwrap();
        assert!(id > last, "{id} after {last}");
        last = id;
    }
    let ids: Vec<StreamId> = s.range(Bound::Unbounded, Bound::Unbounded).map(|(id, _)| id).collect();
    assert_eq!(ids.len(), 5_000);
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
    validate_tree(s.tree());
}
