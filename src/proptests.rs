use super::*;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::{BTreeMap, BTreeSet};

/// Checks the arena against the trie shape: every chunk is reachable exactly
/// once, branches sit at depths 0..=6, leaves only below depth 6, no chunk is
/// empty except a fresh root, and occupied leaf slots match `len`.
fn validate_trie<V>(t: &BigArr<V>) {
    let mut seen_branches = vec![false; t.branches.len()];
    let mut seen_leaves = vec![false; t.leaves.len()];
    seen_branches[ChunkId::ROOT.index()] = true;

    let mut occupied = 0usize;
    let mut stack = vec![(ChunkId::ROOT, 0usize)];
    while let Some((id, depth)) = stack.pop() {
        assert!(depth < BRANCH_LEVELS, "branch chunk below depth 6");
        let chunk = &t.branches[id.index()];
        if id != ChunkId::ROOT {
            assert!(chunk.occupied() > 0, "non-root branch chunk is empty");
        }

        for byte in 0..=255u8 {
            let Some(&child) = chunk.get(byte) else {
                continue;
            };
            if depth + 1 < BRANCH_LEVELS {
                assert!(
                    !seen_branches[child.index()],
                    "branch chunk reachable twice"
                );
                seen_branches[child.index()] = true;
                stack.push((child, depth + 1));
            } else {
                assert!(!seen_leaves[child.index()], "leaf chunk reachable twice");
                seen_leaves[child.index()] = true;
                let leaf = &t.leaves[child.index()];
                assert!(leaf.occupied() > 0, "leaf chunk is empty");
                occupied += leaf.occupied();
            }
        }
    }

    assert!(seen_branches.iter().all(|&s| s), "unreachable branch chunk");
    assert!(seen_leaves.iter().all(|&s| s), "unreachable leaf chunk");
    assert_eq!(occupied, t.count, "occupied slots must match BigArr::len");
}

/// Exactly one chunk per distinct key prefix, at every depth.
fn assert_chunk_counts<V, W>(t: &BigArr<V>, model: &BTreeMap<u64, W>) {
    let mut branches = 1;
    for depth in 1..BRANCH_LEVELS {
        let shift = 8 * (key::KEY_BYTES - depth);
        let prefixes: BTreeSet<u64> = model.keys().map(|k| k >> shift).collect();
        branches += prefixes.len();
    }
    let leaves: BTreeSet<u64> = model.keys().map(|&k| key::leaf_prefix(k)).collect();

    let stats = t.stats();
    assert_eq!(stats.branch_chunks, branches);
    assert_eq!(stats.leaf_chunks, leaves.len());
}

fn key_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![
        3 => 0u64..2048,
        2 => (u64::MAX - 2048)..=u64::MAX,
        1 => (any::<u8>(), any::<u8>())
            .prop_map(|(hi, lo)| (u64::from(hi) << 56) | u64::from(lo)),
        1 => any::<u64>(),
    ]
}

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    #[proptest(weight = 5)]
    Set(#[proptest(strategy = "key_strategy()")] u64, u64),
    #[proptest(weight = 4)]
    Get(#[proptest(strategy = "key_strategy()")] u64),
    #[proptest(weight = 1)]
    WriteSlice(
        #[proptest(strategy = "key_strategy()")] u64,
        #[proptest(strategy = "prop::collection::vec(any::<u64>(), 0..600)")] Vec<u64>,
    ),
    #[proptest(weight = 1)]
    ReadSlice(
        #[proptest(strategy = "key_strategy()")] u64,
        #[proptest(strategy = "0usize..600")] usize,
    ),
}

fn range_fits(start: u64, len: usize) -> bool {
    len == 0 || start.checked_add(len as u64 - 1).is_some()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in prop::collection::vec(any::<Op>(), 0..=500)) {
        let mut t: BigArr<u64> = BigArr::new();
        let mut m: BTreeMap<u64, u64> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Set(key, value) => {
                    prop_assert_eq!(*t.set(key, value), value);
                    m.insert(key, value);
                }
                Op::Get(key) => {
                    let before = t.stats();
                    prop_assert_eq!(t.get(key), m.get(&key));
                    prop_assert_eq!(t.stats(), before);
                }
                Op::WriteSlice(start, values) => {
                    let result = t.write_slice(start, &values);
                    if range_fits(start, values.len()) {
                        prop_assert!(result.is_ok());
                        for (i, value) in values.into_iter().enumerate() {
                            m.insert(start + i as u64, value);
                        }
                    } else {
                        prop_assert_eq!(
                            result,
                            Err(Error::RangeOverflow { start, len: values.len() })
                        );
                    }
                }
                Op::ReadSlice(start, len) => {
                    let mut dst = vec![None; len];
                    let result = t.read_slice(start, &mut dst);
                    if range_fits(start, len) {
                        prop_assert!(result.is_ok());
                        for (i, got) in dst.into_iter().enumerate() {
                            prop_assert_eq!(got, m.get(&(start + i as u64)).copied());
                        }
                    } else {
                        prop_assert!(result.is_err());
                    }
                }
            }

            prop_assert_eq!(t.len(), m.len());
        }

        validate_trie(&t);
        assert_chunk_counts(&t, &m);
        for (key, value) in &m {
            prop_assert_eq!(t.get(*key), Some(value));
        }
    }

    #[test]
    fn prop_absent_like_values(
        writes in prop::collection::vec((key_strategy(), any::<Option<u8>>()), 0..200),
        probes in prop::collection::vec(key_strategy(), 0..200),
    ) {
        let mut t: BigArr<Option<u8>> = BigArr::new();
        let mut m: BTreeMap<u64, Option<u8>> = BTreeMap::new();
        for (key, value) in writes {
            t.set(key, value);
            m.insert(key, value);
        }

        for key in probes {
            prop_assert_eq!(t.get(key), m.get(&key));
            prop_assert_eq!(t.contains_key(key), m.contains_key(&key));
        }
        validate_trie(&t);
    }

    #[test]
    fn prop_xy_matches_keys(x in any::<u32>(), y in any::<u32>(), v in any::<u16>()) {
        let mut t: BigArr<u16> = BigArr::new();
        t.set_xy(x, y, v);
        prop_assert_eq!(t.get(key::interleave(x, y)), Some(&v));
        prop_assert_eq!(key::deinterleave(key::interleave(x, y)), (x, y));
        prop_assert_eq!(t.stats().leaf_chunks, 1);
    }
}

/// Calls `f` once with every ordering of `items`, swapping in place
/// (Heap's algorithm, iterative form).
fn permutations<T: Clone>(items: &[T], mut f: impl FnMut(&[T])) {
    let mut order = items.to_vec();
    let mut swaps = vec![0usize; order.len()];
    f(&order);

    let mut level = 1;
    while level < order.len() {
        if swaps[level] < level {
            let other = if level % 2 == 0 { 0 } else { swaps[level] };
            order.swap(other, level);
            f(&order);
            swaps[level] += 1;
            level = 1;
        } else {
            swaps[level] = 0;
            level += 1;
        }
    }
}

#[test]
fn exhaustive_set_order_small_set() {
    let keys: Vec<u64> = vec![0, 1, 255, 256, 1 << 56, u64::MAX];

    let mut expected_stats = None;
    let mut orderings = 0;
    permutations(&keys, |perm| {
        orderings += 1;
        let mut t: BigArr<u64> = BigArr::new();
        let mut m: BTreeMap<u64, u64> = BTreeMap::new();

        for (i, &k) in perm.iter().enumerate() {
            let v = i as u64;
            t.set(k, v);
            m.insert(k, v);
        }

        validate_trie(&t);
        assert_chunk_counts(&t, &m);
        for (k, v) in &m {
            assert_eq!(t.get(*k), Some(v));
        }

        // The shape of the trie does not depend on insertion order.
        let stats = t.stats();
        let expected = *expected_stats.get_or_insert((stats.branch_chunks, stats.leaf_chunks));
        assert_eq!((stats.branch_chunks, stats.leaf_chunks), expected);
    });
    assert_eq!(orderings, 720);
}

/// Clones fine except for the value 13, whose clone panics.
#[derive(Debug, PartialEq)]
struct Brittle(u32);

impl Clone for Brittle {
    fn clone(&self) -> Self {
        assert_ne!(self.0, 13, "clone of 13");
        Brittle(self.0)
    }
}

#[test]
fn panicking_initializer_leaves_trie_unchanged() {
    use std::panic::{catch_unwind, AssertUnwindSafe};

    let mut t: BigArr<u64> = BigArr::new();
    let result = catch_unwind(AssertUnwindSafe(|| {
        t.get_or_insert_with(7, || panic!("initializer failed"));
    }));
    assert!(result.is_err());
    assert_eq!(t.len(), 0);
    assert_eq!(t.get(7), None);
    assert_eq!(t.stats().leaf_chunks, 0);
    validate_trie(&t);

    // Same leaf chunk already allocated by a neighbour.
    t.set(8, 1);
    let result = catch_unwind(AssertUnwindSafe(|| {
        t.get_or_insert_with(7, || panic!("initializer failed"));
    }));
    assert!(result.is_err());
    assert_eq!(t.len(), 1);
    assert_eq!(t.get(7), None);
    validate_trie(&t);

    // An occupied slot never runs the initializer.
    assert_eq!(*t.get_or_insert_with(8, || panic!("not called")), 1);
}

#[test]
fn panicking_clone_keeps_len_in_sync() {
    use std::panic::{catch_unwind, AssertUnwindSafe};

    // Value 13 lands mid-way through the second leaf chunk (key 263).
    let src: Vec<Brittle> = (0..20).map(Brittle).collect();
    let mut t: BigArr<Brittle> = BigArr::new();
    let result = catch_unwind(AssertUnwindSafe(|| t.write_slice(250, &src)));
    assert!(result.is_err());
    assert_eq!(t.len(), 13);
    assert_eq!(t.get(262), Some(&Brittle(12)));
    assert_eq!(t.get(263), None);
    validate_trie(&t);

    // Value 13 is the first write into a fresh leaf chunk (key 256).
    let mut t: BigArr<Brittle> = BigArr::new();
    let result = catch_unwind(AssertUnwindSafe(|| t.write_slice(243, &src)));
    assert!(result.is_err());
    assert_eq!(t.len(), 13);
    assert_eq!(t.stats().leaf_chunks, 1);
    validate_trie(&t);
}
