//! # Property-Based Tests
//!
//! Algebraic laws of pointers, tree merging and cache keying.

use kernql_core::cache::{cache_key, hash_combine};
use kernql_core::{KernqlError, Pointer, merge_configs};
use proptest::collection::{btree_map, vec};
use proptest::prelude::*;
use serde_json::{Map, Value, json};

// =============================================================================
// STRATEGIES
// =============================================================================

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        "[a-z0-9_.]{0,12}".prop_map(Value::from),
    ]
}

fn object_with_prefix(prefix: &'static str) -> impl Strategy<Value = Value> {
    btree_map("[a-z]{1,6}", scalar(), 0..8).prop_map(move |entries| {
        let map: Map<String, Value> = entries
            .into_iter()
            .map(|(k, v)| (format!("{}{}", prefix, k), v))
            .collect();
        Value::Object(map)
    })
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Display then parse returns the same pointer, escapes included.
    #[test]
    fn pointer_round_trips(segments in vec("[a-z~/0-9]{0,8}", 0..6)) {
        let pointer = Pointer::from_segments(segments.clone());
        let reparsed = Pointer::parse(&pointer.to_string()).expect("parse");
        prop_assert_eq!(reparsed.segments(), segments.as_slice());
        prop_assert_eq!(reparsed, pointer);
    }

    /// Joining two pointers concatenates their segments.
    #[test]
    fn pointer_join_concatenates(
        left in vec("[a-z]{1,5}", 0..4),
        right in vec("[a-z]{1,5}", 0..4),
    ) {
        let joined = Pointer::from_segments(left.clone()).join(&Pointer::from_segments(right.clone()));
        let expected: Vec<String> = left.into_iter().chain(right).collect();
        prop_assert_eq!(joined.segments(), expected.as_slice());
    }

    /// Merging trees with disjoint keys gives the same tree in either order.
    #[test]
    fn disjoint_merge_commutes(a in object_with_prefix("a_"), b in object_with_prefix("b_")) {
        let mut ab = a.clone();
        merge_configs(&mut ab, &b).expect("merge");
        let mut ba = b.clone();
        merge_configs(&mut ba, &a).expect("merge");
        prop_assert_eq!(ab, ba);
    }

    /// Colliding scalars accumulate into a sequence in merge order.
    #[test]
    fn colliding_scalars_promote(values in vec(any::<i64>(), 2..8)) {
        let mut tree = json!({"k": values[0]});
        for value in &values[1..] {
            merge_configs(&mut tree, &json!({"k": value})).expect("merge");
        }
        prop_assert_eq!(tree, json!({"k": values}));
    }

    /// An object never merges with a scalar, from either side.
    #[test]
    fn object_against_scalar_mismatches(value in scalar()) {
        let mut scalar_target = json!({"k": value.clone()});
        let err = merge_configs(&mut scalar_target, &json!({"k": {"inner": 1}}));
        prop_assert!(matches!(err, Err(KernqlError::TypeMismatch(_))));

        let mut object_target = json!({"k": {"inner": 1}});
        let err = merge_configs(&mut object_target, &json!({"k": value}));
        prop_assert!(matches!(err, Err(KernqlError::TypeMismatch(_))));
    }

    /// Swapping two distinct arguments changes the combined key.
    #[test]
    fn hash_combine_is_order_sensitive(
        seed in any::<u64>(),
        a in "[a-z]{1,10}",
        b in "[a-z]{1,10}",
    ) {
        prop_assume!(a != b);
        let forward = hash_combine(hash_combine(seed, a.as_str()), b.as_str());
        let backward = hash_combine(hash_combine(seed, b.as_str()), a.as_str());
        prop_assert_ne!(forward, backward);
    }

    /// Cache keys are a pure function of descriptor and arguments.
    #[test]
    fn cache_key_is_deterministic(root in "[a-z/]{1,20}", recursive in any::<bool>()) {
        let args = (root.clone(), recursive);
        prop_assert_eq!(cache_key("kernql_ls", &args), cache_key("kernql_ls", &(root, recursive)));
    }
}

// =============================================================================
// FIXED CASES
// =============================================================================

#[test]
fn array_promotion_law() {
    let mut tree = json!({"k": 5});
    merge_configs(&mut tree, &json!({"k": 6})).expect("merge");
    assert_eq!(tree, json!({"k": [5, 6]}));
    merge_configs(&mut tree, &json!({"k": 7})).expect("merge");
    assert_eq!(tree, json!({"k": [5, 6, 7]}));
}

#[test]
fn representative_pairs_hash_differently() {
    for (a, b) in [("a", "b"), ("/isis/data", "true"), ("mro", "ctx")] {
        assert_ne!(
            hash_combine(hash_combine(0, a), b),
            hash_combine(hash_combine(0, b), a)
        );
    }
}
