//! Randomised properties of vector clocks and version-set reconciliation

use dynamokv::replica::{VectorClock, VersionSet, VersionedEntry};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const NODES: [&str; 5] = ["n1", "n2", "n3", "n4", "n5"];
const ROUNDS: usize = 500;

fn random_clock(rng: &mut StdRng) -> VectorClock {
    let mut clock = VectorClock::new();
    for id in NODES {
        if rng.gen_bool(0.6) {
            for _ in 0..rng.gen_range(1..=4) {
                clock.increment(id);
            }
        }
    }
    clock
}

#[test]
fn combine_dominates_both_inputs() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..ROUNDS {
        let a = random_clock(&mut rng);
        let b = random_clock(&mut rng);

        let mut combined = a.clone();
        combined.combine([&b]);

        assert!(a.less_than_or_equal(&combined), "{} !<= {}", a, combined);
        assert!(b.less_than_or_equal(&combined), "{} !<= {}", b, combined);
    }
}

#[test]
fn combine_is_order_independent() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..ROUNDS {
        let a = random_clock(&mut rng);
        let b = random_clock(&mut rng);
        let c = random_clock(&mut rng);

        let mut left = a.clone();
        left.combine([&b, &c]);
        let mut right = a.clone();
        right.combine([&c, &b]);
        assert!(left.equals(&right));

        // Associative: (a + b) + c == a + (b + c)
        let mut nested = a.clone();
        nested.combine([&VectorClock::combined([&b, &c])]);
        assert!(left.equals(&nested));
    }
}

#[test]
fn clock_equals_itself_and_is_not_concurrent() {
    let mut rng = StdRng::seed_from_u64(13);
    for _ in 0..ROUNDS {
        let a = random_clock(&mut rng);
        assert!(a.equals(&a));
        assert!(!a.concurrent(&a));
        assert!(a.less_than_or_equal(&a));
        assert!(!a.less_than(&a));
    }
}

#[test]
fn exactly_one_relation_holds() {
    let mut rng = StdRng::seed_from_u64(17);
    for _ in 0..ROUNDS {
        let a = random_clock(&mut rng);
        let b = random_clock(&mut rng);

        let relations = [
            a.equals(&b),
            a.less_than(&b),
            b.less_than(&a),
            a.concurrent(&b),
        ];
        assert_eq!(
            relations.iter().filter(|r| **r).count(),
            1,
            "a={} b={}",
            a,
            b
        );
    }
}

#[test]
fn increment_strictly_advances() {
    let mut rng = StdRng::seed_from_u64(19);
    for _ in 0..ROUNDS {
        let a = random_clock(&mut rng);
        let id = NODES[rng.gen_range(0..NODES.len())];
        let next = a.incremented(id);
        assert!(a.less_than(&next));
        assert_eq!(next.get(id), a.get(id) + 1);
    }
}

#[test]
fn version_set_stays_pairwise_concurrent_under_any_merge_order() {
    let mut rng = StdRng::seed_from_u64(23);
    for _ in 0..100 {
        let entries: Vec<VersionedEntry> = (0..8)
            .map(|i| VersionedEntry::new(random_clock(&mut rng), vec![i as u8]))
            .collect();

        let mut forward = VersionSet::new();
        forward.merge_all(entries.iter().cloned());
        let mut backward = VersionSet::new();
        backward.merge_all(entries.iter().rev().cloned());

        for set in [&forward, &backward] {
            for (i, x) in set.iter().enumerate() {
                for y in set.iter().skip(i + 1) {
                    assert!(x.context.concurrent(&y.context));
                }
            }
        }

        // Same surviving contexts regardless of arrival order
        let mut f: Vec<String> = forward.iter().map(|e| e.context.to_string()).collect();
        let mut b: Vec<String> = backward.iter().map(|e| e.context.to_string()).collect();
        f.sort();
        b.sort();
        assert_eq!(f, b);
    }
}

#[test]
fn merge_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(29);
    for _ in 0..100 {
        let entries: Vec<VersionedEntry> = (0..6)
            .map(|i| VersionedEntry::new(random_clock(&mut rng), vec![i as u8]))
            .collect();

        let mut once = VersionSet::new();
        once.merge_all(entries.iter().cloned());
        let mut twice = once.clone();
        twice.merge_all(entries.iter().cloned());
        assert_eq!(once, twice);
    }
}
