//! Decomposition tests over transformation monoids.

use std::collections::HashSet;

use konieczny::invariants::AuditInvariants;
use konieczny::element::{MonoidElement, Transformation};
use konieczny::error::KoniecznyError;
use konieczny::Konieczny;

fn t(v: &[u8]) -> Transformation {
    Transformation::new(v.to_vec()).unwrap()
}

/// The full closure of the generators, multiplied out pairwise. Only
/// for small inputs; used to cross-check the implicit representation.
fn brute_force_closure(gens: &[Transformation]) -> HashSet<Transformation> {
    let mut elements: Vec<Transformation> = Vec::new();
    let mut seen: HashSet<Transformation> = HashSet::new();
    for g in gens {
        if seen.insert(g.clone()) {
            elements.push(g.clone());
        }
    }
    let mut at = 0;
    while at < elements.len() {
        for g in gens {
            let y = Transformation::product_of(&elements[at], g, 0);
            if seen.insert(y.clone()) {
                elements.push(y);
            }
        }
        at += 1;
    }
    seen
}

#[test]
fn degree_five_monoid_has_size_3125() {
    let s = Konieczny::new(vec![
        t(&[1, 0, 2, 3, 4]),
        t(&[1, 2, 3, 4, 0]),
        t(&[0, 0, 2, 3, 4]),
    ])
    .unwrap();
    assert_eq!(s.size(), 3125);
    assert_eq!(s.number_of_idempotents(), 196);
    // One D-class per rank from 5 down to 1: the symmetric group on
    // top, then the rank strata of the full transformation monoid.
    assert_eq!(s.number_of_d_classes(), 5);
    let mut ranks: Vec<usize> = s.d_classes().map(|d| d.rank()).collect();
    ranks.sort_unstable();
    assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
    assert!(s.d_classes().all(|d| d.is_regular()));
    assert!(!s.identity_adjoined());
    s.checked_invariants().unwrap();
}

#[test]
fn sizes_partition_across_d_classes() {
    let s = Konieczny::new(vec![
        t(&[1, 0, 2, 3, 4]),
        t(&[1, 2, 3, 4, 0]),
        t(&[0, 0, 2, 3, 4]),
    ])
    .unwrap();
    let total: u64 = s.d_classes().map(|d| d.size()).sum();
    assert_eq!(total, s.size());
    // Each representative is claimed by its own class and no other.
    for (i, d) in s.d_classes().enumerate() {
        assert_eq!(s.d_class_id_of(d.rep()).map(|id| id.index()), Some(i));
    }
}

// The two large scenarios take a while without optimisation; run them
// with `cargo test --release -- --ignored`.
#[test]
#[ignore]
fn degree_eight_monoid_has_size_597369() {
    let s = Konieczny::new(vec![
        t(&[1, 7, 2, 6, 0, 4, 1, 5]),
        t(&[2, 4, 6, 1, 4, 5, 2, 7]),
        t(&[3, 0, 7, 2, 4, 6, 2, 4]),
        t(&[3, 2, 3, 4, 5, 3, 0, 1]),
        t(&[4, 3, 7, 7, 4, 5, 0, 4]),
        t(&[5, 6, 3, 0, 3, 0, 5, 1]),
        t(&[6, 0, 1, 1, 1, 6, 3, 4]),
        t(&[7, 7, 4, 0, 6, 4, 1, 7]),
    ])
    .unwrap();
    assert_eq!(s.size(), 597369);
    assert_eq!(s.number_of_idempotents(), 8194);
}

#[test]
#[ignore]
fn degree_nine_monoid_class_counts() {
    let s = Konieczny::new(vec![
        t(&[2, 1, 0, 4, 2, 1, 1, 8, 0]),
        t(&[1, 7, 6, 2, 5, 1, 1, 4, 3]),
        t(&[1, 0, 7, 2, 1, 3, 1, 3, 7]),
        t(&[0, 3, 8, 1, 2, 8, 1, 7, 0]),
        t(&[0, 0, 0, 2, 7, 7, 5, 5, 3]),
    ])
    .unwrap();
    assert_eq!(s.size(), 232511);
    assert_eq!(s.number_of_d_classes(), 2122);
    assert_eq!(s.number_of_l_classes(), 8450);
    assert_eq!(s.number_of_r_classes(), 14706);
}

#[test]
fn membership_is_exact() {
    let s = Konieczny::new(vec![
        t(&[1, 0, 2, 3, 4]),
        t(&[1, 2, 3, 4, 0]),
        t(&[0, 0, 2, 3, 4]),
    ])
    .unwrap();
    for g in s.generators() {
        assert!(s.contains(g));
    }
    // Degree mismatches are not members (and not errors).
    assert!(!s.contains(&t(&[1, 0, 2, 3, 4, 5])));

    let tt = Konieczny::new(vec![t(&[1, 0, 3, 4, 2]), t(&[0, 0, 2, 3, 4])]).unwrap();
    assert!(tt.contains(&t(&[1, 0, 2, 3, 4])));
    assert!(tt.contains(&t(&[0, 0, 2, 3, 4])));
    // The 5-cycle shares λ and ρ with the units but is not generated.
    assert!(!tt.contains(&t(&[1, 2, 3, 4, 0])));
    assert!(!tt.contains(&t(&[1, 2, 3, 0, 4])));
    assert!(!tt.contains(&t(&[0, 2, 3, 4, 1])));
    assert!(tt.d_class_of(&t(&[1, 2, 3, 4, 0])).is_none());
}

#[test]
fn agrees_with_brute_force_on_small_monoids() {
    let gens = vec![t(&[1, 0, 2, 3]), t(&[1, 2, 3, 0]), t(&[0, 0, 2, 3])];
    let s = Konieczny::new(gens.clone()).unwrap();
    let closure = brute_force_closure(&gens);
    assert_eq!(s.size(), closure.len() as u64);

    // Exhaust the ambient monoid of degree 4.
    let mut idempotents = 0;
    for code in 0..4u32.pow(4) {
        let images: Vec<u8> = (0..4).map(|i| ((code >> (2 * i)) & 3) as u8).collect();
        let x = t(&images);
        assert_eq!(s.contains(&x), closure.contains(&x), "at {x:?}");
        if closure.contains(&x) && Transformation::is_idempotent(&x) {
            idempotents += 1;
        }
    }
    assert_eq!(s.number_of_idempotents(), idempotents);
}

#[test]
fn brute_force_with_adjoined_identity() {
    // No unit among the generators: the identity is adjoined
    // internally and excluded from the counts.
    let gens = vec![t(&[0, 0, 2]), t(&[1, 2, 1])];
    let s = Konieczny::new(gens.clone()).unwrap();
    assert!(s.identity_adjoined());
    let closure = brute_force_closure(&gens);
    assert_eq!(s.size(), closure.len() as u64);
    assert!(!closure.contains(&t(&[0, 1, 2])));
    for code in 0..27u32 {
        let images: Vec<u8> = vec![
            (code % 3) as u8,
            ((code / 3) % 3) as u8,
            ((code / 9) % 3) as u8,
        ];
        let x = t(&images);
        assert_eq!(s.contains(&x), closure.contains(&x), "at {x:?}");
    }
}

#[test]
fn found_idempotents_are_idempotent_and_d_equivalent() {
    let s = Konieczny::new(vec![
        t(&[1, 0, 2, 3, 4]),
        t(&[1, 2, 3, 4, 0]),
        t(&[0, 0, 2, 3, 4]),
    ])
    .unwrap();
    let x = t(&[2, 2, 0, 3, 4]);
    assert!(!Transformation::is_idempotent(&x));
    let e = s.find_idempotent(&x).unwrap().expect("x is regular");
    assert!(Transformation::is_idempotent(&e));
    let dx = s.d_class_id_of(&x).unwrap();
    let de = s.d_class_id_of(&e).unwrap();
    assert_eq!(dx, de);
}

#[test]
fn singleton_identity_generator() {
    let id = Transformation::identity_of_degree(4).unwrap();
    let s = Konieczny::new(vec![id.clone()]).unwrap();
    assert_eq!(s.size(), 1);
    assert_eq!(s.number_of_d_classes(), 1);
    assert!(s.contains(&id));
    assert!(!s.contains(&t(&[0, 0, 2, 3])));
}

#[test]
fn group_generators_make_one_group_class() {
    // The symmetric group on 4 points.
    let s = Konieczny::new(vec![t(&[1, 0, 2, 3]), t(&[1, 2, 3, 0])]).unwrap();
    assert_eq!(s.size(), 24);
    assert_eq!(s.number_of_d_classes(), 1);
    let d = s.d_classes().next().unwrap();
    assert_eq!(d.h_class().len(), 24);
    assert_eq!(d.number_of_l_classes(), 1);
    assert_eq!(d.number_of_r_classes(), 1);
}

#[test]
fn empty_generators_fail_construction() {
    assert_eq!(
        Konieczny::<Transformation>::new(Vec::new()).unwrap_err(),
        KoniecznyError::EmptyGenerators
    );
}

#[test]
fn mixed_degrees_fail_construction() {
    assert_eq!(
        Konieczny::new(vec![t(&[0, 1]), t(&[0, 1, 2])]).unwrap_err(),
        KoniecznyError::MixedGeneratorDegrees {
            expected: 2,
            found: 3
        }
    );
}

#[test]
fn degrees_beyond_the_bitset_fail_construction() {
    let v: Vec<u8> = (0..65).collect();
    assert_eq!(
        Konieczny::new(vec![Transformation::new(v).unwrap()]).unwrap_err(),
        KoniecznyError::DegreeOutOfRange { degree: 65, max: 64 }
    );
}

#[test]
fn idempotent_count_matches_group_coordinates() {
    // For every regular class, the number of idempotents equals the
    // number of (L, R) index pairs with group coordinates; the engine
    // counts exactly those, so cross-check against the brute force.
    let gens = vec![t(&[1, 2, 0, 0]), t(&[0, 0, 1, 2])];
    let s = Konieczny::new(gens.clone()).unwrap();
    let closure = brute_force_closure(&gens);
    let brute: u64 = closure
        .iter()
        .filter(|x| Transformation::is_idempotent(x))
        .count() as u64;
    assert_eq!(s.number_of_idempotents(), brute);
}

#[test]
fn d_relation_edges_are_acyclic() {
    let s = Konieczny::new(vec![
        t(&[1, 0, 2, 3, 4]),
        t(&[1, 2, 3, 4, 0]),
        t(&[0, 0, 2, 3, 4]),
    ])
    .unwrap();
    for (i, d) in s.d_classes().enumerate() {
        let id = s.d_class_id_of(d.rep()).unwrap();
        assert_eq!(id.index(), i);
        for &above in s.d_classes_above(id) {
            assert_ne!(above.index(), i);
            // The recorded classes really are above: their rank is at
            // least ours.
            assert!(s.d_class(above).rank() >= d.rank());
        }
    }
}
