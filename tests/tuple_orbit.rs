//! Orbit engine tests on the tuple action of large permutation groups.

use konieczny::invariants::AuditInvariants;
use konieczny::element::Transformation;
use konieczny::orbit::{Action, OnTuples, Orbit};

fn transposition(n: u8) -> Transformation {
    let mut v: Vec<u8> = (0..n).collect();
    v.swap(0, 1);
    Transformation::new(v).unwrap()
}

fn cycle(n: u8) -> Transformation {
    let v: Vec<u8> = (1..n).chain(std::iter::once(0)).collect();
    Transformation::new(v).unwrap()
}

#[test]
fn symmetric_group_on_20_points_acting_on_4_tuples() {
    let mut o: Orbit<Transformation, OnTuples> = Orbit::new();
    o.add_seed(vec![0, 1, 2, 3]);
    o.add_generator(transposition(20)).unwrap();
    o.add_generator(cycle(20)).unwrap();
    o.run().unwrap();
    // Ordered 4-tuples of distinct points: 20 · 19 · 18 · 17.
    assert_eq!(o.len(), 116280);
    assert_eq!(o.position(&vec![0, 1, 2, 3]), Some(0));
    assert_eq!(o.position(&vec![9, 0, 2, 19]), Some(25295));
}

#[test]
fn transitive_orbit_is_one_component_with_valid_multipliers() {
    let mut o: Orbit<Transformation, OnTuples> = Orbit::new();
    o.add_seed(vec![0, 1, 2]);
    o.add_generator(transposition(7)).unwrap();
    o.add_generator(cycle(7)).unwrap();
    o.run().unwrap();
    assert_eq!(o.len(), 7 * 6 * 5);
    assert_eq!(o.number_of_sccs().unwrap(), 1);
    o.checked_invariants().unwrap();

    let root = o.root_of_scc(0).unwrap();
    let mut dst = Vec::new();
    for i in 0..o.len() {
        OnTuples::apply(&mut dst, o.at(i), o.multiplier_to_scc_root(i).unwrap());
        assert_eq!(&dst, o.at(root));
        OnTuples::apply(&mut dst, o.at(root), o.multiplier_from_scc_root(i).unwrap());
        assert_eq!(&dst, o.at(i));
    }
}
