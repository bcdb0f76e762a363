use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use konieczny::element::{MonoidElement, Transformation};
use konieczny::orbit::{OnImages, Orbit};

fn random_transformation(deg: usize, rng: &mut SmallRng) -> Transformation {
    let images: Vec<u8> = (0..deg).map(|_| rng.gen_range(0..deg) as u8).collect();
    Transformation::new(images).unwrap()
}

fn bench_lambda_orbit(c: &mut Criterion) {
    let mut group = c.benchmark_group("lambda-orbit");

    for &(deg, n_gens) in &[(8usize, 3usize), (10, 4), (12, 4)] {
        let mut rng = SmallRng::seed_from_u64(42);
        let gens: Vec<Transformation> = (0..n_gens)
            .map(|_| random_transformation(deg, &mut rng))
            .collect();

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("deg{deg}-gens{n_gens}")),
            &gens,
            |b, gens| {
                b.iter(|| {
                    let mut o: Orbit<Transformation, OnImages> = Orbit::new();
                    let id = Transformation::identity_of_degree(deg).unwrap();
                    o.add_seed(Transformation::lambda_of(&id).unwrap());
                    for g in gens {
                        o.add_generator(g.clone()).unwrap();
                    }
                    o.run().unwrap();
                    o.len()
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_lambda_orbit);
criterion_main!(benches);
