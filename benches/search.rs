use criterion::{Criterion, criterion_group, criterion_main};
use doc_rag::database::FlatIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;

const DIMENSION: usize = 1536;

fn random_rows(rng: &mut StdRng, rows: usize) -> Vec<Vec<f32>> {
    (0..rows)
        .map(|_| (0..DIMENSION).map(|_| rng.r#gen::<f32>() - 0.5).collect())
        .collect()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let rows = random_rows(&mut rng, 2_000);
    let query = random_rows(&mut rng, 1).remove(0);

    c.bench_function("index_build", |b| {
        b.iter(|| FlatIndex::build(DIMENSION, black_box(&rows)))
    });

    let index = FlatIndex::build(DIMENSION, &rows).expect("rows match dimension");
    c.bench_function("index_search_top5", |b| {
        b.iter(|| index.search(black_box(&query), 5))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
