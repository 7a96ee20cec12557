// Deterministic pseudo-embeddings used when the Google backend is unreachable

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SEED_MODULUS: u128 = 1_000_000;

/// Seed derived from the MD5 digest of `text`, reduced modulo one million
#[inline]
pub fn seed_for(text: &str) -> u64 {
    let digest = md5::compute(text.as_bytes());
    let seed = u128::from_be_bytes(digest.0) % SEED_MODULUS;
    // Always below one million, so the narrowing cannot truncate
    seed as u64
}

/// A `dimension`-length vector of uniform values in [0, 1) seeded by `text`.
///
/// Equal texts always produce equal vectors. The values carry no semantic
/// meaning and rankings built from them are arbitrary.
#[inline]
pub fn pseudo_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed_for(text));
    (0..dimension).map(|_| rng.r#gen::<f32>()).collect()
}
