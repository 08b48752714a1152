//! Deterministic stand-in vectors for when the provider is unreachable

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::embedding::normalize;

/// Seed derived from the text's char codes
fn seed_for(text: &str) -> u64 {
    text.chars().fold(0xcbf2_9ce4_8422_2325u64, |acc, c| {
        acc.wrapping_mul(31).wrapping_add(c as u64)
    })
}

/// Unit-length pseudo-random vector seeded from `text`
///
/// Identical text always yields an identical vector. The values carry no
/// meaning; they only keep the pipeline shape-correct in degraded mode.
pub fn deterministic_fallback_vector(text: &str, dimensions: usize) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed_for(text));
    let mut vector: Vec<f32> = (0..dimensions).map(|_| rng.gen_range(-1.0f32..1.0)).collect();
    normalize(&mut vector);
    vector
}
