//! Vector similarity

use crate::domain::DomainError;

/// Calculate cosine similarity between two vectors
///
/// Both vectors must be non-empty and of equal length; violating that is a
/// caller error. A zero-magnitude vector has similarity 0 with everything.
/// The result is clamped to [-1, 1].
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, DomainError> {
    if a.is_empty() || b.is_empty() {
        return Err(DomainError::validation(
            "Cannot compute similarity of an empty vector",
        ));
    }

    if a.len() != b.len() {
        return Err(DomainError::dimension_mismatch(a.len(), b.len()));
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    let similarity = dot / (norm_a.sqrt() * norm_b.sqrt());

    Ok(similarity.clamp(-1.0, 1.0) as f32)
}

/// Scale a vector to unit length in place (zero vectors are left untouched)
pub fn normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm > f32::EPSILON {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}
