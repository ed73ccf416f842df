//! Cosine similarity and small vector helpers.
//!
//! Accumulation happens in `f64` so long vectors of small components do not
//! lose precision before the final division.

use intentdb_core::error::Error;

pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt() as f32
}

/// Scales `v` to unit length in place. Zero vectors are left untouched.
pub fn normalize(v: &mut [f32]) {
    let norm = l2_norm(v);
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Cosine similarity in `[-1, 1]`.
///
/// Fails on length mismatch; a zero vector on either side scores 0.0.
pub fn try_cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, Error> {
    if a.len() != b.len() {
        return Err(Error::DimensionMismatch { expected: a.len(), actual: b.len() });
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    let cos = dot / (norm_a.sqrt() * norm_b.sqrt());
    Ok(cos.clamp(-1.0, 1.0) as f32)
}

/// Like [`try_cosine_similarity`] but maps a length mismatch to 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    try_cosine_similarity(a, b).unwrap_or(0.0)
}
