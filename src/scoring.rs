//! Distance and similarity math.
//!
//! Stored embeddings are unit-normalized, so cosine distance
//! (`1 - cosine_similarity`) lives in `[0, 2]`. [`similarity`] maps that
//! range onto `[0, 1]` with higher meaning closer.

/// Largest cosine distance between two unit vectors.
pub const MAX_DISTANCE: f64 = 2.0;

/// Convert a cosine distance into a similarity in `[0, 1]`.
///
/// Distance 0 maps to 1, 1 (orthogonal) to 0.5, 2 to 0. Anything past 2,
/// or a NaN distance, maps to 0.
///
/// # Examples
///
/// ```
/// use cvsearch::scoring::similarity;
///
/// assert_eq!(similarity(0.0), 1.0);
/// assert_eq!(similarity(1.0), 0.5);
/// assert_eq!(similarity(3.0), 0.0);
/// ```
pub fn similarity(distance: f64) -> f64 {
    let sim = 1.0 - distance / MAX_DISTANCE;
    if sim.is_nan() { 0.0 } else { sim.max(0.0) }
}

/// Cosine distance between two vectors of equal length.
///
/// Zero vectors are treated as orthogonal to everything (distance 1).
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }

    let cos = (dot / (norm_a * norm_b)).clamp(-1.0, 1.0);
    1.0 - cos
}

pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Scale a vector to unit length in place. Zero vectors are left alone.
pub fn normalize(v: &mut [f32]) {
    let norm = l2_norm(v);
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
