use std::f64::consts::PI;

/// Euclidean distance between two points.
pub fn distance(ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    ((bx - ax).powi(2) + (by - ay).powi(2)).sqrt()
}

/// Cosine falloff: 1 at `dist = 0`, decreasing smoothly to 0 at `dist = radius`.
///
/// `radius` must be strictly positive.
pub fn weight(dist: f64, radius: f64) -> f64 {
    if dist >= radius {
        return 0.0;
    }
    0.5 * (1.0 + (PI * dist / radius).cos())
}
