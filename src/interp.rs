use crate::types::{Point, Value, Vector};

// Return the interpolation factor t where the line through (0, v0) and (1, v1)
// reaches iso_val. Flat edges split at the midpoint.
pub fn find_t(v0: Value, v1: Value, iso_val: Value) -> Value {
    let denom = v1 - v0;
    if denom == 0.0 {
        return 0.5;
    }
    let t = (iso_val - v0) / denom;
    if t.is_nan() { 0.5 } else { t.clamp(0.0, 1.0) }
}

// Linearly interpolate between two points by factor t
pub fn interpolate_points(p0: Point, p1: Point, t: Value) -> Point {
    p0 + (p1 - p0) * t
}

// Interpolate two directions and renormalize. Opposing or zero inputs give the zero vector.
pub fn interpolate_normals(n0: Vector, n1: Vector, t: Value) -> Vector {
    n0.lerp(&n1, t)
        .try_normalize(Value::EPSILON)
        .unwrap_or_else(Vector::zeros)
}
