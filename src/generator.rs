use std::sync::Arc;

use crate::{
    raymarch::Ray,
    types::{Generator, Point, Value},
};

/// Signed distance to a sphere: negative inside, zero on the surface.
///
/// The usual planet baseline for a [`DensityField`](crate::field::DensityField).
pub fn sphere(center: Point, radius: Value) -> Generator {
    Arc::new(move |p: Point| (p - center).norm() - radius)
}

/// Result of [`SphereTracer::trace`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereTraceHit {
    pub hit: bool,
    /// Distance travelled along the ray when the trace stopped.
    pub distance: Value,
}

impl SphereTraceHit {
    /// The hit point, or `None` on a miss.
    pub fn point(&self, ray: &Ray) -> Option<Point> {
        self.hit.then(|| ray.at(self.distance))
    }
}

/// Sphere tracing against an analytic signed distance function.
///
/// Unlike [`march`](crate::raymarch::march) this works on a continuous SDF, not
/// the lattice; it's useful for previews and picking a sculpt center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereTracer {
    /// Give up once this far along the ray.
    pub max_distance: Value,
    /// Distances below this count as a hit.
    pub epsilon: Value,
    /// Hard cap on iterations.
    pub max_iterations: u32,
}

impl Default for SphereTracer {
    fn default() -> Self {
        Self {
            max_distance: 1000.0,
            epsilon: 1e-4,
            max_iterations: 512,
        }
    }
}

impl SphereTracer {
    pub fn trace<F>(&self, ray: &Ray, sdf: F) -> SphereTraceHit
    where
        F: Fn(Point) -> Value,
    {
        let mut distance = 0.0;
        for _ in 0..self.max_iterations {
            if distance >= self.max_distance {
                break;
            }
            let d = sdf(ray.at(distance));
            if d < self.epsilon {
                return SphereTraceHit {
                    hit: true,
                    distance,
                };
            }
            distance += d;
        }
        SphereTraceHit {
            hit: false,
            distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Vector;

    #[test]
    fn sphere_is_signed() {
        let planet = sphere(Point::new(1.0, 0.0, 0.0), 2.0);
        assert_eq!(planet(Point::new(1.0, 0.0, 0.0)), -2.0);
        assert_eq!(planet(Point::new(3.0, 0.0, 0.0)), 0.0);
        assert_eq!(planet(Point::new(1.0, 5.0, 0.0)), 3.0);
    }

    #[test]
    fn trace_hits_the_near_side() {
        let planet = sphere(Point::origin(), 1.0);
        let ray = Ray::new(Point::new(0.0, 0.0, 5.0), -Vector::z());
        let hit = SphereTracer::default().trace(&ray, |p| planet(p));
        assert!(hit.hit);
        assert!((hit.distance - 4.0).abs() < 1e-3);
        let p = hit.point(&ray).unwrap();
        assert!((p.z - 1.0).abs() < 1e-3);
    }

    #[test]
    fn trace_misses_past_max_distance() {
        let planet = sphere(Point::origin(), 1.0);
        let ray = Ray::new(Point::new(0.0, 0.0, 5.0), Vector::z());
        let hit = SphereTracer::default().trace(&ray, |p| planet(p));
        assert!(!hit.hit);
        assert!(hit.point(&ray).is_none());
    }

    #[test]
    fn trace_terminates_on_non_positive_sdf() {
        let tracer = SphereTracer {
            epsilon: -1.0,
            ..Default::default()
        };
        let ray = Ray::new(Point::origin(), Vector::x());
        let hit = tracer.trace(&ray, |_| 0.0);
        assert!(!hit.hit);
        assert_eq!(hit.distance, 0.0);
    }
}
