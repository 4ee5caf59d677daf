//! First-hit voxel traversal along a ray (Amanatides & Woo, 1987).
//!
//! The marcher visits lattice cells in the exact order a ray passes through
//! them and stops at the first cell the classifier reports as triangulatable.
//! It never samples more than `8 * max_steps` densities.

use nalgebra::Vector3;

use crate::{
    classify::{cube_case, has_triangles},
    field::Density,
    types::{CELL_RANGE, Coord, Point, Value, Vector, cell_of},
};

/// A world-space ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point,
    pub direction: Vector,
}

impl Ray {
    /// Creates a ray, normalizing `direction`. A zero direction is kept as-is.
    pub fn new(origin: Point, direction: Vector) -> Self {
        Self {
            origin,
            direction: direction.try_normalize(0.0).unwrap_or(direction),
        }
    }

    /// Point at distance `t` along the ray.
    #[inline]
    pub fn at(&self, t: Value) -> Point {
        self.origin + self.direction * t
    }
}

/// Outcome of [`march`]. A miss is an expected result, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaymarchResult {
    /// The ray left the step budget without meeting the surface.
    Miss,
    /// The first cell along the ray whose corners straddle the surface.
    Hit {
        cell: Coord,
        /// Cell boundaries crossed before reaching `cell`.
        steps: u32,
    },
}

impl RaymarchResult {
    /// Returns the hit cell, if any.
    pub fn cell(&self) -> Option<Coord> {
        match *self {
            RaymarchResult::Hit { cell, .. } => Some(cell),
            RaymarchResult::Miss => None,
        }
    }
}

/// Per-axis DDA state.
#[derive(Debug, Clone, Copy)]
struct Dda {
    cell: Coord,
    step: Vector3<i32>,
    delta: Vector,
    side_dist: Vector,
}

impl Dda {
    /// `None` when the origin's cell is off the meshable lattice.
    fn new(ray: &Ray) -> Option<Self> {
        let origin = ray.origin;
        let dir = ray.direction;
        let cell = cell_of(origin)?;

        let mut step = Vector3::zeros();
        let mut delta = Vector::repeat(Value::INFINITY);
        let mut side_dist = Vector::repeat(Value::INFINITY);

        for axis in 0..3 {
            let d = dir[axis];
            if d == 0.0 || d.is_nan() {
                continue;
            }
            delta[axis] = (1.0 / d).abs();
            let c = Value::from(cell[axis]);
            if d > 0.0 {
                step[axis] = 1;
                side_dist[axis] = (c + 1.0 - origin[axis]) * delta[axis];
            } else {
                step[axis] = -1;
                side_dist[axis] = (origin[axis] - c) * delta[axis];
            }
        }

        Some(Self {
            cell,
            step,
            delta,
            side_dist,
        })
    }

    /// Axis whose next boundary is nearest. Ties go to x, then y, then z.
    #[inline]
    fn next_axis(&self) -> usize {
        let s = self.side_dist;
        if s.x <= s.y && s.x <= s.z {
            0
        } else if s.y <= s.z {
            1
        } else {
            2
        }
    }

    /// Steps into the next cell. Returns `false`, leaving the state untouched,
    /// when that cell would leave [`CELL_RANGE`].
    #[inline]
    fn advance(&mut self) -> bool {
        let axis = self.next_axis();
        match self.cell[axis]
            .checked_add(self.step[axis])
            .filter(|c| CELL_RANGE.contains(c))
        {
            Some(next) => {
                self.cell[axis] = next;
                self.side_dist[axis] += self.delta[axis];
                true
            }
            None => false,
        }
    }
}

/// Walks cells along `ray` until one has triangles, testing at most `max_steps` cells.
///
/// The cell containing the ray origin is tested first, so a ray that starts in
/// a surface cell hits it with `steps == 0`. A budget of zero always misses,
/// and so does a ray that starts or walks off the lattice's [`CELL_RANGE`].
pub fn march<D: Density + ?Sized>(field: &D, ray: &Ray, max_steps: u32) -> RaymarchResult {
    let Some(mut dda) = Dda::new(ray) else {
        return RaymarchResult::Miss;
    };
    for steps in 0..max_steps {
        if has_triangles(cube_case(field, dda.cell)) {
            return RaymarchResult::Hit {
                cell: dda.cell,
                steps,
            };
        }
        if !dda.advance() {
            break;
        }
    }
    RaymarchResult::Miss
}

/// Every cell `march` would visit for `ray` within `max_steps`, in order.
pub fn traverse(ray: &Ray, max_steps: u32) -> impl Iterator<Item = Coord> {
    let mut dda = Dda::new(ray);
    (0..max_steps).map_while(move |_| {
        let state = dda.as_mut()?;
        let cell = state.cell;
        if !state.advance() {
            dda = None;
        }
        Some(cell)
    })
}
