use std::{ops::RangeInclusive, sync::Arc};

use nalgebra::{Point3, Vector3};

/// Scalar density value at a lattice coordinate.
pub type Value = f64;

/// A 3D world-space point with [`Value`] components.
pub type Point = Point3<Value>;

/// A 3D world-space vector with [`Value`] components.
pub type Vector = Vector3<Value>;

/// An integer lattice coordinate. For a cell this is its minimal corner.
pub type Coord = Point3<i32>;

/// A baseline density function: maps a world [`Point`] to a [`Value`].
///
/// Return values **strictly below** zero are considered "inside" the solid.
pub type CompiledFunction = dyn Fn(Point) -> Value + Send + Sync;

/// Shared handle to a [`CompiledFunction`], cheap to clone across threads.
pub type Generator = Arc<CompiledFunction>;

/// World-space position of a lattice coordinate. Lattice-to-world is the identity.
#[inline]
pub fn world(coord: Coord) -> Point {
    coord.cast::<Value>()
}

/// Cell coordinates that can be classified and triangulated: a cell's corners
/// and their central-difference neighbours all stay inside `i32`.
pub const CELL_RANGE: RangeInclusive<i32> = (i32::MIN + 1)..=(i32::MAX - 2);

/// Returns `true` if every component of `cell` lies in [`CELL_RANGE`].
#[inline]
pub fn is_meshable(cell: Coord) -> bool {
    cell.coords.iter().all(|c| CELL_RANGE.contains(c))
}

/// Lattice coordinate of the cell containing `p`, or `None` if `p` is not
/// finite or its cell falls outside [`CELL_RANGE`].
#[inline]
pub fn cell_of(p: Point) -> Option<Coord> {
    let cell = to_lattice(p, Value::floor)?;
    is_meshable(cell).then_some(cell)
}

/// Nearest lattice coordinate to `p`, rounding halves away from zero.
///
/// `None` if `p` is not finite or rounds outside `i32`.
#[inline]
pub fn nearest(p: Point) -> Option<Coord> {
    to_lattice(p, Value::round)
}

/// Offsets `coord`, or `None` if any component would overflow.
#[inline]
pub fn checked_offset(coord: Coord, dx: i32, dy: i32, dz: i32) -> Option<Coord> {
    Some(Coord::new(
        coord.x.checked_add(dx)?,
        coord.y.checked_add(dy)?,
        coord.z.checked_add(dz)?,
    ))
}

fn to_lattice(p: Point, snap: fn(Value) -> Value) -> Option<Coord> {
    let axis = |v: Value| {
        let v = snap(v);
        (v.is_finite() && v >= Value::from(i32::MIN) && v <= Value::from(i32::MAX))
            .then_some(v as i32)
    };
    Some(Coord::new(axis(p.x)?, axis(p.y)?, axis(p.z)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_of_floors_negative_coordinates() {
        assert_eq!(
            cell_of(Point::new(-0.5, 0.5, -1.0)),
            Some(Coord::new(-1, 0, -1))
        );
    }

    #[test]
    fn nearest_rounds_half_away_from_zero() {
        assert_eq!(
            nearest(Point::new(0.5, -0.5, 1.49)),
            Some(Coord::new(1, -1, 1))
        );
    }

    #[test]
    fn far_and_non_finite_points_have_no_lattice_coordinate() {
        assert_eq!(cell_of(Point::new(3.0e9, 0.5, 0.5)), None);
        assert_eq!(cell_of(Point::new(0.0, -3.0e9, 0.0)), None);
        assert_eq!(cell_of(Point::new(Value::NAN, 0.0, 0.0)), None);
        assert_eq!(nearest(Point::new(0.0, 0.0, Value::INFINITY)), None);
        assert_eq!(nearest(Point::new(-3.0e9, 0.0, 0.0)), None);
    }

    #[test]
    fn cells_at_the_edge_of_the_lattice_are_not_meshable() {
        assert!(is_meshable(Coord::new(i32::MAX - 2, 0, i32::MIN + 1)));
        assert!(!is_meshable(Coord::new(i32::MAX - 1, 0, 0)));
        assert!(!is_meshable(Coord::new(0, i32::MIN, 0)));
        // i32::MAX is a valid lattice point, but its cell is not
        assert_eq!(cell_of(Point::new(f64::from(i32::MAX), 0.0, 0.0)), None);
    }

    #[test]
    fn checked_offset_stops_at_overflow() {
        let c = Coord::new(i32::MAX, 0, 0);
        assert_eq!(checked_offset(c, -1, 2, 0), Some(Coord::new(i32::MAX - 1, 2, 0)));
        assert_eq!(checked_offset(c, 1, 0, 0), None);
    }
}
