use nalgebra::Vector3;

use crate::{
    field::Density,
    tables::{CASE_TRIANGLE_COUNT, CORNER_OFFSETS},
    types::{Coord, Value, is_meshable},
};

/// Returns `true` when a density value counts as solid.
///
/// Zero is outside: only strictly negative values are inside.
#[inline]
pub fn is_inside(value: Value) -> bool {
    value < 0.0
}

/// Returns `1` if the density at `coord` is inside the solid, else `0`.
#[inline]
pub fn bit<D: Density + ?Sized>(field: &D, coord: Coord) -> u8 {
    is_inside(field.sample(coord)) as u8
}

/// Returns the 8 corner lattice coordinates of the cell whose minimal corner is `origin`.
///
/// Corners are ordered to match the marching cubes tables:
/// ```text
///     7----6          Y
///    /|   /|          |
///   3----2 |          *-- X
///   | 4--|-5         /
///   |/   |/         Z
///   0----1
/// ```
///
/// `origin` must be [meshable](is_meshable); [`cube_case`] and
/// [`triangulate`](crate::triangulate::triangulate) check this before calling.
#[inline]
pub fn corner_coords(origin: Coord) -> [Coord; 8] {
    CORNER_OFFSETS.map(|[x, y, z]| origin + Vector3::new(x, y, z))
}

/// Samples the 8 corner densities of a cell, in corner order.
#[inline]
pub fn corner_values<D: Density + ?Sized>(field: &D, origin: Coord) -> [Value; 8] {
    corner_coords(origin).map(|c| field.sample(c))
}

/// Computes the marching cubes case from already-sampled corner values.
///
/// ```text
/// corner index:  7  6  5  4  3  2  1  0
/// case bits:    [_][_][_][_][_][_][_][_]
///                                     ^-- corner 0 inside?
/// ```
#[inline]
pub fn case_from_values(values: &[Value; 8]) -> u8 {
    values
        .iter()
        .enumerate()
        .fold(0u8, |case, (i, &v)| case | ((is_inside(v) as u8) << i))
}

/// Computes the marching cubes case of the cell whose minimal corner is `origin`.
///
/// Cells off the meshable lattice classify as case `0`, which has no triangles.
#[inline]
pub fn cube_case<D: Density + ?Sized>(field: &D, origin: Coord) -> u8 {
    if !is_meshable(origin) {
        return 0;
    }
    case_from_values(&corner_values(field, origin))
}

/// Returns `true` if `case` produces at least one triangle.
#[inline]
pub fn has_triangles(case: u8) -> bool {
    CASE_TRIANGLE_COUNT[case as usize] > 0
}
