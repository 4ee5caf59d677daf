use nalgebra::Vector3;

use crate::{
    classify::{case_from_values, corner_coords, corner_values},
    field::Density,
    interp::{find_t, interpolate_normals, interpolate_points},
    tables::{CASE_EDGES, CASE_TRIANGLE_COUNT, CORNER_POINT_INDICES},
    types::{Coord, Value, Vector, is_meshable, world},
};

pub use crate::mesh::{Triangle, Vertex};

/// Surface normal at a lattice point from the central difference of density.
///
/// Density grows towards empty space, so the gradient already points out of
/// the solid. A flat neighbourhood yields the zero vector.
#[inline]
pub fn gradient_normal<D: Density + ?Sized>(field: &D, p: Coord) -> Vector {
    let axis = |dx: i32, dy: i32, dz: i32| {
        let offset = Vector3::new(dx, dy, dz);
        field.sample(p + offset) - field.sample(p - offset)
    };
    Vector::new(axis(1, 0, 0), axis(0, 1, 0), axis(0, 0, 1))
        .try_normalize(Value::EPSILON)
        .unwrap_or_else(Vector::zeros)
}

/// Places the surface vertex on edge `edge` of a cell.
///
/// The position sits at the linear zero crossing between the edge's corners;
/// the normal is the corner normals blended by the same factor.
#[inline]
pub fn edge_vertex<D: Density + ?Sized>(
    field: &D,
    corners: &[Coord; 8],
    values: &[Value; 8],
    edge: usize,
) -> Vertex {
    let [a, b] = CORNER_POINT_INDICES[edge].map(|i| i as usize);
    let t = find_t(values[a], values[b], 0.0);
    let position = interpolate_points(world(corners[a]), world(corners[b]), t);
    let normal = interpolate_normals(
        gradient_normal(field, corners[a]),
        gradient_normal(field, corners[b]),
        t,
    );
    Vertex { position, normal }
}

/// Triangulates the cell whose minimal corner is `origin`.
///
/// Returns between 0 and 5 triangles, in table order, with each triangle's
/// vertices in table order. Uniform cells return immediately without touching
/// any edge. Vertices on edges shared with neighbouring cells are not shared.
///
/// ```text
/// Per cell:
/// 1. corner_values           →  8 densities
/// 2. case_from_values        →  256-entry lookup key
/// 3. CASE_EDGES[case][..n]   →  up to 5 edge triplets
/// 4. edge_vertex (per edge)  →  interpolated position + normal, cached per edge
/// ```
pub fn triangulate<D: Density + ?Sized>(field: &D, origin: Coord) -> Vec<Triangle> {
    if !is_meshable(origin) {
        return Vec::new();
    }
    let values = corner_values(field, origin);
    let case = case_from_values(&values) as usize;
    let n = CASE_TRIANGLE_COUNT[case] as usize;
    if n == 0 {
        return Vec::new();
    }

    let corners = corner_coords(origin);
    let mut edge_points: [Option<Vertex>; 12] = [None; 12];
    let mut triangles = Vec::with_capacity(n);

    for edges in &CASE_EDGES[case][..n] {
        let mut vertices = [Vertex::default(); 3];
        for (slot, &e) in vertices.iter_mut().zip(edges) {
            let e = e as usize;
            *slot = *edge_points[e]
                .get_or_insert_with(|| edge_vertex(field, &corners, &values, e));
        }
        triangles.push(Triangle { vertices });
    }

    triangles
}
