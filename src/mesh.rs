use bevy::prelude::Component;

use crate::types::{Point, Vector};

/// A surface vertex: world position and unit normal (zero if the gradient vanished).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Point,
    pub normal: Vector,
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            position: Point::origin(),
            normal: Vector::zeros(),
        }
    }
}

/// Three vertices in winding order. Degenerate triangles are kept.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

/// Mesh buffers produced by a raymarching pass, ready to move into a Bevy `Mesh`.
///
/// Vertices are never shared: every triangle appends three fresh vertices, and
/// `indices` is the sequence `0, 1, 2, …`.
///
/// The marching cubes tables wind faces clockwise seen from outside the solid.
/// Triangles are written last vertex first so faces come out counter-clockwise,
/// agreeing with the outward vertex normals.
#[derive(Component, Debug, Clone, Default, PartialEq)]
pub struct GeneratedMesh {
    /// Flat list of vertex positions: `[[x, y, z], ...]`
    pub vertices: Vec<[f32; 3]>,
    /// Per-vertex normals, parallel to `vertices`.
    pub normals: Vec<[f32; 3]>,
    /// Sequential triangle-list indices into `vertices`.
    pub indices: Vec<u32>,
}

impl GeneratedMesh {
    /// Creates an empty mesh with room for `triangles` triangles.
    pub fn with_capacity(triangles: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(triangles * 3),
            normals: Vec::with_capacity(triangles * 3),
            indices: Vec::with_capacity(triangles * 3),
        }
    }

    /// Builds a mesh from triangles in order.
    pub fn build<'a>(triangles: impl IntoIterator<Item = &'a Triangle>) -> Self {
        let mut mesh = Self::default();
        mesh.extend(triangles);
        mesh
    }

    /// Appends one triangle, reversed. Each new vertex's index is the index count before it.
    pub fn push_triangle(&mut self, triangle: &Triangle) {
        for v in triangle.vertices.iter().rev() {
            self.indices.push(self.indices.len() as u32);
            self.vertices.push(to_f32(v.position.coords));
            self.normals.push(to_f32(v.normal));
        }
    }

    pub fn extend<'a>(&mut self, triangles: impl IntoIterator<Item = &'a Triangle>) {
        for t in triangles {
            self.push_triangle(t);
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

#[inline]
fn to_f32(v: Vector) -> [f32; 3] {
    [v.x as f32, v.y as f32, v.z as f32]
}
