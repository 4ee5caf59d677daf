use std::collections::HashMap;

use bevy_voxel_raymarch::{
    camera::CameraRays,
    chunk::Chunk,
    classify::{cube_case, has_triangles},
    config::RaymarchConfig,
    field::{DensityField, DensityMut, SculptSign},
    generator::sphere,
    job::MeshJob,
    mesh::GeneratedMesh,
    types::{Coord, Point},
};
use nalgebra::{Perspective3, Translation3};

const RADIUS: f64 = 5.0;

fn planet() -> DensityField {
    DensityField::new(0.0).with_generator(sphere(Point::origin(), RADIUS))
}

fn boundary_cells(field: &DensityField) -> Vec<Coord> {
    let mut cells = Vec::new();
    for x in -7..7 {
        for y in -7..7 {
            for z in -7..7 {
                let c = Coord::new(x, y, z);
                if has_triangles(cube_case(field, c)) {
                    cells.push(c);
                }
            }
        }
    }
    cells
}

/// Camera on +Z looking at the origin.
fn camera(size: u32) -> CameraRays {
    let to_world = Translation3::new(0.0, 0.0, 20.0).to_homogeneous();
    let projection = Perspective3::new(1.0, std::f64::consts::FRAC_PI_2, 0.1, 100.0);
    CameraRays::new(to_world, projection.inverse(), size, size).unwrap()
}

fn length(v: [f32; 3]) -> f64 {
    v.iter().map(|&c| f64::from(c).powi(2)).sum::<f64>().sqrt()
}

fn quantize(v: [f32; 3]) -> [i64; 3] {
    v.map(|c| (f64::from(c) * 1e4).round() as i64)
}

#[test]
fn sphere_mesh_lies_on_the_sphere() {
    let field = planet();
    let cells = boundary_cells(&field);
    assert!(!cells.is_empty());

    let config = RaymarchConfig::default();
    let mesh = MeshJob::new(&field, &config).unwrap().run_cells(&cells);
    assert!(!mesh.is_empty());

    for v in &mesh.vertices {
        assert!((length(*v) - RADIUS).abs() < 0.05, "{v:?}");
    }
}

#[test]
fn sphere_normals_point_outward() {
    let field = planet();
    let config = RaymarchConfig::default();
    let mesh = MeshJob::new(&field, &config)
        .unwrap()
        .run_cells(&boundary_cells(&field));

    for (p, n) in mesh.vertices.iter().zip(&mesh.normals) {
        let dot: f64 = (0..3).map(|i| f64::from(p[i]) * f64::from(n[i])).sum();
        assert!(dot / length(*p) > 0.9, "{p:?} {n:?}");
    }
}

#[test]
fn sphere_mesh_is_closed_and_consistently_wound() {
    let field = planet();
    let config = RaymarchConfig::default();
    let mesh = MeshJob::new(&field, &config)
        .unwrap()
        .run_cells(&boundary_cells(&field));

    let mut directed: HashMap<([i64; 3], [i64; 3]), usize> = HashMap::new();
    for tri in mesh.indices.chunks(3) {
        let p = [0, 1, 2].map(|i| quantize(mesh.vertices[tri[i] as usize]));
        for i in 0..3 {
            *directed.entry((p[i], p[(i + 1) % 3])).or_default() += 1;
        }
    }
    for ((a, b), n) in &directed {
        assert_eq!(directed.get(&(*b, *a)), Some(n), "open edge {a:?} -> {b:?}");
    }
}

#[test]
fn sphere_faces_wind_counter_clockwise_from_outside() {
    let field = planet();
    let config = RaymarchConfig::default();
    let mesh = MeshJob::new(&field, &config)
        .unwrap()
        .run_cells(&boundary_cells(&field));

    for tri in mesh.vertices.chunks(3) {
        let [a, b, c] = [0, 1, 2].map(|i| tri[i].map(f64::from));
        let ab = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
        let ac = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
        let cross = [
            ab[1] * ac[2] - ab[2] * ac[1],
            ab[2] * ac[0] - ab[0] * ac[2],
            ab[0] * ac[1] - ab[1] * ac[0],
        ];
        let outward: f64 = (0..3).map(|i| cross[i] * (a[i] + b[i] + c[i])).sum();
        // degenerate triangles pass through with zero area
        assert!(outward >= 0.0, "{tri:?}");
    }
}

#[test]
fn screen_pass_meshes_the_visible_side() {
    let field = planet();
    let config = RaymarchConfig::default();
    let job = MeshJob::new(&field, &config).unwrap();
    let (mesh, stats) = job.run_screen_with_stats(&camera(32));

    assert_eq!(stats.samples, 32 * 32);
    assert!(stats.hits > 0);
    assert!(stats.cells <= stats.hits);
    assert_eq!(stats.triangles, mesh.triangle_count());
    for v in &mesh.vertices {
        assert!((length(*v) - RADIUS).abs() < 0.05);
        // only the hemisphere facing the camera is hit first
        assert!(v[2] > -2.0, "{v:?}");
    }
}

#[test]
fn screen_pass_is_deterministic_across_thread_counts() {
    let field = planet();
    let config = RaymarchConfig::default();
    let job = MeshJob::new(&field, &config).unwrap();
    let cam = camera(24);

    let pooled = job.run_screen(&cam);
    let single = rayon::ThreadPoolBuilder::new()
        .num_threads(1)
        .build()
        .unwrap()
        .install(|| job.run_screen(&cam));
    assert_eq!(pooled, single);
    assert_eq!(pooled, job.run_screen(&cam));
}

#[test]
fn dedup_only_removes_repeated_cells() {
    let field = planet();
    let cam = camera(64);
    let dedup = RaymarchConfig::default();
    let all = RaymarchConfig::default().with_dedup_cells(false);

    let (a, sa) = MeshJob::new(&field, &dedup)
        .unwrap()
        .run_screen_with_stats(&cam);
    let (b, sb) = MeshJob::new(&field, &all).unwrap().run_screen_with_stats(&cam);
    assert_eq!(sa.hits, sb.hits);
    assert_eq!(sb.cells, sb.hits);
    assert!(sa.cells < sb.cells);
    assert!(a.triangle_count() < b.triangle_count());
}

#[test]
fn camera_facing_away_sees_nothing() {
    let field = planet();
    // looking down -Z from z = -20 points away from the planet
    let to_world = Translation3::new(0.0, 0.0, -20.0).to_homogeneous();
    let projection = Perspective3::new(1.0, 0.5, 0.1, 100.0);
    let cam = CameraRays::new(to_world, projection.inverse(), 8, 8).unwrap();
    let config = RaymarchConfig::default().with_max_steps(64);

    let (mesh, stats) = MeshJob::new(&field, &config)
        .unwrap()
        .run_screen_with_stats(&cam);
    assert_eq!(stats.hits, 0);
    assert_eq!(mesh, GeneratedMesh::default());
}

#[test]
fn digging_opens_a_crater_in_the_mesh() {
    let mut field = planet();
    let config = RaymarchConfig::default();
    let cam = camera(32);

    let before = MeshJob::new(&field, &config).unwrap().run_screen(&cam);
    field.sculpt(Point::new(0.0, 0.0, 5.0), 2, 3.0, SculptSign::Dig);
    let after = MeshJob::new(&field, &config).unwrap().run_screen(&cam);

    assert_ne!(before, after);
    // the crater floor sits below the original surface
    let deepest = after
        .vertices
        .iter()
        .filter(|v| v[0].abs() < 0.5 && v[1].abs() < 0.5)
        .map(|v| v[2])
        .fold(f32::INFINITY, f32::min);
    assert!(deepest < 4.5, "{deepest}");
}

#[test]
fn dense_chunk_matches_sparse_field() {
    let field = planet();
    let chunk = Chunk::new(20, 20, 20)
        .with_origin(Coord::new(-10, -10, -10))
        .with_fallback(1.0)
        .fill(sphere(Point::origin(), RADIUS).as_ref());
    let config = RaymarchConfig::default();
    let cells = boundary_cells(&field);

    let sparse = MeshJob::new(&field, &config).unwrap().run_cells(&cells);
    let dense = MeshJob::new(&chunk, &config).unwrap().run_cells(&cells);
    assert_eq!(sparse, dense);
}
