//! Fans raymarching and triangulation out over rayon, one invocation per sample.
//!
//! ```text
//! scatter:  sample index ──► CameraRays::ray_at ──► march ──► Option<Coord>   (parallel)
//! dedup:    hits, in sample order ──► first occurrence of each cell           (sequential)
//! compute:  cell ──► triangulate ──► private Vec<Triangle>                    (parallel)
//! gather:   concatenate in cell order ──► GeneratedMesh                       (sequential)
//! ```
//!
//! Every invocation owns its output until the gather, so no two invocations
//! ever write to the same buffer. The result depends only on the field, camera
//! and config, never on how rayon scheduled the work.

use std::collections::HashSet;

use rayon::iter::{IntoParallelIterator, IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, warn};

use crate::{
    camera::CameraRays,
    config::RaymarchConfig,
    error::Result,
    field::Density,
    mesh::{GeneratedMesh, Triangle},
    raymarch::march,
    triangulate::triangulate,
    types::Coord,
};

/// Counters for one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobStats {
    /// Rays traced.
    pub samples: usize,
    /// Rays that found a surface cell.
    pub hits: usize,
    /// Cells triangulated.
    pub cells: usize,
    /// Triangles emitted.
    pub triangles: usize,
}

/// A validated meshing pass over a read-only density field.
///
/// Holding `&D` for the job's lifetime is what keeps sculpting out of a pass.
pub struct MeshJob<'a, D: Density + ?Sized> {
    field: &'a D,
    max_steps: u32,
    dedup_cells: bool,
}

impl<'a, D: Density + ?Sized> MeshJob<'a, D> {
    /// Validates `config` before any work is scheduled.
    pub fn new(field: &'a D, config: &RaymarchConfig) -> Result<Self> {
        if let Err(e) = config.validate() {
            warn!(?config, "rejected raymarch config: {e}");
            return Err(e);
        }
        Ok(Self {
            field,
            max_steps: config.max_steps,
            dedup_cells: config.dedup_cells,
        })
    }

    /// Traces one ray per camera sample and triangulates every hit cell.
    pub fn run_screen(&self, camera: &CameraRays) -> GeneratedMesh {
        self.run_screen_with_stats(camera).0
    }

    pub fn run_screen_with_stats(&self, camera: &CameraRays) -> (GeneratedMesh, JobStats) {
        let _span = tracing::debug_span!("raymarch_pass", width = camera.width, height = camera.height)
            .entered();

        let samples = camera.sample_count();
        let hits: Vec<Option<Coord>> = (0..samples)
            .into_par_iter()
            .map(|index| march(self.field, &camera.ray_at(index), self.max_steps).cell())
            .collect();

        let hit_cells: Vec<Coord> = hits.into_iter().flatten().collect();
        let hit_count = hit_cells.len();
        let cells = if self.dedup_cells {
            dedup_in_order(hit_cells)
        } else {
            hit_cells
        };

        let (mesh, mut stats) = self.mesh_cells(&cells);
        stats.samples = samples;
        stats.hits = hit_count;
        debug!(?stats, "raymarch pass finished");
        (mesh, stats)
    }

    /// Triangulates an explicit list of cells, in order. Cells are not deduplicated.
    pub fn run_cells(&self, cells: &[Coord]) -> GeneratedMesh {
        let _span = tracing::debug_span!("cell_pass", cells = cells.len()).entered();
        let (mesh, stats) = self.mesh_cells(cells);
        debug!(?stats, "cell pass finished");
        mesh
    }

    fn mesh_cells(&self, cells: &[Coord]) -> (GeneratedMesh, JobStats) {
        let per_cell: Vec<Vec<Triangle>> = cells
            .par_iter()
            .map(|&cell| triangulate(self.field, cell))
            .collect();

        // Merge per-cell triangles into a single buffer
        let total: usize = per_cell.iter().map(Vec::len).sum();
        let mut mesh = GeneratedMesh::with_capacity(total);
        for triangles in &per_cell {
            mesh.extend(triangles);
        }

        let stats = JobStats {
            cells: cells.len(),
            triangles: total,
            ..Default::default()
        };
        (mesh, stats)
    }
}

/// Keeps the first occurrence of each cell, preserving order.
fn dedup_in_order(cells: Vec<Coord>) -> Vec<Coord> {
    let mut seen = HashSet::with_capacity(cells.len());
    cells.into_iter().filter(|c| seen.insert(*c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::MarchingCubesError,
        field::{DensityField, DensityMut},
        types::Point,
    };

    #[test]
    fn invalid_config_is_rejected_before_the_pass() {
        let field = DensityField::new(1.0);
        let config = RaymarchConfig::default().with_max_steps(0);
        assert_eq!(
            MeshJob::new(&field, &config).err(),
            Some(MarchingCubesError::InvalidStepBudget)
        );
    }

    #[test]
    fn dedup_keeps_first_occurrence_order() {
        let a = Coord::new(1, 0, 0);
        let b = Coord::new(0, 2, 0);
        assert_eq!(dedup_in_order(vec![a, b, a, b, a]), vec![a, b]);
    }

    #[test]
    fn cell_pass_concatenates_in_input_order() {
        let mut field = DensityField::new(1.0);
        field.set(Coord::origin(), -1.0);
        let config = RaymarchConfig::default();
        let job = MeshJob::new(&field, &config).unwrap();

        // (0,0,0) and (-1,0,0) both see the solid corner; (5,5,5) sees nothing
        let cells = [Coord::new(-1, 0, 0), Coord::new(5, 5, 5), Coord::origin()];
        let mesh = job.run_cells(&cells);
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.indices, (0..6).collect::<Vec<u32>>());
        assert!(mesh.vertices[..3].iter().all(|v| v[0] <= 0.0));
        assert!(mesh.vertices[3..].iter().all(|v| v[0] >= 0.0));
    }

    #[test]
    fn sculpt_between_passes_changes_the_output() {
        let mut field = DensityField::new(1.0);
        let config = RaymarchConfig::default();
        let cells = [Coord::origin()];

        let before = MeshJob::new(&field, &config).unwrap().run_cells(&cells);
        assert!(before.is_empty());

        field.sculpt(Point::origin(), 0, 2.0, crate::field::SculptSign::Fill);
        let after = MeshJob::new(&field, &config).unwrap().run_cells(&cells);
        assert_eq!(after.triangle_count(), 1);
    }
}
