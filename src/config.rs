use bevy::prelude::Resource;

use crate::{
    error::{MarchingCubesError, Result},
    types::Value,
};

/// Tunables for raymarching, meshing and sculpting.
///
/// Inserted as a resource by [`VoxelRaymarchPlugin`](crate::plugin::VoxelRaymarchPlugin).
/// Changes take effect on the next pass:
///
/// ```rust,ignore
/// fn zoom_out(mut config: ResMut<RaymarchConfig>) {
///     config.max_steps = 1024; // see further before giving up on a ray
/// }
/// ```
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct RaymarchConfig {
    /// Cells tested per ray before it counts as a miss. Default: `256`.
    pub max_steps: u32,
    /// Density read for coordinates nothing has written. Default: `0.0`.
    pub fallback_density: Value,
    /// Pixel stride: one ray is traced per `resolution × resolution` block. Default: `4`.
    pub resolution: u32,
    /// Sculpt radius used when a request doesn't give one. Default: `3`.
    pub brush_radius: i32,
    /// Sculpt strength used when a request doesn't give one. Default: `0.5`.
    pub brush_strength: Value,
    /// Triangulate each hit cell once per pass even if many rays hit it. Default: `true`.
    pub dedup_cells: bool,
}

impl Default for RaymarchConfig {
    fn default() -> Self {
        Self {
            max_steps: 256,
            fallback_density: 0.0,
            resolution: 4,
            brush_radius: 3,
            brush_strength: 0.5,
            dedup_cells: true,
        }
    }
}

impl RaymarchConfig {
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_fallback_density(mut self, fallback_density: Value) -> Self {
        self.fallback_density = fallback_density;
        self
    }

    pub fn with_resolution(mut self, resolution: u32) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_brush(mut self, radius: i32, strength: Value) -> Self {
        self.brush_radius = radius;
        self.brush_strength = strength;
        self
    }

    pub fn with_dedup_cells(mut self, dedup_cells: bool) -> Self {
        self.dedup_cells = dedup_cells;
        self
    }

    /// Checks every field, returning the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.max_steps == 0 {
            return Err(MarchingCubesError::InvalidStepBudget);
        }
        if self.resolution == 0 {
            return Err(MarchingCubesError::InvalidResolution);
        }
        if self.brush_radius < 0 {
            return Err(MarchingCubesError::InvalidBrushRadius);
        }
        if !self.fallback_density.is_finite() || !self.brush_strength.is_finite() {
            return Err(MarchingCubesError::NonFiniteValue);
        }
        Ok(())
    }
}
