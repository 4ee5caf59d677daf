use std::sync::Arc;

use ndarray::Array3;

use crate::{
    error::{MarchingCubesError, Result},
    field::{Density, DensityMut},
    types::{CompiledFunction, Coord, Value, world},
};

/// A dense, bounded density store.
///
/// The chunk covers `size_x × size_y × size_z` cells starting at
/// [`origin`](Chunk::origin), so it holds `(size + 1)` corners per axis.
/// Coordinates outside that box read as [`fallback`](Chunk::fallback) and
/// writes to them are dropped.
///
/// Values are stored as `values[[z, y, x]]` relative to the origin.
///
/// `values` is wrapped in an [`Arc`] so a meshing pass can hold the grid
/// without copying it; edits made while a pass holds it copy on write.
#[derive(Clone, Debug)]
pub struct Chunk {
    /// Lattice coordinate of corner `(0, 0, 0)`.
    pub origin: Coord,
    /// Number of cells along X.
    pub size_x: usize,
    /// Number of cells along Y.
    pub size_y: usize,
    /// Number of cells along Z.
    pub size_z: usize,
    /// Density read outside the chunk.
    pub fallback: Value,
    /// Density values, indexed `[[z, y, x]]`.
    pub values: Arc<Array3<Value>>,
}

impl Default for Chunk {
    fn default() -> Self {
        Self {
            origin: Coord::origin(),
            size_x: 0,
            size_y: 0,
            size_z: 0,
            fallback: 0.,
            values: Arc::new(Array3::zeros((1, 1, 1))),
        }
    }
}

impl Chunk {
    /// Creates a new chunk with the given cell dimensions.
    ///
    /// All values are initialised to `0.0`.
    pub fn new(size_x: usize, size_y: usize, size_z: usize) -> Self {
        Self {
            size_x,
            size_y,
            size_z,
            values: Arc::new(Array3::zeros((size_z + 1, size_y + 1, size_x + 1))),
            ..Default::default()
        }
    }

    /// Moves the chunk so corner `(0, 0, 0)` sits at `origin`.
    pub fn with_origin(mut self, origin: Coord) -> Self {
        self.origin = origin;
        self
    }

    /// Sets the density read outside the chunk.
    pub fn with_fallback(mut self, fallback: Value) -> Self {
        self.fallback = fallback;
        self
    }

    /// Replaces the density values with a previously saved [`Arc`].
    ///
    /// Fails with [`MarchingCubesError::InvalidChunkShape`] unless the grid is
    /// `(size_z + 1, size_y + 1, size_x + 1)`.
    pub fn with_values(mut self, values: Arc<Array3<Value>>) -> Result<Self> {
        if values.dim() != (self.size_z + 1, self.size_y + 1, self.size_x + 1) {
            return Err(MarchingCubesError::InvalidChunkShape);
        }
        self.values = values;
        Ok(self)
    }

    /// Fills the chunk by evaluating `function` at every corner's world position.
    pub fn fill(mut self, function: &CompiledFunction) -> Self {
        self.for_each_corner(|coord, value| *value = function(world(coord)));
        self
    }

    /// Returns a mutable reference to the inner grid.
    ///
    /// If the Arc is shared this will clone the data first (copy-on-write).
    fn values_mut(&mut self) -> &mut Array3<Value> {
        Arc::make_mut(&mut self.values)
    }

    /// Calls `f(coord, &mut value)` for every corner in the grid.
    ///
    /// `coord` is the corner's lattice coordinate, origin included.
    pub fn for_each_corner<F>(&mut self, mut f: F)
    where
        F: FnMut(Coord, &mut Value),
    {
        let origin = self.origin;
        let values = self.values_mut();
        for ((z, y, x), value) in values.indexed_iter_mut() {
            let coord = Coord::new(
                origin.x + x as i32,
                origin.y + y as i32,
                origin.z + z as i32,
            );
            f(coord, value);
        }
    }

    /// Returns the grid index of `coord`, if it lies inside the chunk.
    #[inline]
    fn local_index(&self, coord: Coord) -> Option<[usize; 3]> {
        let x = usize::try_from(coord.x.checked_sub(self.origin.x)?).ok()?;
        let y = usize::try_from(coord.y.checked_sub(self.origin.y)?).ok()?;
        let z = usize::try_from(coord.z.checked_sub(self.origin.z)?).ok()?;
        (x <= self.size_x && y <= self.size_y && z <= self.size_z).then_some([z, y, x])
    }

    /// Returns `true` when `coord` is one of the chunk's corners.
    pub fn contains(&self, coord: Coord) -> bool {
        self.local_index(coord).is_some()
    }

    /// Returns the stored value at `coord`, or `None` outside the chunk.
    pub fn get(&self, coord: Coord) -> Option<Value> {
        self.local_index(coord)
            .and_then(|i| self.values.get(i).copied())
    }

    /// Lattice coordinates of every cell (not corner) in the chunk.
    pub fn cells(&self) -> impl Iterator<Item = Coord> + '_ {
        let origin = self.origin;
        (0..self.size_z).flat_map(move |z| {
            (0..self.size_y).flat_map(move |y| {
                (0..self.size_x).map(move |x| {
                    Coord::new(
                        origin.x + x as i32,
                        origin.y + y as i32,
                        origin.z + z as i32,
                    )
                })
            })
        })
    }
}

impl Density for Chunk {
    #[inline]
    fn sample(&self, coord: Coord) -> Value {
        self.get(coord).unwrap_or(self.fallback)
    }
}

impl DensityMut for Chunk {
    fn set(&mut self, coord: Coord, value: Value) {
        match self.local_index(coord) {
            Some(i) => {
                if let Some(v) = self.values_mut().get_mut(i) {
                    *v = value;
                }
            }
            None => tracing::trace!(?coord, "write outside chunk dropped"),
        }
    }
}
