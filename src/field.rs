use std::{collections::HashMap, fmt};

use crate::types::{Coord, Generator, Point, Value, checked_offset, nearest, world};

/// Read access to a scalar density over the integer lattice.
///
/// Implementors must be safe to sample from many threads at once; nothing
/// writes to a field while a meshing pass is reading it.
pub trait Density: Sync {
    /// Returns the density at `coord`. Never fails: unknown coordinates read as a fallback.
    fn sample(&self, coord: Coord) -> Value;
}

impl<D: Density + ?Sized> Density for &D {
    #[inline]
    fn sample(&self, coord: Coord) -> Value {
        (**self).sample(coord)
    }
}

/// Direction of a sculpt edit.
///
/// Density below zero is solid, so raising it digs material away and lowering
/// it fills material in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SculptSign {
    /// `+1`: raises density, removing material.
    Dig,
    /// `-1`: lowers density, adding material.
    Fill,
}

impl SculptSign {
    #[inline]
    pub fn factor(self) -> Value {
        match self {
            SculptSign::Dig => 1.0,
            SculptSign::Fill => -1.0,
        }
    }
}

/// Write access to a density store.
pub trait DensityMut: Density {
    /// Overwrites a single sample.
    fn set(&mut self, coord: Coord, value: Value);

    /// Adds `sign * |strength|` to every lattice point within Euclidean `radius`
    /// of `center` rounded to the nearest lattice point.
    ///
    /// A radius of `0` touches only the rounded center; a negative radius touches
    /// nothing, and neither does a center that is not finite or lies beyond `i32`.
    /// Ball points past the ends of `i32` are skipped. Returns the number of
    /// lattice points visited.
    fn sculpt(&mut self, center: Point, radius: i32, strength: Value, sign: SculptSign) -> usize {
        if radius < 0 {
            return 0;
        }
        let Some(center) = nearest(center) else {
            tracing::trace!(?center, "sculpt center off the lattice");
            return 0;
        };
        let delta = sign.factor() * strength.abs();
        let r2 = i64::from(radius) * i64::from(radius);

        let mut touched = 0;
        for dz in -radius..=radius {
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    let (x, y, z) = (i64::from(dx), i64::from(dy), i64::from(dz));
                    if x * x + y * y + z * z > r2 {
                        continue;
                    }
                    let Some(coord) = checked_offset(center, dx, dy, dz) else {
                        continue;
                    };
                    let value = self.sample(coord);
                    self.set(coord, value + delta);
                    touched += 1;
                }
            }
        }
        tracing::trace!(?center, radius, delta, touched, "sculpt");
        touched
    }
}

/// Sparse density field: written samples layered over an optional baseline generator.
///
/// [`sample`](Density::sample) resolves, in order:
/// 1. a value written by [`set`](DensityMut::set) or [`sculpt`](DensityMut::sculpt),
/// 2. the generator evaluated at the coordinate's world position,
/// 3. the fallback.
///
/// Only coordinates that were edited are stored, which suits raymarching since a
/// pass touches a thin shell of cells around each ray.
#[derive(Clone, Default)]
pub struct DensityField {
    written: HashMap<Coord, Value>,
    generator: Option<Generator>,
    fallback: Value,
}

impl DensityField {
    /// Creates an empty field where every coordinate reads as `fallback`.
    pub fn new(fallback: Value) -> Self {
        Self {
            fallback,
            ..Default::default()
        }
    }

    /// Sets the baseline generator consulted for unwritten coordinates.
    pub fn with_generator(mut self, generator: Generator) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Sets the value read for coordinates with neither a written sample nor a generator.
    pub fn with_fallback(mut self, fallback: Value) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn fallback(&self) -> Value {
        self.fallback
    }

    /// Returns the written sample at `coord`, ignoring the generator and fallback.
    pub fn written(&self, coord: Coord) -> Option<Value> {
        self.written.get(&coord).copied()
    }

    /// Number of coordinates holding a written sample.
    pub fn written_len(&self) -> usize {
        self.written.len()
    }

    /// Drops every edit, restoring the baseline.
    pub fn clear(&mut self) {
        self.written.clear();
    }
}

impl Density for DensityField {
    #[inline]
    fn sample(&self, coord: Coord) -> Value {
        if let Some(&v) = self.written.get(&coord) {
            return v;
        }
        match &self.generator {
            Some(generator) => generator(world(coord)),
            None => self.fallback,
        }
    }
}

impl DensityMut for DensityField {
    fn set(&mut self, coord: Coord, value: Value) {
        self.written.insert(coord, value);
    }
}

impl fmt::Debug for DensityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DensityField")
            .field("written", &self.written.len())
            .field("generator", &self.generator.is_some())
            .field("fallback", &self.fallback)
            .finish()
    }
}
