use nalgebra::{Matrix4, Vector4};

use crate::{
    error::{MarchingCubesError, Result},
    raymarch::Ray,
    types::{Point, Value, Vector},
};

/// Per-frame camera inputs, enough to rebuild one world-space ray per sample.
///
/// Samples are laid out row-major: index `i` is sample `(i % width, i / width)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraRays {
    pub camera_to_world: Matrix4<Value>,
    pub inverse_projection: Matrix4<Value>,
    /// Samples per row.
    pub width: u32,
    /// Sample rows.
    pub height: u32,
}

impl CameraRays {
    /// Returns [`MarchingCubesError::EmptyViewport`] if either dimension is zero.
    pub fn new(
        camera_to_world: Matrix4<Value>,
        inverse_projection: Matrix4<Value>,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(MarchingCubesError::EmptyViewport);
        }
        Ok(Self {
            camera_to_world,
            inverse_projection,
            width,
            height,
        })
    }

    /// Builds the sample grid for a `pixel_width × pixel_height` viewport, one
    /// sample per `resolution × resolution` pixel block.
    ///
    /// Fails with [`MarchingCubesError::InvalidResolution`] for a zero stride
    /// or a stride larger than the viewport.
    pub fn downsampled(
        camera_to_world: Matrix4<Value>,
        inverse_projection: Matrix4<Value>,
        pixel_width: u32,
        pixel_height: u32,
        resolution: u32,
    ) -> Result<Self> {
        if pixel_width == 0 || pixel_height == 0 {
            return Err(MarchingCubesError::EmptyViewport);
        }
        if resolution == 0 || resolution > pixel_width || resolution > pixel_height {
            return Err(MarchingCubesError::InvalidResolution);
        }
        Self::new(
            camera_to_world,
            inverse_projection,
            pixel_width / resolution,
            pixel_height / resolution,
        )
    }

    pub fn sample_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    #[inline]
    pub fn to_2d(&self, index: usize) -> (u32, u32) {
        let w = self.width as usize;
        ((index % w) as u32, (index / w) as u32)
    }

    /// World-space ray through sample `(x, y)`.
    ///
    /// The sample maps to `uv = (x / width, y / height) * 2 - 1`, which is pushed
    /// through the inverse projection on the `z = 0` plane and rotated into world
    /// space. The origin is the camera position.
    pub fn ray(&self, x: u32, y: u32) -> Ray {
        let u = Value::from(x) / Value::from(self.width) * 2.0 - 1.0;
        let v = Value::from(y) / Value::from(self.height) * 2.0 - 1.0;

        let origin = self.camera_to_world * Vector4::new(0.0, 0.0, 0.0, 1.0);
        let view = self.inverse_projection * Vector4::new(u, v, 0.0, 1.0);
        let direction = self.camera_to_world * Vector4::new(view.x, view.y, view.z, 0.0);

        Ray::new(
            Point::new(origin.x, origin.y, origin.z),
            Vector::new(direction.x, direction.y, direction.z),
        )
    }

    /// Ray for sample `index` in row-major order.
    #[inline]
    pub fn ray_at(&self, index: usize) -> Ray {
        let (x, y) = self.to_2d(index);
        self.ray(x, y)
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::{Perspective3, Translation3};

    use super::*;

    fn camera(width: u32, height: u32) -> CameraRays {
        let to_world = Translation3::new(1.0, 2.0, 3.0).to_homogeneous();
        let projection = Perspective3::new(1.0, std::f64::consts::FRAC_PI_2, 0.1, 100.0);
        CameraRays::new(to_world, projection.inverse(), width, height).unwrap()
    }

    #[test]
    fn rejects_empty_viewport() {
        let m = Matrix4::identity();
        assert_eq!(
            CameraRays::new(m, m, 0, 10),
            Err(MarchingCubesError::EmptyViewport)
        );
    }

    #[test]
    fn downsampling_divides_the_viewport() {
        let m = Matrix4::identity();
        let rays = CameraRays::downsampled(m, m, 640, 480, 4).unwrap();
        assert_eq!((rays.width, rays.height), (160, 120));
        assert_eq!(
            CameraRays::downsampled(m, m, 640, 480, 0),
            Err(MarchingCubesError::InvalidResolution)
        );
        assert_eq!(
            CameraRays::downsampled(m, m, 8, 480, 9),
            Err(MarchingCubesError::InvalidResolution)
        );
    }

    #[test]
    fn index_maps_row_major() {
        let rays = camera(4, 3);
        assert_eq!(rays.sample_count(), 12);
        assert_eq!(rays.to_2d(0), (0, 0));
        assert_eq!(rays.to_2d(5), (1, 1));
        assert_eq!(rays.to_2d(11), (3, 2));
    }

    #[test]
    fn rays_start_at_the_camera_and_are_unit_length() {
        let rays = camera(8, 8);
        for i in 0..rays.sample_count() {
            let ray = rays.ray_at(i);
            assert_eq!(ray.origin, Point::new(1.0, 2.0, 3.0));
            assert!((ray.direction.norm() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn centre_sample_looks_down_negative_z() {
        let rays = camera(2, 2);
        // sample (1, 1) maps to uv (0, 0)
        let ray = rays.ray(1, 1);
        assert!(ray.direction.z < 0.0);
        assert!(ray.direction.x.abs() < 1e-12 && ray.direction.y.abs() < 1e-12);
    }
}
