use image::{ImageBuffer, Rgba, RgbaImage};
use nalgebra::{Isometry3, Point3};
use serde_derive::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::datatypes::{BufferSlot, PointVertex};

/// Render target and rasterization parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderParams {
    pub width: usize,
    pub height: usize,
    /// Vertical field of view, radians.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    /// Side of the square splatted per point, pixels.
    pub point_size: usize,
    pub clear_color: [u8; 4],
    /// Largest point count a backend may allocate, `None` for no limit.
    pub max_points: Option<usize>,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fov_y: 60f32.to_radians(),
            near: 0.01,
            far: 100.0,
            point_size: 1,
            clear_color: [0, 0, 0, 255],
            max_points: None,
        }
    }
}

impl RenderParams {
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::invalid_parameter("render target must not be empty"));
        }
        if !(self.fov_y > 0.0 && self.fov_y < std::f32::consts::PI) {
            return Err(Error::invalid_parameter(format!(
                "field of view must be in (0, pi), got {}",
                self.fov_y
            )));
        }
        if !(self.near > 0.0 && self.near < self.far) {
            return Err(Error::invalid_parameter(format!(
                "clip planes must satisfy 0 < near < far, got {} and {}",
                self.near, self.far
            )));
        }
        if self.point_size == 0 {
            return Err(Error::invalid_parameter("point size must be at least 1"));
        }
        Ok(())
    }
}

/// Per draw values given to a backend.
#[derive(Clone, Copy, Debug)]
pub struct RenderUniforms {
    /// Sensor to camera transform.
    pub view: Isometry3<f32>,
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    pub point_size: usize,
}

impl RenderUniforms {
    /// Focal length in pixels for a `height` pixels tall target.
    pub fn focal(&self, height: usize) -> f32 {
        (height as f32 * 0.5) / (self.fov_y * 0.5).tan()
    }

    /// Projects a sensor point into a `width`x`height` target.
    ///
    /// # Returns
    ///
    /// * (x, y, z) with pixel coordinates and camera depth, `None` if the
    ///   point is clipped.
    #[inline]
    pub fn project(
        &self,
        position: &[f32; 3],
        width: usize,
        height: usize,
    ) -> Option<(f32, f32, f32)> {
        let point = self.view * Point3::new(position[0], position[1], position[2]);
        if point.z < self.near || point.z > self.far {
            return None;
        }
        let focal = self.focal(height);
        let x = point.x * focal / point.z + width as f32 * 0.5;
        let y = point.y * focal / point.z + height as f32 * 0.5;
        if x < 0.0 || y < 0.0 || x >= width as f32 || y >= height as f32 {
            return None;
        }
        Some((x, y, point.z))
    }
}

/// Render result image.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderImage {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl RenderImage {
    /// Returns a copy of the buffer into a RGBA Image.
    pub fn to_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            let offset = ((y * self.width + x) * 4) as usize;
            Rgba::<u8>([
                self.rgba[offset],
                self.rgba[offset + 1],
                self.rgba[offset + 2],
                self.rgba[offset + 3],
            ])
        })
    }

    /// Maps without copying the buffer into an image.
    ///
    /// # Arguments
    ///
    /// * `f`: Function that uses the image.
    pub fn map<F, R>(&self, f: F) -> Option<R>
    where
        F: Fn(ImageBuffer<Rgba<u8>, &[u8]>) -> R,
    {
        ImageBuffer::from_raw(self.width, self.height, &self.rgba[..]).map(f)
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = ((y * self.width + x) * 4) as usize;
        [
            self.rgba[offset],
            self.rgba[offset + 1],
            self.rgba[offset + 2],
            self.rgba[offset + 3],
        ]
    }
}

/// Graphics API binding of the point renderer.
///
/// Backends keep two vertex buffers. The renderer uploads a new frame into
/// the slot that is not being presented and only presents it once upload
/// and draw succeeded, so a backend failure never exposes a half written
/// buffer.
pub trait PointRenderBackend: Send {
    fn name(&self) -> &str;

    /// Replaces the content of `slot` by `points`.
    ///
    /// Errors with [`Error::ResourceExhaustion`] when the buffer can't be
    /// allocated.
    fn upload(&mut self, slot: BufferSlot, points: &[PointVertex]) -> Result<()>;

    /// Draws the points of `slot`.
    fn draw(&mut self, slot: BufferSlot, uniforms: &RenderUniforms) -> Result<RenderImage>;
}

impl<B: PointRenderBackend + ?Sized> PointRenderBackend for Box<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn upload(&mut self, slot: BufferSlot, points: &[PointVertex]) -> Result<()> {
        (**self).upload(slot, points)
    }

    fn draw(&mut self, slot: BufferSlot, uniforms: &RenderUniforms) -> Result<RenderImage> {
        (**self).draw(slot, uniforms)
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::Isometry3;

    use super::{RenderImage, RenderParams, RenderUniforms};

    fn uniforms() -> RenderUniforms {
        RenderUniforms {
            view: Isometry3::identity(),
            fov_y: 90f32.to_radians(),
            near: 0.1,
            far: 10.0,
            point_size: 1,
        }
    }

    #[test]
    fn test_project_center_and_clip() {
        let uniforms = uniforms();
        let (x, y, z) = uniforms.project(&[0.0, 0.0, 2.0], 100, 80).unwrap();
        assert_eq!((x, y, z), (50.0, 40.0, 2.0));
        assert!(uniforms.project(&[0.0, 0.0, 0.05], 100, 80).is_none());
        assert!(uniforms.project(&[0.0, 0.0, 20.0], 100, 80).is_none());
        assert!(uniforms.project(&[-10.0, 0.0, 1.0], 100, 80).is_none());
    }

    #[test]
    fn test_render_params_validate() {
        assert!(RenderParams::default().validate().is_ok());
        let params = RenderParams {
            width: 0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_render_image_access() {
        let image = RenderImage {
            rgba: (0..16).collect(),
            width: 2,
            height: 2,
        };
        assert_eq!(image.pixel(1, 1), [12, 13, 14, 15]);
        assert_eq!(image.to_image().get_pixel(0, 1).0, [8, 9, 10, 11]);
        assert_eq!(image.map(|view| view.width()), Some(2));
    }
}
