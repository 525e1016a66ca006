use tracing::{debug, info};

use crate::error::{Error, Result};

use super::{
    backend::{PointRenderBackend, RenderImage, RenderParams, RenderUniforms},
    datatypes::{BufferSlot, PointVertex},
};

/// Portable backend that splats the points on the CPU with a z-buffer.
///
/// It is the reference for GPU backends and runs where no graphics API is
/// available, like headless tests.
pub struct SoftwareBackend {
    width: usize,
    height: usize,
    clear_color: [u8; 4],
    max_points: Option<usize>,
    slots: [Vec<PointVertex>; 2],
    depth_buffer: Vec<f32>,
}

impl SoftwareBackend {
    /// Builds a software renderer
    ///
    /// # Arguments
    ///
    /// * `params`: Output image size, clear color and point limit.
    pub fn new(params: &RenderParams) -> Result<Self> {
        params.validate()?;
        info!(
            width = params.width,
            height = params.height,
            "Initializing software point renderer"
        );
        Ok(Self {
            width: params.width,
            height: params.height,
            clear_color: params.clear_color,
            max_points: params.max_points,
            slots: [Vec::new(), Vec::new()],
            depth_buffer: vec![f32::INFINITY; params.width * params.height],
        })
    }

    pub fn len(&self, slot: BufferSlot) -> usize {
        self.slots[slot.index()].len()
    }

    pub fn is_empty(&self, slot: BufferSlot) -> bool {
        self.slots[slot.index()].is_empty()
    }
}

impl PointRenderBackend for SoftwareBackend {
    fn name(&self) -> &str {
        "software"
    }

    fn upload(&mut self, slot: BufferSlot, points: &[PointVertex]) -> Result<()> {
        if let Some(max_points) = self.max_points {
            if points.len() > max_points {
                return Err(Error::resource_exhaustion(format!(
                    "{} points exceed the {} points buffer",
                    points.len(),
                    max_points
                )));
            }
        }

        let buffer = &mut self.slots[slot.index()];
        buffer.clear();
        buffer
            .try_reserve(points.len())
            .map_err(|err| Error::resource_exhaustion(format!("point buffer: {}", err)))?;
        buffer.extend_from_slice(points);
        debug!(?slot, points = points.len(), "Uploaded point buffer");
        Ok(())
    }

    fn draw(&mut self, slot: BufferSlot, uniforms: &RenderUniforms) -> Result<RenderImage> {
        let (width, height) = (self.width, self.height);
        let mut rgba = Vec::new();
        rgba.try_reserve_exact(width * height * 4)
            .map_err(|err| Error::resource_exhaustion(format!("framebuffer: {}", err)))?;
        for _ in 0..width * height {
            rgba.extend_from_slice(&self.clear_color);
        }
        self.depth_buffer.fill(f32::INFINITY);

        let half = (uniforms.point_size / 2) as isize;
        let size = uniforms.point_size as isize;
        for vertex in self.slots[slot.index()].iter() {
            let (x, y, z) = match uniforms.project(&vertex.position, width, height) {
                Some(projected) => projected,
                None => continue,
            };

            let (x0, y0) = (x as isize - half, y as isize - half);
            for py in y0.max(0)..(y0 + size).min(height as isize) {
                for px in x0.max(0)..(x0 + size).min(width as isize) {
                    let index = py as usize * width + px as usize;
                    if z < self.depth_buffer[index] {
                        self.depth_buffer[index] = z;
                        rgba[index * 4..index * 4 + 4].copy_from_slice(&vertex.color);
                    }
                }
            }
        }

        Ok(RenderImage {
            rgba,
            width: width as u32,
            height: height as u32,
        })
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::Isometry3;
    use rstest::*;

    use super::SoftwareBackend;
    use crate::{
        error::Error,
        viz::{
            backend::{PointRenderBackend, RenderParams, RenderUniforms},
            datatypes::{BufferSlot, PointVertex},
        },
    };

    #[fixture]
    fn params() -> RenderParams {
        RenderParams {
            width: 32,
            height: 24,
            fov_y: 90f32.to_radians(),
            ..Default::default()
        }
    }

    fn uniforms(point_size: usize) -> RenderUniforms {
        RenderUniforms {
            view: Isometry3::identity(),
            fov_y: 90f32.to_radians(),
            near: 0.01,
            far: 100.0,
            point_size,
        }
    }

    #[rstest]
    fn test_render_nearest_wins(params: RenderParams) {
        let mut backend = SoftwareBackend::new(&params).unwrap();
        backend
            .upload(
                BufferSlot::A,
                &[
                    PointVertex::new(0.0, 0.0, 2.0, [255, 0, 0]),
                    PointVertex::new(0.0, 0.0, 1.0, [0, 255, 0]),
                    PointVertex::new(0.0, 0.0, 3.0, [0, 0, 255]),
                ],
            )
            .unwrap();

        let image = backend.draw(BufferSlot::A, &uniforms(1)).unwrap();
        assert_eq!(image.width, 32);
        assert_eq!(image.height, 24);
        assert_eq!(image.pixel(16, 12), [0, 255, 0, 255]);
        assert_eq!(image.pixel(0, 0), [0, 0, 0, 255]);
    }

    #[rstest]
    fn test_point_size(params: RenderParams) {
        let mut backend = SoftwareBackend::new(&params).unwrap();
        backend
            .upload(BufferSlot::B, &[PointVertex::new(0.0, 0.0, 1.0, [9, 9, 9])])
            .unwrap();
        let image = backend.draw(BufferSlot::B, &uniforms(3)).unwrap();
        let painted = image.rgba.chunks(4).filter(|p| p[0] == 9).count();
        assert_eq!(painted, 9);
    }

    #[rstest]
    fn test_slots_are_independent(params: RenderParams) {
        let mut backend = SoftwareBackend::new(&params).unwrap();
        backend
            .upload(BufferSlot::A, &[PointVertex::new(0.0, 0.0, 1.0, [1, 1, 1])])
            .unwrap();
        assert_eq!(backend.len(BufferSlot::A), 1);
        assert!(backend.is_empty(BufferSlot::B));
    }

    #[rstest]
    fn test_exhaustion(params: RenderParams) {
        let mut backend = SoftwareBackend::new(&RenderParams {
            max_points: Some(1),
            ..params
        })
        .unwrap();
        let points = vec![PointVertex::default(); 2];
        assert!(matches!(
            backend.upload(BufferSlot::A, &points),
            Err(Error::ResourceExhaustion(_))
        ));
    }
}
