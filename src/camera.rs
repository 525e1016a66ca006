use nalgebra::Vector3;
use serde_derive::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Camera intrinsic parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    /// Focal length and pixel scale in the X-axis.
    pub fx: f64,
    /// Focal length and pixel scale in the Y-axis.
    pub fy: f64,
    /// Camera X-center.
    pub cx: f64,
    /// Camera Y-center.
    pub cy: f64,
    /// Width of the image the parameters were calibrated for.
    #[serde(default)]
    pub width: Option<usize>,
    /// Height of the image the parameters were calibrated for.
    #[serde(default)]
    pub height: Option<usize>,
}

impl Default for CameraIntrinsics {
    /// Roughly a 640x480 front depth sensor.
    fn default() -> Self {
        Self {
            fx: 525.0,
            fy: 525.0,
            cx: 319.5,
            cy: 239.5,
            width: Some(640),
            height: Some(480),
        }
    }
}

impl CameraIntrinsics {
    pub fn from_simple_intrinsic(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self {
            fx,
            fy,
            cx,
            cy,
            width: None,
            height: None,
        }
    }

    /// Project a 3D point into image space.
    ///
    /// # Arguments
    ///
    /// * point: The 3D point.
    ///
    /// # Returns
    ///
    /// * (x and y) coordinates.
    pub fn project(&self, point: &Vector3<f32>) -> (f32, f32) {
        (
            point[0] * self.fx as f32 / point[2] + self.cx as f32,
            point[1] * self.fy as f32 / point[2] + self.cy as f32,
        )
    }

    pub fn backproject(&self, x: f32, y: f32, z: f32) -> Vector3<f32> {
        Vector3::new(
            (x - self.cx as f32) * z / self.fx as f32,
            (y - self.cy as f32) * z / self.fy as f32,
            z,
        )
    }

    /// Scale the camera parameters according to the given scale.
    ///
    /// # Arguments
    ///
    /// * scale: The scale factor.
    ///
    /// # Returns
    ///
    /// * A new camera with scaled parameters.
    pub fn scale(&self, scale: f64) -> Self {
        Self {
            fx: self.fx * scale,
            fy: self.fy * scale,
            cx: self.cx * scale,
            cy: self.cy * scale,
            width: self.width.map(|w| (w as f64 * scale).round() as usize),
            height: self.height.map(|h| (h as f64 * scale).round() as usize),
        }
    }

    pub fn size(&mut self, width: usize, height: usize) {
        self.width = Some(width);
        self.height = Some(height);
    }

    /// Checks that the parameters can back-project anything.
    pub fn validate(&self) -> Result<()> {
        if !(self.fx.is_finite() && self.fx > 0.0 && self.fy.is_finite() && self.fy > 0.0) {
            return Err(Error::invalid_parameter(format!(
                "focal lengths must be positive, got fx={} fy={}",
                self.fx, self.fy
            )));
        }
        if !(self.cx.is_finite() && self.cy.is_finite()) {
            return Err(Error::invalid_parameter("principal point must be finite"));
        }
        Ok(())
    }

    /// Returns the intrinsics for a frame of `width`x`height`.
    ///
    /// Without a reference size the parameters are used as they are. With a
    /// reference size, they are rescaled if the frame has the same aspect
    /// ratio, otherwise the frame does not belong to this camera.
    pub fn fit_to(&self, width: usize, height: usize) -> Result<Self> {
        let (ref_width, ref_height) = match (self.width, self.height) {
            (Some(w), Some(h)) => (w, h),
            _ => return Ok(self.clone()),
        };

        if ref_width == width && ref_height == height {
            return Ok(self.clone());
        }

        // Same aspect ratio, compared in integers.
        if ref_width * height != ref_height * width {
            return Err(Error::malformed_frame(format!(
                "frame {}x{} does not match the intrinsics reference {}x{}",
                width, height, ref_width, ref_height
            )));
        }

        let mut scaled = self.scale(width as f64 / ref_width as f64);
        scaled.size(width, height);
        Ok(scaled)
    }
}
