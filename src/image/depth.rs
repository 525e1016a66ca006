use image::{ImageBuffer, Luma};
use ndarray::{Array2, ArrayView2};
use serde_derive::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How a sensor marks samples that carry no measurement.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum InvalidMarker {
    /// Missing samples are NaN.
    Nan,
    /// Missing samples hold this exact value (e.g. 0.0).
    Sentinel(f32),
}

/// What a depth sample measures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepthEncoding {
    /// Distance along the optical axis, in meters.
    Depth,
    /// Inverse distance, in 1/meters.
    Disparity,
}

/// Validity convention of a depth stream. Set once when the pipeline is created.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthConvention {
    pub marker: InvalidMarker,
    /// Smallest physically valid raw sample.
    pub min_valid: f32,
    /// Largest physically valid raw sample.
    pub max_valid: f32,
    pub encoding: DepthEncoding,
}

impl Default for DepthConvention {
    fn default() -> Self {
        Self {
            marker: InvalidMarker::Nan,
            min_valid: 0.0,
            max_valid: f32::MAX,
            encoding: DepthEncoding::Depth,
        }
    }
}

impl DepthConvention {
    /// Whether a raw sample counts as a measurement. Non-finite samples never do.
    #[inline]
    pub fn is_valid(&self, value: f32) -> bool {
        if !value.is_finite() {
            return false;
        }
        if let InvalidMarker::Sentinel(sentinel) = self.marker {
            if value == sentinel {
                return false;
            }
        }
        value >= self.min_valid && value <= self.max_valid
    }

    /// Converts a raw sample into metric depth, `None` if it is not valid.
    #[inline]
    pub fn to_metric(&self, value: f32) -> Option<f32> {
        if !self.is_valid(value) {
            return None;
        }
        match self.encoding {
            DepthEncoding::Depth => Some(value),
            DepthEncoding::Disparity => {
                let depth = 1.0 / value;
                if depth.is_finite() && depth > 0.0 {
                    Some(depth)
                } else {
                    None
                }
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_valid.is_nan() || self.max_valid.is_nan() || self.min_valid > self.max_valid {
            return Err(Error::invalid_parameter(format!(
                "invalid depth validity range [{}, {}]",
                self.min_valid, self.max_valid
            )));
        }
        Ok(())
    }
}

/// One frame of raw depth samples, stored as [height, width].
#[derive(Clone, Debug)]
pub struct DepthFrame {
    pub depth: Array2<f32>,
}

impl DepthFrame {
    pub fn new(depth: Array2<f32>) -> Self {
        Self { depth }
    }

    /// Builds a frame from row-major samples.
    pub fn from_vec(width: usize, height: usize, samples: Vec<f32>) -> Result<Self> {
        Array2::from_shape_vec((height, width), samples)
            .map(Self::new)
            .map_err(|err| Error::malformed_frame(format!("depth samples: {}", err)))
    }

    /// Builds a frame from integer depth, like the millimeter maps of
    /// structured light sensors. Zero samples become NaN.
    ///
    /// # Arguments
    ///
    /// * `depth` - The integer depth map.
    /// * `depth_scale` - Multiplier from integer units into meters.
    pub fn from_u16(depth: &ArrayView2<u16>, depth_scale: f32) -> Self {
        Self {
            depth: depth.map(|&z| {
                if z == 0 {
                    f32::NAN
                } else {
                    z as f32 * depth_scale
                }
            }),
        }
    }

    /// Same as [`DepthFrame::from_u16`] but from a 16 bits image.
    pub fn from_luma16(image: &ImageBuffer<Luma<u16>, Vec<u16>>, depth_scale: f32) -> Self {
        let (width, height) = (image.width() as usize, image.height() as usize);
        Self::new(Array2::from_shape_fn((height, width), |(row, col)| {
            let z = image.get_pixel(col as u32, row as u32)[0];
            if z == 0 {
                f32::NAN
            } else {
                z as f32 * depth_scale
            }
        }))
    }

    pub fn width(&self) -> usize {
        self.depth.shape()[1]
    }

    pub fn height(&self) -> usize {
        self.depth.shape()[0]
    }

    pub fn len(&self) -> usize {
        self.depth.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depth.is_empty()
    }

    pub fn view(&self) -> ArrayView2<f32> {
        self.depth.view()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    use super::{DepthConvention, DepthEncoding, DepthFrame, InvalidMarker};

    #[test]
    fn test_nan_convention() {
        let convention = DepthConvention::default();
        assert!(convention.is_valid(1.5));
        assert!(!convention.is_valid(f32::NAN));
        assert!(!convention.is_valid(f32::INFINITY));
        assert!(!convention.is_valid(-0.5));
    }

    #[test]
    fn test_sentinel_and_physical_range() {
        let convention = DepthConvention {
            marker: InvalidMarker::Sentinel(0.0),
            min_valid: 0.0,
            max_valid: 5.0,
            ..Default::default()
        };
        assert!(!convention.is_valid(0.0));
        assert!(convention.is_valid(5.0));
        assert!(!convention.is_valid(5.01));
    }

    #[test]
    fn test_disparity_to_metric() {
        let convention = DepthConvention {
            encoding: DepthEncoding::Disparity,
            ..Default::default()
        };
        assert_eq!(convention.to_metric(2.0), Some(0.5));
        assert_eq!(convention.to_metric(0.0), None);
    }

    #[test]
    fn test_from_u16() {
        let frame = DepthFrame::from_u16(&array![[0u16, 1000], [2000, 0]].view(), 0.001);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert!(frame.depth[[0, 0]].is_nan());
        assert_abs_diff_eq!(frame.depth[[1, 0]], 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_from_vec_rejects_wrong_len() {
        assert!(DepthFrame::from_vec(4, 4, vec![1.0; 15]).is_err());
    }
}
