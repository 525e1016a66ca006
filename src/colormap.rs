use image::RgbaImage;
use ndarray::Axis;
use num::clamp;
use rayon::prelude::*;
use serde_derive::{Deserialize, Serialize};

use crate::{
    error::Result,
    histogram::EqualizationTable,
    image::{DepthConvention, DepthFrame, IntoRgbaImage},
    range::DepthRange,
};

/// JET colormap: blue, cyan, yellow, red for `t` going from 0 to 1.
#[inline]
pub fn jet(t: f32) -> [u8; 3] {
    let t = if t.is_nan() { 0.0 } else { clamp(t, 0.0, 1.0) };
    let channel = |offset: f32| {
        let v = clamp(1.5 - (4.0 * t - offset).abs(), 0.0, 1.0);
        (v * 255.0).round() as u8
    };
    [channel(3.0), channel(2.0), channel(1.0)]
}

/// Turns a depth frame into a false color image through an
/// [`EqualizationTable`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthColorizer {
    /// Paints near samples red and far samples blue.
    pub near_is_warm: bool,
    /// Color of invalid samples.
    pub invalid_color: [u8; 4],
}

impl Default for DepthColorizer {
    fn default() -> Self {
        Self {
            near_is_warm: true,
            invalid_color: [0, 0, 0, 255],
        }
    }
}

impl DepthColorizer {
    /// Colorizes one valid metric depth.
    #[inline]
    pub fn color(&self, depth: f32, table: &EqualizationTable, range: &DepthRange) -> [u8; 4] {
        let t = table.normalized(depth, range);
        let t = if self.near_is_warm { 1.0 - t } else { t };
        let [r, g, b] = jet(t);
        [r, g, b, 255]
    }

    /// Colorizes the whole frame.
    ///
    /// # Arguments
    ///
    /// * `frame` - The depth frame.
    /// * `table` - Equalization table of this frame.
    /// * `range` - The range used to build `table`, `None` if the frame had
    ///   no valid sample (everything is painted as invalid).
    /// * `convention` - Which samples are valid.
    pub fn colorize(
        &self,
        frame: &DepthFrame,
        table: &EqualizationTable,
        range: Option<&DepthRange>,
        convention: &DepthConvention,
    ) -> Result<RgbaImage> {
        let (width, height) = (frame.width(), frame.height());
        let mut rgba = vec![0u8; width * height * 4];

        if width > 0 {
            rgba.par_chunks_mut(width * 4)
                .zip(frame.depth.axis_iter(Axis(0)).into_par_iter())
                .for_each(|(out_row, depth_row)| {
                    for (pixel, &depth) in out_row.chunks_exact_mut(4).zip(depth_row.iter()) {
                        let color = match (range, convention.to_metric(depth)) {
                            (Some(range), Some(depth)) => self.color(depth, table, range),
                            _ => self.invalid_color,
                        };
                        pixel.copy_from_slice(&color);
                    }
                });
        }

        rgba.into_rgba_image(width as u32, height as u32)
    }
}
