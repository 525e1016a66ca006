use crate::error::{Error, Result};

use super::{ColorFrame, DepthFrame};

/// Largest relative difference between the horizontal and vertical
/// color/depth scale for a pair to be considered aligned.
const MAX_SCALE_SKEW: f32 = 0.01;

/// A depth frame and its registered color frame.
pub struct RgbdFrame {
    pub depth: DepthFrame,
    pub color: ColorFrame,
}

/// Maps depth pixel coordinates into the color frame, which may have a
/// different (but proportional) resolution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorAlignment {
    pub scale_x: f32,
    pub scale_y: f32,
    color_width: usize,
    color_height: usize,
}

impl ColorAlignment {
    /// Color pixel of the depth pixel (row, col).
    #[inline]
    pub fn color_pixel(&self, row: usize, col: usize) -> (usize, usize) {
        let color_row = ((row as f32 + 0.5) * self.scale_y) as usize;
        let color_col = ((col as f32 + 0.5) * self.scale_x) as usize;
        (
            color_row.min(self.color_height - 1),
            color_col.min(self.color_width - 1),
        )
    }
}

impl RgbdFrame {
    pub fn new(depth: DepthFrame, color: ColorFrame) -> Self {
        Self { depth, color }
    }

    pub fn into_parts(self) -> (DepthFrame, ColorFrame) {
        (self.depth, self.color)
    }

    /// Computes the depth to color alignment, or rejects the pair when the
    /// two frames can't be related by a single scale ratio.
    pub fn alignment(&self) -> Result<ColorAlignment> {
        alignment(&self.depth, &self.color)
    }
}

pub fn alignment(depth: &DepthFrame, color: &ColorFrame) -> Result<ColorAlignment> {
    if depth.is_empty() {
        return Err(Error::malformed_frame("depth frame has no pixels"));
    }
    if color.width() == 0 || color.height() == 0 {
        return Err(Error::malformed_frame("color frame has no pixels"));
    }

    let scale_x = color.width() as f32 / depth.width() as f32;
    let scale_y = color.height() as f32 / depth.height() as f32;
    if (scale_x - scale_y).abs() > MAX_SCALE_SKEW * scale_x.max(scale_y) {
        return Err(Error::malformed_frame(format!(
            "depth {}x{} and color {}x{} have different aspect ratios",
            depth.width(),
            depth.height(),
            color.width(),
            color.height()
        )));
    }

    Ok(ColorAlignment {
        scale_x,
        scale_y,
        color_width: color.width(),
        color_height: color.height(),
    })
}

#[cfg(test)]
mod tests {
    use ndarray::Array2;

    use super::RgbdFrame;
    use crate::image::{ColorFrame, DepthFrame};

    #[test]
    fn test_same_resolution_is_identity() {
        let frame = RgbdFrame::new(
            DepthFrame::new(Array2::ones((4, 4))),
            ColorFrame::uniform(4, 4, [0, 0, 0]),
        );
        let alignment = frame.alignment().unwrap();
        assert_eq!(alignment.color_pixel(3, 2), (3, 2));
    }

    #[test]
    fn test_double_resolution_color() {
        let frame = RgbdFrame::new(
            DepthFrame::new(Array2::ones((240, 320))),
            ColorFrame::uniform(640, 480, [0, 0, 0]),
        );
        let alignment = frame.alignment().unwrap();
        assert_eq!(alignment.color_pixel(0, 0), (1, 1));
        assert_eq!(alignment.color_pixel(239, 319), (479, 639));
    }

    #[test]
    fn test_rejects_mismatched_aspect() {
        let frame = RgbdFrame::new(
            DepthFrame::new(Array2::ones((240, 320))),
            ColorFrame::uniform(640, 360, [0, 0, 0]),
        );
        assert!(frame.alignment().is_err());
    }
}
