use image::{flat::SampleLayout, RgbImage, RgbaImage};
use ndarray::{Array3, ShapeBuilder};

use crate::error::{Error, Result};

/// Trait to convert into ndarray::Array3, this is different than nshare version
/// because it uses the shape [height, width, channels] instead of [channels, height, width].
pub trait IntoArray3 {
    fn into_array3(self) -> Array3<u8>;
}

impl IntoArray3 for RgbImage {
    fn into_array3(self) -> Array3<u8> {
        let SampleLayout {
            channels,
            channel_stride,
            height,
            height_stride,
            width,
            width_stride,
        } = self.sample_layout();
        let shape = (height as usize, width as usize, channels as usize);
        let strides = (height_stride, width_stride, channel_stride);
        Array3::from_shape_vec(shape.strides(strides), self.into_raw())
            .expect("RgbImage sample layout always matches its buffer")
    }
}

/// One RGB frame, stored as [height, width, 3].
#[derive(Clone, Debug)]
pub struct ColorFrame {
    pub color: Array3<u8>,
}

impl ColorFrame {
    pub fn new(color: Array3<u8>) -> Result<Self> {
        let channels = color.shape()[2];
        if channels != 3 {
            return Err(Error::malformed_frame(format!(
                "color frame must have 3 channels, got {}",
                channels
            )));
        }
        Ok(Self { color })
    }

    pub fn from_rgb_image(image: RgbImage) -> Self {
        Self {
            color: image.into_array3(),
        }
    }

    /// A frame painted with a single color.
    pub fn uniform(width: usize, height: usize, rgb: [u8; 3]) -> Self {
        Self {
            color: Array3::from_shape_fn((height, width, 3), |(_, _, c)| rgb[c]),
        }
    }

    pub fn width(&self) -> usize {
        self.color.shape()[1]
    }

    pub fn height(&self) -> usize {
        self.color.shape()[0]
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> [u8; 3] {
        [
            self.color[[row, col, 0]],
            self.color[[row, col, 1]],
            self.color[[row, col, 2]],
        ]
    }
}

/// Trait to convert objects into image::RgbaImage
pub trait IntoRgbaImage {
    fn into_rgba_image(self, width: u32, height: u32) -> Result<RgbaImage>;
}

impl IntoRgbaImage for Vec<u8> {
    fn into_rgba_image(self, width: u32, height: u32) -> Result<RgbaImage> {
        let len = self.len();
        RgbaImage::from_raw(width, height, self).ok_or_else(|| {
            Error::invalid_parameter(format!(
                "{} bytes do not make a {}x{} RGBA image",
                len, width, height
            ))
        })
    }
}
