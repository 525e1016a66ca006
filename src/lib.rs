pub mod camera;
pub mod colormap;
pub mod config;
pub mod error;
pub mod histogram;
pub mod pipeline;
pub mod range;
pub mod viz;

mod image;
pub use crate::image::{
    ColorAlignment, ColorFrame, DepthConvention, DepthEncoding, DepthFrame, InvalidMarker,
    IntoArray3, IntoRgbaImage, RgbdFrame,
};
