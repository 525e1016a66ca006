mod depth;
pub use depth::{DepthConvention, DepthEncoding, DepthFrame, InvalidMarker};

mod color;
pub use color::{ColorFrame, IntoArray3, IntoRgbaImage};

mod rgbd_frame;
pub use rgbd_frame::{alignment, ColorAlignment, RgbdFrame};
