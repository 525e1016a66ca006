mod backend;
pub use backend::{PointRenderBackend, RenderImage, RenderParams, RenderUniforms};

mod datatypes;
pub use datatypes::{BufferSlot, PointVertex};

mod orbit_camera;
pub use orbit_camera::{CameraState, OrbitCamera, OrbitParams};

mod renderer;
pub use renderer::{
    reproject, FrameOutcome, PointCloudRenderer, PointCloudSnapshot, PointRenderer,
    RenderedFrame,
};

mod software;
pub use software::SoftwareBackend;
