use std::sync::{
    atomic::{AtomicU64, Ordering},
    Mutex, MutexGuard, TryLockError,
};

use ndarray::{parallel::prelude::*, Axis};
use tracing::{debug, warn};

use crate::{
    camera::CameraIntrinsics,
    error::Result,
    image::{alignment, ColorAlignment, ColorFrame, DepthConvention, DepthFrame},
};

use super::{
    backend::{PointRenderBackend, RenderImage, RenderParams, RenderUniforms},
    datatypes::{BufferSlot, PointVertex},
    orbit_camera::{CameraState, OrbitCamera, OrbitParams},
};

/// Interactive and per frame surface of a point cloud view.
pub trait PointRenderer: Send + Sync {
    /// Re-projects and draws one aligned depth/color pair.
    fn submit_frame(&self, depth: &DepthFrame, color: &ColorFrame) -> Result<FrameOutcome>;
    /// Draws the current point buffer under the current camera.
    fn render(&self) -> Result<RenderImage>;
    fn yaw(&self, angle: f32);
    fn pitch(&self, angle: f32);
    fn roll(&self, angle: f32);
    fn move_toward_center(&self, scale: f32);
    fn reset_view(&self);
    fn camera_state(&self) -> CameraState;
}

/// What happened to a submitted frame.
#[derive(Debug)]
pub enum FrameOutcome {
    /// The frame replaced the point buffer and was drawn.
    Rendered(RenderedFrame),
    /// A previous frame was still being processed, this one was skipped.
    Dropped,
}

#[derive(Debug)]
pub struct RenderedFrame {
    pub frame_index: u64,
    pub num_points: usize,
    pub image: RenderImage,
}

/// Content of the presented point buffer.
#[derive(Clone, Debug, Default)]
pub struct PointCloudSnapshot {
    pub frame_index: Option<u64>,
    pub points: Vec<PointVertex>,
}

/// CPU mirror of one backend slot.
#[derive(Default)]
struct PointCloudSlot {
    frame_index: Option<u64>,
    points: Vec<PointVertex>,
}

/// The double buffered point cloud and its backend.
struct PointCloudBuffer<B> {
    backend: B,
    front: BufferSlot,
    slots: [PointCloudSlot; 2],
}

impl<B: PointRenderBackend> PointCloudBuffer<B> {
    fn front(&self) -> &PointCloudSlot {
        &self.slots[self.front.index()]
    }
}

/// Point cloud view with an orbit camera.
///
/// Frames and camera commands may come from different threads. Camera
/// commands are applied immediately, in arrival order. A frame that arrives
/// while another one is being uploaded or drawn is dropped.
pub struct PointCloudRenderer<B> {
    intrinsics: CameraIntrinsics,
    convention: DepthConvention,
    params: RenderParams,
    camera: Mutex<OrbitCamera>,
    buffer: Mutex<PointCloudBuffer<B>>,
    frame_counter: AtomicU64,
}

fn lock_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Presented state is only swapped after a complete frame, so a poisoned
    // lock still guards consistent data.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<B: PointRenderBackend> PointCloudRenderer<B> {
    pub fn new(
        backend: B,
        intrinsics: CameraIntrinsics,
        convention: DepthConvention,
        orbit: OrbitParams,
        params: RenderParams,
    ) -> Result<Self> {
        intrinsics.validate()?;
        convention.validate()?;
        orbit.validate()?;
        params.validate()?;
        Ok(Self {
            intrinsics,
            convention,
            params,
            camera: Mutex::new(OrbitCamera::new(orbit)),
            buffer: Mutex::new(PointCloudBuffer {
                backend,
                front: BufferSlot::A,
                slots: Default::default(),
            }),
            frame_counter: AtomicU64::new(0),
        })
    }

    pub fn backend_name(&self) -> String {
        lock_recover(&self.buffer).backend.name().to_string()
    }

    /// Copy of the presented point buffer.
    pub fn snapshot(&self) -> PointCloudSnapshot {
        let buffer = lock_recover(&self.buffer);
        let front = buffer.front();
        PointCloudSnapshot {
            frame_index: front.frame_index,
            points: front.points.clone(),
        }
    }

    fn uniforms(&self) -> RenderUniforms {
        let view = lock_recover(&self.camera).view();
        RenderUniforms {
            view,
            fov_y: self.params.fov_y,
            near: self.params.near,
            far: self.params.far,
            point_size: self.params.point_size,
        }
    }

    fn with_camera<F: FnOnce(&mut OrbitCamera)>(&self, f: F) {
        f(&mut lock_recover(&self.camera));
    }

    /// Checks the pair and finds the intrinsics of its resolution.
    fn check_frame(
        &self,
        depth: &DepthFrame,
        color: &ColorFrame,
    ) -> Result<(CameraIntrinsics, ColorAlignment)> {
        let alignment = alignment(depth, color)?;
        let intrinsics = self.intrinsics.fit_to(depth.width(), depth.height())?;
        Ok((intrinsics, alignment))
    }
}

/// Back-projects every valid depth pixel with its color.
pub fn reproject(
    depth: &DepthFrame,
    color: &ColorFrame,
    intrinsics: &CameraIntrinsics,
    alignment: &ColorAlignment,
    convention: &DepthConvention,
) -> Vec<PointVertex> {
    depth
        .depth
        .axis_iter(Axis(0))
        .into_par_iter()
        .enumerate()
        .flat_map_iter(|(row, depth_row)| {
            depth_row
                .into_iter()
                .enumerate()
                .filter_map(move |(col, &raw)| {
                    let z = convention.to_metric(raw)?;
                    let point = intrinsics.backproject(col as f32, row as f32, z);
                    let (color_row, color_col) = alignment.color_pixel(row, col);
                    Some(PointVertex::new(
                        point[0],
                        point[1],
                        point[2],
                        color.get(color_row, color_col),
                    ))
                })
        })
        .collect()
}

impl<B: PointRenderBackend> PointRenderer for PointCloudRenderer<B> {
    fn submit_frame(&self, depth: &DepthFrame, color: &ColorFrame) -> Result<FrameOutcome> {
        let (intrinsics, alignment) = self.check_frame(depth, color).map_err(|err| {
            warn!("Rejecting frame: {}", err);
            err
        })?;

        let mut buffer = match self.buffer.try_lock() {
            Ok(buffer) => buffer,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                debug!("Renderer busy, dropping frame");
                return Ok(FrameOutcome::Dropped);
            }
        };

        let frame_index = self.frame_counter.fetch_add(1, Ordering::Relaxed);
        let back = buffer.front.other();
        let points = reproject(depth, color, &intrinsics, &alignment, &self.convention);

        // The back slot is stale until the frame is fully uploaded and drawn.
        buffer.slots[back.index()].frame_index = None;
        buffer.backend.upload(back, &points).map_err(|err| {
            warn!(frame_index, "Point upload failed: {}", err);
            err
        })?;
        let image = buffer
            .backend
            .draw(back, &self.uniforms())
            .map_err(|err| {
                warn!(frame_index, "Point draw failed: {}", err);
                err
            })?;

        let num_points = points.len();
        buffer.slots[back.index()] = PointCloudSlot {
            frame_index: Some(frame_index),
            points,
        };
        buffer.front = back;
        debug!(frame_index, num_points, ?back, "Presented point buffer");

        Ok(FrameOutcome::Rendered(RenderedFrame {
            frame_index,
            num_points,
            image,
        }))
    }

    fn render(&self) -> Result<RenderImage> {
        let mut buffer = lock_recover(&self.buffer);
        let front = buffer.front;
        buffer.backend.draw(front, &self.uniforms())
    }

    fn yaw(&self, angle: f32) {
        self.with_camera(|camera| camera.yaw(angle));
    }

    fn pitch(&self, angle: f32) {
        self.with_camera(|camera| camera.pitch(angle));
    }

    fn roll(&self, angle: f32) {
        self.with_camera(|camera| camera.roll(angle));
    }

    fn move_toward_center(&self, scale: f32) {
        self.with_camera(|camera| camera.move_toward_center(scale));
    }

    fn reset_view(&self) {
        self.with_camera(|camera| camera.reset());
    }

    fn camera_state(&self) -> CameraState {
        lock_recover(&self.camera).state()
    }
}
