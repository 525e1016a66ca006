use bytemuck::{Pod, Zeroable};

/// Vertex of the point cloud buffer, laid out for direct upload.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Zeroable, Pod)]
pub struct PointVertex {
    /// Position in sensor coordinates, meters.
    pub position: [f32; 3],
    /// RGBA color.
    pub color: [u8; 4],
}

impl PointVertex {
    pub fn new(x: f32, y: f32, z: f32, rgb: [u8; 3]) -> Self {
        Self {
            position: [x, y, z],
            color: [rgb[0], rgb[1], rgb[2], 255],
        }
    }
}

/// One side of the point cloud double buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferSlot {
    A,
    B,
}

impl BufferSlot {
    pub fn other(self) -> Self {
        match self {
            BufferSlot::A => BufferSlot::B,
            BufferSlot::B => BufferSlot::A,
        }
    }

    pub fn index(self) -> usize {
        match self {
            BufferSlot::A => 0,
            BufferSlot::B => 1,
        }
    }
}
