use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// Contents of the projection uniform buffer: one column-major 4×4 matrix.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ProjectionUniform {
    pub matrix: [[f32; 4]; 4],
}

impl ProjectionUniform {
    pub const SIZE: u64 = std::mem::size_of::<ProjectionUniform>() as u64;

    pub fn new(matrix: Mat4) -> Self {
        Self {
            matrix: matrix.to_cols_array_2d(),
        }
    }

    pub fn for_target(width: u32, height: u32) -> Self {
        Self::new(orthographic_projection(width, height))
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.matrix)
    }
}

/// Off-center orthographic projection for a `width` × `height` target.
///
/// x: 0..width → -1..1, y: 0..height → 1..-1 (top-left origin), z: 0..1 kept
/// as 0..1, which is the clip depth range of every wgpu backend. Zero sizes are
/// clamped to 1.
pub fn orthographic_projection(width: u32, height: u32) -> Mat4 {
    let w = width.max(1) as f32;
    let h = height.max(1) as f32;
    Mat4::orthographic_lh(0.0, w, h, 0.0, 0.0, 1.0)
}
