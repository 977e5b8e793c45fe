use bytemuck::{Pod, Zeroable};

use crate::device::{VertexElement, VertexFormat, VertexLayout};

/// Sprite vertex, matching the embedded vertex shader's inputs.
///
/// `color` is normalized (`Unorm8x4`): 255 reaches the shader as 1.0.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct SpriteVertex {
    pub position: [f32; 3],
    pub color: [u8; 4],
    pub tex_coords: [f32; 2],
}

impl SpriteVertex {
    const ELEMENTS: [VertexElement; 3] = [
        VertexElement { location: 0, format: VertexFormat::Float32x3, offset: 0 },
        VertexElement { location: 1, format: VertexFormat::Unorm8x4, offset: 12 },
        VertexElement { location: 2, format: VertexFormat::Float32x2, offset: 16 },
    ];

    pub const LAYOUT: VertexLayout = VertexLayout {
        stride: std::mem::size_of::<SpriteVertex>() as u64,
        elements: &Self::ELEMENTS,
    };

    #[inline]
    pub const fn new(position: [f32; 3], color: [u8; 4], tex_coords: [f32; 2]) -> Self {
        Self { position, color, tex_coords }
    }
}
