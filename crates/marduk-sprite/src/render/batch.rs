use std::any::Any;
use std::fmt;
use std::path::Path;

use crate::coords::{Rect, ScissorRect};
use crate::device::SamplerFilter;
use crate::error::Result;

use super::SpriteVertex;

/// Small integer handle of a texture slot.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TextureId(pub u32);

impl TextureId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TextureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum BlendMode {
    /// Straight (non-premultiplied) alpha blending.
    #[default]
    AlphaBlend,
    /// Source replaces destination.
    Override,
}

/// Per-batch render state supplied by the batching layer.
///
/// Only `blend` and `use_scissor_rect` select a pipeline; `texture` selects
/// the resource set bound at draw time.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RenderState {
    pub blend: BlendMode,
    pub use_scissor_rect: bool,
    pub scissor_rect: ScissorRect,
    pub texture: TextureId,
    /// Per-draw sampler override. Not supported; the slot's sampler always applies.
    pub sampler: Option<SamplerFilter>,
}

impl RenderState {
    pub fn new(texture: TextureId) -> Self {
        Self {
            blend: BlendMode::AlphaBlend,
            use_scissor_rect: false,
            scissor_rect: ScissorRect::default(),
            texture,
            sampler: None,
        }
    }

    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }

    pub fn with_scissor(mut self, rect: ScissorRect) -> Self {
        self.use_scissor_rect = true;
        self.scissor_rect = rect;
        self
    }
}

/// Renderer capability surface consumed by a sprite batching layer.
///
/// A frame is `begin_render`, any number of `draw_batch`, then `end_render`.
pub trait BatchRenderer {
    /// Device texture type accepted by [`BatchRenderer::register_texture`].
    type Texture;

    /// Loads an image file into a texture and registers it.
    ///
    /// Without `name`, the file stem is used (`"ui/button.png"` → `"button"`).
    fn register_file(&mut self, path: &Path, name: Option<&str>) -> Result<String>;

    /// Registers an existing texture under `name`, taking ownership of it.
    fn register_texture(&mut self, texture: Self::Texture, name: &str) -> Result<String>;

    /// Releases a texture. Unknown names are ignored.
    fn release(&mut self, name: &str);

    fn get_texture(&self, name: &str) -> Result<TextureId>;
    fn get_texture_size(&self, id: TextureId) -> Result<(u32, u32)>;

    /// Text measurement. Every implementation here returns `NotImplemented`.
    fn get_text_size(&self, text: &str, font_size: f32) -> Result<(f32, f32)>;

    /// Render target bounds, at the origin.
    fn get_viewport(&self) -> Result<Rect>;

    fn begin_render(
        &mut self,
        vertices: &[SpriteVertex],
        indices: &[u16],
        vertex_count: usize,
        index_count: usize,
    ) -> Result<()>;

    fn draw_batch(
        &mut self,
        state: &RenderState,
        start_index: u32,
        index_count: u32,
        user_data: Option<&dyn Any>,
    ) -> Result<()>;

    fn end_render(&mut self) -> Result<()>;
}
