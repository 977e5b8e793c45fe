use std::fmt::Debug;
use std::hash::Hash;

use crate::coords::{ColorRgba, ScissorRect};
use crate::error::Result;
use crate::render::BlendMode;

use super::types::{
    BufferDesc, IndexFormat, LayoutElement, RasterizerState, SamplerFilter, ShaderDesc,
    ShaderFormat, TextureDesc, VertexLayout,
};

/// GPU abstraction the sprite renderer is written against.
///
/// Every handle is an owned value: dropping it releases the GPU object. The
/// renderer decides teardown order by deciding drop order.
pub trait GraphicsDevice {
    type Buffer;
    type Texture;
    type TextureView;
    type Sampler;
    type ResourceLayout;
    type ResourceSet;
    type Shader;
    type Pipeline;
    type CommandList: CommandRecorder<Self>;

    /// Color format of the current render target. Part of the pipeline cache key.
    type OutputFormat: Copy + Eq + Hash + Debug;

    fn shader_format(&self) -> ShaderFormat;
    fn output_format(&self) -> Self::OutputFormat;

    /// Current render target size in physical pixels.
    fn target_size(&self) -> (u32, u32);

    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<Self::Buffer>;

    /// Writes `data` at `offset`. `offset + data.len()` must not exceed the buffer size.
    fn update_buffer(&mut self, buffer: &Self::Buffer, offset: u64, data: &[u8]);

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<Self::Texture>;
    fn texture_size(&self, texture: &Self::Texture) -> (u32, u32);
    fn create_texture_view(&mut self, texture: &Self::Texture) -> Result<Self::TextureView>;

    /// Device-owned default sampler with the given filtering.
    fn sampler(&self, filter: SamplerFilter) -> &Self::Sampler;

    fn create_resource_layout(
        &mut self,
        label: &str,
        elements: &[LayoutElement],
    ) -> Result<Self::ResourceLayout>;

    /// Binds `resources` to `layout`, positionally.
    fn create_resource_set(
        &self,
        label: &str,
        layout: &Self::ResourceLayout,
        resources: &[BindableResource<'_, Self>],
    ) -> Result<Self::ResourceSet>;

    fn create_shader(&mut self, desc: &ShaderDesc<'_>) -> Result<Self::Shader>;
    fn create_pipeline(&mut self, desc: &PipelineDesc<'_, Self>) -> Result<Self::Pipeline>;
    fn create_command_list(&mut self) -> Result<Self::CommandList>;

    /// Submits a closed command list for execution. Failures are handled by
    /// the backend; nothing is reported back.
    fn submit(&mut self, list: &mut Self::CommandList);
}

/// Command recording bracket (`begin` .. `end`) of a [`GraphicsDevice`].
pub trait CommandRecorder<D: GraphicsDevice + ?Sized> {
    fn begin(&mut self);

    /// Targets the device's main framebuffer.
    fn set_framebuffer(&mut self);
    fn clear_color_target(&mut self, index: u32, color: ColorRgba);
    fn set_vertex_buffer(&mut self, slot: u32, buffer: &D::Buffer);
    fn set_index_buffer(&mut self, buffer: &D::Buffer, format: IndexFormat);
    fn set_pipeline(&mut self, pipeline: &D::Pipeline);
    fn set_resource_set(&mut self, slot: u32, set: &D::ResourceSet);
    fn set_scissor_rect(&mut self, index: u32, rect: ScissorRect);
    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    );
    fn end(&mut self);
}

/// A resource bound into a resource set.
pub enum BindableResource<'a, D: GraphicsDevice + ?Sized> {
    Buffer(&'a D::Buffer),
    TextureView(&'a D::TextureView),
    Sampler(&'a D::Sampler),
}

/// Everything needed to build one graphics pipeline.
pub struct PipelineDesc<'a, D: GraphicsDevice + ?Sized> {
    pub label: &'a str,
    pub blend: BlendMode,
    pub rasterizer: RasterizerState,
    pub vertex_shader: &'a D::Shader,
    pub fragment_shader: &'a D::Shader,
    pub resource_layouts: &'a [&'a D::ResourceLayout],
    pub vertex_layout: VertexLayout,
    pub output: D::OutputFormat,
}
