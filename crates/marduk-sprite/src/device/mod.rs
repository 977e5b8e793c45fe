//! GPU device seam and its wgpu backend.
//!
//! - `GraphicsDevice` / `CommandRecorder`: what the renderer needs from a GPU
//! - `WgpuDevice`: wgpu instance/adapter/device/queue + window surface
//! - `GpuInit`: surface and device creation parameters

mod api;
mod init;
mod surface;
mod types;
mod wgpu_device;

#[cfg(test)]
pub(crate) mod mock;

pub use api::{BindableResource, CommandRecorder, GraphicsDevice, PipelineDesc};
pub use init::GpuInit;
pub use surface::SurfaceErrorAction;
pub use types::{
    BufferDesc, BufferUsage, CullMode, FillMode, FrontFace, IndexFormat, LayoutElement,
    RasterizerState, ResourceKind, SamplerFilter, ShaderDesc, ShaderFormat, ShaderStage,
    TextureDesc, VertexElement, VertexFormat, VertexLayout, Visibility,
};
pub use wgpu_device::{WgpuCommandList, WgpuDevice, WgpuPipeline, WgpuShader};
