//! Marduk sprite crate.
//!
//! A sprite-batching renderer backend: a texture slot table, a pipeline cache
//! keyed by render state, and the shader pipeline that draws colored/textured
//! triangles under an orthographic projection. GPU access goes through the
//! `device::GraphicsDevice` seam; `device::WgpuDevice` is the wgpu backend.

pub mod config;
pub mod coords;
pub mod device;
pub mod error;
pub mod logging;
pub mod render;

pub use config::RendererConfig;
pub use error::{RenderError, Result};
pub use render::{BatchRenderer, RenderState, SpriteRenderer, SpriteVertex, TextureId};
