//! Sprite rendering.
//!
//! `SpriteRenderer` implements the `BatchRenderer` surface driven by a batching
//! layer. It owns every GPU object it creates:
//! - texture slots (`slots`), addressed by `TextureId` and by name
//! - pipelines (`pipeline`), created lazily per `PipelineKey`
//! - the projection uniform (`projection`)
//! - the fixed shader pair (`shaders`)
//!
//! CPU geometry is in target pixels (top-left origin, +Y down).

mod batch;
mod pipeline;
mod projection;
mod renderer;
mod shaders;
mod slots;
mod vertex;

pub use batch::{BatchRenderer, BlendMode, RenderState, TextureId};
pub use pipeline::{PipelineCache, PipelineKey};
pub use projection::{orthographic_projection, ProjectionUniform};
pub use renderer::SpriteRenderer;
pub use shaders::{asset_name, load_shader, ShaderAsset, EMBEDDED_SHADERS};
pub use slots::SlotTable;
pub use vertex::SpriteVertex;
