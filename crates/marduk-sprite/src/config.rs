use crate::coords::ColorRgba;
use crate::device::SamplerFilter;

/// Construction parameters for [`crate::SpriteRenderer`].
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Number of texture slots allocated up front. The table doubles when full.
    pub initial_texture_capacity: usize,

    /// Vertex buffer capacity, in vertices. Grows on demand.
    pub initial_vertex_capacity: usize,

    /// Index buffer capacity, in `u16` indices. Grows on demand.
    pub initial_index_capacity: usize,

    /// Filter of the sampler paired with every registered texture.
    pub sampler_filter: SamplerFilter,

    /// Color the target is cleared to at the start of each frame.
    pub clear_color: ColorRgba,

    /// Shader set name; assets are looked up as `"<set>-<stage>.<ext>"`.
    pub shader_set: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            initial_texture_capacity: 64,
            initial_vertex_capacity: 4096,
            initial_index_capacity: 6144,
            sampler_filter: SamplerFilter::Linear,
            clear_color: ColorRgba::black(),
            shader_set: "sprite".to_string(),
        }
    }
}
