//! Backend-neutral descriptors passed across the `GraphicsDevice` seam.

use crate::render::BlendMode;

// ── samplers ──────────────────────────────────────────────────────────────

/// Filtering of a device-provided default sampler.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum SamplerFilter {
    #[default]
    Linear,
    Point,
}

// ── shaders ───────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub const fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }

    pub const fn entry_point(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vs_main",
            ShaderStage::Fragment => "fs_main",
        }
    }
}

/// Shader representation a device consumes.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderFormat {
    Wgsl,
    SpirV,
    Glsl,
    HlslBytecode,
    MetalLib,
}

impl ShaderFormat {
    /// File extension of embedded assets in this format.
    pub const fn extension(self) -> &'static str {
        match self {
            ShaderFormat::Wgsl => "wgsl",
            ShaderFormat::SpirV => "spv",
            ShaderFormat::Glsl => "glsl",
            ShaderFormat::HlslBytecode => "hlsl.bytes",
            ShaderFormat::MetalLib => "metallib",
        }
    }
}

#[derive(Debug, Copy, Clone)]
pub struct ShaderDesc<'a> {
    pub label: &'a str,
    pub stage: ShaderStage,
    pub format: ShaderFormat,
    pub source: &'a [u8],
    pub entry_point: &'a str,
}

// ── buffers ───────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BufferUsage {
    Vertex,
    Index,
    Uniform,
}

#[derive(Debug, Copy, Clone)]
pub struct BufferDesc<'a> {
    pub label: &'a str,
    /// Size in bytes.
    pub size: u64,
    pub usage: BufferUsage,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum IndexFormat {
    Uint16,
    Uint32,
}

// ── textures ──────────────────────────────────────────────────────────────

/// RGBA8 texture contents, tightly packed rows.
#[derive(Debug, Copy, Clone)]
pub struct TextureDesc<'a> {
    pub label: &'a str,
    pub width: u32,
    pub height: u32,
    pub rgba: &'a [u8],
}

// ── resource layouts ──────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ResourceKind {
    UniformBuffer,
    TextureReadOnly,
    Sampler,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Visibility {
    Vertex,
    Fragment,
}

/// One binding of a resource layout; its binding index is its position.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct LayoutElement {
    pub name: &'static str,
    pub kind: ResourceKind,
    pub visibility: Visibility,
}

impl LayoutElement {
    pub const fn new(name: &'static str, kind: ResourceKind, visibility: Visibility) -> Self {
        Self { name, kind, visibility }
    }
}

// ── vertex layout ─────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum VertexFormat {
    Float32x2,
    Float32x3,
    Unorm8x4,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct VertexElement {
    pub location: u32,
    pub format: VertexFormat,
    pub offset: u64,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct VertexLayout {
    pub stride: u64,
    pub elements: &'static [VertexElement],
}

// ── rasterizer ────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CullMode {
    None,
    Front,
    Back,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FillMode {
    Solid,
    Wireframe,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrontFace {
    Clockwise,
    CounterClockwise,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RasterizerState {
    pub cull_mode: CullMode,
    pub fill_mode: FillMode,
    pub front_face: FrontFace,
    pub depth_clip: bool,
    pub scissor_test: bool,
}

impl RasterizerState {
    /// Sprite rasterization: no culling, solid fill, clockwise front face, depth clip on.
    pub const fn sprites(scissor_test: bool) -> Self {
        Self {
            cull_mode: CullMode::None,
            fill_mode: FillMode::Solid,
            front_face: FrontFace::Clockwise,
            depth_clip: true,
            scissor_test,
        }
    }
}
