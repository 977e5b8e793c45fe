//! Recording stand-in for a GPU device, used by the renderer's tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::coords::{ColorRgba, ScissorRect};
use crate::error::{RenderError, Result};
use crate::render::BlendMode;

use super::api::{BindableResource, CommandRecorder, GraphicsDevice, PipelineDesc};
use super::types::{
    BufferDesc, IndexFormat, LayoutElement, RasterizerState, SamplerFilter, ShaderDesc,
    ShaderFormat, ShaderStage, TextureDesc,
};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub(crate) enum MockFormat {
    Bgra8,
    Rgba16Float,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum MockOp {
    Begin,
    SetFramebuffer,
    Clear(ColorRgba),
    SetVertexBuffer(u64),
    SetIndexBuffer(u64),
    SetPipeline(u64),
    SetResourceSet(u32, u64),
    SetScissor(ScissorRect),
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    },
    End,
}

/// Shared record of everything the mock device did.
#[derive(Default)]
pub(crate) struct Journal {
    next_id: u64,
    created: HashMap<&'static str, usize>,
    /// `"<kind>#<id>"` in drop order.
    pub dropped: Vec<String>,
    /// Buffer contents by buffer id.
    pub buffers: HashMap<u64, Vec<u8>>,
    /// One entry per `submit`.
    pub submitted: Vec<Vec<MockOp>>,
}

impl Journal {
    pub fn created(&self, kind: &str) -> usize {
        self.created.get(kind).copied().unwrap_or(0)
    }

    pub fn dropped_kinds(&self) -> Vec<&str> {
        self.dropped
            .iter()
            .map(|d| d.split('#').next().unwrap_or(d.as_str()))
            .collect()
    }
}

pub(crate) type SharedJournal = Rc<RefCell<Journal>>;

#[derive(Debug)]
pub(crate) struct Handle {
    kind: &'static str,
    pub id: u64,
    journal: SharedJournal,
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("created", &self.created)
            .field("dropped", &self.dropped)
            .finish()
    }
}

impl Handle {
    fn new(kind: &'static str, journal: &SharedJournal) -> Self {
        let id = {
            let mut j = journal.borrow_mut();
            j.next_id += 1;
            *j.created.entry(kind).or_default() += 1;
            j.next_id
        };
        Self {
            kind,
            id,
            journal: journal.clone(),
        }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.journal
            .borrow_mut()
            .dropped
            .push(format!("{}#{}", self.kind, self.id));
    }
}

#[derive(Debug)]
pub(crate) struct MockBuffer {
    pub handle: Handle,
    pub size: u64,
}

#[derive(Debug)]
pub(crate) struct MockTexture {
    pub handle: Handle,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug)]
pub(crate) struct MockShader {
    pub handle: Handle,
    pub stage: ShaderStage,
    pub entry_point: String,
}

#[derive(Debug)]
pub(crate) struct MockPipeline {
    pub handle: Handle,
    pub blend: BlendMode,
    pub rasterizer: RasterizerState,
    pub output: MockFormat,
}

/// Resource set with the handle ids it binds, in binding order.
#[derive(Debug)]
pub(crate) struct MockResourceSet {
    pub handle: Handle,
    pub bound: Vec<u64>,
}

pub(crate) struct MockCommandList {
    _handle: Handle,
    open: bool,
    ops: Vec<MockOp>,
}

pub(crate) struct MockDevice {
    journal: SharedJournal,
    target: (u32, u32),
    format: MockFormat,
    shader_format: ShaderFormat,
    linear: Handle,
    point: Handle,
    _device: Handle,
}

impl MockDevice {
    pub fn new(width: u32, height: u32) -> (Self, SharedJournal) {
        let journal = SharedJournal::default();
        let device = Self {
            _device: Handle::new("device", &journal),
            linear: Handle::new("sampler", &journal),
            point: Handle::new("sampler", &journal),
            journal: journal.clone(),
            target: (width, height),
            format: MockFormat::Bgra8,
            shader_format: ShaderFormat::Wgsl,
        };
        (device, journal)
    }

    pub fn set_target_size(&mut self, width: u32, height: u32) {
        self.target = (width, height);
    }

    pub fn set_output_format(&mut self, format: MockFormat) {
        self.format = format;
    }

    pub fn set_shader_format(&mut self, format: ShaderFormat) {
        self.shader_format = format;
    }

    pub fn linear_sampler_id(&self) -> u64 {
        self.linear.id
    }

    pub fn point_sampler_id(&self) -> u64 {
        self.point.id
    }
}

impl GraphicsDevice for MockDevice {
    type Buffer = MockBuffer;
    type Texture = MockTexture;
    type TextureView = Handle;
    type Sampler = Handle;
    type ResourceLayout = Handle;
    type ResourceSet = MockResourceSet;
    type Shader = MockShader;
    type Pipeline = MockPipeline;
    type CommandList = MockCommandList;
    type OutputFormat = MockFormat;

    fn shader_format(&self) -> ShaderFormat {
        self.shader_format
    }

    fn output_format(&self) -> MockFormat {
        self.format
    }

    fn target_size(&self) -> (u32, u32) {
        self.target
    }

    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<MockBuffer> {
        let handle = Handle::new("buffer", &self.journal);
        self.journal
            .borrow_mut()
            .buffers
            .insert(handle.id, vec![0; desc.size as usize]);
        Ok(MockBuffer {
            handle,
            size: desc.size,
        })
    }

    fn update_buffer(&mut self, buffer: &MockBuffer, offset: u64, data: &[u8]) {
        let end = offset + data.len() as u64;
        assert!(end <= buffer.size, "write of {end} bytes past buffer of {}", buffer.size);
        let mut journal = self.journal.borrow_mut();
        let contents = journal.buffers.entry(buffer.handle.id).or_default();
        contents[offset as usize..end as usize].copy_from_slice(data);
    }

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<MockTexture> {
        if desc.rgba.len() != desc.width as usize * desc.height as usize * 4 {
            return Err(RenderError::InvalidArgument(format!("texture {}: bad data", desc.label)));
        }
        Ok(MockTexture {
            handle: Handle::new("texture", &self.journal),
            width: desc.width,
            height: desc.height,
        })
    }

    fn texture_size(&self, texture: &MockTexture) -> (u32, u32) {
        (texture.width, texture.height)
    }

    fn create_texture_view(&mut self, _texture: &MockTexture) -> Result<Handle> {
        Ok(Handle::new("view", &self.journal))
    }

    fn sampler(&self, filter: SamplerFilter) -> &Handle {
        match filter {
            SamplerFilter::Linear => &self.linear,
            SamplerFilter::Point => &self.point,
        }
    }

    fn create_resource_layout(&mut self, _label: &str, _elements: &[LayoutElement]) -> Result<Handle> {
        Ok(Handle::new("layout", &self.journal))
    }

    fn create_resource_set(
        &self,
        _label: &str,
        _layout: &Handle,
        resources: &[BindableResource<'_, Self>],
    ) -> Result<MockResourceSet> {
        let bound = resources
            .iter()
            .map(|r| match *r {
                BindableResource::Buffer(b) => b.handle.id,
                BindableResource::TextureView(v) => v.id,
                BindableResource::Sampler(s) => s.id,
            })
            .collect();
        Ok(MockResourceSet {
            handle: Handle::new("set", &self.journal),
            bound,
        })
    }

    fn create_shader(&mut self, desc: &ShaderDesc<'_>) -> Result<MockShader> {
        Ok(MockShader {
            handle: Handle::new("shader", &self.journal),
            stage: desc.stage,
            entry_point: desc.entry_point.to_string(),
        })
    }

    fn create_pipeline(&mut self, desc: &PipelineDesc<'_, Self>) -> Result<MockPipeline> {
        Ok(MockPipeline {
            handle: Handle::new("pipeline", &self.journal),
            blend: desc.blend,
            rasterizer: desc.rasterizer,
            output: desc.output,
        })
    }

    fn create_command_list(&mut self) -> Result<MockCommandList> {
        Ok(MockCommandList {
            _handle: Handle::new("commands", &self.journal),
            open: false,
            ops: Vec::new(),
        })
    }

    fn submit(&mut self, list: &mut MockCommandList) {
        assert!(!list.open, "submitted an open command list");
        let ops = std::mem::take(&mut list.ops);
        self.journal.borrow_mut().submitted.push(ops);
    }
}

impl CommandRecorder<MockDevice> for MockCommandList {
    fn begin(&mut self) {
        assert!(!self.open, "begin on an open command list");
        self.open = true;
        self.ops.push(MockOp::Begin);
    }

    fn set_framebuffer(&mut self) {
        self.ops.push(MockOp::SetFramebuffer);
    }

    fn clear_color_target(&mut self, _index: u32, color: ColorRgba) {
        self.ops.push(MockOp::Clear(color));
    }

    fn set_vertex_buffer(&mut self, _slot: u32, buffer: &MockBuffer) {
        self.ops.push(MockOp::SetVertexBuffer(buffer.handle.id));
    }

    fn set_index_buffer(&mut self, buffer: &MockBuffer, _format: IndexFormat) {
        self.ops.push(MockOp::SetIndexBuffer(buffer.handle.id));
    }

    fn set_pipeline(&mut self, pipeline: &MockPipeline) {
        self.ops.push(MockOp::SetPipeline(pipeline.handle.id));
    }

    fn set_resource_set(&mut self, slot: u32, set: &MockResourceSet) {
        self.ops.push(MockOp::SetResourceSet(slot, set.handle.id));
    }

    fn set_scissor_rect(&mut self, _index: u32, rect: ScissorRect) {
        self.ops.push(MockOp::SetScissor(rect));
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        assert!(self.open, "draw outside a recording scope");
        self.ops.push(MockOp::DrawIndexed {
            index_count,
            instance_count,
            first_index,
            vertex_offset,
            first_instance,
        });
    }

    fn end(&mut self) {
        assert!(self.open, "end without begin");
        self.open = false;
        self.ops.push(MockOp::End);
    }
}
