use std::ops::Range;
use std::sync::Arc;

use anyhow::Context;
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::coords::{ColorRgba, ScissorRect};
use crate::error::{RenderError, Result};
use crate::render::BlendMode;

use super::api::{BindableResource, CommandRecorder, GraphicsDevice, PipelineDesc};
use super::init::GpuInit;
use super::surface;
use super::types::{
    BufferDesc, BufferUsage, CullMode, FillMode, FrontFace, IndexFormat, LayoutElement,
    ResourceKind, SamplerFilter, ShaderDesc, ShaderFormat, ShaderStage, TextureDesc,
    VertexFormat, Visibility,
};

/// wgpu implementation of [`GraphicsDevice`], bound to one window surface.
///
/// Owns the adapter/device/queue, the surface configuration and the two
/// default samplers handed out by [`GraphicsDevice::sampler`].
pub struct WgpuDevice {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,

    /// Current drawable size in physical pixels (may be 0×0 while minimized).
    size: PhysicalSize<u32>,

    linear_sampler: wgpu::Sampler,
    point_sampler: wgpu::Sampler,
}

/// A shader module plus the entry point it was loaded for.
pub struct WgpuShader {
    module: wgpu::ShaderModule,
    entry_point: String,
    stage: ShaderStage,
}

impl WgpuShader {
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }
}

/// Render pipeline plus the scissor-test flag it was built with.
///
/// wgpu scissoring is dynamic state; the flag decides at replay time whether
/// the recorded scissor rect or the full target applies.
#[derive(Clone)]
pub struct WgpuPipeline {
    pipeline: wgpu::RenderPipeline,
    scissor_test: bool,
}

enum Op {
    Clear(wgpu::Color),
    SetVertexBuffer(u32, wgpu::Buffer),
    SetIndexBuffer(wgpu::Buffer, wgpu::IndexFormat),
    SetPipeline(WgpuPipeline),
    SetBindGroup(u32, wgpu::BindGroup),
    SetScissor(ScissorRect),
    DrawIndexed {
        indices: Range<u32>,
        base_vertex: i32,
        instances: Range<u32>,
    },
}

/// Deferred command list.
///
/// wgpu render passes borrow their encoder, so commands are recorded here and
/// replayed into a single render pass by [`WgpuDevice::submit`].
#[derive(Default)]
pub struct WgpuCommandList {
    ops: Vec<Op>,
    recording: bool,
}

impl WgpuDevice {
    /// Creates a device bound to `window`.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new(window: Arc<Window>, init: GpuInit) -> anyhow::Result<Self> {
        let size = window.inner_size();
        anyhow::ensure!(size.width > 0 && size.height > 0, "window has zero size");

        let GpuInit {
            prefer_srgb,
            present_mode,
            alpha_mode,
            required_features,
            required_limits,
            desired_maximum_frame_latency,
        } = init;

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("marduk-sprite device"),
                required_features,
                required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let caps = surface.get_capabilities(&adapter);
        let format = surface::choose_surface_format(&caps.formats, prefer_srgb)
            .context("no supported surface formats")?;
        let alpha_mode = surface::choose_alpha_mode(&caps.alpha_modes, alpha_mode);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency,
        };
        surface.configure(&device, &config);

        log::info!(
            "wgpu device ready: {:?} on {}, surface {:?}",
            adapter.get_info().backend,
            adapter.get_info().name,
            format
        );

        let linear_sampler = default_sampler(&device, wgpu::FilterMode::Linear, "marduk linear sampler");
        let point_sampler = default_sampler(&device, wgpu::FilterMode::Nearest, "marduk point sampler");

        Ok(Self {
            window,
            surface,
            adapter,
            device,
            queue,
            config,
            size,
            linear_sampler,
            point_sampler,
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Current drawable size (physical pixels).
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    /// Reconfigures the surface after a resize.
    ///
    /// The projection is not touched; callers follow up with
    /// `SpriteRenderer::update_wvp`.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        surface::apply_resize(
            &self.surface,
            &self.device,
            &mut self.config,
            &mut self.size,
            new_size,
        );
    }
}

fn default_sampler(device: &wgpu::Device, filter: wgpu::FilterMode, label: &str) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: filter,
        min_filter: filter,
        ..Default::default()
    })
}

fn blend_state(mode: BlendMode) -> wgpu::BlendState {
    match mode {
        BlendMode::AlphaBlend => wgpu::BlendState::ALPHA_BLENDING,
        BlendMode::Override => wgpu::BlendState::REPLACE,
    }
}

fn vertex_format(format: VertexFormat) -> wgpu::VertexFormat {
    match format {
        VertexFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
        VertexFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
        VertexFormat::Unorm8x4 => wgpu::VertexFormat::Unorm8x4,
    }
}

fn index_format(format: IndexFormat) -> wgpu::IndexFormat {
    match format {
        IndexFormat::Uint16 => wgpu::IndexFormat::Uint16,
        IndexFormat::Uint32 => wgpu::IndexFormat::Uint32,
    }
}

fn layout_entry(binding: u32, element: &LayoutElement) -> wgpu::BindGroupLayoutEntry {
    let visibility = match element.visibility {
        Visibility::Vertex => wgpu::ShaderStages::VERTEX,
        Visibility::Fragment => wgpu::ShaderStages::FRAGMENT,
    };
    let ty = match element.kind {
        ResourceKind::UniformBuffer => wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        ResourceKind::TextureReadOnly => wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        ResourceKind::Sampler => wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
    };

    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty,
        count: None,
    }
}

impl GraphicsDevice for WgpuDevice {
    type Buffer = wgpu::Buffer;
    type Texture = wgpu::Texture;
    type TextureView = wgpu::TextureView;
    type Sampler = wgpu::Sampler;
    type ResourceLayout = wgpu::BindGroupLayout;
    type ResourceSet = wgpu::BindGroup;
    type Shader = WgpuShader;
    type Pipeline = WgpuPipeline;
    type CommandList = WgpuCommandList;
    type OutputFormat = wgpu::TextureFormat;

    fn shader_format(&self) -> ShaderFormat {
        // naga translates WGSL for every backend.
        ShaderFormat::Wgsl
    }

    fn output_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    fn target_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<wgpu::Buffer> {
        let usage = match desc.usage {
            BufferUsage::Vertex => wgpu::BufferUsages::VERTEX,
            BufferUsage::Index => wgpu::BufferUsages::INDEX,
            BufferUsage::Uniform => wgpu::BufferUsages::UNIFORM,
        };

        Ok(self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(desc.label),
            size: desc.size.max(1).next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT),
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }))
    }

    fn update_buffer(&mut self, buffer: &wgpu::Buffer, offset: u64, data: &[u8]) {
        // Queue writes must be a multiple of COPY_BUFFER_ALIGNMENT; odd u16 index
        // counts are padded. Buffer sizes are rounded up the same way.
        let align = wgpu::COPY_BUFFER_ALIGNMENT as usize;
        if data.len() % align == 0 {
            self.queue.write_buffer(buffer, offset, data);
        } else {
            let mut padded = data.to_vec();
            padded.resize(data.len().next_multiple_of(align), 0);
            self.queue.write_buffer(buffer, offset, &padded);
        }
    }

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<wgpu::Texture> {
        let max = self.device.limits().max_texture_dimension_2d;
        if desc.width == 0 || desc.height == 0 || desc.width > max || desc.height > max {
            return Err(RenderError::InvalidArgument(format!(
                "texture {}: unsupported size {}x{}",
                desc.label, desc.width, desc.height
            )));
        }
        let expected = desc.width as usize * desc.height as usize * 4;
        if desc.rgba.len() != expected {
            return Err(RenderError::InvalidArgument(format!(
                "texture {}: expected {expected} bytes of RGBA8, got {}",
                desc.label,
                desc.rgba.len()
            )));
        }

        Ok(self.device.create_texture_with_data(
            &self.queue,
            &wgpu::TextureDescriptor {
                label: Some(desc.label),
                size: wgpu::Extent3d {
                    width: desc.width,
                    height: desc.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            desc.rgba,
        ))
    }

    fn texture_size(&self, texture: &wgpu::Texture) -> (u32, u32) {
        (texture.width(), texture.height())
    }

    fn create_texture_view(&mut self, texture: &wgpu::Texture) -> Result<wgpu::TextureView> {
        Ok(texture.create_view(&wgpu::TextureViewDescriptor::default()))
    }

    fn sampler(&self, filter: SamplerFilter) -> &wgpu::Sampler {
        match filter {
            SamplerFilter::Linear => &self.linear_sampler,
            SamplerFilter::Point => &self.point_sampler,
        }
    }

    fn create_resource_layout(
        &mut self,
        label: &str,
        elements: &[LayoutElement],
    ) -> Result<wgpu::BindGroupLayout> {
        let entries: Vec<_> = (0u32..)
            .zip(elements)
            .map(|(binding, element)| layout_entry(binding, element))
            .collect();

        Ok(self
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries: &entries,
            }))
    }

    fn create_resource_set(
        &self,
        label: &str,
        layout: &wgpu::BindGroupLayout,
        resources: &[BindableResource<'_, Self>],
    ) -> Result<wgpu::BindGroup> {
        let entries: Vec<_> = (0u32..)
            .zip(resources)
            .map(|(binding, resource)| wgpu::BindGroupEntry {
                binding,
                resource: match *resource {
                    BindableResource::Buffer(buffer) => buffer.as_entire_binding(),
                    BindableResource::TextureView(view) => wgpu::BindingResource::TextureView(view),
                    BindableResource::Sampler(sampler) => wgpu::BindingResource::Sampler(sampler),
                },
            })
            .collect();

        Ok(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &entries,
        }))
    }

    fn create_shader(&mut self, desc: &ShaderDesc<'_>) -> Result<WgpuShader> {
        if desc.format != ShaderFormat::Wgsl {
            return Err(RenderError::InvalidArgument(format!(
                "shader {}: wgpu backend consumes WGSL, got {:?}",
                desc.label, desc.format
            )));
        }
        let source = std::str::from_utf8(desc.source).map_err(|err| {
            RenderError::InvalidArgument(format!("shader {}: source is not UTF-8: {err}", desc.label))
        })?;

        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(desc.label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        Ok(WgpuShader {
            module,
            entry_point: desc.entry_point.to_string(),
            stage: desc.stage,
        })
    }

    fn create_pipeline(&mut self, desc: &PipelineDesc<'_, Self>) -> Result<WgpuPipeline> {
        let layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(desc.label),
                bind_group_layouts: desc.resource_layouts,
                immediate_size: 0,
            });

        let attributes: Vec<_> = desc
            .vertex_layout
            .elements
            .iter()
            .map(|e| wgpu::VertexAttribute {
                format: vertex_format(e.format),
                offset: e.offset,
                shader_location: e.location,
            })
            .collect();
        let buffers = [wgpu::VertexBufferLayout {
            array_stride: desc.vertex_layout.stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &attributes,
        }];

        let r = desc.rasterizer;
        let primitive = wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: match r.front_face {
                FrontFace::Clockwise => wgpu::FrontFace::Cw,
                FrontFace::CounterClockwise => wgpu::FrontFace::Ccw,
            },
            cull_mode: match r.cull_mode {
                CullMode::None => None,
                CullMode::Front => Some(wgpu::Face::Front),
                CullMode::Back => Some(wgpu::Face::Back),
            },
            // Line mode requires Features::POLYGON_MODE_LINE.
            polygon_mode: match r.fill_mode {
                FillMode::Solid => wgpu::PolygonMode::Fill,
                FillMode::Wireframe => wgpu::PolygonMode::Line,
            },
            unclipped_depth: !r.depth_clip,
            conservative: false,
        };

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(desc.label),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &desc.vertex_shader.module,
                    entry_point: Some(desc.vertex_shader.entry_point.as_str()),
                    compilation_options: Default::default(),
                    buffers: &buffers,
                },
                fragment: Some(wgpu::FragmentState {
                    module: &desc.fragment_shader.module,
                    entry_point: Some(desc.fragment_shader.entry_point.as_str()),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: desc.output,
                        blend: Some(blend_state(desc.blend)),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive,
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            });

        Ok(WgpuPipeline {
            pipeline,
            scissor_test: r.scissor_test,
        })
    }

    fn create_command_list(&mut self) -> Result<WgpuCommandList> {
        Ok(WgpuCommandList::default())
    }

    fn submit(&mut self, list: &mut WgpuCommandList) {
        if list.recording {
            log::warn!("submitting a command list that is still recording");
            list.recording = false;
        }
        let ops = std::mem::take(&mut list.ops);
        if ops.is_empty() {
            return;
        }

        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(err) => {
                let reason = format!("{err:?}");
                let action = surface::map_surface_error(
                    &self.surface,
                    &self.device,
                    &self.config,
                    self.size,
                    err,
                );
                log::warn!("dropping frame: surface error {reason} ({action:?})");
                return;
            }
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("marduk sprite encoder"),
            });

        // Clears happen at pass start; wgpu has no mid-pass clear.
        let clear = ops.iter().find_map(|op| match op {
            Op::Clear(color) => Some(*color),
            _ => None,
        });

        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("marduk sprite pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: clear.map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            replay(&mut rpass, &ops, (self.config.width, self.config.height));
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
    }
}

fn replay(rpass: &mut wgpu::RenderPass<'_>, ops: &[Op], (width, height): (u32, u32)) {
    let mut scissor = ScissorTracker::new(width, height);
    let mut skip_draws = false;

    for op in ops {
        match op {
            Op::Clear(_) => {}
            Op::SetVertexBuffer(slot, buffer) => rpass.set_vertex_buffer(*slot, buffer.slice(..)),
            Op::SetIndexBuffer(buffer, format) => rpass.set_index_buffer(buffer.slice(..), *format),
            Op::SetPipeline(p) => {
                rpass.set_pipeline(&p.pipeline);
                apply_scissor(rpass, scissor.bind_pipeline(p.scissor_test), &mut skip_draws);
            }
            Op::SetBindGroup(index, group) => rpass.set_bind_group(*index, group, &[]),
            Op::SetScissor(rect) => {
                apply_scissor(rpass, scissor.set_rect(*rect), &mut skip_draws);
            }
            Op::DrawIndexed {
                indices,
                base_vertex,
                instances,
            } => {
                if !skip_draws {
                    rpass.draw_indexed(indices.clone(), *base_vertex, instances.clone());
                }
            }
        }
    }
}

fn apply_scissor(rpass: &mut wgpu::RenderPass<'_>, update: ScissorUpdate, skip_draws: &mut bool) {
    match update {
        ScissorUpdate::Set(r) => {
            rpass.set_scissor_rect(r.x, r.y, r.width, r.height);
            *skip_draws = false;
        }
        ScissorUpdate::Skip => *skip_draws = true,
        ScissorUpdate::Keep => {}
    }
}

/// Effect of a pipeline or scissor change on the pass's dynamic scissor.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum ScissorUpdate {
    /// Set this (already clamped) rect; draws proceed.
    Set(ScissorRect),
    /// Nothing of the target remains; suppress draws.
    Skip,
    /// No change.
    Keep,
}

/// Dynamic scissor state during replay.
///
/// Pipelines without scissor test see the full target. The last recorded rect
/// is remembered and applies once a scissor-testing pipeline is bound.
#[derive(Debug)]
struct ScissorTracker {
    width: u32,
    height: u32,
    rect: ScissorRect,
    scissor_test: bool,
}

impl ScissorTracker {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            rect: ScissorRect::full(width, height),
            scissor_test: false,
        }
    }

    fn bind_pipeline(&mut self, scissor_test: bool) -> ScissorUpdate {
        self.scissor_test = scissor_test;
        self.effective()
    }

    fn set_rect(&mut self, rect: ScissorRect) -> ScissorUpdate {
        self.rect = rect;
        if self.scissor_test { self.effective() } else { ScissorUpdate::Keep }
    }

    fn effective(&self) -> ScissorUpdate {
        let rect = if self.scissor_test {
            self.rect
        } else {
            ScissorRect::full(self.width, self.height)
        };
        match rect.clamped(self.width, self.height) {
            Some(r) => ScissorUpdate::Set(r),
            None => ScissorUpdate::Skip,
        }
    }
}

impl CommandRecorder<WgpuDevice> for WgpuCommandList {
    fn begin(&mut self) {
        self.ops.clear();
        self.recording = true;
    }

    fn set_framebuffer(&mut self) {
        // Single target: the window surface acquired at submit.
    }

    fn clear_color_target(&mut self, _index: u32, color: ColorRgba) {
        self.ops.push(Op::Clear(color.into()));
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: &wgpu::Buffer) {
        self.ops.push(Op::SetVertexBuffer(slot, buffer.clone()));
    }

    fn set_index_buffer(&mut self, buffer: &wgpu::Buffer, format: IndexFormat) {
        self.ops.push(Op::SetIndexBuffer(buffer.clone(), index_format(format)));
    }

    fn set_pipeline(&mut self, pipeline: &WgpuPipeline) {
        self.ops.push(Op::SetPipeline(pipeline.clone()));
    }

    fn set_resource_set(&mut self, slot: u32, set: &wgpu::BindGroup) {
        self.ops.push(Op::SetBindGroup(slot, set.clone()));
    }

    fn set_scissor_rect(&mut self, _index: u32, rect: ScissorRect) {
        self.ops.push(Op::SetScissor(rect));
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        self.ops.push(Op::DrawIndexed {
            indices: first_index..first_index.saturating_add(index_count),
            base_vertex: vertex_offset,
            instances: first_instance..first_instance.saturating_add(instance_count),
        });
    }

    fn end(&mut self) {
        self.recording = false;
    }
}
